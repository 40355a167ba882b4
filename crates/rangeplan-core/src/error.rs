use thiserror::Error;

/// Failures while turning raw range input into a plan.
///
/// All variants are detected at validation time and reported to the caller;
/// a plan is produced whole or not at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("page ranges must be integers, got {0:?}")]
    InvalidFormat(String),

    #[error("each range needs start >= 1 and end >= start, got {start}..{end}")]
    InvalidBounds { start: i64, end: i64 },

    #[error("no usable page ranges were provided")]
    NoRanges,

    #[error("all ranges fall outside the document's {total_pages} pages")]
    OutOfBounds { total_pages: u32 },
}
