//! Page range normalization
//!
//! Turns raw page-range form input (`start[]` / `end[]` string pairs) into a
//! validated, clipped, gap-filled plan of 1-based inclusive ranges. Each plan
//! entry becomes one output artifact when a document is split.

pub mod error;

pub use error::RangeError;

use serde::Serialize;

/// A 1-based inclusive page range with `1 <= start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Validate and construct a range.
    pub fn new(start: i64, end: i64) -> Result<Self, RangeError> {
        if start < 1 || end < start || end > i64::from(u32::MAX) {
            return Err(RangeError::InvalidBounds { start, end });
        }
        Ok(Self {
            start: start as u32,
            end: end as u32,
        })
    }

    /// Number of pages covered.
    pub fn page_count(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Iterate the 1-based page numbers in this range.
    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }

    /// Deterministic artifact name for this range: the source stem, the
    /// 1-based ordinal of the range within its plan, and the page bounds.
    pub fn artifact_name(&self, stem: &str, ordinal: usize, ext: &str) -> String {
        format!("{}_part{}_{}-{}.{}", stem, ordinal, self.start, self.end, ext)
    }
}

/// An ordered sequence of validated ranges, sorted by `(start, end)`.
///
/// Overlapping user ranges are preserved as distinct entries: each one names
/// a separate output artifact, not an element of a set union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangePlan {
    ranges: Vec<PageRange>,
}

impl RangePlan {
    pub fn iter(&self) -> impl Iterator<Item = &PageRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Highest page covered by any entry.
    pub fn last_end(&self) -> u32 {
        self.ranges.iter().map(|r| r.end).max().unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a RangePlan {
    type Item = &'a PageRange;
    type IntoIter = std::slice::Iter<'a, PageRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Pair `starts` and `ends` positionally and parse them into ranges.
///
/// Pairs where either side is blank are skipped. Unpaired trailing entries
/// are ignored. Returns [`RangeError::NoRanges`] when nothing usable remains.
pub fn parse_range_pairs(starts: &[String], ends: &[String]) -> Result<Vec<PageRange>, RangeError> {
    let mut ranges = Vec::new();

    for (s, e) in starts.iter().zip(ends.iter()) {
        let (s, e) = (s.trim(), e.trim());
        if s.is_empty() || e.is_empty() {
            continue;
        }

        let start: i64 = s
            .parse()
            .map_err(|_| RangeError::InvalidFormat(s.to_string()))?;
        let end: i64 = e
            .parse()
            .map_err(|_| RangeError::InvalidFormat(e.to_string()))?;

        ranges.push(PageRange::new(start, end)?);
    }

    if ranges.is_empty() {
        return Err(RangeError::NoRanges);
    }

    Ok(ranges)
}

/// Sort, clip and gap-fill parsed ranges against the document length.
///
/// Ranges starting past the last page are dropped; ends are clamped to
/// `total_pages`. If every range falls outside the document the operation
/// fails with [`RangeError::OutOfBounds`]. When the last surviving range ends
/// before `total_pages`, one synthetic trailing range covers the remainder so
/// no page after the explicit ranges is lost. Interior gaps between user
/// ranges are left exactly as specified.
pub fn plan_ranges(mut ranges: Vec<PageRange>, total_pages: u32) -> Result<RangePlan, RangeError> {
    ranges.sort_by_key(|r| (r.start, r.end));

    let mut clipped: Vec<PageRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        if range.start > total_pages {
            continue;
        }
        let end = range.end.min(total_pages);
        if end >= range.start {
            clipped.push(PageRange {
                start: range.start,
                end,
            });
        }
    }

    if clipped.is_empty() {
        return Err(RangeError::OutOfBounds { total_pages });
    }

    let last_end = clipped.iter().map(|r| r.end).max().unwrap_or(0);
    if last_end < total_pages {
        clipped.push(PageRange {
            start: last_end + 1,
            end: total_pages,
        });
    }

    Ok(RangePlan { ranges: clipped })
}

/// Parse raw `start[]`/`end[]` form values and produce the final plan.
pub fn normalize_ranges(
    starts: &[String],
    ends: &[String],
    total_pages: u32,
) -> Result<RangePlan, RangeError> {
    let parsed = parse_range_pairs(starts, ends)?;
    plan_ranges(parsed, total_pages)
}
