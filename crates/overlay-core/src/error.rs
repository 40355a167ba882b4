use std::path::PathBuf;

use thiserror::Error;

/// Failures while resolving a signature scale or placing anchors.
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("signature width must be positive, got {0}pt")]
    InvalidWidth(f64),

    #[error("placement targets page index {page_index} but the document has {page_count} pages")]
    PageOutOfRange {
        page_index: usize,
        page_count: usize,
    },

    #[error("no signature font found; searched {searched:?}")]
    FontMissing { searched: Vec<PathBuf> },

    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse font data: {0}")]
    FontParse(String),
}
