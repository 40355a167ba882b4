//! Page extraction
//!
//! Builds a new document containing exactly the requested 1-based pages by
//! deleting the complement from a copy, then pruning everything the kept
//! pages no longer reference.

use std::collections::HashSet;

use lopdf::Document;

use crate::error::PdfError;

/// Extract the given 1-based pages into a new PDF, preserving page order.
pub fn extract_pages(bytes: &[u8], pages: &[u32]) -> Result<Vec<u8>, PdfError> {
    if pages.is_empty() {
        return Err(PdfError::Operation("no pages selected".into()));
    }
    if pages.contains(&0) {
        return Err(PdfError::Operation("page numbers are 1-based".into()));
    }

    let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
    let page_count = doc.get_pages().len() as u32;

    for &page in pages {
        if page > page_count {
            return Err(PdfError::Operation(format!(
                "page {} does not exist (document has {} pages)",
                page, page_count
            )));
        }
    }

    let mut sliced = doc.clone();

    let keep: HashSet<u32> = pages.iter().copied().collect();
    // Delete in reverse so earlier deletions do not shift later page numbers.
    let discard: Vec<u32> = (1..=page_count).rev().filter(|p| !keep.contains(p)).collect();
    for page in discard {
        sliced.delete_pages(&[page]);
    }

    sliced.prune_objects();
    sliced.compress();

    let mut buffer = Vec::new();
    sliced
        .save_to(&mut buffer)
        .map_err(|e| PdfError::Operation(format!("save failed: {}", e)))?;

    Ok(buffer)
}

/// Extract the inclusive 1-based range `start..=end`.
pub fn extract_range(bytes: &[u8], start: u32, end: u32) -> Result<Vec<u8>, PdfError> {
    if start < 1 || end < start {
        return Err(PdfError::Operation(format!(
            "invalid page range {}..{}",
            start, end
        )));
    }
    let pages: Vec<u32> = (start..=end).collect();
    extract_pages(bytes, &pages)
}
