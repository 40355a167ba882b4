//! Text-layer extraction. No OCR: scanned documents come back empty.

use crate::error::PdfError;

/// Extract the whole document's text layer.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| PdfError::Extract(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_pdf;

    #[test]
    fn extracts_from_generated_document() {
        let pdf = build_pdf(&["hello extraction"]);
        assert!(extract_text(&pdf).is_ok());
    }

    #[test]
    fn garbage_input_fails() {
        assert!(extract_text(b"not a pdf").is_err());
    }
}
