use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("unsupported signature image: {0}")]
    Image(String),

    #[error("text extraction failed: {0}")]
    Extract(String),
}
