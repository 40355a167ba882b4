//! Error types for the ihatepdf server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use overlay_core::OverlayError;
use rangeplan_core::RangeError;
use serde::Serialize;
use shared_pdf::PdfError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Docx(#[from] docxgen_core::DocxError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),

            ServerError::Range(err) => {
                let code = match err {
                    RangeError::InvalidFormat(_) => "INVALID_RANGE_FORMAT",
                    RangeError::InvalidBounds { .. } => "INVALID_RANGE_BOUNDS",
                    RangeError::NoRanges => "NO_RANGES",
                    RangeError::OutOfBounds { .. } => "RANGES_OUT_OF_BOUNDS",
                };
                (StatusCode::BAD_REQUEST, code)
            }

            ServerError::Overlay(err) => match err {
                OverlayError::InvalidWidth(_) => (StatusCode::BAD_REQUEST, "INVALID_WIDTH"),
                OverlayError::PageOutOfRange { .. } => {
                    (StatusCode::BAD_REQUEST, "PLACEMENT_OUT_OF_RANGE")
                }
                OverlayError::FontMissing { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "FONT_MISSING")
                }
                OverlayError::FontRead { .. } | OverlayError::FontParse(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },

            ServerError::Pdf(err) => match err {
                PdfError::Parse(_) => (StatusCode::BAD_REQUEST, "PDF_PARSE_ERROR"),
                PdfError::Image(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_IMAGE"),
                PdfError::Operation(_) | PdfError::Extract(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PDF_OPERATION_FAILED")
                }
            },

            ServerError::Docx(_) | ServerError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("rejected request: {}", self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
