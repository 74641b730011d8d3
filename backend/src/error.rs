//! Error taxonomy shared by every pipeline stage and the HTTP layer.

use actix_web::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing file part, oversized upload, or a sheet without subject columns.
    #[error("{0}")]
    InputValidation(String),
    #[error("Invalid file format. Please upload an Excel file.")]
    UnsupportedFormat(String),
    #[error("Error reading Excel file: {0}")]
    Parse(String),
    #[error("contact lookup failed: {0}")]
    Resolve(String),
    #[error("rendering failed: {0}")]
    Render(String),
    #[error("publishing failed: {0}")]
    Publish(String),
    #[error("notification failed: {0}")]
    Notify(String),
    #[error("{stage} timed out after {after:?}")]
    Timeout {
        stage: &'static str,
        after: Duration,
    },
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// HTTP status surfaced to the uploader.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InputValidation(_) | PipelineError::UnsupportedFormat(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<genpdf::error::Error> for PipelineError {
    fn from(err: genpdf::error::Error) -> Self {
        PipelineError::Render(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
