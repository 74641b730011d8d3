//! # Mark-sheet pipeline
//!
//! Data flows one way, one student at a time:
//!
//! ```text
//! workbook bytes → RawRow → StudentRecord → RenderedArtifact → PublishedLink → DeliveryReceipt
//! ```
//!
//! - `spreadsheet`: workbook parsing into ordered rows.
//! - `contacts`: name → messaging address lookup (`ContactDirectory`).
//! - `aggregate`: row + contact → `StudentRecord`.
//! - `render`: `StudentRecord` → PDF on disk (`ReportRenderer`).
//! - `publish`: PDF → public link (`ArtifactPublisher`).
//! - `notify`: link → message to the student (`Notifier`).
//! - `orchestrator`: drives the stages for a whole batch and isolates
//!   failures per student.

pub mod aggregate;
pub mod contacts;
pub mod notify;
pub mod orchestrator;
pub mod publish;
pub mod render;
pub mod spreadsheet;
pub mod text;

use crate::error::{PipelineError, Result};
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

/// A rendered report on local disk. Never modified after rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifact {
    /// File name including extension, e.g. `Jane_Doe_12.pdf`.
    pub file_name: String,
    pub path: PathBuf,
}

impl RenderedArtifact {
    /// Removes the local file; failures are only logged.
    pub fn discard(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Could not remove {}: {}", self.path.display(), e);
        }
    }
}

/// Public URL returned by the storage backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedLink {
    pub url: String,
}

/// HTTP client shared by the remote collaborators.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PipelineError::Config(format!("cannot build HTTP client: {}", e)))
}
