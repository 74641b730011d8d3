use crate::jobs::BatchSummary;
use crate::model::delivery::DeliveryResult;
use serde::{Deserialize, Serialize};

/// Body of a successful `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub batch_id: String,
    pub summary: BatchSummary,
    pub results: Vec<DeliveryResult>,
    /// Names of students skipped because no contact was found.
    pub skipped: Vec<String>,
}

/// Body of every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
