use serde::{Deserialize, Serialize};

/// Lifecycle of one uploaded batch.
///
/// Statuses only move forward: `Received` → `Parsed` → `InProgress` →
/// `Completed`, or to `Failed` when the sheet is rejected before any
/// student is processed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BatchStatus {
    Received,
    Parsed { rows: usize },
    InProgress { processed: usize, total: usize },
    Completed(BatchSummary),
    Failed(String),
}

/// Counters reported once a batch has run to completion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Data rows read from the sheet.
    pub total_rows: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Rows whose student had no contact address.
    pub skipped: usize,
}
