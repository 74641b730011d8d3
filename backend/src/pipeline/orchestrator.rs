//! # Batch orchestration
//!
//! One `Pipeline::run` per uploaded workbook:
//!
//! `Received → Parsed → [per student: Resolved → Aggregated → (skip without
//! contact) → Rendered → Published → Notified] → Completed`
//!
//! Only reading the workbook can fail the batch. Once rows exist every
//! student is handled on its own: a lookup, render, publish or notify failure
//! becomes a failed `DeliveryResult` for that student and the loop moves on.
//! Students are processed strictly one after another, and every external
//! call is bounded by the configured timeout.

use crate::error::{PipelineError, Result};
use crate::job_controller::state::ProgressReporter;
use crate::pipeline::aggregate::{aggregate, student_name};
use crate::pipeline::contacts::ContactDirectory;
use crate::pipeline::notify::Notifier;
use crate::pipeline::publish::ArtifactPublisher;
use crate::pipeline::render::ReportRenderer;
use crate::pipeline::spreadsheet::SpreadsheetReader;
use crate::pipeline::RenderedArtifact;
use common::jobs::{BatchStatus, BatchSummary};
use common::model::delivery::DeliveryResult;
use common::model::student::StudentRecord;
use log::{debug, error, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// External services the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub contacts: Arc<dyn ContactDirectory>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub publisher: Arc<dyn ArtifactPublisher>,
    pub notifier: Arc<dyn Notifier>,
}

/// Outcome of a batch that got past parsing.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// One entry per student with a contact, in row order.
    pub results: Vec<DeliveryResult>,
    /// Students without a contact, in row order.
    pub skipped: Vec<String>,
}

pub struct Pipeline {
    reader: SpreadsheetReader,
    collaborators: Collaborators,
    call_timeout: Duration,
    keep_artifacts: bool,
}

impl Pipeline {
    pub fn new(
        reader: SpreadsheetReader,
        collaborators: Collaborators,
        call_timeout: Duration,
        keep_artifacts: bool,
    ) -> Self {
        Self {
            reader,
            collaborators,
            call_timeout,
            keep_artifacts,
        }
    }

    /// Runs the whole batch for one uploaded workbook.
    ///
    /// # Errors
    /// Only `UnsupportedFormat`, `Parse` and `InputValidation` from reading
    /// the workbook; per-student failures are reported in the `BatchReport`.
    pub async fn run(
        &self,
        bytes: &[u8],
        filename: &str,
        progress: &ProgressReporter,
    ) -> Result<BatchReport> {
        progress.report(BatchStatus::Received).await;

        let rows = match self.reader.parse(bytes, filename) {
            Ok(rows) => rows,
            Err(e) => {
                progress.report(BatchStatus::Failed(e.to_string())).await;
                return Err(e);
            }
        };
        let total = rows.len();
        info!("Parsed {} with {} student rows", filename, total);
        progress.report(BatchStatus::Parsed { rows: total }).await;

        let mut report = BatchReport {
            summary: BatchSummary {
                total_rows: total,
                ..Default::default()
            },
            ..Default::default()
        };

        for (index, row) in rows.iter().enumerate() {
            let name = student_name(row);
            let contact = match self
                .bounded("contact lookup", self.collaborators.contacts.resolve(&name))
                .await
            {
                Ok(contact) => contact,
                Err(e) => {
                    error!("Contact lookup for {} failed: {}", name, e);
                    report.results.push(DeliveryResult::failed(&name, "", e.to_string()));
                    report.summary.failed += 1;
                    progress.report(in_progress(index, total)).await;
                    continue;
                }
            };

            let record = aggregate(row, contact, self.reader.subject_column_start());
            debug!(
                "Aggregated {} (roll {}): {} subjects, total {}",
                record.name,
                record.roll_number,
                record.subjects.len(),
                record.total_marks
            );

            match record.contact_address.clone() {
                None => {
                    info!("No contact found for {}", record.name);
                    report.skipped.push(record.name.clone());
                    report.summary.skipped += 1;
                }
                Some(address) => {
                    let result = self.deliver(&record, &address).await;
                    if result.success {
                        report.summary.delivered += 1;
                    } else {
                        report.summary.failed += 1;
                    }
                    report.results.push(result);
                }
            }
            progress.report(in_progress(index, total)).await;
        }

        info!(
            "Batch finished: {} rows, {} delivered, {} failed, {} skipped",
            report.summary.total_rows,
            report.summary.delivered,
            report.summary.failed,
            report.summary.skipped
        );
        progress
            .report(BatchStatus::Completed(report.summary.clone()))
            .await;
        Ok(report)
    }

    /// Render, publish and notify for one student, stopping at the first
    /// failing stage.
    async fn deliver(&self, record: &StudentRecord, address: &str) -> DeliveryResult {
        let artifact = match self.render(record).await {
            Ok(artifact) => artifact,
            Err(e) => {
                error!("Rendering the report for {} failed: {}", record.name, e);
                return DeliveryResult::failed(&record.name, address, e.to_string());
            }
        };

        let published = self
            .bounded("upload", self.collaborators.publisher.publish(&artifact))
            .await;
        if !self.keep_artifacts {
            artifact.discard();
        }
        let link = match published {
            Ok(link) => link,
            Err(e) => {
                error!("Publishing {} for {} failed: {}", artifact.file_name, record.name, e);
                return DeliveryResult::failed(&record.name, address, e.to_string());
            }
        };

        match self
            .bounded("message send", self.collaborators.notifier.notify(address, &link.url))
            .await
        {
            Ok(receipt) => {
                info!("Message sent to {}: SID {}", address.trim(), receipt.message_id);
                DeliveryResult::delivered(&record.name, address)
            }
            Err(e) => {
                error!("Failed to send message to {}: {}", address.trim(), e);
                DeliveryResult::failed(&record.name, address, e.to_string())
            }
        }
    }

    /// Renders on the blocking pool under the call timeout.
    ///
    /// A timed-out render keeps running on its thread. When artifacts are not
    /// kept, the file it eventually writes is removed once it finishes.
    async fn render(&self, record: &StudentRecord) -> Result<RenderedArtifact> {
        let renderer = Arc::clone(&self.collaborators.renderer);
        let owned = record.clone();
        let mut task = tokio::task::spawn_blocking(move || renderer.render(&owned));

        match tokio::time::timeout(self.call_timeout, &mut task).await {
            Ok(joined) => joined
                .map_err(|e| PipelineError::Render(format!("render task failed: {}", e)))?,
            Err(_) => {
                if !self.keep_artifacts {
                    tokio::spawn(async move {
                        if let Ok(Ok(late)) = task.await {
                            debug!("Removing {} rendered after its timeout", late.file_name);
                            late.discard();
                        }
                    });
                }
                Err(PipelineError::Timeout {
                    stage: "render",
                    after: self.call_timeout,
                })
            }
        }
    }

    async fn bounded<T, F>(&self, stage: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .unwrap_or(Err(PipelineError::Timeout {
                stage,
                after: self.call_timeout,
            }))
    }
}

fn in_progress(index: usize, total: usize) -> BatchStatus {
    BatchStatus::InProgress {
        processed: index + 1,
        total,
    }
}
