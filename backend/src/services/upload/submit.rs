use crate::error::{PipelineError, Result};
use crate::job_controller::state::JobsState;
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::spreadsheet::SUPPORTED_EXTENSIONS;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::responses::{ErrorResponse, UploadResponse};
use futures_util::StreamExt;
use log::{info, warn};
use uuid::Uuid;

/// Multipart field carrying the workbook.
const FILE_FIELD: &str = "excelFile";
const SUCCESS_MESSAGE: &str = "Files generated and sent via WhatsApp successfully!";

/// Size limit applied while reading the upload.
#[derive(Clone, Copy, Debug)]
pub struct UploadLimit(pub usize);

/// A workbook received from the client.
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// HTTP handler for `POST /api/upload`.
///
/// - `200 OK` with an `UploadResponse` once every student was processed.
/// - `400 Bad Request` for a missing, oversized or non-Excel file.
/// - `500 Internal Server Error` when the workbook cannot be read.
pub(crate) async fn process(
    payload: Multipart,
    pipeline: web::Data<Pipeline>,
    jobs_state: web::Data<JobsState>,
    limit: Option<web::Data<UploadLimit>>,
) -> impl Responder {
    let limit = limit.map(|l| l.0).unwrap_or(usize::MAX);
    let upload = match read_upload(payload, limit).await {
        Ok(upload) => upload,
        Err(e) => return error_response(&e),
    };

    let batch_id = Uuid::new_v4().to_string();
    info!(
        "Batch {} received {} ({} bytes)",
        batch_id,
        upload.filename,
        upload.bytes.len()
    );
    let progress = jobs_state.register(&batch_id).await;

    match pipeline.run(&upload.bytes, &upload.filename, &progress).await {
        Ok(report) => HttpResponse::Ok().json(UploadResponse {
            message: SUCCESS_MESSAGE.to_string(),
            batch_id,
            summary: report.summary,
            results: report.results,
            skipped: report.skipped,
        }),
        Err(e) => {
            warn!("Batch {} rejected: {}", batch_id, e);
            error_response(&e)
        }
    }
}

fn error_response(err: &PipelineError) -> HttpResponse {
    HttpResponse::build(err.status_code()).json(ErrorResponse {
        error: err.to_string(),
    })
}

/// Reads the `excelFile` part, rejecting other extensions before the body
/// is buffered. Other fields (such as the form's class selector) are drained
/// and ignored.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Upload> {
    let mut upload: Option<Upload> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| PipelineError::InputValidation(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        if name.as_deref() != Some(FILE_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| PipelineError::InputValidation(e.to_string()))?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        if filename.is_empty() {
            return Err(PipelineError::InputValidation("No selected file".to_string()));
        }
        let lower = filename.to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return Err(PipelineError::UnsupportedFormat(filename));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| PipelineError::InputValidation(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(PipelineError::InputValidation(format!(
                    "The file exceeds the {} byte upload limit",
                    limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(Upload { filename, bytes });
    }

    upload.ok_or_else(|| PipelineError::InputValidation("No file part".to_string()))
}
