//! Mark-sheet upload endpoints.
//!
//! - `POST /api/upload`: multipart/form-data with an `excelFile` field
//!   holding an `.xlsx` or `.xls` workbook. The batch runs to completion
//!   inside the request; the response lists the outcome for every student.
//!
//! - `GET /api/upload/status/{batch_id}`: the current `BatchStatus` of a
//!   batch, pollable while its upload request is still running.
//!
//! Both routes accept cross-origin requests so a form served from another
//! origin can post to them and read the response.

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::{header, Method};
use actix_web::web::{get, post, scope};
use actix_web::{Error, Scope};
use log::debug;

mod get_status;
mod submit;

pub use submit::UploadLimit;

const API_PATH: &str = "/api/upload";
const PREFLIGHT_MAX_AGE_SECS: usize = 3600;

/// Configures and returns the Actix scope for the upload routes.
pub fn configure_routes() -> Scope<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    scope(API_PATH)
        .wrap(cors_policy())
        .route("", post().to(submit::process))
        .route("/status/{batch_id}", get().to(get_status::process))
}

/// Any origin may call the upload routes with `GET`, `POST` and preflight
/// `OPTIONS`.
fn cors_policy() -> Cors {
    debug!("CORS: allowing any origin on {}", API_PATH);
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(PREFLIGHT_MAX_AGE_SECS)
}
