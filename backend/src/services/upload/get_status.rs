use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};
use common::responses::ErrorResponse;

pub(crate) async fn process(batch_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    match state.status(&batch_id.into_inner()).await {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().json(ErrorResponse {
            error: "Batch ID not found".to_string(),
        }),
    }
}
