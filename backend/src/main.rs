use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use env_logger::Env;
use include_dir::{include_dir, Dir};
use log::{error, info};
use marksheet::config::Config;
use marksheet::job_controller::state::{self, JobsState};
use marksheet::pipeline::contacts::SupabaseDirectory;
use marksheet::pipeline::http_client;
use marksheet::pipeline::notify::TwilioNotifier;
use marksheet::pipeline::orchestrator::{Collaborators, Pipeline};
use marksheet::pipeline::publish::DropboxPublisher;
use marksheet::pipeline::render::{load_fonts, Branding, GenpdfRenderer, LogoSource};
use marksheet::pipeline::spreadsheet::SpreadsheetReader;
use marksheet::services;
use marksheet::services::upload::UploadLimit;
use mime_guess::from_path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

static STATIC_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/static");

async fn serve_embedded(req: HttpRequest) -> HttpResponse {
    let path = req.path().trim_start_matches('/');
    let file_path = if path.is_empty() { "index.html" } else { path };

    match STATIC_DIR.get_file(file_path) {
        Some(file) => {
            let mime = from_path(file_path).first_or_octet_stream();
            HttpResponse::Ok()
                .content_type(mime.as_ref())
                .body(file.contents().to_vec())
        }
        None => match STATIC_DIR.get_file("index.html") {
            Some(index) => HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .body(index.contents().to_vec()),
            None => HttpResponse::NotFound().body("Not Found"),
        },
    }
}

fn build_pipeline(config: &Config) -> marksheet::error::Result<Pipeline> {
    let client = http_client(config.call_timeout)?;
    let fonts = load_fonts(&config.fonts_dir)?;
    let renderer = GenpdfRenderer::new(
        fonts,
        LogoSource::File(config.logo_path.clone()),
        Branding {
            institution_name: config.institution_name.clone(),
            department_name: config.department_name.clone(),
            hod_signature: config.hod_signature.clone(),
        },
        config.output_dir.clone(),
    );
    let collaborators = Collaborators {
        contacts: Arc::new(SupabaseDirectory::new(config, client.clone())),
        renderer: Arc::new(renderer),
        publisher: Arc::new(DropboxPublisher::new(config, client.clone())),
        notifier: Arc::new(TwilioNotifier::new(config, client)),
    };
    Ok(Pipeline::new(
        SpreadsheetReader::new(config.subject_column_start),
        collaborators,
        config.call_timeout,
        config.keep_artifacts,
    ))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let (config, pipeline) = match Config::from_env().and_then(|c| build_pipeline(&c).map(|p| (c, p))) {
        Ok(ready) => ready,
        Err(e) => {
            error!("{}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };
    let url = format!("http://{}:{}", config.host, config.port);

    if config.open_browser {
        let url_clone = url.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(500));
            let _ = webbrowser::open(&url_clone);
        });
    }

    let (jobs_state, rx) = JobsState::with_retention(100, config.batch_retention);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        state::start_job_updater(updater_state, rx).await;
    });

    info!("Server running at {}", url);

    let pipeline = web::Data::new(pipeline);
    let limit = UploadLimit(config.max_upload_bytes);
    HttpServer::new(move || {
        App::new()
            .app_data(pipeline.clone())
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(limit))
            .service(services::upload::configure_routes())
            .default_service(web::route().to(serve_embedded))
    })
        .bind((config.host.as_str(), config.port))?
        .run()
        .await
}
