//! Field updates server entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{App, HttpRequest, HttpServer, Result as ActixResult, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use field_updates_lib::api::{ApiDoc, UploadLimits};
use field_updates_lib::auth::AccessKey;
use field_updates_lib::config::Config;
use field_updates_lib::db::{DbPool, RecordStore};
use field_updates_lib::services::{
    EventBroadcaster, PdfExporter, PdfRenderer, PrintPdfRenderer, ReportFonts, Storage,
    UpdateSubmission, start_pdf_backfill_task,
};
use field_updates_lib::{configure_api, middleware};

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest) -> ActixResult<NamedFile> {
    let static_dir = req
        .app_data::<web::Data<PathBuf>>()
        .ok_or_else(|| actix_web::error::ErrorNotFound("Static files are not configured"))?;
    Ok(NamedFile::open(static_dir.join("index.html"))?)
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Docker HEALTHCHECK: configuration must load.
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(if Config::from_env().is_ok() { 0 } else { 1 });
    }

    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("RUST_ENV must be set to 'development' or 'production'");
            error!("In production, DATABASE_URL, DASH_API_KEY and S3 credentials must be set");
            std::process::exit(1);
        }
    };

    info!("Field updates server ({})", config.environment);
    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = DbPool::new(&config.database)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    pool.run_migrations()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    info!("Database migrations complete");

    let buckets = Storage::connect(&config.storage)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let fonts = ReportFonts::load(&config.report_fonts)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    if config.report_fonts.regular.is_none() {
        info!("Report PDFs use the bundled DejaVu Sans fonts");
    }

    let records: Arc<dyn RecordStore> = Arc::new(pool);
    let renderer: Arc<dyn PdfRenderer> = Arc::new(PrintPdfRenderer::new(fonts));
    let exporter = PdfExporter::new(
        records.clone(),
        buckets.photos.clone(),
        buckets.reports.clone(),
        renderer,
    );
    let submission = UpdateSubmission::new(records.clone(), buckets.photos.clone(), exporter.clone());
    let broadcaster = EventBroadcaster::new();

    start_pdf_backfill_task(
        records.clone(),
        exporter.clone(),
        broadcaster.clone(),
        config.pdf_backfill,
    );

    let bind_address = config.bind_address();
    let access_key = AccessKey::new(config.api_key.clone());
    let limits = UploadLimits {
        max_upload_size: config.max_upload_size,
        max_photos: config.max_photos,
    };
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();

    info!(
        "Upload limits: {}MB per submission, {} photos",
        limits.max_upload_size / 1024 / 1024,
        limits.max_photos
    );
    if let Some(ref dir) = static_dir {
        info!("Static file serving enabled from {:?}", dir);
    }

    let worker_count = if is_development { 4 } else { num_cpus::get() };
    info!(
        "Starting server at http://{} ({} workers)",
        bind_address, worker_count
    );

    let records_data: web::Data<dyn RecordStore> = web::Data::from(records);
    let openapi = ApiDoc::openapi();

    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-api-key"),
            ])
            .max_age(3600);
        if is_development {
            cors = cors
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_origin("http://localhost:5173");
        }

        let mut app = App::new()
            .wrap(cors)
            .wrap(middleware::RequestLogger)
            .app_data(records_data.clone())
            .app_data(web::Data::new(submission.clone()))
            .app_data(web::Data::new(exporter.clone()))
            .app_data(web::Data::new(broadcaster.clone()))
            .app_data(web::Data::new(access_key.clone()))
            .app_data(web::Data::new(limits))
            // Photo bytes are limited while streaming; leave headroom at the HTTP layer.
            .app_data(web::PayloadConfig::new(limits.max_upload_size * 2))
            .configure(configure_api)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            );

        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(dir.clone()))
                .service(Files::new("/assets", dir.join("assets")).prefer_utf8(true))
                .default_service(web::route().to(spa_fallback));
        }

        app
    })
    .workers(worker_count)
    .bind(&bind_address)?
    .run()
    .await
}

