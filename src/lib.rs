//! Field updates server library.
//!
//! Backs the NGO/CSR dashboard's real-time field updates: photo evidence
//! uploads, the update feed, and report PDFs in object storage.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;

use actix_web::web;

/// Register every `/api/v1` route.
///
/// Handlers expect these app data entries: `Data<dyn RecordStore>`,
/// `Data<UpdateSubmission>`, `Data<PdfExporter>`, `Data<EventBroadcaster>`,
/// `Data<UploadLimits>` and `Data<AccessKey>`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(api::configure_health_routes)
            .configure(api::configure_reference_routes)
            .configure(api::configure_update_routes)
            .configure(api::configure_websocket_routes),
    );
}
