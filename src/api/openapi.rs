//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::config::API_KEY_HEADER;
use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Field Updates Server",
        version = "0.3.0",
        description = "Real-time field updates for NGO/CSR programs: evidence photos, feed and PDF reports"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    ),
    paths(
        api::health::health,
        api::health::ready,
        api::references::list_csr_partners,
        api::references::list_tolls,
        api::references::list_projects,
        api::references::get_cascade,
        api::updates::submit_update,
        api::updates::list_updates,
        api::updates::get_update,
        api::updates::preview_update,
        api::updates::get_update_pdf,
        api::updates::regenerate_update_pdf,
        api::updates::delete_update_pdf,
        api::updates::mark_update_sent,
        api::updates::hide_update,
    ),
    components(
        schemas(
            error::ErrorResponse,
            api::health::HealthResponse,
            api::health::ReadyResponse,
            models::CsrPartner,
            models::Toll,
            models::Project,
            models::CascadeSelection,
            models::CascadeOptions,
            models::UpdateType,
            models::RealTimeUpdate,
            models::Priority,
            models::FeedItem,
            models::UpdateFeedResponse,
            models::SubmitUpdateResponse,
            models::PdfLinkResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "References", description = "CSR partners, tolls, projects and the form cascade"),
        (name = "Updates", description = "Field update submission, feed and report PDFs")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the staff access key header scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(API_KEY_HEADER),
                    ),
                ),
            );
        }
    }
}
