//! Real-time update handlers: submission, feed, preview and report PDFs.

use actix_multipart::Multipart;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::StaffAuth;
use crate::db::RecordStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    PdfLinkResponse, RealTimeUpdate, SubmitUpdateResponse, UpdateFeedFilter, UpdateFeedResponse,
    WsEvent,
};
use crate::services::feed;
use crate::services::report_layout::ReportLayout;
use crate::services::submission::PhotoUpload;
use crate::services::{EventBroadcaster, PdfExporter, UpdateForm, UpdateSubmission};

/// Form field carrying photo files.
const PHOTO_FIELDS: &[&str] = &["photos", "photos[]", "photo"];

/// Per-request limits for update submissions.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Total bytes accepted across all multipart fields.
    pub max_upload_size: usize,
    /// Photos accepted on one update.
    pub max_photos: usize,
}

/// Read the multipart submission into form state.
async fn read_update_form(mut payload: Multipart, limits: UploadLimits) -> AppResult<UpdateForm> {
    let mut form = UpdateForm::default();
    let mut total_bytes = 0usize;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            total_bytes += chunk.len();
            if total_bytes > limits.max_upload_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "Submission exceeds {} bytes",
                    limits.max_upload_size
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if PHOTO_FIELDS.contains(&name.as_str()) {
            // Browsers send an empty part when no file was picked.
            let Some(file_name) = file_name.filter(|f| !f.is_empty()) else {
                continue;
            };
            if data.is_empty() {
                continue;
            }
            if form.photos.len() >= limits.max_photos {
                return Err(AppError::InvalidInput(format!(
                    "At most {} photos allowed per update",
                    limits.max_photos
                )));
            }
            form.photos.push(PhotoUpload::new(file_name, content_type, data));
            continue;
        }

        let value = String::from_utf8(data)
            .map_err(|_| AppError::InvalidInput(format!("Field '{}' is not valid UTF-8", name)))?;
        if !form.set_text(&name, value) {
            debug!(field = %name, "Ignoring unknown form field");
        }
    }

    Ok(form)
}

/// Fetch an update that is still visible in the feed.
async fn visible_update(records: &dyn RecordStore, id: Uuid) -> AppResult<RealTimeUpdate> {
    records
        .get_update(id)
        .await?
        .filter(|u| u.is_public)
        .ok_or_else(|| AppError::NotFound(format!("Update {}", id)))
}

/// Submit a field update with photos.
///
/// Photos are uploaded in order; any that fail are dropped. The report PDF is
/// exported after the row is stored and `pdf_generated` says whether it worked.
#[utoipa::path(
    post,
    path = "/updates",
    tag = "Updates",
    request_body(content_type = "multipart/form-data", description = "Update fields, repeated `resident` values and `photos` files"),
    responses(
        (status = 201, description = "Update stored", body = SubmitUpdateResponse),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 413, description = "Submission too large", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn submit_update(
    _auth: StaffAuth,
    submission: web::Data<UpdateSubmission>,
    broadcaster: web::Data<EventBroadcaster>,
    limits: web::Data<UploadLimits>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let form = read_update_form(payload, **limits).await?;
    let outcome = submission.submit(form).await?;

    broadcaster.publish(WsEvent::update_created(&outcome.update));
    if let Some(ref url) = outcome.update.pdf_url {
        broadcaster.publish(WsEvent::update_pdf_ready(outcome.update.id, url.clone()));
    }

    Ok(HttpResponse::Created().json(SubmitUpdateResponse::from(outcome)))
}

/// Update feed, newest first, with resolved names and priority tiers.
#[utoipa::path(
    get,
    path = "/updates",
    tag = "Updates",
    params(
        ("project_id" = Option<uuid::Uuid>, Query, description = "Only this project"),
        ("csr_partner_id" = Option<uuid::Uuid>, Query, description = "Only this CSR partner"),
        ("toll_id" = Option<uuid::Uuid>, Query, description = "Only this toll"),
        ("from" = Option<String>, Query, description = "First report date (yyyy-mm-dd)"),
        ("to" = Option<String>, Query, description = "Last report date (yyyy-mm-dd)"),
        ("limit" = Option<u64>, Query, description = "Maximum updates (default 100, max 500)")
    ),
    responses(
        (status = 200, description = "Update feed", body = UpdateFeedResponse),
        (status = 400, description = "Invalid date range", body = crate::error::ErrorResponse),
    )
)]
pub async fn list_updates(
    records: web::Data<dyn RecordStore>,
    query: web::Query<UpdateFeedFilter>,
) -> AppResult<HttpResponse> {
    let filter = query.into_inner();
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from > to
    {
        return Err(AppError::InvalidInput(format!(
            "Date range is empty: from {} is after to {}",
            from, to
        )));
    }

    let response = feed::load_feed(records.get_ref(), &filter).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    get,
    path = "/updates/{update_id}",
    tag = "Updates",
    params(
        ("update_id" = uuid::Uuid, Path, description = "Update UUID")
    ),
    responses(
        (status = 200, description = "The update", body = RealTimeUpdate),
        (status = 404, description = "Update not found or hidden", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_update(
    records: web::Data<dyn RecordStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let update = visible_update(records.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(update))
}

/// HTML preview of the report, one fixed-size section per page.
#[utoipa::path(
    get,
    path = "/updates/{update_id}/preview",
    tag = "Updates",
    params(
        ("update_id" = uuid::Uuid, Path, description = "Update UUID")
    ),
    responses(
        (status = 200, description = "Report preview", content_type = "text/html", body = String),
        (status = 404, description = "Update not found or hidden", body = crate::error::ErrorResponse),
    )
)]
pub async fn preview_update(
    records: web::Data<dyn RecordStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let update = visible_update(records.get_ref(), path.into_inner()).await?;
    let heading = feed::heading_for_update(records.get_ref(), &update).await?;
    let html = ReportLayout::build(&update, heading).render_html();

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(html))
}

/// Link to the generated report PDF.
#[utoipa::path(
    get,
    path = "/updates/{update_id}/pdf",
    tag = "Updates",
    params(
        ("update_id" = uuid::Uuid, Path, description = "Update UUID")
    ),
    responses(
        (status = 200, description = "Report link", body = PdfLinkResponse),
        (status = 404, description = "Update missing or no PDF generated yet", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_update_pdf(
    records: web::Data<dyn RecordStore>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let update = visible_update(records.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(feed::pdf_link(&update)?))
}

/// Generate (or regenerate) the report PDF.
#[utoipa::path(
    post,
    path = "/updates/{update_id}/pdf",
    tag = "Updates",
    params(
        ("update_id" = uuid::Uuid, Path, description = "Update UUID")
    ),
    responses(
        (status = 200, description = "Report exported", body = PdfLinkResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Update not found or hidden", body = crate::error::ErrorResponse),
        (status = 502, description = "Report storage failed", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn regenerate_update_pdf(
    _auth: StaffAuth,
    records: web::Data<dyn RecordStore>,
    exporter: web::Data<PdfExporter>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let update = visible_update(records.get_ref(), path.into_inner()).await?;
    let updated = exporter.export(&update).await?;
    let link = feed::pdf_link(&updated)?;

    broadcaster.publish(WsEvent::update_pdf_ready(link.update_id, link.pdf_url.clone()));
    Ok(HttpResponse::Ok().json(link))
}

/// Delete the report PDF and clear the link.
///
/// A stored link that does not point into the report bucket is refused and
/// nothing is changed.
#[utoipa::path(
    delete,
    path = "/updates/{update_id}/pdf",
    tag = "Updates",
    params(
        ("update_id" = uuid::Uuid, Path, description = "Update UUID")
    ),
    responses(
        (status = 200, description = "PDF removed", body = RealTimeUpdate),
        (status = 400, description = "Stored link is not a report bucket URL", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Update missing or has no PDF", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn delete_update_pdf(
    _auth: StaffAuth,
    records: web::Data<dyn RecordStore>,
    exporter: web::Data<PdfExporter>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let update = visible_update(records.get_ref(), path.into_inner()).await?;
    let updated = exporter.remove(&update).await?;

    broadcaster.publish(WsEvent::update_pdf_removed(updated.id));
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    post,
    path = "/updates/{update_id}/sent",
    tag = "Updates",
    params(
        ("update_id" = uuid::Uuid, Path, description = "Update UUID")
    ),
    responses(
        (status = 200, description = "Update marked as sent to the client", body = RealTimeUpdate),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Update not found or hidden", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn mark_update_sent(
    _auth: StaffAuth,
    records: web::Data<dyn RecordStore>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let update = visible_update(records.get_ref(), path.into_inner()).await?;
    let updated = records.mark_update_sent(update.id).await?;

    info!(update_code = %updated.update_code, "Update marked as sent to client");
    broadcaster.publish(WsEvent::update_sent_to_client(updated.id));
    Ok(HttpResponse::Ok().json(updated))
}

/// Hide an update from the feed. The row and its PDF are kept.
#[utoipa::path(
    delete,
    path = "/updates/{update_id}",
    tag = "Updates",
    params(
        ("update_id" = uuid::Uuid, Path, description = "Update UUID")
    ),
    responses(
        (status = 204, description = "Update hidden"),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Update not found or already hidden", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn hide_update(
    _auth: StaffAuth,
    records: web::Data<dyn RecordStore>,
    broadcaster: web::Data<EventBroadcaster>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let update = visible_update(records.get_ref(), path.into_inner()).await?;
    records.hide_update(update.id).await?;

    info!(update_code = %update.update_code, "Update hidden");
    broadcaster.publish(WsEvent::update_hidden(update.id));
    Ok(HttpResponse::NoContent().finish())
}

/// Configure update routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/updates")
            .route(web::get().to(list_updates))
            .route(web::post().to(submit_update)),
    )
    .service(
        web::resource("/updates/{update_id}")
            .route(web::get().to(get_update))
            .route(web::delete().to(hide_update)),
    )
    .service(web::resource("/updates/{update_id}/preview").route(web::get().to(preview_update)))
    .service(
        web::resource("/updates/{update_id}/pdf")
            .route(web::get().to(get_update_pdf))
            .route(web::post().to(regenerate_update_pdf))
            .route(web::delete().to(delete_update_pdf)),
    )
    .service(web::resource("/updates/{update_id}/sent").route(web::post().to(mark_update_sent)));
}
