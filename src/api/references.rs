//! Reference data handlers: CSR partners, tolls, projects and the form cascade.

use actix_web::{HttpResponse, web};

use crate::db::RecordStore;
use crate::error::AppResult;
use crate::models::{CascadeOptions, CascadeSelection, CsrPartner, Project, ProjectQuery, Toll, TollQuery};
use crate::services::cascade;

/// List active CSR partners.
#[utoipa::path(
    get,
    path = "/csr-partners",
    tag = "References",
    responses(
        (status = 200, description = "Active CSR partners by name", body = Vec<CsrPartner>),
    )
)]
pub async fn list_csr_partners(records: web::Data<dyn RecordStore>) -> AppResult<HttpResponse> {
    let partners = records.list_csr_partners().await?;
    Ok(HttpResponse::Ok().json(partners))
}

/// List active tolls, optionally for one partner.
#[utoipa::path(
    get,
    path = "/tolls",
    tag = "References",
    params(
        ("csr_partner_id" = Option<uuid::Uuid>, Query, description = "Only tolls of this partner")
    ),
    responses(
        (status = 200, description = "Active tolls", body = Vec<Toll>),
    )
)]
pub async fn list_tolls(
    records: web::Data<dyn RecordStore>,
    query: web::Query<TollQuery>,
) -> AppResult<HttpResponse> {
    let tolls = records.list_tolls(query.csr_partner_id).await?;
    Ok(HttpResponse::Ok().json(tolls))
}

/// List active projects. A toll filter takes precedence over a partner filter.
#[utoipa::path(
    get,
    path = "/projects",
    tag = "References",
    params(
        ("csr_partner_id" = Option<uuid::Uuid>, Query, description = "Only projects of this partner"),
        ("toll_id" = Option<uuid::Uuid>, Query, description = "Only projects of this toll")
    ),
    responses(
        (status = 200, description = "Active projects", body = Vec<Project>),
    )
)]
pub async fn list_projects(
    records: web::Data<dyn RecordStore>,
    query: web::Query<ProjectQuery>,
) -> AppResult<HttpResponse> {
    let projects = records.list_projects(&query).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Dropdown options for the current partner → toll → project selection.
///
/// Stale downstream choices come back cleared in `selection`.
#[utoipa::path(
    get,
    path = "/cascade",
    tag = "References",
    params(
        ("csr_partner_id" = Option<uuid::Uuid>, Query, description = "Selected partner"),
        ("toll_id" = Option<uuid::Uuid>, Query, description = "Selected toll"),
        ("project_id" = Option<uuid::Uuid>, Query, description = "Selected project")
    ),
    responses(
        (status = 200, description = "Options and normalized selection", body = CascadeOptions),
    )
)]
pub async fn get_cascade(
    records: web::Data<dyn RecordStore>,
    query: web::Query<CascadeSelection>,
) -> AppResult<HttpResponse> {
    let options = cascade::load_cascade(records.get_ref(), &query).await?;
    Ok(HttpResponse::Ok().json(options))
}

/// Configure reference routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/csr-partners").route(web::get().to(list_csr_partners)))
        .service(web::resource("/tolls").route(web::get().to(list_tolls)))
        .service(web::resource("/projects").route(web::get().to(list_projects)))
        .service(web::resource("/cascade").route(web::get().to(get_cascade)));
}
