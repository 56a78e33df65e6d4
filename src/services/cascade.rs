//! Partner → toll → project cascade for the update form.
//!
//! The dropdown state is derived from the upstream selection alone: picking a
//! partner narrows the tolls, picking a toll narrows the projects, and any
//! downstream choice that falls outside its narrowed list is cleared.

use crate::db::RecordStore;
use crate::error::AppResult;
use crate::models::{CascadeOptions, CascadeSelection, CsrPartner, Project, ProjectQuery, Toll};

/// Derive options and the normalized selection.
///
/// Tolls are only offered once a partner is chosen. Projects are narrowed by
/// the toll when one is chosen, otherwise by the partner, otherwise all.
pub fn cascade(
    selection: &CascadeSelection,
    partners: &[CsrPartner],
    tolls: &[Toll],
    projects: &[Project],
) -> CascadeOptions {
    let partner_id = selection
        .csr_partner_id
        .filter(|id| partners.iter().any(|p| p.id == *id));

    let toll_options: Vec<Toll> = match partner_id {
        Some(partner) => tolls
            .iter()
            .filter(|t| t.csr_partner_id == partner)
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let toll_id = selection
        .toll_id
        .filter(|id| toll_options.iter().any(|t| t.id == *id));

    let project_options: Vec<Project> = projects
        .iter()
        .filter(|p| match (toll_id, partner_id) {
            (Some(toll), _) => p.toll_id == Some(toll),
            (None, Some(partner)) => p.csr_partner_id == Some(partner),
            (None, None) => true,
        })
        .cloned()
        .collect();

    let project_id = selection
        .project_id
        .filter(|id| project_options.iter().any(|p| p.id == *id));

    CascadeOptions {
        csr_partners: partners.to_vec(),
        tolls: toll_options,
        projects: project_options,
        selection: CascadeSelection {
            csr_partner_id: partner_id,
            toll_id,
            project_id,
        },
    }
}

/// Load the active reference lists and derive the cascade for a selection.
pub async fn load_cascade(
    records: &dyn RecordStore,
    selection: &CascadeSelection,
) -> AppResult<CascadeOptions> {
    let partners = records.list_csr_partners().await?;
    let tolls = records.list_tolls(None).await?;
    let projects = records.list_projects(&ProjectQuery::default()).await?;

    Ok(cascade(selection, &partners, &tolls, &projects))
}
