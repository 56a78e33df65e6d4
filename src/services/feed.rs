//! Update feed: newest-first listing with resolved names and priority tiers.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use crate::db::RecordStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    CsrPartner, FeedItem, PdfLinkResponse, Priority, Project, RealTimeUpdate, Toll, UpdateFeedFilter,
    UpdateFeedResponse,
};
use crate::services::report_layout::ReportHeading;

pub const UNKNOWN_PROJECT: &str = "Unknown Project";
pub const NOT_AVAILABLE: &str = "N/A";

/// Tier sizes `(high, medium, low)` for a feed of `n` updates.
///
/// High takes the first ceil(30%), medium the next ceil(40%) bounded by what is
/// left, low the rest.
pub fn priority_tiers(n: usize) -> (usize, usize, usize) {
    let high = (3 * n).div_ceil(10);
    let medium = (4 * n).div_ceil(10).min(n - high);
    (high, medium, n - high - medium)
}

/// Priority for each position of a newest-first feed of `n` updates.
pub fn assign_priorities(n: usize) -> Vec<Priority> {
    let (high, medium, low) = priority_tiers(n);
    std::iter::repeat_n(Priority::High, high)
        .chain(std::iter::repeat_n(Priority::Medium, medium))
        .chain(std::iter::repeat_n(Priority::Low, low))
        .collect()
}

/// Display names keyed by id, with fallback labels for unknown references.
#[derive(Debug, Default, Clone)]
pub struct ReferenceNames {
    projects: HashMap<Uuid, Project>,
    partners: HashMap<Uuid, String>,
    tolls: HashMap<Uuid, String>,
}

impl ReferenceNames {
    pub fn new(projects: Vec<Project>, partners: Vec<CsrPartner>, tolls: Vec<Toll>) -> Self {
        Self {
            projects: projects.into_iter().map(|p| (p.id, p)).collect(),
            partners: partners.into_iter().map(|p| (p.id, p.name)).collect(),
            tolls: tolls.into_iter().map(|t| (t.id, t.name)).collect(),
        }
    }

    /// Fetch the names referenced by `updates`, including deactivated rows.
    pub async fn load(records: &dyn RecordStore, updates: &[RealTimeUpdate]) -> AppResult<Self> {
        let project_ids: BTreeSet<Uuid> = updates.iter().map(|u| u.project_id).collect();
        let projects = records
            .projects_by_ids(&project_ids.into_iter().collect::<Vec<_>>())
            .await?;

        let partner_ids: BTreeSet<Uuid> = updates
            .iter()
            .filter_map(|u| u.csr_partner_id)
            .chain(projects.iter().filter_map(|p| p.csr_partner_id))
            .collect();
        let toll_ids: BTreeSet<Uuid> = updates
            .iter()
            .filter_map(|u| u.toll_id)
            .chain(projects.iter().filter_map(|p| p.toll_id))
            .collect();

        let partners = records
            .csr_partners_by_ids(&partner_ids.into_iter().collect::<Vec<_>>())
            .await?;
        let tolls = records
            .tolls_by_ids(&toll_ids.into_iter().collect::<Vec<_>>())
            .await?;

        Ok(Self::new(projects, partners, tolls))
    }

    /// Names for an update. Partner and toll fall back to the project's own
    /// references when the update does not carry them.
    pub fn heading_for(&self, update: &RealTimeUpdate) -> ReportHeading {
        let project = self.projects.get(&update.project_id);

        let partner_id = update
            .csr_partner_id
            .or_else(|| project.and_then(|p| p.csr_partner_id));
        let toll_id = update.toll_id.or_else(|| project.and_then(|p| p.toll_id));

        ReportHeading {
            project_name: project
                .map(|p| p.name.clone())
                .unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
            csr_partner_name: lookup(&self.partners, partner_id),
            toll_name: lookup(&self.tolls, toll_id),
        }
    }
}

fn lookup(names: &HashMap<Uuid, String>, id: Option<Uuid>) -> String {
    id.and_then(|id| names.get(&id))
        .cloned()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Resolve the names for a single update.
pub async fn heading_for_update(
    records: &dyn RecordStore,
    update: &RealTimeUpdate,
) -> AppResult<ReportHeading> {
    let names = ReferenceNames::load(records, std::slice::from_ref(update)).await?;
    Ok(names.heading_for(update))
}

/// Assemble feed items from newest-first updates.
pub fn build_feed(updates: Vec<RealTimeUpdate>, names: &ReferenceNames) -> UpdateFeedResponse {
    let priorities = assign_priorities(updates.len());

    let updates: Vec<FeedItem> = updates
        .into_iter()
        .zip(priorities)
        .map(|(update, priority)| {
            let heading = names.heading_for(&update);
            FeedItem {
                update,
                project_name: heading.project_name,
                csr_partner_name: heading.csr_partner_name,
                toll_name: heading.toll_name,
                priority,
            }
        })
        .collect();

    UpdateFeedResponse {
        total: updates.len(),
        updates,
    }
}

/// Load the feed for a filter.
pub async fn load_feed(
    records: &dyn RecordStore,
    filter: &UpdateFeedFilter,
) -> AppResult<UpdateFeedResponse> {
    let updates = records.list_updates(filter).await?;
    if updates.is_empty() {
        return Ok(UpdateFeedResponse {
            updates: Vec::new(),
            total: 0,
        });
    }

    let names = ReferenceNames::load(records, &updates).await?;
    Ok(build_feed(updates, &names))
}

/// Link to an update's report, if one has been generated.
pub fn pdf_link(update: &RealTimeUpdate) -> AppResult<PdfLinkResponse> {
    match update.pdf_url {
        Some(ref url) => Ok(PdfLinkResponse {
            update_id: update.id,
            pdf_url: url.clone(),
        }),
        None => Err(AppError::NotFound(format!(
            "PDF for update {} (not generated yet)",
            update.update_code
        ))),
    }
}
