//! Real-time update domain models and DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::real_time_update;

/// Maximum resident names on one update.
pub const MAX_RESIDENTS: usize = 6;

/// Update classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    #[default]
    Progress,
    Issue,
    Achievement,
    Milestone,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Issue => "issue",
            Self::Achievement => "achievement",
            Self::Milestone => "milestone",
        }
    }

    /// Parse case-insensitively; the dashboard sends "Progress", "Issue", ...
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "progress" => Some(Self::Progress),
            "issue" => Some(Self::Issue),
            "achievement" => Some(Self::Achievement),
            "milestone" => Some(Self::Milestone),
            _ => None,
        }
    }

    /// Label used on reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Progress => "Progress",
            Self::Issue => "Issue",
            Self::Achievement => "Achievement",
            Self::Milestone => "Milestone",
        }
    }
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted field visit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RealTimeUpdate {
    pub id: Uuid,
    /// Identity code generated at submission (`RTU-<millis>-<suffix>`).
    pub update_code: String,
    pub project_id: Uuid,
    pub csr_partner_id: Option<Uuid>,
    pub toll_id: Option<Uuid>,
    pub update_no: String,
    pub report_date: NaiveDate,
    pub location: Option<String>,
    pub day: Option<String>,
    pub tutor: Option<String>,
    pub filled_by: Option<String>,
    pub activity: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Up to six resident names.
    pub residents: Vec<String>,
    pub update_type: UpdateType,
    /// Public photo URLs in selection order.
    pub photos: Vec<String>,
    /// Public URL of the generated report, once exported.
    pub pdf_url: Option<String>,
    pub is_public: bool,
    pub is_sent_to_client: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a new update row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRealTimeUpdate {
    pub update_code: String,
    pub project_id: Uuid,
    pub csr_partner_id: Option<Uuid>,
    pub toll_id: Option<Uuid>,
    pub update_no: String,
    pub report_date: NaiveDate,
    pub location: Option<String>,
    pub day: Option<String>,
    pub tutor: Option<String>,
    pub filled_by: Option<String>,
    pub activity: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub residents: Vec<String>,
    pub update_type: UpdateType,
    pub photos: Vec<String>,
}

impl NewRealTimeUpdate {
    /// Materialize the row as it will read back after insertion.
    pub fn into_update(self, id: Uuid, now: DateTime<Utc>) -> RealTimeUpdate {
        RealTimeUpdate {
            id,
            update_code: self.update_code,
            project_id: self.project_id,
            csr_partner_id: self.csr_partner_id,
            toll_id: self.toll_id,
            update_no: self.update_no,
            report_date: self.report_date,
            location: self.location,
            day: self.day,
            tutor: self.tutor,
            filled_by: self.filled_by,
            activity: self.activity,
            title: self.title,
            description: self.description,
            residents: self.residents,
            update_type: self.update_type,
            photos: self.photos,
            pdf_url: None,
            is_public: true,
            is_sent_to_client: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Decode a JSONB string array, tolerating malformed content.
pub(crate) fn strings_from_json(value: &JsonValue) -> Vec<String> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

impl From<real_time_update::Model> for RealTimeUpdate {
    fn from(m: real_time_update::Model) -> Self {
        RealTimeUpdate {
            id: m.id,
            residents: strings_from_json(&m.residents),
            photos: strings_from_json(&m.photos),
            update_type: UpdateType::parse(&m.update_type).unwrap_or_default(),
            update_code: m.update_code,
            project_id: m.project_id,
            csr_partner_id: m.csr_partner_id,
            toll_id: m.toll_id,
            update_no: m.update_no,
            report_date: m.report_date,
            location: m.location,
            day: m.day,
            tutor: m.tutor,
            filled_by: m.filled_by,
            activity: m.activity,
            title: m.title,
            description: m.description,
            pdf_url: m.pdf_url,
            is_public: m.is_public,
            is_sent_to_client: m.is_sent_to_client,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Scope and date-range filter for the update feed.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateFeedFilter {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub csr_partner_id: Option<Uuid>,
    #[serde(default)]
    pub toll_id: Option<Uuid>,
    /// First report date included (inclusive).
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Last report date included (inclusive).
    #[serde(default)]
    pub to: Option<NaiveDate>,
    /// Maximum updates returned (default 100, max 500).
    #[serde(default)]
    pub limit: Option<u64>,
}

impl UpdateFeedFilter {
    pub fn clamped_limit(&self) -> u64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }

    /// Whether an update falls inside this filter.
    pub fn matches(&self, update: &RealTimeUpdate) -> bool {
        update.is_public
            && self.project_id.is_none_or(|id| update.project_id == id)
            && self
                .csr_partner_id
                .is_none_or(|id| update.csr_partner_id == Some(id))
            && self.toll_id.is_none_or(|id| update.toll_id == Some(id))
            && self.from.is_none_or(|d| update.report_date >= d)
            && self.to.is_none_or(|d| update.report_date <= d)
    }
}

/// Synthetic display tier assigned by feed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One entry of the update feed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FeedItem {
    #[serde(flatten)]
    pub update: RealTimeUpdate,
    pub project_name: String,
    pub csr_partner_name: String,
    pub toll_name: String,
    pub priority: Priority,
}

/// Update feed response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateFeedResponse {
    pub updates: Vec<FeedItem>,
    pub total: usize,
}

/// Response after submitting an update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmitUpdateResponse {
    pub update: RealTimeUpdate,
    /// Photos attached to the submission.
    pub photos_selected: usize,
    /// Photos stored successfully (failed uploads are dropped).
    pub photos_uploaded: usize,
    /// Whether the report PDF was exported during submission.
    pub pdf_generated: bool,
}

/// Link to a generated report PDF.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PdfLinkResponse {
    pub update_id: Uuid,
    pub pdf_url: String,
}
