//! Reference entities used for filtering, cascading dropdowns and display names.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{csr_partner, csr_partner_toll, project};

/// A funded program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csr_partner_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toll_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A corporate sponsor funding one or more projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CsrPartner {
    pub id: Uuid,
    pub name: String,
}

/// A subcompany (toll) under a CSR partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Toll {
    pub id: Uuid,
    pub csr_partner_id: Uuid,
    pub name: String,
}

impl From<project::Model> for Project {
    fn from(m: project::Model) -> Self {
        Project {
            id: m.id,
            name: m.name,
            project_code: m.project_code,
            csr_partner_id: m.csr_partner_id,
            toll_id: m.toll_id,
            location: m.location,
        }
    }
}

impl From<csr_partner::Model> for CsrPartner {
    fn from(m: csr_partner::Model) -> Self {
        CsrPartner {
            id: m.id,
            name: m.name,
        }
    }
}

impl From<csr_partner_toll::Model> for Toll {
    fn from(m: csr_partner_toll::Model) -> Self {
        Toll {
            id: m.id,
            csr_partner_id: m.csr_partner_id,
            name: m.toll_name,
        }
    }
}

/// Query parameters for listing projects.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProjectQuery {
    #[serde(default)]
    pub csr_partner_id: Option<Uuid>,
    #[serde(default)]
    pub toll_id: Option<Uuid>,
}

/// Query parameters for listing tolls.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TollQuery {
    #[serde(default)]
    pub csr_partner_id: Option<Uuid>,
}

/// Current partner → toll → project selection of the update form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CascadeSelection {
    #[serde(default)]
    pub csr_partner_id: Option<Uuid>,
    #[serde(default)]
    pub toll_id: Option<Uuid>,
    #[serde(default)]
    pub project_id: Option<Uuid>,
}

/// Dropdown options for a selection, plus the selection with stale choices cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CascadeOptions {
    pub csr_partners: Vec<CsrPartner>,
    pub tolls: Vec<Toll>,
    pub projects: Vec<Project>,
    pub selection: CascadeSelection,
}
