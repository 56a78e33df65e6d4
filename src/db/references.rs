//! Read-only queries for projects, CSR partners and tolls.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::entity::csr_partner::{self, Entity as CsrPartnerEntity};
use crate::entity::csr_partner_toll::{self, Entity as TollEntity};
use crate::entity::project::{self, Entity as ProjectEntity};
use crate::error::{AppError, AppResult};
use crate::models::{CsrPartner, Project, ProjectQuery, Toll};

use super::DbPool;

impl DbPool {
    /// List active CSR partners by name.
    pub async fn list_csr_partners(&self) -> AppResult<Vec<CsrPartner>> {
        let rows = CsrPartnerEntity::find()
            .filter(csr_partner::Column::IsActive.eq(true))
            .order_by_asc(csr_partner::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list CSR partners: {}", e)))?;

        Ok(rows.into_iter().map(CsrPartner::from).collect())
    }

    /// List active tolls, optionally restricted to one partner.
    pub async fn list_tolls(&self, csr_partner_id: Option<Uuid>) -> AppResult<Vec<Toll>> {
        let mut select = TollEntity::find().filter(csr_partner_toll::Column::IsActive.eq(true));

        if let Some(partner_id) = csr_partner_id {
            select = select.filter(csr_partner_toll::Column::CsrPartnerId.eq(partner_id));
        }

        let rows = select
            .order_by_asc(csr_partner_toll::Column::TollName)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list tolls: {}", e)))?;

        Ok(rows.into_iter().map(Toll::from).collect())
    }

    /// List active projects. A toll filter takes precedence over a partner filter.
    pub async fn list_projects(&self, query: &ProjectQuery) -> AppResult<Vec<Project>> {
        let mut select = ProjectEntity::find().filter(project::Column::IsActive.eq(true));

        if let Some(toll_id) = query.toll_id {
            select = select.filter(project::Column::TollId.eq(toll_id));
        } else if let Some(partner_id) = query.csr_partner_id {
            select = select.filter(project::Column::CsrPartnerId.eq(partner_id));
        }

        let rows = select
            .order_by_asc(project::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list projects: {}", e)))?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    /// Projects with the given ids, active or not.
    pub async fn projects_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Project>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = ProjectEntity::find()
            .filter(project::Column::Id.is_in(ids.iter().copied()))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get projects: {}", e)))?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    /// CSR partners with the given ids, active or not.
    pub async fn csr_partners_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<CsrPartner>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = CsrPartnerEntity::find()
            .filter(csr_partner::Column::Id.is_in(ids.iter().copied()))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get CSR partners: {}", e)))?;

        Ok(rows.into_iter().map(CsrPartner::from).collect())
    }

    /// Tolls with the given ids, active or not.
    pub async fn tolls_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Toll>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = TollEntity::find()
            .filter(csr_partner_toll::Column::Id.is_in(ids.iter().copied()))
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get tolls: {}", e)))?;

        Ok(rows.into_iter().map(Toll::from).collect())
    }
}
