//! The record store seam.
//!
//! Handlers and services talk to `dyn RecordStore`; `DbPool` is the PostgreSQL
//! implementation. Reference entities are read-only through this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    CsrPartner, NewRealTimeUpdate, Project, ProjectQuery, RealTimeUpdate, Toll, UpdateFeedFilter,
};

use super::DbPool;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Cheap connectivity check for the readiness check.
    async fn ping(&self) -> AppResult<()>;

    async fn list_csr_partners(&self) -> AppResult<Vec<CsrPartner>>;
    async fn list_tolls(&self, csr_partner_id: Option<Uuid>) -> AppResult<Vec<Toll>>;
    async fn list_projects(&self, query: &ProjectQuery) -> AppResult<Vec<Project>>;
    /// Lookups by id ignore `is_active`, so history keeps its names.
    async fn projects_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Project>>;
    async fn csr_partners_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<CsrPartner>>;
    async fn tolls_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Toll>>;

    async fn insert_update(&self, update: NewRealTimeUpdate) -> AppResult<RealTimeUpdate>;
    async fn get_update(&self, id: Uuid) -> AppResult<Option<RealTimeUpdate>>;
    /// Public updates matching the filter, newest first.
    async fn list_updates(&self, filter: &UpdateFeedFilter) -> AppResult<Vec<RealTimeUpdate>>;
    async fn list_updates_missing_pdf(
        &self,
        created_before: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<RealTimeUpdate>>;
    async fn set_update_pdf_url(
        &self,
        id: Uuid,
        pdf_url: Option<String>,
    ) -> AppResult<RealTimeUpdate>;
    async fn mark_update_sent(&self, id: Uuid) -> AppResult<RealTimeUpdate>;
    async fn hide_update(&self, id: Uuid) -> AppResult<RealTimeUpdate>;
}

#[async_trait]
impl RecordStore for DbPool {
    async fn ping(&self) -> AppResult<()> {
        let stmt = sea_orm::Statement::from_string(
            sea_orm::DatabaseBackend::Postgres,
            "SELECT 1".to_owned(),
        );
        self.connection()
            .query_one_raw(stmt)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(format!("Ping failed: {}", e)))
    }

    async fn list_csr_partners(&self) -> AppResult<Vec<CsrPartner>> {
        DbPool::list_csr_partners(self).await
    }

    async fn list_tolls(&self, csr_partner_id: Option<Uuid>) -> AppResult<Vec<Toll>> {
        DbPool::list_tolls(self, csr_partner_id).await
    }

    async fn list_projects(&self, query: &ProjectQuery) -> AppResult<Vec<Project>> {
        DbPool::list_projects(self, query).await
    }

    async fn projects_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Project>> {
        DbPool::projects_by_ids(self, ids).await
    }

    async fn csr_partners_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<CsrPartner>> {
        DbPool::csr_partners_by_ids(self, ids).await
    }

    async fn tolls_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Toll>> {
        DbPool::tolls_by_ids(self, ids).await
    }

    async fn insert_update(&self, update: NewRealTimeUpdate) -> AppResult<RealTimeUpdate> {
        DbPool::insert_update(self, update).await
    }

    async fn get_update(&self, id: Uuid) -> AppResult<Option<RealTimeUpdate>> {
        DbPool::get_update(self, id).await
    }

    async fn list_updates(&self, filter: &UpdateFeedFilter) -> AppResult<Vec<RealTimeUpdate>> {
        DbPool::list_updates(self, filter).await
    }

    async fn list_updates_missing_pdf(
        &self,
        created_before: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<RealTimeUpdate>> {
        DbPool::list_updates_missing_pdf(self, created_before, limit).await
    }

    async fn set_update_pdf_url(
        &self,
        id: Uuid,
        pdf_url: Option<String>,
    ) -> AppResult<RealTimeUpdate> {
        DbPool::set_update_pdf_url(self, id, pdf_url).await
    }

    async fn mark_update_sent(&self, id: Uuid) -> AppResult<RealTimeUpdate> {
        DbPool::mark_update_sent(self, id).await
    }

    async fn hide_update(&self, id: Uuid) -> AppResult<RealTimeUpdate> {
        DbPool::hide_update(self, id).await
    }
}
