//! Database queries for real-time updates.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::entity::real_time_update::{self, ActiveModel, Entity as Update};
use crate::error::{AppError, AppResult};
use crate::models::{NewRealTimeUpdate, RealTimeUpdate, UpdateFeedFilter};

use super::DbPool;

impl DbPool {
    /// Insert a new update row.
    pub async fn insert_update(&self, update: NewRealTimeUpdate) -> AppResult<RealTimeUpdate> {
        let now = Utc::now();

        let model = ActiveModel {
            id: Set(Uuid::now_v7()),
            update_code: Set(update.update_code),
            project_id: Set(update.project_id),
            csr_partner_id: Set(update.csr_partner_id),
            toll_id: Set(update.toll_id),
            update_no: Set(update.update_no),
            report_date: Set(update.report_date),
            location: Set(update.location),
            day: Set(update.day),
            tutor: Set(update.tutor),
            filled_by: Set(update.filled_by),
            activity: Set(update.activity),
            title: Set(update.title),
            description: Set(update.description),
            residents: Set(JsonValue::from(update.residents)),
            update_type: Set(update.update_type.as_str().to_string()),
            photos: Set(JsonValue::from(update.photos)),
            pdf_url: Set(None), // filled in after export
            is_public: Set(true),
            is_sent_to_client: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = model
            .insert(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to insert update: {}", e)))?;

        Ok(result.into())
    }

    /// Get an update by ID, hidden or not.
    pub async fn get_update(&self, id: Uuid) -> AppResult<Option<RealTimeUpdate>> {
        let result = Update::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get update: {}", e)))?;

        Ok(result.map(RealTimeUpdate::from))
    }

    /// List public updates matching the filter, newest first.
    pub async fn list_updates(&self, filter: &UpdateFeedFilter) -> AppResult<Vec<RealTimeUpdate>> {
        let mut select = Update::find().filter(real_time_update::Column::IsPublic.eq(true));

        if let Some(project_id) = filter.project_id {
            select = select.filter(real_time_update::Column::ProjectId.eq(project_id));
        }
        if let Some(partner_id) = filter.csr_partner_id {
            select = select.filter(real_time_update::Column::CsrPartnerId.eq(partner_id));
        }
        if let Some(toll_id) = filter.toll_id {
            select = select.filter(real_time_update::Column::TollId.eq(toll_id));
        }
        if let Some(from) = filter.from {
            select = select.filter(real_time_update::Column::ReportDate.gte(from));
        }
        if let Some(to) = filter.to {
            select = select.filter(real_time_update::Column::ReportDate.lte(to));
        }

        let rows = select
            .order_by_desc(real_time_update::Column::CreatedAt)
            .limit(filter.clamped_limit())
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list updates: {}", e)))?;

        Ok(rows.into_iter().map(RealTimeUpdate::from).collect())
    }

    /// Public updates created before `created_before` that still have no PDF, oldest first.
    pub async fn list_updates_missing_pdf(
        &self,
        created_before: DateTime<Utc>,
        limit: u64,
    ) -> AppResult<Vec<RealTimeUpdate>> {
        let rows = Update::find()
            .filter(real_time_update::Column::IsPublic.eq(true))
            .filter(real_time_update::Column::PdfUrl.is_null())
            .filter(real_time_update::Column::CreatedAt.lt(created_before))
            .order_by_asc(real_time_update::Column::CreatedAt)
            .limit(limit)
            .all(self.connection())
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to list updates missing a PDF: {}", e))
            })?;

        Ok(rows.into_iter().map(RealTimeUpdate::from).collect())
    }

    /// Set or clear the generated PDF URL.
    pub async fn set_update_pdf_url(
        &self,
        id: Uuid,
        pdf_url: Option<String>,
    ) -> AppResult<RealTimeUpdate> {
        let mut active = self.find_update_model(id).await?;
        active.pdf_url = Set(pdf_url);
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to update PDF URL: {}", e)))?;

        Ok(result.into())
    }

    pub async fn mark_update_sent(&self, id: Uuid) -> AppResult<RealTimeUpdate> {
        let mut active = self.find_update_model(id).await?;
        active.is_sent_to_client = Set(true);
        active.updated_at = Set(Utc::now());

        let result = active.update(self.connection()).await.map_err(|e| {
            AppError::Database(format!("Failed to mark update as sent: {}", e))
        })?;

        Ok(result.into())
    }

    /// Soft delete: hide the update from the feed.
    pub async fn hide_update(&self, id: Uuid) -> AppResult<RealTimeUpdate> {
        let mut active = self.find_update_model(id).await?;
        active.is_public = Set(false);
        active.updated_at = Set(Utc::now());

        let result = active
            .update(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to hide update: {}", e)))?;

        Ok(result.into())
    }

    async fn find_update_model(&self, id: Uuid) -> AppResult<ActiveModel> {
        let model = Update::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get update: {}", e)))?
            .ok_or_else(|| AppError::NotFound(format!("Update {}", id)))?;

        Ok(model.into())
    }
}
