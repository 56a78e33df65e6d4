//! Real-time update entity for SeaORM.
//!
//! One field visit report. `residents` and `photos` are JSONB string arrays;
//! `pdf_url` is filled in after the report PDF has been exported.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "real_time_updates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub update_code: String,
    pub project_id: Uuid,
    pub csr_partner_id: Option<Uuid>,
    pub toll_id: Option<Uuid>,

    pub update_no: String,
    pub report_date: Date,
    pub location: Option<String>,
    pub day: Option<String>,
    pub tutor: Option<String>,
    pub filled_by: Option<String>,
    pub activity: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub residents: JsonValue,
    pub update_type: String,

    // Evidence
    #[sea_orm(column_type = "JsonBinary")]
    pub photos: JsonValue,
    pub pdf_url: Option<String>,

    // Visibility
    pub is_public: bool,
    pub is_sent_to_client: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
