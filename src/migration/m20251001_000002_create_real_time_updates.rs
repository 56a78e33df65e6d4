//! Migration: Create real_time_updates table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE real_time_updates (
                    id UUID PRIMARY KEY, -- UUIDv7 for time-ordered sorting
                    update_code VARCHAR(64) NOT NULL UNIQUE,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    csr_partner_id UUID REFERENCES csr_partners(id) ON DELETE SET NULL,
                    toll_id UUID REFERENCES csr_partner_tolls(id) ON DELETE SET NULL,

                    -- Report fields
                    update_no VARCHAR(64) NOT NULL,
                    report_date DATE NOT NULL,
                    location TEXT,
                    day TEXT,
                    tutor TEXT,
                    filled_by TEXT,
                    activity TEXT,
                    title TEXT,
                    description TEXT,
                    residents JSONB NOT NULL DEFAULT '[]'::jsonb
                        CHECK (jsonb_array_length(residents) <= 6),
                    update_type VARCHAR(20) NOT NULL DEFAULT 'progress'
                        CHECK (update_type IN ('progress', 'issue', 'achievement', 'milestone')),

                    -- Evidence
                    photos JSONB NOT NULL DEFAULT '[]'::jsonb, -- ordered public URLs
                    pdf_url TEXT,                              -- set after export

                    is_public BOOLEAN NOT NULL DEFAULT TRUE,
                    is_sent_to_client BOOLEAN NOT NULL DEFAULT FALSE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                -- Feed listing (public only, newest first)
                CREATE INDEX idx_real_time_updates_project ON real_time_updates(project_id, created_at DESC)
                    WHERE is_public;

                CREATE INDEX idx_real_time_updates_partner ON real_time_updates(csr_partner_id, created_at DESC)
                    WHERE is_public;

                -- PDF backfill scan
                CREATE INDEX idx_real_time_updates_missing_pdf ON real_time_updates(created_at)
                    WHERE is_public AND pdf_url IS NULL;

                CREATE TRIGGER update_real_time_updates_updated_at
                    BEFORE UPDATE ON real_time_updates
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_real_time_updates_updated_at ON real_time_updates;
                DROP TABLE IF EXISTS real_time_updates CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
