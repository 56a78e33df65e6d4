//! Migration: Create reference tables and shared trigger function.
//!
//! CSR partners own tolls; projects optionally hang off a partner and toll.
//! These rows are maintained by the program team and only read by the update flow.

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
                -- Shared trigger function for updated_at
                CREATE OR REPLACE FUNCTION update_updated_at_column()
                RETURNS TRIGGER AS $$
                BEGIN
                    NEW.updated_at = NOW();
                    RETURN NEW;
                END;
                $$ LANGUAGE plpgsql;

                CREATE TABLE csr_partners (
                    id UUID PRIMARY KEY,
                    name VARCHAR(255) NOT NULL,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE TABLE csr_partner_tolls (
                    id UUID PRIMARY KEY,
                    csr_partner_id UUID NOT NULL REFERENCES csr_partners(id) ON DELETE CASCADE,
                    toll_name VARCHAR(255) NOT NULL,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_csr_partner_tolls_partner ON csr_partner_tolls(csr_partner_id)
                    WHERE is_active;

                CREATE TABLE projects (
                    id UUID PRIMARY KEY,
                    name VARCHAR(255) NOT NULL,
                    project_code VARCHAR(64),
                    csr_partner_id UUID REFERENCES csr_partners(id) ON DELETE SET NULL,
                    toll_id UUID REFERENCES csr_partner_tolls(id) ON DELETE SET NULL,
                    location VARCHAR(255),
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_projects_partner ON projects(csr_partner_id) WHERE is_active;
                CREATE INDEX idx_projects_toll ON projects(toll_id) WHERE is_active;

                CREATE TRIGGER update_csr_partners_updated_at
                    BEFORE UPDATE ON csr_partners
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TRIGGER update_csr_partner_tolls_updated_at
                    BEFORE UPDATE ON csr_partner_tolls
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();

                CREATE TRIGGER update_projects_updated_at
                    BEFORE UPDATE ON projects
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
                DROP TABLE IF EXISTS projects CASCADE;
                DROP TABLE IF EXISTS csr_partner_tolls CASCADE;
                DROP TABLE IF EXISTS csr_partners CASCADE;
                DROP FUNCTION IF EXISTS update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }
}
