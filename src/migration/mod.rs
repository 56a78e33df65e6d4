//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_reference_tables;
mod m20251001_000002_create_real_time_updates;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_reference_tables::Migration),
            Box::new(m20251001_000002_create_real_time_updates::Migration),
        ]
    }
}
