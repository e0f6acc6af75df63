pub use sea_orm_migration::prelude::*;

mod m20250218_000001_create_schema_and_base_setup;
mod m20250218_000002_create_scheduling_tables;
mod m20250412_000001_add_meet_correlation_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250218_000001_create_schema_and_base_setup::Migration),
            Box::new(m20250218_000002_create_scheduling_tables::Migration),
            Box::new(m20250412_000001_add_meet_correlation_tables::Migration),
        ]
    }
}
