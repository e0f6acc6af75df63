use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create the platform's schema
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS cadence_platform;")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("SET search_path TO cadence_platform, public;")
            .await?;

        // Grant the base DB user that will execute all platform queries
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    GRANT ALL PRIVILEGES ON DATABASE cadence TO cadence;
                    GRANT ALL ON SCHEMA cadence_platform TO cadence;

                    ALTER DEFAULT PRIVILEGES IN SCHEMA cadence_platform GRANT ALL ON TABLES TO cadence;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA cadence_platform GRANT ALL ON SEQUENCES TO cadence;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA cadence_platform GRANT ALL ON FUNCTIONS TO cadence;
                END $$;
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Revoke default privileges first
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DO $$ BEGIN
                    ALTER DEFAULT PRIVILEGES IN SCHEMA cadence_platform REVOKE ALL ON FUNCTIONS FROM cadence;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA cadence_platform REVOKE ALL ON SEQUENCES FROM cadence;
                    ALTER DEFAULT PRIVILEGES IN SCHEMA cadence_platform REVOKE ALL ON TABLES FROM cadence;
                    REVOKE ALL ON SCHEMA cadence_platform FROM cadence;
                    REVOKE ALL PRIVILEGES ON DATABASE cadence FROM cadence;
                END $$;
            "#,
            )
            .await?;

        // Drop the schema (CASCADE will remove all objects in it)
        manager
            .get_connection()
            .execute_unprepared("DROP SCHEMA IF EXISTS cadence_platform CASCADE;")
            .await?;

        Ok(())
    }
}
