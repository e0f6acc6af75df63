use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create meeting_status enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE cadence_platform.meeting_status AS ENUM (
                    'scheduled',
                    'in_progress',
                    'completed',
                    'canceled'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE cadence_platform.meeting_status OWNER TO cadence")
            .await?;

        // Create users table (the member directory)
        let create_users_sql = r#"
            CREATE TABLE IF NOT EXISTS cadence_platform.users (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                email VARCHAR(255) NOT NULL,
                first_name VARCHAR(255),
                last_name VARCHAR(255),
                display_name VARCHAR(255),
                timezone VARCHAR(50) NOT NULL DEFAULT 'UTC',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT users_email_unique UNIQUE(email)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_users_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE cadence_platform.users OWNER TO cadence")
            .await?;

        // Create meetings table
        let create_meetings_sql = r#"
            CREATE TABLE IF NOT EXISTS cadence_platform.meetings (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                user_id UUID NOT NULL
                    REFERENCES cadence_platform.users(id) ON DELETE CASCADE,
                title VARCHAR(255) NOT NULL,
                scheduled_at TIMESTAMPTZ NOT NULL,
                duration_minutes INTEGER NOT NULL,
                status cadence_platform.meeting_status NOT NULL DEFAULT 'scheduled',
                meet_link TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_meetings_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE cadence_platform.meetings OWNER TO cadence")
            .await?;

        // Create attendance_records table; the correlation columns arrive in
        // a later migration
        let create_attendance_sql = r#"
            CREATE TABLE IF NOT EXISTS cadence_platform.attendance_records (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                meeting_id UUID NOT NULL
                    REFERENCES cadence_platform.meetings(id) ON DELETE CASCADE,
                user_id UUID NOT NULL
                    REFERENCES cadence_platform.users(id) ON DELETE CASCADE,
                attended BOOLEAN NOT NULL DEFAULT TRUE,
                duration_minutes INTEGER,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT attendance_records_meeting_user_unique UNIQUE(meeting_id, user_id)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_attendance_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE cadence_platform.attendance_records OWNER TO cadence")
            .await?;

        // Create indexes for efficient querying
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_meetings_scheduled_at
                 ON cadence_platform.meetings(scheduled_at)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_meetings_user
                 ON cadence_platform.meetings(user_id)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_attendance_records_meeting
                 ON cadence_platform.attendance_records(meeting_id)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop tables in reverse order of creation (respecting foreign key dependencies)
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS cadence_platform.attendance_records")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS cadence_platform.meetings")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS cadence_platform.users")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS cadence_platform.meeting_status")
            .await?;

        Ok(())
    }
}
