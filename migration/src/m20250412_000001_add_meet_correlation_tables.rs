use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create meet_sync_status enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE cadence_platform.meet_sync_status AS ENUM (
                    'pending',
                    'syncing',
                    'synced',
                    'no_data',
                    'failed'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE cadence_platform.meet_sync_status OWNER TO cadence")
            .await?;

        // Create confidence_level enum for curated email mappings
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE cadence_platform.confidence_level AS ENUM (
                    'high',
                    'medium',
                    'low'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE cadence_platform.confidence_level OWNER TO cadence")
            .await?;

        // Create detection_method enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE cadence_platform.detection_method AS ENUM (
                    'automatic_meet',
                    'manual'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TYPE cadence_platform.detection_method OWNER TO cadence")
            .await?;

        // Create meet_sessions table
        let create_sessions_sql = r#"
            CREATE TABLE IF NOT EXISTS cadence_platform.meet_sessions (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                meeting_id UUID NOT NULL
                    REFERENCES cadence_platform.meetings(id) ON DELETE CASCADE,
                meet_code VARCHAR(64) NOT NULL,
                meet_link TEXT,
                sync_status cadence_platform.meet_sync_status NOT NULL DEFAULT 'pending',
                last_sync_at TIMESTAMPTZ,
                sync_error TEXT,
                started_at TIMESTAMPTZ,
                ended_at TIMESTAMPTZ,
                duration_minutes INTEGER,
                participant_count INTEGER NOT NULL DEFAULT 0,
                total_participant_minutes INTEGER NOT NULL DEFAULT 0,
                organizer_email VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT meet_sessions_meeting_code_unique UNIQUE(meeting_id, meet_code)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_sessions_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE cadence_platform.meet_sessions OWNER TO cadence")
            .await?;

        // Create meet_participants table (one row per observed participant)
        let create_participants_sql = r#"
            CREATE TABLE IF NOT EXISTS cadence_platform.meet_participants (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                meet_session_id UUID NOT NULL
                    REFERENCES cadence_platform.meet_sessions(id) ON DELETE CASCADE,
                participant_email VARCHAR(255) NOT NULL,
                joined_at TIMESTAMPTZ,
                left_at TIMESTAMPTZ,
                duration_minutes INTEGER,
                device_type VARCHAR(50),
                is_external BOOLEAN NOT NULL DEFAULT FALSE,
                reconnect_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT meet_participants_session_email_unique UNIQUE(meet_session_id, participant_email)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_participants_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE cadence_platform.meet_participants OWNER TO cadence")
            .await?;

        // Create email_mappings table (curated external-address mappings)
        let create_mappings_sql = r#"
            CREATE TABLE IF NOT EXISTS cadence_platform.email_mappings (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                external_email VARCHAR(255) NOT NULL,
                user_id UUID NOT NULL
                    REFERENCES cadence_platform.users(id) ON DELETE CASCADE,
                confidence_level cadence_platform.confidence_level NOT NULL DEFAULT 'high',
                note TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                CONSTRAINT email_mappings_external_email_unique UNIQUE(external_email)
            )
        "#;

        manager
            .get_connection()
            .execute_unprepared(create_mappings_sql)
            .await?;

        manager
            .get_connection()
            .execute_unprepared("ALTER TABLE cadence_platform.email_mappings OWNER TO cadence")
            .await?;

        // Extend attendance_records with the correlation columns
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE cadence_platform.attendance_records
                 ADD COLUMN IF NOT EXISTS confidence_score DOUBLE PRECISION NOT NULL DEFAULT 1.0,
                 ADD COLUMN IF NOT EXISTS detection_method cadence_platform.detection_method NOT NULL DEFAULT 'manual',
                 ADD COLUMN IF NOT EXISTS meet_participant_id UUID
                     REFERENCES cadence_platform.meet_participants(id) ON DELETE SET NULL,
                 ADD COLUMN IF NOT EXISTS meet_join_time TIMESTAMPTZ,
                 ADD COLUMN IF NOT EXISTS meet_leave_time TIMESTAMPTZ",
            )
            .await?;

        // Create indexes for efficient querying
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_meet_sessions_meeting
                 ON cadence_platform.meet_sessions(meeting_id)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_meet_sessions_sync_status
                 ON cadence_platform.meet_sessions(sync_status)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_meet_participants_session
                 ON cadence_platform.meet_participants(meet_session_id)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS idx_email_mappings_user
                 ON cadence_platform.email_mappings(user_id)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Remove the correlation columns before the tables they reference
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE cadence_platform.attendance_records
                 DROP COLUMN IF EXISTS meet_leave_time,
                 DROP COLUMN IF EXISTS meet_join_time,
                 DROP COLUMN IF EXISTS meet_participant_id,
                 DROP COLUMN IF EXISTS detection_method,
                 DROP COLUMN IF EXISTS confidence_score",
            )
            .await?;

        // Drop tables in reverse order of creation (respecting foreign key dependencies)
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS cadence_platform.email_mappings")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS cadence_platform.meet_participants")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS cadence_platform.meet_sessions")
            .await?;

        // Drop enum types
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS cadence_platform.detection_method")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS cadence_platform.confidence_level")
            .await?;

        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS cadence_platform.meet_sync_status")
            .await?;

        Ok(())
    }
}
