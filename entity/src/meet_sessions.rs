//! SeaORM Entity for meet_sessions table.
//! One row per Google Meet call tied to a scheduled meeting. Tracks sync
//! progress against the Admin Reports audit log plus aggregate call stats.

use crate::meet_sync_status::MeetSyncStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "cadence_platform", table_name = "meet_sessions")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub meeting_id: Id,

    /// Normalized meet code (lowercase, no dashes), e.g. "abcdefghij"
    pub meet_code: String,

    /// Full Meet URL the code was taken from, when known
    pub meet_link: Option<String>,

    pub sync_status: MeetSyncStatus,

    /// When the last sync attempt finished, regardless of outcome
    pub last_sync_at: Option<DateTimeWithTimeZone>,

    /// Failure detail from the last sync attempt, cleared on success
    pub sync_error: Option<String>,

    /// Earliest observed join across all participants
    pub started_at: Option<DateTimeWithTimeZone>,

    /// Latest observed leave across all participants
    pub ended_at: Option<DateTimeWithTimeZone>,

    /// Wall-clock span of the call, from started_at to ended_at
    pub duration_minutes: Option<i32>,

    pub participant_count: i32,

    /// Sum of per-participant minutes in the call
    pub total_participant_minutes: i32,

    pub organizer_email: Option<String>,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meetings::Entity",
        from = "Column::MeetingId",
        to = "super::meetings::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Meetings,

    #[sea_orm(has_many = "super::meet_participants::Entity")]
    MeetParticipants,
}

impl Related<super::meetings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetings.def()
    }
}

impl Related<super::meet_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeetParticipants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
