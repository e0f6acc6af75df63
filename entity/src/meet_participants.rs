//! SeaORM Entity for meet_participants table.
//! Raw per-person dossier for a meet session, recorded whether or not the
//! participant could be matched to a member.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "cadence_platform", table_name = "meet_participants")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub meet_session_id: Id,

    /// Email as reported by the audit log, lowercased
    pub participant_email: String,

    pub joined_at: Option<DateTimeWithTimeZone>,

    pub left_at: Option<DateTimeWithTimeZone>,

    /// Total minutes in the call, summed across reconnects
    pub duration_minutes: Option<i32>,

    /// Device type reported by Meet (e.g. "web", "android")
    pub device_type: Option<String>,

    /// Whether the audit log flagged this participant as outside the workspace
    pub is_external: bool,

    /// Times the participant rejoined after dropping
    pub reconnect_count: i32,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::meet_sessions::Entity",
        from = "Column::MeetSessionId",
        to = "super::meet_sessions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    MeetSessions,

    #[sea_orm(has_many = "super::attendance_records::Entity")]
    AttendanceRecords,
}

impl Related<super::meet_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeetSessions.def()
    }
}

impl Related<super::attendance_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
