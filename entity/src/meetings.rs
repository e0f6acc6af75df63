//! SeaORM Entity for meetings table.
//! Scheduled accountability meetings that attendance is recorded against.

use crate::meeting_status::MeetingStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "cadence_platform", table_name = "meetings")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    /// Member the meeting belongs to
    pub user_id: Id,

    pub title: String,

    /// Scheduled start time
    pub scheduled_at: DateTimeWithTimeZone,

    /// Planned length of the meeting
    pub duration_minutes: i32,

    pub status: MeetingStatus,

    /// Google Meet link when one was captured at scheduling time
    pub meet_link: Option<String>,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,

    #[sea_orm(has_many = "super::meet_sessions::Entity")]
    MeetSessions,

    #[sea_orm(has_many = "super::attendance_records::Entity")]
    AttendanceRecords,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
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
