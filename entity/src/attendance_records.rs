//! SeaORM Entity for attendance_records table.
//! The authoritative "did this member attend this meeting" row. At most one
//! per (meeting, user).

use crate::detection_method::DetectionMethod;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "cadence_platform", table_name = "attendance_records")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    pub meeting_id: Id,

    pub user_id: Id,

    pub attended: bool,

    /// Minutes actually present, when known
    pub duration_minutes: Option<i32>,

    /// How sure we are the attendee really was this user, 0.0 to 1.0
    pub confidence_score: f64,

    pub detection_method: DetectionMethod,

    /// Participant dossier this record was derived from, for automatic records
    pub meet_participant_id: Option<Id>,

    pub meet_join_time: Option<DateTimeWithTimeZone>,

    pub meet_leave_time: Option<DateTimeWithTimeZone>,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether the sync pipeline may replace this record with a match at
    /// `confidence`. Manual records are off limits, and an automatic record
    /// only yields to an equal-or-better match.
    pub fn accepts_automatic(&self, confidence: f64) -> bool {
        self.detection_method != DetectionMethod::Manual && confidence >= self.confidence_score
    }
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

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,

    #[sea_orm(
        belongs_to = "super::meet_participants::Entity",
        from = "Column::MeetParticipantId",
        to = "super::meet_participants::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    MeetParticipants,
}

impl Related<super::meetings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetings.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::meet_participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeetParticipants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
