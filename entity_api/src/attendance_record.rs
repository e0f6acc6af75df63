//! CRUD operations for attendance_records table.
//! The upsert here enforces the overwrite rules for pipeline-written records:
//! manual records are untouchable and confidence never goes down.

use super::error::Error;
use chrono::Utc;
use entity::attendance_records::{ActiveModel, Column, Entity, Model};
use entity::detection_method::DetectionMethod;
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, TryIntoModel,
};

/// A correlated attendance observation the sync pipeline wants to record.
#[derive(Debug, Clone)]
pub struct AutomaticAttendance {
    pub meeting_id: Id,
    pub user_id: Id,
    pub duration_minutes: Option<i32>,
    pub confidence_score: f64,
    pub meet_participant_id: Option<Id>,
    pub meet_join_time: Option<DateTimeWithTimeZone>,
    pub meet_leave_time: Option<DateTimeWithTimeZone>,
}

/// What the upsert did with the observation.
#[derive(Debug)]
pub enum UpsertOutcome {
    Created(Model),
    Updated(Model),
    /// The existing record won; nothing was written
    Unchanged(Model),
}

/// Finds the attendance record for `(meeting_id, user_id)`, if one exists.
pub async fn find_by_meeting_and_user(
    db: &DatabaseConnection,
    meeting_id: Id,
    user_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::MeetingId.eq(meeting_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// Inserts or updates the attendance record for a correlated participant.
///
/// At most one record exists per `(meeting, user)`. An existing record is
/// only replaced when it accepts the new observation: manual records never
/// do, automatic records only for an equal-or-higher confidence score.
pub async fn upsert_automatic(
    db: &DatabaseConnection,
    attendance: AutomaticAttendance,
) -> Result<UpsertOutcome, Error> {
    let existing = find_by_meeting_and_user(db, attendance.meeting_id, attendance.user_id).await?;
    let now = Utc::now();

    match existing {
        Some(existing) => {
            if !existing.accepts_automatic(attendance.confidence_score) {
                debug!(
                    "Attendance for meeting {} user {} kept: existing {} at {:.2} beats {:.2}",
                    existing.meeting_id,
                    existing.user_id,
                    existing.detection_method,
                    existing.confidence_score,
                    attendance.confidence_score
                );
                return Ok(UpsertOutcome::Unchanged(existing));
            }

            let active_model = ActiveModel {
                id: Unchanged(existing.id),
                meeting_id: Unchanged(existing.meeting_id),
                user_id: Unchanged(existing.user_id),
                attended: Set(true),
                duration_minutes: Set(attendance.duration_minutes),
                confidence_score: Set(attendance.confidence_score),
                detection_method: Set(DetectionMethod::AutomaticMeet),
                meet_participant_id: Set(attendance.meet_participant_id),
                meet_join_time: Set(attendance.meet_join_time),
                meet_leave_time: Set(attendance.meet_leave_time),
                created_at: Unchanged(existing.created_at),
                updated_at: Set(now.into()),
            };

            Ok(UpsertOutcome::Updated(
                active_model.update(db).await?.try_into_model()?,
            ))
        }
        None => {
            let active_model = ActiveModel {
                meeting_id: Set(attendance.meeting_id),
                user_id: Set(attendance.user_id),
                attended: Set(true),
                duration_minutes: Set(attendance.duration_minutes),
                confidence_score: Set(attendance.confidence_score),
                detection_method: Set(DetectionMethod::AutomaticMeet),
                meet_participant_id: Set(attendance.meet_participant_id),
                meet_join_time: Set(attendance.meet_join_time),
                meet_leave_time: Set(attendance.meet_leave_time),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };

            Ok(UpsertOutcome::Created(
                active_model.save(db).await?.try_into_model()?,
            ))
        }
    }
}
