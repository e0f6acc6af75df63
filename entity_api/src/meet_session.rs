//! CRUD operations for meet_sessions table.
//! All sync status transitions go through here so callers cannot skip states.

use super::error::{EntityApiErrorKind, Error};
use chrono::Utc;
use entity::meet_sessions::{ActiveModel, Column, Entity, Model};
use entity::meet_sync_status::MeetSyncStatus;
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, QueryOrder, TryIntoModel,
};

/// Outcome of trying to claim a session for a sync pass.
#[derive(Debug)]
pub enum SyncClaim {
    /// The caller owns this sync pass now
    Claimed(Model),
    /// Another pass already has the session; leave it alone
    AlreadySyncing(Model),
}

/// Aggregate call statistics written back when a sync pass succeeds.
#[derive(Debug, Clone, Default)]
pub struct SessionTotals {
    pub started_at: Option<DateTimeWithTimeZone>,
    pub ended_at: Option<DateTimeWithTimeZone>,
    pub duration_minutes: Option<i32>,
    pub participant_count: i32,
    pub total_participant_minutes: i32,
    pub organizer_email: Option<String>,
}

/// Creates a new meet session in the pending state.
pub async fn create(
    db: &DatabaseConnection,
    meeting_id: Id,
    meet_code: &str,
    meet_link: Option<String>,
) -> Result<Model, Error> {
    debug!("Creating new meet session for meeting {meeting_id} with code {meet_code}");

    let now = Utc::now();

    let active_model = ActiveModel {
        meeting_id: Set(meeting_id),
        meet_code: Set(meet_code.to_string()),
        meet_link: Set(meet_link),
        sync_status: Set(MeetSyncStatus::Pending),
        participant_count: Set(0),
        total_participant_minutes: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(active_model.save(db).await?.try_into_model()?)
}

/// Finds a meet session by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

/// Finds the most recently created session for a meeting, if any.
pub async fn find_latest_by_meeting_id(
    db: &DatabaseConnection,
    meeting_id: Id,
) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::MeetingId.eq(meeting_id))
        .order_by_desc(Column::CreatedAt)
        .one(db)
        .await?)
}

/// Returns the existing session for `(meeting_id, meet_code)` or creates one.
pub async fn find_or_create(
    db: &DatabaseConnection,
    meeting_id: Id,
    meet_code: &str,
    meet_link: Option<String>,
) -> Result<Model, Error> {
    let existing = Entity::find()
        .filter(Column::MeetingId.eq(meeting_id))
        .filter(Column::MeetCode.eq(meet_code))
        .one(db)
        .await?;

    match existing {
        Some(session) => Ok(session),
        None => create(db, meeting_id, meet_code, meet_link).await,
    }
}

/// Tries to move a session into the syncing state. Sessions already syncing
/// are reported as such instead of being re-claimed.
pub async fn claim_for_sync(db: &DatabaseConnection, id: Id) -> Result<SyncClaim, Error> {
    let existing = find_by_id(db, id).await?;

    if existing.sync_status == MeetSyncStatus::Syncing {
        debug!("Meet session {id} is already being synced");
        return Ok(SyncClaim::AlreadySyncing(existing));
    }

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        meeting_id: Unchanged(existing.meeting_id),
        meet_code: Unchanged(existing.meet_code),
        meet_link: Unchanged(existing.meet_link),
        sync_status: Set(MeetSyncStatus::Syncing),
        last_sync_at: Unchanged(existing.last_sync_at),
        sync_error: Unchanged(existing.sync_error),
        started_at: Unchanged(existing.started_at),
        ended_at: Unchanged(existing.ended_at),
        duration_minutes: Unchanged(existing.duration_minutes),
        participant_count: Unchanged(existing.participant_count),
        total_participant_minutes: Unchanged(existing.total_participant_minutes),
        organizer_email: Unchanged(existing.organizer_email),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(Utc::now().into()),
    };

    Ok(SyncClaim::Claimed(
        active_model.update(db).await?.try_into_model()?,
    ))
}

/// Records a successful sync: stores aggregates and clears any prior error.
pub async fn mark_synced(
    db: &DatabaseConnection,
    id: Id,
    totals: SessionTotals,
) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    let now = Utc::now();

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        meeting_id: Unchanged(existing.meeting_id),
        meet_code: Unchanged(existing.meet_code),
        meet_link: Unchanged(existing.meet_link),
        sync_status: Set(MeetSyncStatus::Synced),
        last_sync_at: Set(Some(now.into())),
        sync_error: Set(None),
        started_at: Set(totals.started_at),
        ended_at: Set(totals.ended_at),
        duration_minutes: Set(totals.duration_minutes),
        participant_count: Set(totals.participant_count),
        total_participant_minutes: Set(totals.total_participant_minutes),
        organizer_email: Set(totals.organizer_email),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(now.into()),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}

/// Records a sync that completed but found no audit events for the session.
pub async fn mark_no_data(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    let now = Utc::now();

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        meeting_id: Unchanged(existing.meeting_id),
        meet_code: Unchanged(existing.meet_code),
        meet_link: Unchanged(existing.meet_link),
        sync_status: Set(MeetSyncStatus::NoData),
        last_sync_at: Set(Some(now.into())),
        sync_error: Set(None),
        started_at: Unchanged(existing.started_at),
        ended_at: Unchanged(existing.ended_at),
        duration_minutes: Unchanged(existing.duration_minutes),
        participant_count: Unchanged(existing.participant_count),
        total_participant_minutes: Unchanged(existing.total_participant_minutes),
        organizer_email: Unchanged(existing.organizer_email),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(now.into()),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}

/// Records a failed sync attempt along with what went wrong.
pub async fn mark_failed(db: &DatabaseConnection, id: Id, message: &str) -> Result<Model, Error> {
    let existing = find_by_id(db, id).await?;
    let now = Utc::now();

    let active_model = ActiveModel {
        id: Unchanged(existing.id),
        meeting_id: Unchanged(existing.meeting_id),
        meet_code: Unchanged(existing.meet_code),
        meet_link: Unchanged(existing.meet_link),
        sync_status: Set(MeetSyncStatus::Failed),
        last_sync_at: Set(Some(now.into())),
        sync_error: Set(Some(message.to_string())),
        started_at: Unchanged(existing.started_at),
        ended_at: Unchanged(existing.ended_at),
        duration_minutes: Unchanged(existing.duration_minutes),
        participant_count: Unchanged(existing.participant_count),
        total_participant_minutes: Unchanged(existing.total_participant_minutes),
        organizer_email: Unchanged(existing.organizer_email),
        created_at: Unchanged(existing.created_at),
        updated_at: Set(now.into()),
    };

    Ok(active_model.update(db).await?.try_into_model()?)
}
