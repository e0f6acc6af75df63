//! CRUD operations for meet_participants table.

use super::error::Error;
use chrono::Utc;
use entity::meet_participants::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    DatabaseConnection, QueryOrder, TryIntoModel,
};

/// Observed activity for one participant in one meet session, already
/// aggregated across reconnects.
#[derive(Debug, Clone)]
pub struct ParticipantSummary {
    pub participant_email: String,
    pub joined_at: Option<DateTimeWithTimeZone>,
    pub left_at: Option<DateTimeWithTimeZone>,
    pub duration_minutes: Option<i32>,
    pub device_type: Option<String>,
    pub is_external: bool,
    pub reconnect_count: i32,
}

/// Inserts or refreshes the dossier row for `(meet_session_id, email)`.
/// Re-running a sync overwrites the previous observation wholesale.
pub async fn upsert(
    db: &DatabaseConnection,
    meet_session_id: Id,
    summary: ParticipantSummary,
) -> Result<Model, Error> {
    let email = summary.participant_email.to_lowercase();
    let now = Utc::now();

    let existing = Entity::find()
        .filter(Column::MeetSessionId.eq(meet_session_id))
        .filter(Column::ParticipantEmail.eq(email.clone()))
        .one(db)
        .await?;

    match existing {
        Some(existing) => {
            debug!("Refreshing meet participant {email} for session {meet_session_id}");

            let active_model = ActiveModel {
                id: Unchanged(existing.id),
                meet_session_id: Unchanged(existing.meet_session_id),
                participant_email: Unchanged(existing.participant_email),
                joined_at: Set(summary.joined_at),
                left_at: Set(summary.left_at),
                duration_minutes: Set(summary.duration_minutes),
                device_type: Set(summary.device_type),
                is_external: Set(summary.is_external),
                reconnect_count: Set(summary.reconnect_count),
                created_at: Unchanged(existing.created_at),
                updated_at: Set(now.into()),
            };

            Ok(active_model.update(db).await?.try_into_model()?)
        }
        None => {
            debug!("Recording meet participant {email} for session {meet_session_id}");

            let active_model = ActiveModel {
                meet_session_id: Set(meet_session_id),
                participant_email: Set(email),
                joined_at: Set(summary.joined_at),
                left_at: Set(summary.left_at),
                duration_minutes: Set(summary.duration_minutes),
                device_type: Set(summary.device_type),
                is_external: Set(summary.is_external),
                reconnect_count: Set(summary.reconnect_count),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            };

            Ok(active_model.save(db).await?.try_into_model()?)
        }
    }
}

/// Finds all participant dossiers for a session, earliest joiner first.
pub async fn find_by_session_id(
    db: &DatabaseConnection,
    meet_session_id: Id,
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::MeetSessionId.eq(meet_session_id))
        .order_by_asc(Column::JoinedAt)
        .all(db)
        .await?)
}
