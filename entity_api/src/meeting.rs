//! CRUD operations for meetings table.

use super::error::Error;
use chrono::{DateTime, Utc};
use entity::meeting_status::MeetingStatus;
use entity::meetings::{ActiveModel, Column, Entity, Model};
use entity::Id;
use log::*;
use sea_orm::{entity::prelude::*, DatabaseConnection, QueryOrder, Set};

/// Creates a new meeting.
pub async fn create(db: &DatabaseConnection, meeting_model: Model) -> Result<Model, Error> {
    debug!("New Meeting Model to be inserted: {meeting_model:?}");

    let now = Utc::now();
    let meeting_active_model = ActiveModel {
        user_id: Set(meeting_model.user_id),
        title: Set(meeting_model.title),
        scheduled_at: Set(meeting_model.scheduled_at),
        duration_minutes: Set(meeting_model.duration_minutes),
        status: Set(meeting_model.status),
        meet_link: Set(meeting_model.meet_link),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(meeting_active_model.insert(db).await?)
}

/// Finds all meetings scheduled inside the half-open window
/// `[window_start, window_end)` whose status is one of `statuses`,
/// ordered by scheduled time.
pub async fn find_in_window(
    db: &DatabaseConnection,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    statuses: &[MeetingStatus],
) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::ScheduledAt.gte(window_start))
        .filter(Column::ScheduledAt.lt(window_end))
        .filter(Column::Status.is_in(statuses.iter().cloned()))
        .order_by_asc(Column::ScheduledAt)
        .all(db)
        .await?)
}

/// Finds a meeting by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: super::error::EntityApiErrorKind::RecordNotFound,
    })
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn find_in_window_returns_matching_meetings() -> Result<(), Error> {
        let now = chrono::Utc::now();
        let expected = Model {
            id: Id::new_v4(),
            user_id: Id::new_v4(),
            title: "Weekly check-in".to_string(),
            scheduled_at: now.into(),
            duration_minutes: 45,
            status: MeetingStatus::Scheduled,
            meet_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
            created_at: now.into(),
            updated_at: now.into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![expected.clone()]])
            .into_connection();

        let start = now - chrono::Duration::hours(1);
        let end = now + chrono::Duration::hours(1);
        let results = find_in_window(
            &db,
            start,
            end,
            &[MeetingStatus::Scheduled, MeetingStatus::Completed],
        )
        .await?;

        assert_eq!(results, vec![expected]);

        Ok(())
    }

    #[tokio::test]
    async fn find_by_id_errors_when_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let result = find_by_id(&db, Id::new_v4()).await;

        assert!(result.is_err());
    }
}
