//! CRUD operations for email_mappings table.

use super::error::Error;
use chrono::Utc;
use entity::email_mappings::{ActiveModel, Column, Entity, Model};
use log::*;
use sea_orm::{entity::prelude::*, DatabaseConnection, QueryOrder, Set};

/// Creates a new email mapping. The external email is stored lowercased.
pub async fn create(db: &DatabaseConnection, mapping_model: Model) -> Result<Model, Error> {
    debug!("New EmailMapping Model to be inserted: {mapping_model:?}");

    let now = Utc::now();
    let mapping_active_model = ActiveModel {
        external_email: Set(mapping_model.external_email.to_lowercase()),
        user_id: Set(mapping_model.user_id),
        confidence_level: Set(mapping_model.confidence_level),
        note: Set(mapping_model.note),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(mapping_active_model.insert(db).await?)
}

/// Loads every mapping, ordered by external email for determinism.
pub async fn all(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(Entity::find()
        .order_by_asc(Column::ExternalEmail)
        .all(db)
        .await?)
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use entity::confidence_level::ConfidenceLevel;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn all_returns_every_mapping() -> Result<(), Error> {
        let now = chrono::Utc::now();
        let mapping = Model {
            id: entity::Id::new_v4(),
            external_email: "alice.personal@gmail.com".to_string(),
            user_id: entity::Id::new_v4(),
            confidence_level: ConfidenceLevel::High,
            note: None,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![mapping.clone()]])
            .into_connection();

        let results = all(&db).await?;

        assert_eq!(results, vec![mapping]);

        Ok(())
    }
}
