//! CRUD operations for users table.

use super::error::Error;
use chrono::Utc;
use entity::users::{ActiveModel, Column, Entity, Model};
use log::*;
use sea_orm::{entity::prelude::*, DatabaseConnection, QueryOrder, Set};

/// Creates a new user. Emails are stored lowercased so lookups stay
/// case-insensitive.
pub async fn create(db: &DatabaseConnection, user_model: Model) -> Result<Model, Error> {
    debug!("New User Model to be inserted: {user_model:?}");

    let now = Utc::now();
    let user_active_model = ActiveModel {
        email: Set(user_model.email.to_lowercase()),
        first_name: Set(user_model.first_name),
        last_name: Set(user_model.last_name),
        display_name: Set(user_model.display_name),
        timezone: Set(user_model.timezone),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    };

    Ok(user_active_model.insert(db).await?)
}

/// Finds a user by email, ignoring case.
pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, Error> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email.to_lowercase()))
        .one(db)
        .await?)
}

/// Loads the entire member directory, ordered by email for determinism.
pub async fn all(db: &DatabaseConnection) -> Result<Vec<Model>, Error> {
    Ok(Entity::find().order_by_asc(Column::Email).all(db).await?)
}
