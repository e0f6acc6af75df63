use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a scheduled meeting.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Default, Serialize, DeriveActiveEnum,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "meeting_status")]
pub enum MeetingStatus {
    /// On the calendar but not yet started
    #[sea_orm(string_value = "scheduled")]
    #[default]
    Scheduled,
    /// Currently running
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    /// Finished normally
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Called off before it happened
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetingStatus::Scheduled => write!(fmt, "scheduled"),
            MeetingStatus::InProgress => write!(fmt, "in_progress"),
            MeetingStatus::Completed => write!(fmt, "completed"),
            MeetingStatus::Canceled => write!(fmt, "canceled"),
        }
    }
}
