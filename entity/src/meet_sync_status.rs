use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a meet session sits in the audit-log sync lifecycle.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Default, Serialize, DeriveActiveEnum,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "meet_sync_status")]
pub enum MeetSyncStatus {
    /// Created but never synced
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// A sync pass is working on this session right now
    #[sea_orm(string_value = "syncing")]
    Syncing,
    /// Audit events were found and correlated
    #[sea_orm(string_value = "synced")]
    Synced,
    /// Sync completed but the audit log had no events for this session
    #[sea_orm(string_value = "no_data")]
    NoData,
    /// Last sync attempt errored; see sync_error
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl std::fmt::Display for MeetSyncStatus {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeetSyncStatus::Pending => write!(fmt, "pending"),
            MeetSyncStatus::Syncing => write!(fmt, "syncing"),
            MeetSyncStatus::Synced => write!(fmt, "synced"),
            MeetSyncStatus::NoData => write!(fmt, "no_data"),
            MeetSyncStatus::Failed => write!(fmt, "failed"),
        }
    }
}
