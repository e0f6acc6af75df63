use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How an attendance record came to exist.
#[derive(Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "detection_method")]
pub enum DetectionMethod {
    /// Derived from Google Meet audit-log correlation
    #[sea_orm(string_value = "automatic_meet")]
    AutomaticMeet,
    /// Entered by a human; never overwritten by the sync pipeline
    #[sea_orm(string_value = "manual")]
    Manual,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::AutomaticMeet => write!(fmt, "automatic_meet"),
            DetectionMethod::Manual => write!(fmt, "manual"),
        }
    }
}
