use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Operator-assigned trust level on a manual email mapping.
#[derive(
    Debug, Clone, Eq, PartialEq, EnumIter, Deserialize, Default, Serialize, DeriveActiveEnum,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "confidence_level")]
pub enum ConfidenceLevel {
    #[sea_orm(string_value = "high")]
    #[default]
    High,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "low")]
    Low,
}

impl ConfidenceLevel {
    /// Numeric confidence a match through a mapping of this level carries.
    pub fn score(&self) -> f64 {
        match self {
            ConfidenceLevel::High => 0.9,
            ConfidenceLevel::Medium => 0.7,
            ConfidenceLevel::Low => 0.5,
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::High => write!(fmt, "high"),
            ConfidenceLevel::Medium => write!(fmt, "medium"),
            ConfidenceLevel::Low => write!(fmt, "low"),
        }
    }
}
