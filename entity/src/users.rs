//! SeaORM Entity for users table.
//! Members of the accountability program, as mirrored from the internal directory.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "cadence_platform", table_name = "users")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    pub id: Id,

    /// Primary email, unique across the directory
    #[sea_orm(unique)]
    pub email: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// Preferred display name, falls back to first/last when absent
    pub display_name: Option<String>,

    /// IANA timezone the member schedules their meetings in
    pub timezone: String,

    #[serde(skip_deserializing)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::meetings::Entity")]
    Meetings,

    #[sea_orm(has_many = "super::attendance_records::Entity")]
    AttendanceRecords,

    #[sea_orm(has_many = "super::email_mappings::Entity")]
    EmailMappings,
}

impl Related<super::meetings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meetings.def()
    }
}

impl Related<super::attendance_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl Related<super::email_mappings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmailMappings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
