use uuid::Uuid;

// Scheduling entities
pub mod meeting_status;
pub mod meetings;
pub mod users;

// Meet attendance correlation entities
pub mod attendance_records;
pub mod confidence_level;
pub mod detection_method;
pub mod email_mappings;
pub mod meet_participants;
pub mod meet_sessions;
pub mod meet_sync_status;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = Uuid;
