//! Business logic for correlating Google Meet activity with scheduled
//! meetings.
//!
//! This crate re-exports the entity types consumers need so that binaries
//! depend on `domain` alone; the `entity_api` and `entity` crates stay an
//! implementation detail of the persistence layer.

pub use entity_api::{
    attendance_records, confidence_level, detection_method, email_mappings, meet_participants,
    meet_sessions, meet_sync_status, meeting_status, meetings, users, Id,
};

pub mod attendance;
pub mod correlation;
pub mod error;
pub mod gateway;
pub mod meet_event;
pub mod meet_link;
pub mod participant_matcher;
pub mod retry;
