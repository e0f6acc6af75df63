//! Interprets raw Meet audit activities into typed events.
//!
//! The audit log is best-effort data: fields go missing, durations come back
//! negative, and the same activity can appear on more than one page. Records
//! missing what attribution needs are dropped here with a warning rather than
//! guessed at downstream, and one bad record never fails the batch.

use crate::gateway::admin_reports::RawActivity;
use crate::meet_link;
use chrono::{DateTime, Utc};
use log::*;
use std::collections::HashSet;

/// The audit event name marking a participant's completed stretch in a call.
pub const CALL_ENDED: &str = "call_ended";

/// One typed Meet audit event. For `call_ended` events the event time is when
/// the participant left the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetEvent {
    pub event_id: String,
    pub event_type: String,
    pub meeting_code: String,
    pub participant_email: String,
    pub event_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub device_type: Option<String>,
    pub is_external: bool,
    pub organizer_email: Option<String>,
}

impl MeetEvent {
    /// When the participant joined, reconstructed by rewinding the reported
    /// duration from the event time.
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.event_time - chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

/// Parses every event in the given activities, dropping unusable records and
/// collapsing duplicates by event id.
pub fn parse_events(activities: &[RawActivity]) -> Vec<MeetEvent> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut events: Vec<MeetEvent> = Vec::new();
    let mut total = 0;

    for activity in activities {
        for (index, _) in activity.events.iter().enumerate() {
            total += 1;
            if let Some(event) = parse_event(activity, index) {
                if seen.insert(event.event_id.clone()) {
                    events.push(event);
                }
            }
        }
    }

    debug!("Parsed {} of {total} audit events", events.len());
    events
}

/// Parses the event at `index` within one activity. Returns `None` when a
/// mandatory field (id, time, participant, meeting code) is missing.
pub fn parse_event(activity: &RawActivity, index: usize) -> Option<MeetEvent> {
    let event = activity.events.get(index)?;

    let event_type = match event.name.as_deref() {
        Some(name) => name.to_string(),
        None => {
            warn!("Dropping audit event without a name");
            return None;
        }
    };

    let id = activity.id.as_ref();
    let event_time = match id.and_then(|id| id.time) {
        Some(time) => time,
        None => {
            warn!("Dropping {event_type} audit event without a timestamp");
            return None;
        }
    };
    let qualifier = match id.and_then(|id| id.unique_qualifier.as_deref()) {
        Some(qualifier) => qualifier,
        None => {
            warn!("Dropping {event_type} audit event without an id");
            return None;
        }
    };
    // One activity can hold several events; they share the activity id.
    let event_id = if index == 0 {
        qualifier.to_string()
    } else {
        format!("{qualifier}.{index}")
    };

    let meeting_code = match event.string_param("meeting_code") {
        Some(raw) => meet_link::normalize_meet_code(raw),
        None => {
            warn!("Dropping {event_type} audit event without a meeting code");
            return None;
        }
    };
    if meeting_code.is_empty() {
        return None;
    }

    let participant_email = activity
        .actor
        .as_ref()
        .and_then(|actor| actor.email.as_deref())
        .or_else(|| event.string_param("identifier"));
    let participant_email = match participant_email {
        Some(email) => email.to_lowercase(),
        None => {
            warn!("Dropping {event_type} event for meeting {meeting_code} without a participant");
            return None;
        }
    };

    let duration_seconds = event.int_param("duration_seconds").unwrap_or(0).max(0);
    let duration_minutes = ((duration_seconds + 30) / 60).min(i32::MAX as i64) as i32;

    Some(MeetEvent {
        event_id,
        event_type,
        meeting_code,
        participant_email,
        event_time,
        duration_minutes,
        device_type: event.string_param("device_type").map(str::to_string),
        is_external: event.bool_param("is_external").unwrap_or(false),
        organizer_email: event
            .string_param("organizer_email")
            .map(str::to_lowercase),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn activity_from_json(json: serde_json::Value) -> RawActivity {
        serde_json::from_value(json).expect("test activity should deserialize")
    }

    fn call_ended_activity() -> RawActivity {
        activity_from_json(serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-123456789"},
            "actor": {"email": "Alice@CadenceClub.org", "callerType": "USER"},
            "events": [{
                "type": "call",
                "name": "call_ended",
                "parameters": [
                    {"name": "meeting_code", "value": "ABC-DEFG-HIJ"},
                    {"name": "duration_seconds", "intValue": "2760"},
                    {"name": "device_type", "value": "web"},
                    {"name": "is_external", "boolValue": false},
                    {"name": "organizer_email", "value": "Alice@CadenceClub.org"}
                ]
            }]
        }))
    }

    #[test]
    fn parses_a_typical_call_ended_event() {
        let event = parse_event(&call_ended_activity(), 0).expect("event should parse");

        assert_eq!(event.event_id, "-123456789");
        assert_eq!(event.event_type, CALL_ENDED);
        assert_eq!(event.meeting_code, "abcdefghij");
        assert_eq!(event.participant_email, "alice@cadenceclub.org");
        assert_eq!(event.duration_minutes, 46);
        assert_eq!(event.device_type.as_deref(), Some("web"));
        assert!(!event.is_external);
        assert_eq!(
            event.organizer_email.as_deref(),
            Some("alice@cadenceclub.org")
        );
    }

    #[test]
    fn rounds_duration_to_the_nearest_minute() {
        let durations = [(2760, 46), (2790, 47), (29, 0), (30, 1)];

        for (seconds, minutes) in durations {
            let activity = activity_from_json(serde_json::json!({
                "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-1"},
                "actor": {"email": "alice@cadenceclub.org"},
                "events": [{
                    "name": "call_ended",
                    "parameters": [
                        {"name": "meeting_code", "value": "ABCDEFGHIJ"},
                        {"name": "duration_seconds", "intValue": seconds.to_string()}
                    ]
                }]
            }));
            let event = parse_event(&activity, 0).unwrap();
            assert_eq!(event.duration_minutes, minutes, "{seconds}s");
        }
    }

    #[test]
    fn reconstructs_the_join_time_by_rewinding_the_duration() {
        let event = parse_event(&call_ended_activity(), 0).unwrap();

        assert_eq!(
            event.joined_at(),
            Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap()
        );
        assert_eq!(
            event.event_time,
            Utc.with_ymd_and_hms(2025, 4, 15, 15, 46, 0).unwrap()
        );
    }

    #[test]
    fn falls_back_to_the_identifier_parameter_when_the_actor_is_anonymous() {
        let activity = activity_from_json(serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-1"},
            "actor": {"callerType": "USER"},
            "events": [{
                "name": "call_ended",
                "parameters": [
                    {"name": "meeting_code", "value": "ABCDEFGHIJ"},
                    {"name": "identifier", "value": "Carol.Silva.Home@gmail.com"}
                ]
            }]
        }));

        let event = parse_event(&activity, 0).expect("event should parse");
        assert_eq!(event.participant_email, "carol.silva.home@gmail.com");
    }

    #[test]
    fn skips_events_missing_mandatory_fields() {
        let no_code = activity_from_json(serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-1"},
            "actor": {"email": "alice@cadenceclub.org"},
            "events": [{"name": "call_ended", "parameters": []}]
        }));
        assert_eq!(parse_event(&no_code, 0), None);

        let no_participant = activity_from_json(serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-1"},
            "events": [{
                "name": "call_ended",
                "parameters": [{"name": "meeting_code", "value": "ABCDEFGHIJ"}]
            }]
        }));
        assert_eq!(parse_event(&no_participant, 0), None);

        let no_timestamp = activity_from_json(serde_json::json!({
            "id": {"uniqueQualifier": "-1"},
            "actor": {"email": "alice@cadenceclub.org"},
            "events": [{
                "name": "call_ended",
                "parameters": [{"name": "meeting_code", "value": "ABCDEFGHIJ"}]
            }]
        }));
        assert_eq!(parse_event(&no_timestamp, 0), None);

        let no_id = activity_from_json(serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z"},
            "actor": {"email": "alice@cadenceclub.org"},
            "events": [{
                "name": "call_ended",
                "parameters": [{"name": "meeting_code", "value": "ABCDEFGHIJ"}]
            }]
        }));
        assert_eq!(parse_event(&no_id, 0), None);
    }

    #[test]
    fn clamps_negative_durations_to_zero() {
        let activity = activity_from_json(serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-1"},
            "actor": {"email": "alice@cadenceclub.org"},
            "events": [{
                "name": "call_ended",
                "parameters": [
                    {"name": "meeting_code", "value": "ABCDEFGHIJ"},
                    {"name": "duration_seconds", "intValue": "-45"}
                ]
            }]
        }));

        let event = parse_event(&activity, 0).expect("event should parse");
        assert_eq!(event.duration_minutes, 0);
        assert_eq!(event.joined_at(), event.event_time);
    }

    #[test]
    fn collapses_duplicate_activities_by_event_id() {
        // The upstream feed repeats activities across pages now and then.
        let activities = vec![call_ended_activity(), call_ended_activity()];

        let events = parse_events(&activities);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn malformed_records_do_not_poison_the_batch() {
        let activities = vec![
            activity_from_json(serde_json::json!({
                "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-9"},
                "events": [{"name": "call_ended", "parameters": []}]
            })),
            call_ended_activity(),
        ];

        let events = parse_events(&activities);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].participant_email, "alice@cadenceclub.org");
    }

    #[test]
    fn multiple_events_in_one_activity_get_distinct_ids() {
        let activity = activity_from_json(serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": "-7"},
            "actor": {"email": "alice@cadenceclub.org"},
            "events": [
                {
                    "name": "call_ended",
                    "parameters": [{"name": "meeting_code", "value": "ABCDEFGHIJ"}]
                },
                {
                    "name": "call_ended",
                    "parameters": [{"name": "meeting_code", "value": "KLMNOPQRST"}]
                }
            ]
        }));

        let events = parse_events(&[activity]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_id, "-7");
        assert_eq!(events[1].event_id, "-7.1");
    }
}
