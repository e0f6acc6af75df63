//! One meet session's sync pass.
//!
//! Fetches the day's audit events for the session's meeting code,
//! reconstructs who was in the call, stores participant observations, and
//! writes attendance for every participant that resolves to a member. The
//! whole pass is idempotent: re-running it on the same upstream data rewrites
//! the same rows.

use crate::error::Error;
use crate::gateway::admin_reports;
use crate::gateway::google_auth::TokenProvider;
use crate::meet_event::{self, MeetEvent};
use crate::participant_matcher::Matcher;
use crate::retry::{with_retry, RetryPolicy};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use entity::meet_sessions;
use entity_api::attendance_record::{self, AutomaticAttendance, UpsertOutcome};
use entity_api::meet_participant::{self, ParticipantSummary};
use entity_api::meet_session::{self, SessionTotals, SyncClaim};
use log::*;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::collections::BTreeMap;
use std::time::Duration;

/// Ceiling on audit events pulled for one session's day. A day of honest
/// check-in calls is a few hundred events; anything near this is runaway.
const MAX_EVENTS_PER_SYNC: usize = 10_000;

/// How a sync pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Participants were observed and written
    Synced,
    /// The audit log had nothing for this code on this day
    NoData,
    /// Another pass already owned the session
    Skipped,
}

/// What one sync pass observed and wrote.
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub outcome: SyncOutcome,
    pub participants_found: usize,
    pub matched_users: usize,
    pub records_created: usize,
    pub records_updated: usize,
}

impl SyncResult {
    fn empty(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            participants_found: 0,
            matched_users: 0,
            records_created: 0,
            records_updated: 0,
        }
    }
}

/// Correlates one session against the audit log for `date`.
///
/// A session already claimed by another pass is skipped. Any failure after
/// the claim marks the session failed with the captured message before the
/// error is returned, so the session stays eligible for a later re-sync.
pub async fn sync_session(
    db: &DatabaseConnection,
    config: &Config,
    reports_tokens: &TokenProvider,
    matcher: &Matcher,
    session: &meet_sessions::Model,
    date: NaiveDate,
) -> Result<SyncResult, Error> {
    let claimed = match meet_session::claim_for_sync(db, session.id).await? {
        SyncClaim::Claimed(model) => model,
        SyncClaim::AlreadySyncing(_) => {
            info!("Session {} is already being synced; skipping", session.id);
            return Ok(SyncResult::empty(SyncOutcome::Skipped));
        }
    };

    match correlate(db, config, reports_tokens, matcher, &claimed, date).await {
        Ok(result) => Ok(result),
        Err(e) => {
            let message = format!("{:?}", e.error_kind);
            error!("Sync of session {} failed: {message}", claimed.id);
            if let Err(mark_err) = meet_session::mark_failed(db, claimed.id, &message).await {
                warn!(
                    "Could not record the failure on session {}: {mark_err:?}",
                    claimed.id
                );
            }
            Err(e)
        }
    }
}

async fn correlate(
    db: &DatabaseConnection,
    config: &Config,
    reports_tokens: &TokenProvider,
    matcher: &Matcher,
    session: &meet_sessions::Model,
    date: NaiveDate,
) -> Result<SyncResult, Error> {
    let (window_start, window_end) = day_window(date, config.reporting_timezone);
    debug!(
        "Syncing session {} (code {}) against [{window_start}, {window_end})",
        session.id, session.meet_code
    );

    let policy = RetryPolicy::new(config.api_max_retries);
    let timeout = Duration::from_secs(config.api_timeout_secs);
    let base_url = config.admin_reports_base_url();

    let activities = with_retry(&policy, || async move {
        let token = reports_tokens.access_token().await?;
        let client = admin_reports::Client::new(&token, base_url, timeout)?;
        client
            .fetch_meet_activities(
                window_start,
                window_end,
                &[meet_event::CALL_ENDED],
                MAX_EVENTS_PER_SYNC,
            )
            .await
    })
    .await?;

    let events: Vec<MeetEvent> = meet_event::parse_events(&activities)
        .into_iter()
        .filter(|event| event.event_type == meet_event::CALL_ENDED)
        .filter(|event| event.meeting_code == session.meet_code)
        .collect();

    if events.is_empty() {
        info!(
            "No audit events for session {} (code {}) on {date}",
            session.id, session.meet_code
        );
        meet_session::mark_no_data(db, session.id).await?;
        return Ok(SyncResult::empty(SyncOutcome::NoData));
    }

    let summaries = aggregate_participants(&events);
    let totals = session_totals(&events, &summaries);
    let participants_found = summaries.len();

    let mut matched_users = 0;
    let mut records_created = 0;
    let mut records_updated = 0;

    for summary in summaries {
        let email = summary.participant_email.clone();
        let participant_row = meet_participant::upsert(db, session.id, summary).await?;

        let matched = match matcher.match_email(&email) {
            Some(matched) => matched,
            None => {
                debug!("No member matched participant {email}");
                continue;
            }
        };
        matched_users += 1;

        let attendance = AutomaticAttendance {
            meeting_id: session.meeting_id,
            user_id: matched.user_id,
            duration_minutes: participant_row.duration_minutes,
            confidence_score: matched.confidence,
            meet_participant_id: Some(participant_row.id),
            meet_join_time: participant_row.joined_at,
            meet_leave_time: participant_row.left_at,
        };
        match attendance_record::upsert_automatic(db, attendance).await? {
            UpsertOutcome::Created(_) => records_created += 1,
            UpsertOutcome::Updated(_) => records_updated += 1,
            UpsertOutcome::Unchanged(_) => {}
        }
    }

    meet_session::mark_synced(db, session.id, totals).await?;
    info!(
        "Session {} synced: {participants_found} participants, {matched_users} matched, \
         {records_created} records created, {records_updated} updated",
        session.id
    );

    Ok(SyncResult {
        outcome: SyncOutcome::Synced,
        participants_found,
        matched_users,
        records_created,
        records_updated,
    })
}

/// The UTC window covering one calendar day in the reporting timezone.
pub(crate) fn day_window(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    (start_of_day(date, tz), start_of_day(next, tz))
}

fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        // A DST gap can swallow local midnight; the day then starts an hour in.
        .or_else(|| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Folds per-stretch events into one observation per participant, ordered by
/// email. A participant who dropped and rejoined contributes one row with
/// their stretches summed.
pub(crate) fn aggregate_participants(events: &[MeetEvent]) -> Vec<ParticipantSummary> {
    let mut by_email: BTreeMap<&str, Vec<&MeetEvent>> = BTreeMap::new();
    for event in events {
        by_email
            .entry(event.participant_email.as_str())
            .or_default()
            .push(event);
    }

    by_email
        .into_iter()
        .map(|(email, mut stretches)| {
            stretches.sort_by_key(|event| event.event_time);

            let joined_at = stretches.iter().map(|event| event.joined_at()).min();
            let left_at = stretches.iter().map(|event| event.event_time).max();
            let total_minutes: i32 = stretches.iter().map(|event| event.duration_minutes).sum();
            let device_type = stretches
                .iter()
                .find_map(|event| event.device_type.clone());

            ParticipantSummary {
                participant_email: email.to_string(),
                joined_at: joined_at.map(Into::into),
                left_at: left_at.map(Into::into),
                duration_minutes: Some(total_minutes),
                device_type,
                is_external: stretches.iter().any(|event| event.is_external),
                reconnect_count: (stretches.len() as i32 - 1).max(0),
            }
        })
        .collect()
}

/// Session-level aggregates: the call window spans the first join to the last
/// leave, and the organizer is whoever the earliest event names.
pub(crate) fn session_totals(
    events: &[MeetEvent],
    summaries: &[ParticipantSummary],
) -> SessionTotals {
    let started_at = summaries.iter().filter_map(|s| s.joined_at).min();
    let ended_at = summaries.iter().filter_map(|s| s.left_at).max();

    let duration_minutes = match (started_at, ended_at) {
        (Some(start), Some(end)) => {
            let seconds = (end - start).num_seconds().max(0);
            Some(((seconds + 30) / 60).min(i32::MAX as i64) as i32)
        }
        _ => None,
    };

    let organizer_email = events
        .iter()
        .filter(|event| event.organizer_email.is_some())
        .min_by_key(|event| event.event_time)
        .and_then(|event| event.organizer_email.clone());

    SessionTotals {
        started_at,
        ended_at,
        duration_minutes,
        participant_count: summaries.len() as i32,
        total_participant_minutes: summaries.iter().filter_map(|s| s.duration_minutes).sum(),
        organizer_email,
    }
}
