//! Day-level orchestration of attendance sync.
//!
//! Decides which meetings on a date need correlating, resolves each one to a
//! meet session (stored link first, calendar search second), and drives the
//! per-session sync passes in bounded batches. Per-session failures are
//! collected, not raised; only credential failures abort the run.

use crate::correlation::{self, SyncOutcome, SyncResult};
use crate::error::Error;
use crate::gateway::google_auth::TokenProvider;
use crate::gateway::google_calendar;
use crate::meet_link;
use crate::participant_matcher::Matcher;
use crate::retry::{with_retry, RetryPolicy};
use chrono::{NaiveDate, Utc};
use entity::{meet_sessions, meeting_status::MeetingStatus, meetings, Id};
use entity_api::{meet_session, meeting};
use log::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::DatabaseConnection;
use service::config::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How far either side of a meeting's scheduled time the calendar search
/// looks for a matching event.
const CALENDAR_SEARCH_WINDOW_HOURS: i64 = 6;

/// Meetings in these states are candidates for correlation. Canceled
/// meetings never are.
const SYNCABLE_STATUSES: [MeetingStatus; 3] = [
    MeetingStatus::Scheduled,
    MeetingStatus::InProgress,
    MeetingStatus::Completed,
];

/// Tallies for one orchestrated run.
#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
    /// Meetings whose session got a sync attempt, successful or not
    pub meetings_processed: usize,
    /// Meetings whose session ended the run synced with participants
    pub meetings_with_data: usize,
    pub participants_found: usize,
    pub records_created: usize,
    pub records_updated: usize,
    /// Meetings with no discoverable conference link
    pub skipped_no_link: usize,
    /// One message per failed session; never aborts the run
    pub errors: Vec<String>,
}

impl ProcessingResult {
    fn absorb(&mut self, sync: &SyncResult) {
        self.meetings_processed += 1;
        if sync.outcome == SyncOutcome::Synced {
            self.meetings_with_data += 1;
        }
        self.participants_found += sync.participants_found;
        self.records_created += sync.records_created;
        self.records_updated += sync.records_updated;
    }

    fn merge(&mut self, other: ProcessingResult) {
        self.meetings_processed += other.meetings_processed;
        self.meetings_with_data += other.meetings_with_data;
        self.participants_found += other.participants_found;
        self.records_created += other.records_created;
        self.records_updated += other.records_updated;
        self.skipped_no_link += other.skipped_no_link;
        self.errors.extend(other.errors);
    }
}

/// What `discover` learned about one meeting without writing anything.
#[derive(Debug, Clone)]
pub struct DiscoveredMeeting {
    pub meeting_id: Id,
    pub title: String,
    pub scheduled_at: DateTimeWithTimeZone,
    pub meet_code: Option<String>,
}

/// Correlates every syncable meeting scheduled on `date`.
///
/// The cancel flag is checked between sessions: the session in flight
/// finishes, no new one starts, and untouched sessions stay pending for the
/// next run.
pub async fn process_date(
    db: &DatabaseConnection,
    config: &Config,
    reports_tokens: &TokenProvider,
    calendar_tokens: &TokenProvider,
    date: NaiveDate,
    cancel: &AtomicBool,
) -> Result<ProcessingResult, Error> {
    let (window_start, window_end) = correlation::day_window(date, config.reporting_timezone);
    let meetings =
        meeting::find_in_window(db, window_start, window_end, &SYNCABLE_STATUSES).await?;

    info!("{} meetings to correlate on {date}", meetings.len());

    let mut result = ProcessingResult::default();
    if meetings.is_empty() {
        return Ok(result);
    }

    let matcher = Matcher::load(db, config.google_workspace_domain()).await?;
    let batch_size = config.attendance_batch_size.max(1);

    for (batch_index, batch) in meetings.chunks(batch_size).enumerate() {
        debug!("Batch {} of {} meetings", batch_index + 1, batch.len());

        for meeting_model in batch {
            if cancel.load(Ordering::SeqCst) {
                info!("Cancellation requested; leaving the remaining sessions pending");
                return Ok(result);
            }

            let session = match resolve_session(db, config, calendar_tokens, meeting_model).await
            {
                Ok(Some(session)) => session,
                Ok(None) => {
                    debug!(
                        "No conference link found for meeting {} ({})",
                        meeting_model.id, meeting_model.title
                    );
                    result.skipped_no_link += 1;
                    continue;
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    result
                        .errors
                        .push(format!("meeting {}: {:?}", meeting_model.id, e.error_kind));
                    continue;
                }
            };

            match correlation::sync_session(db, config, reports_tokens, &matcher, &session, date)
                .await
            {
                Ok(sync) => result.absorb(&sync),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    result.meetings_processed += 1;
                    result
                        .errors
                        .push(format!("session {}: {:?}", session.id, e.error_kind));
                }
            }
        }
    }

    Ok(result)
}

/// Runs `process_date` over every day in `[start, end]`, oldest first,
/// summing the tallies.
pub async fn process_date_range(
    db: &DatabaseConnection,
    config: &Config,
    reports_tokens: &TokenProvider,
    calendar_tokens: &TokenProvider,
    start: NaiveDate,
    end: NaiveDate,
    cancel: &AtomicBool,
) -> Result<ProcessingResult, Error> {
    let mut total = ProcessingResult::default();
    let mut date = start;

    while date <= end {
        info!("Backfilling {date}");
        let day =
            process_date(db, config, reports_tokens, calendar_tokens, date, cancel).await?;
        total.merge(day);

        if cancel.load(Ordering::SeqCst) {
            break;
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    Ok(total)
}

/// Reports which of the date's meetings have a discoverable conference link.
/// Reads the calendar but writes nothing; this backs the dry-run flag.
pub async fn discover(
    db: &DatabaseConnection,
    config: &Config,
    calendar_tokens: &TokenProvider,
    date: NaiveDate,
) -> Result<Vec<DiscoveredMeeting>, Error> {
    let (window_start, window_end) = correlation::day_window(date, config.reporting_timezone);
    let meetings =
        meeting::find_in_window(db, window_start, window_end, &SYNCABLE_STATUSES).await?;

    let mut report = Vec::with_capacity(meetings.len());
    for meeting_model in &meetings {
        let resolved = resolve_link(db, config, calendar_tokens, meeting_model).await?;
        report.push(DiscoveredMeeting {
            meeting_id: meeting_model.id,
            title: meeting_model.title.clone(),
            scheduled_at: meeting_model.scheduled_at,
            meet_code: resolved.map(|(code, _)| code),
        });
    }

    Ok(report)
}

/// Resolves a meeting to its meet session, creating one when a link can be
/// found. `None` means the meeting has no discoverable link.
async fn resolve_session(
    db: &DatabaseConnection,
    config: &Config,
    calendar_tokens: &TokenProvider,
    meeting: &meetings::Model,
) -> Result<Option<meet_sessions::Model>, Error> {
    if let Some(existing) = meet_session::find_latest_by_meeting_id(db, meeting.id).await? {
        return Ok(Some(existing));
    }

    match linked_meet_code(config, calendar_tokens, meeting).await? {
        Some((code, link)) => Ok(Some(
            meet_session::find_or_create(db, meeting.id, &code, link).await?,
        )),
        None => Ok(None),
    }
}

/// Finds the meeting's meet code and link without writing: an existing
/// session wins, then the link stored on the meeting, then calendar search.
async fn resolve_link(
    db: &DatabaseConnection,
    config: &Config,
    calendar_tokens: &TokenProvider,
    meeting: &meetings::Model,
) -> Result<Option<(String, Option<String>)>, Error> {
    if let Some(existing) = meet_session::find_latest_by_meeting_id(db, meeting.id).await? {
        return Ok(Some((existing.meet_code, existing.meet_link)));
    }

    linked_meet_code(config, calendar_tokens, meeting).await
}

/// The meet code and link for a meeting with no session yet. The link stored
/// on the meeting wins; calendar search is the fallback.
async fn linked_meet_code(
    config: &Config,
    calendar_tokens: &TokenProvider,
    meeting: &meetings::Model,
) -> Result<Option<(String, Option<String>)>, Error> {
    if let Some(link) = meeting.meet_link.as_deref() {
        match meet_link::meet_code_from_link(link) {
            Some(code) => return Ok(Some((code, Some(link.to_string())))),
            None => warn!(
                "Meeting {} carries a conference link without a meet code: {link}",
                meeting.id
            ),
        }
    }

    Ok(discover_calendar_link(config, calendar_tokens, meeting)
        .await?
        .map(|(code, uri)| (code, Some(uri))))
}

/// Searches the shared calendar around the meeting's scheduled time for an
/// event carrying a Meet URI. Keywords are tried in configured order; the
/// first event with a usable URI wins.
async fn discover_calendar_link(
    config: &Config,
    calendar_tokens: &TokenProvider,
    meeting: &meetings::Model,
) -> Result<Option<(String, String)>, Error> {
    let scheduled = meeting.scheduled_at.with_timezone(&Utc);
    let time_min = scheduled - chrono::Duration::hours(CALENDAR_SEARCH_WINDOW_HOURS);
    let time_max = scheduled + chrono::Duration::hours(CALENDAR_SEARCH_WINDOW_HOURS);

    let policy = RetryPolicy::new(config.api_max_retries);
    let timeout = Duration::from_secs(config.api_timeout_secs);
    let base_url = config.calendar_base_url();
    let calendar_id = config.calendar_id();

    for keyword in &config.calendar_search_keywords {
        let keyword = keyword.as_str();
        let events = with_retry(&policy, || async move {
            let token = calendar_tokens.access_token().await?;
            let client = google_calendar::Client::new(&token, base_url, timeout)?;
            client
                .search_events(calendar_id, keyword, time_min, time_max)
                .await
        })
        .await?;

        for event in events {
            if let Some(uri) = event.meet_uri() {
                if let Some(code) = meet_link::meet_code_from_link(&uri) {
                    debug!(
                        "Calendar search for '{keyword}' found a link for meeting {}",
                        meeting.id
                    );
                    return Ok(Some((code, uri)));
                }
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synced_once() -> SyncResult {
        SyncResult {
            outcome: SyncOutcome::Synced,
            participants_found: 3,
            matched_users: 2,
            records_created: 2,
            records_updated: 0,
        }
    }

    #[test]
    fn absorb_counts_synced_sessions_as_data() {
        let mut result = ProcessingResult::default();
        result.absorb(&synced_once());

        assert_eq!(result.meetings_processed, 1);
        assert_eq!(result.meetings_with_data, 1);
        assert_eq!(result.participants_found, 3);
        assert_eq!(result.records_created, 2);
    }

    #[test]
    fn absorb_counts_no_data_sessions_as_processed_only() {
        let mut result = ProcessingResult::default();
        result.absorb(&SyncResult {
            outcome: SyncOutcome::NoData,
            participants_found: 0,
            matched_users: 0,
            records_created: 0,
            records_updated: 0,
        });

        assert_eq!(result.meetings_processed, 1);
        assert_eq!(result.meetings_with_data, 0);
    }

    #[test]
    fn merge_sums_day_tallies_and_keeps_all_errors() {
        let mut total = ProcessingResult::default();
        total.absorb(&synced_once());
        total.errors.push("session one: Upstream".to_string());

        let mut next_day = ProcessingResult::default();
        next_day.absorb(&synced_once());
        next_day.skipped_no_link = 2;
        next_day.errors.push("session two: Network".to_string());

        total.merge(next_day);

        assert_eq!(total.meetings_processed, 2);
        assert_eq!(total.participants_found, 6);
        assert_eq!(total.skipped_no_link, 2);
        assert_eq!(total.errors.len(), 2);
    }
}

#[cfg(test)]
#[cfg(feature = "mock")]
mod orchestration_tests {
    use super::*;
    use crate::gateway::google_auth::{
        ServiceAccountKey, TokenProvider, CALENDAR_SCOPES, REPORTS_SCOPES, TEST_PRIVATE_KEY,
    };
    use chrono::TimeZone;
    use clap::Parser;
    use entity::meet_sync_status::MeetSyncStatus;
    use entity::users;
    use mockito::{Server, ServerGuard};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use secrecy::SecretString;

    fn test_config(server: &ServerGuard) -> Config {
        Config::parse_from([
            "cadence_platform_rs",
            "--admin-reports-base-url",
            &server.url(),
            "--calendar-base-url",
            &server.url(),
            "--api-max-retries",
            "0",
        ])
    }

    fn test_provider(server: &ServerGuard, scopes: &[&str]) -> TokenProvider {
        let key = ServiceAccountKey {
            client_email: "sync@cadence-test.iam.gserviceaccount.com".to_string(),
            private_key: SecretString::new(TEST_PRIVATE_KEY.to_string()),
        };
        TokenProvider::new(
            key,
            "admin@cadenceclub.org",
            &format!("{}/token", server.url()),
            scopes,
            Duration::from_secs(5),
        )
        .expect("provider should build")
    }

    fn meeting(meet_link: Option<&str>) -> meetings::Model {
        let scheduled = Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        meetings::Model {
            id: Id::new_v4(),
            user_id: Id::new_v4(),
            title: "Weekly check-in".to_string(),
            scheduled_at: scheduled.into(),
            duration_minutes: 45,
            status: MeetingStatus::Completed,
            meet_link: meet_link.map(str::to_string),
            created_at: scheduled.into(),
            updated_at: scheduled.into(),
        }
    }

    fn session_for(meeting: &meetings::Model, status: MeetSyncStatus) -> meet_sessions::Model {
        let now = Utc::now();
        meet_sessions::Model {
            id: Id::new_v4(),
            meeting_id: meeting.id,
            meet_code: "abcdefghij".to_string(),
            meet_link: meeting.meet_link.clone(),
            sync_status: status,
            last_sync_at: None,
            sync_error: None,
            started_at: None,
            ended_at: None,
            duration_minutes: None,
            participant_count: 0,
            total_participant_minutes: 0,
            organizer_email: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    async fn mock_token_endpoint(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "ya29.test", "expires_in": 3600}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn meetings_without_any_discoverable_link_are_skipped() {
        let mut server = Server::new_async().await;
        let _token = mock_token_endpoint(&mut server).await;
        let _calendar = server
            .mock("GET", "/calendars/primary/events")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let linkless = meeting(None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // the day's meetings
            .append_query_results(vec![vec![linkless.clone()]])
            // matcher snapshots: directory then mappings
            .append_query_results(vec![Vec::<users::Model>::new()])
            .append_query_results(vec![Vec::<entity::email_mappings::Model>::new()])
            // no existing session for the meeting
            .append_query_results(vec![Vec::<meet_sessions::Model>::new()])
            .into_connection();

        let config = test_config(&server);
        let reports = test_provider(&server, REPORTS_SCOPES);
        let calendar = test_provider(&server, CALENDAR_SCOPES);
        let cancel = AtomicBool::new(false);
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let result = process_date(&db, &config, &reports, &calendar, date, &cancel)
            .await
            .expect("a linkless meeting is not an error");

        assert_eq!(result.skipped_no_link, 1);
        assert_eq!(result.meetings_processed, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn a_stored_meet_link_flows_through_to_a_synced_session() {
        let mut server = Server::new_async().await;
        let _token = mock_token_endpoint(&mut server).await;
        let _reports = server
            .mock(
                "GET",
                "/admin/reports/v1/activity/users/all/applications/meet",
            )
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let linked = meeting(Some("https://meet.google.com/abc-defg-hij"));
        let pending = session_for(&linked, MeetSyncStatus::Pending);
        let mut claimed = pending.clone();
        claimed.sync_status = MeetSyncStatus::Syncing;
        let mut no_data = claimed.clone();
        no_data.sync_status = MeetSyncStatus::NoData;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![linked.clone()]])
            .append_query_results(vec![Vec::<users::Model>::new()])
            .append_query_results(vec![Vec::<entity::email_mappings::Model>::new()])
            // resolve: no prior session, find_or_create misses then inserts
            .append_query_results(vec![
                Vec::<meet_sessions::Model>::new(),
                Vec::<meet_sessions::Model>::new(),
                vec![pending.clone()],
            ])
            // sync: claim, then mark_no_data
            .append_query_results(vec![vec![pending.clone()], vec![claimed.clone()]])
            .append_query_results(vec![vec![claimed.clone()], vec![no_data.clone()]])
            .into_connection();

        let config = test_config(&server);
        let reports = test_provider(&server, REPORTS_SCOPES);
        let calendar = test_provider(&server, CALENDAR_SCOPES);
        let cancel = AtomicBool::new(false);
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let result = process_date(&db, &config, &reports, &calendar, date, &cancel)
            .await
            .expect("an empty audit day is not an error");

        assert_eq!(result.meetings_processed, 1);
        assert_eq!(result.meetings_with_data, 0);
        assert_eq!(result.skipped_no_link, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn auth_failures_abort_the_whole_run() {
        let mut server = Server::new_async().await;
        let _token = mock_token_endpoint(&mut server).await;
        let _reports = server
            .mock(
                "GET",
                "/admin/reports/v1/activity/users/all/applications/meet",
            )
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": {"message": "Invalid Credentials"}}"#)
            .create_async()
            .await;

        let linked = meeting(Some("https://meet.google.com/abc-defg-hij"));
        let pending = session_for(&linked, MeetSyncStatus::Pending);
        let mut claimed = pending.clone();
        claimed.sync_status = MeetSyncStatus::Syncing;
        let mut failed = claimed.clone();
        failed.sync_status = MeetSyncStatus::Failed;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![linked.clone()]])
            .append_query_results(vec![Vec::<users::Model>::new()])
            .append_query_results(vec![Vec::<entity::email_mappings::Model>::new()])
            // an earlier run already created the session
            .append_query_results(vec![vec![pending.clone()]])
            .append_query_results(vec![vec![pending.clone()], vec![claimed.clone()]])
            // mark_failed before the error propagates
            .append_query_results(vec![vec![claimed.clone()], vec![failed.clone()]])
            .into_connection();

        let config = test_config(&server);
        let reports = test_provider(&server, REPORTS_SCOPES);
        let calendar = test_provider(&server, CALENDAR_SCOPES);
        let cancel = AtomicBool::new(false);
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let result = process_date(&db, &config, &reports, &calendar, date, &cancel).await;

        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.is_auth());
        }
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_session() {
        let server = Server::new_async().await;

        let first = meeting(Some("https://meet.google.com/abc-defg-hij"));
        let second = meeting(Some("https://meet.google.com/kln-mnop-qrs"));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![first, second]])
            .append_query_results(vec![Vec::<users::Model>::new()])
            .append_query_results(vec![Vec::<entity::email_mappings::Model>::new()])
            .into_connection();

        let config = test_config(&server);
        let reports = test_provider(&server, REPORTS_SCOPES);
        let calendar = test_provider(&server, CALENDAR_SCOPES);
        let cancel = AtomicBool::new(true);
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let result = process_date(&db, &config, &reports, &calendar, date, &cancel)
            .await
            .expect("cancellation is not an error");

        assert_eq!(result.meetings_processed, 0);
        assert_eq!(result.skipped_no_link, 0);

        // Only the meeting and snapshot lookups ran before the flag stopped us.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn discover_reports_links_without_writing() {
        let mut server = Server::new_async().await;
        let _token = mock_token_endpoint(&mut server).await;
        let _calendar = server
            .mock("GET", "/calendars/primary/events")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let linked = meeting(Some("https://meet.google.com/abc-defg-hij"));
        let linkless = meeting(None);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![linked.clone(), linkless.clone()]])
            // neither meeting has an existing session
            .append_query_results(vec![
                Vec::<meet_sessions::Model>::new(),
                Vec::<meet_sessions::Model>::new(),
            ])
            .into_connection();

        let config = test_config(&server);
        let calendar = test_provider(&server, CALENDAR_SCOPES);
        let date = NaiveDate::from_ymd_opt(2025, 4, 15).unwrap();

        let report = discover(&db, &config, &calendar, date)
            .await
            .expect("discovery should succeed");

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].meet_code.as_deref(), Some("abcdefghij"));
        assert_eq!(report[1].meet_code, None);

        // Lookups only; no session or attendance rows were created.
        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
    }
}
