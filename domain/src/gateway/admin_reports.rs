//! Client for the Admin SDK Reports API's Meet activity feed.
//!
//! Wire types here mirror the audit-log JSON as delivered, nullable fields
//! and all. Interpreting them into something the correlation pipeline can
//! trust happens in `meet_event`, not here.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use chrono::{DateTime, SecondsFormat, Utc};
use log::*;
use reqwest::header;
use serde::Deserialize;
use std::time::Duration;

/// Largest page the Reports API will serve in one response.
pub const MAX_PAGE_SIZE: usize = 1000;

const MEET_ACTIVITIES_PATH: &str = "/admin/reports/v1/activity/users/all/applications/meet";

/// Builds the server-side event filter, one `meet:<type>` entry per requested
/// event type. An empty request means no filter.
fn event_name_filter(event_types: &[&str]) -> Option<String> {
    if event_types.is_empty() {
        return None;
    }
    Some(
        event_types
            .iter()
            .map(|event_type| format!("meet:{event_type}"))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// One page of the activities list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesPage {
    #[serde(default)]
    pub items: Vec<RawActivity>,
    pub next_page_token: Option<String>,
}

/// A single audit-log activity record, exactly as the API returns it.
/// Every field the upstream marks optional stays optional here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    pub id: Option<ActivityId>,
    pub actor: Option<Actor>,
    #[serde(default)]
    pub events: Vec<ActivityEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityId {
    pub time: Option<DateTime<Utc>>,
    pub unique_qualifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub email: Option<String>,
    pub caller_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub parameters: Vec<EventParameter>,
}

/// The audit log string-encodes 64-bit integers, hence `int_value: String`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParameter {
    pub name: Option<String>,
    pub value: Option<String>,
    pub int_value: Option<String>,
    pub bool_value: Option<bool>,
}

impl ActivityEvent {
    pub fn string_param(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .and_then(|p| p.value.as_deref())
    }

    pub fn int_param(&self, name: &str) -> Option<i64> {
        self.parameters
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .and_then(|p| p.int_value.as_deref())
            .and_then(|v| v.parse().ok())
    }

    pub fn bool_param(&self, name: &str) -> Option<bool> {
        self.parameters
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .and_then(|p| p.bool_value)
    }
}

pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new(access_token: &str, base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let mut headers = header::HeaderMap::new();
        let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|e| Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Access token is not a valid header value".to_string(),
                )),
            })?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Fetches Meet audit activities in `[window_start, window_end)`, following
    /// page tokens until the feed is exhausted or `max_events` records have
    /// been collected. `event_types` filters server-side, e.g. `["call_ended"]`.
    pub async fn fetch_meet_activities(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        event_types: &[&str],
        max_events: usize,
    ) -> Result<Vec<RawActivity>, Error> {
        let url = format!("{}{}", self.base_url, MEET_ACTIVITIES_PATH);
        let start = window_start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = window_end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let event_name = event_name_filter(event_types);

        let mut activities: Vec<RawActivity> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let remaining = max_events.saturating_sub(activities.len());
            if remaining == 0 {
                break;
            }
            let page_size = remaining.min(MAX_PAGE_SIZE);

            let mut request = self.client.get(&url).query(&[
                ("startTime", start.as_str()),
                ("endTime", end.as_str()),
                ("maxResults", page_size.to_string().as_str()),
            ]);
            if let Some(name) = event_name.as_deref() {
                request = request.query(&[("eventName", name)]);
            }
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let retry_after = super::retry_after(response.headers());
                let body = response.text().await.unwrap_or_default();
                return Err(super::error_for_status(status, retry_after, body));
            }

            let page: ActivitiesPage = response.json().await.map_err(|e| {
                warn!("Failed to parse Reports API response: {e:?}");
                Error {
                    source: Some(Box::new(e)),
                    error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                        "Invalid response from Reports API".to_string(),
                    )),
                }
            })?;

            let fetched = page.items.len();
            activities.extend(page.items);
            debug!(
                "Fetched {fetched} Meet activities (total {})",
                activities.len()
            );

            // An empty page means the feed is done no matter what the token says.
            if fetched == 0 {
                break;
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        activities.truncate(max_events);
        Ok(activities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    fn test_window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 4, 15, 5, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 16, 5, 0, 0).unwrap(),
        )
    }

    fn activity_json(qualifier: &str) -> serde_json::Value {
        serde_json::json!({
            "id": {"time": "2025-04-15T15:46:00Z", "uniqueQualifier": qualifier},
            "actor": {"email": "alice@cadenceclub.org", "callerType": "USER"},
            "events": [{
                "type": "call",
                "name": "call_ended",
                "parameters": [
                    {"name": "meeting_code", "value": "ABCDEFGHIJ"},
                    {"name": "duration_seconds", "intValue": "2760"},
                    {"name": "is_external", "boolValue": false}
                ]
            }]
        })
    }

    #[tokio::test]
    async fn fetches_a_single_page_of_activities() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/admin/reports/v1/activity/users/all/applications/meet",
            )
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("startTime".into(), "2025-04-15T05:00:00Z".into()),
                Matcher::UrlEncoded("endTime".into(), "2025-04-16T05:00:00Z".into()),
                Matcher::UrlEncoded("eventName".into(), "meet:call_ended".into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "kind": "admin#reports#activities",
                    "items": [activity_json("q1"), activity_json("q2")]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = Client::new("test-token", &server.url(), Duration::from_secs(5))
            .expect("client should build");
        let (start, end) = test_window();

        let activities = client
            .fetch_meet_activities(start, end, &["call_ended"], 1000)
            .await
            .expect("fetch should succeed");

        assert_eq!(activities.len(), 2);
        let event = &activities[0].events[0];
        assert_eq!(event.name.as_deref(), Some("call_ended"));
        assert_eq!(event.string_param("meeting_code"), Some("ABCDEFGHIJ"));
        assert_eq!(event.int_param("duration_seconds"), Some(2760));
        assert_eq!(event.bool_param("is_external"), Some(false));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn follows_page_tokens_until_the_event_cap() {
        let mut server = Server::new_async().await;
        // Every response advertises another page; the cap is what stops the loop.
        let mock = server
            .mock(
                "GET",
                "/admin/reports/v1/activity/users/all/applications/meet",
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "items": [activity_json("q1")],
                    "nextPageToken": "page-2"
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let client = Client::new("test-token", &server.url(), Duration::from_secs(5))
            .expect("client should build");
        let (start, end) = test_window();

        let activities = client
            .fetch_meet_activities(start, end, &[], 2)
            .await
            .expect("fetch should succeed");

        assert_eq!(activities.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn requests_at_most_the_api_page_size() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "GET",
                "/admin/reports/v1/activity/users/all/applications/meet",
            )
            .match_query(Matcher::UrlEncoded("maxResults".into(), "1000".into()))
            .with_status(200)
            .with_body(serde_json::json!({"items": [activity_json("q1")]}).to_string())
            .create_async()
            .await;

        let client = Client::new("test-token", &server.url(), Duration::from_secs(5))
            .expect("client should build");
        let (start, end) = test_window();

        let activities = client
            .fetch_meet_activities(start, end, &[], 5000)
            .await
            .expect("fetch should succeed");

        assert_eq!(activities.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn authorization_failures_are_fatal() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                "/admin/reports/v1/activity/users/all/applications/meet",
            )
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"message": "Access denied"}}"#)
            .create_async()
            .await;

        let client = Client::new("test-token", &server.url(), Duration::from_secs(5))
            .expect("client should build");
        let (start, end) = test_window();

        let result = client.fetch_meet_activities(start, end, &[], 1000).await;
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.is_auth());
            assert!(!e.is_retryable());
        }
    }

    #[tokio::test]
    async fn rate_limiting_carries_the_server_retry_delay() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                "/admin/reports/v1/activity/users/all/applications/meet",
            )
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("Retry-After", "7")
            .with_body("rate limit exceeded")
            .create_async()
            .await;

        let client = Client::new("test-token", &server.url(), Duration::from_secs(5))
            .expect("client should build");
        let (start, end) = test_window();

        let result = client.fetch_meet_activities(start, end, &[], 1000).await;
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.is_retryable());
            assert_eq!(e.retry_after(), Some(Duration::from_secs(7)));
            assert!(matches!(
                e.error_kind,
                DomainErrorKind::External(ExternalErrorKind::RateLimited { .. })
            ));
        }
    }

    #[test]
    fn the_event_filter_prefixes_and_joins_types() {
        assert_eq!(event_name_filter(&[]), None);
        assert_eq!(
            event_name_filter(&["call_ended"]),
            Some("meet:call_ended".to_string())
        );
        assert_eq!(
            event_name_filter(&["call_ended", "call_started"]),
            Some("meet:call_ended,meet:call_started".to_string())
        );
    }

    #[test]
    fn event_parameters_parse_string_encoded_integers() {
        let event = ActivityEvent {
            event_type: Some("call".to_string()),
            name: Some("call_ended".to_string()),
            parameters: vec![EventParameter {
                name: Some("duration_seconds".to_string()),
                value: None,
                int_value: Some("not-a-number".to_string()),
                bool_value: None,
            }],
        };

        assert_eq!(event.int_param("duration_seconds"), None);
        assert_eq!(event.string_param("duration_seconds"), None);
    }
}
