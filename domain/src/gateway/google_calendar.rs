//! Client for the Google Calendar API, used to discover a Meet link when a
//! meeting record does not carry one.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use crate::meet_link;
use chrono::{DateTime, SecondsFormat, Utc};
use log::*;
use reqwest::header;
use serde::Deserialize;
use std::time::Duration;

/// Discovery only ever wants the handful of events nearest the meeting.
const MAX_SEARCH_RESULTS: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub hangout_link: Option<String>,
    pub conference_data: Option<ConferenceData>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    #[serde(default)]
    pub entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub entry_point_type: Option<String>,
    pub uri: Option<String>,
}

impl CalendarEvent {
    /// The event's Meet URL, checking the dedicated link field first, then
    /// conference entry points, then URLs buried in the description.
    pub fn meet_uri(&self) -> Option<String> {
        if let Some(link) = self.hangout_link.as_deref() {
            if meet_link::meet_code_from_link(link).is_some() {
                return Some(link.to_string());
            }
        }

        if let Some(conference) = self.conference_data.as_ref() {
            for entry_point in &conference.entry_points {
                if entry_point.entry_point_type.as_deref() == Some("video") {
                    if let Some(uri) = entry_point.uri.as_deref() {
                        if meet_link::meet_code_from_link(uri).is_some() {
                            return Some(uri.to_string());
                        }
                    }
                }
            }
        }

        self.description
            .as_deref()
            .and_then(meet_link::find_meet_link)
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

    /// Full-text search of one calendar, expanded to single event instances
    /// and ordered by start time.
    pub async fn search_events(
        &self,
        calendar_id: &str,
        keyword: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, Error> {
        let url = format!("{}/calendars/{calendar_id}/events", self.base_url);

        debug!("Searching calendar {calendar_id} for {keyword:?}");

        let time_min_param = time_min.to_rfc3339_opts(SecondsFormat::Secs, true);
        let time_max_param = time_max.to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = MAX_SEARCH_RESULTS.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", keyword),
                ("timeMin", time_min_param.as_str()),
                ("timeMax", time_max_param.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = super::retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(super::error_for_status(status, retry_after, body));
        }

        let page: EventsPage = response.json().await.map_err(|e| {
            warn!("Failed to parse Calendar API response: {e:?}");
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Invalid response from Calendar API".to_string(),
                )),
            }
        })?;

        Ok(page.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    fn bare_event() -> CalendarEvent {
        CalendarEvent {
            id: Some("evt-1".to_string()),
            summary: Some("Accountability check-in".to_string()),
            hangout_link: None,
            conference_data: None,
            description: None,
        }
    }

    #[test]
    fn the_hangout_link_field_wins_when_present() {
        let event = CalendarEvent {
            hangout_link: Some("https://meet.google.com/abc-defg-hij".to_string()),
            description: Some("Backup: https://meet.google.com/zzz-zzzz-zzz".to_string()),
            ..bare_event()
        };

        assert_eq!(
            event.meet_uri(),
            Some("https://meet.google.com/abc-defg-hij".to_string())
        );
    }

    #[test]
    fn video_entry_points_are_used_when_the_link_field_is_absent() {
        let event = CalendarEvent {
            conference_data: Some(ConferenceData {
                entry_points: vec![
                    EntryPoint {
                        entry_point_type: Some("phone".to_string()),
                        uri: Some("tel:+1-555-0100".to_string()),
                    },
                    EntryPoint {
                        entry_point_type: Some("video".to_string()),
                        uri: Some("https://meet.google.com/abc-defg-hij".to_string()),
                    },
                ],
            }),
            ..bare_event()
        };

        assert_eq!(
            event.meet_uri(),
            Some("https://meet.google.com/abc-defg-hij".to_string())
        );
    }

    #[test]
    fn the_description_is_scanned_as_a_last_resort() {
        let event = CalendarEvent {
            description: Some("Join: https://meet.google.com/abc-defg-hij".to_string()),
            ..bare_event()
        };

        assert_eq!(
            event.meet_uri(),
            Some("https://meet.google.com/abc-defg-hij".to_string())
        );
    }

    #[test]
    fn events_without_any_meet_link_yield_nothing() {
        let event = CalendarEvent {
            description: Some("Dial in by phone".to_string()),
            ..bare_event()
        };

        assert_eq!(event.meet_uri(), None);
    }

    #[tokio::test]
    async fn searches_are_scoped_expanded_and_ordered() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "accountability".into()),
                Matcher::UrlEncoded("timeMin".into(), "2025-04-15T09:00:00Z".into()),
                Matcher::UrlEncoded("timeMax".into(), "2025-04-15T21:00:00Z".into()),
                Matcher::UrlEncoded("singleEvents".into(), "true".into()),
                Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
                Matcher::UrlEncoded("maxResults".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "items": [{
                        "id": "evt-1",
                        "summary": "Accountability check-in",
                        "hangoutLink": "https://meet.google.com/abc-defg-hij"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = Client::new("test-token", &server.url(), Duration::from_secs(5))
            .expect("client should build");

        let events = client
            .search_events(
                "primary",
                "accountability",
                Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 4, 15, 21, 0, 0).unwrap(),
            )
            .await
            .expect("search should succeed");

        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].meet_uri(),
            Some("https://meet.google.com/abc-defg-hij".to_string())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn authorization_failures_are_fatal() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error": {"message": "Invalid credentials"}}"#)
            .create_async()
            .await;

        let client = Client::new("test-token", &server.url(), Duration::from_secs(5))
            .expect("client should build");

        let result = client
            .search_events(
                "primary",
                "accountability",
                Utc.with_ymd_and_hms(2025, 4, 15, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 4, 15, 21, 0, 0).unwrap(),
            )
            .await;

        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.is_auth());
        }
    }
}
