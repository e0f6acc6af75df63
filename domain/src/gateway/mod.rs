//! HTTP gateways to the Google APIs the sync pipeline depends on.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use log::*;
use std::time::{Duration, SystemTime};

pub mod admin_reports;
pub mod google_auth;
pub mod google_calendar;

/// Reads a `Retry-After` header, accepting both delta-seconds and HTTP-date
/// forms. Returns `None` when the header is absent or unreadable.
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;

    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(SystemTime::now()).ok()
}

/// Translates a non-success Google API response into the matching error kind.
pub(crate) fn error_for_status(
    status: reqwest::StatusCode,
    retry_after: Option<Duration>,
    body: String,
) -> Error {
    warn!("Google API error ({status}): {body}");

    let error_kind = match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            DomainErrorKind::External(ExternalErrorKind::Auth(body))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            DomainErrorKind::External(ExternalErrorKind::RateLimited { retry_after })
        }
        _ => DomainErrorKind::External(ExternalErrorKind::Upstream {
            status: status.as_u16(),
            message: body,
        }),
    };

    Error {
        source: None,
        error_kind,
    }
}
