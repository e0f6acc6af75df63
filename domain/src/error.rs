//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries. Ex. `domain` is dependent on `entity_api`, but the binary crate
/// driving a sync run should not be dependent, directly, on `entity_api`. Each layer is
/// free to define its own error kinds to whatever richness is needed at that layer. The
/// orchestration code ultimately uses the various `error_kind`s to decide whether a
/// failure is fatal to the whole run, retryable, or contained to one session.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    Config,
    Other(String),
}

/// Enum representing the various kinds of entity errors that can bubble up from the "Entity" layer
/// (`entity_api` and `entity`). These errors are translated from the `entity_api` layer to the
/// `domain` layer and reduced to a subset of error kinds that are relevant to the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    DbTransaction,
    Other(String),
}

/// Enum representing the various kinds of external errors that can occur when talking
/// to the Google APIs.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// Credentials or the delegation grant were rejected. Fatal to the whole
    /// run; retrying with the same credentials cannot succeed.
    Auth(String),
    /// Upstream asked us to slow down, with the server-suggested wait when
    /// it sent one.
    RateLimited { retry_after: Option<Duration> },
    /// Upstream answered with an unexpected status.
    Upstream { status: u16, message: String },
    Network,
    Other(String),
}

impl Error {
    /// Whether this failure means the credentials are bad and the whole run
    /// should stop.
    pub fn is_auth(&self) -> bool {
        matches!(
            self.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Auth(_))
        )
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match &self.error_kind {
            DomainErrorKind::External(ExternalErrorKind::RateLimited { .. }) => true,
            DomainErrorKind::External(ExternalErrorKind::Upstream { status, .. }) => *status >= 500,
            DomainErrorKind::External(ExternalErrorKind::Network) => true,
            _ => false,
        }
    }

    /// The wait the server asked for, when it asked for one.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.error_kind {
            DomainErrorKind::External(ExternalErrorKind::RateLimited { retry_after }) => {
                *retry_after
            }
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::RecordNotUpdated => EntityErrorKind::DbTransaction,
            EntityApiErrorKind::SystemError => EntityErrorKind::DbTransaction,
            _ => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                "JWT encoding related error".to_string(),
            )),
        }
    }
}
