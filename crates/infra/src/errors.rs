//! Infrastructure error conversions.
//!
//! `SyncError` lives in the domain crate, so conversions from foreign error
//! types (reqwest, std::io) go through this newtype to stay clear of the
//! orphan rule.

use esusync_domain::SyncError;
use thiserror::Error;

/// Newtype wrapper carrying a domain error across infra boundaries.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(pub SyncError);

impl From<reqwest::Error> for InfraError {
    fn from(err: reqwest::Error) -> Self {
        let msg = format!("http: {err}");
        if err.is_decode() {
            Self(SyncError::Internal(msg))
        } else {
            // Timeouts, connect failures and malformed requests all surface
            // as network errors to the rest of the system.
            Self(SyncError::Network(msg))
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        Self(SyncError::Io(err.to_string()))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(err: serde_json::Error) -> Self {
        Self(SyncError::Internal(format!("json: {err}")))
    }
}

impl From<InfraError> for SyncError {
    fn from(err: InfraError) -> Self {
        err.0
    }
}
