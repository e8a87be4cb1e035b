//! Error types for fetching, persistence and configuration.
//!
//! Fetch errors are per source and never abort a run. Store and config errors
//! are fatal and propagate up to `main`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single source produced no postings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchErrorKind {
    /// The request did not complete within the client timeout.
    #[error("request timed out")]
    Timeout,
    /// The board answered with a non-2xx status.
    #[error("HTTP status {0}")]
    Http(u16),
    /// The body could not be decoded into the shape the adapter expects.
    #[error("could not parse response: {0}")]
    Parse(String),
    /// Connection-level failure (DNS, TLS, refused connection).
    #[error("request failed: {0}")]
    Network(String),
    /// The configured source URL cannot be turned into a request.
    #[error("bad endpoint: {0}")]
    BadEndpoint(String),
}

impl From<reqwest::Error> for FetchErrorKind {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = e.status() {
            FetchErrorKind::Http(status.as_u16())
        } else if e.is_decode() {
            FetchErrorKind::Parse(e.to_string())
        } else {
            FetchErrorKind::Network(e.to_string())
        }
    }
}

/// A [`FetchErrorKind`] tagged with the source it happened on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{source_name}: {kind}")]
pub struct FetchError {
    pub source_name: String,
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(source_name: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self {
            source_name: source_name.into(),
            kind,
        }
    }
}

/// Failures loading or saving the known-postings file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("known postings file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read known postings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write known postings file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures loading the sources/keywords config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("could not parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("source {name:?} has an invalid url {url:?}: {source}")]
    InvalidSource {
        name: String,
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_names_source() {
        let e = FetchError::new("Linear", FetchErrorKind::Http(503));
        assert_eq!(e.to_string(), "Linear: HTTP status 503");
    }

    #[test]
    fn test_timeout_display() {
        let e = FetchError::new("Datadog", FetchErrorKind::Timeout);
        assert_eq!(e.to_string(), "Datadog: request timed out");
    }
}
