//! Client error taxonomy
//!
//! Errors are classified once, at the point where they happen: the backend
//! boundary produces an [`ApiError`] carrying a typed [`ApiErrorKind`], and
//! everything above matches on that kind instead of inspecting message text.

use std::path::PathBuf;
use thiserror::Error;

/// Failure category of a backend request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Backend reported an unknown player or no games to analyze
    NotFound,
    /// Client-side deadline passed; the backend may still finish the work
    Timeout,
    /// Request never completed (connection refused, DNS, reset)
    Network,
    /// Backend answered with a failure
    Server,
}

/// Error produced at the backend request boundary
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    pub fn timeout() -> Self {
        Self::new(ApiErrorKind::Timeout, "request timed out")
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Server, message)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout()
        } else if err.is_decode() {
            Self::server(format!("unreadable response: {}", err))
        } else if let Some(status) = err.status() {
            if status == reqwest::StatusCode::NOT_FOUND {
                Self::not_found(err.to_string())
            } else {
                Self::server(err.to_string())
            }
        } else {
            Self::network(err.to_string())
        }
    }
}

/// Rejected username
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a username")]
    Empty,
    #[error("Username must be at least 3 characters")]
    TooShort,
    #[error("Username is too long (max 25 characters)")]
    TooLong,
    #[error("Username contains characters that are not allowed")]
    InvalidCharacters,
}

/// Outcome of a failed analysis start or run
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("an analysis is already running")]
    Busy,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out waiting for the server (outcome unknown)")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("server error: {0}")]
    Server(String),
}

impl From<ApiError> for AnalysisError {
    fn from(err: ApiError) -> Self {
        match err.kind {
            ApiErrorKind::NotFound => AnalysisError::NotFound(err.message),
            ApiErrorKind::Timeout => AnalysisError::Timeout,
            ApiErrorKind::Network => AnalysisError::Network(err.message),
            ApiErrorKind::Server => AnalysisError::Server(err.message),
        }
    }
}

/// Navigation refused because the session has nothing valid to show
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionExpiredError {
    #[error("Could not verify the analysis session")]
    Unavailable,
    #[error("No valid analysis in this session")]
    NoAnalysis,
    #[error("The analysis has expired")]
    Expired { expired_at: i64 },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no {0} results to export")]
    NothingToExport(&'static str),
    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
