//! Error types for swh-save
//!
//! Every way a save run can end unsuccessfully is a variant of [`Error`].
//! Variants carry the origin URL and, where the archive sent one, the raw
//! response body so that callers can report the failure without re-fetching.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for swh-save operations
pub type Result<T> = std::result::Result<T, Error>;

/// Phase of a save run in which a request was made
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Submitting the save request (`POST`)
    Submission,
    /// Polling the save request or its task (`GET`)
    Progress,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Submission => f.write_str("submission"),
            Phase::Progress => f.write_str("progress check"),
        }
    }
}

/// Polling loop that ran out of budget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollPhase {
    /// Waiting for the save request to be accepted
    Acceptance,
    /// Waiting for the loading task to finish
    Completion,
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollPhase::Acceptance => f.write_str("acceptance"),
            PollPhase::Completion => f.write_str("completion"),
        }
    }
}

/// Main error type for swh-save
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_root")
        key: Option<String>,
    },

    /// HTTP client could not be built
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The archive API could not be reached
    #[error(
        "could not connect to the Software Heritage API during {phase} for {origin_url}: {source}"
    )]
    Connectivity {
        /// Phase the request belonged to
        phase: Phase,
        /// Origin being saved
        origin_url: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// HTTP 400: invalid visit type or origin URL
    #[error("an invalid visit type or origin url has been provided\nURL: {origin_url}\n{body}")]
    InvalidRequest {
        /// Origin being saved
        origin_url: String,
        /// Raw response body
        body: String,
    },

    /// HTTP 403: the origin is blacklisted by the archive
    #[error("the provided origin url is blacklisted\nURL: {origin_url}\n{body}")]
    BlacklistedOrigin {
        /// Origin being saved
        origin_url: String,
        /// Raw response body
        body: String,
    },

    /// HTTP 404: no save request exists for the origin
    #[error("no save requests have been found for the given origin\nURL: {origin_url}\n{body}")]
    NoSaveRequestFound {
        /// Origin being saved
        origin_url: String,
        /// Raw response body
        body: String,
    },

    /// HTTP 429 or an exhausted quota that could not be waited out
    #[error("rate limit exceeded while saving {origin_url}")]
    RateLimited {
        /// Origin being saved
        origin_url: String,
        /// Epoch second at which the quota resets, if the archive said
        reset_epoch: Option<i64>,
    },

    /// The archive refused the save request
    #[error(
        "the request to save {origin_url} has been rejected:\nNotes: {}\nFull response: {response}",
        .note.as_deref().unwrap_or("none")
    )]
    Rejected {
        /// Origin being saved
        origin_url: String,
        /// Note attached by the archive
        note: Option<String>,
        /// Raw response body
        response: String,
    },

    /// The loading task finished unsuccessfully
    #[error(
        "saving {origin_url} has failed with visit status {}\nFull response: {response}",
        .visit_status.as_deref().unwrap_or("unknown")
    )]
    TaskFailed {
        /// Origin being saved
        origin_url: String,
        /// Visit status reported by the archive
        visit_status: Option<String>,
        /// Raw response body
        response: String,
    },

    /// Any submission status code without a defined meaning
    #[error("the status of the API response is unknown for {origin_url}: status code {status}")]
    UnknownStatus {
        /// Origin being saved
        origin_url: String,
        /// HTTP status code
        status: u16,
    },

    /// A status field held a value outside its known vocabulary
    #[error("unexpected {field} value {value:?} while saving {origin_url}")]
    UnknownTaskStatus {
        /// Origin being saved
        origin_url: String,
        /// Name of the status field
        field: &'static str,
        /// Value received
        value: String,
    },

    /// A list response held no record for the task being tracked
    #[error("failed to retrieve the save task for {origin_url}\nFull response: {payload}")]
    TaskNotFound {
        /// Origin being saved
        origin_url: String,
        /// Raw response body
        payload: String,
    },

    /// The response body was not a save request record
    #[error("invalid response while saving {origin_url}: {message}\nFull response: {body}")]
    InvalidResponse {
        /// Origin being saved
        origin_url: String,
        /// What could not be decoded
        message: String,
        /// Raw response body
        body: String,
    },

    /// A polling loop exhausted its attempt or time budget
    #[error(
        "gave up waiting for {phase} of {origin_url} after {attempts} polls ({}s)",
        .elapsed.as_secs()
    )]
    PollTimeout {
        /// Loop that timed out
        phase: PollPhase,
        /// Origin being saved
        origin_url: String,
        /// Number of polls performed
        attempts: u32,
        /// Time spent in the loop
        elapsed: Duration,
    },

    /// The run was cancelled by the caller
    #[error("saving {origin_url} was cancelled")]
    Cancelled {
        /// Origin being saved
        origin_url: String,
    },
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(_) => "network_error",
            Error::Connectivity {
                phase: Phase::Submission,
                ..
            } => "connectivity_submission",
            Error::Connectivity {
                phase: Phase::Progress,
                ..
            } => "connectivity_progress",
            Error::InvalidRequest { .. } => "invalid_request",
            Error::BlacklistedOrigin { .. } => "blacklisted_origin",
            Error::NoSaveRequestFound { .. } => "no_save_request_found",
            Error::RateLimited { .. } => "rate_limited",
            Error::Rejected { .. } => "rejected",
            Error::TaskFailed { .. } => "task_failed",
            Error::UnknownStatus { .. } => "unknown_status",
            Error::UnknownTaskStatus { .. } => "unknown_task_status",
            Error::TaskNotFound { .. } => "task_not_found",
            Error::InvalidResponse { .. } => "invalid_response",
            Error::PollTimeout { .. } => "poll_timeout",
            Error::Cancelled { .. } => "cancelled",
        }
    }

    /// Whether the client recovers from this error on its own
    ///
    /// Only throttling is retried (by backing off and starting over); every
    /// other error ends the run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Origin URL the error refers to, if any
    pub fn origin_url(&self) -> Option<&str> {
        match self {
            Error::Config { .. } | Error::Network(_) => None,
            Error::Connectivity { origin_url, .. }
            | Error::InvalidRequest { origin_url, .. }
            | Error::BlacklistedOrigin { origin_url, .. }
            | Error::NoSaveRequestFound { origin_url, .. }
            | Error::RateLimited { origin_url, .. }
            | Error::Rejected { origin_url, .. }
            | Error::TaskFailed { origin_url, .. }
            | Error::UnknownStatus { origin_url, .. }
            | Error::UnknownTaskStatus { origin_url, .. }
            | Error::TaskNotFound { origin_url, .. }
            | Error::InvalidResponse { origin_url, .. }
            | Error::PollTimeout { origin_url, .. }
            | Error::Cancelled { origin_url } => Some(origin_url),
        }
    }
}
