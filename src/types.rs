//! Core types for swh-save

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version-control system kind of the origin being saved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitType {
    /// Git repository (default)
    #[default]
    Git,
    /// Mercurial repository
    Hg,
    /// Subversion repository
    Svn,
    /// Bazaar repository
    Bzr,
}

impl VisitType {
    /// Path segment used by the save endpoint
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitType::Git => "git",
            VisitType::Hg => "hg",
            VisitType::Svn => "svn",
            VisitType::Bzr => "bzr",
        }
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VisitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "git" => Ok(VisitType::Git),
            "hg" => Ok(VisitType::Hg),
            "svn" => Ok(VisitType::Svn),
            "bzr" => Ok(VisitType::Bzr),
            other => Err(format!("unsupported visit type: {other}")),
        }
    }
}

/// A request to archive one origin
///
/// Built once per call to [`SwhClient::save`](crate::SwhClient::save) and never
/// mutated afterwards. The auth token is optional: without one, requests are
/// made anonymously (with the lower anonymous rate limit).
#[derive(Clone, PartialEq, Eq)]
pub struct SaveRequest {
    origin_url: String,
    visit_type: VisitType,
    auth_token: Option<String>,
}

impl SaveRequest {
    /// Create an anonymous git save request for `origin_url`
    pub fn new(origin_url: impl Into<String>) -> Self {
        Self {
            origin_url: origin_url.into(),
            visit_type: VisitType::default(),
            auth_token: None,
        }
    }

    /// Use a different visit type
    #[must_use]
    pub fn with_visit_type(mut self, visit_type: VisitType) -> Self {
        self.visit_type = visit_type;
        self
    }

    /// Authenticate requests with a bearer token
    ///
    /// Empty tokens are ignored so that an unset environment variable read as
    /// `""` still yields anonymous mode.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.auth_token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// The origin URL as supplied by the caller
    pub fn origin_url(&self) -> &str {
        &self.origin_url
    }

    /// The visit type
    pub fn visit_type(&self) -> VisitType {
        self.visit_type
    }

    /// The bearer token, if any
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}

impl fmt::Debug for SaveRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveRequest")
            .field("origin_url", &self.origin_url)
            .field("visit_type", &self.visit_type)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Per-call options for a save run
#[derive(Clone, Debug, Default)]
pub struct SaveOptions {
    /// Return right after the save request was submitted, without polling
    pub submit_only: bool,
    /// Token used to abort the run from outside
    pub cancel: tokio_util::sync::CancellationToken,
}

impl SaveOptions {
    /// Options for a fire-and-forget submission
    pub fn submit_only() -> Self {
        Self {
            submit_only: true,
            ..Default::default()
        }
    }
}

/// Identifier of the loading task spawned for a save request
///
/// The service reports it as an integer, but it is treated as an opaque
/// string so either representation decodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTaskId", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Create a task id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTaskId {
    Number(i64),
    Text(String),
}

impl From<RawTaskId> for TaskId {
    fn from(raw: RawTaskId) -> Self {
        match raw {
            RawTaskId::Number(n) => TaskId(n.to_string()),
            RawTaskId::Text(s) => TaskId(s),
        }
    }
}

/// Acceptance-phase status of a save request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SaveRequestStatus {
    /// Awaiting review by the archive
    Pending,
    /// Accepted; a loading task exists or will be created
    Accepted,
    /// Refused by the archive
    Rejected,
    /// A value outside the known vocabulary
    Unknown(String),
}

impl SaveRequestStatus {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            SaveRequestStatus::Pending => "pending",
            SaveRequestStatus::Accepted => "accepted",
            SaveRequestStatus::Rejected => "rejected",
            SaveRequestStatus::Unknown(other) => other,
        }
    }
}

impl From<String> for SaveRequestStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => SaveRequestStatus::Pending,
            "accepted" => SaveRequestStatus::Accepted,
            "rejected" => SaveRequestStatus::Rejected,
            _ => SaveRequestStatus::Unknown(value),
        }
    }
}

impl From<SaveRequestStatus> for String {
    fn from(status: SaveRequestStatus) -> Self {
        match status {
            SaveRequestStatus::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SaveRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion-phase status of the loading task
///
/// The archive spells some values with spaces (`not yet scheduled`); both
/// that form and the underscore form decode to the same variant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SaveTaskStatus {
    /// No task has been created yet
    #[default]
    NotCreated,
    /// Task created but not handed to a worker
    NotYetScheduled,
    /// Task queued on a worker
    Scheduled,
    /// Task waiting to run
    Pending,
    /// Task is loading the origin
    Running,
    /// Visit completed
    Succeeded,
    /// Visit failed
    Failed,
    /// A value outside the known vocabulary
    Unknown(String),
}

impl SaveTaskStatus {
    /// Wire representation, as the archive spells it
    pub fn as_str(&self) -> &str {
        match self {
            SaveTaskStatus::NotCreated => "not created",
            SaveTaskStatus::NotYetScheduled => "not yet scheduled",
            SaveTaskStatus::Scheduled => "scheduled",
            SaveTaskStatus::Pending => "pending",
            SaveTaskStatus::Running => "running",
            SaveTaskStatus::Succeeded => "succeeded",
            SaveTaskStatus::Failed => "failed",
            SaveTaskStatus::Unknown(other) => other,
        }
    }

    /// Whether the task has reached `succeeded` or `failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, SaveTaskStatus::Succeeded | SaveTaskStatus::Failed)
    }
}

impl From<String> for SaveTaskStatus {
    fn from(value: String) -> Self {
        match value.replace('_', " ").as_str() {
            "not created" => SaveTaskStatus::NotCreated,
            "not yet scheduled" => SaveTaskStatus::NotYetScheduled,
            "scheduled" => SaveTaskStatus::Scheduled,
            "pending" => SaveTaskStatus::Pending,
            "running" => SaveTaskStatus::Running,
            "succeeded" => SaveTaskStatus::Succeeded,
            "failed" => SaveTaskStatus::Failed,
            _ => SaveTaskStatus::Unknown(value),
        }
    }
}

impl From<SaveTaskStatus> for String {
    fn from(status: SaveTaskStatus) -> Self {
        match status {
            SaveTaskStatus::Unknown(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SaveTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One save request record as returned by the archive
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Save request id
    #[serde(default)]
    pub id: Option<u64>,
    /// Loading task id (absent while the request awaits review)
    #[serde(default, rename = "loading_task_id")]
    pub task_id: Option<TaskId>,
    /// Origin the request refers to
    pub origin_url: String,
    /// Visit type the request was made with
    #[serde(default)]
    pub visit_type: Option<String>,
    /// Acceptance status
    pub save_request_status: SaveRequestStatus,
    /// Task status (absent means no task yet)
    #[serde(default, deserialize_with = "null_as_default")]
    pub save_task_status: SaveTaskStatus,
    /// Status of the archive visit, once one ran
    #[serde(default)]
    pub visit_status: Option<String>,
    /// Free-form note from the archive, e.g. a rejection reason
    #[serde(default)]
    pub note: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of a save endpoint response: one record or a list of them
///
/// `POST` always answers with a single object; `GET` may answer with every
/// save request recorded for the origin.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TaskPayload {
    /// List of records, most recent first
    Many(Vec<TaskRecord>),
    /// A single record
    One(TaskRecord),
}

/// Quota information read from rate-limit headers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitStatus {
    /// Requests left in the current window
    pub remaining: Option<u64>,
    /// Epoch second at which the window resets
    pub reset_epoch_seconds: Option<i64>,
}

/// Successful result of a save run
#[derive(Clone, Debug, PartialEq)]
pub enum SaveOutcome {
    /// Submission accepted by the API; no polling was requested
    Submitted {
        /// Record returned by the submission
        record: TaskRecord,
    },
    /// The archive visit completed
    Succeeded {
        /// Final visit status reported by the archive
        visit_status: Option<String>,
        /// Last record fetched
        record: TaskRecord,
    },
}

impl SaveOutcome {
    /// Last record seen during the run
    pub fn record(&self) -> &TaskRecord {
        match self {
            SaveOutcome::Submitted { record } | SaveOutcome::Succeeded { record, .. } => record,
        }
    }

    /// Visit status, when the run waited for completion
    pub fn visit_status(&self) -> Option<&str> {
        match self {
            SaveOutcome::Submitted { .. } => None,
            SaveOutcome::Succeeded { visit_status, .. } => visit_status.as_deref(),
        }
    }
}

/// Event emitted during a save run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Backing off because the quota is exhausted
    Throttled {
        /// Origin URL
        origin_url: String,
        /// Delay before the next request, in seconds
        wait_secs: u64,
    },

    /// Submission was throttled; the whole save starts over
    Resubmitting {
        /// Origin URL
        origin_url: String,
        /// Number of restarts so far
        restart: u32,
    },

    /// Save request submitted
    Submitted {
        /// Origin URL
        origin_url: String,
        /// Loading task id, if one was already assigned
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        /// Acceptance status at submission time
        request_status: SaveRequestStatus,
    },

    /// Save request still awaiting acceptance
    RequestPending {
        /// Origin URL
        origin_url: String,
        /// Poll attempt number (1-based)
        attempt: u32,
    },

    /// Save request accepted by the archive
    RequestAccepted {
        /// Origin URL
        origin_url: String,
    },

    /// Loading task not finished yet
    TaskProgress {
        /// Origin URL
        origin_url: String,
        /// Current task status
        status: SaveTaskStatus,
        /// Poll attempt number (1-based)
        attempt: u32,
    },

    /// Archival succeeded
    Succeeded {
        /// Origin URL
        origin_url: String,
        /// Final visit status
        #[serde(skip_serializing_if = "Option::is_none")]
        visit_status: Option<String>,
    },

    /// Run ended with an error
    Failed {
        /// Origin URL
        origin_url: String,
        /// Error message
        error: String,
    },
}
