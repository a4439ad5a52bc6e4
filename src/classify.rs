//! Mapping of HTTP statuses and record fields onto the error taxonomy

use crate::error::{Error, Result};
use crate::types::{SaveRequestStatus, SaveTaskStatus, TaskRecord};

/// Where a save request stands in the acceptance phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acceptance {
    /// Still awaiting review
    Pending,
    /// Accepted, the loading task can be followed
    Accepted,
}

/// Where a loading task stands in the completion phase
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Not finished; carries the current status
    InProgress(SaveTaskStatus),
    /// Visit completed successfully
    Succeeded,
}

/// Classify the status code of a save endpoint response
///
/// Only `200` is a success. `429` becomes [`Error::RateLimited`] carrying the
/// advertised reset time, so that the caller can back off and retry.
pub fn classify_status(
    status: u16,
    origin_url: &str,
    body: &str,
    reset_epoch: Option<i64>,
) -> Result<()> {
    let origin_url = origin_url.to_string();
    let body = body.to_string();
    match status {
        200 => Ok(()),
        400 => Err(Error::InvalidRequest { origin_url, body }),
        403 => Err(Error::BlacklistedOrigin { origin_url, body }),
        404 => Err(Error::NoSaveRequestFound { origin_url, body }),
        429 => Err(Error::RateLimited {
            origin_url,
            reset_epoch,
        }),
        status => Err(Error::UnknownStatus { origin_url, status }),
    }
}

/// Classify the acceptance status of a record
///
/// `raw` is the response the record was decoded from, kept for the
/// rejection message.
pub fn classify_request_status(record: &TaskRecord, raw: &str) -> Result<Acceptance> {
    match &record.save_request_status {
        SaveRequestStatus::Pending => Ok(Acceptance::Pending),
        SaveRequestStatus::Accepted => Ok(Acceptance::Accepted),
        SaveRequestStatus::Rejected => Err(Error::Rejected {
            origin_url: record.origin_url.clone(),
            note: record.note.clone(),
            response: raw.to_string(),
        }),
        SaveRequestStatus::Unknown(value) => Err(Error::UnknownTaskStatus {
            origin_url: record.origin_url.clone(),
            field: "save_request_status",
            value: value.clone(),
        }),
    }
}

/// Classify the task status of a record
pub fn classify_task_status(record: &TaskRecord, raw: &str) -> Result<Completion> {
    let status = &record.save_task_status;
    if !status.is_terminal() {
        return match status {
            SaveTaskStatus::Unknown(value) => Err(Error::UnknownTaskStatus {
                origin_url: record.origin_url.clone(),
                field: "save_task_status",
                value: value.clone(),
            }),
            waiting => Ok(Completion::InProgress(waiting.clone())),
        };
    }
    if *status == SaveTaskStatus::Succeeded {
        return Ok(Completion::Succeeded);
    }
    Err(Error::TaskFailed {
        origin_url: record.origin_url.clone(),
        visit_status: record.visit_status.clone(),
        response: raw.to_string(),
    })
}
