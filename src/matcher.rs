//! Locating the record of the tracked save request in a response body

use crate::error::{Error, Result};
use crate::types::{TaskId, TaskPayload, TaskRecord};

/// Identity of the save request a run is tracking
///
/// A request that still awaits review has no loading task yet, so the save
/// request id is used as a fallback key. When neither is known the run tracks
/// "the record without a task".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKey {
    /// Loading task id
    Task(TaskId),
    /// Save request id
    Request(u64),
    /// No identifier assigned yet
    Unassigned,
}

impl TaskKey {
    /// Key for the record returned by the submission
    pub fn for_record(record: &TaskRecord) -> Self {
        match (&record.task_id, record.id) {
            (Some(task_id), _) => TaskKey::Task(task_id.clone()),
            (None, Some(id)) => TaskKey::Request(id),
            (None, None) => TaskKey::Unassigned,
        }
    }

    /// Whether `record` is the one tracked by this key
    pub fn matches(&self, record: &TaskRecord) -> bool {
        match self {
            TaskKey::Task(task_id) => record.task_id.as_ref() == Some(task_id),
            TaskKey::Request(id) => record.id == Some(*id),
            TaskKey::Unassigned => record.task_id.is_none(),
        }
    }
}

/// Resolve a payload to the tracked record
///
/// A single record is returned as-is. A list is scanned in order and the
/// first match wins; `raw` is the undecoded body, echoed in the error when
/// nothing matches.
pub fn find_task_record(
    payload: TaskPayload,
    key: &TaskKey,
    origin_url: &str,
    raw: &str,
) -> Result<TaskRecord> {
    match payload {
        TaskPayload::One(record) => Ok(record),
        TaskPayload::Many(records) => records
            .into_iter()
            .find(|record| key.matches(record))
            .ok_or_else(|| Error::TaskNotFound {
                origin_url: origin_url.to_string(),
                payload: raw.to_string(),
            }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaveRequestStatus;

    const ORIGIN: &str = "https://github.com/example/repo";

    fn record(id: Option<u64>, task_id: Option<&str>, status: SaveRequestStatus) -> TaskRecord {
        TaskRecord {
            id,
            task_id: task_id.map(TaskId::new),
            origin_url: ORIGIN.to_string(),
            visit_type: Some("git".into()),
            save_request_status: status,
            save_task_status: Default::default(),
            visit_status: None,
            note: None,
        }
    }

    #[test]
    fn single_record_is_returned_without_id_check() {
        let only = record(Some(1), Some("99"), SaveRequestStatus::Accepted);
        let key = TaskKey::Task(TaskId::new("12"));
        let found = find_task_record(TaskPayload::One(only.clone()), &key, ORIGIN, "{}").unwrap();
        assert_eq!(found, only);
    }

    #[test]
    fn list_returns_exact_record() {
        let records = vec![
            record(Some(3), Some("30"), SaveRequestStatus::Rejected),
            record(Some(2), Some("20"), SaveRequestStatus::Accepted),
            record(Some(1), Some("10"), SaveRequestStatus::Accepted),
        ];
        let key = TaskKey::Task(TaskId::new("20"));
        let found =
            find_task_record(TaskPayload::Many(records.clone()), &key, ORIGIN, "[]").unwrap();
        assert_eq!(found, records[1]);
    }

    #[test]
    fn list_without_id_fails_with_payload() {
        let records = vec![record(Some(1), Some("10"), SaveRequestStatus::Accepted)];
        let key = TaskKey::Task(TaskId::new("11"));
        let raw = r#"[{"loading_task_id": 10}]"#;
        match find_task_record(TaskPayload::Many(records), &key, ORIGIN, raw) {
            Err(Error::TaskNotFound {
                origin_url,
                payload,
            }) => {
                assert_eq!(origin_url, ORIGIN);
                assert_eq!(payload, raw);
            }
            other => panic!("expected TaskNotFound, got {other:?}"),
        }
    }

    #[test]
    fn empty_list_is_not_found() {
        let key = TaskKey::Unassigned;
        let result = find_task_record(TaskPayload::Many(vec![]), &key, ORIGIN, "[]");
        assert!(matches!(result, Err(Error::TaskNotFound { .. })));
    }

    #[test]
    fn first_match_wins() {
        let mut first = record(Some(5), Some("50"), SaveRequestStatus::Pending);
        first.note = Some("first".into());
        let mut second = record(Some(5), Some("50"), SaveRequestStatus::Accepted);
        second.note = Some("second".into());
        let key = TaskKey::Task(TaskId::new("50"));
        let found =
            find_task_record(TaskPayload::Many(vec![first, second]), &key, ORIGIN, "").unwrap();
        assert_eq!(found.note.as_deref(), Some("first"));
    }

    #[test]
    fn key_prefers_task_id_then_request_id() {
        let with_task = record(Some(1), Some("10"), SaveRequestStatus::Accepted);
        assert_eq!(
            TaskKey::for_record(&with_task),
            TaskKey::Task(TaskId::new("10"))
        );

        let pending = record(Some(1), None, SaveRequestStatus::Pending);
        assert_eq!(TaskKey::for_record(&pending), TaskKey::Request(1));

        let bare = record(None, None, SaveRequestStatus::Pending);
        assert_eq!(TaskKey::for_record(&bare), TaskKey::Unassigned);
    }

    #[test]
    fn request_key_survives_task_assignment() {
        // Submitted while pending review, task assigned after acceptance
        let key = TaskKey::Request(7);
        let accepted = record(Some(7), Some("70"), SaveRequestStatus::Accepted);
        let other = record(Some(6), Some("60"), SaveRequestStatus::Accepted);
        let found = find_task_record(
            TaskPayload::Many(vec![other, accepted.clone()]),
            &key,
            ORIGIN,
            "",
        )
        .unwrap();
        assert_eq!(found, accepted);
    }

    #[test]
    fn unassigned_key_matches_record_without_task() {
        let key = TaskKey::Unassigned;
        assert!(key.matches(&record(None, None, SaveRequestStatus::Pending)));
        assert!(!key.matches(&record(None, Some("1"), SaveRequestStatus::Pending)));
    }
}
