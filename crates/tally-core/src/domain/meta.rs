//! Result-backend records.
//!
//! The backend is the source of truth for task state. Workers overwrite the
//! whole record on every transition, so readers always see one coherent value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TaskId, TaskStatus};

/// One task's record in the result backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMeta {
    pub task_id: TaskId,
    pub status: TaskStatus,

    /// Success payload or failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Number of deliveries that reached a worker.
    #[serde(default)]
    pub attempts: u32,

    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_done: Option<DateTime<Utc>>,
}

impl TaskMeta {
    pub fn pending(task_id: TaskId, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            result: None,
            attempts: 0,
            updated_at: now,
            date_done: None,
        }
    }

    pub fn started(task_id: TaskId, attempt: u32, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Started,
            result: None,
            attempts: attempt,
            updated_at: now,
            date_done: None,
        }
    }

    /// Waiting for redelivery; keeps the last error for observability.
    pub fn retry(task_id: TaskId, attempt: u32, error: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Retry,
            result: Some(error.into()),
            attempts: attempt,
            updated_at: now,
            date_done: None,
        }
    }

    pub fn success(task_id: TaskId, attempt: u32, result: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Success,
            result: Some(result.into()),
            attempts: attempt,
            updated_at: now,
            date_done: Some(now),
        }
    }

    pub fn failure(task_id: TaskId, attempt: u32, error: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Failure,
            result: Some(error.into()),
            attempts: attempt,
            updated_at: now,
            date_done: Some(now),
        }
    }
}

/// What `TaskExecutor::query` returns: a point read of the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    /// True for any terminal status.
    pub ready: bool,
    /// Only populated when ready.
    pub result: Option<String>,
}

impl TaskSnapshot {
    pub fn unknown() -> Self {
        Self {
            status: TaskStatus::Unknown,
            ready: false,
            result: None,
        }
    }
}

impl From<TaskMeta> for TaskSnapshot {
    fn from(meta: TaskMeta) -> Self {
        let ready = meta.status.is_terminal();
        Self {
            status: meta.status,
            ready,
            // RETRY carries the last error in the record, but the task is not
            // finished, so callers see no result yet.
            result: if ready { meta.result } else { None },
        }
    }
}
