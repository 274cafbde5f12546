use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// TaskType + Payload (+ TaskId, attempt) の“運搬用”データ。
///
/// 配送キューを流れるのはこの envelope だけで、状態は result backend 側にある。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    task_id: TaskId,
    task_type: TaskType,
    payload: serde_json::Value,
    #[serde(default = "first_attempt")]
    attempt: u32,
    /// Not to be run before this instant. Set on retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eta: Option<DateTime<Utc>>,
}

fn first_attempt() -> u32 {
    1
}

impl TaskEnvelope {
    pub fn new(task_id: TaskId, task_type: TaskType, payload: serde_json::Value) -> Self {
        Self {
            task_id,
            task_type,
            payload,
            attempt: first_attempt(),
            eta: None,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// 1-indexed attempt number of this delivery.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn eta(&self) -> Option<DateTime<Utc>> {
        self.eta
    }

    /// How long until this envelope is due, or `None` if it may run now.
    pub fn wait_until_due(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        let eta = self.eta?;
        (eta - now).to_std().ok().filter(|d| !d.is_zero())
    }

    /// Envelope for the next delivery of the same task, due at `eta`.
    pub fn next_attempt(&self, eta: DateTime<Utc>) -> Self {
        Self {
            attempt: self.attempt + 1,
            eta: Some(eta),
            ..self.clone()
        }
    }
}
