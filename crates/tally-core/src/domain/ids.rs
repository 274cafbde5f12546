//! Task identifiers.
//!
//! TaskId は実行基盤が払い出す不透明な文字列です。
//! 生成は `IdGenerator`（ULID ベース）が担当しますが、HTTP から来た任意の文字列も
//! そのまま TaskId として扱えるように String の newtype にしています。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Display / 生成時のプレフィックス
pub const TASK_ID_PREFIX: &str = "task-";

/// Identifier of a dispatched task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self(format!("{TASK_ID_PREFIX}{ulid}"))
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ulid_ids_carry_prefix() {
        let ulid = Ulid::new();
        let id = TaskId::from(ulid);
        assert_eq!(id.as_str(), format!("task-{ulid}"));
    }

    #[test]
    fn arbitrary_strings_are_accepted() {
        let id = TaskId::from("t1");
        assert_eq!(id.to_string(), "t1");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = TaskId::new("abc");
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, "\"abc\"");

        let back: TaskId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }
}
