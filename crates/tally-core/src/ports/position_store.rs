//! PositionStore port - pending な task_id の順序付き列
//!
//! 各操作はバックエンド側でアトミック（Redis なら RPUSH / LREM / LPOS）。
//! 複数操作をまたぐ一貫性は保証しません。

use async_trait::async_trait;

use crate::domain::{StoreError, TaskId};

/// Raw ordered-sequence operations. Errors are returned as-is; the
/// `PositionTracker` decides how to degrade.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Append to the tail. Returns the new length.
    async fn append(&self, key: &str, task_id: &TaskId) -> Result<usize, StoreError>;

    /// Remove every occurrence. Returns how many were removed.
    async fn remove_all(&self, key: &str, task_id: &TaskId) -> Result<usize, StoreError>;

    /// 0-based index of the first occurrence.
    async fn index_of(&self, key: &str, task_id: &TaskId) -> Result<Option<usize>, StoreError>;

    async fn len(&self, key: &str) -> Result<usize, StoreError>;
}
