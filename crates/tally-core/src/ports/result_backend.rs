//! ResultBackend port - タスク状態の正本

use async_trait::async_trait;

use crate::domain::{BackendError, TaskId, TaskMeta};

#[async_trait]
pub trait ResultBackend: Send + Sync {
    /// Overwrite the record for `meta.task_id`.
    async fn store(&self, meta: &TaskMeta) -> Result<(), BackendError>;

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskMeta>, BackendError>;
}
