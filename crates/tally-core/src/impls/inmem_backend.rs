//! InMemoryResultBackend - テスト・単一プロセス用の result backend

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{BackendError, TaskId, TaskMeta};
use crate::ports::ResultBackend;

#[derive(Default)]
pub struct InMemoryResultBackend {
    records: RwLock<HashMap<TaskId, TaskMeta>>,
}

impl InMemoryResultBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultBackend for InMemoryResultBackend {
    async fn store(&self, meta: &TaskMeta) -> Result<(), BackendError> {
        let mut records = self.records.write().await;
        records.insert(meta.task_id.clone(), meta.clone());
        Ok(())
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskMeta>, BackendError> {
        let records = self.records.read().await;
        Ok(records.get(task_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn store_overwrites_previous_record() {
        let backend = InMemoryResultBackend::new();
        let id = TaskId::new("t1");

        backend.store(&TaskMeta::pending(id.clone(), Utc::now())).await.unwrap();
        backend
            .store(&TaskMeta::success(id.clone(), 1, "done", Utc::now()))
            .await
            .unwrap();

        let meta = backend.get(&id).await.unwrap().unwrap();
        assert_eq!(meta.status, TaskStatus::Success);
        assert_eq!(meta.result.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let backend = InMemoryResultBackend::new();
        assert!(backend.get(&TaskId::new("nope")).await.unwrap().is_none());
    }
}
