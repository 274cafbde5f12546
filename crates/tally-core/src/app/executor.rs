//! TaskExecutor - 実行基盤への dispatch と状態の point read
//!
//! dispatch は envelope を配送キューに積んだ時点で返ります（実行を待たない）。
//! 実行そのものは WorkerGroup が行います。

use std::sync::Arc;

use tracing::{error, info};

use crate::domain::{TallyError, TaskEnvelope, TaskId, TaskMeta, TaskSnapshot, TaskType};
use crate::ports::{Clock, DeliveryQueue, IdGenerator, ResultBackend};
use crate::typed::Task;

pub struct TaskExecutor {
    delivery: Arc<dyn DeliveryQueue>,
    backend: Arc<dyn ResultBackend>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    queue_name: String,
}

impl TaskExecutor {
    pub fn new(
        delivery: Arc<dyn DeliveryQueue>,
        backend: Arc<dyn ResultBackend>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            delivery,
            backend,
            ids,
            clock,
            queue_name: queue_name.into(),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Reserve an id without publishing anything yet.
    pub fn next_task_id(&self) -> TaskId {
        self.ids.generate_task_id()
    }

    /// Build the envelope carrying `task` under `task_id`.
    pub fn envelope_for<T: Task>(&self, task_id: TaskId, task: &T) -> Result<TaskEnvelope, TallyError> {
        let payload = serde_json::to_value(task)?;
        Ok(TaskEnvelope::new(task_id, TaskType::new(T::TYPE), payload))
    }

    /// Submit `task` under a freshly generated id.
    pub async fn dispatch<T: Task>(&self, task: &T) -> Result<TaskId, TallyError> {
        let envelope = self.envelope_for(self.next_task_id(), task)?;
        self.dispatch_as(envelope).await
    }

    /// Submit an envelope whose id the caller already chose.
    ///
    /// The PENDING record is written before the envelope is published, so a
    /// worker's STARTED record can never be overwritten by it.
    pub async fn dispatch_as(&self, envelope: TaskEnvelope) -> Result<TaskId, TallyError> {
        let task_id = envelope.task_id().clone();
        let task_type = envelope.task_type().clone();

        let meta = TaskMeta::pending(task_id.clone(), self.clock.now());
        if let Err(e) = self.backend.store(&meta).await {
            error!(%task_id, error = %e, "could not record pending task");
            return Err(e.into());
        }

        if let Err(e) = self.delivery.push(&self.queue_name, envelope).await {
            error!(%task_id, error = %e, "could not publish task");
            return Err(e.into());
        }

        info!(%task_id, %task_type, queue = %self.queue_name, "task dispatched");
        Ok(task_id)
    }

    /// Point read of the task's state. Unknown ids come back as a not-ready
    /// `UNKNOWN` snapshot.
    pub async fn query(&self, task_id: &TaskId) -> Result<TaskSnapshot, TallyError> {
        let meta = self.backend.get(task_id).await?;
        Ok(meta.map_or_else(TaskSnapshot::unknown, TaskSnapshot::from))
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{DownBackend, DownBroker};
    use super::*;
    use crate::domain::TaskStatus;
    use crate::impls::{InMemoryDeliveryQueue, InMemoryResultBackend};
    use crate::ports::{SystemClock, UlidGenerator};
    use crate::typed::task::testing::EchoTask;

    fn executor(
        delivery: Arc<dyn DeliveryQueue>,
        backend: Arc<dyn ResultBackend>,
    ) -> TaskExecutor {
        TaskExecutor::new(
            delivery,
            backend,
            Arc::new(UlidGenerator::new(SystemClock)),
            Arc::new(SystemClock),
            "test",
        )
    }

    fn hello() -> EchoTask {
        EchoTask {
            text: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn dispatch_records_pending_and_publishes() {
        let delivery = Arc::new(InMemoryDeliveryQueue::new());
        let backend = Arc::new(InMemoryResultBackend::new());
        let executor = executor(delivery.clone(), backend.clone());

        let task_id = executor.dispatch(&hello()).await.unwrap();

        let snap = executor.query(&task_id).await.unwrap();
        assert_eq!(snap.status, TaskStatus::Pending);
        assert!(!snap.ready);
        assert_eq!(snap.result, None);

        let envelope = delivery
            .pop("test", Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(envelope.task_id(), &task_id);
        assert_eq!(envelope.task_type().as_str(), EchoTask::TYPE);
        assert_eq!(envelope.payload()["text"], "hello");
    }

    #[tokio::test]
    async fn dispatch_ids_are_unique() {
        let executor = executor(
            Arc::new(InMemoryDeliveryQueue::new()),
            Arc::new(InMemoryResultBackend::new()),
        );
        let a = executor.dispatch(&hello()).await.unwrap();
        let b = executor.dispatch(&hello()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn query_unknown_id_is_not_ready() {
        let executor = executor(
            Arc::new(InMemoryDeliveryQueue::new()),
            Arc::new(InMemoryResultBackend::new()),
        );
        let snap = executor.query(&TaskId::new("never-dispatched")).await.unwrap();
        assert_eq!(snap, TaskSnapshot::unknown());
    }

    #[tokio::test]
    async fn broker_failure_fails_dispatch() {
        let executor = executor(Arc::new(DownBroker), Arc::new(InMemoryResultBackend::new()));
        let err = executor.dispatch(&hello()).await.unwrap_err();
        assert!(matches!(err, TallyError::Broker(_)));
    }

    #[tokio::test]
    async fn backend_failure_fails_dispatch_and_query() {
        let executor = executor(Arc::new(InMemoryDeliveryQueue::new()), Arc::new(DownBackend));
        let err = executor.dispatch(&hello()).await.unwrap_err();
        assert!(matches!(err, TallyError::Backend(_)));

        let err = executor.query(&TaskId::new("t1")).await.unwrap_err();
        assert!(matches!(err, TallyError::Backend(_)));
    }
}
