//! Status - ステータスクエリ
//!
//! result backend の状態と position queue 上の位置を一つのビューにまとめます。
//! 自前の状態は持たず、呼ばれるたびに読み直す純粋な read-side の merge です。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::executor::TaskExecutor;
use super::position::PositionTracker;
use crate::domain::{TaskId, TaskSnapshot, TaskStatus};

/// Merged view returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub result: Option<String>,
    /// 1-based, only for tasks that are not ready.
    pub queue_position: Option<usize>,
}

pub struct StatusService {
    executor: Arc<TaskExecutor>,
    tracker: Arc<PositionTracker>,
}

impl StatusService {
    pub fn new(executor: Arc<TaskExecutor>, tracker: Arc<PositionTracker>) -> Self {
        Self { executor, tracker }
    }

    /// Never fails: a broken backend reads as `UNKNOWN`, a broken position
    /// store as no position.
    pub async fn get_status(&self, task_id: &TaskId) -> TaskStatusView {
        let snapshot = match self.executor.query(task_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(%task_id, error = %e, "status query failed, reporting unknown");
                TaskSnapshot::unknown()
            }
        };

        if snapshot.ready {
            debug!(%task_id, status = %snapshot.status, "task is ready");
            return TaskStatusView {
                task_id: task_id.clone(),
                status: snapshot.status,
                result: snapshot.result,
                queue_position: None,
            };
        }

        let queue_position = self.tracker.position_of(task_id).await;
        debug!(%task_id, status = %snapshot.status, ?queue_position, "task is not ready");
        TaskStatusView {
            task_id: task_id.clone(),
            status: snapshot.status,
            result: None,
            queue_position,
        }
    }
}
