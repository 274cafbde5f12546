//! LifecycleRouter - ライフサイクルイベントから PositionTracker を更新
//!
//! - pre-run: dequeue_all
//! - post-run: 終端状態なら再度 dequeue_all（pre-run が届かなかった場合の保険）
//! - success / failure: ログのみ
//!
//! dequeue_all は冪等なので、二重に届いても問題ありません。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::position::PositionTracker;
use super::signals::{SignalBus, SignalHandler};
use crate::domain::{LifecycleEvent, SignalKind};

pub struct LifecycleRouter {
    tracker: Arc<PositionTracker>,
}

impl LifecycleRouter {
    pub fn new(tracker: Arc<PositionTracker>) -> Self {
        Self { tracker }
    }

    /// Connect to every signal kind on `bus`.
    pub fn subscribe(self: Arc<Self>, bus: &mut SignalBus) {
        for kind in SignalKind::ALL {
            bus.connect(kind, self.clone());
        }
    }
}

#[async_trait]
impl SignalHandler for LifecycleRouter {
    async fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::PreRun { task_id, task_type } => {
                info!(%task_id, %task_type, "task starting, removing from position queue");
                self.tracker.dequeue_all(task_id).await;
            }
            LifecycleEvent::PostRun { task_id, state } if state.is_terminal() => {
                info!(%task_id, %state, "task finished, ensuring removal from position queue");
                self.tracker.dequeue_all(task_id).await;
            }
            LifecycleEvent::PostRun { task_id, state } => {
                debug!(%task_id, %state, "task ran without reaching a terminal state");
            }
            LifecycleEvent::Success { task_id, .. } => {
                info!(%task_id, "task succeeded");
            }
            LifecycleEvent::Failure { task_id, error } => {
                warn!(%task_id, %error, "task failed");
            }
        }
    }
}
