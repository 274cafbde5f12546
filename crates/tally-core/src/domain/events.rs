//! Events - ワーカーが発火するライフサイクルイベント
//!
//! 実行基盤はこれらを at-least-once で、相対順序を保証せずに配信します。
//! 購読側（LifecycleRouter など）はイベントごとに冪等である必要があります。

use super::{TaskId, TaskStatus, TaskType};

/// Closed set of event kinds a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    PreRun,
    PostRun,
    Success,
    Failure,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::PreRun,
        SignalKind::PostRun,
        SignalKind::Success,
        SignalKind::Failure,
    ];
}

/// LifecycleEvent はワーカー上で発生したイベント
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Fired immediately before the handler runs.
    PreRun { task_id: TaskId, task_type: TaskType },

    /// Fired after the handler returned, whatever the outcome.
    PostRun { task_id: TaskId, state: TaskStatus },

    Success { task_id: TaskId, result: String },

    Failure { task_id: TaskId, error: String },
}

impl LifecycleEvent {
    pub fn kind(&self) -> SignalKind {
        match self {
            LifecycleEvent::PreRun { .. } => SignalKind::PreRun,
            LifecycleEvent::PostRun { .. } => SignalKind::PostRun,
            LifecycleEvent::Success { .. } => SignalKind::Success,
            LifecycleEvent::Failure { .. } => SignalKind::Failure,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        match self {
            LifecycleEvent::PreRun { task_id, .. }
            | LifecycleEvent::PostRun { task_id, .. }
            | LifecycleEvent::Success { task_id, .. }
            | LifecycleEvent::Failure { task_id, .. } => task_id,
        }
    }
}
