//! Domain model (IDs, envelopes, statuses, result records, lifecycle events).
//!
//! - ids: TaskId（実行基盤が dispatch 時に払い出す不透明な文字列）
//! - task: TaskType / TaskEnvelope（配送キューを流れる単位）
//! - state: TaskStatus（PENDING / STARTED / ... / UNKNOWN）
//! - meta: TaskMeta（result backend の記録）と TaskSnapshot（query の結果）
//! - events: LifecycleEvent / SignalKind
//! - errors: thiserror ベースのエラー型

pub mod errors;
pub mod events;
pub mod ids;
pub mod meta;
pub mod state;
pub mod task;

pub use errors::{BackendError, QueueError, StoreError, TallyError};
pub use events::{LifecycleEvent, SignalKind};
pub use ids::TaskId;
pub use meta::{TaskMeta, TaskSnapshot};
pub use state::TaskStatus;
pub use task::{TaskEnvelope, TaskType};
