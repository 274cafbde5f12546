//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: ワイヤリングと submit / status の表面
//! - **TaskExecutor**: 実行基盤への dispatch と状態の point read
//! - **PositionTracker**: pending な task_id の advisory index
//! - **SignalBus / LifecycleRouter**: ライフサイクルイベントの配信と position 更新
//! - **StatusService**: backend と position の merge
//! - **WorkerGroup**: タスク実行ループ

pub mod builder;
pub mod executor;
pub mod position;
pub mod retry;
pub mod router;
pub mod signals;
pub mod status;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::executor::TaskExecutor;
pub use self::position::PositionTracker;
pub use self::retry::RetryPolicy;
pub use self::router::LifecycleRouter;
pub use self::signals::{SignalBus, SignalHandler};
pub use self::status::{StatusService, TaskStatusView};
pub use self::worker_loop::{WorkerContext, WorkerGroup, WorkerSettings};
