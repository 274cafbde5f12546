//! Ports - 抽象化レイヤー
//!
//! 外部システム（Redis の list / key、あるいはプロセス内のメモリ）への
//! インターフェースを trait として定義します。
//!
//! # 設計原則
//! - result backend が source of truth（正本）
//! - 配送キューは envelope を運ぶだけ
//! - position store は advisory index（失敗しても dispatch / query を止めない）

pub mod clock;
pub mod delivery_queue;
pub mod id_generator;
pub mod position_store;
pub mod result_backend;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delivery_queue::DeliveryQueue;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::position_store::PositionStore;
pub use self::result_backend::ResultBackend;
