//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemory***: 単一プロセス構成・テスト用
//! - **Redis***: 複数プロセス（server + worker）構成用
//!
//! Redis 実装はどれも起動時に一度だけ接続し、その multiplexed connection を
//! 使い回します。

pub mod inmem_backend;
pub mod inmem_delivery;
pub mod inmem_position;
pub mod redis_backend;
pub mod redis_delivery;
pub mod redis_position;

pub use self::inmem_backend::InMemoryResultBackend;
pub use self::inmem_delivery::InMemoryDeliveryQueue;
pub use self::inmem_position::InMemoryPositionStore;
pub use self::redis_backend::RedisResultBackend;
pub use self::redis_delivery::RedisDeliveryQueue;
pub use self::redis_position::RedisPositionStore;
