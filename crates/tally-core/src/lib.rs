//! tally-core
//!
//! Core building blocks for the tally task front end: dispatch tasks to a
//! worker pool and report each pending task's place in line.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, meta, state, events, errors）
//! - **ports**: 抽象化レイヤー（DeliveryQueue, PositionStore, ResultBackend, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, executor, position, router, status, worker_loop）
//! - **typed**: 型付き Task API（Task trait, Handler trait, TypedRegistry）
//! - **impls**: 実装（インメモリ / Redis）
//! - **config**: 実行時設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use self::app::{App, AppBuilder};
pub use self::config::TallyConfig;
