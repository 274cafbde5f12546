//! Task trait - 型付き Task の定義
//!
//! # 学習ポイント
//! - Associated Constants (`const TYPE`)
//! - Trait bounds の組み合わせ (Serialize + DeserializeOwned + Send + Sync + 'static)

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Task は task_type と payload の型を対応付ける
///
/// # 使用例
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct EchoTask {
///     text: String,
/// }
///
/// impl Task for EchoTask {
///     const TYPE: &'static str = "echo_with_delay";
/// }
/// ```
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;
}

#[cfg(test)]
pub(crate) mod testing {
    use serde::{Deserialize, Serialize};

    use super::Task;

    /// Returns its text, or fails on demand.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EchoTask {
        pub text: String,
    }

    impl Task for EchoTask {
        const TYPE: &'static str = "test.echo.v1";
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct OtherTask {
        pub value: i32,
    }

    impl Task for OtherTask {
        const TYPE: &'static str = "test.other.v1";
    }
}
