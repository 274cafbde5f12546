//! Runtime configuration shared by the server and the workers.

use std::time::Duration;

use crate::app::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct TallyConfig {
    /// Delivery queue namespace the workers consume.
    pub queue_name: String,
    /// Position store key holding pending task ids.
    pub position_key: String,
    /// Total attempts, including the first, for handlers that ask for a retry.
    pub max_attempts: u32,
    pub retry: RetryPolicy,
    /// How long result records live in a persistent backend.
    pub result_ttl: Duration,
    pub poll_interval: Duration,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            queue_name: "tally".to_string(),
            position_key: "tally_task_queue".to_string(),
            max_attempts: 3,
            retry: RetryPolicy::default_policy(),
            result_ttl: Duration::from_secs(24 * 60 * 60),
            poll_interval: Duration::from_secs(1),
        }
    }
}
