//! Command line and environment configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tally_core::TallyConfig;
use tally_core::impls::{
    InMemoryDeliveryQueue, InMemoryPositionStore, InMemoryResultBackend, RedisDeliveryQueue,
    RedisPositionStore, RedisResultBackend,
};
use tally_core::ports::{DeliveryQueue, PositionStore, ResultBackend};

pub const MEMORY_URL: &str = "memory://";

#[derive(Debug, Parser)]
#[command(name = "tally", version, about = "Task front end with queue positions")]
pub struct CliArgs {
    #[command(flatten)]
    pub transport: TransportArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct TransportArgs {
    /// Where envelopes are published (memory:// or redis://...)
    #[arg(long, global = true, env = "TALLY_BROKER_URL", default_value = MEMORY_URL)]
    pub broker_url: String,

    /// Where task states and results are stored
    #[arg(long, global = true, env = "TALLY_RESULT_BACKEND", default_value = MEMORY_URL)]
    pub result_backend: String,

    /// Where the position queue lives; falls back to REDIS_URL
    #[arg(long, global = true, env = "TALLY_POSITION_STORE")]
    pub position_store: Option<String>,

    #[arg(long, global = true, env = "TALLY_QUEUE", default_value = "tally")]
    pub queue: String,

    #[arg(long, global = true, env = "TALLY_MAX_ATTEMPTS", default_value_t = 3)]
    pub max_attempts: u32,

    /// Seconds the echo task sleeps before answering
    #[arg(long, global = true, env = "TALLY_ECHO_DELAY_SECS", default_value_t = 20)]
    pub echo_delay_secs: u64,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "TALLY_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Workers to run inside the server process (required for memory:// transports)
        #[arg(long, env = "TALLY_WORKERS", default_value_t = 0)]
        workers: usize,
    },
    /// Run workers only
    Worker {
        #[arg(long, env = "TALLY_WORKERS", default_value_t = 1)]
        workers: usize,
    },
}

/// The three stores the core needs, already connected.
pub struct Transports {
    pub delivery: Arc<dyn DeliveryQueue>,
    pub backend: Arc<dyn ResultBackend>,
    pub positions: Arc<dyn PositionStore>,
}

enum Endpoint<'a> {
    Memory,
    Redis(&'a str),
}

fn endpoint(url: &str) -> anyhow::Result<Endpoint<'_>> {
    if url == MEMORY_URL {
        Ok(Endpoint::Memory)
    } else if url.starts_with("redis://") || url.starts_with("rediss://") {
        Ok(Endpoint::Redis(url))
    } else {
        bail!("unsupported url {url:?}, expected memory:// or redis://")
    }
}

impl TransportArgs {
    pub fn tally_config(&self) -> TallyConfig {
        TallyConfig {
            queue_name: self.queue.clone(),
            max_attempts: self.max_attempts,
            ..TallyConfig::default()
        }
    }

    pub fn echo_delay(&self) -> Duration {
        Duration::from_secs(self.echo_delay_secs)
    }

    /// Position store url, falling back to `REDIS_URL` and then memory.
    pub fn position_store_url(&self) -> String {
        self.position_store
            .clone()
            .or_else(|| std::env::var("REDIS_URL").ok())
            .unwrap_or_else(|| MEMORY_URL.to_string())
    }

    /// Whether some transport only exists inside this process, so the
    /// server has to run its own workers.
    pub fn needs_embedded_workers(&self) -> bool {
        [
            self.broker_url.as_str(),
            self.result_backend.as_str(),
            self.position_store_url().as_str(),
        ]
        .iter()
        .any(|url| *url == MEMORY_URL)
    }

    /// A standalone worker shares nothing with a server unless every
    /// transport is external.
    pub fn check_standalone_worker(&self) -> anyhow::Result<()> {
        if self.needs_embedded_workers() {
            bail!(
                "`tally worker` needs redis:// transports for the broker, result backend and position store; \
                 use `tally serve --workers N` for a single in-memory process"
            );
        }
        Ok(())
    }

    pub async fn connect(&self, config: &TallyConfig) -> anyhow::Result<Transports> {
        let delivery: Arc<dyn DeliveryQueue> = match endpoint(&self.broker_url)? {
            Endpoint::Memory => Arc::new(InMemoryDeliveryQueue::new()),
            Endpoint::Redis(url) => Arc::new(
                RedisDeliveryQueue::connect(url)
                    .await
                    .context("connecting to broker")?,
            ),
        };

        let backend: Arc<dyn ResultBackend> = match endpoint(&self.result_backend)? {
            Endpoint::Memory => Arc::new(InMemoryResultBackend::new()),
            Endpoint::Redis(url) => Arc::new(
                RedisResultBackend::connect(url, config.result_ttl)
                    .await
                    .context("connecting to result backend")?,
            ),
        };

        let position_url = self.position_store_url();
        let positions: Arc<dyn PositionStore> = match endpoint(&position_url)? {
            Endpoint::Memory => Arc::new(InMemoryPositionStore::new()),
            Endpoint::Redis(url) => Arc::new(
                RedisPositionStore::connect(url)
                    .await
                    .context("connecting to position store")?,
            ),
        };

        Ok(Transports {
            delivery,
            backend,
            positions,
        })
    }
}
