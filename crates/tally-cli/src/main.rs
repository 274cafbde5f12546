mod config;
mod echo;
mod http;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tally_core::typed::Task;
use tally_core::{App, AppBuilder};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{CliArgs, Command, TransportArgs};
use crate::echo::{EchoHandler, EchoTask};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tally=info,tally_core=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = CliArgs::parse();
    if let Command::Worker { .. } = args.command {
        args.transport.check_standalone_worker()?;
    }
    let app = Arc::new(build_app(&args.transport).await?);

    match args.command {
        Command::Serve { bind, workers } => {
            if workers == 0 && args.transport.needs_embedded_workers() {
                warn!("in-memory transport without embedded workers, tasks will never run");
            }
            let group = (workers > 0).then(|| app.spawn_workers(workers));

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            info!(%bind, workers, "serving");
            axum::serve(listener, http::build_router(app))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("http server")?;

            if let Some(group) = group {
                group.shutdown_and_join().await;
            }
        }
        Command::Worker { workers } => {
            let group = app.spawn_workers(workers.max(1));
            shutdown_signal().await;
            info!("shutting down workers, waiting for running tasks");
            group.shutdown_and_join().await;
        }
    }

    Ok(())
}

async fn build_app(transport: &TransportArgs) -> anyhow::Result<App> {
    let config = transport.tally_config();
    let stores = transport.connect(&config).await?;

    let app = AppBuilder::new()
        .register::<EchoTask, _>(EchoHandler::new(transport.echo_delay()))?
        .expect_tasks(&[EchoTask::TYPE])
        .with_config(config)
        .with_delivery_queue(stores.delivery)
        .with_result_backend(stores.backend)
        .with_position_store(stores.positions)
        .build()?;
    Ok(app)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
