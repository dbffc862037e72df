#![doc = include_str!("../README.md")]

mod config;
mod telemetry;
mod workload;

use clap::Parser;
use config::{CliArgs, RunnerConfig};
use telemetry::init_telemetry;
use tokio::signal;
use workload::Workload;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunnerConfig::try_from(args)?;

    init_telemetry(config.log_format)?;
    log_startup_info(&config);

    let Workload {
        manager,
        completion,
        accepted,
    } = workload::start(&config).await?;

    tokio::select! {
        () = completion.wait() => {
            tracing::info!(executed = completion.done(), "All jobs executed");
        },
        () = shutdown_signal() => {
            tracing::warn!(
                executed = completion.done(),
                accepted,
                "Interrupted before all jobs executed"
            );
        },
    }

    for name in manager.queue_names() {
        if let Some(queue) = manager.get_queue(&name) {
            let stats = queue.stats();
            tracing::info!(
                queue = %name,
                succeeded = stats.succeeded,
                failed = stats.failed,
                pending = stats.pending(),
                "Queue summary"
            );
        }
    }

    manager.shutdown().await;
    tracing::info!("Runner shut down successfully");
    Ok(())
}

fn log_startup_info(config: &RunnerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting runner with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting runner with {} messages over {} queues",
            config.messages,
            config.queues.len()
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
