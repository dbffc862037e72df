use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;
use keel_id::SnowflakeId;

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Runtime configuration for the `keel-runner` binary.
///
/// Every value can come from a CLI flag or an environment variable (a `.env`
/// file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "keel-runner",
    version,
    about = "Pushes serial-numbered jobs through in-process queues"
)]
pub struct CliArgs {
    /// Data center ID of the serial number generator (0..=31).
    ///
    /// Environment variable: `DATA_CENTER_ID`
    #[arg(long, env = "DATA_CENTER_ID", default_value_t = 1)]
    pub data_center_id: u64,

    /// Worker ID of the serial number generator (0..=31).
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", default_value_t = 1)]
    pub worker_id: u64,

    /// Comma separated list of queues every job is fanned out to.
    ///
    /// Environment variable: `QUEUES`
    #[arg(
        long,
        env = "QUEUES",
        value_delimiter = ',',
        default_values_t = [String::from("audit"), String::from("events")]
    )]
    pub queues: Vec<String>,

    /// Consumers started on each queue.
    ///
    /// Environment variable: `CONSUMERS`
    #[arg(long, env = "CONSUMERS", default_value_t = 2)]
    pub consumers: usize,

    /// Number of jobs to enqueue.
    ///
    /// Environment variable: `MESSAGES`
    #[arg(long, env = "MESSAGES", default_value_t = 10_000)]
    pub messages: usize,

    /// How long shutdown waits for in-flight jobs, in milliseconds.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT_MS`
    #[arg(long, env = "SHUTDOWN_TIMEOUT_MS", default_value_t = 5_000)]
    pub shutdown_timeout_ms: u64,

    /// Log output format. Filtering is controlled by `RUST_LOG`.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub data_center_id: u64,
    pub worker_id: u64,
    pub queues: Vec<String>,
    pub consumers: usize,
    pub messages: usize,
    pub shutdown_timeout: Duration,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for RunnerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.data_center_id > SnowflakeId::MAX_DATA_CENTER_ID {
            bail!(
                "DATA_CENTER_ID ({}) exceeds the maximum of {}",
                args.data_center_id,
                SnowflakeId::MAX_DATA_CENTER_ID
            );
        }

        if args.worker_id > SnowflakeId::MAX_WORKER_ID {
            bail!(
                "WORKER_ID ({}) exceeds the maximum of {}",
                args.worker_id,
                SnowflakeId::MAX_WORKER_ID
            );
        }

        if args.consumers == 0 {
            bail!("CONSUMERS must be greater than 0");
        }

        let mut queues = Vec::with_capacity(args.queues.len());
        for name in args.queues {
            let name = name.trim();
            if name.is_empty() {
                bail!("QUEUES must not contain empty names");
            }
            if !queues.iter().any(|q| q == name) {
                queues.push(name.to_owned());
            }
        }
        if queues.is_empty() {
            bail!("QUEUES must name at least one queue");
        }

        Ok(Self {
            data_center_id: args.data_center_id,
            worker_id: args.worker_id,
            queues,
            consumers: args.consumers,
            messages: args.messages,
            shutdown_timeout: Duration::from_millis(args.shutdown_timeout_ms),
            log_format: args.log_format,
        })
    }
}
