//! CLI argument parsing using `clap`.
//!
//! Every flag is optional; an unset flag leaves the value from the
//! environment (or its default) in place.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use lateq_core::Config;

/// Command-line arguments for `lateq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "lateq",
    version,
    about = "Dependency-aware task scheduler over line-delimited JSON on TCP.",
    long_about = None
)]
pub struct CliArgs {
    /// Address to bind (overrides `LATEQ_ADDRESS`).
    #[arg(long, value_name = "ADDR")]
    pub address: Option<String>,

    /// Port to bind (overrides `LATEQ_PORT`).
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Maximum number of connections served at once.
    #[arg(long, value_name = "N")]
    pub max_connections: Option<NonZeroUsize>,

    /// Seconds a lease lasts before the task can be handed out again.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_lock_time: Option<u64>,

    /// Reclaim expired leases in the background every N milliseconds.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub reaper_interval_ms: Option<u64>,

    /// Single-instance lock file.
    #[arg(long, value_name = "PATH", conflicts_with = "no_lock_file")]
    pub lock_file: Option<PathBuf>,

    /// Run without a lock file.
    #[arg(long)]
    pub no_lock_file: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LATEQ_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(n) = self.max_connections {
            config.server.max_connections = Some(n.get());
        }
        if let Some(secs) = self.max_lock_time {
            config.scheduler.max_lock_time = Duration::from_secs(secs);
        }
        if let Some(ms) = self.reaper_interval_ms {
            config.scheduler.reaper_interval = Some(Duration::from_millis(ms));
        }
        if let Some(path) = &self.lock_file {
            config.server.lock_file = Some(path.clone());
        }
        if self.no_lock_file {
            config.server.lock_file = None;
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
