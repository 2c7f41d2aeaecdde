//! Runtime configuration loaded from environment variables.
//!
//! Variables may also come from a `.env` file (see `load_dotenv`).
//! Command-line flags in the binary override what is read here.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::queue::{DEFAULT_MAX_LOCK_TIME, LeasePolicy};

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3901;
pub const DEFAULT_LOCK_FILE: &str = "lateq.lock";
pub const DEFAULT_LOG: &str = "info";

/// Load `.env` into the process environment, if present.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

// ── Root ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    /// `tracing` filter directive, e.g. `info` or `lateq_core=debug`.
    pub log: String,
}

impl Config {
    /// Read from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup };
        Ok(Self {
            server: ServerConfig::from_env(&env)?,
            scheduler: SchedulerConfig::from_env(&env)?,
            log: env.or("LATEQ_LOG", DEFAULT_LOG),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scheduler: SchedulerConfig::default(),
            log: DEFAULT_LOG.to_string(),
        }
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Unbounded when `None`.
    pub max_connections: Option<usize>,
    /// Single-instance lock file. Disabled when `None`.
    pub lock_file: Option<PathBuf>,
}

impl ServerConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let lock_file = match (env.lookup)("LATEQ_LOCK_FILE") {
            None => Some(PathBuf::from(DEFAULT_LOCK_FILE)),
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
        };
        Ok(Self {
            address: env.or("LATEQ_ADDRESS", DEFAULT_ADDRESS),
            port: env.parsed("LATEQ_PORT")?.unwrap_or(DEFAULT_PORT),
            max_connections: env.positive::<usize>("LATEQ_MAX_CONNECTIONS")?,
            lock_file,
        })
    }

    /// `address:port`, ready for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            max_connections: None,
            lock_file: Some(PathBuf::from(DEFAULT_LOCK_FILE)),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How long a lease lasts before it may be reclaimed.
    pub max_lock_time: Duration,
    /// Period of the background reaper. Disabled when `None`.
    pub reaper_interval: Option<Duration>,
}

impl SchedulerConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        Ok(Self {
            max_lock_time: env
                .positive::<u64>("LATEQ_MAX_LOCK_TIME_SECS")?
                .map_or(DEFAULT_MAX_LOCK_TIME, Duration::from_secs),
            reaper_interval: env
                .positive::<u64>("LATEQ_REAPER_INTERVAL_MS")?
                .map(Duration::from_millis),
        })
    }

    /// Wall-clock lease policy with this lock time.
    pub fn lease_policy(&self) -> LeasePolicy {
        LeasePolicy::system(self.max_lock_time)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_lock_time: DEFAULT_MAX_LOCK_TIME,
            reaper_interval: None,
        }
    }
}

// ── Lookup helpers ────────────────────────────────────────────

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Non-empty value of `key`.
    fn opt(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|s| !s.trim().is_empty())
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.opt(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.opt(key)
            .map(|raw| {
                raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                    key,
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Like `parsed`, but zero is rejected.
    fn positive<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr + Default + PartialEq,
        T::Err: std::fmt::Display,
    {
        match self.parsed::<T>(key)? {
            Some(v) if v == T::default() => Err(ConfigError::Invalid {
                key,
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            }),
            other => Ok(other),
        }
    }
}
