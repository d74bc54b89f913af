//! Watchdog configuration.
//!
//! [`RawConfig`] holds the env-style inputs exactly as they arrived;
//! [`RawConfig::resolve`] validates them, in a fixed order, into an
//! immutable [`WatchdogConfig`].

use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_CONTAINER_NAME: &str = "SRCDS_CONTAINER_NAME";
pub const ENV_HOST: &str = "SRCDS_HOST";
pub const ENV_PORT: &str = "SRCDS_PORT";
pub const ENV_INITIAL_WAIT: &str = "INITIAL_WAITING_TIME";
pub const ENV_FAILURE_THRESHOLD: &str = "FAILURE_TIME_THRESHOLD";
pub const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL";
pub const ENV_RESTART_RETRIES: &str = "RESTART_RETRIES";

pub const DEFAULT_INITIAL_GRACE_SECS: u64 = 60;
pub const DEFAULT_FAILURE_THRESHOLD_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Resolved, read-only watchdog settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogConfig {
    pub target_host: String,
    pub target_port: u16,
    /// Name or id of the container hosting the server.
    pub container_id: String,
    /// Wait before the first probe and after every restart.
    pub initial_grace_period: Duration,
    /// Accumulated unresponsive time that triggers a restart.
    pub failure_time_threshold: Duration,
    pub poll_interval: Duration,
    /// Extra restart attempts after a failed one. Zero makes the first
    /// failure fatal.
    pub restart_retries: u32,
}

impl WatchdogConfig {
    /// Settings with the default timings.
    pub fn new(container_id: impl Into<String>, target_host: impl Into<String>, target_port: u16) -> Self {
        Self {
            target_host: target_host.into(),
            target_port,
            container_id: container_id.into(),
            initial_grace_period: Duration::from_secs(DEFAULT_INITIAL_GRACE_SECS),
            failure_time_threshold: Duration::from_secs(DEFAULT_FAILURE_THRESHOLD_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            restart_retries: 0,
        }
    }

    /// Check the invariants `RawConfig::resolve` guarantees, for configs
    /// built by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container_id.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_CONTAINER_NAME));
        }
        if self.target_host.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_HOST));
        }
        if self.target_port == 0 {
            return Err(ConfigError::InvalidPort {
                var: ENV_PORT,
                value: "0".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Zero(ENV_POLL_INTERVAL));
        }
        Ok(())
    }
}

/// Unparsed env-style inputs. Empty values count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfig {
    pub container_name: Option<String>,
    pub host: Option<String>,
    pub port: Option<String>,
    pub initial_wait: Option<String>,
    pub failure_threshold: Option<String>,
    pub poll_interval: Option<String>,
    pub restart_retries: Option<String>,
}

impl RawConfig {
    /// Read every key through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            container_name: lookup(ENV_CONTAINER_NAME),
            host: lookup(ENV_HOST),
            port: lookup(ENV_PORT),
            initial_wait: lookup(ENV_INITIAL_WAIT),
            failure_threshold: lookup(ENV_FAILURE_THRESHOLD),
            poll_interval: lookup(ENV_POLL_INTERVAL),
            restart_retries: lookup(ENV_RESTART_RETRIES),
        }
    }

    /// Read every key from the process environment. Values that are not
    /// valid unicode count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// The container identifier, which is validated before anything else.
    pub fn container_id(&self) -> Result<&str, ConfigError> {
        required(&self.container_name, ENV_CONTAINER_NAME)
    }

    /// Validate in order: container, host, port, then the timings.
    pub fn resolve(&self) -> Result<WatchdogConfig, ConfigError> {
        let container_id = self.container_id()?.to_string();
        let target_host = required(&self.host, ENV_HOST)?.to_string();

        let port = required(&self.port, ENV_PORT)?;
        let target_port = match port.parse::<u16>() {
            Ok(p) if p != 0 => p,
            _ => {
                return Err(ConfigError::InvalidPort {
                    var: ENV_PORT,
                    value: port.to_string(),
                });
            }
        };

        let initial_grace_period =
            seconds(&self.initial_wait, ENV_INITIAL_WAIT, DEFAULT_INITIAL_GRACE_SECS)?;
        let failure_time_threshold = seconds(
            &self.failure_threshold,
            ENV_FAILURE_THRESHOLD,
            DEFAULT_FAILURE_THRESHOLD_SECS,
        )?;
        let poll_interval = seconds(&self.poll_interval, ENV_POLL_INTERVAL, DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval.is_zero() {
            return Err(ConfigError::Zero(ENV_POLL_INTERVAL));
        }

        let restart_retries = match optional(&self.restart_retries) {
            None => 0,
            Some(v) => v.parse::<u32>().map_err(|_| ConfigError::InvalidNumber {
                var: ENV_RESTART_RETRIES,
                value: v.to_string(),
            })?,
        };

        Ok(WatchdogConfig {
            target_host,
            target_port,
            container_id,
            initial_grace_period,
            failure_time_threshold,
            poll_interval,
            restart_retries,
        })
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, var: &'static str) -> Result<&'a str, ConfigError> {
    optional(value).ok_or(ConfigError::Missing(var))
}

fn seconds(value: &Option<String>, var: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match optional(value) {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber {
                var,
                value: v.to_string(),
            }),
    }
}
