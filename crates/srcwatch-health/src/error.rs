//! Error types for the watchdog.

use srcwatch_a2s::A2sError;
use srcwatch_docker::DockerError;
use thiserror::Error;

/// Missing or malformed startup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("environment variable '{0}' is not set")]
    Missing(&'static str),

    #[error("environment variable '{var}' is invalid (not a port number): '{value}'")]
    InvalidPort { var: &'static str, value: String },

    #[error("environment variable '{var}' is invalid (not a whole number): '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("environment variable '{0}' must be greater than zero")]
    Zero(&'static str),
}

/// Conditions that stop the watchdog for good.
///
/// Probe failures never show up here; they are absorbed by the
/// failure accounting.
#[derive(Debug, Error)]
pub enum WatchdogError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("container '{0}' does not exist")]
    ContainerNotFound(String),

    #[error("cannot inspect container '{container}': {source}")]
    Inspect {
        container: String,
        source: DockerError,
    },

    #[error("cannot set query target {host}:{port}: {source}")]
    ProbeTarget {
        host: String,
        port: u16,
        source: A2sError,
    },

    #[error("restart of container '{container}' failed: {source}")]
    Restart {
        container: String,
        source: DockerError,
    },
}
