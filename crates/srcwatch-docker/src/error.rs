//! Error types for Docker API calls.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the Docker daemon.
#[derive(Debug, Error)]
pub enum DockerError {
    #[error("invalid container identifier '{0}'")]
    InvalidContainerId(String),

    #[error("cannot connect to docker socket {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("docker daemon did not answer within {0:?}")]
    Timeout(Duration),

    #[error("no such container: {0}")]
    NotFound(String),

    #[error("docker api returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("cannot decode docker response: {0}")]
    Decode(#[from] serde_json::Error),
}
