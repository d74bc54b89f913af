//! srcwatch-docker: the container controller.
//!
//! A small Docker Engine API client that talks HTTP/1.1 over the daemon's
//! unix socket. It only knows the two calls the watchdog needs:
//!
//! - `GET  /v1.25/containers/{id}/json`: does the container exist?
//! - `POST /v1.25/containers/{id}/restart`: restart it.
//!
//! Every request opens its own connection, so the client holds no
//! long-lived resources and is cheap to keep for the process lifetime.

pub mod client;
pub mod container;
pub mod error;

pub use client::{DockerClient, API_VERSION, DEFAULT_SOCKET, DEFAULT_TIMEOUT};
pub use container::{validate_container_id, ContainerState, ContainerSummary};
pub use error::DockerError;
