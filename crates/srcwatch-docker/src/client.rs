//! Docker Engine API client over the unix socket.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use http::{header, Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty};
use serde::Deserialize;
use tokio::net::UnixStream;
use tracing::debug;

use crate::container::{validate_container_id, ContainerSummary};
use crate::error::DockerError;

/// Where the daemon listens unless told otherwise.
pub const DEFAULT_SOCKET: &str = "/var/run/docker.sock";

/// Oldest API version that has everything the watchdog uses.
pub const API_VERSION: &str = "v1.25";

/// Per-request timeout. A restart waits for the daemon's own stop timeout
/// (10s by default) before it answers, so this is generous.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for one Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerClient {
    socket: PathBuf,
    api_version: String,
    timeout: Duration,
}

impl DockerClient {
    /// Create a client for the daemon listening on `socket`.
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        Self {
            socket: socket.into(),
            api_version: API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Fetch a container's descriptor. `Ok(None)` when it does not exist.
    pub async fn inspect_container(
        &self,
        id: &str,
    ) -> Result<Option<ContainerSummary>, DockerError> {
        validate_container_id(id)?;

        let (status, body) = self
            .request(Method::GET, &format!("/containers/{id}/json"))
            .await?;

        match status {
            StatusCode::OK => Ok(Some(serde_json::from_slice(&body)?)),
            StatusCode::NOT_FOUND => Ok(None),
            other => Err(api_error(other, &body)),
        }
    }

    /// Whether the daemon knows a container by this name or id.
    pub async fn container_exists(&self, id: &str) -> Result<bool, DockerError> {
        Ok(self.inspect_container(id).await?.is_some())
    }

    /// Ask the daemon to restart a container.
    ///
    /// Returns once the daemon has accepted and carried out the restart;
    /// it does not wait for the process inside to become healthy.
    pub async fn restart_container(&self, id: &str) -> Result<(), DockerError> {
        validate_container_id(id)?;

        let (status, body) = self
            .request(Method::POST, &format!("/containers/{id}/restart"))
            .await?;

        match status {
            s if s.is_success() => {
                debug!(container = %id, "docker restart accepted");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(DockerError::NotFound(id.to_string())),
            other => Err(api_error(other, &body)),
        }
    }

    async fn request(&self, method: Method, path: &str) -> Result<(StatusCode, Bytes), DockerError> {
        let uri = format!("/{}{}", self.api_version, path);
        tokio::time::timeout(self.timeout, self.send(method, &uri))
            .await
            .map_err(|_| DockerError::Timeout(self.timeout))?
    }

    async fn send(&self, method: Method, uri: &str) -> Result<(StatusCode, Bytes), DockerError> {
        let stream = UnixStream::connect(&self.socket)
            .await
            .map_err(|source| DockerError::Connect {
                path: self.socket.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "docker connection ended with error");
            }
        });

        let req = Request::builder()
            .method(method)
            .uri(uri)
            // The daemon ignores the host, but HTTP/1.1 requires one.
            .header(header::HOST, "docker")
            .header(
                header::USER_AGENT,
                concat!("srcwatch/", env!("CARGO_PKG_VERSION")),
            )
            .body(Empty::<Bytes>::new())?;

        let resp = sender.send_request(req).await?;
        let status = resp.status();
        let body = resp.into_body().collect().await?.to_bytes();

        debug!(%uri, %status, "docker api call");
        Ok((status, body))
    }
}

impl Default for DockerClient {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET)
    }
}

/// Build an API error, preferring the daemon's `{"message": ...}` body.
fn api_error(status: StatusCode, body: &[u8]) -> DockerError {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    let message = serde_json::from_slice::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string());

    DockerError::Api {
        status: status.as_u16(),
        message,
    }
}
