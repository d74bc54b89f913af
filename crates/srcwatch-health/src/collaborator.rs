//! The two collaborators the watchdog drives.
//!
//! Both traits return boxed futures so the watchdog can be tested against
//! in-process fakes. The production implementations are [`A2sClient`] and
//! [`DockerClient`].

use std::future::Future;
use std::pin::Pin;

use srcwatch_a2s::{A2sClient, A2sError, ServerInfo};
use srcwatch_docker::{DockerClient, DockerError};

/// Boxed future alias for collaborator calls.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Answers whether the monitored server is responsive.
///
/// Calls must be cheap and safe to repeat; no internal retry is expected.
pub trait LivenessProbe: Send {
    /// Point the probe at `host:port`. Failure here is fatal at startup.
    fn configure_target<'a>(
        &'a mut self,
        host: &'a str,
        port: u16,
    ) -> BoxFuture<'a, Result<(), A2sError>>;

    /// Query the server once. The returned info is informational only.
    fn probe(&mut self) -> BoxFuture<'_, Result<ServerInfo, A2sError>>;

    /// Release whatever the probe holds.
    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

/// Restarts the container hosting the monitored server.
pub trait ContainerController: Send + Sync {
    /// Whether the container exists and can be inspected.
    fn exists<'a>(&'a self, container: &'a str) -> BoxFuture<'a, Result<bool, DockerError>>;

    /// Issue a restart. Fire-and-forget: success means the command was
    /// accepted, not that the server is back.
    fn restart<'a>(&'a self, container: &'a str) -> BoxFuture<'a, Result<(), DockerError>>;

    /// Release whatever the controller holds.
    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

impl LivenessProbe for A2sClient {
    fn configure_target<'a>(
        &'a mut self,
        host: &'a str,
        port: u16,
    ) -> BoxFuture<'a, Result<(), A2sError>> {
        Box::pin(self.set_target(host, port))
    }

    fn probe(&mut self) -> BoxFuture<'_, Result<ServerInfo, A2sError>> {
        Box::pin(self.info())
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        A2sClient::close(self);
        Box::pin(async {})
    }
}

// Connections are per request, so the default close is enough.
impl ContainerController for DockerClient {
    fn exists<'a>(&'a self, container: &'a str) -> BoxFuture<'a, Result<bool, DockerError>> {
        Box::pin(self.container_exists(container))
    }

    fn restart<'a>(&'a self, container: &'a str) -> BoxFuture<'a, Result<(), DockerError>> {
        Box::pin(self.restart_container(container))
    }
}
