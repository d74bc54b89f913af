//! Signal wiring.

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Flip `shutdown` to `true` on the first SIGINT or SIGTERM.
pub fn spawn_signal_listener(shutdown: watch::Sender<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(name) => {
                info!(signal = name, "shutdown signal received");
                let _ = shutdown.send(true);
            }
            Err(e) => error!(error = %e, "cannot listen for shutdown signals"),
        }
    })
}

async fn wait_for_signal() -> std::io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}
