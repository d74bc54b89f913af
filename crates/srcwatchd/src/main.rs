//! srcwatchd: the srcwatch daemon.
//!
//! Watches one Source engine server over A2S and restarts its Docker
//! container when the server stops answering for too long. Runs until a
//! restart fails or a signal arrives, and always exits non-zero: a
//! watchdog that stops is a watchdog that failed.
//!
//! # Usage
//!
//! ```text
//! SRCDS_CONTAINER_NAME=srcds SRCDS_HOST=127.0.0.1 SRCDS_PORT=27015 srcwatchd
//! ```

mod cli;
mod shutdown;

use std::ops::ControlFlow;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use srcwatch_a2s::A2sClient;
use srcwatch_docker::DockerClient;
use srcwatch_health::{Stopped, Watchdog};
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, LogFormat};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(Stopped::Shutdown) => info!("watchdog stopped"),
        Err(e) => error!("{e}"),
    }
    ExitCode::FAILURE
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Warnings and errors go to stderr, everything else to stdout.
    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<Stopped> {
    info!(version = env!("CARGO_PKG_VERSION"), "srcwatchd starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let _signals = shutdown::spawn_signal_listener(shutdown_tx);

    let probe = A2sClient::new(Duration::from_millis(cli.query_timeout_ms));
    let controller = DockerClient::new(cli.docker_socket.clone());
    let mut watchdog = Watchdog::new(probe, controller, shutdown_rx);

    let outcome = match watchdog.bootstrap(&cli.raw_config()).await {
        Ok(ControlFlow::Continue(config)) => watchdog.start(config).await,
        Ok(ControlFlow::Break(stopped)) => Ok(stopped),
        Err(e) => Err(e),
    };
    watchdog.release().await;

    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcwatch_health::{ConfigError, WatchdogError};

    #[tokio::test]
    async fn missing_container_fails_before_touching_docker() {
        // An explicit empty value overrides SRCDS_CONTAINER_NAME.
        let cli = Cli::try_parse_from([
            "srcwatchd",
            "--container-name",
            "",
            "--docker-socket",
            "/nonexistent/docker.sock",
        ])
        .unwrap();

        let err = run(cli).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WatchdogError>(),
            Some(WatchdogError::Config(ConfigError::Missing(_)))
        ));
    }

    #[tokio::test]
    async fn unreachable_docker_is_fatal() {
        let cli = Cli::try_parse_from([
            "srcwatchd",
            "--container-name",
            "srcds",
            "--docker-socket",
            "/nonexistent/docker.sock",
        ])
        .unwrap();

        let err = run(cli).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WatchdogError>(),
            Some(WatchdogError::Inspect { .. })
        ));
    }
}
