//! Command line and environment inputs.
//!
//! Every option falls back to an environment variable, so the daemon can
//! be configured entirely from a container's environment.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use srcwatch_docker::DEFAULT_SOCKET;
use srcwatch_health::config::{
    ENV_CONTAINER_NAME, ENV_FAILURE_THRESHOLD, ENV_HOST, ENV_INITIAL_WAIT, ENV_POLL_INTERVAL,
    ENV_PORT, ENV_RESTART_RETRIES,
};
use srcwatch_health::RawConfig;

#[derive(Parser, Debug)]
#[command(
    name = "srcwatchd",
    version,
    about = "Restart a game server's container when it stops answering A2S queries"
)]
pub struct Cli {
    /// Name or id of the container running the server.
    #[arg(long, env = ENV_CONTAINER_NAME)]
    pub container_name: Option<String>,

    /// Host to send A2S queries to.
    #[arg(long, env = ENV_HOST)]
    pub host: Option<String>,

    /// Query port of the server.
    #[arg(long, env = ENV_PORT)]
    pub port: Option<String>,

    /// Seconds to wait before the first query and after each restart [default: 60]
    #[arg(long, env = ENV_INITIAL_WAIT, value_name = "SECONDS")]
    pub initial_wait: Option<String>,

    /// Seconds of failed queries that trigger a restart [default: 60]
    #[arg(long, env = ENV_FAILURE_THRESHOLD, value_name = "SECONDS")]
    pub failure_threshold: Option<String>,

    /// Seconds between queries [default: 10]
    #[arg(long, env = ENV_POLL_INTERVAL, value_name = "SECONDS")]
    pub poll_interval: Option<String>,

    /// Extra restart attempts before giving up [default: 0]
    #[arg(long, env = ENV_RESTART_RETRIES, value_name = "COUNT")]
    pub restart_retries: Option<String>,

    /// Docker daemon socket.
    #[arg(long, env = "DOCKER_SOCKET", default_value = DEFAULT_SOCKET)]
    pub docker_socket: PathBuf,

    /// Milliseconds to wait for each A2S reply.
    #[arg(long, env = "A2S_TIMEOUT_MS", default_value_t = 5000)]
    pub query_timeout_ms: u64,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Cli {
    /// The watchdog inputs, still unvalidated.
    pub fn raw_config(&self) -> RawConfig {
        RawConfig {
            container_name: self.container_name.clone(),
            host: self.host.clone(),
            port: self.port.clone(),
            initial_wait: self.initial_wait.clone(),
            failure_threshold: self.failure_threshold.clone(),
            poll_interval: self.poll_interval.clone(),
            restart_retries: self.restart_retries.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn flags_map_onto_raw_config() {
        let cli = Cli::try_parse_from([
            "srcwatchd",
            "--container-name",
            "srcds",
            "--host",
            "10.0.0.5",
            "--port",
            "27015",
            "--poll-interval",
            "12",
        ])
        .unwrap();

        let config = cli.raw_config().resolve().unwrap();
        assert_eq!(config.container_id, "srcds");
        assert_eq!(config.target_host, "10.0.0.5");
        assert_eq!(config.target_port, 27015);
        assert_eq!(config.poll_interval, Duration::from_secs(12));
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["srcwatchd"]).unwrap();
        assert_eq!(cli.docker_socket, PathBuf::from(DEFAULT_SOCKET));
        assert_eq!(cli.query_timeout_ms, 5000);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn json_log_format() {
        let cli = Cli::try_parse_from(["srcwatchd", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn port_is_validated_by_the_watchdog_not_clap() {
        // A bad port must reach RawConfig so it is reported in order.
        let cli = Cli::try_parse_from(["srcwatchd", "--port", "not-a-port"]).unwrap();
        assert_eq!(cli.raw_config().port.as_deref(), Some("not-a-port"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        assert!(Cli::try_parse_from(["srcwatchd", "--query-timeout-ms", "soon"]).is_err());
    }
}
