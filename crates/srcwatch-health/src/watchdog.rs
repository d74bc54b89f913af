//! The watchdog loop: probe, account, decide, restart.
//!
//! One [`Watchdog`] owns both collaborators and the failure accounting for
//! the lifetime of the process. Everything runs on a single task; probes
//! are strictly sequential and a restart always completes (or fails)
//! before the next probe starts.
//!
//! Every suspension point (grace wait, probe, poll sleep, restart call,
//! retry backoff) also watches the shutdown channel, so a signal takes
//! effect mid-sleep rather than at the next iteration.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::collaborator::{ContainerController, LivenessProbe};
use crate::config::{RawConfig, WatchdogConfig};
use crate::error::WatchdogError;
use crate::tracker::{FailureTracker, Observation};

/// Upper bound for the delay between restart attempts.
const MAX_RESTART_BACKOFF: Duration = Duration::from_secs(60);

/// Callback invoked for every [`WatchdogEvent`].
pub type EventCallback = Arc<dyn Fn(&WatchdogEvent) + Send + Sync>;

/// Where the watchdog is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, not started.
    Idle,
    /// Waiting out a grace period (startup or after a restart).
    Booting,
    /// Steady-state probing.
    Polling,
    /// Threshold breached, restart in flight.
    Restarting,
    Terminated,
}

/// Notable state changes, for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    GraceStarted { period: Duration },
    ProbeFailed { accumulated: Duration },
    Recovered { after: Duration },
    Restarting { accumulated: Duration },
    RestartSucceeded,
    RestartFailed { attempt: u32 },
}

/// Why a watchdog stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stopped {
    Shutdown,
}

/// Monitors one server and restarts its container when it stops answering.
pub struct Watchdog<P, C> {
    probe: P,
    controller: C,
    tracker: FailureTracker,
    phase: Phase,
    shutdown: watch::Receiver<bool>,
    on_event: Option<EventCallback>,
}

impl<P, C> Watchdog<P, C>
where
    P: LivenessProbe,
    C: ContainerController,
{
    /// Create a watchdog that stops once `shutdown` turns `true`.
    pub fn new(probe: P, controller: C, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            probe,
            controller,
            tracker: FailureTracker::default(),
            phase: Phase::Idle,
            shutdown,
            on_event: None,
        }
    }

    /// Set a callback for state changes.
    pub fn with_observer(mut self, callback: EventCallback) -> Self {
        self.on_event = Some(callback);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current accumulated failure time.
    pub fn accumulated_failure_time(&self) -> Duration {
        self.tracker.accumulated()
    }

    /// Validate startup inputs in order: container name, container
    /// existence, host, port, timings.
    ///
    /// Breaks with [`Stopped::Shutdown`] if a signal arrives while the
    /// container is being inspected.
    pub async fn bootstrap(
        &mut self,
        raw: &RawConfig,
    ) -> Result<ControlFlow<Stopped, WatchdogConfig>, WatchdogError> {
        let container = raw.container_id()?;

        let Some(exists) = until_shutdown(&mut self.shutdown, self.controller.exists(container)).await
        else {
            return Ok(ControlFlow::Break(Stopped::Shutdown));
        };
        match exists {
            Ok(true) => info!(%container, "target container"),
            Ok(false) => return Err(WatchdogError::ContainerNotFound(container.to_string())),
            Err(source) => {
                return Err(WatchdogError::Inspect {
                    container: container.to_string(),
                    source,
                });
            }
        }

        let config = raw.resolve()?;
        info!(host = %config.target_host, "target host");
        info!(port = config.target_port, "target port");

        Ok(ControlFlow::Continue(config))
    }

    /// Configure the probe, wait out the initial grace period, then poll
    /// until shutdown or a fatal error.
    pub async fn start(&mut self, config: WatchdogConfig) -> Result<Stopped, WatchdogError> {
        let result = self.run(&config).await;
        self.phase = Phase::Terminated;
        result
    }

    /// Close the probe and the controller. Consumes the watchdog, so it
    /// happens exactly once.
    pub async fn release(mut self) {
        self.probe.close().await;
        self.controller.close().await;
        self.phase = Phase::Terminated;
        debug!("watchdog resources released");
    }

    async fn run(&mut self, config: &WatchdogConfig) -> Result<Stopped, WatchdogError> {
        config.validate()?;

        let configured = until_shutdown(
            &mut self.shutdown,
            self.probe
                .configure_target(&config.target_host, config.target_port),
        )
        .await;
        match configured {
            None => return Ok(Stopped::Shutdown),
            Some(Err(source)) => {
                return Err(WatchdogError::ProbeTarget {
                    host: config.target_host.clone(),
                    port: config.target_port,
                    source,
                });
            }
            Some(Ok(())) => {}
        }

        self.tracker = FailureTracker::new(config.poll_interval, config.failure_time_threshold);

        info!(
            seconds = config.initial_grace_period.as_secs(),
            "waiting for the server to come up"
        );
        if let ControlFlow::Break(stopped) = self.grace(config.initial_grace_period).await {
            return Ok(stopped);
        }

        loop {
            if let ControlFlow::Break(stopped) = self.poll_once(config).await? {
                return Ok(stopped);
            }
            if let ControlFlow::Break(stopped) = self.sleep(config.poll_interval).await {
                return Ok(stopped);
            }
        }
    }

    /// One probe, its accounting, and a restart if the threshold is hit.
    async fn poll_once(
        &mut self,
        config: &WatchdogConfig,
    ) -> Result<ControlFlow<Stopped>, WatchdogError> {
        self.phase = Phase::Polling;

        let Some(result) = until_shutdown(&mut self.shutdown, self.probe.probe()).await else {
            return Ok(ControlFlow::Break(Stopped::Shutdown));
        };

        match result {
            Ok(server) => {
                if let Observation::Recovered { after } = self.tracker.record_success() {
                    info!(after_secs = after.as_secs(), "server recovered");
                    self.emit(WatchdogEvent::Recovered { after });
                }
                trace!(
                    name = %server.name,
                    map = %server.map,
                    players = server.players,
                    "server alive"
                );
            }
            Err(e) => {
                let observation = self.tracker.record_failure();
                let accumulated = self.tracker.accumulated();
                info!(
                    error = %e,
                    accumulated_secs = accumulated.as_secs(),
                    threshold_secs = config.failure_time_threshold.as_secs(),
                    "server not responding"
                );
                self.emit(WatchdogEvent::ProbeFailed { accumulated });

                if let Observation::ThresholdReached { .. } = observation {
                    return self.restart(config).await;
                }
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Reset the accounting, restart the container, then grant it the
    /// startup grace period.
    async fn restart(
        &mut self,
        config: &WatchdogConfig,
    ) -> Result<ControlFlow<Stopped>, WatchdogError> {
        let accumulated = self.tracker.accumulated();
        self.tracker.reset();
        self.phase = Phase::Restarting;

        info!(
            container = %config.container_id,
            accumulated_secs = accumulated.as_secs(),
            "server restarting"
        );
        self.emit(WatchdogEvent::Restarting { accumulated });

        let mut attempt = 0;
        loop {
            attempt += 1;

            let Some(result) =
                until_shutdown(&mut self.shutdown, self.controller.restart(&config.container_id))
                    .await
            else {
                return Ok(ControlFlow::Break(Stopped::Shutdown));
            };

            match result {
                Ok(()) => {
                    info!(container = %config.container_id, attempt, "restart succeeded");
                    self.emit(WatchdogEvent::RestartSucceeded);
                    break;
                }
                Err(source) => {
                    self.emit(WatchdogEvent::RestartFailed { attempt });
                    if attempt > config.restart_retries {
                        return Err(WatchdogError::Restart {
                            container: config.container_id.clone(),
                            source,
                        });
                    }

                    let delay = restart_backoff(config.poll_interval, attempt);
                    warn!(
                        container = %config.container_id,
                        error = %source,
                        attempt,
                        retry_in_secs = delay.as_secs(),
                        "restart failed, retrying"
                    );
                    if let ControlFlow::Break(stopped) = self.sleep(delay).await {
                        return Ok(ControlFlow::Break(stopped));
                    }
                }
            }
        }

        info!(
            seconds = config.initial_grace_period.as_secs(),
            "waiting for the server to come back"
        );
        Ok(self.grace(config.initial_grace_period).await)
    }

    async fn grace(&mut self, period: Duration) -> ControlFlow<Stopped> {
        self.phase = Phase::Booting;
        self.emit(WatchdogEvent::GraceStarted { period });
        self.sleep(period).await
    }

    async fn sleep(&mut self, duration: Duration) -> ControlFlow<Stopped> {
        match until_shutdown(&mut self.shutdown, tokio::time::sleep(duration)).await {
            Some(()) => ControlFlow::Continue(()),
            None => ControlFlow::Break(Stopped::Shutdown),
        }
    }

    fn emit(&self, event: WatchdogEvent) {
        if let Some(ref callback) = self.on_event {
            callback(&event);
        }
    }
}

/// Drive `fut` unless shutdown is (or becomes) requested first.
async fn until_shutdown<F: Future>(
    shutdown: &mut watch::Receiver<bool>,
    fut: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = shutdown_requested(shutdown) => None,
        output = fut => Some(output),
    }
}

async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        // Sender gone: nobody can ask us to stop any more.
        std::future::pending::<()>().await;
    }
}

/// Delay before restart attempt `attempt + 1`: the poll interval, doubled
/// per failed attempt, capped at [`MAX_RESTART_BACKOFF`].
fn restart_backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1u32
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(MAX_RESTART_BACKOFF)
}
