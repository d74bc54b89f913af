//! srcwatch-health: liveness monitoring and self-healing for one game server.
//!
//! Polls a server with an A2S query, accumulates the time it has spent
//! unresponsive, and restarts its container once that time crosses a
//! threshold. After every restart the server gets the same grace period
//! it got at startup before polling resumes.
//!
//! # Architecture
//!
//! ```text
//! Watchdog (single owning context)
//!   ├── LivenessProbe        ── A2sClient
//!   ├── ContainerController  ── DockerClient
//!   ├── FailureTracker (accumulated failure time)
//!   └── watch::Receiver<bool> (shutdown, checked at every suspension point)
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Idle ─start─▶ Booting ─grace─▶ Polling ─threshold─▶ Restarting
//!                  ▲                                     │
//!                  └──────────────── restart ok ─────────┘
//! any state ─shutdown / fatal error─▶ Terminated
//! ```
//!
//! Probe failures are never fatal. Bad configuration, a missing container,
//! an unusable probe target and a failed restart are.

pub mod collaborator;
pub mod config;
pub mod error;
pub mod tracker;
pub mod watchdog;

pub use collaborator::{BoxFuture, ContainerController, LivenessProbe};
pub use config::{RawConfig, WatchdogConfig};
pub use error::{ConfigError, WatchdogError};
pub use tracker::{FailureTracker, Observation};
pub use watchdog::{EventCallback, Phase, Stopped, Watchdog, WatchdogEvent};
