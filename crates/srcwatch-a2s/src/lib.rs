//! srcwatch-a2s: liveness queries for Source engine game servers.
//!
//! Speaks the A2S_INFO request of the Source server query protocol over
//! UDP. A server that answers with an info reply is considered alive; any
//! other outcome is reported as a typed [`A2sError`].
//!
//! # Exchange
//!
//! ```text
//! client                              server
//!   │ ── A2S_INFO ──────────────────────▶ │
//!   │ ◀───────────── S2C_CHALLENGE (opt) ─ │
//!   │ ── A2S_INFO + challenge ─────────▶ │
//!   │ ◀──────────────────────── S2A_INFO ─ │
//! ```
//!
//! The client re-resolves the target host before every query, so a
//! server whose container comes back on a new address is still reached.

pub mod client;
pub mod error;
pub mod info;
pub mod packet;

pub use client::{A2sClient, DEFAULT_TIMEOUT};
pub use error::A2sError;
pub use info::{Environment, ServerInfo, ServerType, SourceTv};
