//! Error types for A2S queries.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while configuring or running an A2S query.
#[derive(Debug, Error)]
pub enum A2sError {
    #[error("invalid target {host}: {reason}")]
    InvalidTarget { host: String, reason: String },

    #[error("no query target configured")]
    NoTarget,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("unexpected reply type {0:#04x}")]
    UnexpectedResponse(u8),

    #[error("split replies are not supported")]
    SplitResponse,

    #[error("server kept answering with challenges")]
    TooManyChallenges,
}
