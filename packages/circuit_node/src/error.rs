//! Recoverable command-level errors.
//!
//! Setup failures (endpoint bind, relay startup) stay `anyhow::Error` in the
//! binaries and abort the process. Everything here aborts at most the single
//! command that triggered it and surfaces as a one-line diagnostic.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid peer ID: {0}")]
    InvalidPeerId(String),

    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unrecognized command: {0}")]
    UnknownCommand(String),

    #[error("error establishing connection: {0}")]
    ConnectFailed(String),

    #[error("stream error: {0}")]
    Stream(String),
}
