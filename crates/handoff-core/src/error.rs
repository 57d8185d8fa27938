//! Error types for Handoff Core

use thiserror::Error;

/// Result type alias using Handoff Error
pub type Result<T> = std::result::Result<T, Error>;

/// Handoff error types
#[derive(Error, Debug)]
pub enum Error {
    /// Another task already holds the user's session slot. Expected,
    /// user-visible, not a fault.
    #[error("another task is already running for user {0}")]
    Busy(String),

    #[error("task error: {0}")]
    Task(String),

    /// Outbound notification could not be delivered. Logged, never
    /// aborts the gating protocol.
    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("task cancelled")]
    Cancelled,
}
