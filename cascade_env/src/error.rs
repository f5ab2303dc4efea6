//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors that can occur while delivering snapshots to the outside world.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The receiving side of the sink is gone (viewer disconnected, channel dropped)
    #[error("Sink closed: {0}")]
    SinkClosed(String),

    /// The sink cannot accept another payload right now
    #[error("Sink full, payload of {0} bytes dropped")]
    SinkFull(usize),

    /// Writing the payload failed
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

impl EnvError {
    /// Creates a closed-sink error.
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::SinkClosed(msg.into())
    }
}

impl From<std::io::Error> for EnvError {
    fn from(err: std::io::Error) -> Self {
        Self::WriteFailed(err.to_string())
    }
}
