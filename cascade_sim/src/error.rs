//! Error types for the simulation harness.

use cascade_core::CoreError;
use cascade_env::EnvError;
use thiserror::Error;

/// Errors surfaced to the operator.
#[derive(Debug, Error)]
pub enum SimError {
    /// Graph construction failed (edge source missing, empty graph)
    #[error("Graph construction failed: {0}")]
    Construction(#[from] CoreError),

    /// Configuration rejected before anything was built
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Opening the output sink failed
    #[error("Sink setup failed: {0}")]
    Sink(#[from] EnvError),
}
