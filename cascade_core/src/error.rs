//! Error types for graph construction and snapshot encoding.

use thiserror::Error;

/// Errors raised by the simulation core.
///
/// Only construction-time failures are fatal; everything that can go wrong
/// while the processes run is handled in place and logged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The edge source could not be opened at all
    #[error("Edge source unavailable: {path}: {source}")]
    EdgeSourceUnavailable {
        path: String,
        source: std::io::Error,
    },

    /// Reading the edge source failed part way through
    #[error("Edge source read failed: {0}")]
    Io(#[from] std::io::Error),

    /// Construction produced no nodes to simulate
    #[error("Graph has no nodes")]
    EmptyGraph,

    /// Snapshot encoding/decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
