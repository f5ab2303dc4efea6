//! Cascade Core - opinion diffusion over a shared social graph
//!
//! Two coupled processes run over one [`GraphStore`]:
//! 1. **Activation**: an independent cascade. Seeds activate, every spreading
//!    node gets exactly one attempt per outgoing edge, each succeeding with
//!    probability `p_active`.
//! 2. **Evolution**: once active, a node repeatedly pulls its opinion toward
//!    the mean of all active opinions within its confidence `threshold`.
//!
//! Both processes are spawned as lightweight tokio tasks on a
//! [`ProcessScope`], which carries the cancellation token and task tracker
//! of one run so that a whole task tree can be stopped at once.

pub mod activation;
pub mod error;
pub mod evolution;
pub mod graph_store;
pub mod ingest;
pub mod model;
pub mod process;
pub mod random_model;
pub mod stats;

// Re-export key types for convenience
pub use activation::{relaunch, seed_starters, Relaunch};
pub use error::CoreError;
pub use graph_store::{Activation, GraphStore, NodeTemplate, OpinionView};
pub use ingest::{load_edge_file, read_edges, IngestReport};
pub use model::{Edge, Node, NodeId, PushMessage};
pub use process::{DynamicsParams, ProcessScope};
pub use random_model::OpinionSource;
pub use stats::GraphStats;
