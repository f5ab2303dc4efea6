//! Cascade Sim - lifecycle control and snapshot publishing
//!
//! Hosts the [`SimulationController`], the only owner of the running graph:
//!
//! ```text
//!  ┌──────────────┐  start/pause/resume/reset  ┌──────────────────────────┐
//!  │ control loop │ ─────────────────────────► │   SimulationController   │
//!  └──────────────┘                            │  ┌────────────────────┐  │
//!                                              │  │ GraphStore (gen N) │  │
//!                                              │  └─────────┬──────────┘  │
//!                                              │   activation / evolution │
//!                                              │   SnapshotPublisher ─────┼──► SnapshotSink
//!                                              │   stats reporter ────────┼──► log
//!                                              └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use cascade_sim::{EdgeSource, SimConfig, SimulationController};
//! use cascade_env::{TokioContext, WriterSink};
//!
//! let config = SimConfig::default().with_edges(EdgeSource::File("edges.csv".into()));
//! let mut controller = SimulationController::new(config, TokioContext::shared(None))?;
//! controller.bind_sink(Arc::new(WriterSink::stdout()));
//! controller.start().await?;
//! ```

mod config;
mod control;
mod controller;
mod error;
mod publisher;
mod reporter;

pub use config::{EdgeSource, SimConfig};
pub use control::ControlCommand;
pub use controller::{Lifecycle, RunState, SimulationController, Status};
pub use error::SimError;
pub use publisher::{format_appendix, PublishCounts, PublishOutcome, PublisherStats, SinkSlot, SnapshotPublisher};
pub use reporter::run_stats_reporter;
