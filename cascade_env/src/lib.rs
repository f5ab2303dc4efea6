//! Cascade Environment Abstraction Layer
//!
//! This crate isolates everything the simulation engine needs from "the
//! outside world" behind small traits:
//! - Time (`now()`, `system_time()`, `sleep()`)
//! - Randomness (`derive_rng()`, seeded or from OS entropy)
//! - Delivery of serialized snapshots (`SnapshotSink::publish()`)
//!
//! The engine in `cascade_core` is generic over [`CascadeContext`], so the
//! same process code runs against the wall clock in production and against
//! tokio's paused clock in tests.
//!
//! # Example
//!
//! ```ignore
//! use cascade_env::{CascadeContext, TokioContext};
//!
//! let ctx = TokioContext::seeded(42);
//! let mut rng = ctx.derive_rng(7);
//! ctx.sleep(Duration::from_millis(500)).await;
//! ```

mod context;
mod error;
mod sink;
mod tokio_impl;

pub use context::CascadeContext;
pub use error::EnvError;
pub use sink::{ChannelSink, SnapshotSink, WriterSink};
pub use tokio_impl::TokioContext;
