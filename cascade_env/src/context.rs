//! Core environment context trait for simulation processes.

use async_trait::async_trait;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, SystemTime};

/// The central interface for environment interaction.
///
/// Activation, evolution and publishing loops never touch the clock or the
/// OS entropy pool directly; they go through this trait.
///
/// # Determinism
///
/// When a seed is supplied every RNG handed out by [`derive_rng`] is derived
/// from it, so single-task behavior is reproducible. Interleaving of
/// concurrent tasks is still decided by the scheduler.
///
/// [`derive_rng`]: CascadeContext::derive_rng
#[async_trait]
pub trait CascadeContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time used for snapshot annotations.
    fn system_time(&self) -> SystemTime;

    /// Suspends the calling task for the given duration.
    ///
    /// Callers that must stay responsive to cancellation race this future
    /// against their cancellation token.
    async fn sleep(&self, duration: Duration);

    /// Returns an RNG for one logical stream of draws.
    ///
    /// With a seed, the same `stream` always yields the same sequence.
    /// Without one, every call is seeded from OS entropy.
    ///
    /// # Arguments
    /// * `stream` - Caller-chosen identifier, e.g. a node id mixed with a role tag
    fn derive_rng(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the master seed, if the caller fixed one.
    fn seed(&self) -> Option<u64>;
}
