//! Production implementation of CascadeContext using Tokio.

use crate::CascadeContext;
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Context backed by the Tokio clock and either a master seed or OS entropy.
///
/// Uses `tokio::time::Instant` so that tests running with a paused clock
/// observe virtual time consistently with `sleep()`.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,

    /// Master seed, `None` for entropy-seeded runs
    seed: Option<u64>,
}

impl TokioContext {
    /// Creates an unseeded context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            seed: None,
        }
    }

    /// Creates a context whose RNG streams all derive from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            start: Instant::now(),
            seed: Some(seed),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared(seed: Option<u64>) -> Arc<Self> {
        Arc::new(match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::new(),
        })
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CascadeContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn derive_rng(&self, stream: u64) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => {
                let combined = seed.wrapping_mul(0x517cc1b727220a95) ^ stream;
                ChaCha8Rng::seed_from_u64(combined)
            }
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }
}
