//! Shared handle passed to every per-node task of one run.

use crate::activation;
use crate::evolution;
use crate::graph_store::GraphStore;
use crate::model::NodeId;
use cascade_env::CascadeContext;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Tunables of the two diffusion processes.
#[derive(Debug, Clone)]
pub struct DynamicsParams {
    /// Probability that one edge attempt transmits activation
    pub p_active: f64,

    /// Pause after each successful activation before the next attempt
    pub propagation_delay: Duration,

    /// Period of the opinion update loop
    pub evolve_interval: Duration,
}

impl Default for DynamicsParams {
    fn default() -> Self {
        Self {
            p_active: 0.6,
            propagation_delay: Duration::from_millis(500),
            evolve_interval: Duration::from_secs(1),
        }
    }
}

/// Role tags mixed into per-task RNG streams.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Role {
    Seed = 1,
    Cascade = 2,
    Evolve = 3,
}

/// Everything a per-node task needs, scoped to one run of one graph.
///
/// The `cancel` token belongs to this run only. Tasks copy the scope they
/// were spawned with, so a later run on a new graph can never be stopped
/// or kept alive by an older token.
pub struct ProcessScope<Ctx: CascadeContext> {
    pub ctx: Arc<Ctx>,
    pub store: Arc<GraphStore>,
    pub params: Arc<DynamicsParams>,
    pub cancel: CancellationToken,
    pub tracker: TaskTracker,

    /// Run counter, keeps seeded RNG streams distinct across resumes
    pub epoch: u64,
}

impl<Ctx: CascadeContext> Clone for ProcessScope<Ctx> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            store: Arc::clone(&self.store),
            params: Arc::clone(&self.params),
            cancel: self.cancel.clone(),
            tracker: self.tracker.clone(),
            epoch: self.epoch,
        }
    }
}

impl<Ctx: CascadeContext> ProcessScope<Ctx> {
    pub fn new(
        ctx: Arc<Ctx>,
        store: Arc<GraphStore>,
        params: Arc<DynamicsParams>,
        cancel: CancellationToken,
        tracker: TaskTracker,
        epoch: u64,
    ) -> Self {
        Self {
            ctx,
            store,
            params,
            cancel,
            tracker,
            epoch,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sleeps for `duration` unless the run is cancelled first.
    ///
    /// Returns `false` when woken by cancellation.
    pub async fn pause_for(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = self.ctx.sleep(duration) => true,
        }
    }

    /// Spawns a cascade continuation from `source`.
    pub fn spawn_cascade(&self, source: NodeId) {
        self.tracker.spawn(activation::cascade_from(self.clone(), source));
    }

    /// Spawns the opinion loop of `id`.
    pub fn spawn_evolution(&self, id: NodeId) {
        self.tracker.spawn(evolution::evolve(self.clone(), id));
    }

    pub(crate) fn rng(&self, id: NodeId, role: Role) -> ChaCha8Rng {
        self.ctx.derive_rng(stream_id(id, self.epoch, role))
    }
}

/// Mixes node, epoch and role into one RNG stream id.
///
/// Each input is spread over all 64 bits by its own odd multiplier, then
/// finalized with a splitmix64 round.
pub(crate) fn stream_id(id: NodeId, epoch: u64, role: Role) -> u64 {
    let mut x = id.wrapping_mul(0x9e37_79b9_7f4a_7c15)
        ^ epoch.wrapping_mul(0xc2b2_ae3d_27d4_eb4f)
        ^ (role as u64).wrapping_mul(0x1656_67b1_9e37_79f9);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}
