//! SimulationController - lifecycle owner of the current graph.
//!
//! ```text
//!            start()               pause()
//!   Idle ───────────────► Running ─────────► Paused
//!    ▲                      ▲  ▲               │ │
//!    │ reset()              │  └── resume() ───┘ │
//!    └──────────────────────┴───── start() ──────┘  (fresh graph)
//! ```
//!
//! A *generation* is one graph plus its root cancellation token and task
//! tracker. Each run inside a generation (the initial start and every
//! resume) gets a child token; pausing cancels that child, resetting or
//! restarting cancels the root.

use crate::config::{EdgeSource, SimConfig};
use crate::error::SimError;
use crate::publisher::{PublishCounts, PublisherStats, SinkSlot, SnapshotPublisher};
use crate::reporter::run_stats_reporter;

use cascade_core::{
    load_edge_file, relaunch, seed_starters, DynamicsParams, GraphStats, GraphStore, IngestReport,
    ProcessScope, Relaunch,
};
use cascade_env::{CascadeContext, SnapshotSink, TokioContext};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Paused,
}

/// Outcome of a lifecycle call. Misuse is reported here, never as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// A fresh graph was built and seeded
    Started { nodes: usize, edges: usize, seeded: usize },

    /// `start()` while already running; nothing changed
    AlreadyRunning,

    /// All tasks of the current run have exited
    Paused(GraphStats),

    /// `pause()` while not running
    NotRunning,

    /// Processes restarted on the existing graph
    Resumed(Relaunch),

    /// `resume()` while not paused
    NotPaused,

    /// Graph dropped, back to idle
    Reset,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub state: RunState,
    pub generation: u64,
    pub graph: Option<GraphStats>,
    pub delivery: PublishCounts,
}

/// One graph and the tasks running against it.
struct Generation {
    store: Arc<GraphStore>,
    root: CancellationToken,
    run: CancellationToken,
    tracker: TaskTracker,
    epoch: u64,
}

impl Generation {
    async fn stop_run(&mut self) {
        self.run.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn shutdown(mut self) {
        self.root.cancel();
        self.stop_run().await;
    }
}

/// Single owner of the simulation lifecycle.
///
/// Created once by the hosting application and driven from one control
/// task. Dropping it cancels every task of the current generation.
pub struct SimulationController<Ctx: CascadeContext> {
    config: SimConfig,
    ctx: Arc<Ctx>,
    params: Arc<DynamicsParams>,
    sinks: Arc<SinkSlot>,
    delivery: Arc<PublisherStats>,
    state: RunState,
    current: Option<Generation>,
    generations: u64,
}

impl<Ctx: CascadeContext> SimulationController<Ctx> {
    /// Creates an idle controller after validating the configuration.
    ///
    /// A seed fixed in the config must be the seed the context draws from;
    /// [`SimulationController::from_config`] builds a matching context.
    pub fn new(config: SimConfig, ctx: Arc<Ctx>) -> Result<Self, SimError> {
        config.validate()?;
        if let Some(seed) = config.seed {
            if ctx.seed() != Some(seed) {
                return Err(SimError::InvalidConfig(format!(
                    "config seed {} does not match context seed {:?}",
                    seed,
                    ctx.seed()
                )));
            }
        }
        let params = Arc::new(config.dynamics());

        Ok(Self {
            config,
            ctx,
            params,
            sinks: Arc::new(SinkSlot::default()),
            delivery: Arc::new(PublisherStats::default()),
            state: RunState::Idle,
            current: None,
            generations: 0,
        })
    }

    /// Binds the snapshot sink, replacing any previous one.
    pub fn bind_sink(&self, sink: Arc<dyn SnapshotSink>) {
        if let Some(previous) = self.sinks.bind(Arc::clone(&sink)) {
            info!("Sink {} replaced by {}", previous.describe(), sink.describe());
        } else {
            info!("Sink {} bound", sink.describe());
        }
    }

    /// Unbinds the snapshot sink; publishing idles until the next bind.
    pub fn unbind_sink(&self) {
        if let Some(previous) = self.sinks.unbind() {
            info!("Sink {} unbound", previous.describe());
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The graph of the current generation, if any.
    pub fn store(&self) -> Option<Arc<GraphStore>> {
        self.current.as_ref().map(|g| Arc::clone(&g.store))
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            generation: self.generations,
            graph: self.current.as_ref().map(|g| g.store.stats()),
            delivery: self.delivery.counts(),
        }
    }

    /// Builds a fresh graph, seeds the starters and starts publishing.
    ///
    /// A paused generation is torn down first. On a construction error the
    /// controller is left idle.
    pub async fn start(&mut self) -> Result<Lifecycle, SimError> {
        if self.state == RunState::Running {
            return Ok(Lifecycle::AlreadyRunning);
        }

        if let Some(previous) = self.current.take() {
            previous.shutdown().await;
        }
        self.state = RunState::Idle;

        let report = self.ingest()?;
        let mut rng = self.ctx.derive_rng(0);
        let store = Arc::new(GraphStore::build(
            report.edges,
            self.config.node_count,
            &self.config.node_template,
            &mut rng,
        )?);

        let root = CancellationToken::new();
        let generation = Generation {
            store,
            run: root.child_token(),
            root,
            tracker: TaskTracker::new(),
            epoch: 0,
        };
        self.generations += 1;

        let scope = self.scope(&generation);
        let seeded = seed_starters(&scope, &self.config.starters);
        if seeded == 0 {
            warn!("None of the starters {:?} could be seeded", self.config.starters);
        }
        self.launch_background(&generation);

        let nodes = generation.store.len();
        let edges = generation.store.snapshot().1.len();
        info!(
            "Generation {} started: {} nodes, {} edges, {} seeds",
            self.generations, nodes, edges, seeded
        );

        self.current = Some(generation);
        self.state = RunState::Running;
        Ok(Lifecycle::Started { nodes, edges, seeded })
    }

    /// Stops every task of the current run and waits for them to exit.
    pub async fn pause(&mut self) -> Lifecycle {
        if self.state != RunState::Running {
            return Lifecycle::NotRunning;
        }
        let Some(generation) = self.current.as_mut() else {
            return Lifecycle::NotRunning;
        };

        generation.stop_run().await;
        self.state = RunState::Paused;

        let stats = generation.store.stats();
        info!("Simulation paused: {}", stats);
        Lifecycle::Paused(stats)
    }

    /// Restarts the processes of the paused graph without rebuilding it.
    pub async fn resume(&mut self) -> Lifecycle {
        if self.state != RunState::Paused {
            return Lifecycle::NotPaused;
        }
        let Some(mut generation) = self.current.take() else {
            return Lifecycle::NotPaused;
        };

        generation.epoch += 1;
        generation.run = generation.root.child_token();
        generation.tracker.reopen();

        let relaunched = relaunch(&self.scope(&generation));
        self.launch_background(&generation);
        self.current = Some(generation);
        self.state = RunState::Running;

        info!(
            "Simulation resumed: {} evolving, {} spreading",
            relaunched.evolving, relaunched.spreading
        );
        Lifecycle::Resumed(relaunched)
    }

    /// Cancels the current generation, waits for its tasks and drops the graph.
    pub async fn reset(&mut self) -> Lifecycle {
        if let Some(generation) = self.current.take() {
            generation.shutdown().await;
        }
        self.state = RunState::Idle;
        info!("Simulation reset");
        Lifecycle::Reset
    }

    fn ingest(&self) -> Result<IngestReport, SimError> {
        match &self.config.edge_source {
            EdgeSource::File(path) => Ok(load_edge_file(path)?),
            EdgeSource::Pairs(pairs) => Ok(IngestReport {
                edges: pairs.clone(),
                skipped: 0,
            }),
        }
    }

    fn scope(&self, generation: &Generation) -> ProcessScope<Ctx> {
        ProcessScope::new(
            Arc::clone(&self.ctx),
            Arc::clone(&generation.store),
            Arc::clone(&self.params),
            generation.run.clone(),
            generation.tracker.clone(),
            generation.epoch,
        )
    }

    fn launch_background(&self, generation: &Generation) {
        let publisher = SnapshotPublisher::new(
            Arc::clone(&self.ctx),
            Arc::clone(&generation.store),
            Arc::clone(&self.sinks),
            Arc::clone(&self.delivery),
            self.config.publish_interval,
        );
        generation.tracker.spawn(publisher.run(generation.run.clone()));

        if !self.config.stats_interval.is_zero() {
            generation.tracker.spawn(run_stats_reporter(
                Arc::clone(&self.ctx),
                Arc::clone(&generation.store),
                self.config.stats_interval,
                generation.run.clone(),
            ));
        }
    }
}

impl SimulationController<TokioContext> {
    /// Creates an idle controller on the Tokio clock, seeded from `config.seed`.
    pub fn from_config(config: SimConfig) -> Result<Self, SimError> {
        let ctx = TokioContext::shared(config.seed);
        Self::new(config, ctx)
    }
}

impl<Ctx: CascadeContext> Drop for SimulationController<Ctx> {
    fn drop(&mut self) {
        if let Some(generation) = &self.current {
            generation.root.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::{NodeTemplate, PushMessage};
    use async_trait::async_trait;
    use cascade_env::{ChannelSink, EnvError};
    use std::time::Duration;

    fn fast(config: SimConfig) -> SimConfig {
        config
            .with_seed(42)
            .with_timing(
                Duration::from_millis(20),
                Duration::from_millis(100),
                Duration::from_millis(50),
            )
            .with_stats_interval(Duration::ZERO)
    }

    fn chain_config() -> SimConfig {
        fast(SimConfig::default())
            .with_edges(EdgeSource::Pairs(vec![(1, 2), (2, 3)]))
            .with_starters(vec![1])
            .with_p_active(1.0)
            .with_node_template(NodeTemplate {
                threshold: None,
                spread_willingness: Some(1.0),
            })
    }

    fn controller(config: SimConfig) -> SimulationController<TokioContext> {
        SimulationController::from_config(config).unwrap()
    }

    struct StalledSink;

    #[async_trait]
    impl SnapshotSink for StalledSink {
        async fn publish(&self, _payload: Vec<u8>) -> Result<(), EnvError> {
            std::future::pending().await
        }

        fn describe(&self) -> String {
            "stalled".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_scenario_activates_everyone() {
        let mut controller = controller(chain_config());

        let started = controller.start().await.unwrap();
        assert_eq!(started, Lifecycle::Started { nodes: 3, edges: 2, seeded: 1 });

        tokio::time::sleep(Duration::from_secs(2)).await;
        let store = controller.store().unwrap();
        for id in 1..=3 {
            let node = store.lookup(id).unwrap();
            assert!(node.active, "node {} inactive", id);
            assert_eq!(node.is_leader, id == 1);
        }
        controller.reset().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_isolated_node_never_activates() {
        let config = fast(SimConfig::default())
            .with_edges(EdgeSource::Pairs(Vec::new()))
            .with_node_count(2)
            .with_starters(vec![1])
            .with_p_active(1.0);
        let mut controller = controller(config);
        controller.start().await.unwrap();

        let store = controller.store().unwrap();
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(!store.lookup(2).unwrap().active);
        }
        controller.reset().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_reports_already_running() {
        let mut controller = controller(chain_config());
        controller.start().await.unwrap();
        let store = controller.store().unwrap();

        assert_eq!(controller.start().await.unwrap(), Lifecycle::AlreadyRunning);
        assert!(Arc::ptr_eq(&store, &controller.store().unwrap()));
        assert_eq!(controller.status().generation, 1);
        controller.reset().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_misuse_is_reported() {
        let mut controller = controller(chain_config());
        assert_eq!(controller.pause().await, Lifecycle::NotRunning);
        assert_eq!(controller.resume().await, Lifecycle::NotPaused);

        controller.start().await.unwrap();
        assert_eq!(controller.resume().await, Lifecycle::NotPaused);

        assert!(matches!(controller.pause().await, Lifecycle::Paused(_)));
        assert_eq!(controller.pause().await, Lifecycle::NotRunning);
        controller.reset().await;
        assert_eq!(controller.state(), RunState::Idle);
        assert!(controller.store().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_all_opinions() {
        let pairs: Vec<_> = (1..20).map(|id| (id, id + 1)).collect();
        let config = fast(SimConfig::default())
            .with_edges(EdgeSource::Pairs(pairs))
            .with_starters(vec![1, 10])
            .with_p_active(1.0);
        let mut controller = controller(config);
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let Lifecycle::Paused(stats) = controller.pause().await else {
            panic!("expected pause");
        };
        assert!(stats.active >= 2);

        let store = controller.store().unwrap();
        let frozen = store.snapshot().0;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(store.snapshot().0, frozen);

        for node in &frozen {
            assert!((0.0..=1.0).contains(&node.value));
        }
        controller.reset().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_continues_same_graph() {
        let mut config = fast(SimConfig::default())
            .with_edges(EdgeSource::Pairs(vec![(1, 2), (1, 3)]))
            .with_starters(vec![1])
            .with_p_active(1.0)
            .with_node_template(NodeTemplate {
                threshold: None,
                spread_willingness: Some(0.0),
            });
        config.propagation_delay = Duration::from_secs(10);
        let mut controller = controller(config);
        controller.start().await.unwrap();

        // Seed activates node 2 then waits out the long delay
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.pause().await;
        let store = controller.store().unwrap();
        assert!(store.lookup(2).unwrap().active);
        assert!(!store.lookup(3).unwrap().active);

        let Lifecycle::Resumed(relaunched) = controller.resume().await else {
            panic!("expected resume");
        };
        assert_eq!(relaunched.evolving, 2);
        assert_eq!(relaunched.spreading, 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(Arc::ptr_eq(&store, &controller.store().unwrap()));
        assert!(store.lookup(3).unwrap().active);
        assert!(!store.lookup(3).unwrap().spreading);
        assert_eq!(controller.state(), RunState::Running);
        controller.reset().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_abandons_previous_generation() {
        let mut controller = controller(chain_config());
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.pause().await;
        let old = controller.store().unwrap();

        assert!(matches!(controller.start().await.unwrap(), Lifecycle::Started { .. }));
        let new = controller.store().unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(controller.status().generation, 2);

        let frozen = old.snapshot().0;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(old.snapshot().0, frozen);
        assert!(new.stats().evolved > 0);
        controller.reset().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_edge_file_aborts_start() {
        let config = fast(SimConfig::default())
            .with_edges(EdgeSource::File("/no/such/edges.csv".into()));
        let mut controller = controller(config);

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, SimError::Construction(_)));
        assert_eq!(controller.state(), RunState::Idle);
        assert!(controller.store().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_reach_bound_sink() {
        let mut controller = controller(chain_config());
        let (sink, mut rx) = ChannelSink::new(64);
        controller.bind_sink(Arc::new(sink));
        controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let mut last = None;
        while let Ok(payload) = rx.try_recv() {
            last = Some(PushMessage::from_json_slice(&payload).unwrap());
        }
        let message = last.expect("no snapshot published");
        assert_eq!(message.nodes.len(), 3);
        assert_eq!(message.edges.len(), 2);
        assert!(message.appendix.starts_with("Data in "));
        assert!(controller.status().delivery.published > 0);

        // Unbound: publishing idles without errors
        controller.unbind_sink();
        let before = controller.status().delivery;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(controller.status().delivery, before);
        controller.reset().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_returns_despite_stalled_sink() {
        let mut controller = controller(chain_config());
        controller.bind_sink(Arc::new(StalledSink));
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let paused = tokio::time::timeout(Duration::from_secs(5), controller.pause())
            .await
            .expect("pause blocked by the sink");
        assert!(matches!(paused, Lifecycle::Paused(_)));

        controller.resume().await;
        tokio::time::timeout(Duration::from_secs(5), controller.reset())
            .await
            .expect("reset blocked by the sink");
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_builds_same_graph() {
        let config = || {
            SimConfig::default()
                .with_seed(7)
                .with_edges(EdgeSource::Pairs(vec![(1, 2), (2, 3), (3, 1)]))
                .with_starters(vec![1])
                .with_stats_interval(Duration::ZERO)
        };
        let parameters = |store: Arc<GraphStore>| -> Vec<(f64, f64)> {
            store
                .snapshot()
                .0
                .iter()
                .map(|n| (n.threshold, n.spread_willingness))
                .collect()
        };

        let mut a = SimulationController::from_config(config()).unwrap();
        let mut b = SimulationController::from_config(config()).unwrap();
        a.start().await.unwrap();
        b.start().await.unwrap();

        assert_eq!(parameters(a.store().unwrap()), parameters(b.store().unwrap()));
        a.reset().await;
        b.reset().await;
    }

    #[tokio::test]
    async fn test_seed_mismatch_is_rejected() {
        let config = SimConfig::default().with_seed(7);
        assert!(matches!(
            SimulationController::new(config.clone(), TokioContext::shared(None)),
            Err(SimError::InvalidConfig(_))
        ));
        assert!(matches!(
            SimulationController::new(config.clone(), TokioContext::shared(Some(8))),
            Err(SimError::InvalidConfig(_))
        ));
        assert!(SimulationController::new(config, TokioContext::shared(Some(7))).is_ok());

        // Unset config seed leaves the choice to the context
        assert!(SimulationController::new(SimConfig::default(), TokioContext::shared(Some(3))).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = SimConfig::default().with_p_active(-1.0);
        assert!(matches!(
            SimulationController::new(config, TokioContext::shared(None)),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
