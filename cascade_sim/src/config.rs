//! Simulation configuration.

use crate::error::SimError;
use cascade_core::{DynamicsParams, NodeId, NodeTemplate};
use std::path::PathBuf;
use std::time::Duration;

/// Where the controller gets its edge list from.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeSource {
    /// Delimited text file, one `src,dst` pair per line
    File(PathBuf),

    /// Pairs already in memory
    Pairs(Vec<(NodeId, NodeId)>),
}

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed (`None` = entropy, runs are not reproducible)
    pub seed: Option<u64>,

    /// Probability that one edge attempt transmits activation
    pub p_active: f64,

    /// Seed nodes forced active at start
    pub starters: Vec<NodeId>,

    /// Number of nodes (`None` = largest id in the edge list)
    pub node_count: Option<u64>,

    /// Edge list
    pub edge_source: EdgeSource,

    /// Pinned node parameters; unset fields are drawn uniformly
    pub node_template: NodeTemplate,

    /// Pause after each successful activation
    pub propagation_delay: Duration,

    /// Period of each node's opinion update
    pub evolve_interval: Duration,

    /// Period of snapshot publishing
    pub publish_interval: Duration,

    /// Period of the statistics log line (zero disables it)
    pub stats_interval: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            p_active: 0.6,
            starters: vec![1, 24],
            node_count: None,
            edge_source: EdgeSource::Pairs(Vec::new()),
            node_template: NodeTemplate::default(),
            propagation_delay: Duration::from_millis(500),
            evolve_interval: Duration::from_secs(1),
            publish_interval: Duration::from_millis(500),
            stats_interval: Duration::from_millis(500),
        }
    }
}

impl SimConfig {
    /// Sets the master seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the edge list.
    pub fn with_edges(mut self, source: EdgeSource) -> Self {
        self.edge_source = source;
        self
    }

    /// Sets the node count.
    pub fn with_node_count(mut self, count: u64) -> Self {
        self.node_count = Some(count);
        self
    }

    /// Sets the seed nodes.
    pub fn with_starters(mut self, starters: Vec<NodeId>) -> Self {
        self.starters = starters;
        self
    }

    /// Sets the edge transmission probability.
    pub fn with_p_active(mut self, p_active: f64) -> Self {
        self.p_active = p_active;
        self
    }

    /// Pins node parameters.
    pub fn with_node_template(mut self, template: NodeTemplate) -> Self {
        self.node_template = template;
        self
    }

    /// Sets the activation delay and update/publish periods at once.
    pub fn with_timing(mut self, propagation_delay: Duration, evolve_interval: Duration, publish_interval: Duration) -> Self {
        self.propagation_delay = propagation_delay;
        self.evolve_interval = evolve_interval;
        self.publish_interval = publish_interval;
        self
    }

    /// Sets the statistics period.
    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Parameters handed to the per-node processes.
    pub fn dynamics(&self) -> DynamicsParams {
        DynamicsParams {
            p_active: self.p_active,
            propagation_delay: self.propagation_delay,
            evolve_interval: self.evolve_interval,
        }
    }

    /// Rejects values the processes cannot run with.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(0.0..=1.0).contains(&self.p_active) {
            return Err(SimError::InvalidConfig(format!("p_active {} outside [0, 1]", self.p_active)));
        }
        if self.starters.is_empty() {
            return Err(SimError::InvalidConfig("no starter nodes".to_string()));
        }
        if self.evolve_interval.is_zero() || self.publish_interval.is_zero() {
            return Err(SimError::InvalidConfig(
                "evolve and publish intervals must be positive".to_string(),
            ));
        }
        let pinned = [self.node_template.threshold, self.node_template.spread_willingness];
        if pinned.iter().flatten().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(SimError::InvalidConfig("pinned node parameters must lie in [0, 1]".to_string()));
        }
        Ok(())
    }
}
