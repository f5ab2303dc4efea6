//! Thread-safe graph store.
//!
//! One `RwLock` guards the whole graph. Adjacency is fixed at construction;
//! only node fields (and each spreader's cascade cursor) change afterwards.
//!
//! Locks are synchronous and every method releases its scope before
//! returning, so no caller can hold one across an `.await`.

use crate::error::CoreError;
use crate::model::{Edge, Node, NodeId, PushMessage};
use crate::random_model::draw_uniform_unit;
use crate::stats::GraphStats;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Outcome of an activation attempt on one node.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// This call flipped the node to active; carries the updated copy
    Activated(Node),

    /// Someone else got there first
    AlreadyActive,

    /// No node with that id
    Missing,
}

/// Everything one evolution tick needs, read in a single shared scope.
#[derive(Debug, Clone, PartialEq)]
pub struct OpinionView {
    pub value: f64,
    pub threshold: f64,

    /// Opinions of every active node in the graph, the caller's included
    pub active_opinions: Vec<f64>,
}

/// Fixed per-node parameters applied at construction.
///
/// `None` fields are drawn uniformly from [0, 1] for every node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeTemplate {
    pub threshold: Option<f64>,
    pub spread_willingness: Option<f64>,
}

/// The graph proper: nodes, adjacency and per-spreader progress.
#[derive(Debug, Default)]
struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<NodeId, Vec<NodeId>>,

    /// Index of the next neighbor each spreader will attempt
    cursors: HashMap<NodeId, usize>,
}

/// Shared, lock-protected graph used by every simulation task.
#[derive(Debug)]
pub struct GraphStore {
    inner: RwLock<Graph>,
}

impl GraphStore {
    /// Builds a graph from `(src, dst)` pairs.
    ///
    /// Nodes `1..=N` get `threshold` and `spread_willingness` from the
    /// template, or independent uniform draws. `N` is `node_count` when
    /// given, otherwise the largest id seen in `pairs`. Pairs touching ids
    /// outside `1..=N` are dropped so that every adjacency entry has a node.
    pub fn build<R, I>(
        pairs: I,
        node_count: Option<u64>,
        template: &NodeTemplate,
        rng: &mut R,
    ) -> Result<Self, CoreError>
    where
        R: Rng + ?Sized,
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let pairs: Vec<(NodeId, NodeId)> = pairs.into_iter().collect();
        let count = node_count.unwrap_or_else(|| {
            pairs.iter().map(|&(src, dst)| src.max(dst)).max().unwrap_or(0)
        });
        if count == 0 {
            return Err(CoreError::EmptyGraph);
        }

        let nodes = (1..=count)
            .map(|id| {
                let threshold = draw_uniform_unit(rng);
                let willingness = draw_uniform_unit(rng);
                Node::new(
                    id,
                    template.threshold.unwrap_or(threshold),
                    template.spread_willingness.unwrap_or(willingness),
                )
            })
            .collect();

        Ok(Self::from_nodes(nodes, pairs))
    }

    /// Builds a graph from prepared nodes.
    ///
    /// Pairs referring to unknown ids are dropped with a warning.
    pub fn from_nodes<I>(nodes: Vec<Node>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let nodes: BTreeMap<NodeId, Node> = nodes.into_iter().map(|n| (n.id, n)).collect();
        let mut edges: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut dropped = 0usize;

        for (src, dst) in pairs {
            if !nodes.contains_key(&src) || !nodes.contains_key(&dst) {
                dropped += 1;
                continue;
            }
            edges.entry(src).or_default().push(dst);
        }

        if dropped > 0 {
            warn!("Dropped {} edges referencing unknown node ids", dropped);
        }

        Self {
            inner: RwLock::new(Graph {
                nodes,
                edges,
                cursors: HashMap::new(),
            }),
        }
    }

    /// Returns a copy of a node, `None` if the id is unknown.
    pub fn lookup(&self, id: NodeId) -> Option<Node> {
        self.inner.read().nodes.get(&id).cloned()
    }

    /// Returns the current opinion of a node.
    pub fn opinion(&self, id: NodeId) -> Option<f64> {
        self.inner.read().nodes.get(&id).map(|n| n.value)
    }

    /// Returns the ordered neighbor ids of a node (empty if none).
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.inner.read().edges.get(&id).cloned().unwrap_or_default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies of every node and edge, consistent as of one locked instant.
    pub fn snapshot(&self) -> (Vec<Node>, Vec<Edge>) {
        let graph = self.inner.read();
        let nodes = graph.nodes.values().cloned().collect();
        let edges = graph
            .edges
            .iter()
            .flat_map(|(&src, dsts)| dsts.iter().map(move |&dst| Edge::new(src, dst)))
            .collect();
        (nodes, edges)
    }

    /// Packages a snapshot with the given annotation.
    pub fn push_message(&self, appendix: impl Into<String>) -> PushMessage {
        let (nodes, edges) = self.snapshot();
        PushMessage {
            nodes,
            edges,
            appendix: appendix.into(),
        }
    }

    /// Counts nodes per state.
    pub fn stats(&self) -> GraphStats {
        let graph = self.inner.read();
        let mut stats = GraphStats {
            total: graph.nodes.len(),
            ..GraphStats::default()
        };
        for node in graph.nodes.values() {
            stats.active += usize::from(node.active);
            stats.spreading += usize::from(node.spreading);
            stats.evolved += usize::from(node.evolved);
            stats.leaders += usize::from(node.is_leader);
        }
        stats.inactive = stats.total - stats.active;
        stats
    }

    /// Reads a node's opinion and threshold together with all active opinions.
    pub fn opinion_view(&self, id: NodeId) -> Option<OpinionView> {
        let graph = self.inner.read();
        let node = graph.nodes.get(&id)?;
        let active_opinions = graph
            .nodes
            .values()
            .filter(|n| n.active)
            .map(|n| n.value)
            .collect();
        Some(OpinionView {
            value: node.value,
            threshold: node.threshold,
            active_opinions,
        })
    }

    /// Ids of every active node.
    pub fn active_ids(&self) -> Vec<NodeId> {
        self.inner
            .read()
            .nodes
            .values()
            .filter(|n| n.active)
            .map(|n| n.id)
            .collect()
    }

    /// Ids of spreaders that still have neighbors left to attempt.
    pub fn pending_spreaders(&self) -> Vec<NodeId> {
        let graph = self.inner.read();
        graph
            .nodes
            .values()
            .filter(|n| n.spreading)
            .filter(|n| {
                let degree = graph.edges.get(&n.id).map_or(0, Vec::len);
                graph.cursors.get(&n.id).copied().unwrap_or(0) < degree
            })
            .map(|n| n.id)
            .collect()
    }

    /// Mutates a node under the exclusive scope.
    pub fn update<F, T>(&self, id: NodeId, f: F) -> Option<T>
    where
        F: FnOnce(&mut Node) -> T,
    {
        self.inner.write().nodes.get_mut(&id).map(f)
    }

    /// Activates a node if, and only if, it is still inactive.
    ///
    /// The check and the flip happen in one exclusive scope, so among racing
    /// callers exactly one sees `Activated`. `init` runs only for the winner.
    pub fn try_activate<F>(&self, id: NodeId, init: F) -> Activation
    where
        F: FnOnce(&mut Node),
    {
        let mut graph = self.inner.write();
        match graph.nodes.get_mut(&id) {
            None => Activation::Missing,
            Some(node) if node.active => Activation::AlreadyActive,
            Some(node) => {
                node.active = true;
                init(node);
                Activation::Activated(node.clone())
            }
        }
    }

    /// Claims the next neighbor a spreader should attempt and advances its cursor.
    ///
    /// Returns `None` once every neighbor has been attempted.
    pub fn next_cascade_target(&self, source: NodeId) -> Option<NodeId> {
        let mut graph = self.inner.write();
        let graph = &mut *graph;
        let neighbors = graph.edges.get(&source)?;
        let cursor = graph.cursors.entry(source).or_insert(0);
        let target = neighbors.get(*cursor).copied();
        if target.is_some() {
            *cursor += 1;
        } else {
            debug!("Cascade from node {} exhausted", source);
        }
        target
    }
}
