//! Bounded-confidence opinion evolution.
//!
//! Each tick a node looks at every active opinion in the graph, keeps those
//! within its `threshold`, and moves toward their mean by a random
//! confidence weight:
//!
//! ```text
//! v' = round2(w * v + (1 - w) * avg),   w ~ Normal(0.5, 0.22) on [0, 1]
//! ```
//!
//! The compatible set is graph-wide, not limited to topological neighbors.

use crate::model::NodeId;
use crate::process::{ProcessScope, Role};
use crate::random_model::{draw_confidence_weight, round2};
use cascade_env::CascadeContext;
use tracing::debug;

/// One update step.
///
/// An empty compatible neighborhood leaves the opinion where it is.
pub fn bounded_confidence_update(value: f64, threshold: f64, active_opinions: &[f64], weight: f64) -> f64 {
    let (sum, count) = active_opinions
        .iter()
        .filter(|&&opinion| (opinion - value).abs() <= threshold)
        .fold((0.0, 0usize), |(sum, count), &opinion| (sum + opinion, count + 1));

    let avg = if count == 0 { value } else { sum / count as f64 };
    round2(weight * value + (1.0 - weight) * avg)
}

/// Opinion loop of one node; runs until the scope is cancelled.
///
/// The read of the neighborhood and the write of the new value are two
/// separate lock scopes; neither is held across the tick delay.
pub async fn evolve<Ctx: CascadeContext>(scope: ProcessScope<Ctx>, id: NodeId) {
    let mut rng = scope.rng(id, Role::Evolve);
    let interval = scope.params.evolve_interval;

    loop {
        if scope.is_cancelled() {
            break;
        }

        let Some(view) = scope.store.opinion_view(id) else {
            debug!("Node {} not found, stopping evolution", id);
            return;
        };

        let weight = draw_confidence_weight(&mut rng);
        let next = bounded_confidence_update(view.value, view.threshold, &view.active_opinions, weight);

        let first_tick = scope.store.update(id, |node| {
            let first = !node.evolved;
            node.value = next;
            node.evolved = true;
            first
        });

        if first_tick == Some(true) {
            debug!("Node {} started evolving at {}", id, next);
        } else if next == view.value {
            debug!("Node {} settled at {}", id, next);
        }

        if !scope.pause_for(interval).await {
            break;
        }
    }

    debug!("Evolution of node {} stopped", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_store::GraphStore;
    use crate::model::Node;
    use crate::process::DynamicsParams;
    use approx::assert_relative_eq;
    use cascade_env::TokioContext;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tokio_util::task::TaskTracker;

    #[test]
    fn test_empty_neighborhood_keeps_opinion() {
        // Nothing within 0.1 of 0.37
        let next = bounded_confidence_update(0.37, 0.1, &[0.9, 0.05], 0.3);
        assert_eq!(next, 0.37);

        let alone = bounded_confidence_update(0.42, 0.5, &[], 0.8);
        assert_eq!(alone, 0.42);
    }

    #[test]
    fn test_update_moves_toward_compatible_mean() {
        // Compatible: 0.4, 0.5, 0.6 (0.9 is out of range); avg = 0.5
        let next = bounded_confidence_update(0.4, 0.2, &[0.4, 0.5, 0.6, 0.9], 0.5);
        assert_relative_eq!(next, 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // |0.75 - 0.5| == 0.25 counts
        let next = bounded_confidence_update(0.5, 0.25, &[0.5, 0.75], 0.0);
        assert_relative_eq!(next, 0.63, epsilon = 1e-12);
    }

    #[test]
    fn test_weight_extremes() {
        let opinions = [0.2, 0.4];
        assert_relative_eq!(bounded_confidence_update(0.2, 1.0, &opinions, 1.0), 0.2, epsilon = 1e-12);
        assert_relative_eq!(bounded_confidence_update(0.2, 1.0, &opinions, 0.0), 0.3, epsilon = 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evolve_converges_and_stops_on_cancel() {
        let mut nodes: Vec<Node> = (1..=3).map(|id| Node::new(id, 1.0, 0.0)).collect();
        for (node, value) in nodes.iter_mut().zip([0.1, 0.5, 0.9]) {
            node.active = true;
            node.value = value;
        }
        let store = Arc::new(GraphStore::from_nodes(nodes, Vec::new()));
        let scope = ProcessScope::new(
            Arc::new(TokioContext::seeded(3)),
            Arc::clone(&store),
            Arc::new(DynamicsParams::default()),
            CancellationToken::new(),
            TaskTracker::new(),
            0,
        );

        for id in 1..=3 {
            scope.spawn_evolution(id);
        }
        tokio::time::sleep(Duration::from_secs(60)).await;

        let (nodes, _) = store.snapshot();
        for node in &nodes {
            assert!(node.evolved);
            assert!((0.0..=1.0).contains(&node.value));
        }
        // Full confidence everywhere: everyone is pulled into a narrow band
        let spread = nodes.iter().map(|n| n.value).fold(f64::MIN, f64::max)
            - nodes.iter().map(|n| n.value).fold(f64::MAX, f64::min);
        assert!(spread < 0.2, "spread = {}", spread);

        scope.cancel.cancel();
        scope.tracker.close();
        scope.tracker.wait().await;

        let frozen = store.snapshot().0;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.snapshot().0, frozen);
    }
}
