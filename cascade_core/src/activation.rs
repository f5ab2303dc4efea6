//! Independent-cascade activation.
//!
//! ```text
//!   Inactive ──(seed | neighbor attempt succeeds)──► Active ──(willing)──► Spreading
//! ```
//!
//! Every spreading node walks its adjacency list exactly once, one attempt
//! per neighbor. A successful attempt activates the neighbor, starts its
//! opinion loop and, if the neighbor is willing, a new continuation from it.

use crate::graph_store::Activation;
use crate::model::NodeId;
use crate::process::{ProcessScope, Role};
use crate::random_model::{derive_opinion, transmits, OpinionSource};
use cascade_env::CascadeContext;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Tasks relaunched on a resumed graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Relaunch {
    pub evolving: usize,
    pub spreading: usize,
}

/// Forces the starter nodes active and launches the cascade from them.
///
/// Seeds become leaders with a polarized opinion and always spread. Unknown
/// or duplicate ids are skipped. Returns how many seeds were activated.
pub fn seed_starters<Ctx: CascadeContext>(scope: &ProcessScope<Ctx>, starters: &[NodeId]) -> usize {
    let mut seeded = 0;

    for &id in starters {
        let mut rng = scope.rng(id, Role::Seed);
        let opinion = derive_opinion(OpinionSource::Seed, &mut rng);

        match scope.store.try_activate(id, |node| {
            node.value = opinion;
            node.is_leader = true;
            node.spreading = true;
        }) {
            Activation::Activated(_) => {
                debug!("Seed {} activated with opinion {}", id, opinion);
                scope.spawn_cascade(id);
                scope.spawn_evolution(id);
                seeded += 1;
            }
            Activation::AlreadyActive => debug!("Seed {} already active", id),
            Activation::Missing => warn!("Seed {} is not in the graph, skipping", id),
        }
    }

    seeded
}

/// Restarts the processes of a paused graph without touching its state.
///
/// Every active node gets its opinion loop back; every spreader with
/// untried neighbors continues from where its cursor stopped.
pub fn relaunch<Ctx: CascadeContext>(scope: &ProcessScope<Ctx>) -> Relaunch {
    let active = scope.store.active_ids();
    let spreaders = scope.store.pending_spreaders();

    for &id in &active {
        scope.spawn_evolution(id);
    }
    for &id in &spreaders {
        scope.spawn_cascade(id);
    }

    Relaunch {
        evolving: active.len(),
        spreading: spreaders.len(),
    }
}

/// One cascade continuation: attempts every remaining neighbor of `source`.
///
/// Boxed with an explicit `Send` bound because continuations spawn further
/// continuations.
pub fn cascade_from<Ctx: CascadeContext>(
    scope: ProcessScope<Ctx>,
    source: NodeId,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        let mut rng = scope.rng(source, Role::Cascade);

        loop {
            if scope.is_cancelled() {
                debug!("Cascade from {} cancelled", source);
                return;
            }

            let Some(target) = scope.store.next_cascade_target(source) else {
                return;
            };

            match scope.store.lookup(target) {
                None => {
                    debug!("Neighbor {} of {} not found, skipping", target, source);
                    continue;
                }
                Some(node) if node.active => continue,
                Some(_) => {}
            }

            if !transmits(&mut rng, scope.params.p_active) {
                continue;
            }

            let Some(activator_opinion) = scope.store.opinion(source) else {
                warn!("Spreader {} vanished from the graph", source);
                return;
            };
            let opinion = derive_opinion(OpinionSource::Activator(activator_opinion), &mut rng);

            let activated = match scope.store.try_activate(target, |node| node.value = opinion) {
                Activation::Activated(node) => node,
                // Lost the race to another spreader
                Activation::AlreadyActive | Activation::Missing => continue,
            };

            let willing = rng.gen::<f64>() < activated.spread_willingness;
            debug!(
                "Node {} activated by {} with opinion {} (spreading={})",
                target, source, opinion, willing
            );

            if willing {
                scope.store.update(target, |node| node.spreading = true);
                scope.spawn_cascade(target);
            }
            scope.spawn_evolution(target);

            if !scope.pause_for(scope.params.propagation_delay).await {
                return;
            }
        }
    })
}
