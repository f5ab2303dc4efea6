//! Periodic population summary in the log.

use cascade_core::GraphStore;
use cascade_env::CascadeContext;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Logs node-state counts every `interval` until cancelled.
pub async fn run_stats_reporter<Ctx: CascadeContext>(
    ctx: Arc<Ctx>,
    store: Arc<GraphStore>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            break;
        }

        info!("[*] Network state at {:.1}s {}", ctx.now().as_secs_f64(), store.stats());

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ctx.sleep(interval) => {}
        }
    }
    debug!("Stats reporter stopped");
}
