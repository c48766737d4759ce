//! Background task that closes stale sessions.
//!
//! Every tick, each live actor is asked to check itself against the
//! four-hours-after-kickoff rule. The check runs inside the actor, so it
//! serializes with joins and never closes a session mid-mutation.

use crate::state::{Registry, SessionEvent};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// Spawn the sweep loop.
pub fn spawn_sweep_task(registry: Arc<Registry>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let closed = run_sweep(&registry).await;
            if closed > 0 {
                info!(closed, "Sweep pass closed stale sessions");
            }
        }
    });
}

/// One sweep pass over every live actor. Returns how many closed.
pub async fn run_sweep(registry: &Registry) -> usize {
    let now = chrono::Utc::now();
    let mut closed = 0;
    for id in registry.ids() {
        let Some(tx) = registry.sender(&id) else {
            continue;
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        if tx.send(SessionEvent::SweepCheck { now, reply_tx }).await.is_ok()
            && reply_rx.await.unwrap_or(false)
        {
            closed += 1;
        }
    }
    closed
}
