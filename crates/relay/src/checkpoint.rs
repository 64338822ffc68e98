//! Periodic state snapshots.

use crate::{metrics, SharedState};
use std::{path::PathBuf, time::Duration};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Write a snapshot of the current state to `path`.
///
/// The lock is only held while the snapshot is taken, not while it is written.
pub async fn save_snapshot(state: &SharedState, path: PathBuf) -> eyre::Result<()> {
    let snapshot = {
        let state = state.lock().await;
        metrics::record_state(&state);
        state.snapshot()
    };

    let deposits = snapshot.deposits.len();
    let withdrawals = snapshot.withdrawals.len();
    let target = path.clone();
    tokio::task::spawn_blocking(move || snapshot.save(target)).await??;

    debug!(path = %path.display(), deposits, withdrawals, "State snapshot written");
    Ok(())
}

/// Snapshot the state every `every`.
pub async fn run_checkpointer(state: SharedState, path: PathBuf, every: Duration) {
    info!(path = %path.display(), every_secs = every.as_secs(), "Checkpointer started");
    let mut ticker = interval(every);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(e) = save_snapshot(&state, path.clone()).await {
            warn!(path = %path.display(), error = %e, "Failed to write state snapshot");
        }
    }
}
