//! Reconciliation loops driving the relayer state.
//!
//! - [`ingest`]: applies chain events to the state, one event at a time
//! - [`deposits`] / [`withdrawals`]: finalize messages once their gate opens
//! - [`oracle`]: keeps the L2 oracle close to the L1 head
//! - [`checkpoint`]: persists the state periodically
//!
//! All tasks share one [`SharedState`]. The lock is never held across an RPC
//! call.

pub mod checkpoint;
pub mod deposits;
pub mod ingest;
pub mod metrics;
pub mod oracle;
pub mod retry;
pub mod withdrawals;

use state::RelayerState;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

pub use checkpoint::{run_checkpointer, save_snapshot};
pub use deposits::{relay_next_deposit, run_relay_deposits};
pub use ingest::{apply_event, merge_streams, run_event_consumer};
pub use oracle::{run_oracle_updates, update_oracle_once};
pub use retry::RetryPolicy;
pub use withdrawals::{relay_next_withdrawal, run_relay_withdrawals};

pub type SharedState = Arc<Mutex<RelayerState>>;

pub fn shared(state: RelayerState) -> SharedState {
    Arc::new(Mutex::new(state))
}

/// Outcome of one relay attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing was ready.
    Idle,
    /// The message was finalized.
    Relayed,
    /// Finalization failed; the message is back in its queue.
    Requeued,
    /// Finalization failed for the last allowed time.
    DeadLettered,
}

/// Settings shared by the deposit and withdrawal loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Sleep between readiness checks when nothing is ready
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}
