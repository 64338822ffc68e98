//! Event ingestion: the single consumer applying chain events to the state.

use crate::{metrics, SharedState};
use messenger::RelayerEvent;
use state::{Confirmation, RelayerState};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};

/// Apply one event to the state.
///
/// Returns the reconciliation outcome for `AssertionConfirmed`.
pub fn apply_event(state: &mut RelayerState, event: RelayerEvent) -> Option<Confirmation> {
    match event {
        RelayerEvent::DepositInitiated {
            l1_block_number,
            deposit_hash,
            deposit_tx,
        } => {
            state.add_deposit(l1_block_number, deposit_hash, deposit_tx);
        }
        RelayerEvent::WithdrawalInitiated {
            l2_block_number,
            withdrawal_hash,
            withdrawal_tx,
        } => {
            state.add_withdrawal(l2_block_number, withdrawal_hash, withdrawal_tx);
        }
        RelayerEvent::TxBatchAppended {
            l2_block_number,
            inbox_size,
        } => {
            state.update_l2_block_number_mapping(l2_block_number, inbox_size);
        }
        RelayerEvent::AssertionCreated {
            assertion_id,
            l2_gas_used,
            vm_hash,
        } => {
            state.update_created_assertion(assertion_id, l2_gas_used, vm_hash);
        }
        RelayerEvent::AssertionConfirmed {
            assertion_id,
            inbox_size,
        } => {
            return Some(state.update_confirmed_inbox_size(assertion_id, inbox_size));
        }
        RelayerEvent::L1OracleValuesUpdated {
            block_number,
            state_root,
        } => {
            debug!(block_number, state_root = %state_root, "L1 oracle updated");
            state.updated_l1_oracle_values(block_number);
        }
        RelayerEvent::DepositFinalized {
            deposit_hash,
            success,
        } => {
            info!(deposit_hash = %deposit_hash, success, "Deposit finalized event");
        }
        RelayerEvent::WithdrawalFinalized {
            withdrawal_hash,
            success,
        } => {
            info!(withdrawal_hash = %withdrawal_hash, success, "Withdrawal finalized event");
        }
        RelayerEvent::StreamProgress { stream, next_block } => {
            state.set_stream_cursor(stream.name(), next_block);
        }
    }
    None
}

fn event_label(event: &RelayerEvent) -> &'static str {
    match event {
        RelayerEvent::DepositInitiated { .. } => "DepositInitiated",
        RelayerEvent::WithdrawalInitiated { .. } => "WithdrawalInitiated",
        RelayerEvent::DepositFinalized { .. } => "DepositFinalized",
        RelayerEvent::WithdrawalFinalized { .. } => "WithdrawalFinalized",
        RelayerEvent::TxBatchAppended { .. } => "TxBatchAppended",
        RelayerEvent::AssertionCreated { .. } => "AssertionCreated",
        RelayerEvent::AssertionConfirmed { .. } => "AssertionConfirmed",
        RelayerEvent::L1OracleValuesUpdated { .. } => "L1OracleValuesUpdated",
        RelayerEvent::StreamProgress { .. } => "StreamProgress",
    }
}

/// Forward every per-stream receiver into one bounded channel.
///
/// Each stream keeps its own order; a full merged channel blocks the
/// forwarders, which in turn block the pollers.
pub fn merge_streams(
    receivers: Vec<mpsc::Receiver<RelayerEvent>>,
    capacity: usize,
) -> (mpsc::Receiver<RelayerEvent>, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let forwarders = receivers
        .into_iter()
        .map(|mut receiver| {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(event) = receiver.recv().await {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();

    (rx, forwarders)
}

/// Apply events until every sender is gone.
pub async fn run_event_consumer(state: SharedState, mut events: mpsc::Receiver<RelayerEvent>) {
    info!("Event consumer started");
    while let Some(event) = events.recv().await {
        metrics::record_event(event_label(&event));

        let mut state = state.lock().await;
        apply_event(&mut state, event);
        metrics::record_state(&state);
    }
    info!("Event consumer stopped, all streams closed");
}
