//! Metric names and recorders used by the loops.
//!
//! Recording goes through the `metrics` facade; the service binary describes
//! these names and installs the exporter.

use metrics::{counter, gauge};
use state::{MessageKind, RelayerState};

pub const FINALIZED_TOTAL: &str = "relayer_finalized_total";
pub const FINALIZE_FAILURES_TOTAL: &str = "relayer_finalize_failures_total";
pub const DEAD_LETTERS_TOTAL: &str = "relayer_dead_letters_total";
pub const ORACLE_UPDATES_TOTAL: &str = "relayer_oracle_updates_total";
pub const EVENTS_TOTAL: &str = "relayer_events_total";
pub const PENDING_MESSAGES: &str = "relayer_pending_messages";
pub const PENDING_CHECKPOINTS: &str = "relayer_pending_checkpoints";
pub const L1_ORACLE_BLOCK: &str = "relayer_l1_oracle_block_number";
pub const CONFIRMED_L2_BLOCK: &str = "relayer_confirmed_l2_block_number";

const fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Deposit => "deposit",
        MessageKind::Withdrawal => "withdrawal",
    }
}

pub fn record_finalized(kind: MessageKind) {
    counter!(FINALIZED_TOTAL, "kind" => kind_label(kind)).increment(1);
}

pub fn record_finalize_failure(kind: MessageKind) {
    counter!(FINALIZE_FAILURES_TOTAL, "kind" => kind_label(kind)).increment(1);
}

pub fn record_dead_letter(kind: MessageKind) {
    counter!(DEAD_LETTERS_TOTAL, "kind" => kind_label(kind)).increment(1);
}

pub fn record_oracle_update() {
    counter!(ORACLE_UPDATES_TOTAL).increment(1);
}

pub fn record_event(stream: &'static str) {
    counter!(EVENTS_TOTAL, "stream" => stream).increment(1);
}

/// Publish queue depths and cursors.
pub fn record_state(state: &RelayerState) {
    gauge!(PENDING_MESSAGES, "kind" => "deposit").set(state.pending_deposits() as f64);
    gauge!(PENDING_MESSAGES, "kind" => "withdrawal").set(state.pending_withdrawals() as f64);
    gauge!(PENDING_CHECKPOINTS).set(state.pending_checkpoints() as f64);

    if let Some(block) = state.last_updated_l1_oracle_block_number() {
        gauge!(L1_ORACLE_BLOCK).set(block as f64);
    }
    if let Some(block) = state.last_confirmed_l2_block_number() {
        gauge!(CONFIRMED_L2_BLOCK).set(block as f64);
    }
}
