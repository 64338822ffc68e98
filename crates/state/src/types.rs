use crate::queue::Prioritized;
use alloy_primitives::{B256, U256};
use binding::CrossDomainMessage;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Hash of a deposit or withdrawal as emitted by the originating portal.
pub type MessageHash = B256;

/// Direction of a relayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Deposit,
    Withdrawal,
}

/// Retry bookkeeping for a pending message.
///
/// Not part of the message identity: two items with different retry state but
/// the same block, hash and message describe the same work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// Failed finalization attempts so far
    pub attempts: u32,
    /// Earliest instant the item may be retried (process-local, not persisted)
    #[serde(skip)]
    pub not_before: Option<Instant>,
}

impl RetryState {
    /// Record a failed attempt and hold the item back for `delay`.
    pub fn record_failure(&mut self, now: Instant, delay: Duration) {
        self.attempts = self.attempts.saturating_add(1);
        self.not_before = Some(now + delay);
    }

    /// Whether the backoff window has elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        self.not_before.is_none_or(|at| at <= now)
    }
}

/// A deposit observed on L1 that has not been finalized on L2 yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeposit {
    /// L1 block containing the `DepositInitiated` event
    pub l1_block_number: u64,
    pub deposit_hash: MessageHash,
    pub deposit_tx: CrossDomainMessage,
    /// Insertion sequence, assigned by the state on first insert
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub retry: RetryState,
}

impl PendingDeposit {
    pub fn new(l1_block_number: u64, deposit_hash: MessageHash, deposit_tx: CrossDomainMessage) -> Self {
        Self {
            l1_block_number,
            deposit_hash,
            deposit_tx,
            seq: 0,
            retry: RetryState::default(),
        }
    }
}

impl Prioritized for PendingDeposit {
    fn priority(&self) -> (u64, u64) {
        (self.l1_block_number, self.seq)
    }
}

/// A withdrawal observed on L2 that has not been finalized on L1 yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    /// L2 block containing the `WithdrawalInitiated` event
    pub l2_block_number: u64,
    pub withdrawal_hash: MessageHash,
    pub withdrawal_tx: CrossDomainMessage,
    /// Insertion sequence, assigned by the state on first insert
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub retry: RetryState,
}

impl PendingWithdrawal {
    pub fn new(
        l2_block_number: u64,
        withdrawal_hash: MessageHash,
        withdrawal_tx: CrossDomainMessage,
    ) -> Self {
        Self {
            l2_block_number,
            withdrawal_hash,
            withdrawal_tx,
            seq: 0,
            retry: RetryState::default(),
        }
    }
}

impl Prioritized for PendingWithdrawal {
    fn priority(&self) -> (u64, u64) {
        (self.l2_block_number, self.seq)
    }
}

/// Checkpoint: all L2 blocks up to `l2_block_number` are covered by batches
/// totalling `inbox_size` inbox messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2BlockNumberMappingEntry {
    pub l2_block_number: u64,
    pub inbox_size: u64,
    #[serde(default)]
    pub seq: u64,
}

impl Prioritized for L2BlockNumberMappingEntry {
    fn priority(&self) -> (u64, u64) {
        (self.inbox_size, self.seq)
    }
}

/// Data recorded when an assertion is created and needed once it is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionRecord {
    pub l2_gas_used: U256,
    pub vm_hash: B256,
}

/// The most recently confirmed assertion, as passed to withdrawal finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedAssertion {
    pub assertion_id: U256,
    pub l2_gas_used: U256,
    pub vm_hash: B256,
}

/// A message that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub kind: MessageKind,
    /// Origin block of the message (L1 for deposits, L2 for withdrawals)
    pub origin_block_number: u64,
    pub hash: MessageHash,
    pub message: CrossDomainMessage,
    pub attempts: u32,
    /// Error of the last attempt
    pub last_error: String,
}
