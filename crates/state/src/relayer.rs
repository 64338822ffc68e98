//! The relayer state and its reconciliation rules.
//!
//! Readiness gates:
//! - a deposit is ready once `l1_block_number <= last_updated_l1_oracle_block_number`
//! - a withdrawal is ready once `l2_block_number <= last_confirmed_l2_block_number`
//!
//! An unset cursor means nothing gated by it is ready.

use crate::{
    queue::PriorityQueue,
    snapshot::{DeferredConfirmation, PendingAssertion, StateSnapshot},
    types::{
        AssertionRecord, ConfirmedAssertion, DeadLetter, L2BlockNumberMappingEntry, MessageHash,
        MessageKind, PendingDeposit, PendingWithdrawal,
    },
};
use alloy_primitives::{B256, U256};
use binding::CrossDomainMessage;
use std::{
    collections::{BTreeMap, HashMap},
    time::Instant,
};
use tracing::{debug, info, warn};

/// Outcome of [`RelayerState::update_confirmed_inbox_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The confirmed inbox size matched a checkpoint exactly.
    Confirmed {
        l2_block_number: u64,
        /// Checkpoints consumed, including the matching one
        checkpoints: usize,
    },
    /// No creation record for this assertion.
    UnknownAssertion,
    /// Every recorded checkpoint is below the confirmed inbox size.
    NonExistentBatch,
    /// The next checkpoint overshoots the confirmed inbox size.
    MidBatchAssertion { next_inbox_size: u64 },
}

/// A deposit taken off the queue together with the L1 block to prove it at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyDeposit {
    pub deposit: PendingDeposit,
    pub proof_block_number: u64,
}

/// A withdrawal taken off the queue together with what its finalization needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyWithdrawal {
    pub withdrawal: PendingWithdrawal,
    pub assertion: ConfirmedAssertion,
    pub proof_block_number: u64,
}

#[derive(Debug, Default)]
pub struct RelayerState {
    next_seq: u64,

    deposits: PriorityQueue<PendingDeposit>,
    withdrawals: PriorityQueue<PendingWithdrawal>,
    in_flight_deposits: BTreeMap<u64, PendingDeposit>,
    in_flight_withdrawals: BTreeMap<u64, PendingWithdrawal>,
    dead_letters: Vec<DeadLetter>,

    l2_block_number_mapping: PriorityQueue<L2BlockNumberMappingEntry>,
    assertions: HashMap<U256, AssertionRecord>,
    deferred_confirmation: Option<DeferredConfirmation>,

    last_sent_l1_oracle_block_number: Option<u64>,
    last_updated_l1_oracle_block_number: Option<u64>,

    last_confirmed_assertion: Option<ConfirmedAssertion>,
    last_confirmed_l2_block_number: Option<u64>,
    last_confirmed_inbox_size: Option<u64>,

    stream_cursors: BTreeMap<String, u64>,
}

impl RelayerState {
    pub fn new() -> Self {
        Self::default()
    }

    const fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Deposits
    // ─────────────────────────────────────────────────────────────────────────────

    /// Queue a deposit. Duplicate hashes are kept as distinct entries.
    pub fn add_deposit(
        &mut self,
        l1_block_number: u64,
        deposit_hash: MessageHash,
        deposit_tx: CrossDomainMessage,
    ) {
        let mut deposit = PendingDeposit::new(l1_block_number, deposit_hash, deposit_tx);
        deposit.seq = self.bump_seq();
        debug!(l1_block_number, deposit_hash = %deposit_hash, "Deposit queued");
        self.deposits.push(deposit);
    }

    /// Origin block of the next deposit, if any.
    pub fn next_deposit_block_number(&self) -> Option<u64> {
        self.deposits.peek().map(|d| d.l1_block_number)
    }

    /// Remove the next deposit regardless of readiness.
    pub fn next_deposit(&mut self) -> Option<PendingDeposit> {
        self.deposits.pop()
    }

    /// Put a deposit back with its original priority.
    pub fn readd_deposit(&mut self, deposit: PendingDeposit) {
        self.in_flight_deposits.remove(&deposit.seq);
        self.deposits.push(deposit);
    }

    /// Whether a deposit from `l1_block_number` can be proven against the oracle.
    pub fn is_deposit_ready(&self, l1_block_number: u64) -> bool {
        self.last_updated_l1_oracle_block_number
            .is_some_and(|updated| l1_block_number <= updated)
    }

    /// Dequeue the first ready deposit that is not backing off.
    ///
    /// Deposits in backoff are passed over but keep their place. The item
    /// stays tracked as in flight until [`Self::complete_deposit`],
    /// [`Self::readd_deposit`] or [`Self::dead_letter_deposit`].
    pub fn take_ready_deposit(&mut self, now: Instant) -> Option<ReadyDeposit> {
        let proof_block_number = self.last_updated_l1_oracle_block_number?;
        let deposit = self.deposits.pop_first(
            |d| d.l1_block_number <= proof_block_number,
            |d| d.retry.is_due(now),
        )?;
        self.in_flight_deposits.insert(deposit.seq, deposit.clone());
        Some(ReadyDeposit {
            deposit,
            proof_block_number,
        })
    }

    /// Forget a deposit that was finalized.
    pub fn complete_deposit(&mut self, deposit: &PendingDeposit) {
        self.in_flight_deposits.remove(&deposit.seq);
    }

    /// Park a deposit that exhausted its retries.
    pub fn dead_letter_deposit(&mut self, deposit: PendingDeposit, last_error: String) {
        self.in_flight_deposits.remove(&deposit.seq);
        self.dead_letters.push(DeadLetter {
            kind: MessageKind::Deposit,
            origin_block_number: deposit.l1_block_number,
            hash: deposit.deposit_hash,
            message: deposit.deposit_tx,
            attempts: deposit.retry.attempts,
            last_error,
        });
    }

    pub fn pending_deposits(&self) -> usize {
        self.deposits.len() + self.in_flight_deposits.len()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Withdrawals
    // ─────────────────────────────────────────────────────────────────────────────

    /// Queue a withdrawal. Duplicate hashes are kept as distinct entries.
    pub fn add_withdrawal(
        &mut self,
        l2_block_number: u64,
        withdrawal_hash: MessageHash,
        withdrawal_tx: CrossDomainMessage,
    ) {
        let mut withdrawal = PendingWithdrawal::new(l2_block_number, withdrawal_hash, withdrawal_tx);
        withdrawal.seq = self.bump_seq();
        debug!(l2_block_number, withdrawal_hash = %withdrawal_hash, "Withdrawal queued");
        self.withdrawals.push(withdrawal);
    }

    /// Origin block of the next withdrawal, if any.
    pub fn next_withdrawal_block_number(&self) -> Option<u64> {
        self.withdrawals.peek().map(|w| w.l2_block_number)
    }

    /// Remove the next withdrawal regardless of readiness.
    pub fn next_withdrawal(&mut self) -> Option<PendingWithdrawal> {
        self.withdrawals.pop()
    }

    /// Put a withdrawal back with its original priority.
    pub fn readd_withdrawal(&mut self, withdrawal: PendingWithdrawal) {
        self.in_flight_withdrawals.remove(&withdrawal.seq);
        self.withdrawals.push(withdrawal);
    }

    /// Whether a withdrawal from `l2_block_number` is covered by a confirmed assertion.
    pub fn is_withdrawal_ready(&self, l2_block_number: u64) -> bool {
        self.last_confirmed_l2_block_number
            .is_some_and(|confirmed| l2_block_number <= confirmed)
    }

    /// Dequeue the first ready withdrawal that is not backing off.
    pub fn take_ready_withdrawal(&mut self, now: Instant) -> Option<ReadyWithdrawal> {
        let proof_block_number = self.last_confirmed_l2_block_number?;
        let assertion = self.last_confirmed_assertion?;
        let withdrawal = self.withdrawals.pop_first(
            |w| w.l2_block_number <= proof_block_number,
            |w| w.retry.is_due(now),
        )?;
        self.in_flight_withdrawals
            .insert(withdrawal.seq, withdrawal.clone());
        Some(ReadyWithdrawal {
            withdrawal,
            assertion,
            proof_block_number,
        })
    }

    /// Forget a withdrawal that was finalized.
    pub fn complete_withdrawal(&mut self, withdrawal: &PendingWithdrawal) {
        self.in_flight_withdrawals.remove(&withdrawal.seq);
    }

    /// Park a withdrawal that exhausted its retries.
    pub fn dead_letter_withdrawal(&mut self, withdrawal: PendingWithdrawal, last_error: String) {
        self.in_flight_withdrawals.remove(&withdrawal.seq);
        self.dead_letters.push(DeadLetter {
            kind: MessageKind::Withdrawal,
            origin_block_number: withdrawal.l2_block_number,
            hash: withdrawal.withdrawal_hash,
            message: withdrawal.withdrawal_tx,
            attempts: withdrawal.retry.attempts,
            last_error,
        });
    }

    pub fn pending_withdrawals(&self) -> usize {
        self.withdrawals.len() + self.in_flight_withdrawals.len()
    }

    pub fn dead_letters(&self) -> &[DeadLetter] {
        &self.dead_letters
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Batches and assertions
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record that L2 blocks up to `l2_block_number` are covered by `inbox_size`.
    ///
    /// Retries a deferred confirmation this checkpoint may complete.
    pub fn update_l2_block_number_mapping(&mut self, l2_block_number: u64, inbox_size: u64) {
        let seq = self.bump_seq();
        self.l2_block_number_mapping.push(L2BlockNumberMappingEntry {
            l2_block_number,
            inbox_size,
            seq,
        });
        debug!(l2_block_number, inbox_size, "Recorded L2 block number checkpoint");

        let Some(deferred) = self.deferred_confirmation else {
            return;
        };
        if inbox_size < deferred.inbox_size {
            return;
        }

        debug!(
            assertion_id = %deferred.assertion_id,
            inbox_size = deferred.inbox_size,
            "Retrying deferred assertion confirmation"
        );
        let outcome = self.reconcile(deferred.assertion_id, deferred.inbox_size);
        if !matches!(outcome, Confirmation::Confirmed { .. }) {
            // Batches arrive in inbox order, so a checkpoint at or past the
            // confirmed size that still does not match can never match.
            warn!(
                assertion_id = %deferred.assertion_id,
                inbox_size = deferred.inbox_size,
                "Dropping deferred assertion confirmation"
            );
            self.deferred_confirmation = None;
            self.assertions.remove(&deferred.assertion_id);
        }
    }

    /// Record a created, not yet confirmed, assertion.
    pub fn update_created_assertion(&mut self, assertion_id: U256, l2_gas_used: U256, vm_hash: B256) {
        debug!(assertion_id = %assertion_id, "Recorded created assertion");
        self.assertions.insert(
            assertion_id,
            AssertionRecord {
                l2_gas_used,
                vm_hash,
            },
        );
    }

    /// Advance the confirmation cursors for a confirmed assertion.
    ///
    /// Checkpoints below `inbox_size` are superseded; the checkpoint at exactly
    /// `inbox_size` sets `last_confirmed_l2_block_number`. Nothing is mutated
    /// unless that exact checkpoint exists: the confirmation is instead kept
    /// and retried when further checkpoints arrive, until a later confirmation
    /// replaces it.
    pub fn update_confirmed_inbox_size(&mut self, assertion_id: U256, inbox_size: u64) -> Confirmation {
        if !self.assertions.contains_key(&assertion_id) {
            warn!(
                assertion_id = %assertion_id,
                inbox_size,
                "Inconsistency: confirmed assertion was never created"
            );
            return Confirmation::UnknownAssertion;
        }

        if let Some(previous) = self.deferred_confirmation.take() {
            if previous.assertion_id != assertion_id {
                debug!(
                    superseded = %previous.assertion_id,
                    assertion_id = %assertion_id,
                    "Deferred confirmation superseded"
                );
                self.assertions.remove(&previous.assertion_id);
            }
        }

        self.reconcile(assertion_id, inbox_size)
    }

    fn reconcile(&mut self, assertion_id: U256, inbox_size: u64) -> Confirmation {
        let Some(record) = self.assertions.get(&assertion_id).copied() else {
            return Confirmation::UnknownAssertion;
        };

        let mut superseded = Vec::new();
        while self
            .l2_block_number_mapping
            .peek()
            .is_some_and(|entry| entry.inbox_size < inbox_size)
        {
            superseded.extend(self.l2_block_number_mapping.pop());
        }

        if self
            .l2_block_number_mapping
            .peek()
            .is_some_and(|entry| entry.inbox_size == inbox_size)
        {
            if let Some(entry) = self.l2_block_number_mapping.pop() {
                let checkpoints = superseded.len() + 1;
                return self.commit_confirmation(assertion_id, record, entry, checkpoints);
            }
        }

        let outcome = match self.l2_block_number_mapping.peek() {
            None => {
                warn!(
                    assertion_id = %assertion_id,
                    inbox_size,
                    "Inconsistency: confirmed a non-existent batch"
                );
                Confirmation::NonExistentBatch
            }
            Some(entry) => {
                warn!(
                    assertion_id = %assertion_id,
                    inbox_size,
                    next_inbox_size = entry.inbox_size,
                    "Inconsistency: assertion created mid-batch"
                );
                Confirmation::MidBatchAssertion {
                    next_inbox_size: entry.inbox_size,
                }
            }
        };

        for entry in superseded {
            self.l2_block_number_mapping.push(entry);
        }
        self.deferred_confirmation = Some(DeferredConfirmation {
            assertion_id,
            inbox_size,
        });
        outcome
    }

    fn commit_confirmation(
        &mut self,
        assertion_id: U256,
        record: AssertionRecord,
        entry: L2BlockNumberMappingEntry,
        checkpoints: usize,
    ) -> Confirmation {
        // Assertions confirm in order; older unconfirmed records are stale
        self.assertions.retain(|id, _| *id > assertion_id);
        self.deferred_confirmation = None;
        self.last_confirmed_assertion = Some(ConfirmedAssertion {
            assertion_id,
            l2_gas_used: record.l2_gas_used,
            vm_hash: record.vm_hash,
        });
        self.last_confirmed_inbox_size = Some(entry.inbox_size);
        self.last_confirmed_l2_block_number = Some(entry.l2_block_number);

        info!(
            assertion_id = %assertion_id,
            inbox_size = entry.inbox_size,
            l2_block_number = entry.l2_block_number,
            "Assertion confirmed"
        );

        Confirmation::Confirmed {
            l2_block_number: entry.l2_block_number,
            checkpoints,
        }
    }

    pub fn last_confirmed_assertion_id(&self) -> Option<U256> {
        self.last_confirmed_assertion.map(|a| a.assertion_id)
    }

    pub const fn last_confirmed_assertion(&self) -> Option<ConfirmedAssertion> {
        self.last_confirmed_assertion
    }

    pub const fn last_confirmed_l2_block_number(&self) -> Option<u64> {
        self.last_confirmed_l2_block_number
    }

    pub const fn last_confirmed_inbox_size(&self) -> Option<u64> {
        self.last_confirmed_inbox_size
    }

    pub fn pending_checkpoints(&self) -> usize {
        self.l2_block_number_mapping.len()
    }

    /// Created assertions not confirmed yet.
    pub fn pending_assertions(&self) -> usize {
        self.assertions.len()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // L1 oracle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Record that an oracle update for `block_number` was submitted.
    pub const fn sent_l1_oracle_values(&mut self, block_number: u64) {
        self.last_sent_l1_oracle_block_number = Some(block_number);
    }

    /// Record that the oracle stored `block_number`.
    pub const fn updated_l1_oracle_values(&mut self, block_number: u64) {
        self.last_updated_l1_oracle_block_number = Some(block_number);
    }

    /// Whether L1 block `block_number` is far enough past the last submitted
    /// oracle update to warrant a new one.
    pub fn should_send_l1_oracle_values(&self, block_number: u64, interval: u64) -> bool {
        self.last_sent_l1_oracle_block_number
            .is_none_or(|sent| block_number >= sent.saturating_add(interval))
    }

    pub const fn last_sent_l1_oracle_block_number(&self) -> Option<u64> {
        self.last_sent_l1_oracle_block_number
    }

    pub const fn last_updated_l1_oracle_block_number(&self) -> Option<u64> {
        self.last_updated_l1_oracle_block_number
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Event stream cursors and snapshots
    // ─────────────────────────────────────────────────────────────────────────────

    /// Next block to scan for `stream`, if ingestion ever progressed.
    pub fn stream_cursor(&self, stream: &str) -> Option<u64> {
        self.stream_cursors.get(stream).copied()
    }

    pub fn set_stream_cursor(&mut self, stream: &str, next_block: u64) {
        self.stream_cursors.insert(stream.to_string(), next_block);
    }

    /// Capture the state. In-flight items are stored back as pending.
    pub fn snapshot(&self) -> StateSnapshot {
        let mut deposits = self.deposits.to_sorted_vec();
        deposits.extend(self.in_flight_deposits.values().cloned());
        let mut withdrawals = self.withdrawals.to_sorted_vec();
        withdrawals.extend(self.in_flight_withdrawals.values().cloned());

        let mut assertions: Vec<PendingAssertion> = self
            .assertions
            .iter()
            .map(|(id, record)| PendingAssertion {
                assertion_id: *id,
                l2_gas_used: record.l2_gas_used,
                vm_hash: record.vm_hash,
            })
            .collect();
        assertions.sort_by_key(|a| a.assertion_id);

        StateSnapshot {
            next_seq: self.next_seq,
            deposits,
            withdrawals,
            dead_letters: self.dead_letters.clone(),
            l2_block_number_mapping: self.l2_block_number_mapping.to_sorted_vec(),
            assertions,
            deferred_confirmation: self.deferred_confirmation,
            last_sent_l1_oracle_block_number: self.last_sent_l1_oracle_block_number,
            last_updated_l1_oracle_block_number: self.last_updated_l1_oracle_block_number,
            last_confirmed_assertion: self.last_confirmed_assertion,
            last_confirmed_l2_block_number: self.last_confirmed_l2_block_number,
            last_confirmed_inbox_size: self.last_confirmed_inbox_size,
            stream_cursors: self.stream_cursors.clone(),
        }
    }

    /// Rebuild the state from a snapshot.
    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        // Older snapshots may lack sequence numbers; keep new ones above all restored ones
        let max_seq = snapshot
            .deposits
            .iter()
            .map(|d| d.seq)
            .chain(snapshot.withdrawals.iter().map(|w| w.seq))
            .chain(snapshot.l2_block_number_mapping.iter().map(|e| e.seq))
            .max()
            .map_or(0, |seq| seq + 1);

        Self {
            next_seq: snapshot.next_seq.max(max_seq),
            deposits: snapshot.deposits.into_iter().collect(),
            withdrawals: snapshot.withdrawals.into_iter().collect(),
            in_flight_deposits: BTreeMap::new(),
            in_flight_withdrawals: BTreeMap::new(),
            dead_letters: snapshot.dead_letters,
            l2_block_number_mapping: snapshot.l2_block_number_mapping.into_iter().collect(),
            assertions: snapshot
                .assertions
                .into_iter()
                .map(|a| {
                    (
                        a.assertion_id,
                        AssertionRecord {
                            l2_gas_used: a.l2_gas_used,
                            vm_hash: a.vm_hash,
                        },
                    )
                })
                .collect(),
            deferred_confirmation: snapshot.deferred_confirmation,
            last_sent_l1_oracle_block_number: snapshot.last_sent_l1_oracle_block_number,
            last_updated_l1_oracle_block_number: snapshot.last_updated_l1_oracle_block_number,
            last_confirmed_assertion: snapshot.last_confirmed_assertion,
            last_confirmed_l2_block_number: snapshot.last_confirmed_l2_block_number,
            last_confirmed_inbox_size: snapshot.last_confirmed_inbox_size,
            stream_cursors: snapshot.stream_cursors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, Address, Bytes};
    use std::time::Duration;

    fn message(nonce: u64) -> CrossDomainMessage {
        CrossDomainMessage {
            nonce: U256::from(nonce),
            sender: Address::from([0x01; 20]),
            target: Address::from([0x02; 20]),
            value: U256::from(1_000_000),
            gasLimit: U256::from(100_000),
            data: Bytes::new(),
        }
    }

    fn hash(byte: u8) -> B256 {
        B256::from([byte; 32])
    }

    fn state_with_assertion(id: u64) -> RelayerState {
        let mut state = RelayerState::new();
        state.update_created_assertion(
            U256::from(id),
            U256::from(21_000),
            b256!("abababababababababababababababababababababababababababababababab"),
        );
        state
    }

    #[test]
    fn test_next_deposit_returns_smallest_block() {
        let mut state = RelayerState::new();
        for (block, byte) in [(30, 3), (10, 1), (20, 2), (15, 4)] {
            state.add_deposit(block, hash(byte), message(block));
        }

        let order: Vec<u64> = std::iter::from_fn(|| state.next_deposit())
            .map(|d| d.l1_block_number)
            .collect();
        assert_eq!(order, vec![10, 15, 20, 30]);
        assert_eq!(state.next_deposit_block_number(), None);
    }

    #[test]
    fn test_duplicate_hashes_are_kept() {
        let mut state = RelayerState::new();
        state.add_withdrawal(5, hash(1), message(1));
        state.add_withdrawal(5, hash(1), message(1));

        assert_eq!(state.pending_withdrawals(), 2);
        assert!(state.next_withdrawal().is_some());
        assert!(state.next_withdrawal().is_some());
        assert!(state.next_withdrawal().is_none());
    }

    #[test]
    fn test_readd_keeps_original_priority() {
        let mut state = RelayerState::new();
        state.add_deposit(10, hash(1), message(1));
        state.add_deposit(10, hash(2), message(2));

        let first = state.next_deposit().unwrap();
        assert_eq!(first.deposit_hash, hash(1));

        // Newer arrivals at the same and a later block
        state.add_deposit(10, hash(3), message(3));
        state.add_deposit(11, hash(4), message(4));
        state.readd_deposit(first);

        let order: Vec<B256> = std::iter::from_fn(|| state.next_deposit())
            .map(|d| d.deposit_hash)
            .collect();
        assert_eq!(order, vec![hash(1), hash(2), hash(3), hash(4)]);
    }

    #[test]
    fn test_deposit_readiness_follows_oracle_cursor() {
        let mut state = RelayerState::new();
        state.add_deposit(100, hash(1), message(1));
        let now = Instant::now();

        assert!(state.take_ready_deposit(now).is_none());

        state.updated_l1_oracle_values(99);
        assert!(!state.is_deposit_ready(100));
        assert!(state.take_ready_deposit(now).is_none());
        assert_eq!(state.next_deposit_block_number(), Some(100));

        state.updated_l1_oracle_values(100);
        assert!(state.is_deposit_ready(100));
        let ready = state.take_ready_deposit(now).unwrap();
        assert_eq!(ready.deposit.l1_block_number, 100);
        assert_eq!(ready.proof_block_number, 100);
        assert_eq!(state.pending_deposits(), 1, "in flight until completed");

        state.complete_deposit(&ready.deposit);
        assert_eq!(state.pending_deposits(), 0);
    }

    #[test]
    fn test_backoff_holds_item() {
        let mut state = RelayerState::new();
        state.updated_l1_oracle_values(10);
        state.add_deposit(5, hash(1), message(1));
        let now = Instant::now();

        let mut deposit = state.take_ready_deposit(now).unwrap().deposit;
        deposit.retry.record_failure(now, Duration::from_secs(60));
        state.readd_deposit(deposit);

        assert!(state.take_ready_deposit(now).is_none());
        let ready = state
            .take_ready_deposit(now + Duration::from_secs(61))
            .unwrap();
        assert_eq!(ready.deposit.retry.attempts, 1);
    }

    #[test]
    fn test_backoff_does_not_block_later_items() {
        let mut state = RelayerState::new();
        state.updated_l1_oracle_values(10);
        state.add_deposit(5, hash(1), message(1));
        state.add_deposit(6, hash(2), message(2));
        state.add_deposit(11, hash(3), message(3));
        let now = Instant::now();

        let mut head = state.take_ready_deposit(now).unwrap().deposit;
        head.retry.record_failure(now, Duration::from_secs(300));
        state.readd_deposit(head);

        let later = now + Duration::from_secs(1);
        let ready = state.take_ready_deposit(later).unwrap();
        assert_eq!(ready.deposit.deposit_hash, hash(2));
        state.complete_deposit(&ready.deposit);

        // Block 11 is past the oracle, block 5 still backs off
        assert!(state.take_ready_deposit(later).is_none());
        assert_eq!(state.next_deposit_block_number(), Some(5));

        let ready = state
            .take_ready_deposit(now + Duration::from_secs(301))
            .unwrap();
        assert_eq!(ready.deposit.deposit_hash, hash(1));
    }

    #[test]
    fn test_withdrawal_backoff_does_not_block_later_items() {
        let mut state = state_with_assertion(1);
        state.update_l2_block_number_mapping(60, 5);
        state.update_confirmed_inbox_size(U256::from(1), 5);
        state.add_withdrawal(50, hash(1), message(1));
        state.add_withdrawal(55, hash(2), message(2));
        let now = Instant::now();

        let mut head = state.take_ready_withdrawal(now).unwrap().withdrawal;
        head.retry.record_failure(now, Duration::from_secs(60));
        state.readd_withdrawal(head);

        let ready = state.take_ready_withdrawal(now).unwrap();
        assert_eq!(ready.withdrawal.withdrawal_hash, hash(2));
        assert!(state.take_ready_withdrawal(now).is_none());
    }

    #[test]
    fn test_confirmation_chain_drains_checkpoints() {
        let mut state = state_with_assertion(7);
        state.update_l2_block_number_mapping(40, 3);
        state.update_l2_block_number_mapping(60, 5);
        state.add_withdrawal(50, hash(1), message(1));
        state.add_withdrawal(70, hash(2), message(2));

        let outcome = state.update_confirmed_inbox_size(U256::from(7), 5);

        assert_eq!(
            outcome,
            Confirmation::Confirmed {
                l2_block_number: 60,
                checkpoints: 2
            }
        );
        assert_eq!(state.last_confirmed_l2_block_number(), Some(60));
        assert_eq!(state.last_confirmed_inbox_size(), Some(5));
        assert_eq!(state.last_confirmed_assertion_id(), Some(U256::from(7)));
        assert_eq!(state.pending_checkpoints(), 0);
        assert!(state.is_withdrawal_ready(50));
        assert!(!state.is_withdrawal_ready(70));

        let now = Instant::now();
        let ready = state.take_ready_withdrawal(now).unwrap();
        assert_eq!(ready.withdrawal.l2_block_number, 50);
        assert_eq!(ready.assertion.l2_gas_used, U256::from(21_000));
        assert!(state.take_ready_withdrawal(now).is_none());
    }

    #[test]
    fn test_unknown_assertion_leaves_cursors() {
        let mut state = RelayerState::new();
        state.update_l2_block_number_mapping(40, 3);

        let outcome = state.update_confirmed_inbox_size(U256::from(1), 3);

        assert_eq!(outcome, Confirmation::UnknownAssertion);
        assert_eq!(state.last_confirmed_assertion_id(), None);
        assert_eq!(state.last_confirmed_l2_block_number(), None);
        assert_eq!(state.last_confirmed_inbox_size(), None);
        assert_eq!(state.pending_checkpoints(), 1);
    }

    #[test]
    fn test_mid_batch_assertion_does_not_advance() {
        let mut state = state_with_assertion(1);
        state.update_l2_block_number_mapping(40, 3);
        state.update_l2_block_number_mapping(70, 6);

        let outcome = state.update_confirmed_inbox_size(U256::from(1), 5);

        assert_eq!(
            outcome,
            Confirmation::MidBatchAssertion { next_inbox_size: 6 }
        );
        assert_eq!(state.last_confirmed_l2_block_number(), None);
        assert_eq!(state.last_confirmed_assertion_id(), None);
        assert_eq!(state.pending_checkpoints(), 2);
    }

    #[test]
    fn test_confirmation_before_batch_is_deferred() {
        let mut state = state_with_assertion(2);
        state.update_l2_block_number_mapping(40, 3);

        let outcome = state.update_confirmed_inbox_size(U256::from(2), 5);
        assert_eq!(outcome, Confirmation::NonExistentBatch);
        assert_eq!(state.last_confirmed_l2_block_number(), None);
        assert_eq!(state.pending_checkpoints(), 1);

        // Batch event for inbox size 5 arrives after the confirmation
        state.update_l2_block_number_mapping(60, 5);

        assert_eq!(state.last_confirmed_l2_block_number(), Some(60));
        assert_eq!(state.last_confirmed_assertion_id(), Some(U256::from(2)));
        assert_eq!(state.pending_checkpoints(), 0);
    }

    #[test]
    fn test_deferred_confirmation_survives_snapshot() {
        let mut state = state_with_assertion(2);
        state.update_l2_block_number_mapping(40, 3);
        assert_eq!(
            state.update_confirmed_inbox_size(U256::from(2), 5),
            Confirmation::NonExistentBatch
        );

        let mut restored = RelayerState::from_snapshot(state.snapshot());
        restored.update_l2_block_number_mapping(60, 5);

        assert_eq!(restored.last_confirmed_l2_block_number(), Some(60));
        assert_eq!(restored.last_confirmed_assertion_id(), Some(U256::from(2)));
        assert_eq!(restored.pending_checkpoints(), 0);
    }

    #[test]
    fn test_confirmation_drops_older_assertions() {
        let mut state = RelayerState::new();
        for id in 1..=3 {
            state.update_created_assertion(U256::from(id), U256::from(id), B256::ZERO);
        }
        state.update_l2_block_number_mapping(40, 3);

        assert!(matches!(
            state.update_confirmed_inbox_size(U256::from(2), 3),
            Confirmation::Confirmed { .. }
        ));
        assert_eq!(state.pending_assertions(), 1);
        assert_eq!(state.snapshot().assertions.len(), 1);
        assert_eq!(
            state.update_confirmed_inbox_size(U256::from(1), 3),
            Confirmation::UnknownAssertion
        );
        assert_eq!(state.last_confirmed_assertion_id(), Some(U256::from(2)));
    }

    #[test]
    fn test_deferred_confirmation_superseded() {
        let mut state = state_with_assertion(1);
        state.update_created_assertion(U256::from(2), U256::from(1), B256::ZERO);

        assert_eq!(
            state.update_confirmed_inbox_size(U256::from(1), 3),
            Confirmation::NonExistentBatch
        );
        state.update_l2_block_number_mapping(30, 2);
        state.update_l2_block_number_mapping(50, 4);
        state.update_l2_block_number_mapping(80, 8);

        // Assertion 1 was mid-batch (2 < 3 < 4) and got dropped on the overshooting checkpoint
        assert_eq!(state.last_confirmed_l2_block_number(), None);
        assert_eq!(
            state.update_confirmed_inbox_size(U256::from(1), 3),
            Confirmation::UnknownAssertion
        );

        assert_eq!(
            state.update_confirmed_inbox_size(U256::from(2), 8),
            Confirmation::Confirmed {
                l2_block_number: 80,
                checkpoints: 3
            }
        );
    }

    #[test]
    fn test_oracle_throttle() {
        let mut state = RelayerState::new();
        assert!(state.should_send_l1_oracle_values(1, 10));

        state.sent_l1_oracle_values(100);
        assert!(!state.should_send_l1_oracle_values(109, 10));
        assert!(state.should_send_l1_oracle_values(110, 10));
        assert_eq!(state.last_sent_l1_oracle_block_number(), Some(100));
        assert_eq!(state.last_updated_l1_oracle_block_number(), None);
    }

    #[test]
    fn test_dead_letter_records_attempts() {
        let mut state = RelayerState::new();
        state.updated_l1_oracle_values(10);
        state.add_deposit(1, hash(9), message(9));

        let mut deposit = state.take_ready_deposit(Instant::now()).unwrap().deposit;
        deposit.retry.attempts = 5;
        state.dead_letter_deposit(deposit, "execution reverted".to_string());

        assert_eq!(state.pending_deposits(), 0);
        let dead = &state.dead_letters()[0];
        assert_eq!(dead.kind, MessageKind::Deposit);
        assert_eq!(dead.hash, hash(9));
        assert_eq!(dead.attempts, 5);
        assert_eq!(dead.last_error, "execution reverted");
    }

    #[test]
    fn test_snapshot_restores_queues_and_in_flight() {
        let mut state = state_with_assertion(3);
        state.updated_l1_oracle_values(20);
        state.add_deposit(5, hash(1), message(1));
        state.add_deposit(8, hash(2), message(2));
        state.add_withdrawal(9, hash(3), message(3));
        state.update_l2_block_number_mapping(9, 4);
        state.set_stream_cursor("DepositInitiated", 21);

        // One deposit is in flight when the snapshot is taken
        let in_flight = state.take_ready_deposit(Instant::now()).unwrap();
        assert_eq!(in_flight.deposit.deposit_hash, hash(1));

        let mut restored = RelayerState::from_snapshot(state.snapshot());

        assert_eq!(restored.pending_deposits(), 2);
        assert_eq!(restored.next_deposit_block_number(), Some(5));
        assert_eq!(restored.stream_cursor("DepositInitiated"), Some(21));
        assert_eq!(restored.last_updated_l1_oracle_block_number(), Some(20));
        assert_eq!(
            restored.update_confirmed_inbox_size(U256::from(3), 4),
            Confirmation::Confirmed {
                l2_block_number: 9,
                checkpoints: 1
            }
        );

        // New items still sort after restored ones at the same block
        restored.add_deposit(5, hash(4), message(4));
        assert_eq!(restored.next_deposit().unwrap().deposit_hash, hash(1));
        assert_eq!(restored.next_deposit().unwrap().deposit_hash, hash(4));
    }
}
