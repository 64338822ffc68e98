//! Reconciliation loops against an in-memory chain.

use crate::setup::{hash, wide_message, FakeChain};
use alloy_primitives::{B256, U256};
use messenger::RelayerEvent;
use relay::{
    apply_event, relay_next_deposit, relay_next_withdrawal, shared, update_oracle_once,
    RelayOptions, RetryPolicy, Step,
};
use state::{MessageKind, RelayerState};
use std::time::Duration;


fn options(max_attempts: u32) -> RelayOptions {
    RelayOptions {
        poll_interval: Duration::from_millis(10),
        retry: RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(40),
            max_delay: Duration::from_millis(40),
        },
    }
}

#[tokio::test]
async fn test_deposit_waits_for_oracle() {
    let chain = FakeChain::new();
    let state = shared(RelayerState::new());
    let message = wide_message(1);

    {
        let mut state = state.lock().await;
        apply_event(
            &mut state,
            RelayerEvent::DepositInitiated {
                l1_block_number: 100,
                deposit_hash: hash(1),
                deposit_tx: message.clone(),
            },
        );
        apply_event(
            &mut state,
            RelayerEvent::L1OracleValuesUpdated {
                block_number: 99,
                state_root: B256::ZERO,
            },
        );
    }

    assert_eq!(
        relay_next_deposit(&state, &chain, &options(3)).await,
        Step::Idle
    );
    assert!(chain.with_recorded(|r| r.deposits.is_empty()));

    apply_event(
        &mut *state.lock().await,
        RelayerEvent::L1OracleValuesUpdated {
            block_number: 100,
            state_root: B256::ZERO,
        },
    );

    assert_eq!(
        relay_next_deposit(&state, &chain, &options(3)).await,
        Step::Relayed
    );
    chain.with_recorded(|r| {
        // Proof taken at the oracle's block, message passed through untouched
        assert_eq!(r.proofs, vec![(hash(1), 100)]);
        assert_eq!(r.deposits, vec![message.clone()]);
    });
    assert_eq!(state.lock().await.pending_deposits(), 0);
}

#[tokio::test]
async fn test_withdrawal_confirmation_chain() {
    let chain = FakeChain::new();
    let state = shared(RelayerState::new());
    let vm_hash = B256::from([0x77; 32]);

    {
        let mut state = state.lock().await;
        for event in [
            RelayerEvent::WithdrawalInitiated {
                l2_block_number: 50,
                withdrawal_hash: hash(5),
                withdrawal_tx: wide_message(5),
            },
            RelayerEvent::WithdrawalInitiated {
                l2_block_number: 70,
                withdrawal_hash: hash(7),
                withdrawal_tx: wide_message(7),
            },
            RelayerEvent::TxBatchAppended {
                l2_block_number: 40,
                inbox_size: 3,
            },
            RelayerEvent::TxBatchAppended {
                l2_block_number: 60,
                inbox_size: 5,
            },
            RelayerEvent::AssertionCreated {
                assertion_id: U256::from(11),
                l2_gas_used: U256::MAX,
                vm_hash,
            },
            RelayerEvent::AssertionConfirmed {
                assertion_id: U256::from(11),
                inbox_size: 5,
            },
        ] {
            apply_event(&mut state, event);
        }
        assert_eq!(state.last_confirmed_l2_block_number(), Some(60));
        assert_eq!(state.pending_checkpoints(), 0);
    }

    assert_eq!(
        relay_next_withdrawal(&state, &chain, &options(3)).await,
        Step::Relayed
    );
    // Block 70 is past the confirmed L2 block
    assert_eq!(
        relay_next_withdrawal(&state, &chain, &options(3)).await,
        Step::Idle
    );

    chain.with_recorded(|r| {
        assert_eq!(r.proofs, vec![(hash(5), 60)]);
        assert_eq!(r.withdrawals.len(), 1);
        let call = &r.withdrawals[0];
        assert_eq!(call.withdrawal_tx, wide_message(5));
        assert_eq!(call.assertion_id, U256::from(11));
        assert_eq!(call.l2_gas_used, U256::MAX);
        assert_eq!(call.vm_hash, vm_hash);
    });
    assert_eq!(state.lock().await.pending_withdrawals(), 1);
}

#[tokio::test]
async fn test_failed_deposit_backs_off_without_blocking_queue() {
    let chain = FakeChain::new();
    let mut inner = RelayerState::new();
    inner.updated_l1_oracle_values(10);
    inner.add_deposit(5, hash(1), wide_message(1));
    inner.add_deposit(6, hash(2), wide_message(2));
    let state = shared(inner);

    chain.fail_next(1, "nonce too low");
    assert_eq!(
        relay_next_deposit(&state, &chain, &options(3)).await,
        Step::Requeued
    );
    assert_eq!(state.lock().await.next_deposit_block_number(), Some(5));

    // The later deposit goes out while the head backs off
    assert_eq!(
        relay_next_deposit(&state, &chain, &options(3)).await,
        Step::Relayed
    );
    assert_eq!(
        relay_next_deposit(&state, &chain, &options(3)).await,
        Step::Idle
    );

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        relay_next_deposit(&state, &chain, &options(3)).await,
        Step::Relayed
    );

    chain.with_recorded(|r| {
        let nonces: Vec<U256> = r.deposits.iter().map(|d| d.nonce).collect();
        assert_eq!(nonces, vec![wide_message(2).nonce, wide_message(1).nonce]);
    });
    assert_eq!(state.lock().await.pending_deposits(), 0);
}

#[tokio::test]
async fn test_permanent_failure_is_dead_lettered() {
    let chain = FakeChain::new();
    let mut inner = RelayerState::new();
    inner.updated_l1_oracle_values(10);
    inner.add_deposit(5, hash(1), wide_message(1));
    let state = shared(inner);

    chain.fail_next(u32::MAX, "insufficient portal balance");
    let opts = options(2);

    assert_eq!(relay_next_deposit(&state, &chain, &opts).await, Step::Requeued);
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(
        relay_next_deposit(&state, &chain, &opts).await,
        Step::DeadLettered
    );
    assert_eq!(relay_next_deposit(&state, &chain, &opts).await, Step::Idle);

    let state = state.lock().await;
    assert_eq!(state.pending_deposits(), 0);
    let dead = &state.dead_letters()[0];
    assert_eq!(dead.kind, MessageKind::Deposit);
    assert_eq!(dead.attempts, 2);
    assert!(dead.last_error.contains("insufficient portal balance"));
}

#[tokio::test]
async fn test_oracle_update_throttle() {
    let chain = FakeChain::new();
    let state = shared(RelayerState::new());

    chain.set_l1_head(100, B256::from([1; 32]));
    assert_eq!(update_oracle_once(&state, &chain, 10).await.unwrap(), Some(100));

    chain.set_l1_head(109, B256::from([2; 32]));
    assert_eq!(update_oracle_once(&state, &chain, 10).await.unwrap(), None);

    chain.set_l1_head(110, B256::from([3; 32]));
    assert_eq!(update_oracle_once(&state, &chain, 10).await.unwrap(), Some(110));

    chain.with_recorded(|r| {
        assert_eq!(
            r.oracle_updates,
            vec![(100, B256::from([1; 32])), (110, B256::from([3; 32]))]
        );
    });
    assert_eq!(state.lock().await.last_sent_l1_oracle_block_number(), Some(110));
}

#[tokio::test]
async fn test_failed_oracle_update_keeps_cursor() {
    let chain = FakeChain::new();
    let state = shared(RelayerState::new());

    chain.set_l1_head(100, B256::ZERO);
    chain.fail_next(1, "replacement transaction underpriced");

    assert!(update_oracle_once(&state, &chain, 10).await.is_err());
    assert_eq!(state.lock().await.last_sent_l1_oracle_block_number(), None);

    assert_eq!(update_oracle_once(&state, &chain, 10).await.unwrap(), Some(100));
}
