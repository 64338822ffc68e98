//! Withdrawal relay loop: L2 withdrawals finalized on L1.

use crate::{metrics, RelayOptions, SharedState, Step};
use messenger::{ChainReader, Messenger};
use state::{MessageKind, ReadyWithdrawal};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Relay withdrawals forever.
pub async fn run_relay_withdrawals<C>(state: SharedState, client: C, options: RelayOptions)
where
    C: Messenger + ChainReader,
{
    info!("Withdrawal relay loop started");
    loop {
        if relay_next_withdrawal(&state, &client, &options).await == Step::Idle {
            sleep(options.poll_interval).await;
        }
    }
}

/// Finalize the next withdrawal if a confirmed assertion covers its L2 block.
///
/// The proof is taken at the last confirmed L2 block and submitted with the
/// assertion that confirmed it.
pub async fn relay_next_withdrawal<C>(
    state: &SharedState,
    client: &C,
    options: &RelayOptions,
) -> Step
where
    C: Messenger + ChainReader,
{
    let Some(ReadyWithdrawal {
        mut withdrawal,
        assertion,
        proof_block_number,
    }) = state.lock().await.take_ready_withdrawal(Instant::now())
    else {
        return Step::Idle;
    };

    info!(
        l2_block_number = withdrawal.l2_block_number,
        withdrawal_hash = %withdrawal.withdrawal_hash,
        assertion_id = %assertion.assertion_id,
        proof_block_number,
        attempt = withdrawal.retry.attempts + 1,
        "Relaying withdrawal"
    );

    let result = async {
        let proof = client
            .withdrawal_proof(withdrawal.withdrawal_hash, proof_block_number)
            .await?;
        client
            .finalize_withdrawal(
                &withdrawal.withdrawal_tx,
                assertion.assertion_id,
                assertion.l2_gas_used,
                assertion.vm_hash,
                &proof,
            )
            .await
    }
    .await;

    match result {
        Ok(receipt) => {
            info!(
                withdrawal_hash = %withdrawal.withdrawal_hash,
                tx_hash = %receipt.tx_hash,
                "Withdrawal relayed"
            );
            state.lock().await.complete_withdrawal(&withdrawal);
            metrics::record_finalized(MessageKind::Withdrawal);
            Step::Relayed
        }
        Err(e) => {
            metrics::record_finalize_failure(MessageKind::Withdrawal);
            let exhausted = options
                .retry
                .record_failure(&mut withdrawal.retry, Instant::now());

            if exhausted {
                error!(
                    withdrawal_hash = %withdrawal.withdrawal_hash,
                    attempts = withdrawal.retry.attempts,
                    error = %e,
                    "Withdrawal failed too often, dead-lettering"
                );
                state
                    .lock()
                    .await
                    .dead_letter_withdrawal(withdrawal, e.to_string());
                metrics::record_dead_letter(MessageKind::Withdrawal);
                Step::DeadLettered
            } else {
                warn!(
                    withdrawal_hash = %withdrawal.withdrawal_hash,
                    attempts = withdrawal.retry.attempts,
                    error = %e,
                    "Withdrawal relay failed, requeued"
                );
                state.lock().await.readd_withdrawal(withdrawal);
                Step::Requeued
            }
        }
    }
}
