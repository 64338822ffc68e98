//! Deposit relay loop: L1 deposits finalized on L2.

use crate::{metrics, RelayOptions, SharedState, Step};
use messenger::{ChainReader, Messenger};
use state::{MessageKind, ReadyDeposit};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Relay deposits forever.
pub async fn run_relay_deposits<C>(state: SharedState, client: C, options: RelayOptions)
where
    C: Messenger + ChainReader,
{
    info!("Deposit relay loop started");
    loop {
        if relay_next_deposit(&state, &client, &options).await == Step::Idle {
            sleep(options.poll_interval).await;
        }
    }
}

/// Finalize the next deposit if its L1 block is covered by the oracle.
///
/// The proof is taken at the oracle's L1 block, the state root the L2 portal
/// verifies against.
pub async fn relay_next_deposit<C>(state: &SharedState, client: &C, options: &RelayOptions) -> Step
where
    C: Messenger + ChainReader,
{
    let Some(ReadyDeposit {
        mut deposit,
        proof_block_number,
    }) = state.lock().await.take_ready_deposit(Instant::now())
    else {
        return Step::Idle;
    };

    info!(
        l1_block_number = deposit.l1_block_number,
        deposit_hash = %deposit.deposit_hash,
        proof_block_number,
        attempt = deposit.retry.attempts + 1,
        "Relaying deposit"
    );

    let result = async {
        let proof = client
            .deposit_proof(deposit.deposit_hash, proof_block_number)
            .await?;
        client.finalize_deposit(&deposit.deposit_tx, &proof).await
    }
    .await;

    match result {
        Ok(receipt) => {
            info!(
                deposit_hash = %deposit.deposit_hash,
                tx_hash = %receipt.tx_hash,
                "Deposit relayed"
            );
            state.lock().await.complete_deposit(&deposit);
            metrics::record_finalized(MessageKind::Deposit);
            Step::Relayed
        }
        Err(e) => {
            metrics::record_finalize_failure(MessageKind::Deposit);
            let exhausted = options
                .retry
                .record_failure(&mut deposit.retry, Instant::now());

            if exhausted {
                error!(
                    deposit_hash = %deposit.deposit_hash,
                    attempts = deposit.retry.attempts,
                    error = %e,
                    "Deposit failed too often, dead-lettering"
                );
                state.lock().await.dead_letter_deposit(deposit, e.to_string());
                metrics::record_dead_letter(MessageKind::Deposit);
                Step::DeadLettered
            } else {
                warn!(
                    deposit_hash = %deposit.deposit_hash,
                    attempts = deposit.retry.attempts,
                    error = %e,
                    "Deposit relay failed, requeued"
                );
                state.lock().await.readd_deposit(deposit);
                Step::Requeued
            }
        }
    }
}
