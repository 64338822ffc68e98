//! Inclusion proofs of portal messages.
//!
//! The portal stores every initiated message hash in a mapping at slot 0, so
//! the proof is `eth_getProof` of that slot at the block whose state root the
//! counterpart chain already knows.

use crate::{hash::compute_storage_slot, MessageProof};
use alloy_primitives::{Address, B256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::BlockNumberOrTag;
use eyre::{eyre, Result};
use tracing::debug;

/// Fetch the account and storage proof of `message_hash` in `portal` at `block_number`.
pub async fn fetch_message_proof<P>(
    provider: &P,
    portal: Address,
    message_hash: B256,
    block_number: u64,
) -> Result<MessageProof>
where
    P: Provider,
{
    let block = provider
        .get_block_by_number(BlockNumberOrTag::Number(block_number))
        .await?
        .ok_or_else(|| eyre!("Block not found: {}", block_number))?;

    let storage_slot = compute_storage_slot(message_hash);
    let proof = provider
        .get_proof(portal, vec![storage_slot])
        .block_id(BlockNumberOrTag::Number(block_number).into())
        .await?;

    let storage_proof = proof
        .storage_proof
        .first()
        .ok_or_else(|| eyre!("No storage proof returned"))?
        .proof
        .clone();

    debug!(
        block = block_number,
        message_hash = %message_hash,
        account_nodes = proof.account_proof.len(),
        storage_nodes = storage_proof.len(),
        "Generated message proof"
    );

    Ok(MessageProof {
        state_root: block.header.state_root,
        account_proof: proof.account_proof,
        storage_proof,
    })
}
