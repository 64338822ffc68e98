//! Cross-domain messenger: the relayer's capability surface over both chains.
//!
//! Exposes to the reconciliation loops only:
//! - message finalization on the counterpart portal ([`Messenger`])
//! - L1 oracle updates on L2 ([`Messenger`])
//! - inclusion proofs and the latest L1 header ([`ChainReader`])
//! - event stream subscriptions ([`events::EventSubscriber`])
//! - batch calldata decoding ([`calldata`])
//!
//! Nothing here retries a transaction or keeps state; that policy lives with
//! the caller.

pub mod calldata;
pub mod events;
pub mod hash;
pub mod portal;
pub mod proof;

use alloy_primitives::{Bytes, TxHash, B256, U256};
use binding::CrossDomainMessage;
use std::future::Future;

pub use calldata::{last_l2_block_number_from_append_tx_batch_calldata, CalldataError};
pub use events::{Chain, EventStream, EventSubscriber, PollOptions, RelayerEvent};
pub use hash::{compute_message_hash, compute_storage_slot};
pub use portal::PortalMessenger;

/// Account and storage proof of a message in a portal's storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageProof {
    /// State root of the block the proof was taken at
    pub state_root: B256,
    pub account_proof: Vec<Bytes>,
    pub storage_proof: Vec<Bytes>,
}

/// Number and state root of an L1 block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct L1Header {
    pub number: u64,
    pub state_root: B256,
}

/// Result of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number where transaction was included
    pub block_number: Option<u64>,
    /// Gas used
    pub gas_used: u64,
}

/// Transactions the relayer submits.
///
/// Each call resolves once the transaction is included; a reverted
/// transaction is an error.
pub trait Messenger: Send + Sync {
    /// Finalize a deposit on the L2 portal.
    fn finalize_deposit(
        &self,
        deposit_tx: &CrossDomainMessage,
        proof: &MessageProof,
    ) -> impl Future<Output = eyre::Result<Receipt>> + Send;

    /// Finalize a withdrawal on the L1 portal against a confirmed assertion.
    fn finalize_withdrawal(
        &self,
        withdrawal_tx: &CrossDomainMessage,
        assertion_id: U256,
        l2_gas_used: U256,
        vm_hash: B256,
        proof: &MessageProof,
    ) -> impl Future<Output = eyre::Result<Receipt>> + Send;

    /// Store an L1 block number and state root in the L2 oracle.
    fn set_l1_oracle_values(
        &self,
        block_number: u64,
        state_root: B256,
    ) -> impl Future<Output = eyre::Result<Receipt>> + Send;
}

/// Chain reads the relayer needs besides event streams.
pub trait ChainReader: Send + Sync {
    /// Proof of a deposit in the L1 portal at `l1_block_number`.
    fn deposit_proof(
        &self,
        deposit_hash: B256,
        l1_block_number: u64,
    ) -> impl Future<Output = eyre::Result<MessageProof>> + Send;

    /// Proof of a withdrawal in the L2 portal at `l2_block_number`.
    fn withdrawal_proof(
        &self,
        withdrawal_hash: B256,
        l2_block_number: u64,
    ) -> impl Future<Output = eyre::Result<MessageProof>> + Send;

    /// Latest L1 block header.
    fn latest_l1_header(&self) -> impl Future<Output = eyre::Result<L1Header>> + Send;

    /// L1 block number currently stored in the L2 oracle.
    fn l1_oracle_block_number(&self) -> impl Future<Output = eyre::Result<u64>> + Send;
}
