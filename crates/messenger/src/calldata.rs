//! Decoding of sequencer inbox batch calldata.

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use binding::rollup::ISequencerInbox::appendTxBatchCall;
use thiserror::Error;

/// Words per L2 block in `appendTxBatch` contexts: `(numTxs, timestamp)`.
pub const CONTEXT_WORDS: usize = 2;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CalldataError {
    #[error("not an appendTxBatch call: {0}")]
    Decode(String),

    #[error("appendTxBatch carries no block contexts")]
    EmptyContexts,

    #[error("appendTxBatch contexts length {0} is not a multiple of 2")]
    MalformedContexts(usize),

    #[error("L2 block number {0} does not fit in u64")]
    Overflow(U256),
}

/// Last L2 block covered by an `appendTxBatch` transaction.
///
/// The batch covers `contexts.len() / 2` consecutive blocks starting at
/// `firstL2BlockNumber`; the returned bound is inclusive.
pub fn last_l2_block_number_from_append_tx_batch_calldata(
    data: &[u8],
) -> Result<u64, CalldataError> {
    let call =
        appendTxBatchCall::abi_decode(data).map_err(|e| CalldataError::Decode(e.to_string()))?;

    let words = call.contexts.len();
    if words == 0 {
        return Err(CalldataError::EmptyContexts);
    }
    if words % CONTEXT_WORDS != 0 {
        return Err(CalldataError::MalformedContexts(words));
    }

    let first: u64 = call
        .firstL2BlockNumber
        .try_into()
        .map_err(|_| CalldataError::Overflow(call.firstL2BlockNumber))?;
    let blocks = (words / CONTEXT_WORDS) as u64;

    first
        .checked_add(blocks - 1)
        .ok_or(CalldataError::Overflow(call.firstL2BlockNumber))
}
