use alloy_primitives::{keccak256, B256};
use alloy_sol_types::SolValue;
use binding::CrossDomainMessage;

/// Hash of a cross-domain message as computed by both portals:
/// `keccak256(abi.encode(nonce, sender, target, value, gasLimit, data))`.
pub fn compute_message_hash(tx: &CrossDomainMessage) -> B256 {
    let encoded = (
        tx.nonce,
        tx.sender,
        tx.target,
        tx.value,
        tx.gasLimit,
        tx.data.clone(),
    )
        .abi_encode_sequence();

    keccak256(encoded)
}

/// Storage slot of `message_hash` in the portal's message mapping at slot 0:
/// `keccak256(abi.encode(bytes32 messageHash, uint256 0))`.
pub fn compute_storage_slot(message_hash: B256) -> B256 {
    let mut data = [0u8; 64];
    data[0..32].copy_from_slice(message_hash.as_slice());
    keccak256(data)
}
