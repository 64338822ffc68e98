//! Portal contract bindings.
//!
//! The L1 portal emits deposits and finalizes withdrawals; the L2 portal emits
//! withdrawals and finalizes deposits. Both exchange the same
//! [`CrossDomainMessage`] struct.

use alloy_sol_types::sol;

sol! {
    /// Message relayed between the two portals.
    #[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    struct CrossDomainMessage {
        uint256 nonce;
        address sender;
        address target;
        uint256 value;
        uint256 gasLimit;
        bytes data;
    }

    /// L1Portal - deposit entry point and withdrawal exit point on L1
    #[sol(rpc)]
    #[allow(clippy::too_many_arguments)]
    interface IL1Portal {
        /// Emitted when a deposit is initiated on L1
        event DepositInitiated(
            uint256 indexed nonce,
            address indexed sender,
            address indexed target,
            uint256 value,
            uint256 gasLimit,
            bytes data,
            bytes32 depositHash
        );

        /// Emitted when a withdrawal is finalized on L1
        event WithdrawalFinalized(
            bytes32 indexed withdrawalHash,
            bool success
        );

        /// Finalize a withdrawal against a confirmed assertion
        function finalizeWithdrawalTransaction(
            CrossDomainMessage calldata withdrawalTx,
            uint256 assertionID,
            uint256 l2GasUsed,
            bytes32 vmHash,
            bytes[] calldata withdrawalAccountProof,
            bytes[] calldata withdrawalProof
        ) external;

        /// Query if a withdrawal has been finalized
        function finalizedWithdrawals(bytes32 withdrawalHash) external view returns (bool);
    }

    /// L2Portal - withdrawal entry point and deposit exit point on L2
    #[sol(rpc)]
    interface IL2Portal {
        /// Emitted when a withdrawal is initiated on L2
        event WithdrawalInitiated(
            uint256 indexed nonce,
            address indexed sender,
            address indexed target,
            uint256 value,
            uint256 gasLimit,
            bytes data,
            bytes32 withdrawalHash
        );

        /// Emitted when a deposit is finalized on L2
        event DepositFinalized(
            bytes32 indexed depositHash,
            bool success
        );

        /// Finalize a deposit against the L1 state root held by the oracle
        function finalizeDepositTransaction(
            CrossDomainMessage calldata depositTx,
            bytes[] calldata depositAccountProof,
            bytes[] calldata depositProof
        ) external;

        /// Query if a deposit has been finalized
        function finalizedDeposits(bytes32 depositHash) external view returns (bool);
    }
}
