//! Sequencer inbox and rollup bindings (both deployed on L1).

use alloy_sol_types::sol;

sol! {
    /// SequencerInbox - L1 inbox receiving L2 transaction batches
    #[sol(rpc)]
    interface ISequencerInbox {
        /// Emitted when a batch is appended; `endTxNumber` is the new inbox size
        event TxBatchAppended(
            uint256 batchNumber,
            uint256 startTxNumber,
            uint256 endTxNumber
        );

        /// Append a batch. `contexts` holds one `(numTxs, timestamp)` pair per L2 block,
        /// starting at `firstL2BlockNumber`.
        function appendTxBatch(
            uint256[] calldata contexts,
            uint256[] calldata txLengths,
            uint256 firstL2BlockNumber,
            bytes calldata txBatch
        ) external;

        /// Current inbox size
        function getInboxSize() external view returns (uint256);
    }

    /// Rollup - assertion lifecycle on L1
    #[sol(rpc)]
    interface IRollup {
        /// Emitted when an assertion is created (not yet confirmed)
        event AssertionCreated(
            uint256 assertionID,
            address asserterAddr,
            bytes32 vmHash,
            uint256 inboxSize,
            uint256 l2GasUsed
        );

        /// Emitted when an assertion is confirmed after its dispute window
        event AssertionConfirmed(uint256 assertionID);

        /// Inbox size covered by an assertion
        function getInboxSize(uint256 assertionID) external view returns (uint256);

        /// Last confirmed assertion ID
        function lastConfirmedAssertionID() external view returns (uint256);
    }
}
