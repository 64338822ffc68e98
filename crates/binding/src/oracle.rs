//! L1 oracle binding (deployed on L2).

use alloy_sol_types::sol;

sol! {
    /// L1Oracle - mirrors a recent L1 block number and state root on L2
    #[sol(rpc)]
    interface IL1Oracle {
        /// Emitted once the oracle stored new L1 values
        event L1OracleValuesUpdated(
            uint256 blockNumber,
            bytes32 stateRoot
        );

        /// Store a new L1 block number and state root
        function setL1OracleValues(uint256 blockNumber, bytes32 stateRoot) external;

        /// Last stored L1 block number
        function number() external view returns (uint256);

        /// Last stored L1 state root
        function stateRoot() external view returns (bytes32);
    }
}
