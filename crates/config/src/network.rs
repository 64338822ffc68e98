//! Network configuration for the bridge.
//!
//! L1 contracts are deployed per network and must be configured. L2 contracts
//! are predeploys and default to their well-known addresses.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// L1Oracle predeploy on L2.
pub const L1_ORACLE_PREDEPLOY: Address = address!("0x2A00000000000000000000000000000000000010");

/// L2Portal predeploy on L2.
pub const L2_PORTAL_PREDEPLOY: Address = address!("0x2A00000000000000000000000000000000000011");

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NetworkError {
    /// A required contract address was left unset
    #[error("{0} address is zero")]
    ZeroAddress(&'static str),

    /// L1 and L2 share a chain id
    #[error("L1 and L2 chain ids must differ (both {0})")]
    SameChainId(u64),
}

/// L1 network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L1Config {
    /// Chain ID
    pub chain_id: u64,
    /// L1Portal contract address
    pub portal: Address,
    /// SequencerInbox contract address
    pub sequencer_inbox: Address,
    /// Rollup contract address
    pub rollup: Address,
    /// Block time in seconds
    #[serde(default = "default_l1_block_time")]
    pub block_time_secs: u64,
}

const fn default_l1_block_time() -> u64 {
    12
}

/// L2 network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L2Config {
    /// Chain ID
    pub chain_id: u64,
    /// L2Portal contract address
    #[serde(default = "default_l2_portal")]
    pub portal: Address,
    /// L1Oracle contract address
    #[serde(default = "default_l1_oracle")]
    pub l1_oracle: Address,
    /// Block time in seconds
    #[serde(default = "default_l2_block_time")]
    pub block_time_secs: u64,
}

const fn default_l2_portal() -> Address {
    L2_PORTAL_PREDEPLOY
}

const fn default_l1_oracle() -> Address {
    L1_ORACLE_PREDEPLOY
}

const fn default_l2_block_time() -> u64 {
    2
}

impl L2Config {
    /// L2 configuration using the predeploy addresses.
    pub const fn predeploys(chain_id: u64) -> Self {
        Self {
            chain_id,
            portal: L2_PORTAL_PREDEPLOY,
            l1_oracle: L1_ORACLE_PREDEPLOY,
            block_time_secs: default_l2_block_time(),
        }
    }
}

/// Complete network configuration for the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// L1 configuration
    pub l1: L1Config,
    /// L2 configuration
    pub l2: L2Config,
}

impl NetworkConfig {
    /// Check that every contract address is set and the chains are distinct.
    pub fn validate(&self) -> Result<(), NetworkError> {
        let required = [
            ("L1 portal", self.l1.portal),
            ("sequencer inbox", self.l1.sequencer_inbox),
            ("rollup", self.l1.rollup),
            ("L2 portal", self.l2.portal),
            ("L1 oracle", self.l2.l1_oracle),
        ];
        if let Some((name, _)) = required.iter().find(|(_, addr)| *addr == Address::ZERO) {
            return Err(NetworkError::ZeroAddress(*name));
        }

        if self.l1.chain_id == self.l2.chain_id {
            return Err(NetworkError::SameChainId(self.l1.chain_id));
        }

        Ok(())
    }
}

/// Builder for custom network configurations.
#[derive(Debug, Clone)]
pub struct NetworkConfigBuilder {
    l1: L1Config,
    l2: L2Config,
}

impl NetworkConfigBuilder {
    /// Start with unset L1 contracts and L2 predeploys.
    pub const fn new(l1_chain_id: u64, l2_chain_id: u64) -> Self {
        Self {
            l1: L1Config {
                chain_id: l1_chain_id,
                portal: Address::ZERO,
                sequencer_inbox: Address::ZERO,
                rollup: Address::ZERO,
                block_time_secs: default_l1_block_time(),
            },
            l2: L2Config::predeploys(l2_chain_id),
        }
    }

    /// Set the L1Portal address.
    pub const fn l1_portal(mut self, address: Address) -> Self {
        self.l1.portal = address;
        self
    }

    /// Set the SequencerInbox address.
    pub const fn sequencer_inbox(mut self, address: Address) -> Self {
        self.l1.sequencer_inbox = address;
        self
    }

    /// Set the Rollup address.
    pub const fn rollup(mut self, address: Address) -> Self {
        self.l1.rollup = address;
        self
    }

    /// Override the L2Portal address.
    pub const fn l2_portal(mut self, address: Address) -> Self {
        self.l2.portal = address;
        self
    }

    /// Override the L1Oracle address.
    pub const fn l1_oracle(mut self, address: Address) -> Self {
        self.l2.l1_oracle = address;
        self
    }

    /// Build the network configuration.
    pub const fn build(self) -> NetworkConfig {
        NetworkConfig {
            l1: self.l1,
            l2: self.l2,
        }
    }
}
