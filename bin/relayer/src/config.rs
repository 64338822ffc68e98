use alloy_primitives::U256;
use config::NetworkConfig;
use messenger::PollOptions;
use relay::{RelayOptions, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Top-level relayer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// L1 RPC endpoint url
    pub l1_rpc_url: String,

    /// L2 RPC endpoint url
    pub l2_rpc_url: String,

    /// Contract addresses and chain ids
    pub network: NetworkConfig,

    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub ingest: IngestSettings,

    #[serde(default)]
    pub oracle: OracleSettings,

    #[serde(default)]
    pub snapshot: SnapshotSettings,

    #[serde(default)]
    pub funding: FundingSettings,

    /// Prometheus exporter port; no exporter if unset
    pub metrics_port: Option<u16>,
}

/// Deposit and withdrawal loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Readiness poll interval
    pub poll_interval_ms: u64,
    /// Failed attempts before a message is dead-lettered
    pub max_attempts: u32,
    pub base_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            max_attempts: 10,
            base_retry_delay_ms: 2_000,
            max_retry_delay_ms: 300_000,
        }
    }
}

/// Event poller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub poll_interval_ms: u64,
    /// Blocks per `eth_getLogs` query
    pub chunk_size: u64,
    /// Capacity of each event stream channel
    pub channel_capacity: usize,
    /// First L1 block to scan when no snapshot cursor exists
    pub l1_start_block: u64,
    /// First L2 block to scan when no snapshot cursor exists
    pub l2_start_block: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            chunk_size: messenger::events::DEFAULT_CHUNK_SIZE,
            channel_capacity: 256,
            l1_start_block: 0,
            l2_start_block: 0,
        }
    }
}

/// L1 oracle update settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Submit when the L1 head is this many blocks past the last submission
    pub interval_blocks: u64,
    /// Disable to leave oracle updates to another party
    pub enabled: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            interval_blocks: 10,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    pub path: PathBuf,
    pub interval_secs: u64,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("relayer-state.json"),
            interval_secs: 30,
        }
    }
}

/// Deposit funding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingSettings {
    /// Targets holding at least this much on L2 are not funded (wei)
    pub balance_threshold_wei: U256,
}

impl Default for FundingSettings {
    fn default() -> Self {
        Self {
            // 0.1 ether
            balance_threshold_wei: U256::from(100_000_000_000_000_000u64),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject values the relayer cannot run with.
    pub fn validate(&self) -> eyre::Result<()> {
        self.network.validate()?;
        eyre::ensure!(
            self.ingest.channel_capacity > 0,
            "ingest.channel_capacity must be greater than 0"
        );
        eyre::ensure!(
            self.ingest.chunk_size > 0,
            "ingest.chunk_size must be greater than 0"
        );
        eyre::ensure!(
            self.relay.max_attempts > 0,
            "relay.max_attempts must be greater than 0"
        );

        Ok(())
    }

    pub const fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            poll_interval: Duration::from_millis(self.relay.poll_interval_ms),
            retry: RetryPolicy {
                max_attempts: self.relay.max_attempts,
                base_delay: Duration::from_millis(self.relay.base_retry_delay_ms),
                max_delay: Duration::from_millis(self.relay.max_retry_delay_ms),
            },
        }
    }

    pub const fn poll_options(&self) -> PollOptions {
        PollOptions {
            poll_interval: Duration::from_millis(self.ingest.poll_interval_ms),
            chunk_size: self.ingest.chunk_size,
        }
    }

    /// The oracle loop checks the L1 head once per L1 block.
    pub const fn oracle_poll_interval(&self) -> Duration {
        Duration::from_secs(self.network.l1.block_time_secs)
    }
}
