//! Durable snapshots of the relayer state.
//!
//! Snapshots are JSON files written atomically (temp file, then rename). On
//! restart the state is rebuilt from the snapshot and event ingestion resumes
//! from the stored stream cursors.

use crate::types::{
    ConfirmedAssertion, DeadLetter, L2BlockNumberMappingEntry, PendingDeposit, PendingWithdrawal,
};
use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Created assertion awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAssertion {
    pub assertion_id: U256,
    pub l2_gas_used: U256,
    pub vm_hash: B256,
}

/// Confirmation waiting for the checkpoint at its inbox size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredConfirmation {
    pub assertion_id: U256,
    pub inbox_size: u64,
}

/// Serializable form of [`crate::RelayerState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub next_seq: u64,
    #[serde(default)]
    pub deposits: Vec<PendingDeposit>,
    #[serde(default)]
    pub withdrawals: Vec<PendingWithdrawal>,
    #[serde(default)]
    pub dead_letters: Vec<DeadLetter>,
    #[serde(default)]
    pub l2_block_number_mapping: Vec<L2BlockNumberMappingEntry>,
    #[serde(default)]
    pub assertions: Vec<PendingAssertion>,
    #[serde(default)]
    pub deferred_confirmation: Option<DeferredConfirmation>,
    pub last_sent_l1_oracle_block_number: Option<u64>,
    pub last_updated_l1_oracle_block_number: Option<u64>,
    pub last_confirmed_assertion: Option<ConfirmedAssertion>,
    pub last_confirmed_l2_block_number: Option<u64>,
    pub last_confirmed_inbox_size: Option<u64>,
    #[serde(default)]
    pub stream_cursors: BTreeMap<String, u64>,
}

impl StateSnapshot {
    /// Load a snapshot; `Ok(None)` if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, SnapshotError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write the snapshot, replacing any previous one atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        let contents = serde_json::to_vec_pretty(self)?;
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }
}
