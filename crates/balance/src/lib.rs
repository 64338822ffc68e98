//! Native balance queries.
//!
//! Used by deposit funding: a deposit is only relayed on request when its
//! target holds less than a configured threshold on L2.

pub mod monitor;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::future::Future;

pub use monitor::BalanceMonitor;

/// Native balance of an account at the time of the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub holder: Address,
    pub amount: U256,
}

impl Balance {
    /// Whether the balance is strictly below `threshold`.
    pub fn is_below(&self, threshold: U256) -> bool {
        self.amount < threshold
    }
}

/// Source of native balances.
pub trait Monitor: Send + Sync {
    fn native_balance(&self, holder: Address) -> impl Future<Output = eyre::Result<Balance>> + Send;
}
