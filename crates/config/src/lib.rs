//! Configuration types for the bridge relayer.
//!
//! This crate provides:
//! - Contract addresses for the L1 and L2 sides of the bridge
//! - L2 predeploy defaults
//! - Configuration loading and validation

pub mod network;

pub use network::{L1Config, L2Config, NetworkConfig, NetworkConfigBuilder, NetworkError};
