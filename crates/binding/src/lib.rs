//! Contract bindings for the bridge contracts the relayer talks to.
//!
//! - Portals on both chains (message initiation and finalization)
//! - Sequencer inbox and rollup on L1 (batch and assertion progress)
//! - L1 oracle on L2 (mirrored L1 block number and state root)
//!
//! All bindings are generated using alloy's `sol!` macro.

pub mod oracle;
pub mod portal;
pub mod rollup;

pub use portal::CrossDomainMessage;
