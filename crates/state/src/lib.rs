//! In-memory model of the relayer's pending work and confirmation progress.
//!
//! [`RelayerState`] owns the deposit and withdrawal queues, the L2 block number
//! checkpoints derived from batch appends, the assertion records and every
//! cursor that gates finalization. It has no I/O of its own; callers share it
//! behind a mutex and persist it through [`snapshot`].

pub mod queue;
pub mod relayer;
pub mod snapshot;
pub mod types;

pub use relayer::{Confirmation, ReadyDeposit, ReadyWithdrawal, RelayerState};
pub use snapshot::{SnapshotError, StateSnapshot};
pub use types::{
    AssertionRecord, ConfirmedAssertion, DeadLetter, L2BlockNumberMappingEntry, MessageHash,
    MessageKind, PendingDeposit, PendingWithdrawal, RetryState,
};
