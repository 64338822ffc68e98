//! Event stream subscriptions.
//!
//! Each `on_*` call spawns one poller task for a single contract event. The
//! poller resolves the chain head, scans `[next_block, head]` in chunks and
//! sends the decoded events of a chunk, in log order, into the given bounded
//! channel. A chunk is sent only once it is fully decoded, followed by a
//! [`RelayerEvent::StreamProgress`] marker carrying the next block to scan.

use crate::{
    calldata::last_l2_block_number_from_append_tx_batch_calldata, hash::compute_message_hash,
};
use alloy_consensus::Transaction as _;
use alloy_primitives::{B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::Log;
use binding::{
    oracle::IL1Oracle,
    portal::{IL1Portal, IL2Portal},
    rollup::{IRollup, ISequencerInbox},
    CrossDomainMessage,
};
use config::NetworkConfig;
use eyre::eyre;
use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, error, info, warn};

/// Log range per `eth_getLogs` request (500 block margin under common RPC limits).
pub const DEFAULT_CHUNK_SIZE: u64 = 9_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    L1,
    L2,
}

/// A contract event the relayer follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventStream {
    DepositInitiated,
    WithdrawalInitiated,
    DepositFinalized,
    WithdrawalFinalized,
    TxBatchAppended,
    AssertionCreated,
    AssertionConfirmed,
    L1OracleValuesUpdated,
}

impl EventStream {
    pub const ALL: [Self; 8] = [
        Self::DepositInitiated,
        Self::WithdrawalInitiated,
        Self::DepositFinalized,
        Self::WithdrawalFinalized,
        Self::TxBatchAppended,
        Self::AssertionCreated,
        Self::AssertionConfirmed,
        Self::L1OracleValuesUpdated,
    ];

    /// Stable name, used as the stream cursor key in snapshots.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DepositInitiated => "DepositInitiated",
            Self::WithdrawalInitiated => "WithdrawalInitiated",
            Self::DepositFinalized => "DepositFinalized",
            Self::WithdrawalFinalized => "WithdrawalFinalized",
            Self::TxBatchAppended => "TxBatchAppended",
            Self::AssertionCreated => "AssertionCreated",
            Self::AssertionConfirmed => "AssertionConfirmed",
            Self::L1OracleValuesUpdated => "L1OracleValuesUpdated",
        }
    }

    /// Chain the emitting contract lives on.
    pub const fn chain(self) -> Chain {
        match self {
            Self::DepositInitiated
            | Self::WithdrawalFinalized
            | Self::TxBatchAppended
            | Self::AssertionCreated
            | Self::AssertionConfirmed => Chain::L1,
            Self::WithdrawalInitiated | Self::DepositFinalized | Self::L1OracleValuesUpdated => {
                Chain::L2
            }
        }
    }
}

impl std::fmt::Display for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded chain event, as consumed by the relayer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayerEvent {
    DepositInitiated {
        l1_block_number: u64,
        deposit_hash: B256,
        deposit_tx: CrossDomainMessage,
    },
    WithdrawalInitiated {
        l2_block_number: u64,
        withdrawal_hash: B256,
        withdrawal_tx: CrossDomainMessage,
    },
    DepositFinalized {
        deposit_hash: B256,
        success: bool,
    },
    WithdrawalFinalized {
        withdrawal_hash: B256,
        success: bool,
    },
    /// A batch covering L2 blocks up to `l2_block_number` grew the inbox to `inbox_size`.
    TxBatchAppended {
        l2_block_number: u64,
        inbox_size: u64,
    },
    AssertionCreated {
        assertion_id: U256,
        l2_gas_used: U256,
        vm_hash: B256,
    },
    AssertionConfirmed {
        assertion_id: U256,
        inbox_size: u64,
    },
    L1OracleValuesUpdated {
        block_number: u64,
        state_root: B256,
    },
    /// Every event of `stream` below `next_block` has been delivered.
    StreamProgress {
        stream: EventStream,
        next_block: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between head checks once a poller caught up
    pub poll_interval: Duration,
    /// Blocks per log query
    pub chunk_size: u64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Decode a `DepositInitiated` log, skipping it if the emitted hash is wrong.
pub fn deposit_initiated(
    event: IL1Portal::DepositInitiated,
    l1_block_number: u64,
) -> Option<RelayerEvent> {
    let deposit_tx = CrossDomainMessage {
        nonce: event.nonce,
        sender: event.sender,
        target: event.target,
        value: event.value,
        gasLimit: event.gasLimit,
        data: event.data,
    };

    let computed_hash = compute_message_hash(&deposit_tx);
    if computed_hash != event.depositHash {
        error!(
            block = l1_block_number,
            computed_hash = %computed_hash,
            deposit_hash = %event.depositHash,
            "Deposit hash mismatch, skipping event"
        );
        return None;
    }

    Some(RelayerEvent::DepositInitiated {
        l1_block_number,
        deposit_hash: event.depositHash,
        deposit_tx,
    })
}

/// Decode a `WithdrawalInitiated` log, skipping it if the emitted hash is wrong.
pub fn withdrawal_initiated(
    event: IL2Portal::WithdrawalInitiated,
    l2_block_number: u64,
) -> Option<RelayerEvent> {
    let withdrawal_tx = CrossDomainMessage {
        nonce: event.nonce,
        sender: event.sender,
        target: event.target,
        value: event.value,
        gasLimit: event.gasLimit,
        data: event.data,
    };

    let computed_hash = compute_message_hash(&withdrawal_tx);
    if computed_hash != event.withdrawalHash {
        error!(
            block = l2_block_number,
            computed_hash = %computed_hash,
            withdrawal_hash = %event.withdrawalHash,
            "Withdrawal hash mismatch, skipping event"
        );
        return None;
    }

    Some(RelayerEvent::WithdrawalInitiated {
        l2_block_number,
        withdrawal_hash: event.withdrawalHash,
        withdrawal_tx,
    })
}

fn to_u64(value: U256, field: &str) -> eyre::Result<u64> {
    value
        .try_into()
        .map_err(|_| eyre!("{} {} does not fit in u64", field, value))
}

fn log_block_number(log: &Log) -> eyre::Result<u64> {
    log.block_number
        .ok_or_else(|| eyre!("Log without block number (pending log)"))
}

/// Spawns log pollers for the relayer's event streams.
#[derive(Clone)]
pub struct EventSubscriber<P1, P2> {
    l1_provider: P1,
    l2_provider: P2,
    network: NetworkConfig,
    options: PollOptions,
}

impl<P1, P2> EventSubscriber<P1, P2>
where
    P1: Provider + Clone + 'static,
    P2: Provider + Clone + 'static,
{
    pub const fn new(
        l1_provider: P1,
        l2_provider: P2,
        network: NetworkConfig,
        options: PollOptions,
    ) -> Self {
        Self {
            l1_provider,
            l2_provider,
            network,
            options,
        }
    }

    pub fn on_inbox_tx_batch_append(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::TxBatchAppended, from_block, sink)
    }

    pub fn on_assertion_created(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::AssertionCreated, from_block, sink)
    }

    pub fn on_assertion_confirmed(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::AssertionConfirmed, from_block, sink)
    }

    pub fn on_l1_oracle_values_updated(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::L1OracleValuesUpdated, from_block, sink)
    }

    pub fn on_deposit_initiated(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::DepositInitiated, from_block, sink)
    }

    pub fn on_withdrawal_initiated(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::WithdrawalInitiated, from_block, sink)
    }

    pub fn on_deposit_finalized(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::DepositFinalized, from_block, sink)
    }

    pub fn on_withdrawal_finalized(
        &self,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        self.subscribe(EventStream::WithdrawalFinalized, from_block, sink)
    }

    /// Spawn the poller for `stream`, starting at `from_block`.
    ///
    /// The task ends when the receiving side of `sink` is dropped.
    pub fn subscribe(
        &self,
        stream: EventStream,
        from_block: u64,
        sink: mpsc::Sender<RelayerEvent>,
    ) -> JoinHandle<()> {
        let subscriber = self.clone();
        tokio::spawn(async move { subscriber.poll(stream, from_block, sink).await })
    }

    async fn poll(self, stream: EventStream, from_block: u64, sink: mpsc::Sender<RelayerEvent>) {
        info!(stream = %stream, from_block, "Event poller started");
        let mut next_block = from_block;

        loop {
            let head = match self.head(stream.chain()).await {
                Ok(head) => head,
                Err(e) => {
                    warn!(stream = %stream, error = %e, "Failed to get chain head");
                    sleep(self.options.poll_interval).await;
                    continue;
                }
            };

            while next_block <= head {
                let chunk_end = next_block
                    .saturating_add(self.options.chunk_size.max(1) - 1)
                    .min(head);

                let events = match self.scan_chunk_with_retry(stream, next_block, chunk_end).await {
                    Ok(events) => events,
                    Err(e) => {
                        error!(
                            stream = %stream,
                            from = next_block,
                            to = chunk_end,
                            error = %e,
                            "Chunk scan failed after retries, will rescan"
                        );
                        break;
                    }
                };

                if !events.is_empty() {
                    debug!(stream = %stream, from = next_block, to = chunk_end, count = events.len(), "Delivering events");
                }
                for event in events {
                    if sink.send(event).await.is_err() {
                        debug!(stream = %stream, "Event sink closed, poller exiting");
                        return;
                    }
                }

                next_block = chunk_end + 1;
                let progress = RelayerEvent::StreamProgress { stream, next_block };
                if sink.send(progress).await.is_err() {
                    debug!(stream = %stream, "Event sink closed, poller exiting");
                    return;
                }
            }

            sleep(self.options.poll_interval).await;
        }
    }

    async fn head(&self, chain: Chain) -> eyre::Result<u64> {
        let head = match chain {
            Chain::L1 => self.l1_provider.get_block_number().await?,
            Chain::L2 => self.l2_provider.get_block_number().await?,
        };
        Ok(head)
    }

    /// Scan a single chunk with retry and exponential backoff.
    async fn scan_chunk_with_retry(
        &self,
        stream: EventStream,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<RelayerEvent>> {
        // 100ms, 200ms, 400ms, 800ms, 1.6s
        let retry_strategy = ExponentialBackoff::from_millis(100).take(5);

        Retry::spawn(retry_strategy, || async {
            self.scan_chunk(stream, from_block, to_block)
                .await
                .inspect_err(|e| {
                    warn!(
                        stream = %stream,
                        from = from_block,
                        to = to_block,
                        error = %e,
                        "Chunk scan failed, will retry"
                    );
                })
        })
        .await
    }

    async fn scan_chunk(
        &self,
        stream: EventStream,
        from_block: u64,
        to_block: u64,
    ) -> eyre::Result<Vec<RelayerEvent>> {
        let network = &self.network;
        let mut out = Vec::new();

        match stream {
            EventStream::DepositInitiated => {
                let portal = IL1Portal::new(network.l1.portal, &self.l1_provider);
                let logs = portal
                    .DepositInitiated_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                for (event, log) in logs {
                    out.extend(deposit_initiated(event, log_block_number(&log)?));
                }
            }
            EventStream::WithdrawalInitiated => {
                let portal = IL2Portal::new(network.l2.portal, &self.l2_provider);
                let logs = portal
                    .WithdrawalInitiated_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                for (event, log) in logs {
                    out.extend(withdrawal_initiated(event, log_block_number(&log)?));
                }
            }
            EventStream::DepositFinalized => {
                let portal = IL2Portal::new(network.l2.portal, &self.l2_provider);
                let logs = portal
                    .DepositFinalized_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                out.extend(logs.into_iter().map(|(event, _)| RelayerEvent::DepositFinalized {
                    deposit_hash: event.depositHash,
                    success: event.success,
                }));
            }
            EventStream::WithdrawalFinalized => {
                let portal = IL1Portal::new(network.l1.portal, &self.l1_provider);
                let logs = portal
                    .WithdrawalFinalized_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                out.extend(logs.into_iter().map(|(event, _)| RelayerEvent::WithdrawalFinalized {
                    withdrawal_hash: event.withdrawalHash,
                    success: event.success,
                }));
            }
            EventStream::TxBatchAppended => {
                let inbox = ISequencerInbox::new(network.l1.sequencer_inbox, &self.l1_provider);
                let logs = inbox
                    .TxBatchAppended_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                for (event, log) in logs {
                    let inbox_size = to_u64(event.endTxNumber, "inbox size")?;
                    if let Some(l2_block_number) = self.batch_l2_block_number(&log).await? {
                        out.push(RelayerEvent::TxBatchAppended {
                            l2_block_number,
                            inbox_size,
                        });
                    }
                }
            }
            EventStream::AssertionCreated => {
                let rollup = IRollup::new(network.l1.rollup, &self.l1_provider);
                let logs = rollup
                    .AssertionCreated_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                out.extend(logs.into_iter().map(|(event, _)| RelayerEvent::AssertionCreated {
                    assertion_id: event.assertionID,
                    l2_gas_used: event.l2GasUsed,
                    vm_hash: event.vmHash,
                }));
            }
            EventStream::AssertionConfirmed => {
                let rollup = IRollup::new(network.l1.rollup, &self.l1_provider);
                let logs = rollup
                    .AssertionConfirmed_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                for (event, _) in logs {
                    let inbox_size = rollup.getInboxSize(event.assertionID).call().await?;
                    out.push(RelayerEvent::AssertionConfirmed {
                        assertion_id: event.assertionID,
                        inbox_size: to_u64(inbox_size, "inbox size")?,
                    });
                }
            }
            EventStream::L1OracleValuesUpdated => {
                let oracle = IL1Oracle::new(network.l2.l1_oracle, &self.l2_provider);
                let logs = oracle
                    .L1OracleValuesUpdated_filter()
                    .from_block(from_block)
                    .to_block(to_block)
                    .query()
                    .await?;
                for (event, _) in logs {
                    out.push(RelayerEvent::L1OracleValuesUpdated {
                        block_number: to_u64(event.blockNumber, "L1 block number")?,
                        state_root: event.stateRoot,
                    });
                }
            }
        }

        Ok(out)
    }

    /// Last L2 block of the batch appended by the transaction that emitted `log`.
    ///
    /// `Ok(None)` if the transaction is not a direct `appendTxBatch` call.
    async fn batch_l2_block_number(&self, log: &Log) -> eyre::Result<Option<u64>> {
        let tx_hash = log
            .transaction_hash
            .ok_or_else(|| eyre!("TxBatchAppended log without transaction hash"))?;

        let tx = self
            .l1_provider
            .get_transaction_by_hash(tx_hash)
            .await?
            .ok_or_else(|| eyre!("Transaction not found: {}", tx_hash))?;

        match last_l2_block_number_from_append_tx_batch_calldata(tx.input()) {
            Ok(l2_block_number) => Ok(Some(l2_block_number)),
            Err(e) => {
                error!(tx_hash = %tx_hash, error = %e, "Cannot decode batch calldata, skipping batch");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes};

    fn deposit_event(value: U256) -> IL1Portal::DepositInitiated {
        let tx = CrossDomainMessage {
            nonce: U256::MAX - U256::from(1),
            sender: Address::from([0x11; 20]),
            target: Address::from([0x22; 20]),
            value,
            gasLimit: U256::from(2).pow(U256::from(200)),
            data: Bytes::from(vec![0xca, 0xfe]),
        };
        IL1Portal::DepositInitiated {
            nonce: tx.nonce,
            sender: tx.sender,
            target: tx.target,
            value: tx.value,
            gasLimit: tx.gasLimit,
            depositHash: compute_message_hash(&tx),
            data: tx.data,
        }
    }

    #[test]
    fn test_deposit_fields_keep_full_precision() {
        let value = U256::from(10).pow(U256::from(40)) + U256::from(7);
        let event = deposit_event(value);
        let expected_hash = event.depositHash;

        let Some(RelayerEvent::DepositInitiated {
            l1_block_number,
            deposit_hash,
            deposit_tx,
        }) = deposit_initiated(event, 42)
        else {
            panic!("expected a deposit event");
        };

        assert_eq!(l1_block_number, 42);
        assert_eq!(deposit_hash, expected_hash);
        assert_eq!(deposit_tx.value, value);
        assert_eq!(deposit_tx.nonce, U256::MAX - U256::from(1));
        assert_eq!(deposit_tx.gasLimit, U256::from(2).pow(U256::from(200)));
        assert_eq!(deposit_tx.data, Bytes::from(vec![0xca, 0xfe]));
    }

    #[test]
    fn test_deposit_hash_mismatch_is_skipped() {
        let mut event = deposit_event(U256::from(1));
        event.depositHash = B256::from([0xff; 32]);

        assert!(deposit_initiated(event, 1).is_none());
    }

    #[test]
    fn test_withdrawal_hash_checked() {
        let tx = CrossDomainMessage {
            nonce: U256::from(3),
            sender: Address::from([0x33; 20]),
            target: Address::from([0x44; 20]),
            value: U256::from(5),
            gasLimit: U256::from(21_000),
            data: Bytes::new(),
        };
        let event = IL2Portal::WithdrawalInitiated {
            nonce: tx.nonce,
            sender: tx.sender,
            target: tx.target,
            value: tx.value,
            gasLimit: tx.gasLimit,
            data: tx.data.clone(),
            withdrawalHash: compute_message_hash(&tx),
        };

        let mut tampered = event.clone();
        tampered.value = U256::from(6);

        assert!(matches!(
            withdrawal_initiated(event, 9),
            Some(RelayerEvent::WithdrawalInitiated { l2_block_number: 9, .. })
        ));
        assert!(withdrawal_initiated(tampered, 9).is_none());
    }

    #[test]
    fn test_stream_names_are_unique() {
        let mut names: Vec<&str> = EventStream::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EventStream::ALL.len());
    }

    #[test]
    fn test_stream_chains() {
        assert_eq!(EventStream::DepositInitiated.chain(), Chain::L1);
        assert_eq!(EventStream::TxBatchAppended.chain(), Chain::L1);
        assert_eq!(EventStream::WithdrawalInitiated.chain(), Chain::L2);
        assert_eq!(EventStream::L1OracleValuesUpdated.chain(), Chain::L2);
    }

    #[test]
    fn test_to_u64_rejects_overflow() {
        assert_eq!(to_u64(U256::from(5), "x").unwrap(), 5);
        assert!(to_u64(U256::MAX, "x").is_err());
    }
}
