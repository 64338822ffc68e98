pub mod config;
pub mod funding;
pub mod metrics;

use crate::config::Config;
use messenger::{Chain, EventStream, EventSubscriber, PortalMessenger};
use relay::{
    merge_streams, run_checkpointer, run_event_consumer, run_oracle_updates, run_relay_deposits,
    run_relay_withdrawals, save_snapshot, SharedState,
};
use state::{RelayerState, StateSnapshot};
use std::{path::Path, time::Duration};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::info;

/// Restore the state from the snapshot at `path`, or start empty.
pub fn load_state(path: impl AsRef<Path>) -> eyre::Result<RelayerState> {
    let path = path.as_ref();
    match StateSnapshot::load(path)? {
        Some(snapshot) => {
            info!(
                path = %path.display(),
                deposits = snapshot.deposits.len(),
                withdrawals = snapshot.withdrawals.len(),
                dead_letters = snapshot.dead_letters.len(),
                "Restored state snapshot"
            );
            Ok(RelayerState::from_snapshot(snapshot))
        }
        None => {
            info!(path = %path.display(), "No state snapshot, starting empty");
            Ok(RelayerState::new())
        }
    }
}

/// First block to scan for `stream`: the persisted cursor, else the configured start.
pub fn start_block(state: &RelayerState, stream: EventStream, config: &Config) -> u64 {
    state.stream_cursor(stream.name()).unwrap_or(match stream.chain() {
        Chain::L1 => config.ingest.l1_start_block,
        Chain::L2 => config.ingest.l2_start_block,
    })
}

/// Running relayer: shared state plus every spawned task.
pub struct Relayer {
    pub state: SharedState,
    tasks: Vec<JoinHandle<()>>,
}

impl Relayer {
    /// Connect to both chains and spawn ingestion, relay, oracle and checkpoint tasks.
    pub fn start(config: &Config, private_key: &str) -> eyre::Result<Self> {
        config.validate()?;
        let network = config.network.clone();

        let l1_provider = client::create_provider(&config.l1_rpc_url)?;
        let l2_provider = client::create_provider(&config.l2_rpc_url)?;

        let l1_signer =
            client::local_signer_fn(private_key, network.l1.chain_id, l1_provider.clone())?;
        let l2_signer =
            client::local_signer_fn(private_key, network.l2.chain_id, l2_provider.clone())?;

        info!(
            relayer = %client::signer_address(private_key)?,
            l1_portal = %network.l1.portal,
            l2_portal = %network.l2.portal,
            rollup = %network.l1.rollup,
            "Starting relayer"
        );

        let messenger = PortalMessenger::new(
            l1_provider.clone(),
            l2_provider.clone(),
            l1_signer,
            l2_signer,
            network.clone(),
        );
        let subscriber =
            EventSubscriber::new(l1_provider, l2_provider, network, config.poll_options());

        let state = load_state(&config.snapshot.path)?;

        let capacity = config.ingest.channel_capacity;
        let mut tasks = Vec::new();
        let mut receivers = Vec::new();
        for stream in EventStream::ALL {
            let from_block = start_block(&state, stream, config);
            let (tx, rx) = mpsc::channel(capacity);
            tasks.push(subscriber.subscribe(stream, from_block, tx));
            receivers.push(rx);
        }

        let state = relay::shared(state);

        let (events, forwarders) = merge_streams(receivers, capacity);
        tasks.extend(forwarders);
        tasks.push(tokio::spawn(run_event_consumer(state.clone(), events)));

        let options = config.relay_options();
        tasks.push(tokio::spawn(run_relay_deposits(
            state.clone(),
            messenger.clone(),
            options,
        )));
        tasks.push(tokio::spawn(run_relay_withdrawals(
            state.clone(),
            messenger.clone(),
            options,
        )));

        if config.oracle.enabled {
            tasks.push(tokio::spawn(run_oracle_updates(
                state.clone(),
                messenger,
                config.oracle.interval_blocks,
                config.oracle_poll_interval(),
            )));
        }

        tasks.push(tokio::spawn(run_checkpointer(
            state.clone(),
            config.snapshot.path.clone(),
            Duration::from_secs(config.snapshot.interval_secs.max(1)),
        )));

        Ok(Self { state, tasks })
    }

    /// Abort every task and write a final snapshot.
    pub async fn shutdown(self, snapshot_path: &Path) -> eyre::Result<()> {
        for task in &self.tasks {
            task.abort();
        }
        save_snapshot(&self.state, snapshot_path.to_path_buf()).await?;
        info!(path = %snapshot_path.display(), "Final state snapshot written");

        Ok(())
    }
}
