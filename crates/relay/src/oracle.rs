//! L1 oracle update loop.

use crate::{metrics, SharedState};
use messenger::{ChainReader, Messenger};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Push the latest L1 header to the L2 oracle every `interval_blocks` L1 blocks.
pub async fn run_oracle_updates<C>(
    state: SharedState,
    client: C,
    interval_blocks: u64,
    poll_interval: Duration,
) where
    C: Messenger + ChainReader,
{
    info!(interval_blocks, "Oracle update loop started");
    loop {
        if let Err(e) = update_oracle_once(&state, &client, interval_blocks).await {
            warn!(error = %e, "L1 oracle update failed");
        }
        sleep(poll_interval).await;
    }
}

/// Submit the latest L1 header if the throttle allows it.
///
/// Returns the submitted L1 block number. The sent cursor only moves once the
/// oracle transaction is included; the updated cursor moves when the oracle's
/// event is ingested.
pub async fn update_oracle_once<C>(
    state: &SharedState,
    client: &C,
    interval_blocks: u64,
) -> eyre::Result<Option<u64>>
where
    C: Messenger + ChainReader,
{
    let header = client.latest_l1_header().await?;

    let should_send = state
        .lock()
        .await
        .should_send_l1_oracle_values(header.number, interval_blocks);
    if !should_send {
        debug!(l1_block_number = header.number, "Oracle update throttled");
        return Ok(None);
    }

    client
        .set_l1_oracle_values(header.number, header.state_root)
        .await?;

    state.lock().await.sent_l1_oracle_values(header.number);
    metrics::record_oracle_update();

    Ok(Some(header.number))
}
