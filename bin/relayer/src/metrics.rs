//! Prometheus metrics for the relayer.
//!
//! The loops record through the `metrics` facade using the names in
//! [`relay::metrics`]; this module describes them and installs the exporter.

use metrics::{describe_counter, describe_gauge};
use relay::metrics as names;

/// Register metric descriptions with the global registry.
pub fn register_descriptions() {
    describe_counter!(
        names::FINALIZED_TOTAL,
        "Messages finalized on the counterpart chain, by kind"
    );
    describe_counter!(
        names::FINALIZE_FAILURES_TOTAL,
        "Failed proof or finalization attempts, by kind"
    );
    describe_counter!(
        names::DEAD_LETTERS_TOTAL,
        "Messages that exhausted their retry budget, by kind"
    );
    describe_counter!(
        names::ORACLE_UPDATES_TOTAL,
        "L1 oracle updates submitted to L2"
    );
    describe_counter!(names::EVENTS_TOTAL, "Chain events ingested, by stream");

    describe_gauge!(
        names::PENDING_MESSAGES,
        "Messages waiting for finalization, by kind"
    );
    describe_gauge!(
        names::PENDING_CHECKPOINTS,
        "L2 block number checkpoints awaiting confirmation"
    );
    describe_gauge!(
        names::L1_ORACLE_BLOCK,
        "L1 block number last stored in the L2 oracle"
    );
    describe_gauge!(
        names::CONFIRMED_L2_BLOCK,
        "Last L2 block covered by a confirmed assertion"
    );
}

/// Install the Prometheus metrics exporter and start the HTTP server.
///
/// Returns an error if the server fails to bind to the specified port.
pub fn install_prometheus_exporter(port: u16) -> eyre::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::net::SocketAddr;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| eyre::eyre!("Failed to install Prometheus exporter: {}", e))?;

    register_descriptions();

    Ok(())
}
