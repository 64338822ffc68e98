use clap::Parser;
use relayer::{config::Config, metrics::install_prometheus_exporter, Relayer};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "relayer")]
#[command(about = "Relay deposits and withdrawals between L1 and the L2 rollup")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "relayer.toml")]
    config: PathBuf,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;

    info!(
        config = %cli.config.display(),
        l1_rpc_url = %config.l1_rpc_url,
        l2_rpc_url = %config.l2_rpc_url,
        snapshot = %config.snapshot.path.display(),
        "Loaded config"
    );

    if let Some(port) = config.metrics_port {
        install_prometheus_exporter(port)?;
        info!(port, "Prometheus exporter listening");
    }

    let relayer = Relayer::start(&config, &cli.private_key)?;

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    relayer.shutdown(&config.snapshot.path).await
}
