//! Handle one deposit funding request.
//!
//! Reads a JSON `FundDepositRequest` from a file (or stdin with `-`) and
//! prints the JSON response `{ "status": .., "body": .. }`. Exits non-zero
//! unless the deposit was finalized.

use alloy_primitives::TxHash;
use balance::BalanceMonitor;
use clap::Parser;
use messenger::PortalMessenger;
use relayer::{
    config::Config,
    funding::{fund_deposit, FundDepositRequest, FundDepositResponse, FundingError},
};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "fund-deposit")]
#[command(about = "Finalize a single deposit for an underfunded L2 account")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "relayer.toml")]
    config: PathBuf,

    /// Private key for signing transactions (hex string, with or without 0x prefix)
    #[arg(short = 'k', long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: String,

    /// Request JSON file, `-` for stdin
    #[arg(default_value = "-")]
    request: String,
}

async fn read_request(source: &str) -> eyre::Result<FundDepositRequest> {
    let contents = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(source).await?
    };

    Ok(serde_json::from_str(&contents)?)
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    let network = config.network.clone();

    let l1_provider = client::create_provider(&config.l1_rpc_url)?;
    let l2_provider = client::create_provider(&config.l2_rpc_url)?;
    let l1_signer = client::local_signer_fn(&cli.private_key, network.l1.chain_id, l1_provider.clone())?;
    let l2_signer = client::local_signer_fn(&cli.private_key, network.l2.chain_id, l2_provider.clone())?;

    let monitor = BalanceMonitor::new(l2_provider.clone());
    let messenger = PortalMessenger::new(l1_provider, l2_provider, l1_signer, l2_signer, network);

    let response: FundDepositResponse = match read_request(&cli.request).await {
        Ok(request) => fund_deposit(
            &request,
            &messenger,
            &monitor,
            config.funding.balance_threshold_wei,
        )
        .await
        .into(),
        Err(e) => FundDepositResponse::from(Err::<TxHash, _>(FundingError::InvalidField {
            field: "request",
            reason: e.to_string(),
        })),
    };

    println!("{}", serde_json::to_string(&response)?);

    if response.status != 200 {
        std::process::exit(1);
    }
    Ok(())
}
