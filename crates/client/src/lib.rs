//! HTTP providers and local transaction signing for both chains.

use alloy_consensus::TxEnvelope;
use alloy_network::{eip2718::Encodable2718, Ethereum, EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes};
use alloy_provider::{PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use std::{future::Future, pin::Pin, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;

/// Signs a transaction request and returns the EIP-2718 encoded transaction.
pub type SignerFn = Arc<
    dyn Fn(TransactionRequest) -> Pin<Box<dyn Future<Output = eyre::Result<Bytes>> + Send>>
        + Send
        + Sync,
>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Error parsing or validating URLs
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    /// Error with private key
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Create a read-only HTTP provider.
pub fn create_provider(rpc_url: &str) -> Result<impl Provider + Clone, ClientError> {
    let url = rpc_url
        .parse()
        .map_err(|e| ClientError::InvalidUrl(format!("{}", e)))?;

    Ok(ProviderBuilder::new().connect_http(url))
}

fn parse_private_key(private_key: &str) -> Result<PrivateKeySigner, ClientError> {
    private_key
        .parse()
        .map_err(|e| ClientError::InvalidPrivateKey(format!("{}", e)))
}

/// Address controlled by `private_key`.
pub fn signer_address(private_key: &str) -> Result<Address, ClientError> {
    Ok(parse_private_key(private_key)?.address())
}

/// Create a SignerFn from a local private key and provider.
///
/// The provider fills nonce, fees and gas before the request is signed with
/// the key. Each chain gets its own SignerFn since nonces are per chain.
pub fn local_signer_fn<P>(
    private_key: &str,
    chain_id: u64,
    provider: P,
) -> Result<SignerFn, ClientError>
where
    P: Provider + Clone + 'static,
{
    let signer = parse_private_key(private_key)?;
    let from_address = signer.address();
    let wallet = EthereumWallet::from(signer);

    Ok(Arc::new(move |tx: TransactionRequest| {
        let wallet = wallet.clone();
        let provider = provider.clone();
        Box::pin(async move {
            let filled_tx = fill_transaction(tx, &provider, from_address, chain_id).await?;

            let tx_envelope: TxEnvelope = filled_tx
                .build(&wallet)
                .await
                .map_err(|e| eyre::eyre!("{}", e))?;

            let mut encoded = Vec::new();
            tx_envelope.encode_2718(&mut encoded);
            Ok(Bytes::from(encoded))
        })
    }))
}

/// Broadcasts transactions of one account, one at a time.
///
/// The signer reads the pending nonce, so filling, signing and
/// `eth_sendRawTransaction` run under a single lock; clones share it.
#[derive(Clone)]
pub struct TransactionSender {
    signer: SignerFn,
    lock: Arc<Mutex<()>>,
}

impl TransactionSender {
    pub fn new(signer: SignerFn) -> Self {
        Self {
            signer,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Sign `tx` and broadcast it. Returns once the node accepted it.
    pub async fn send<P>(
        &self,
        provider: &P,
        tx: TransactionRequest,
    ) -> eyre::Result<PendingTransactionBuilder<Ethereum>>
    where
        P: Provider,
    {
        let _guard = self.lock.lock().await;
        let signed_tx = (self.signer)(tx).await?;
        Ok(provider.send_raw_transaction(&signed_tx).await?)
    }
}

/// Fill missing transaction fields using the provider.
pub async fn fill_transaction<P>(
    mut tx: TransactionRequest,
    provider: &P,
    from: Address,
    chain_id: u64,
) -> eyre::Result<TransactionRequest>
where
    P: Provider,
{
    tx.from.get_or_insert(from);
    tx.chain_id.get_or_insert(chain_id);

    if tx.nonce.is_none() {
        // Pending count; concurrent callers go through TransactionSender
        let nonce = provider.get_transaction_count(from).pending().await?;
        tx.nonce = Some(nonce);
    }

    // Fees before gas estimation, which may depend on them
    if tx.max_fee_per_gas.is_none() || tx.max_priority_fee_per_gas.is_none() {
        let fee_estimate = provider.estimate_eip1559_fees().await?;
        tx.max_fee_per_gas.get_or_insert(fee_estimate.max_fee_per_gas);
        tx.max_priority_fee_per_gas
            .get_or_insert(fee_estimate.max_priority_fee_per_gas);
    }

    if tx.gas.is_none() {
        let gas_estimate = provider.estimate_gas(tx.clone()).await?;
        // 20% headroom; proof verification cost varies with trie depth
        tx.gas = Some(gas_estimate + gas_estimate / 5);
    }

    Ok(tx)
}
