//! alloy-backed [`Messenger`] and [`ChainReader`].

use crate::{proof::fetch_message_proof, ChainReader, L1Header, MessageProof, Messenger, Receipt};
use alloy_primitives::{B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::{BlockNumberOrTag, TransactionRequest};
use binding::{
    oracle::IL1Oracle,
    portal::{IL1Portal, IL2Portal},
    CrossDomainMessage,
};
use client::{SignerFn, TransactionSender};
use config::NetworkConfig;
use eyre::eyre;
use tracing::{debug, info};

/// Messenger submitting signed transactions through HTTP providers.
///
/// Clones share one sender per chain, so loops submitting from the same
/// account never race on its nonce.
#[derive(Clone)]
pub struct PortalMessenger<P1, P2> {
    l1_provider: P1,
    l2_provider: P2,
    l1_sender: TransactionSender,
    l2_sender: TransactionSender,
    network: NetworkConfig,
}

impl<P1, P2> PortalMessenger<P1, P2>
where
    P1: Provider + Clone,
    P2: Provider + Clone,
{
    pub fn new(
        l1_provider: P1,
        l2_provider: P2,
        l1_signer: SignerFn,
        l2_signer: SignerFn,
        network: NetworkConfig,
    ) -> Self {
        Self {
            l1_provider,
            l2_provider,
            l1_sender: TransactionSender::new(l1_signer),
            l2_sender: TransactionSender::new(l2_signer),
            network,
        }
    }

    pub const fn network(&self) -> &NetworkConfig {
        &self.network
    }
}

/// Sign, broadcast and wait for inclusion; a reverted receipt is an error.
async fn submit<P>(
    provider: &P,
    sender: &TransactionSender,
    tx_request: TransactionRequest,
    description: &str,
) -> eyre::Result<Receipt>
where
    P: Provider,
{
    let pending = sender.send(provider, tx_request).await?;
    debug!(tx_hash = %pending.tx_hash(), description, "Transaction broadcast");

    let receipt = pending.get_receipt().await?;
    if !receipt.status() {
        return Err(eyre!(
            "{} reverted in transaction {}",
            description,
            receipt.transaction_hash
        ));
    }

    Ok(Receipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
    })
}

impl<P1, P2> Messenger for PortalMessenger<P1, P2>
where
    P1: Provider + Clone,
    P2: Provider + Clone,
{
    async fn finalize_deposit(
        &self,
        deposit_tx: &CrossDomainMessage,
        proof: &MessageProof,
    ) -> eyre::Result<Receipt> {
        let portal = IL2Portal::new(self.network.l2.portal, &self.l2_provider);
        let tx_request = portal
            .finalizeDepositTransaction(
                deposit_tx.clone(),
                proof.account_proof.clone(),
                proof.storage_proof.clone(),
            )
            .into_transaction_request();

        let receipt = submit(&self.l2_provider, &self.l2_sender, tx_request, "finalizeDepositTransaction").await?;

        info!(
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            nonce = %deposit_tx.nonce,
            "Deposit finalized on L2"
        );

        Ok(receipt)
    }

    async fn finalize_withdrawal(
        &self,
        withdrawal_tx: &CrossDomainMessage,
        assertion_id: U256,
        l2_gas_used: U256,
        vm_hash: B256,
        proof: &MessageProof,
    ) -> eyre::Result<Receipt> {
        let portal = IL1Portal::new(self.network.l1.portal, &self.l1_provider);
        let tx_request = portal
            .finalizeWithdrawalTransaction(
                withdrawal_tx.clone(),
                assertion_id,
                l2_gas_used,
                vm_hash,
                proof.account_proof.clone(),
                proof.storage_proof.clone(),
            )
            .into_transaction_request();

        let receipt = submit(&self.l1_provider, &self.l1_sender, tx_request, "finalizeWithdrawalTransaction").await?;

        info!(
            tx_hash = %receipt.tx_hash,
            block_number = receipt.block_number,
            gas_used = receipt.gas_used,
            nonce = %withdrawal_tx.nonce,
            assertion_id = %assertion_id,
            "Withdrawal finalized on L1"
        );

        Ok(receipt)
    }

    async fn set_l1_oracle_values(&self, block_number: u64, state_root: B256) -> eyre::Result<Receipt> {
        let oracle = IL1Oracle::new(self.network.l2.l1_oracle, &self.l2_provider);
        let tx_request = oracle
            .setL1OracleValues(U256::from(block_number), state_root)
            .into_transaction_request();

        let receipt = submit(&self.l2_provider, &self.l2_sender, tx_request, "setL1OracleValues").await?;

        info!(
            tx_hash = %receipt.tx_hash,
            l1_block_number = block_number,
            state_root = %state_root,
            "L1 oracle values submitted"
        );

        Ok(receipt)
    }
}

impl<P1, P2> ChainReader for PortalMessenger<P1, P2>
where
    P1: Provider + Clone,
    P2: Provider + Clone,
{
    async fn deposit_proof(&self, deposit_hash: B256, l1_block_number: u64) -> eyre::Result<MessageProof> {
        fetch_message_proof(&self.l1_provider, self.network.l1.portal, deposit_hash, l1_block_number).await
    }

    async fn withdrawal_proof(
        &self,
        withdrawal_hash: B256,
        l2_block_number: u64,
    ) -> eyre::Result<MessageProof> {
        fetch_message_proof(&self.l2_provider, self.network.l2.portal, withdrawal_hash, l2_block_number).await
    }

    async fn latest_l1_header(&self) -> eyre::Result<L1Header> {
        let block = self
            .l1_provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
            .ok_or_else(|| eyre!("Failed to get latest L1 block"))?;

        Ok(L1Header {
            number: block.header.number,
            state_root: block.header.state_root,
        })
    }

    async fn l1_oracle_block_number(&self) -> eyre::Result<u64> {
        let oracle = IL1Oracle::new(self.network.l2.l1_oracle, &self.l2_provider);
        let number = oracle.number().call().await?;

        number
            .try_into()
            .map_err(|_| eyre!("L1 oracle block number {} does not fit in u64", number))
    }
}
