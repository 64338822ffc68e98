//! Deposit funding requests.
//!
//! A funding request asks the relayer to finalize one specific deposit right
//! away, for a target that cannot pay for it on L2 yet. The request carries the
//! deposit as observed on L1; it is validated, the target's L2 balance is
//! checked against the configured threshold, and the deposit is finalized
//! against the L1 block the oracle currently holds.

use alloy_primitives::{hex, Address, Bytes, TxHash, B256, U256};
use balance::Monitor;
use binding::CrossDomainMessage;
use messenger::{compute_message_hash, ChainReader, Messenger};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

/// Body of a funding request. Numbers are decimal strings, bytes are hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundDepositRequest {
    pub nonce: String,
    pub sender: String,
    pub target: String,
    pub value: String,
    pub gas_limit: String,
    pub data: String,
    pub deposit_hash: String,
}

#[derive(Error, Debug)]
pub enum FundingError {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("target {target} balance {balance} is not below the funding threshold {threshold}")]
    AboveThreshold {
        target: Address,
        balance: U256,
        threshold: U256,
    },

    #[error("{0}")]
    Internal(String),
}

impl FundingError {
    /// HTTP status code of the error.
    pub const fn status(&self) -> u16 {
        match self {
            Self::InvalidField { .. } | Self::AboveThreshold { .. } => 400,
            Self::Internal(_) => 500,
        }
    }

    fn invalid(field: &'static str, reason: impl ToString) -> Self {
        Self::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }
}

impl From<eyre::Report> for FundingError {
    fn from(e: eyre::Report) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Response of a funding request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundDepositResponse {
    pub status: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success {
        #[serde(rename = "txHash")]
        tx_hash: TxHash,
    },
    Failure {
        error: String,
    },
}

impl From<Result<TxHash, FundingError>> for FundDepositResponse {
    fn from(result: Result<TxHash, FundingError>) -> Self {
        match result {
            Ok(tx_hash) => Self {
                status: 200,
                body: ResponseBody::Success { tx_hash },
            },
            Err(e) => Self {
                status: e.status(),
                body: ResponseBody::Failure {
                    error: e.to_string(),
                },
            },
        }
    }
}

fn parse_decimal(field: &'static str, value: &str) -> Result<U256, FundingError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FundingError::invalid(field, "expected a decimal integer"));
    }
    U256::from_str_radix(value, 10).map_err(|e| FundingError::invalid(field, e))
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, FundingError> {
    if !value.starts_with("0x") {
        return Err(FundingError::invalid(field, "expected a 0x-prefixed address"));
    }
    Address::from_str(value).map_err(|e| FundingError::invalid(field, e))
}

impl FundDepositRequest {
    /// Parse every field and check the deposit hash against the message.
    pub fn validate(&self) -> Result<(B256, CrossDomainMessage), FundingError> {
        let deposit_tx = CrossDomainMessage {
            nonce: parse_decimal("nonce", &self.nonce)?,
            sender: parse_address("sender", &self.sender)?,
            target: parse_address("target", &self.target)?,
            value: parse_decimal("value", &self.value)?,
            gasLimit: parse_decimal("gasLimit", &self.gas_limit)?,
            data: hex::decode(&self.data)
                .map(Bytes::from)
                .map_err(|e| FundingError::invalid("data", e))?,
        };

        let hash_hex = self
            .deposit_hash
            .strip_prefix("0x")
            .ok_or_else(|| FundingError::invalid("depositHash", "expected a 0x-prefixed hex string"))?;
        if hash_hex.len() != 64 {
            return Err(FundingError::invalid(
                "depositHash",
                "expected 32 bytes of hex",
            ));
        }
        let deposit_hash =
            B256::from_str(hash_hex).map_err(|e| FundingError::invalid("depositHash", e))?;

        if compute_message_hash(&deposit_tx) != deposit_hash {
            return Err(FundingError::invalid(
                "depositHash",
                "does not match the deposit fields",
            ));
        }

        Ok((deposit_hash, deposit_tx))
    }
}

/// Handle a funding request end to end. Returns the finalization tx hash.
pub async fn fund_deposit<C, M>(
    request: &FundDepositRequest,
    client: &C,
    monitor: &M,
    threshold: U256,
) -> Result<TxHash, FundingError>
where
    C: Messenger + ChainReader,
    M: Monitor,
{
    let (deposit_hash, deposit_tx) = request.validate()?;

    let balance = monitor.native_balance(deposit_tx.target).await?;
    if !balance.is_below(threshold) {
        warn!(
            target = %deposit_tx.target,
            balance = %balance.amount,
            threshold = %threshold,
            "Funding refused, target balance at or above threshold"
        );
        return Err(FundingError::AboveThreshold {
            target: deposit_tx.target,
            balance: balance.amount,
            threshold,
        });
    }

    let oracle_block = client.l1_oracle_block_number().await?;
    let proof = client.deposit_proof(deposit_hash, oracle_block).await?;
    let receipt = client.finalize_deposit(&deposit_tx, &proof).await?;

    info!(
        deposit_hash = %deposit_hash,
        target = %deposit_tx.target,
        tx_hash = %receipt.tx_hash,
        "Deposit funded"
    );

    Ok(receipt.tx_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> FundDepositRequest {
        let tx = CrossDomainMessage {
            nonce: U256::from(7),
            sender: Address::from([0x01; 20]),
            target: Address::from([0x02; 20]),
            value: U256::from(10).pow(U256::from(18)),
            gasLimit: U256::from(200_000),
            data: Bytes::from(vec![0x12, 0x34]),
        };
        FundDepositRequest {
            nonce: "7".to_string(),
            sender: tx.sender.to_string(),
            target: tx.target.to_string(),
            value: "1000000000000000000".to_string(),
            gas_limit: "200000".to_string(),
            data: "0x1234".to_string(),
            deposit_hash: compute_message_hash(&tx).to_string(),
        }
    }

    fn invalid_field(request: &FundDepositRequest) -> &'static str {
        match request.validate() {
            Err(FundingError::InvalidField { field, .. }) => field,
            other => panic!("expected an invalid field, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request() {
        let (hash, tx) = valid_request().validate().unwrap();
        assert_eq!(tx.value, U256::from(10).pow(U256::from(18)));
        assert_eq!(hash, compute_message_hash(&tx));
    }

    #[test]
    fn test_each_field_is_checked() {
        let mut request = valid_request();
        request.nonce = "0x07".to_string();
        assert_eq!(invalid_field(&request), "nonce");

        let mut request = valid_request();
        request.value = "-1".to_string();
        assert_eq!(invalid_field(&request), "value");

        let mut request = valid_request();
        request.gas_limit = String::new();
        assert_eq!(invalid_field(&request), "gasLimit");

        let mut request = valid_request();
        request.sender = "0x1234".to_string();
        assert_eq!(invalid_field(&request), "sender");

        let mut request = valid_request();
        request.target = "0202020202020202020202020202020202020202".to_string();
        assert_eq!(invalid_field(&request), "target");

        let mut request = valid_request();
        request.data = "0xzz".to_string();
        assert_eq!(invalid_field(&request), "data");

        let mut request = valid_request();
        request.deposit_hash = "0x1234".to_string();
        assert_eq!(invalid_field(&request), "depositHash");

        let mut request = valid_request();
        request.deposit_hash = format!("0x{}", "ab".repeat(32));
        assert_eq!(invalid_field(&request), "depositHash");
    }

    #[test]
    fn test_decimal_overflow_rejected() {
        let mut request = valid_request();
        request.value = "9".repeat(80);
        assert_eq!(invalid_field(&request), "value");
    }

    #[test]
    fn test_response_json() {
        let ok = FundDepositResponse::from(Ok(TxHash::from([0x11; 32])));
        assert_eq!(ok.status, 200);
        let json = serde_json::to_value(&ok.body).unwrap();
        assert_eq!(
            json["txHash"],
            format!("0x{}", "11".repeat(32)).as_str()
        );

        let err = FundDepositResponse::from(Err::<TxHash, _>(FundingError::Internal(
            "execution reverted".to_string(),
        )));
        assert_eq!(err.status, 500);
        let json = serde_json::to_value(&err.body).unwrap();
        assert_eq!(json["error"], "execution reverted");
    }

    #[test]
    fn test_request_uses_camel_case() {
        let json = serde_json::to_value(valid_request()).unwrap();
        assert!(json.get("gasLimit").is_some());
        assert!(json.get("depositHash").is_some());
    }
}
