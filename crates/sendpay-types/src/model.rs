//! Data model of a single send: context, token, fees and outcome.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Address, BigDecimal, BigUint, Hex, NetworkId, Result, SendError, TxHash};

/// Identifies one user-initiated transaction across every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    pub id: String,
    pub description: Option<String>,
}

impl TransactionContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Resolved token metadata from the token registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDescriptor {
    pub token_id: String,
    pub network_id: NetworkId,
    /// Contract address; `None` for the network's native coin.
    pub address: Option<Address>,
    pub decimals: u8,
    pub symbol: String,
    /// Whether the contract exposes `transferWithComment`.
    pub supports_comments: bool,
}

/// Normalized fee intent for one send attempt.
///
/// `fee_currency` is `None` when fees are paid in the native currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeDescriptor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<Address>,
    pub gas: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
}

/// A transaction negotiated upstream, fees included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedTransaction {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub data: Option<Hex>,
    pub value: Option<BigUint>,
    pub gas: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub fee_currency: Option<Address>,
}

/// Wire form of [`PreparedTransaction`]: big integers as decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializablePreparedTransaction {
    pub from: Option<String>,
    pub to: Option<String>,
    pub data: Option<Hex>,
    pub value: Option<String>,
    pub gas: Option<String>,
    pub max_fee_per_gas: Option<String>,
    pub max_priority_fee_per_gas: Option<String>,
    pub fee_currency: Option<String>,
}

fn parse_opt<T: FromStr>(value: &Option<String>, field: &str) -> Result<Option<T>> {
    value
        .as_deref()
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| SendError::InvalidAmount(format!("{}: {}", field, s)))
        })
        .transpose()
}

fn parse_opt_address(value: &Option<String>) -> Result<Option<Address>> {
    value.as_deref().map(Address::from_str).transpose()
}

impl TryFrom<&SerializablePreparedTransaction> for PreparedTransaction {
    type Error = SendError;

    fn try_from(tx: &SerializablePreparedTransaction) -> Result<Self> {
        Ok(Self {
            from: parse_opt_address(&tx.from)?,
            to: parse_opt_address(&tx.to)?,
            data: tx.data.clone(),
            value: parse_opt(&tx.value, "value")?,
            gas: parse_opt(&tx.gas, "gas")?,
            max_fee_per_gas: parse_opt(&tx.max_fee_per_gas, "maxFeePerGas")?,
            max_priority_fee_per_gas: parse_opt(
                &tx.max_priority_fee_per_gas,
                "maxPriorityFeePerGas",
            )?,
            fee_currency: parse_opt_address(&tx.fee_currency)?,
        })
    }
}

impl From<&PreparedTransaction> for SerializablePreparedTransaction {
    fn from(tx: &PreparedTransaction) -> Self {
        Self {
            from: tx.from.map(|a| a.to_checksum()),
            to: tx.to.map(|a| a.to_checksum()),
            data: tx.data.clone(),
            value: tx.value.as_ref().map(|v| v.to_string()),
            gas: tx.gas.map(|v| v.to_string()),
            max_fee_per_gas: tx.max_fee_per_gas.map(|v| v.to_string()),
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas.map(|v| v.to_string()),
            fee_currency: tx.fee_currency.map(|a| a.to_checksum()),
        }
    }
}

/// Legacy fee quote: decimal gas and gas price with an optional fee currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeQuote {
    pub fee_currency: Option<Address>,
    pub gas: BigDecimal,
    pub gas_price: BigDecimal,
}

/// Where the fees of a send come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeSource {
    Prepared(PreparedTransaction),
    Legacy(FeeQuote),
}

impl FeeSource {
    /// Fee currency named by the source before any normalization.
    pub fn fee_currency(&self) -> Option<Address> {
        match self {
            FeeSource::Prepared(tx) => tx.fee_currency,
            FeeSource::Legacy(quote) => quote.fee_currency,
        }
    }
}

/// What the user asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub recipient: String,
    pub amount: BigDecimal,
    pub comment: String,
    pub fee_source: Option<FeeSource>,
}

/// Receipt status reported by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// A mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: u64,
    pub block_hash: TxHash,
    pub gas_used: u64,
    pub effective_gas_price: Option<u128>,
}

/// Terminal result of a confirmed send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    pub hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: u64,
    pub block_hash: TxHash,
    pub gas_used: u64,
    pub effective_gas_price: Option<u128>,
}

impl From<&TransactionReceipt> for TransactionOutcome {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            hash: receipt.transaction_hash,
            status: receipt.status,
            block_number: receipt.block_number,
            block_hash: receipt.block_hash,
            gas_used: receipt.gas_used,
            effective_gas_price: receipt.effective_gas_price,
        }
    }
}
