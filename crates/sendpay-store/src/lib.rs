//! Token registry and transaction history seams.
//!
//! Defines the traits the pipeline reads tokens from and writes standby and
//! confirmed transactions to. Provides in-memory implementations for testing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sendpay_types::{
    Address, BigDecimal, NetworkId, ReceiptStatus, Result, TokenDescriptor, TransactionContext,
    TransactionReceipt, TxHash,
};

pub mod memory;

pub use memory::{MemoryStore, MemoryTokenRegistry};

/// Direction of a token transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenTransactionType {
    Sent,
    Received,
}

/// Signed token amount as shown in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    /// Decimal string in human units; negative for debits.
    pub value: String,
    pub token_address: Option<Address>,
    pub token_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub comment: String,
}

/// A pending transfer shown to the user before the network confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandbyTransaction {
    #[serde(rename = "__typename")]
    pub typename: String,
    #[serde(rename = "type")]
    pub tx_type: TokenTransactionType,
    pub context: TransactionContext,
    pub network_id: NetworkId,
    pub amount: TokenAmount,
    pub address: Address,
    pub metadata: TransferMetadata,
    pub transaction_hash: TxHash,
    pub fee_currency_id: String,
}

impl StandbyTransaction {
    /// Record of an outgoing transfer of `amount` (positive, human units).
    pub fn sent(
        context: &TransactionContext,
        token: &TokenDescriptor,
        amount: &BigDecimal,
        recipient: Address,
        comment: &str,
        hash: TxHash,
        fee_currency_id: &str,
    ) -> Self {
        Self {
            typename: "TokenTransferV3".to_string(),
            tx_type: TokenTransactionType::Sent,
            context: context.clone(),
            network_id: token.network_id,
            amount: TokenAmount {
                value: (-amount.clone()).to_string(),
                token_address: token.address,
                token_id: token.token_id.clone(),
            },
            address: recipient,
            metadata: TransferMetadata {
                comment: comment.to_string(),
            },
            transaction_hash: hash,
            fee_currency_id: fee_currency_id.to_string(),
        }
    }
}

/// A transaction reconciled with its receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTransaction {
    pub context_id: String,
    pub network_id: NetworkId,
    pub fee_currency_id: String,
    pub status: ReceiptStatus,
    pub receipt: TransactionReceipt,
    /// The standby record this receipt settled, if one was found.
    pub standby: Option<StandbyTransaction>,
}

/// Token metadata lookup.
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    async fn get_token_info(&self, token_id: &str) -> Result<Option<TokenDescriptor>>;
}

/// Transaction history: standby records in, receipts reconciled.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn add_standby_transaction(&self, tx: &StandbyTransaction) -> Result<()>;

    async fn handle_transaction_receipt_received(
        &self,
        context_id: &str,
        receipt: &TransactionReceipt,
        network_id: NetworkId,
        fee_currency_id: &str,
    ) -> Result<()>;

    async fn list_standby_transactions(&self) -> Result<Vec<StandbyTransaction>>;

    async fn list_completed_transactions(&self) -> Result<Vec<CompletedTransaction>>;
}
