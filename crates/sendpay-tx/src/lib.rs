//! Transfer requests and the seams they cross.
//!
//! - Build token/native transfer requests from a user intent
//! - Encode transfer calldata
//! - Signing wallet, network client and comment encryption traits
//! - JSON-RPC network client

use async_trait::async_trait;
use sendpay_types::{
    Address, BigUint, FeeDescriptor, Hex, Result, TransactionReceipt, TxHash,
};

pub mod abi;
pub mod builder;
pub mod rpc_client;

pub use builder::{LegacyTxObject, TransferDraft};

/// Token contract function used for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFunction {
    Transfer,
    TransferWithComment,
}

impl TransferFunction {
    pub fn name(&self) -> &'static str {
        match self {
            TransferFunction::Transfer => "transfer",
            TransferFunction::TransferWithComment => "transferWithComment",
        }
    }
}

/// An unsigned token contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallRequest {
    pub account: Address,
    /// Token contract.
    pub address: Address,
    pub function: TransferFunction,
    pub recipient: Address,
    pub amount: BigUint,
    /// Encrypted comment, only for `transferWithComment`.
    pub comment: Option<String>,
    pub fees: FeeDescriptor,
}

impl ContractCallRequest {
    pub fn calldata(&self) -> Result<Vec<u8>> {
        match self.function {
            TransferFunction::Transfer => abi::encode_transfer(&self.recipient, &self.amount),
            TransferFunction::TransferWithComment => abi::encode_transfer_with_comment(
                &self.recipient,
                &self.amount,
                self.comment.as_deref().unwrap_or_default(),
            ),
        }
    }
}

/// An unsigned direct value transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTransferRequest {
    pub account: Address,
    pub to: Address,
    pub value: BigUint,
    pub chain_id: u64,
    pub fees: FeeDescriptor,
}

impl NativeTransferRequest {
    /// The read-only call used as a funds/gas sanity check. Carries the
    /// exact fee fields later used for submission.
    pub fn as_call(&self) -> CallRequest {
        CallRequest {
            from: self.account,
            to: self.to,
            value: Some(self.value.clone()),
            data: None,
            fees: self.fees.clone(),
        }
    }
}

/// Parameters of an `eth_call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub from: Address,
    pub to: Address,
    pub value: Option<BigUint>,
    pub data: Option<Vec<u8>>,
    pub fees: FeeDescriptor,
}

/// Result of a successful dry run: the request to sign, possibly adjusted
/// by the simulation (e.g. a filled-in gas limit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedContract {
    pub request: ContractCallRequest,
    pub result: Hex,
}

/// How a transfer reaches the chain, decided once by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    ContractCall(ContractCallRequest),
    NativeValue(NativeTransferRequest),
}

impl TransferPlan {
    pub fn fees(&self) -> &FeeDescriptor {
        match self {
            TransferPlan::ContractCall(req) => &req.fees,
            TransferPlan::NativeValue(req) => &req.fees,
        }
    }

    pub fn account(&self) -> Address {
        match self {
            TransferPlan::ContractCall(req) => req.account,
            TransferPlan::NativeValue(req) => req.account,
        }
    }
}

/// Read side of a node: dry runs and receipts.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Execute a call without committing state; fails if it would revert or
    /// the account cannot cover value plus gas.
    async fn call(&self, request: &CallRequest) -> Result<Hex>;

    /// Dry-run a contract call and return a ready-to-sign request.
    async fn simulate_contract(&self, request: &ContractCallRequest) -> Result<SimulatedContract>;

    /// Resolve once the transaction is mined.
    async fn wait_for_transaction_receipt(&self, hash: &TxHash) -> Result<TransactionReceipt>;
}

/// Write side: a wallet that can sign and broadcast.
#[async_trait]
pub trait SigningWallet: Send + Sync {
    /// The active account, if any.
    fn account(&self) -> Option<Address>;

    async fn unlock_account(&self, address: &Address) -> Result<()>;

    async fn write_contract(&self, request: &ContractCallRequest) -> Result<TxHash>;

    async fn send_transaction(&self, request: &NativeTransferRequest) -> Result<TxHash>;
}

/// Comment (memo) encryption between sender and recipient.
#[async_trait]
pub trait CommentEncryptor: Send + Sync {
    async fn encrypt_comment(
        &self,
        comment: &str,
        recipient: &Address,
        sender: &Address,
        from_sender: bool,
    ) -> Result<String>;
}
