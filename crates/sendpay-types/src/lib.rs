//! Core types shared by every stage of the send pipeline.
//!
//! - Checksummed addresses and transaction hashes
//! - Exact decimal to smallest-unit conversion
//! - Network and token identifiers
//! - The error taxonomy of a send

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod address;
pub mod amount;
pub mod config;
pub mod model;
pub mod network;

pub use address::Address;
pub use config::{NetworkConfig, SignerBackend};
pub use amount::{
    decimal_to_integer, decimal_to_u128, decimal_to_u64, token_amount_in_smallest_unit, BigDecimal,
    BigUint,
};
pub use model::*;
pub use network::{token_id, Network, NetworkId};

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// Send pipeline error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("unknown token network")]
    UnknownTokenNetwork,

    #[error("no account found in the wallet")]
    NoAccount,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount {amount} is not expressible with {decimals} decimals")]
    NonIntegralAmount { amount: String, decimals: u8 },

    #[error("no network client configured for {0}")]
    UnsupportedNetwork(String),

    #[error("comment encryption failed: {0}")]
    Encryption(String),

    #[error("simulation failed: {0}")]
    Simulation(String),

    #[error("unlock failed: {0}")]
    Unlock(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("transaction reverted")]
    Reverted { hash: TxHash },

    #[error("{0}")]
    Other(String),
}

impl SendError {
    /// Whether re-issuing the send may succeed. Only submission and
    /// transport failures qualify; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SendError::Submission(_) | SendError::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, SendError>;

/// A 32-byte transaction hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = SendError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex_to_bytes(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SendError::InvalidHex(format!("expected 32 bytes: {}", s)))?;
        Ok(Self(arr))
    }
}

impl TryFrom<String> for TxHash {
    type Error = SendError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TxHash> for String {
    fn from(h: TxHash) -> Self {
        h.to_string()
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_hex(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

/// Parse a hex string (with or without 0x) to bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| SendError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
