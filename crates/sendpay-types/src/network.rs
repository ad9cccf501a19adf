//! Networks, network ids and per-network configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Address, Result, SendError};

/// A chain family. Several network ids (mainnet, testnet) map to one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Celo,
    Ethereum,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Celo => f.write_str("celo"),
            Network::Ethereum => f.write_str("ethereum"),
        }
    }
}

/// A concrete deployment of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkId {
    #[serde(rename = "celo-mainnet")]
    CeloMainnet,
    #[serde(rename = "celo-alfajores")]
    CeloAlfajores,
    #[serde(rename = "ethereum-mainnet")]
    EthereumMainnet,
    #[serde(rename = "ethereum-sepolia")]
    EthereumSepolia,
}

impl NetworkId {
    pub const ALL: [NetworkId; 4] = [
        NetworkId::CeloMainnet,
        NetworkId::CeloAlfajores,
        NetworkId::EthereumMainnet,
        NetworkId::EthereumSepolia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::CeloMainnet => "celo-mainnet",
            NetworkId::CeloAlfajores => "celo-alfajores",
            NetworkId::EthereumMainnet => "ethereum-mainnet",
            NetworkId::EthereumSepolia => "ethereum-sepolia",
        }
    }

    pub fn network(&self) -> Network {
        match self {
            NetworkId::CeloMainnet | NetworkId::CeloAlfajores => Network::Celo,
            NetworkId::EthereumMainnet | NetworkId::EthereumSepolia => Network::Ethereum,
        }
    }
}

impl FromStr for NetworkId {
    type Err = SendError;

    fn from_str(s: &str) -> Result<Self> {
        NetworkId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or(SendError::UnknownTokenNetwork)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token id of the form `"{network_id}:{address}"`, or
/// `"{network_id}:native"` for the network's native coin.
pub fn token_id(network_id: NetworkId, address: Option<&Address>) -> String {
    match address {
        Some(address) => format!("{}:{}", network_id, address.to_lowercase_hex()),
        None => format!("{}:native", network_id),
    }
}
