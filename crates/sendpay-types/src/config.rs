//! Per-network configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Address, Network, NetworkId};

/// Which signing/transport library drives a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignerBackend {
    /// Contract-kit style wallet with its own transaction objects.
    LegacyKit,
    /// Lightweight client library (simulate/write/sendTransaction).
    LightClient,
}

impl SignerBackend {
    /// Library tag attached to lifecycle events.
    pub fn library_name(&self) -> &'static str {
        match self {
            SignerBackend::LegacyKit => "contract-kit",
            SignerBackend::LightClient => "light-client",
        }
    }
}

/// Static description of one network deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network_id: NetworkId,
    pub chain_id: u64,
    pub rpc_url: String,
    /// Contract address of the native currency when it also exists as a
    /// token (Celo). Fees in this currency are sent without a fee-currency field.
    pub native_fee_currency: Option<Address>,
    pub signer_backend: SignerBackend,
}

impl NetworkConfig {
    pub fn network(&self) -> Network {
        self.network_id.network()
    }

    /// Whether `currency` denotes the native currency of this network.
    pub fn is_native_fee_currency(&self, currency: &Address) -> bool {
        self.native_fee_currency.as_ref() == Some(currency)
    }

    /// Built-in configuration for the known network ids.
    pub fn defaults() -> HashMap<NetworkId, NetworkConfig> {
        let celo_mainnet_native = "0x471EcE3750Da237f93B8E339c536989b8978a438".parse().ok();
        let celo_alfajores_native = "0xF194afDf50B03e69Bd7D057c1Aa9e10c9954E4C9".parse().ok();

        [
            NetworkConfig {
                network_id: NetworkId::CeloMainnet,
                chain_id: 42_220,
                rpc_url: "https://forno.celo.org".into(),
                native_fee_currency: celo_mainnet_native,
                signer_backend: SignerBackend::LightClient,
            },
            NetworkConfig {
                network_id: NetworkId::CeloAlfajores,
                chain_id: 44_787,
                rpc_url: "https://alfajores-forno.celo-testnet.org".into(),
                native_fee_currency: celo_alfajores_native,
                signer_backend: SignerBackend::LightClient,
            },
            NetworkConfig {
                network_id: NetworkId::EthereumMainnet,
                chain_id: 1,
                rpc_url: "https://ethereum-rpc.publicnode.com".into(),
                native_fee_currency: None,
                signer_backend: SignerBackend::LightClient,
            },
            NetworkConfig {
                network_id: NetworkId::EthereumSepolia,
                chain_id: 11_155_111,
                rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".into(),
                native_fee_currency: None,
                signer_backend: SignerBackend::LightClient,
            },
        ]
        .into_iter()
        .map(|config| (config.network_id, config))
        .collect()
    }
}
