//! Signing wallet selection per network.

use std::collections::HashMap;
use std::sync::Arc;

use sendpay_tx::SigningWallet;
use sendpay_types::{NetworkConfig, Result, SendError, SignerBackend};

/// Wallets keyed by the signing back-end that drives them.
#[derive(Default, Clone)]
pub struct WalletRegistry {
    wallets: HashMap<SignerBackend, Arc<dyn SigningWallet>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallet(mut self, backend: SignerBackend, wallet: Arc<dyn SigningWallet>) -> Self {
        self.insert(backend, wallet);
        self
    }

    pub fn insert(&mut self, backend: SignerBackend, wallet: Arc<dyn SigningWallet>) {
        self.wallets.insert(backend, wallet);
    }

    /// The wallet for `network`'s back-end. A missing wallet is reported
    /// like a wallet without an account.
    pub fn wallet_for(&self, network: &NetworkConfig) -> Result<Arc<dyn SigningWallet>> {
        self.wallets
            .get(&network.signer_backend)
            .cloned()
            .ok_or(SendError::NoAccount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sendpay_tx::{ContractCallRequest, NativeTransferRequest};
    use sendpay_types::{Address, NetworkId, TxHash};

    struct Fixed(Address);

    #[async_trait]
    impl SigningWallet for Fixed {
        fn account(&self) -> Option<Address> {
            Some(self.0)
        }

        async fn unlock_account(&self, _address: &Address) -> Result<()> {
            Ok(())
        }

        async fn write_contract(&self, _request: &ContractCallRequest) -> Result<TxHash> {
            Ok(TxHash([0; 32]))
        }

        async fn send_transaction(&self, _request: &NativeTransferRequest) -> Result<TxHash> {
            Ok(TxHash([0; 32]))
        }
    }

    #[test]
    fn picks_wallet_by_backend() {
        let light: Address = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359".parse().unwrap();
        let legacy: Address = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB".parse().unwrap();
        let registry = WalletRegistry::new()
            .with_wallet(SignerBackend::LightClient, Arc::new(Fixed(light)))
            .with_wallet(SignerBackend::LegacyKit, Arc::new(Fixed(legacy)));

        let mut network = NetworkConfig::defaults()[&NetworkId::CeloAlfajores].clone();
        assert_eq!(registry.wallet_for(&network).unwrap().account(), Some(light));

        network.signer_backend = SignerBackend::LegacyKit;
        assert_eq!(registry.wallet_for(&network).unwrap().account(), Some(legacy));
    }

    #[test]
    fn missing_wallet_is_no_account() {
        let network = NetworkConfig::defaults()[&NetworkId::EthereumMainnet].clone();
        assert!(matches!(
            WalletRegistry::new().wallet_for(&network),
            Err(SendError::NoAccount)
        ));
    }
}
