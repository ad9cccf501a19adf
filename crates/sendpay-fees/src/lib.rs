//! Fee resolution for a send.
//!
//! - Prepared transaction: fee fields copied verbatim
//! - Legacy fee quote: delegated to a [`LegacyFeeChooser`], then normalized
//! - Native fee currency is never named explicitly

use async_trait::async_trait;
use sendpay_types::{
    decimal_to_u128, decimal_to_u64, token_id, Address, BigDecimal, FeeDescriptor, FeeQuote,
    FeeSource, NetworkConfig, NetworkId, PreparedTransaction, Result,
};
use sendpay_tx::{LegacyTxObject, TransferDraft};
use tracing::debug;

/// Fee details picked by the legacy fee chooser, still in decimal form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChosenFeeDetails {
    pub fee_currency: Option<Address>,
    pub gas: Option<BigDecimal>,
    pub gas_price: Option<BigDecimal>,
}

/// Contract-kit style fee selection for a concrete transaction.
#[async_trait]
pub trait LegacyFeeChooser: Send + Sync {
    async fn choose_tx_fee_details(
        &self,
        tx: &LegacyTxObject,
        fee_currency: Option<Address>,
        gas: &BigDecimal,
        gas_price: &BigDecimal,
    ) -> Result<ChosenFeeDetails>;
}

/// Resolve the fee descriptor for `draft`.
///
/// Without a fee source the descriptor is empty and the node estimates.
pub async fn resolve_fee(
    draft: &TransferDraft,
    fee_source: Option<&FeeSource>,
    network: &NetworkConfig,
    chooser: &dyn LegacyFeeChooser,
) -> Result<FeeDescriptor> {
    let fees = match fee_source {
        Some(FeeSource::Prepared(tx)) => from_prepared(tx),
        Some(FeeSource::Legacy(quote)) => from_legacy_quote(draft, quote, chooser).await?,
        None => FeeDescriptor::default(),
    };
    Ok(omit_native_fee_currency(fees, network))
}

fn from_prepared(tx: &PreparedTransaction) -> FeeDescriptor {
    FeeDescriptor {
        fee_currency: tx.fee_currency,
        gas: tx.gas,
        max_fee_per_gas: tx.max_fee_per_gas,
    }
}

async fn from_legacy_quote(
    draft: &TransferDraft,
    quote: &FeeQuote,
    chooser: &dyn LegacyFeeChooser,
) -> Result<FeeDescriptor> {
    let tx = draft.legacy_tx_object()?;
    let chosen = chooser
        .choose_tx_fee_details(&tx, quote.fee_currency, &quote.gas, &quote.gas_price)
        .await?;
    debug!(
        fee_currency = ?chosen.fee_currency,
        gas = ?chosen.gas,
        gas_price = ?chosen.gas_price,
        "Chose legacy fee details"
    );

    Ok(FeeDescriptor {
        fee_currency: chosen.fee_currency,
        gas: chosen
            .gas
            .as_ref()
            .map(|g| decimal_to_u64(g, "gas"))
            .transpose()?,
        max_fee_per_gas: chosen
            .gas_price
            .as_ref()
            .map(|p| decimal_to_u128(p, "gasPrice"))
            .transpose()?,
    })
}

// Some transaction types reject an explicit native fee currency; leaving the
// field out makes the network charge the native coin.
fn omit_native_fee_currency(mut fees: FeeDescriptor, network: &NetworkConfig) -> FeeDescriptor {
    if fees
        .fee_currency
        .as_ref()
        .is_some_and(|c| network.is_native_fee_currency(c))
    {
        fees.fee_currency = None;
    }
    fees
}

/// Token id of the currency paying the fees.
pub fn fee_currency_id(network_id: NetworkId, fees: &FeeDescriptor) -> String {
    token_id(network_id, fees.fee_currency.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendpay_tx::CommentEncryptor;
    use sendpay_types::{SendError, SignerBackend, TokenDescriptor};
    use std::str::FromStr;
    use std::sync::Mutex;

    struct NoEncryption;

    #[async_trait]
    impl CommentEncryptor for NoEncryption {
        async fn encrypt_comment(
            &self,
            comment: &str,
            _recipient: &Address,
            _sender: &Address,
            _from_sender: bool,
        ) -> Result<String> {
            Ok(format!("enc:{}", comment))
        }
    }

    /// Echoes the quote back and remembers what it was asked.
    #[derive(Default)]
    struct EchoChooser {
        seen: Mutex<Vec<LegacyTxObject>>,
    }

    #[async_trait]
    impl LegacyFeeChooser for EchoChooser {
        async fn choose_tx_fee_details(
            &self,
            tx: &LegacyTxObject,
            fee_currency: Option<Address>,
            gas: &BigDecimal,
            gas_price: &BigDecimal,
        ) -> Result<ChosenFeeDetails> {
            self.seen.lock().unwrap().push(tx.clone());
            Ok(ChosenFeeDetails {
                fee_currency,
                gas: Some(gas.clone()),
                gas_price: Some(gas_price.clone()),
            })
        }
    }

    fn cusd() -> Address {
        "0x765DE816845861e75A25fCA122bb6898B8B1282a".parse().unwrap()
    }

    fn celo_native() -> Address {
        "0x471EcE3750Da237f93B8E339c536989b8978a438".parse().unwrap()
    }

    fn network() -> NetworkConfig {
        NetworkConfig {
            network_id: NetworkId::CeloMainnet,
            chain_id: 42_220,
            rpc_url: "http://localhost:8545".into(),
            native_fee_currency: Some(celo_native()),
            signer_backend: SignerBackend::LightClient,
        }
    }

    async fn draft() -> TransferDraft {
        let token = TokenDescriptor {
            token_id: "celo-mainnet:0x765de816845861e75a25fca122bb6898b8b1282a".into(),
            network_id: NetworkId::CeloMainnet,
            address: Some(cusd()),
            decimals: 18,
            symbol: "cUSD".into(),
            supports_comments: true,
        };
        TransferDraft::new(
            &NoEncryption,
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359".parse().unwrap(),
            &token,
            42_220,
            &BigDecimal::from(10),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "hi",
        )
        .await
        .unwrap()
    }

    fn quote(gas: &str, gas_price: &str, fee_currency: Option<Address>) -> FeeSource {
        FeeSource::Legacy(FeeQuote {
            fee_currency,
            gas: BigDecimal::from_str(gas).unwrap(),
            gas_price: BigDecimal::from_str(gas_price).unwrap(),
        })
    }

    #[tokio::test]
    async fn prepared_fees_are_copied_verbatim() {
        let chooser = EchoChooser::default();
        let prepared = FeeSource::Prepared(PreparedTransaction {
            gas: Some(59_480),
            max_fee_per_gas: Some(12_500_000_000),
            fee_currency: Some(cusd()),
            ..Default::default()
        });
        let fees = resolve_fee(&draft().await, Some(&prepared), &network(), &chooser)
            .await
            .unwrap();
        assert_eq!(
            fees,
            FeeDescriptor {
                fee_currency: Some(cusd()),
                gas: Some(59_480),
                max_fee_per_gas: Some(12_500_000_000),
            }
        );
        assert!(chooser.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn native_fee_currency_is_omitted() {
        let chooser = EchoChooser::default();
        let prepared = FeeSource::Prepared(PreparedTransaction {
            gas: Some(21_000),
            max_fee_per_gas: Some(5),
            fee_currency: Some(celo_native()),
            ..Default::default()
        });
        let fees = resolve_fee(&draft().await, Some(&prepared), &network(), &chooser)
            .await
            .unwrap();
        assert_eq!(fees.fee_currency, None);

        let legacy = quote("21000", "5", Some(celo_native()));
        let fees = resolve_fee(&draft().await, Some(&legacy), &network(), &chooser)
            .await
            .unwrap();
        assert_eq!(fees.fee_currency, None);
        assert_eq!(fee_currency_id(NetworkId::CeloMainnet, &fees), "celo-mainnet:native");
    }

    #[tokio::test]
    async fn legacy_quote_goes_through_chooser() {
        let chooser = EchoChooser::default();
        let d = draft().await;
        let fees = resolve_fee(&d, Some(&quote("21000", "5", Some(cusd()))), &network(), &chooser)
            .await
            .unwrap();
        assert_eq!(
            fees,
            FeeDescriptor {
                fee_currency: Some(cusd()),
                gas: Some(21_000),
                max_fee_per_gas: Some(5),
            }
        );

        let seen = chooser.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], d.legacy_tx_object().unwrap());
        assert_eq!(seen[0].to, cusd());
    }

    #[tokio::test]
    async fn no_fee_source_leaves_estimation_to_the_node() {
        let fees = resolve_fee(&draft().await, None, &network(), &EchoChooser::default())
            .await
            .unwrap();
        assert_eq!(fees, FeeDescriptor::default());
    }

    #[tokio::test]
    async fn fractional_gas_price_is_rejected() {
        let err = resolve_fee(
            &draft().await,
            Some(&quote("21000", "5.5", None)),
            &network(),
            &EchoChooser::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SendError::InvalidAmount(_)));
    }
}
