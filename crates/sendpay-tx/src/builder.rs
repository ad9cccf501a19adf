//! Turns a transfer intent into a [`TransferPlan`].
//!
//! Building happens in two steps so the fee resolver can see the exact
//! transfer (encrypted comment included) before fees are attached:
//! [`TransferDraft::new`] validates and converts, [`TransferDraft::into_plan`]
//! attaches fees and picks the contract-call or native-value shape.

use sendpay_types::{
    token_amount_in_smallest_unit, Address, BigDecimal, BigUint, FeeDescriptor, Result,
    TokenDescriptor,
};
use tracing::debug;

use crate::{
    abi, CommentEncryptor, ContractCallRequest, NativeTransferRequest, TransferFunction,
    TransferPlan,
};

/// A validated transfer without fees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDraft {
    pub account: Address,
    pub token: TokenDescriptor,
    pub chain_id: u64,
    pub recipient: Address,
    /// Amount in the token's smallest unit.
    pub amount: BigUint,
    /// Present only for tokens that support comments.
    pub encrypted_comment: Option<String>,
}

/// Contract-kit style transaction object handed to the legacy fee chooser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTxObject {
    pub from: Address,
    pub to: Address,
    pub value: Option<BigUint>,
    pub data: Option<Vec<u8>>,
}

impl TransferDraft {
    /// Validate the recipient, convert the amount and encrypt the comment.
    ///
    /// Address and amount errors are raised before the encryptor is touched.
    pub async fn new(
        encryptor: &dyn CommentEncryptor,
        account: Address,
        token: &TokenDescriptor,
        chain_id: u64,
        amount: &BigDecimal,
        recipient: &str,
        comment: &str,
    ) -> Result<Self> {
        let recipient: Address = recipient.parse()?;
        let amount = token_amount_in_smallest_unit(amount, token.decimals)?;

        let encrypted_comment = if token.address.is_some() && token.supports_comments {
            if comment.is_empty() {
                Some(String::new())
            } else {
                Some(
                    encryptor
                        .encrypt_comment(comment, &recipient, &account, true)
                        .await?,
                )
            }
        } else {
            None
        };

        Ok(Self {
            account,
            token: token.clone(),
            chain_id,
            recipient,
            amount,
            encrypted_comment,
        })
    }

    pub fn function(&self) -> Option<TransferFunction> {
        self.token.address.map(|_| {
            if self.token.supports_comments {
                TransferFunction::TransferWithComment
            } else {
                TransferFunction::Transfer
            }
        })
    }

    /// The equivalent unsigned transaction, for gas estimation context.
    pub fn legacy_tx_object(&self) -> Result<LegacyTxObject> {
        Ok(match self.token.address {
            Some(token_address) => {
                let data = if self.token.supports_comments {
                    abi::encode_transfer_with_comment(
                        &self.recipient,
                        &self.amount,
                        self.encrypted_comment.as_deref().unwrap_or_default(),
                    )?
                } else {
                    abi::encode_transfer(&self.recipient, &self.amount)?
                };
                LegacyTxObject {
                    from: self.account,
                    to: token_address,
                    value: None,
                    data: Some(data),
                }
            }
            None => LegacyTxObject {
                from: self.account,
                to: self.recipient,
                value: Some(self.amount.clone()),
                data: None,
            },
        })
    }

    /// Attach fees and fix the plan shape.
    pub fn into_plan(self, fees: FeeDescriptor) -> TransferPlan {
        let function = self.function();
        match (self.token.address, function) {
            (Some(token_address), Some(function)) => {
                debug!(
                    function = function.name(),
                    recipient = %self.recipient,
                    amount = %self.amount,
                    token = %token_address,
                    network = %self.token.network_id,
                    fee_currency = ?fees.fee_currency,
                    gas = ?fees.gas,
                    max_fee_per_gas = ?fees.max_fee_per_gas,
                    "Building contract transfer"
                );
                TransferPlan::ContractCall(ContractCallRequest {
                    account: self.account,
                    address: token_address,
                    function,
                    recipient: self.recipient,
                    amount: self.amount,
                    comment: match function {
                        TransferFunction::TransferWithComment => {
                            Some(self.encrypted_comment.unwrap_or_default())
                        }
                        TransferFunction::Transfer => None,
                    },
                    fees,
                })
            }
            _ => {
                debug!(
                    recipient = %self.recipient,
                    amount = %self.amount,
                    network = %self.token.network_id,
                    gas = ?fees.gas,
                    max_fee_per_gas = ?fees.max_fee_per_gas,
                    "Building native transfer"
                );
                TransferPlan::NativeValue(NativeTransferRequest {
                    account: self.account,
                    to: self.recipient,
                    value: self.amount,
                    chain_id: self.chain_id,
                    fees,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sendpay_types::{NetworkId, SendError};
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ReverseEncryptor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CommentEncryptor for ReverseEncryptor {
        async fn encrypt_comment(
            &self,
            comment: &str,
            _recipient: &Address,
            _sender: &Address,
            from_sender: bool,
        ) -> Result<String> {
            assert!(from_sender);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(comment.chars().rev().collect())
        }
    }

    fn encryptor() -> ReverseEncryptor {
        ReverseEncryptor {
            calls: AtomicUsize::new(0),
        }
    }

    fn account() -> Address {
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359".parse().unwrap()
    }

    const RECIPIENT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    fn stable_token() -> TokenDescriptor {
        TokenDescriptor {
            token_id: "celo-mainnet:0x765de816845861e75a25fca122bb6898b8b1282a".into(),
            network_id: NetworkId::CeloMainnet,
            address: Some("0x765DE816845861e75A25fCA122bb6898B8B1282a".parse().unwrap()),
            decimals: 18,
            symbol: "cUSD".into(),
            supports_comments: true,
        }
    }

    fn native_token() -> TokenDescriptor {
        TokenDescriptor {
            token_id: "ethereum-mainnet:native".into(),
            network_id: NetworkId::EthereumMainnet,
            address: None,
            decimals: 18,
            symbol: "ETH".into(),
            supports_comments: false,
        }
    }

    #[tokio::test]
    async fn comment_token_builds_transfer_with_comment() {
        let enc = encryptor();
        let draft = TransferDraft::new(
            &enc,
            account(),
            &stable_token(),
            42_220,
            &BigDecimal::from_str("10").unwrap(),
            RECIPIENT,
            "lunch",
        )
        .await
        .unwrap();
        assert_eq!(enc.calls.load(Ordering::SeqCst), 1);

        let fees = FeeDescriptor {
            fee_currency: None,
            gas: Some(21_000),
            max_fee_per_gas: Some(5),
        };
        match draft.into_plan(fees.clone()) {
            TransferPlan::ContractCall(req) => {
                assert_eq!(req.function, TransferFunction::TransferWithComment);
                assert_eq!(req.recipient.to_string(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
                assert_eq!(req.amount, BigUint::from(10u8) * BigUint::from(10u8).pow(18));
                assert_eq!(req.comment.as_deref(), Some("hcnul"));
                assert_eq!(req.fees, fees);
            }
            other => panic!("expected contract call, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn plain_token_skips_encryption() {
        let enc = encryptor();
        let token = TokenDescriptor {
            supports_comments: false,
            ..stable_token()
        };
        let draft = TransferDraft::new(
            &enc,
            account(),
            &token,
            42_220,
            &BigDecimal::from_str("1.25").unwrap(),
            RECIPIENT,
            "ignored",
        )
        .await
        .unwrap();
        assert_eq!(enc.calls.load(Ordering::SeqCst), 0);
        assert_eq!(draft.function(), Some(TransferFunction::Transfer));

        let tx = draft.legacy_tx_object().unwrap();
        assert_eq!(tx.to, token.address.unwrap());
        assert_eq!(&tx.data.unwrap()[..4], &abi::selector(abi::TRANSFER_SIGNATURE));
    }

    #[tokio::test]
    async fn native_token_builds_value_transfer() {
        let draft = TransferDraft::new(
            &encryptor(),
            account(),
            &native_token(),
            1,
            &BigDecimal::from_str("0.5").unwrap(),
            RECIPIENT,
            "",
        )
        .await
        .unwrap();
        assert_eq!(draft.function(), None);
        assert_eq!(draft.encrypted_comment, None);

        let fees = FeeDescriptor {
            fee_currency: None,
            gas: Some(21_000),
            max_fee_per_gas: Some(7),
        };
        match draft.into_plan(fees) {
            TransferPlan::NativeValue(req) => {
                let call = req.as_call();
                assert_eq!(call.fees, req.fees);
                assert_eq!(call.value, Some(req.value.clone()));
                assert_eq!(req.value, BigUint::from(500_000_000_000_000_000u64));
                assert_eq!(req.chain_id, 1);
            }
            other => panic!("expected native transfer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn invalid_recipient_fails_before_encryption() {
        let enc = encryptor();
        let err = TransferDraft::new(
            &enc,
            account(),
            &stable_token(),
            42_220,
            &BigDecimal::from_str("1").unwrap(),
            "0xnot-an-address",
            "hi",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SendError::InvalidAddress(_)));
        assert_eq!(enc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fractional_smallest_unit_is_rejected() {
        let token = TokenDescriptor {
            decimals: 2,
            ..stable_token()
        };
        let err = TransferDraft::new(
            &encryptor(),
            account(),
            &token,
            42_220,
            &BigDecimal::from_str("0.001").unwrap(),
            RECIPIENT,
            "",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SendError::NonIntegralAmount { decimals: 2, .. }));
    }
}
