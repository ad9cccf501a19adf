//! End-to-end payment orchestration.
//!
//! Resolves the token and network, builds the transfer, resolves fees and
//! hands the result to the [`SubmissionExecutor`], which signs, records and
//! monitors it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sendpay_fees::{fee_currency_id, resolve_fee, LegacyFeeChooser};
use sendpay_monitor::{
    AppStateSignal, BalanceRefresher, ConfirmationMonitor, ErrorNotifier, RetryConfig,
    TransactionEventHandler,
};
use sendpay_store::{TokenRegistry, TransactionStore};
use sendpay_tx::{CommentEncryptor, NetworkClient, TransferDraft};
use sendpay_types::{
    NetworkConfig, NetworkId, Result, SendError, TransactionContext, TransactionOutcome,
    TransferIntent,
};
use tracing::{debug, error};

pub mod executor;
pub mod wallets;

pub use executor::{PendingSend, SubmissionExecutor};
pub use wallets::WalletRegistry;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub networks: HashMap<NetworkId, NetworkConfig>,
    pub retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            networks: NetworkConfig::defaults(),
            retry: RetryConfig::default(),
        }
    }
}

/// External services the engine talks to.
pub struct Collaborators {
    pub tokens: Arc<dyn TokenRegistry>,
    pub wallets: WalletRegistry,
    pub clients: HashMap<NetworkId, Arc<dyn NetworkClient>>,
    pub encryptor: Arc<dyn CommentEncryptor>,
    pub fee_chooser: Arc<dyn LegacyFeeChooser>,
    pub store: Arc<dyn TransactionStore>,
    pub balances: Arc<dyn BalanceRefresher>,
    pub notifier: Arc<dyn ErrorNotifier>,
}

/// One payment to send.
#[derive(Debug, Clone)]
pub struct SendPaymentRequest {
    pub context: TransactionContext,
    pub token_id: String,
    pub intent: TransferIntent,
}

/// The payment engine sends value and follows it to confirmation.
pub struct PaymentEngine {
    networks: HashMap<NetworkId, NetworkConfig>,
    tokens: Arc<dyn TokenRegistry>,
    wallets: WalletRegistry,
    clients: HashMap<NetworkId, Arc<dyn NetworkClient>>,
    encryptor: Arc<dyn CommentEncryptor>,
    fee_chooser: Arc<dyn LegacyFeeChooser>,
    executor: SubmissionExecutor,
}

impl PaymentEngine {
    pub fn new(
        config: EngineConfig,
        collaborators: Collaborators,
        app_state: AppStateSignal,
        on_event: Option<TransactionEventHandler>,
    ) -> Self {
        let monitor = ConfirmationMonitor::new(
            config.retry,
            collaborators.store,
            collaborators.balances,
            collaborators.notifier,
            app_state,
            on_event,
        );
        Self {
            networks: config.networks,
            tokens: collaborators.tokens,
            wallets: collaborators.wallets,
            clients: collaborators.clients,
            encryptor: collaborators.encryptor,
            fee_chooser: collaborators.fee_chooser,
            executor: SubmissionExecutor::new(monitor),
        }
    }

    /// Send a payment and wait for it to confirm.
    ///
    /// Errors are logged and returned unmodified.
    pub async fn send_payment(&self, request: SendPaymentRequest) -> Result<TransactionOutcome> {
        let result = self.try_send_payment(&request).await;
        if let Err(ref err) = result {
            error!(
                tx_id = %request.context.id,
                token_id = %request.token_id,
                recipient = %request.intent.recipient,
                amount = %request.intent.amount,
                error = %err,
                "Send payment failed"
            );
        }
        result
    }

    async fn try_send_payment(&self, request: &SendPaymentRequest) -> Result<TransactionOutcome> {
        let intent = &request.intent;
        let token = self
            .tokens
            .get_token_info(&request.token_id)
            .await?
            .ok_or(SendError::UnknownTokenNetwork)?;
        let network = self
            .networks
            .get(&token.network_id)
            .ok_or(SendError::UnknownTokenNetwork)?;

        let wallet = self.wallets.wallet_for(network)?;
        let account = wallet.account().ok_or(SendError::NoAccount)?;
        let client = self
            .clients
            .get(&network.network_id)
            .ok_or_else(|| SendError::UnsupportedNetwork(network.network_id.to_string()))?;

        debug!(
            tx_id = %request.context.id,
            token_id = %token.token_id,
            network = %network.network_id,
            account = %account,
            has_comment = !intent.comment.is_empty(),
            "Sending payment"
        );

        let draft = TransferDraft::new(
            self.encryptor.as_ref(),
            account,
            &token,
            network.chain_id,
            &intent.amount,
            &intent.recipient,
            &intent.comment,
        )
        .await?;
        let fees = resolve_fee(
            &draft,
            intent.fee_source.as_ref(),
            network,
            self.fee_chooser.as_ref(),
        )
        .await?;

        let pending = PendingSend {
            context: request.context.clone(),
            token,
            network: network.clone(),
            fee_currency_id: fee_currency_id(network.network_id, &fees),
            amount: intent.amount.clone(),
            recipient: draft.recipient,
            comment: intent.comment.clone(),
            plan: draft.into_plan(fees),
        };

        self.executor
            .execute(&pending, wallet.as_ref(), client.as_ref())
            .await
    }
}
