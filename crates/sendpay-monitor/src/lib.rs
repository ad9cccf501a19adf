//! Confirmation monitor: submit with retry, wait for the receipt, settle.
//!
//! Lifecycle of one send:
//! - `Started`: `transaction_start` emitted
//! - `HashReceived`: the wallet returned a hash
//! - `ReceiptReceived`: the network mined it
//! - `Confirmed` or `Reverted`
//!
//! `Failed` is reachable from any non-terminal state. Every failure emits
//! `transaction_exception`, shows one generic error and is returned.

pub mod timeout;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sendpay_store::{StandbyTransaction, TransactionStore};
use sendpay_tx::NetworkClient;
use sendpay_types::{
    NetworkConfig, ReceiptStatus, Result, SendError, TransactionContext, TransactionOutcome,
    TransactionReceipt, TxHash,
};
use tracing::{debug, error, warn};

pub use timeout::{AppState, AppStateSignal, Elapsed, TimeoutController};

/// Retry-with-timeout policy for the submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub attempt_timeout_ms: u64,
    pub retry_delay_ms: u64,
    pub background_grace_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 45_000,
            retry_delay_ms: 2_000,
            background_grace_ms: 30_000,
        }
    }
}

/// Progress of one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendStatus {
    Started,
    HashReceived,
    ReceiptReceived,
    Confirmed,
    Reverted,
    Failed,
}

impl SendStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SendStatus::Confirmed | SendStatus::Reverted | SendStatus::Failed)
    }

    pub fn can_advance_to(&self, next: SendStatus) -> bool {
        use SendStatus::*;
        match (self, next) {
            (Started, HashReceived) => true,
            // a retried send may obtain a new hash
            (HashReceived, HashReceived) => true,
            (HashReceived, ReceiptReceived) => true,
            (ReceiptReceived, Confirmed | Reverted) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

fn advance(status: &mut SendStatus, next: SendStatus, tx_id: &str) {
    debug_assert!(status.can_advance_to(next), "{:?} -> {:?}", status, next);
    debug!(tx_id, from = ?*status, to = ?next, "Send status");
    *status = next;
}

/// Lifecycle analytics event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransactionEvent {
    #[serde(rename = "transaction_start")]
    Start {
        tx_id: String,
        web3_library: String,
        description: Option<String>,
    },
    #[serde(rename = "transaction_hash_received")]
    HashReceived {
        tx_id: String,
        web3_library: String,
        tx_hash: TxHash,
    },
    #[serde(rename = "transaction_receipt_received")]
    ReceiptReceived { tx_id: String, web3_library: String },
    #[serde(rename = "transaction_confirmed")]
    Confirmed { tx_id: String, web3_library: String },
    #[serde(rename = "transaction_exception")]
    Exception {
        tx_id: String,
        web3_library: String,
        error: String,
    },
}

impl TransactionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TransactionEvent::Start { .. } => "transaction_start",
            TransactionEvent::HashReceived { .. } => "transaction_hash_received",
            TransactionEvent::ReceiptReceived { .. } => "transaction_receipt_received",
            TransactionEvent::Confirmed { .. } => "transaction_confirmed",
            TransactionEvent::Exception { .. } => "transaction_exception",
        }
    }

    pub fn tx_id(&self) -> &str {
        match self {
            TransactionEvent::Start { tx_id, .. }
            | TransactionEvent::HashReceived { tx_id, .. }
            | TransactionEvent::ReceiptReceived { tx_id, .. }
            | TransactionEvent::Confirmed { tx_id, .. }
            | TransactionEvent::Exception { tx_id, .. } => tx_id,
        }
    }
}

/// Callback type for lifecycle events.
pub type TransactionEventHandler = Box<dyn Fn(TransactionEvent) + Send + Sync>;

/// User-facing error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorMessage {
    #[serde(rename = "transactionFailed")]
    TransactionFailed,
}

/// Shows an error to the user.
pub trait ErrorNotifier: Send + Sync {
    fn show_error(&self, message: ErrorMessage);
}

/// Fire-and-forget balance reload.
pub trait BalanceRefresher: Send + Sync {
    fn fetch_token_balances(&self, show_loading: bool);
}

/// Where a monitored send lands.
#[derive(Debug, Clone, Copy)]
pub struct MonitorTarget<'a> {
    pub context: &'a TransactionContext,
    pub network: &'a NetworkConfig,
    pub fee_currency_id: &'a str,
}

/// Submits through a caller-supplied send function and follows the
/// transaction to a terminal state.
pub struct ConfirmationMonitor {
    config: RetryConfig,
    store: Arc<dyn TransactionStore>,
    balances: Arc<dyn BalanceRefresher>,
    notifier: Arc<dyn ErrorNotifier>,
    app_state: AppStateSignal,
    on_event: Option<TransactionEventHandler>,
}

impl ConfirmationMonitor {
    pub fn new(
        config: RetryConfig,
        store: Arc<dyn TransactionStore>,
        balances: Arc<dyn BalanceRefresher>,
        notifier: Arc<dyn ErrorNotifier>,
        app_state: AppStateSignal,
        on_event: Option<TransactionEventHandler>,
    ) -> Self {
        Self {
            config,
            store,
            balances,
            notifier,
            app_state,
            on_event,
        }
    }

    fn emit(&self, event: TransactionEvent) {
        if let Some(ref handler) = self.on_event {
            handler(event);
        }
    }

    /// Report a failure that happened before monitoring began.
    pub fn report_failure(&self, context: &TransactionContext, web3_library: &str, err: &SendError) {
        self.emit(TransactionEvent::Exception {
            tx_id: context.id.clone(),
            web3_library: web3_library.to_string(),
            error: err.to_string(),
        });
        self.notifier.show_error(ErrorMessage::TransactionFailed);
    }

    /// Send via `send_tx` (re-invoked on retry) and wait for confirmation.
    ///
    /// `send_tx` must submit and return the hash; it is only called again if
    /// no hash was obtained in the previous attempt. The record built by
    /// `standby_for` is stored once the hash is known.
    pub async fn monitor<F, Fut, S>(
        &self,
        client: &dyn NetworkClient,
        target: MonitorTarget<'_>,
        send_tx: F,
        standby_for: S,
    ) -> Result<TransactionOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TxHash>>,
        S: Fn(TxHash) -> StandbyTransaction,
    {
        let context = target.context;
        let library = target.network.signer_backend.library_name();
        debug!(tx_id = %context.id, "Sending transaction");

        self.emit(TransactionEvent::Start {
            tx_id: context.id.clone(),
            web3_library: library.to_string(),
            description: context.description.clone(),
        });

        let mut status = SendStatus::Started;
        match self
            .send_and_confirm(client, target, library, send_tx, standby_for, &mut status)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if !status.is_terminal() {
                    advance(&mut status, SendStatus::Failed, &context.id);
                }
                error!(tx_id = %context.id, status = ?status, error = %err, "Error sending tx");
                self.report_failure(context, library, &err);
                Err(err)
            }
        }
    }

    async fn send_and_confirm<F, Fut, S>(
        &self,
        client: &dyn NetworkClient,
        target: MonitorTarget<'_>,
        library: &str,
        send_tx: F,
        standby_for: S,
        status: &mut SendStatus,
    ) -> Result<TransactionOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TxHash>>,
        S: Fn(TxHash) -> StandbyTransaction,
    {
        let context = target.context;
        let receipt = self
            .send_with_retry(client, context, library, send_tx, standby_for, status)
            .await?;

        self.store
            .handle_transaction_receipt_received(
                &context.id,
                &receipt,
                target.network.network_id,
                target.fee_currency_id,
            )
            .await?;

        if receipt.status == ReceiptStatus::Reverted {
            advance(status, SendStatus::Reverted, &context.id);
            return Err(SendError::Reverted {
                hash: receipt.transaction_hash,
            });
        }

        advance(status, SendStatus::Confirmed, &context.id);
        self.emit(TransactionEvent::Confirmed {
            tx_id: context.id.clone(),
            web3_library: library.to_string(),
        });
        self.balances.fetch_token_balances(true);
        Ok(TransactionOutcome::from(&receipt))
    }

    async fn send_with_retry<F, Fut, S>(
        &self,
        client: &dyn NetworkClient,
        context: &TransactionContext,
        library: &str,
        mut send_tx: F,
        standby_for: S,
        status: &mut SendStatus,
    ) -> Result<TransactionReceipt>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<TxHash>>,
        S: Fn(TxHash) -> StandbyTransaction,
    {
        let mut controller = TimeoutController::new(
            Duration::from_millis(self.config.attempt_timeout_ms),
            Duration::from_millis(self.config.background_grace_ms),
            self.app_state.subscribe(),
        );
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let mut hash_seen: Option<TxHash> = None;

            let result = controller
                .run(async {
                    let hash = send_tx().await?;
                    hash_seen = Some(hash);
                    // Already broadcast: a failed history write is not a send failure.
                    if let Err(err) = self.store.add_standby_transaction(&standby_for(hash)).await {
                        warn!(tx_id = %context.id, hash = %hash, error = %err, "Could not record standby transaction");
                    }
                    advance(status, SendStatus::HashReceived, &context.id);
                    self.emit(TransactionEvent::HashReceived {
                        tx_id: context.id.clone(),
                        web3_library: library.to_string(),
                        tx_hash: hash,
                    });

                    let receipt = client.wait_for_transaction_receipt(&hash).await?;
                    advance(status, SendStatus::ReceiptReceived, &context.id);
                    self.emit(TransactionEvent::ReceiptReceived {
                        tx_id: context.id.clone(),
                        web3_library: library.to_string(),
                    });
                    Ok::<_, SendError>(receipt)
                })
                .await;

            // Once a hash exists the transaction is on its way; sending again
            // would submit a second transfer.
            let can_retry = hash_seen.is_none() && attempt < max_attempts;
            match result {
                Ok(Ok(receipt)) => return Ok(receipt),
                Ok(Err(err)) if can_retry && err.is_retryable() => {
                    warn!(tx_id = %context.id, attempt, error = %err, "Send failed, retrying");
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Ok(Err(err)) => return Err(err),
                Err(Elapsed) if can_retry => {
                    warn!(tx_id = %context.id, attempt, "No hash before deadline, retrying");
                }
                Err(Elapsed) => {
                    return Err(SendError::Timeout { attempts: attempt });
                }
            }
        }
    }
}
