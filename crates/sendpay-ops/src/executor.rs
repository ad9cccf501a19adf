//! Submission: dry run, unlock, sign and broadcast, then hand over to the
//! confirmation monitor.
//!
//! Order per send: simulate/check -> unlock -> submit -> standby -> monitor.
//! The standby record is written by the monitor once the hash is known.

use sendpay_monitor::{ConfirmationMonitor, MonitorTarget};
use sendpay_store::StandbyTransaction;
use sendpay_tx::{
    ContractCallRequest, NativeTransferRequest, NetworkClient, SigningWallet, TransferPlan,
};
use sendpay_types::{
    Address, BigDecimal, NetworkConfig, Result, SendError, TokenDescriptor, TransactionContext,
    TransactionOutcome, TxHash,
};
use tracing::{debug, error};

/// Everything one send needs after building.
#[derive(Debug, Clone)]
pub struct PendingSend {
    pub context: TransactionContext,
    pub token: TokenDescriptor,
    pub network: NetworkConfig,
    pub plan: TransferPlan,
    /// Human-unit amount, for the standby record.
    pub amount: BigDecimal,
    pub recipient: Address,
    /// Plaintext comment, for the standby record.
    pub comment: String,
    pub fee_currency_id: String,
}

impl PendingSend {
    fn standby(&self, hash: TxHash) -> StandbyTransaction {
        StandbyTransaction::sent(
            &self.context,
            &self.token,
            &self.amount,
            self.recipient,
            &self.comment,
            hash,
            &self.fee_currency_id,
        )
    }

    fn target(&self) -> MonitorTarget<'_> {
        MonitorTarget {
            context: &self.context,
            network: &self.network,
            fee_currency_id: &self.fee_currency_id,
        }
    }
}

pub struct SubmissionExecutor {
    monitor: ConfirmationMonitor,
}

impl SubmissionExecutor {
    pub fn new(monitor: ConfirmationMonitor) -> Self {
        Self { monitor }
    }

    pub async fn execute(
        &self,
        pending: &PendingSend,
        wallet: &dyn SigningWallet,
        client: &dyn NetworkClient,
    ) -> Result<TransactionOutcome> {
        match &pending.plan {
            TransferPlan::ContractCall(request) => {
                self.execute_contract_call(pending, request, wallet, client)
                    .await
            }
            TransferPlan::NativeValue(request) => {
                self.execute_native_transfer(pending, request, wallet, client)
                    .await
            }
        }
    }

    async fn execute_contract_call(
        &self,
        pending: &PendingSend,
        request: &ContractCallRequest,
        wallet: &dyn SigningWallet,
        client: &dyn NetworkClient,
    ) -> Result<TransactionOutcome> {
        let prepared = self
            .before_submit(pending, async {
                let simulated = client.simulate_contract(request).await?;
                debug!(tx_id = %pending.context.id, result = %simulated.result, "Simulated transfer");
                wallet.unlock_account(&request.account).await?;
                Ok::<_, SendError>(simulated.request)
            })
            .await?;

        let request = &prepared;
        self.monitor
            .monitor(
                client,
                pending.target(),
                move || wallet.write_contract(request),
                |hash| pending.standby(hash),
            )
            .await
    }

    async fn execute_native_transfer(
        &self,
        pending: &PendingSend,
        request: &NativeTransferRequest,
        wallet: &dyn SigningWallet,
        client: &dyn NetworkClient,
    ) -> Result<TransactionOutcome> {
        self.before_submit(pending, async {
            // Surfaces insufficient funds before the user is asked to unlock.
            client.call(&request.as_call()).await?;
            wallet.unlock_account(&request.account).await?;
            Ok::<_, SendError>(())
        })
        .await?;

        self.monitor
            .monitor(
                client,
                pending.target(),
                move || wallet.send_transaction(request),
                |hash| pending.standby(hash),
            )
            .await
    }

    /// Failures ahead of submission take the same reporting path as
    /// monitored ones.
    async fn before_submit<T>(
        &self,
        pending: &PendingSend,
        steps: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match steps.await {
            Ok(value) => Ok(value),
            Err(err) => {
                error!(tx_id = %pending.context.id, error = %err, "Transaction failed before submission");
                self.monitor.report_failure(
                    &pending.context,
                    pending.network.signer_backend.library_name(),
                    &err,
                );
                Err(err)
            }
        }
    }
}
