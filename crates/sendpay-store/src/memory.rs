//! In-memory registry and store (for testing and ephemeral use).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::*;
use sendpay_types::Result;
use tracing::debug;

/// In-memory transaction history.
pub struct MemoryStore {
    standby: Mutex<Vec<StandbyTransaction>>,
    completed: Mutex<Vec<CompletedTransaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            standby: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn add_standby_transaction(&self, tx: &StandbyTransaction) -> Result<()> {
        let mut standby = self.standby.lock().unwrap();
        if let Some(existing) = standby.iter_mut().find(|s| s.context.id == tx.context.id) {
            *existing = tx.clone();
        } else {
            standby.push(tx.clone());
        }
        Ok(())
    }

    async fn handle_transaction_receipt_received(
        &self,
        context_id: &str,
        receipt: &TransactionReceipt,
        network_id: NetworkId,
        fee_currency_id: &str,
    ) -> Result<()> {
        let settled = {
            let mut standby = self.standby.lock().unwrap();
            standby
                .iter()
                .position(|s| s.context.id == context_id)
                .map(|i| standby.remove(i))
        };
        debug!(
            context_id,
            hash = %receipt.transaction_hash,
            had_standby = settled.is_some(),
            "Reconciled receipt"
        );

        self.completed.lock().unwrap().push(CompletedTransaction {
            context_id: context_id.to_string(),
            network_id,
            fee_currency_id: fee_currency_id.to_string(),
            status: receipt.status,
            receipt: receipt.clone(),
            standby: settled,
        });
        Ok(())
    }

    async fn list_standby_transactions(&self) -> Result<Vec<StandbyTransaction>> {
        Ok(self.standby.lock().unwrap().clone())
    }

    async fn list_completed_transactions(&self) -> Result<Vec<CompletedTransaction>> {
        Ok(self.completed.lock().unwrap().clone())
    }
}

/// In-memory token registry keyed by token id.
#[derive(Default)]
pub struct MemoryTokenRegistry {
    tokens: Mutex<HashMap<String, TokenDescriptor>>,
}

impl MemoryTokenRegistry {
    pub fn new(tokens: impl IntoIterator<Item = TokenDescriptor>) -> Self {
        Self {
            tokens: Mutex::new(
                tokens
                    .into_iter()
                    .map(|t| (t.token_id.clone(), t))
                    .collect(),
            ),
        }
    }

    pub fn insert(&self, token: TokenDescriptor) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.token_id.clone(), token);
    }
}

#[async_trait]
impl TokenRegistry for MemoryTokenRegistry {
    async fn get_token_info(&self, token_id: &str) -> Result<Option<TokenDescriptor>> {
        Ok(self.tokens.lock().unwrap().get(token_id).cloned())
    }
}
