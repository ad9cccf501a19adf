//! JSON-RPC client for a blockchain node.
//!
//! Methods used:
//! - eth_call
//! - eth_estimateGas
//! - eth_getTransactionReceipt

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sendpay_types::{
    bytes_to_hex, Address, BigUint, FeeDescriptor, Hex, NetworkConfig, ReceiptStatus, Result,
    SendError, TransactionReceipt, TxHash,
};
use tracing::{debug, warn};

use crate::{CallRequest, ContractCallRequest, NetworkClient, SimulatedContract};

/// RPC client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcClientConfig {
    pub request_timeout_ms: u64,
    pub receipt_poll_ms: u64,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            receipt_poll_ms: 1_000,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// JSON-RPC response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    pub id: u64,
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

/// Transaction object for `eth_call` / `eth_estimateGas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCallObject {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Hex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_currency: Option<String>,
}

impl RpcCallObject {
    fn new(
        from: &Address,
        to: &Address,
        value: Option<&BigUint>,
        data: Option<&[u8]>,
        fees: &FeeDescriptor,
    ) -> Self {
        Self {
            from: from.to_checksum(),
            to: to.to_checksum(),
            value: value.map(|v| format!("0x{:x}", v)),
            data: data.map(bytes_to_hex),
            gas: fees.gas.map(|g| format!("0x{:x}", g)),
            max_fee_per_gas: fees.max_fee_per_gas.map(|m| format!("0x{:x}", m)),
            fee_currency: fees.fee_currency.map(|c| c.to_checksum()),
        }
    }
}

impl From<&CallRequest> for RpcCallObject {
    fn from(req: &CallRequest) -> Self {
        Self::new(
            &req.from,
            &req.to,
            req.value.as_ref(),
            req.data.as_deref(),
            &req.fees,
        )
    }
}

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: String,
    pub status: String,
    pub block_number: String,
    pub block_hash: String,
    pub gas_used: String,
    pub effective_gas_price: Option<String>,
}

fn parse_quantity(value: &str, field: &str) -> Result<u128> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    u128::from_str_radix(digits, 16)
        .map_err(|_| SendError::Transport(format!("invalid {} quantity: {}", field, value)))
}

impl TryFrom<RpcReceipt> for TransactionReceipt {
    type Error = SendError;

    fn try_from(r: RpcReceipt) -> Result<Self> {
        let status = match parse_quantity(&r.status, "status")? {
            1 => ReceiptStatus::Success,
            _ => ReceiptStatus::Reverted,
        };
        let block_number = u64::try_from(parse_quantity(&r.block_number, "blockNumber")?)
            .map_err(|_| SendError::Transport(format!("blockNumber out of range: {}", r.block_number)))?;
        let gas_used = u64::try_from(parse_quantity(&r.gas_used, "gasUsed")?)
            .map_err(|_| SendError::Transport(format!("gasUsed out of range: {}", r.gas_used)))?;
        let effective_gas_price = r
            .effective_gas_price
            .as_deref()
            .map(|p| parse_quantity(p, "effectiveGasPrice"))
            .transpose()?;

        Ok(Self {
            transaction_hash: r.transaction_hash.parse()?,
            status,
            block_number,
            block_hash: r.block_hash.parse()?,
            gas_used,
            effective_gas_price,
        })
    }
}

/// JSON-RPC node client for one network.
pub struct RpcClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    receipt_poll: Duration,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(base_url: &str, config: &RpcClientConfig) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(config.request_timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(config.request_timeout_ms),
            receipt_poll: Duration::from_millis(config.receipt_poll_ms),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn for_network(network: &NetworkConfig, config: &RpcClientConfig) -> Self {
        Self::new(&network.rpc_url, config)
    }

    /// Issue one JSON-RPC request. Node-reported errors come back as
    /// `Err(RpcError)` inside the `Ok`, transport problems as `SendError`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<std::result::Result<Option<T>, RpcError>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.base_url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| SendError::Transport(format!("{} request failed: {}", method, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(SendError::Transport(format!(
                "{} returned status {}: {}",
                method, status, text
            )));
        }

        let parsed: RpcResponse<T> = resp
            .json()
            .await
            .map_err(|e| SendError::Transport(format!("failed to parse {} response: {}", method, e)))?;

        match parsed.error {
            Some(err) => Ok(Err(err)),
            None => Ok(Ok(parsed.result)),
        }
    }

    async fn eth_call(&self, tx: &RpcCallObject) -> Result<Hex> {
        match self.request::<Hex>("eth_call", json!([tx, "latest"])).await? {
            Ok(result) => Ok(result.unwrap_or_else(|| "0x".to_string())),
            Err(err) => Err(SendError::Simulation(err.message)),
        }
    }

    async fn estimate_gas(&self, tx: &RpcCallObject) -> Result<u64> {
        match self.request::<String>("eth_estimateGas", json!([tx])).await? {
            Ok(Some(quantity)) => u64::try_from(parse_quantity(&quantity, "gas")?)
                .map_err(|_| SendError::Simulation(format!("gas estimate out of range: {}", quantity))),
            Ok(None) => Err(SendError::Simulation("empty gas estimate".into())),
            Err(err) => Err(SendError::Simulation(err.message)),
        }
    }

    /// Fetch a receipt once; `None` while the transaction is pending.
    pub async fn get_transaction_receipt(&self, hash: &TxHash) -> Result<Option<TransactionReceipt>> {
        match self
            .request::<RpcReceipt>("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?
        {
            Ok(Some(receipt)) => Ok(Some(receipt.try_into()?)),
            Ok(None) => Ok(None),
            Err(err) => Err(SendError::Transport(err.message)),
        }
    }
}

#[async_trait]
impl NetworkClient for RpcClient {
    async fn call(&self, request: &CallRequest) -> Result<Hex> {
        self.eth_call(&RpcCallObject::from(request)).await
    }

    async fn simulate_contract(&self, request: &ContractCallRequest) -> Result<SimulatedContract> {
        let data = request.calldata()?;
        let tx = RpcCallObject::new(
            &request.account,
            &request.address,
            None,
            Some(&data),
            &request.fees,
        );
        let result = self.eth_call(&tx).await?;

        let mut request = request.clone();
        if request.fees.gas.is_none() {
            let gas = self.estimate_gas(&tx).await?;
            debug!(gas, "Simulation filled in gas limit");
            request.fees.gas = Some(gas);
        }

        Ok(SimulatedContract { request, result })
    }

    /// Poll until mined. Unbounded: the caller owns the deadline.
    async fn wait_for_transaction_receipt(&self, hash: &TxHash) -> Result<TransactionReceipt> {
        loop {
            match self.get_transaction_receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                Err(e) => warn!(%hash, error = %e, "Receipt poll failed"),
            }
            tokio::time::sleep(self.receipt_poll).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn call_object_omits_absent_fields() {
        let req = CallRequest {
            from: addr("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359"),
            to: addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            value: Some(BigUint::from(255u32)),
            data: None,
            fees: FeeDescriptor {
                fee_currency: None,
                gas: Some(21_000),
                max_fee_per_gas: None,
            },
        };
        let json = serde_json::to_value(RpcCallObject::from(&req)).unwrap();
        assert_eq!(json["value"], "0xff");
        assert_eq!(json["gas"], "0x5208");
        assert_eq!(json["to"], "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(json.get("data").is_none());
        assert!(json.get("maxFeePerGas").is_none());
        assert!(json.get("feeCurrency").is_none());
    }

    #[test]
    fn receipt_parses_status_and_quantities() {
        let raw: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "ab".repeat(32)),
            "status": "0x0",
            "blockNumber": "0x10",
            "blockHash": format!("0x{}", "cd".repeat(32)),
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00"
        }))
        .unwrap();
        let receipt = TransactionReceipt::try_from(raw).unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.effective_gas_price, Some(1_000_000_000));
    }

    #[test]
    fn successful_receipt_status() {
        let raw = RpcReceipt {
            transaction_hash: format!("0x{}", "01".repeat(32)),
            status: "0x1".into(),
            block_number: "0x1".into(),
            block_hash: format!("0x{}", "02".repeat(32)),
            gas_used: "0x0".into(),
            effective_gas_price: None,
        };
        let receipt = TransactionReceipt::try_from(raw).unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Success);
        assert_eq!(receipt.effective_gas_price, None);
    }

    mod node {
        use std::sync::{Arc, Mutex};

        use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
        use serde_json::{json, Value};

        /// Minimal JSON-RPC node answering from fixed replies.
        #[derive(Default)]
        pub struct Node {
            pub methods: Mutex<Vec<String>>,
            pub revert: bool,
            pub unavailable: bool,
        }

        async fn handle(State(node): State<Arc<Node>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            let method = body["method"].as_str().unwrap_or_default().to_string();
            node.methods.lock().unwrap().push(method.clone());
            if node.unavailable {
                return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})));
            }

            let id = body["id"].clone();
            let reply = match method.as_str() {
                "eth_call" if node.revert => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": 3, "message": "execution reverted" }
                }),
                "eth_call" => json!({ "jsonrpc": "2.0", "id": id, "result": "0x01" }),
                "eth_estimateGas" => json!({ "jsonrpc": "2.0", "id": id, "result": "0x5208" }),
                _ => json!({ "jsonrpc": "2.0", "id": id, "result": null }),
            };
            (StatusCode::OK, Json(reply))
        }

        /// Serve `node` on an ephemeral port and return its URL.
        pub async fn spawn(node: Arc<Node>) -> String {
            let app = Router::new().route("/", post(handle)).with_state(node);
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }
    }

    fn transfer(gas: Option<u64>) -> ContractCallRequest {
        ContractCallRequest {
            account: addr("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359"),
            address: addr("0x765de816845861e75a25fca122bb6898b8b1282a"),
            function: crate::TransferFunction::Transfer,
            recipient: addr("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            amount: BigUint::from(1_000u32),
            comment: None,
            fees: FeeDescriptor {
                fee_currency: None,
                gas,
                max_fee_per_gas: None,
            },
        }
    }

    async fn client_for(node: node::Node) -> (RpcClient, std::sync::Arc<node::Node>) {
        let node = std::sync::Arc::new(node);
        let url = node::spawn(node.clone()).await;
        (RpcClient::new(&url, &RpcClientConfig::default()), node)
    }

    #[tokio::test]
    async fn simulation_fills_missing_gas_from_estimate() {
        let (client, node) = client_for(node::Node::default()).await;

        let simulated = client.simulate_contract(&transfer(None)).await.unwrap();
        assert_eq!(simulated.result, "0x01");
        assert_eq!(simulated.request.fees.gas, Some(21_000));
        assert_eq!(
            *node.methods.lock().unwrap(),
            vec!["eth_call".to_string(), "eth_estimateGas".to_string()]
        );
    }

    #[tokio::test]
    async fn simulation_keeps_a_given_gas_limit() {
        let (client, node) = client_for(node::Node::default()).await;

        let simulated = client.simulate_contract(&transfer(Some(60_000))).await.unwrap();
        assert_eq!(simulated.request, transfer(Some(60_000)));
        assert_eq!(*node.methods.lock().unwrap(), vec!["eth_call".to_string()]);
    }

    #[tokio::test]
    async fn node_error_is_a_simulation_failure() {
        let (client, node) = client_for(node::Node {
            revert: true,
            ..Default::default()
        })
        .await;

        let err = client.simulate_contract(&transfer(None)).await.unwrap_err();
        assert_eq!(err, SendError::Simulation("execution reverted".into()));
        assert!(!err.is_retryable());
        // no estimate once the call itself failed
        assert_eq!(*node.methods.lock().unwrap(), vec!["eth_call".to_string()]);
    }

    #[tokio::test]
    async fn http_failure_is_a_retryable_transport_error() {
        let (client, _node) = client_for(node::Node {
            unavailable: true,
            ..Default::default()
        })
        .await;

        let err = client.simulate_contract(&transfer(None)).await.unwrap_err();
        assert!(matches!(err, SendError::Transport(ref msg) if msg.contains("503")));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn pending_receipt_is_none() {
        let (client, node) = client_for(node::Node::default()).await;

        let receipt = client.get_transaction_receipt(&TxHash([9; 32])).await.unwrap();
        assert!(receipt.is_none());
        assert_eq!(
            *node.methods.lock().unwrap(),
            vec!["eth_getTransactionReceipt".to_string()]
        );
    }
}
