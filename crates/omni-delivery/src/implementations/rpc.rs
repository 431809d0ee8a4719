//! JSON-RPC signer for EVM nodes that manage the signing account
//! themselves (local dev nodes, forks, unlocked accounts).
//!
//! Transactions are signed with `eth_signTransaction`, submitted with
//! `eth_sendTransaction` and confirmed by polling
//! `eth_getTransactionReceipt` and `eth_blockNumber`.

use async_trait::async_trait;
use omni_config::NetworkConfig;
use omni_types::{
	assert_transaction_eid, format::format_eid, Confirmation, EndpointId, OmniPoint, OmniSigner,
	OmniTransaction, SignerError, SignerFactory, TransactionHash, TransactionReceipt,
	TransactionResponse,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, SignerError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
	code: i64,
	message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
	transaction_hash: String,
	block_number: Option<String>,
	#[serde(default)]
	status: Option<String>,
}

/// Minimal JSON-RPC 2.0 client over HTTP.
#[derive(Debug)]
pub struct RpcClient {
	client: reqwest::Client,
	url: String,
	next_id: AtomicU64,
}

impl RpcClient {
	pub fn new(url: impl Into<String>) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| SignerError::Rpc(format!("Failed to create HTTP client: {}", e)))?;

		Ok(Self {
			client,
			url: url.into(),
			next_id: AtomicU64::new(1),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Calls `method` and decodes its result. A `null` result decodes
	/// into `T` as well, so `Option<_>` results work.
	pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		let response = self
			.client
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|e| SignerError::Rpc(format!("{} request failed: {}", method, e)))?;

		if !response.status().is_success() {
			return Err(SignerError::Rpc(format!(
				"{} request failed with status: {}",
				method,
				response.status()
			)));
		}

		let response: RpcResponse = response
			.json()
			.await
			.map_err(|e| SignerError::Rpc(format!("Failed to parse {} response: {}", method, e)))?;

		if let Some(error) = response.error {
			return Err(SignerError::Rpc(format!(
				"{} failed with code {}: {}",
				method, error.code, error.message
			)));
		}

		serde_json::from_value(response.result.unwrap_or(Value::Null))
			.map_err(|e| SignerError::Rpc(format!("Unexpected {} result: {}", method, e)))
	}
}

fn parse_quantity(value: &str) -> Result<u64> {
	let digits = value.strip_prefix("0x").unwrap_or(value);
	u64::from_str_radix(digits, 16)
		.map_err(|e| SignerError::Rpc(format!("Invalid quantity {}: {}", value, e)))
}

/// Signer backed by a node that signs for `from`.
#[derive(Debug, Clone)]
pub struct RpcSigner {
	eid: EndpointId,
	network: NetworkConfig,
	client: Arc<RpcClient>,
}

impl RpcSigner {
	pub fn new(eid: EndpointId, network: NetworkConfig) -> Result<Self> {
		let client = Arc::new(RpcClient::new(network.rpc_url.clone())?);
		Ok(Self {
			eid,
			network,
			client,
		})
	}

	fn transaction_params(&self, transaction: &OmniTransaction) -> Value {
		json!([{
			"from": self.network.from,
			"to": transaction.point.address,
			"data": format!("0x{}", hex::encode(&transaction.data)),
		}])
	}
}

#[async_trait]
impl OmniSigner for RpcSigner {
	fn point(&self) -> OmniPoint {
		OmniPoint::new(self.eid, self.network.from.clone())
	}

	async fn sign(&self, transaction: &OmniTransaction) -> Result<String> {
		assert_transaction_eid(self.eid, transaction)?;

		let signed: Value = self
			.client
			.request("eth_signTransaction", self.transaction_params(transaction))
			.await?;

		// Nodes answer either with the raw transaction or with `{ raw, tx }`
		match &signed {
			Value::String(raw) => Ok(raw.clone()),
			Value::Object(fields) => fields
				.get("raw")
				.and_then(Value::as_str)
				.map(str::to_string)
				.ok_or_else(|| {
					SignerError::Rpc("eth_signTransaction returned no raw transaction".to_string())
				}),
			_ => Err(SignerError::Rpc(format!(
				"Unexpected eth_signTransaction result: {}",
				signed
			))),
		}
	}

	async fn sign_and_send(&self, transaction: &OmniTransaction) -> Result<TransactionResponse> {
		assert_transaction_eid(self.eid, transaction)?;

		let hash: String = self
			.client
			.request("eth_sendTransaction", self.transaction_params(transaction))
			.await
			.map_err(|e| SignerError::Submission(e.to_string()))?;

		info!(
			"Submitted transaction {} on {}",
			hash,
			format_eid(self.eid)
		);

		let hash = TransactionHash(hash);
		let confirmation = RpcConfirmation {
			client: self.client.clone(),
			transaction_hash: hash.clone(),
			confirmations: self.network.confirmations,
			poll_interval: Duration::from_millis(self.network.poll_interval_ms),
			timeout: Duration::from_secs(self.network.timeout_secs),
		};

		Ok(TransactionResponse::new(hash, confirmation))
	}
}

/// Polls the node until a submitted transaction is confirmed.
struct RpcConfirmation {
	client: Arc<RpcClient>,
	transaction_hash: TransactionHash,
	confirmations: u64,
	poll_interval: Duration,
	timeout: Duration,
}

#[async_trait]
impl Confirmation for RpcConfirmation {
	async fn wait(self: Box<Self>, confirmations: Option<u64>) -> Result<TransactionReceipt> {
		let confirmations = confirmations.unwrap_or(self.confirmations).max(1);
		let tx_hash = &self.transaction_hash;
		let start_time = tokio::time::Instant::now();
		let mut attempts = 0u64;

		loop {
			attempts += 1;

			debug!("Attempt {} to get receipt for tx {}", attempts, tx_hash);
			let receipt: Option<RpcReceipt> = self
				.client
				.request("eth_getTransactionReceipt", json!([tx_hash.0]))
				.await?;

			let mined = receipt
				.and_then(|receipt| receipt.block_number.clone().map(|block| (receipt, block)));
			match mined {
				Some((receipt, block)) => {
					if receipt.status.as_deref() == Some("0x0") {
						return Err(SignerError::Confirmation(format!(
							"Transaction {} reverted",
							tx_hash
						)));
					}

					let block_number = parse_quantity(&block)?;
					let current_block: String =
						self.client.request("eth_blockNumber", json!([])).await?;
					let current_block = parse_quantity(&current_block)?;

					// The inclusion block is the first confirmation
					let required = block_number.saturating_add(confirmations);
					if current_block.saturating_add(1) >= required {
						info!(
							"Transaction {} confirmed after {} attempts in {}ms",
							tx_hash,
							attempts,
							start_time.elapsed().as_millis()
						);

						return Ok(TransactionReceipt {
							transaction_hash: TransactionHash(receipt.transaction_hash),
							block_number: Some(block_number),
							success: true,
						});
					}

					debug!(
						"Transaction {} waiting for confirmations: \
						 current block {}, tx block {}, need {}",
						tx_hash, current_block, block_number, confirmations
					);
				}
				None => {
					debug!("Transaction {} not yet mined (attempt {})", tx_hash, attempts);
				}
			}

			if start_time.elapsed() >= self.timeout {
				return Err(SignerError::Confirmation(format!(
					"Transaction {} confirmation timeout after {}s",
					tx_hash,
					self.timeout.as_secs()
				)));
			}

			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

/// Creates [`RpcSigner`]s for the configured networks.
#[derive(Debug, Clone, Default)]
pub struct RpcSignerFactory {
	networks: HashMap<EndpointId, NetworkConfig>,
}

impl RpcSignerFactory {
	pub fn new(networks: HashMap<EndpointId, NetworkConfig>) -> Self {
		Self { networks }
	}

	pub fn supports(&self, eid: EndpointId) -> bool {
		self.networks.contains_key(&eid)
	}
}

#[async_trait]
impl SignerFactory for RpcSignerFactory {
	async fn create_signer(&self, eid: EndpointId) -> Result<Arc<dyn OmniSigner>> {
		let network = self.networks.get(&eid).ok_or_else(|| {
			SignerError::Other(format!("No network configured for {}", format_eid(eid)))
		})?;

		debug!("Connecting to {} for {}", network.rpc_url, format_eid(eid));
		Ok(Arc::new(RpcSigner::new(eid, network.clone())?))
	}
}
