//! Transaction types for the submission pipeline.
//!
//! An [`OmniTransaction`] is an opaque unit of work addressed to one chain.
//! Once submitted it yields a [`TransactionResponse`] whose deferred wait
//! resolves to a [`TransactionReceipt`]. The pipeline reports its outcome
//! as a [`SignAndSendResult`].

use crate::{errors::Result, omnigraph::OmniPoint, SignerError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A transaction addressed to a contract on one chain.
///
/// The payload is chain specific and never interpreted by the pipeline.
/// Transactions are shared as [`SharedTransaction`] so that the exact
/// object handed to the pipeline is the one returned in its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OmniTransaction {
	pub point: OmniPoint,
	#[serde(with = "hex_bytes")]
	pub data: Bytes,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

pub type SharedTransaction = Arc<OmniTransaction>;

impl OmniTransaction {
	pub fn new(point: OmniPoint, data: impl Into<Bytes>) -> Self {
		Self {
			point,
			data: data.into(),
			description: None,
		}
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}
}

/// Hash (or signature) identifying a submitted transaction.
///
/// Kept as a string since every chain family encodes it differently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHash(pub String);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for TransactionHash {
	fn from(hash: &str) -> Self {
		TransactionHash(hash.to_string())
	}
}

/// Confirmation data for a transaction that made it on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub transaction_hash: TransactionHash,
	/// The block the transaction was included in, when the chain has blocks.
	pub block_number: Option<u64>,
	/// Whether the transaction executed successfully.
	pub success: bool,
}

/// Deferred confirmation of a submitted transaction.
///
/// Consumed on use: a response can only be waited for once.
#[async_trait]
pub trait Confirmation: Send {
	/// Resolves once the transaction has the requested number of
	/// confirmations (`None` leaves the choice to the implementation).
	async fn wait(self: Box<Self>, confirmations: Option<u64>) -> Result<TransactionReceipt>;
}

/// A confirmation backed by an already constructed future.
struct FutureConfirmation(BoxFuture<'static, Result<TransactionReceipt>>);

#[async_trait]
impl Confirmation for FutureConfirmation {
	async fn wait(self: Box<Self>, _confirmations: Option<u64>) -> Result<TransactionReceipt> {
		self.0.await
	}
}

/// Response returned right after submission, before confirmation.
pub struct TransactionResponse {
	pub transaction_hash: TransactionHash,
	confirmation: Box<dyn Confirmation>,
}

impl TransactionResponse {
	pub fn new(
		transaction_hash: TransactionHash,
		confirmation: impl Confirmation + 'static,
	) -> Self {
		Self {
			transaction_hash,
			confirmation: Box::new(confirmation),
		}
	}

	/// Builds a response whose wait resolves to the output of `wait`.
	pub fn from_future<F>(transaction_hash: TransactionHash, wait: F) -> Self
	where
		F: Future<Output = Result<TransactionReceipt>> + Send + 'static,
	{
		Self {
			transaction_hash,
			confirmation: Box::new(FutureConfirmation(Box::pin(wait))),
		}
	}

	/// A response that confirms immediately with `receipt`.
	pub fn confirmed(receipt: TransactionReceipt) -> Self {
		let hash = receipt.transaction_hash.clone();
		Self::from_future(hash, futures::future::ready(Ok(receipt)))
	}

	/// A response whose confirmation fails with `error`.
	pub fn reverted(transaction_hash: TransactionHash, error: SignerError) -> Self {
		Self::from_future(transaction_hash, futures::future::ready(Err(error)))
	}

	pub async fn wait(self) -> Result<TransactionReceipt> {
		self.confirmation.wait(None).await
	}

	pub async fn wait_for(self, confirmations: u64) -> Result<TransactionReceipt> {
		self.confirmation.wait(Some(confirmations)).await
	}
}

impl fmt::Debug for TransactionResponse {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransactionResponse")
			.field("transaction_hash", &self.transaction_hash)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmniTransactionWithReceipt {
	pub transaction: SharedTransaction,
	pub receipt: TransactionReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmniTransactionWithError {
	pub transaction: SharedTransaction,
	pub error: SignerError,
}

#[derive(Debug)]
pub struct OmniTransactionWithResponse {
	pub transaction: SharedTransaction,
	pub response: TransactionResponse,
}

/// Outcome of a sign & send call.
///
/// `pending` holds every transaction that has not been confirmed,
/// including the ones listed in `failed`, so it is the list to retry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignAndSendResult {
	/// Transactions that were submitted and confirmed.
	pub succeeded: Vec<OmniTransactionWithReceipt>,
	/// Transactions that failed along with their errors.
	pub failed: Vec<OmniTransactionWithError>,
	/// Transactions that have not been confirmed.
	pub pending: Vec<SharedTransaction>,
}

impl SignAndSendResult {
	pub fn is_complete(&self) -> bool {
		self.failed.is_empty() && self.pending.is_empty()
	}

	/// Appends another result, keeping the order of both.
	pub fn extend(&mut self, other: SignAndSendResult) {
		self.succeeded.extend(other.succeeded);
		self.failed.extend(other.failed);
		self.pending.extend(other.pending);
	}

	pub fn into_parts(
		self,
	) -> (
		Vec<OmniTransactionWithReceipt>,
		Vec<OmniTransactionWithError>,
		Vec<SharedTransaction>,
	) {
		(self.succeeded, self.failed, self.pending)
	}
}

/// Hex (de)serialization for transaction payloads, `0x` prefix optional on input.
mod hex_bytes {
	use bytes::Bytes;
	use serde::{de::Error, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("0x{}", hex::encode(data)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		let stripped = value.strip_prefix("0x").unwrap_or(&value);

		hex::decode(stripped)
			.map(Bytes::from)
			.map_err(|e| D::Error::custom(format!("Invalid hex data: {}", e)))
	}
}
