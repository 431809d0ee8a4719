//! Configuration types.

use crate::serde_helpers::{deserialize_eid_map, serialize_eid_map};
use omni_types::EndpointId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Enables the batched confirmation wait when set to any non-empty value.
pub const BATCHED_WAIT_ENV: &str = "LZ_ENABLE_EXPERIMENTAL_BATCHED_WAIT";
/// Enables batch submission when set to any non-empty value.
pub const BATCHED_SEND_ENV: &str = "LZ_ENABLE_EXPERIMENTAL_BATCHED_SEND";
/// Maximum number of transactions per submitted batch.
pub const BATCH_SIZE_ENV: &str = "LZ_BATCH_SIZE";

/// Complete devtools configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DevtoolsConfig {
	/// How transactions are submitted
	#[serde(default)]
	pub submission: SubmissionConfig,
	/// RPC settings per network
	#[serde(
		default,
		deserialize_with = "deserialize_eid_map",
		serialize_with = "serialize_eid_map"
	)]
	pub networks: HashMap<EndpointId, NetworkConfig>,
}

/// Submission modes of the sign & send pipeline.
///
/// Read once when the pipeline is created; every call made through that
/// pipeline uses the same modes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubmissionConfig {
	/// Submit every transaction of a chain before waiting for any of them.
	#[serde(default)]
	pub batched_wait: bool,
	/// Submit a chain's transactions as a single batch when the signer supports it.
	#[serde(default)]
	pub batched_send: bool,
	/// Split batches into chunks of at most this many transactions.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub batch_size: Option<usize>,
}

impl SubmissionConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_batched_wait(mut self, enabled: bool) -> Self {
		self.batched_wait = enabled;
		self
	}

	pub fn with_batched_send(mut self, enabled: bool) -> Self {
		self.batched_send = enabled;
		self
	}

	pub fn with_batch_size(mut self, batch_size: usize) -> Self {
		self.batch_size = Some(batch_size);
		self
	}
}

/// Per-network RPC settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Network name for logging
	#[serde(default)]
	pub name: Option<String>,
	/// JSON-RPC endpoint URL
	pub rpc_url: String,
	/// Account the node signs with
	pub from: String,
	/// Block confirmations to wait for
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	/// Receipt polling interval in milliseconds
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// Give up waiting for a receipt after this many seconds
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
}

fn default_confirmations() -> u64 {
	1
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_timeout_secs() -> u64 {
	120
}
