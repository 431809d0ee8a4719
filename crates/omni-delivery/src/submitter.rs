//! Submission of one chain's transactions.
//!
//! A chain's transactions are always submitted in order. What happens
//! between submissions and after a failure depends on the
//! [`SubmissionMode`] selected from the configuration and the signer:
//!
//! - [`SubmissionMode::WaitBeforeSubmittingNext`] waits for every transaction
//!   before submitting the next one and stops at the first failure. This is
//!   the default: a revert only costs the reverted transaction and later
//!   transactions that depend on earlier ones are never sent.
//! - [`SubmissionMode::WaitAfterSendingAll`] submits everything first (still
//!   stopping at the first submission failure) and then waits for all
//!   confirmations at once, so transactions can land in the same block.
//! - [`SubmissionMode::Batched`] hands the whole group (or consecutive chunks
//!   of it) to the signer's batch capability. A batch succeeds or fails as a
//!   whole.

use omni_config::SubmissionConfig;
use omni_types::{
	format::{format_eid, format_point, ordinal, pluralize},
	EndpointId, OmniBatchSigner, OmniSigner, OmniTransactionWithError, OmniTransactionWithReceipt,
	SharedTransaction, SignAndSendResult, SignerError, TransactionReceipt,
};
use futures::stream::{FuturesOrdered, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Receives every success as soon as it is recorded.
pub type ProgressSender = UnboundedSender<OmniTransactionWithReceipt>;

/// How a chain's transactions get submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
	WaitBeforeSubmittingNext,
	WaitAfterSendingAll,
	/// `chunk_size` of `None` submits the whole group as one batch.
	Batched { chunk_size: Option<usize> },
}

impl SubmissionMode {
	/// The mode used when batch submission is not available.
	pub fn sequential(config: &SubmissionConfig) -> Self {
		if config.batched_wait {
			SubmissionMode::WaitAfterSendingAll
		} else {
			SubmissionMode::WaitBeforeSubmittingNext
		}
	}

	pub fn select(config: &SubmissionConfig, signer: &dyn OmniSigner) -> Self {
		if config.batched_send && signer.as_batch().is_some() {
			SubmissionMode::Batched {
				chunk_size: config.batch_size,
			}
		} else {
			Self::sequential(config)
		}
	}
}

/// Bookkeeping for one chain.
///
/// Pending transactions are derived at the end: every transaction of
/// the group that was not confirmed, in group order.
struct ChainRecorder {
	transactions: Vec<SharedTransaction>,
	confirmed: Vec<bool>,
	succeeded: Vec<OmniTransactionWithReceipt>,
	failed: Vec<OmniTransactionWithError>,
	progress: Option<ProgressSender>,
}

impl ChainRecorder {
	fn new(transactions: Vec<SharedTransaction>, progress: Option<ProgressSender>) -> Self {
		Self {
			confirmed: vec![false; transactions.len()],
			transactions,
			succeeded: Vec::new(),
			failed: Vec::new(),
			progress,
		}
	}

	fn succeed(&mut self, index: usize, receipt: TransactionReceipt) {
		let result = OmniTransactionWithReceipt {
			transaction: self.transactions[index].clone(),
			receipt,
		};

		self.confirmed[index] = true;
		if let Some(progress) = &self.progress {
			// The receiver only goes away once every chain is done
			let _ = progress.send(result.clone());
		}
		self.succeeded.push(result);
	}

	fn fail(&mut self, index: usize, error: SignerError) {
		self.failed.push(OmniTransactionWithError {
			transaction: self.transactions[index].clone(),
			error,
		});
	}

	fn finish(self) -> SignAndSendResult {
		let pending = self
			.transactions
			.iter()
			.zip(&self.confirmed)
			.filter(|(_, confirmed)| !**confirmed)
			.map(|(transaction, _)| transaction.clone())
			.collect();

		SignAndSendResult {
			succeeded: self.succeeded,
			failed: self.failed,
			pending,
		}
	}
}

/// Submits the transactions of a single chain.
pub struct ChainSubmitter<'a> {
	eid: EndpointId,
	config: &'a SubmissionConfig,
	progress: Option<ProgressSender>,
}

impl<'a> ChainSubmitter<'a> {
	pub fn new(eid: EndpointId, config: &'a SubmissionConfig) -> Self {
		Self {
			eid,
			config,
			progress: None,
		}
	}

	pub fn with_progress(mut self, progress: ProgressSender) -> Self {
		self.progress = Some(progress);
		self
	}

	/// Processes `transactions` with the signer resolved for this chain.
	///
	/// Never fails: every error ends up in the returned result. When the
	/// signer could not be resolved the first transaction carries the error
	/// and the whole group stays pending.
	pub async fn submit(
		self,
		transactions: Vec<SharedTransaction>,
		signer: Result<Arc<dyn OmniSigner>, SignerError>,
	) -> SignAndSendResult {
		let eid_name = format_eid(self.eid);
		let count = transactions.len();
		let mut recorder = ChainRecorder::new(transactions, self.progress);

		if count == 0 {
			return recorder.finish();
		}

		let signer = match signer {
			Ok(signer) => signer,
			Err(error) => {
				recorder.fail(0, error);
				return recorder.finish();
			}
		};

		let mode = SubmissionMode::select(self.config, signer.as_ref());
		debug!(
			"Signing {} for {} ({:?})",
			pluralize(count, "transaction"),
			eid_name,
			mode
		);

		if self.config.batched_send && !matches!(mode, SubmissionMode::Batched { .. }) {
			warn!(
				"Batched sending is not available for {}, falling back on regular sending",
				eid_name
			);
		}

		match mode {
			SubmissionMode::Batched { chunk_size } => {
				// `select` only picks batches for batch capable signers
				if let Some(batch) = signer.as_batch() {
					send_batched(&eid_name, batch, chunk_size, &mut recorder).await;
				}
			}
			SubmissionMode::WaitAfterSendingAll => {
				wait_after_sending_all(&eid_name, signer.as_ref(), &mut recorder).await;
			}
			SubmissionMode::WaitBeforeSubmittingNext => {
				wait_before_submitting_next(&eid_name, signer.as_ref(), &mut recorder).await;
			}
		}

		let result = recorder.finish();
		debug!(
			"Finished {} for {}: {} succeeded, {} failed, {} pending",
			pluralize(count, "transaction"),
			eid_name,
			result.succeeded.len(),
			result.failed.len(),
			result.pending.len()
		);

		result
	}
}

async fn submit_and_wait(
	signer: &dyn OmniSigner,
	transaction: &SharedTransaction,
	ordinal: &str,
	eid_name: &str,
) -> Result<TransactionReceipt, SignerError> {
	let response = signer.sign_and_send(transaction).await?;
	debug!(
		"Signed {} transaction for {}, got hash {}",
		ordinal, eid_name, response.transaction_hash
	);

	response.wait().await
}

async fn wait_before_submitting_next(
	eid_name: &str,
	signer: &dyn OmniSigner,
	recorder: &mut ChainRecorder,
) {
	let transactions = recorder.transactions.clone();

	for (index, transaction) in transactions.iter().enumerate() {
		let ordinal = ordinal(index + 1);
		debug!(
			"Signing {} transaction for {} to {}",
			ordinal,
			eid_name,
			format_point(&transaction.point)
		);

		match submit_and_wait(signer, transaction, &ordinal, eid_name).await {
			Ok(receipt) => {
				debug!("Finished {} transaction for {}", ordinal, eid_name);
				recorder.succeed(index, receipt);
			}
			Err(error) => {
				debug!(
					"Failed to process {} transaction for {}: {}",
					ordinal, eid_name, error
				);
				recorder.fail(index, error);

				// Everything after a failure stays pending
				return;
			}
		}
	}
}

async fn wait_after_sending_all(
	eid_name: &str,
	signer: &dyn OmniSigner,
	recorder: &mut ChainRecorder,
) {
	let transactions = recorder.transactions.clone();
	let mut responses = Vec::with_capacity(transactions.len());

	for (index, transaction) in transactions.iter().enumerate() {
		let ordinal = ordinal(index + 1);
		debug!(
			"Signing {} transaction for {} to {}",
			ordinal,
			eid_name,
			format_point(&transaction.point)
		);

		match signer.sign_and_send(transaction).await {
			Ok(response) => {
				debug!(
					"Signed {} transaction for {}, got hash {}",
					ordinal, eid_name, response.transaction_hash
				);
				responses.push((index, response));
			}
			Err(error) => {
				debug!(
					"Failed to sign {} transaction for {}: {}",
					ordinal, eid_name, error
				);
				recorder.fail(index, error);
				break;
			}
		}
	}

	let mut waits: FuturesOrdered<_> = responses
		.into_iter()
		.map(|(index, response)| async move { (index, response.wait().await) })
		.collect();

	while let Some((index, result)) = waits.next().await {
		let ordinal = ordinal(index + 1);

		match result {
			Ok(receipt) => {
				debug!("Finished {} transaction for {}", ordinal, eid_name);
				recorder.succeed(index, receipt);
			}
			Err(error) => {
				debug!(
					"Failed to process {} transaction for {}: {}",
					ordinal, eid_name, error
				);
				recorder.fail(index, error);
			}
		}
	}
}

async fn send_batched(
	eid_name: &str,
	signer: &dyn OmniBatchSigner,
	chunk_size: Option<usize>,
	recorder: &mut ChainRecorder,
) {
	let transactions = recorder.transactions.clone();
	let chunk_size = chunk_size.unwrap_or(transactions.len()).max(1);

	for (chunk_index, chunk) in transactions.chunks(chunk_size).enumerate() {
		let offset = chunk_index * chunk_size;
		let transactions_name = pluralize(chunk.len(), "transaction");

		debug!("Signing a batch of {} for {}", transactions_name, eid_name);
		let result = match signer.sign_and_send_batch(chunk).await {
			Ok(response) => {
				debug!(
					"Signed a batch of {} for {}, got hash {}",
					transactions_name, eid_name, response.transaction_hash
				);
				response.wait().await
			}
			Err(error) => Err(error),
		};

		match result {
			Ok(receipt) => {
				debug!("Finished a batch of {} for {}", transactions_name, eid_name);
				for index in offset..offset + chunk.len() {
					recorder.succeed(index, receipt.clone());
				}
			}
			Err(error) => {
				debug!(
					"Failed to process a batch of {} for {}: {}",
					transactions_name, eid_name, error
				);
				for index in offset..offset + chunk.len() {
					recorder.fail(index, error.clone());
				}

				// Later chunks are never submitted
				return;
			}
		}
	}
}
