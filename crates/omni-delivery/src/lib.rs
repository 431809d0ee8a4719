// omni-delivery/src/lib.rs

//! Signing and submission of omnichain transactions.
//!
//! [`SignAndSend`] groups transactions by chain, resolves one signer per
//! chain and submits every chain concurrently. Within a chain submission
//! is strictly ordered (see [`submitter`]).

use futures::future::join_all;
use omni_config::SubmissionConfig;
use omni_types::{
	format::pluralize, OmniTransactionWithReceipt, SharedTransaction, SignAndSendResult,
	SignerFactory,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub mod group;
pub mod implementations;
pub mod resolver;
pub mod submitter;

pub use group::{group_transactions_by_eid, TransactionGroups};
pub use resolver::SignerResolver;
pub use submitter::{ChainSubmitter, SubmissionMode};

/// Sign & send entry point bound to a signer factory and submission modes.
#[derive(Clone)]
pub struct SignAndSend {
	factory: Arc<dyn SignerFactory>,
	config: SubmissionConfig,
}

/// Builds a [`SignAndSend`], warning about any experimental mode in `config`.
pub fn create_sign_and_send(
	factory: Arc<dyn SignerFactory>,
	config: SubmissionConfig,
) -> SignAndSend {
	SignAndSend::new(factory, config)
}

impl SignAndSend {
	pub fn new(factory: Arc<dyn SignerFactory>, config: SubmissionConfig) -> Self {
		if config.batched_wait {
			warn!("You are using experimental batched transaction waiting");
		}

		if config.batched_send {
			warn!("You are using experimental batched transaction sending");
		}

		Self { factory, config }
	}

	pub fn config(&self) -> &SubmissionConfig {
		&self.config
	}

	pub async fn sign_and_send(&self, transactions: &[SharedTransaction]) -> SignAndSendResult {
		self.sign_and_send_with_progress(transactions, |_, _| {}).await
	}

	/// Signs and submits `transactions`.
	///
	/// `on_progress` is called once per confirmed transaction, in completion
	/// order, with the new success and every success so far. The returned
	/// result lists each chain's outcome in the order the chains first
	/// appear in `transactions`.
	pub async fn sign_and_send_with_progress<F>(
		&self,
		transactions: &[SharedTransaction],
		mut on_progress: F,
	) -> SignAndSendResult
	where
		F: FnMut(&OmniTransactionWithReceipt, &[OmniTransactionWithReceipt]),
	{
		if transactions.is_empty() {
			return SignAndSendResult::default();
		}

		let groups = group_transactions_by_eid(transactions);
		info!(
			"Signing {} for {}",
			pluralize(transactions.len(), "transaction"),
			pluralize(groups.len(), "network")
		);

		let resolver = SignerResolver::new(self.factory.as_ref());
		let (progress, mut progress_rx) = mpsc::unbounded_channel();

		let mut chains = Vec::with_capacity(groups.len());
		for (eid, group) in groups {
			let resolver = &resolver;
			let submitter = ChainSubmitter::new(eid, &self.config).with_progress(progress.clone());

			chains.push(async move {
				let signer = resolver.resolve(eid).await;
				submitter.submit(group, signer).await
			});
		}

		// The channel closes once every submitter is done with its sender
		drop(progress);
		let chains = join_all(chains);

		let report = async {
			let mut successes: Vec<OmniTransactionWithReceipt> = Vec::new();
			while let Some(success) = progress_rx.recv().await {
				successes.push(success);
				if let Some(latest) = successes.last() {
					on_progress(latest, &successes);
				}
			}
		};

		let (outcomes, ()) = futures::join!(chains, report);

		let mut result = SignAndSendResult::default();
		for outcome in outcomes {
			result.extend(outcome);
		}

		debug!(
			"Signed {}: {} succeeded, {} failed, {} pending",
			pluralize(transactions.len(), "transaction"),
			result.succeeded.len(),
			result.failed.len(),
			result.pending.len()
		);

		result
	}
}
