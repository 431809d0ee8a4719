//! Interactive sign & send flow.
//!
//! Wraps the submission pipeline with previews, confirmations and a retry
//! loop over the transactions that did not make it through.

use crate::prompt::Prompt;
use omni_delivery::SignAndSend;
use omni_types::{
	format::{format_transaction, pluralize, TransactionRecord},
	OmniTransactionWithError, OmniTransactionWithReceipt, SharedTransaction, SignAndSendResult,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum FlowError {
	#[error("Prompt error: {0}")]
	Prompt(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Serialize)]
struct FailureRecord {
	error: String,
	#[serde(flatten)]
	transaction: TransactionRecord,
}

pub struct SignAndSendFlow {
	sign_and_send: SignAndSend,
	prompt: Arc<dyn Prompt>,
}

impl SignAndSendFlow {
	pub fn new(sign_and_send: SignAndSend, prompt: Arc<dyn Prompt>) -> Self {
		Self {
			sign_and_send,
			prompt,
		}
	}

	/// Asks `question` in interactive mode, answers `ci_answer` otherwise.
	async fn ask(&self, question: &str, default: bool, ci_answer: bool) -> Result<bool, FlowError> {
		if self.prompt.is_interactive() {
			self.prompt.confirm(question, default).await
		} else {
			Ok(ci_answer)
		}
	}

	/// Submits `transactions`, retrying what did not go through for as long
	/// as the user asks to.
	///
	/// Successes accumulate over attempts while failures and pending
	/// transactions are those of the last attempt.
	pub async fn run(
		&self,
		transactions: &[SharedTransaction],
	) -> Result<SignAndSendResult, FlowError> {
		if self
			.ask(
				"Would you like to preview the transactions before continuing?",
				false,
				true,
			)
			.await?
		{
			let records: Vec<_> = transactions
				.iter()
				.map(|transaction| format_transaction(transaction))
				.collect();
			print_records(&records);
		}

		if !self
			.ask("Would you like to submit the required transactions?", false, true)
			.await?
		{
			debug!("User cancelled the operation, exiting");
			return Ok(SignAndSendResult {
				pending: transactions.to_vec(),
				..SignAndSendResult::default()
			});
		}

		let mut to_sign = transactions.to_vec();
		let mut succeeded: Vec<OmniTransactionWithReceipt> = Vec::new();
		let mut errors: Vec<OmniTransactionWithError>;

		loop {
			let total = to_sign.len();
			debug!("Sending {}", pluralize(total, "transaction"));

			let attempt = self
				.sign_and_send
				.sign_and_send_with_progress(&to_sign, |_, so_far| {
					info!("Signing... {}/{}", so_far.len(), total);
				})
				.await;
			let (succeeded_batch, errors_batch, pending_batch) = attempt.into_parts();

			info!("Successfully sent {}", pluralize(succeeded_batch.len(), "transaction"));
			succeeded.extend(succeeded_batch);
			errors = errors_batch;
			to_sign = pending_batch;

			if errors.is_empty() {
				info!("All transactions were sent");
				break;
			}

			error!("Failed to send {}", pluralize(errors.len(), "transaction"));

			if self
				.ask("Would you like to preview the failed transactions?", false, true)
				.await?
			{
				let records: Vec<_> = errors
					.iter()
					.map(|failure| FailureRecord {
						error: failure.error.to_string(),
						transaction: format_transaction(&failure.transaction),
					})
					.collect();
				print_records(&records);
			}

			if !self.ask("Would you like to retry?", true, false).await? {
				error!("Failed to send all transactions");
				break;
			}
		}

		Ok(SignAndSendResult {
			succeeded,
			failed: errors,
			pending: to_sign,
		})
	}
}

fn print_records<T: Serialize>(records: &[T]) {
	match serde_json::to_string_pretty(records) {
		Ok(json) => println!("{}", json),
		Err(e) => error!("Failed to format records: {}", e),
	}
}
