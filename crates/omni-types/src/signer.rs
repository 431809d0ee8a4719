//! Signer capabilities consumed by the submission pipeline.

use crate::{
	errors::Result,
	format::{format_eid, format_point},
	EndpointId, OmniPoint, OmniTransaction, SharedTransaction, SignerError, TransactionResponse,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// A signer bound to one chain.
#[async_trait]
pub trait OmniSigner: Send + Sync {
	/// The account this signer signs with.
	fn point(&self) -> OmniPoint;

	/// Signs a transaction without submitting it, returning the encoded payload.
	async fn sign(&self, transaction: &OmniTransaction) -> Result<String>;

	/// Signs and submits a transaction. The returned response can be
	/// waited for to obtain the receipt.
	async fn sign_and_send(&self, transaction: &OmniTransaction) -> Result<TransactionResponse>;

	/// Batch submission capability, if this signer has one.
	fn as_batch(&self) -> Option<&dyn OmniBatchSigner> {
		None
	}
}

/// Signers that can submit several transactions as one.
#[async_trait]
pub trait OmniBatchSigner: Send + Sync {
	/// Signs and submits all `transactions` together. The single response
	/// confirms (or fails) for the whole batch.
	async fn sign_and_send_batch(
		&self,
		transactions: &[SharedTransaction],
	) -> Result<TransactionResponse>;
}

/// Creates signers for chains, supplied by whoever runs the pipeline.
#[async_trait]
pub trait SignerFactory: Send + Sync {
	async fn create_signer(&self, eid: EndpointId) -> Result<Arc<dyn OmniSigner>>;
}

#[async_trait]
impl<F, Fut> SignerFactory for F
where
	F: Fn(EndpointId) -> Fut + Send + Sync,
	Fut: Future<Output = Result<Arc<dyn OmniSigner>>> + Send,
{
	async fn create_signer(&self, eid: EndpointId) -> Result<Arc<dyn OmniSigner>> {
		(self)(eid).await
	}
}

/// Makes sure a signer for `eid` is not used for a transaction on another chain.
pub fn assert_transaction_eid(eid: EndpointId, transaction: &OmniTransaction) -> Result<()> {
	if transaction.point.eid == eid {
		return Ok(());
	}

	Err(SignerError::WrongChain {
		signer: format_eid(eid),
		point: format_point(&transaction.point),
	})
}
