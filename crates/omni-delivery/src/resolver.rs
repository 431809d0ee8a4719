//! Lazy, per-call signer resolution.

use dashmap::DashMap;
use omni_types::{format::format_eid, EndpointId, OmniSigner, SignerError, SignerFactory};
use std::sync::Arc;
use tracing::{debug, error};

/// Resolves signers through a [`SignerFactory`], remembering the ones it
/// created for the lifetime of the resolver (one sign & send call).
///
/// Failures are never retried or cached; they come back wrapped with
/// the label of the chain.
pub struct SignerResolver<'a> {
	factory: &'a dyn SignerFactory,
	signers: DashMap<EndpointId, Arc<dyn OmniSigner>>,
}

impl<'a> SignerResolver<'a> {
	pub fn new(factory: &'a dyn SignerFactory) -> Self {
		Self {
			factory,
			signers: DashMap::new(),
		}
	}

	pub async fn resolve(&self, eid: EndpointId) -> Result<Arc<dyn OmniSigner>, SignerError> {
		let cached = self.signers.get(&eid).map(|signer| signer.value().clone());
		if let Some(signer) = cached {
			return Ok(signer);
		}

		let eid_name = format_eid(eid);
		debug!("Creating signer for {}", eid_name);

		match self.factory.create_signer(eid).await {
			Ok(signer) => {
				self.signers.insert(eid, signer.clone());
				Ok(signer)
			}
			Err(error) => {
				error!("Failed to create a signer for {}: {}", eid_name, error);
				Err(SignerError::signer_creation(eid_name, error))
			}
		}
	}
}
