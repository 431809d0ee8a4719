//! Error types shared by signers and the submission pipeline.

use thiserror::Error;

/// Errors produced while creating signers, submitting transactions
/// or waiting for their confirmation.
///
/// The pipeline copies the same error into several result entries
/// (a failed batch marks every transaction with it), so the type is
/// cheap to clone and carries its details as strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
	/// The signer factory could not produce a signer for a chain.
	#[error("Failed to create a signer for {eid}: {source}")]
	SignerCreation {
		/// Human-readable chain label.
		eid: String,
		/// The error returned by the factory.
		source: Box<SignerError>,
	},

	#[error("Submission failed: {0}")]
	Submission(String),

	#[error("Confirmation failed: {0}")]
	Confirmation(String),

	/// A signer was handed a transaction addressed to another chain.
	#[error("Could not use signer for {signer} to sign a transaction for {point}")]
	WrongChain { signer: String, point: String },

	#[error("RPC error: {0}")]
	Rpc(String),

	#[error("Unsupported: {0}")]
	Unsupported(String),

	#[error("{0}")]
	Other(String),
}

impl SignerError {
	/// Wraps a factory error with the label of the chain it was created for.
	pub fn signer_creation(eid: impl Into<String>, source: SignerError) -> Self {
		SignerError::SignerCreation {
			eid: eid.into(),
			source: Box::new(source),
		}
	}
}

pub type Result<T> = std::result::Result<T, SignerError>;
