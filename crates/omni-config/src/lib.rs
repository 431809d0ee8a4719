//! Configuration for the omni devtools.
//!
//! Configuration comes from an optional TOML, JSON or YAML file with
//! `${VAR}` placeholders, overridden by the `LZ_*` environment variables
//! that select the submission modes.

use thiserror::Error;

pub mod loader;
pub mod serde_helpers;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

impl SubmissionConfig {
	/// Submission modes selected by the `LZ_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		ConfigLoader::new().load_submission()
	}
}
