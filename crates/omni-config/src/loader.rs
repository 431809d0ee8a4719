//! Configuration loading from files and environment.

use crate::types::*;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader with environment variable substitution
#[derive(Debug, Default)]
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	/// Replaces the process environment, used by tests
	env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	/// Reads variables from `vars` instead of the process environment.
	pub fn with_env(mut self, vars: HashMap<String, String>) -> Self {
		self.env = Some(vars);
		self
	}

	/// Loads the configuration file (if any), then applies environment
	/// overrides and validates the result.
	pub fn load(&self) -> Result<DevtoolsConfig, ConfigError> {
		let mut config = match &self.file_path {
			Some(path) => self.load_from_file(path)?,
			None => DevtoolsConfig::default(),
		};

		self.apply_env_overrides(&mut config.submission)?;
		validate_config(&config)?;

		Ok(config)
	}

	/// Submission settings from the environment alone.
	pub fn load_submission(&self) -> Result<SubmissionConfig, ConfigError> {
		let mut submission = SubmissionConfig::default();
		self.apply_env_overrides(&mut submission)?;

		if submission.batch_size == Some(0) {
			return Err(ConfigError::ValidationError(
				"Batch size must be at least 1".to_string(),
			));
		}

		Ok(submission)
	}

	fn load_from_file(&self, path: &Path) -> Result<DevtoolsConfig, ConfigError> {
		info!("Loading configuration from {:?}", path);

		if !path.exists() {
			return Err(ConfigError::FileNotFound(path.display().to_string()));
		}

		let contents = std::fs::read_to_string(path)?;
		let contents = self.substitute_env_vars(&contents)?;

		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => from_toml(&contents),
			Some("json") => from_json(&contents),
			Some("yaml") | Some("yml") => from_yaml(&contents),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {:?}",
				path
			))),
		}
	}

	fn var(&self, key: &str) -> Option<String> {
		match &self.env {
			Some(vars) => vars.get(key).cloned(),
			None => std::env::var(key).ok(),
		}
	}

	/// Replaces `${VAR_NAME}` patterns with environment values.
	fn substitute_env_vars(&self, content: &str) -> Result<String, ConfigError> {
		let re = Regex::new(r"\$\{([^}]+)\}")
			.map_err(|e| ConfigError::ParseError(format!("Invalid substitution pattern: {}", e)))?;

		let mut missing = None;
		let result = re.replace_all(content, |caps: &regex::Captures| {
			let var_name = &caps[1];
			self.var(var_name).unwrap_or_else(|| {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			})
		});

		match missing {
			Some(var_name) => Err(ConfigError::EnvVarNotFound(var_name)),
			None => Ok(result.into_owned()),
		}
	}

	/// A flag variable that is present overrides the configured value:
	/// any non-empty value enables the mode, an empty one disables it.
	fn apply_env_overrides(&self, submission: &mut SubmissionConfig) -> Result<(), ConfigError> {
		if let Some(value) = self.var(BATCHED_WAIT_ENV) {
			debug!("Overriding batched wait from {}", BATCHED_WAIT_ENV);
			submission.batched_wait = !value.is_empty();
		}

		if let Some(value) = self.var(BATCHED_SEND_ENV) {
			debug!("Overriding batched send from {}", BATCHED_SEND_ENV);
			submission.batched_send = !value.is_empty();
		}

		if let Some(value) = self.var(BATCH_SIZE_ENV) {
			if !value.is_empty() {
				let batch_size = value.trim().parse::<usize>().map_err(|e| {
					ConfigError::ValidationError(format!("Invalid {}: {}", BATCH_SIZE_ENV, e))
				})?;
				debug!("Overriding batch size from {}", BATCH_SIZE_ENV);
				submission.batch_size = Some(batch_size);
			}
		}

		Ok(())
	}
}

/// Load from TOML string
pub fn from_toml(contents: &str) -> Result<DevtoolsConfig, ConfigError> {
	toml::from_str(contents).map_err(|e| ConfigError::ParseError(format!("TOML: {}", e)))
}

/// Load from JSON string
pub fn from_json(contents: &str) -> Result<DevtoolsConfig, ConfigError> {
	serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(format!("JSON: {}", e)))
}

/// Load from YAML string
pub fn from_yaml(contents: &str) -> Result<DevtoolsConfig, ConfigError> {
	serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError(format!("YAML: {}", e)))
}

fn validate_config(config: &DevtoolsConfig) -> Result<(), ConfigError> {
	if config.submission.batch_size == Some(0) {
		return Err(ConfigError::ValidationError(
			"Batch size must be at least 1".to_string(),
		));
	}

	for (eid, network) in &config.networks {
		if !(network.rpc_url.starts_with("http://") || network.rpc_url.starts_with("https://")) {
			return Err(ConfigError::ValidationError(format!(
				"Network {} has an invalid RPC URL: {}",
				eid, network.rpc_url
			)));
		}

		if network.from.is_empty() {
			return Err(ConfigError::ValidationError(format!(
				"Network {} has no sender account",
				eid
			)));
		}

		if network.confirmations == 0 {
			return Err(ConfigError::ValidationError(format!(
				"Network {} must wait for at least one confirmation",
				eid
			)));
		}

		if network.poll_interval_ms == 0 {
			return Err(ConfigError::ValidationError(format!(
				"Network {} poll interval must be positive",
				eid
			)));
		}
	}

	Ok(())
}
