//! Yes/no questions asked during the sign & send flow.

use crate::flow::FlowError;
use async_trait::async_trait;
use std::io::{BufRead, Write};

#[async_trait]
pub trait Prompt: Send + Sync {
	/// Whether answers come from a person. Non-interactive prompts are
	/// never asked; the flow uses its CI answers instead.
	fn is_interactive(&self) -> bool {
		true
	}

	async fn confirm(&self, question: &str, default: bool) -> Result<bool, FlowError>;
}

/// Asks on stdout and reads the answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl Prompt for TerminalPrompt {
	async fn confirm(&self, question: &str, default: bool) -> Result<bool, FlowError> {
		let hint = if default { "Y/n" } else { "y/N" };
		let question = format!("{} ({}) ", question, hint);

		let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
			let mut stdout = std::io::stdout();
			stdout.write_all(question.as_bytes())?;
			stdout.flush()?;

			let mut line = String::new();
			std::io::stdin().lock().read_line(&mut line)?;
			Ok(line)
		})
		.await
		.map_err(|e| FlowError::Prompt(format!("Prompt task failed: {}", e)))??;

		parse_answer(&answer, default)
	}
}

/// Prompt used in CI, never asks anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait]
impl Prompt for AutoConfirm {
	fn is_interactive(&self) -> bool {
		false
	}

	async fn confirm(&self, _question: &str, _default: bool) -> Result<bool, FlowError> {
		Ok(true)
	}
}

fn parse_answer(answer: &str, default: bool) -> Result<bool, FlowError> {
	match answer.trim().to_lowercase().as_str() {
		"" => Ok(default),
		"y" | "yes" => Ok(true),
		"n" | "no" => Ok(false),
		other => Err(FlowError::Prompt(format!("Unrecognized answer: {}", other))),
	}
}
