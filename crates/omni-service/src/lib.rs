//! Command-line front end for the omni devtools.
//!
//! # Components
//!
//! - `flow`: previews, confirmations and the retry loop around sign & send
//! - `prompt`: interactive and CI answers to the flow's questions

pub mod flow;
pub mod prompt;

pub use flow::{FlowError, SignAndSendFlow};
pub use prompt::{AutoConfirm, Prompt, TerminalPrompt};
