//! Shared types for the omni devtools workspace.
//!
//! Everything the submission pipeline and its collaborators agree on:
//! endpoint ids and points, transactions and their receipts, the signer
//! capabilities and the error taxonomy.

pub mod errors;
pub mod format;
pub mod omnigraph;
pub mod signer;
pub mod transactions;

pub use errors::*;
pub use omnigraph::*;
pub use signer::*;
pub use transactions::*;
