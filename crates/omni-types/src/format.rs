//! Human-readable formatting for logs, prompts and previews.

use crate::{EndpointId, OmniPoint, OmniTransaction};
use serde::Serialize;

/// Label used whenever an endpoint id is shown to a user,
/// e.g. `ETHEREUM_V2_MAINNET (30101)`.
pub fn format_eid(eid: EndpointId) -> String {
	match eid.name() {
		Some(name) => format!("{} ({})", name, eid),
		None => format!("Unknown ({})", eid),
	}
}

/// Formats a point as `[<eid label>] <address>`.
pub fn format_point(point: &OmniPoint) -> String {
	format!("[{}] {}", format_eid(point.eid), point.address)
}

/// Flat record describing a transaction, used for previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
	#[serde(rename = "Network")]
	pub network: String,
	#[serde(rename = "OmniAddress")]
	pub address: String,
	#[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(rename = "Data")]
	pub data: String,
}

pub fn format_transaction(transaction: &OmniTransaction) -> TransactionRecord {
	TransactionRecord {
		network: format_eid(transaction.point.eid),
		address: transaction.point.address.clone(),
		description: transaction.description.clone(),
		data: format!("0x{}", hex::encode(&transaction.data)),
	}
}

/// English ordinal of a positive number: 1st, 2nd, 3rd, 4th, 11th, 22nd...
pub fn ordinal(n: usize) -> String {
	let suffix = match (n % 10, n % 100) {
		(_, 11..=13) => "th",
		(1, _) => "st",
		(2, _) => "nd",
		(3, _) => "rd",
		_ => "th",
	};

	format!("{}{}", n, suffix)
}

/// `1 transaction`, `2 transactions`.
pub fn pluralize(n: usize, noun: &str) -> String {
	if n == 1 {
		format!("{} {}", n, noun)
	} else {
		format!("{} {}s", n, noun)
	}
}
