//! Grouping of transactions by the chain they are addressed to.

use omni_types::{EndpointId, SharedTransaction};
use std::collections::HashMap;

/// Transactions partitioned by endpoint id.
///
/// Chains are kept in the order they first appear in the input and the
/// transactions of each chain keep their relative input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionGroups {
	groups: Vec<(EndpointId, Vec<SharedTransaction>)>,
}

impl TransactionGroups {
	pub fn len(&self) -> usize {
		self.groups.len()
	}

	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}

	pub fn get(&self, eid: EndpointId) -> Option<&[SharedTransaction]> {
		self.groups
			.iter()
			.find(|(group_eid, _)| *group_eid == eid)
			.map(|(_, transactions)| transactions.as_slice())
	}

	pub fn eids(&self) -> impl Iterator<Item = EndpointId> + '_ {
		self.groups.iter().map(|(eid, _)| *eid)
	}

	pub fn iter(&self) -> impl Iterator<Item = (EndpointId, &[SharedTransaction])> {
		self.groups
			.iter()
			.map(|(eid, transactions)| (*eid, transactions.as_slice()))
	}
}

impl IntoIterator for TransactionGroups {
	type Item = (EndpointId, Vec<SharedTransaction>);
	type IntoIter = std::vec::IntoIter<Self::Item>;

	fn into_iter(self) -> Self::IntoIter {
		self.groups.into_iter()
	}
}

pub fn group_transactions_by_eid(transactions: &[SharedTransaction]) -> TransactionGroups {
	let mut positions: HashMap<EndpointId, usize> = HashMap::new();
	let mut groups: Vec<(EndpointId, Vec<SharedTransaction>)> = Vec::new();

	for transaction in transactions {
		let eid = transaction.point.eid;
		let position = *positions.entry(eid).or_insert_with(|| {
			groups.push((eid, Vec::new()));
			groups.len() - 1
		});

		groups[position].1.push(transaction.clone());
	}

	TransactionGroups { groups }
}
