//! Endpoint ids and points: the addressing scheme shared by every chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Endpoint identifier distinguishing one network from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub u32);

impl EndpointId {
	pub const ETHEREUM_V2_MAINNET: Self = Self(30101);
	pub const BSC_V2_MAINNET: Self = Self(30102);
	pub const AVALANCHE_V2_MAINNET: Self = Self(30106);
	pub const POLYGON_V2_MAINNET: Self = Self(30109);
	pub const ARBITRUM_V2_MAINNET: Self = Self(30110);
	pub const OPTIMISM_V2_MAINNET: Self = Self(30111);
	pub const SOLANA_V2_MAINNET: Self = Self(30168);
	pub const BASE_V2_MAINNET: Self = Self(30184);
	pub const APTOS_V2_MAINNET: Self = Self(30108);
	pub const TRON_V2_MAINNET: Self = Self(30420);
	pub const ETHEREUM_V2_TESTNET: Self = Self(40161);
	pub const SOLANA_V2_TESTNET: Self = Self(40168);
	pub const ARBSEP_V2_TESTNET: Self = Self(40231);
	pub const OPTSEP_V2_TESTNET: Self = Self(40232);
	pub const BASESEP_V2_TESTNET: Self = Self(40245);

	/// The constant name of a well-known endpoint id.
	pub fn name(&self) -> Option<&'static str> {
		let name = match *self {
			Self::ETHEREUM_V2_MAINNET => "ETHEREUM_V2_MAINNET",
			Self::BSC_V2_MAINNET => "BSC_V2_MAINNET",
			Self::AVALANCHE_V2_MAINNET => "AVALANCHE_V2_MAINNET",
			Self::POLYGON_V2_MAINNET => "POLYGON_V2_MAINNET",
			Self::ARBITRUM_V2_MAINNET => "ARBITRUM_V2_MAINNET",
			Self::OPTIMISM_V2_MAINNET => "OPTIMISM_V2_MAINNET",
			Self::SOLANA_V2_MAINNET => "SOLANA_V2_MAINNET",
			Self::BASE_V2_MAINNET => "BASE_V2_MAINNET",
			Self::APTOS_V2_MAINNET => "APTOS_V2_MAINNET",
			Self::TRON_V2_MAINNET => "TRON_V2_MAINNET",
			Self::ETHEREUM_V2_TESTNET => "ETHEREUM_V2_TESTNET",
			Self::SOLANA_V2_TESTNET => "SOLANA_V2_TESTNET",
			Self::ARBSEP_V2_TESTNET => "ARBSEP_V2_TESTNET",
			Self::OPTSEP_V2_TESTNET => "OPTSEP_V2_TESTNET",
			Self::BASESEP_V2_TESTNET => "BASESEP_V2_TESTNET",
			_ => return None,
		};

		Some(name)
	}
}

impl fmt::Display for EndpointId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for EndpointId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(EndpointId(s.parse()?))
	}
}

impl From<u32> for EndpointId {
	fn from(eid: u32) -> Self {
		EndpointId(eid)
	}
}

/// A contract on a specific network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OmniPoint {
	pub eid: EndpointId,
	pub address: String,
}

impl OmniPoint {
	pub fn new(eid: EndpointId, address: impl Into<String>) -> Self {
		Self {
			eid,
			address: address.into(),
		}
	}
}
