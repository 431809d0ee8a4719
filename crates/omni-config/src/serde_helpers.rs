//! Serde helpers for endpoint id keyed maps.
//!
//! TOML and JSON object keys are always strings, so maps keyed by
//! [`EndpointId`] are (de)serialized through their decimal form.

use omni_types::EndpointId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

pub fn deserialize_eid_map<'de, D, T>(deserializer: D) -> Result<HashMap<EndpointId, T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	let map = HashMap::<String, T>::deserialize(deserializer)?;

	map.into_iter()
		.map(|(k, v)| {
			k.parse::<EndpointId>()
				.map(|eid| (eid, v))
				.map_err(|_| serde::de::Error::custom(format!("Invalid endpoint ID: {}", k)))
		})
		.collect()
}

pub fn serialize_eid_map<S, T>(
	map: &HashMap<EndpointId, T>,
	serializer: S,
) -> Result<S::Ok, S::Error>
where
	S: Serializer,
	T: Serialize,
{
	let string_map: HashMap<String, &T> = map.iter().map(|(k, v)| (k.to_string(), v)).collect();

	string_map.serialize(serializer)
}
