//! Fetch collaborator interface and the summary shapes it hands to the engine.

use futures::try_join;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::FetchError;
use super::types::NodeStatus;

/// One mesh node (eero) as reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeSummary {
	pub id: Option<String>,
	pub url: Option<String>,
	pub serial: Option<String>,
	#[serde(alias = "isGateway")]
	pub is_gateway: bool,
	#[serde(deserialize_with = "flatten_status")]
	pub status: Option<String>,
	#[serde(alias = "meshQualityBars")]
	pub mesh_quality_bars: Option<u8>,
	#[serde(alias = "clientCount", alias = "connected_clients_count")]
	pub client_count: u32,
	pub location: Option<String>,
	pub model: Option<String>,
	pub wired: bool,
	#[serde(alias = "ipAddress")]
	pub ip_address: Option<String>,
	#[serde(alias = "firmwareVersion")]
	pub firmware_version: Option<String>,
}

impl NodeSummary {
	/// Upstream identifier: explicit id, then the resource url tail, then serial.
	pub fn upstream_id(&self) -> Option<String> {
		self.id
			.clone()
			.or_else(|| extract_id_from_url(self.url.as_deref()))
			.or_else(|| self.serial.clone())
	}

	pub fn node_status(&self) -> NodeStatus {
		normalize_status(self.status.as_deref())
	}

	pub fn display_name(&self) -> Option<&str> {
		self.location.as_deref().or(self.model.as_deref())
	}
}

/// One client device as reported by the backend.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceSummary {
	pub id: Option<String>,
	pub url: Option<String>,
	pub mac: Option<String>,
	pub ip: Option<String>,
	pub connected: bool,
	pub wireless: bool,
	#[serde(alias = "signalStrength")]
	pub signal_strength: Option<i32>,
	/// Free-text location or model of the node the device is attached to.
	#[serde(alias = "connectedTo", alias = "connected_to_eero")]
	pub connected_to: Option<String>,
	/// Id of the attached node, when the backend could extract it.
	#[serde(alias = "connectedToId", alias = "connected_to_eero_id")]
	pub connected_to_id: Option<String>,
	pub blocked: bool,
	pub paused: bool,
	#[serde(alias = "profileName")]
	pub profile_name: Option<String>,
	pub manufacturer: Option<String>,
	#[serde(alias = "displayName")]
	pub display_name: Option<String>,
	pub nickname: Option<String>,
	pub hostname: Option<String>,
}

impl DeviceSummary {
	pub fn upstream_id(&self) -> Option<String> {
		self.id
			.clone()
			.or_else(|| extract_id_from_url(self.url.as_deref()))
			.or_else(|| self.mac.clone())
	}

	pub fn display_name(&self) -> Option<&str> {
		self.display_name
			.as_deref()
			.or(self.nickname.as_deref())
			.or(self.hostname.as_deref())
			.or(self.mac.as_deref())
	}
}

/// Supplies the raw entity lists. Timeouts are the implementor's concern.
#[allow(async_fn_in_trait)]
pub trait TopologySource {
	async fn fetch_nodes(&self) -> Result<Vec<NodeSummary>, FetchError>;
	async fn fetch_devices(&self) -> Result<Vec<DeviceSummary>, FetchError>;
}

/// Both lists from one fetch round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
	pub nodes: Vec<NodeSummary>,
	pub devices: Vec<DeviceSummary>,
}

/// Fetch nodes and devices concurrently; either failure fails the round.
pub async fn fetch_snapshot<S: TopologySource>(source: &S) -> Result<Snapshot, FetchError> {
	let (nodes, devices) = try_join!(source.fetch_nodes(), source.fetch_devices())?;
	Ok(Snapshot { nodes, devices })
}

/// In-memory source, used by the demo page and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticSource {
	pub nodes: Vec<NodeSummary>,
	pub devices: Vec<DeviceSummary>,
}

impl StaticSource {
	pub fn new(nodes: Vec<NodeSummary>, devices: Vec<DeviceSummary>) -> Self {
		Self { nodes, devices }
	}

	/// Build from backend JSON payloads (bare lists or `{meta, data}` envelopes).
	pub fn from_json(nodes: &str, devices: &str) -> Result<Self, FetchError> {
		Ok(Self {
			nodes: decode_list(nodes, "eeros")?,
			devices: decode_list(devices, "devices")?,
		})
	}
}

impl TopologySource for StaticSource {
	async fn fetch_nodes(&self) -> Result<Vec<NodeSummary>, FetchError> {
		Ok(self.nodes.clone())
	}

	async fn fetch_devices(&self) -> Result<Vec<DeviceSummary>, FetchError> {
		Ok(self.devices.clone())
	}
}

/// Decode a list payload. Accepts a bare array, `{meta, data: [...]}`, or a
/// `data` object holding the list under `list_key`. Anything else is empty.
pub fn decode_list<T: DeserializeOwned>(raw: &str, list_key: &str) -> Result<Vec<T>, FetchError> {
	let value: Value = serde_json::from_str(raw)?;
	let list = match value {
		Value::Array(_) => value,
		Value::Object(mut map) => match map.remove("data") {
			Some(data @ Value::Array(_)) => data,
			Some(Value::Object(mut data)) => match data.remove(list_key) {
				Some(list @ Value::Array(_)) => list,
				Some(Value::Object(mut nested)) => nested.remove("data").unwrap_or(Value::Null),
				_ => Value::Null,
			},
			_ => map.remove(list_key).unwrap_or(Value::Null),
		},
		_ => Value::Null,
	};
	match list {
		Value::Array(_) => Ok(serde_json::from_value(list)?),
		_ => Ok(Vec::new()),
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
	Plain(String),
	Nested { status: Option<String> },
}

/// Status arrives either as `"green"` or as `{"status": "green"}`.
fn flatten_status<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
	Ok(match Option::<RawStatus>::deserialize(de)? {
		Some(RawStatus::Plain(status)) => Some(status),
		Some(RawStatus::Nested { status }) => status,
		None => None,
	})
}

/// Trailing path segment of a resource url, e.g. `/2.2/eeros/123` -> `123`.
pub fn extract_id_from_url(url: Option<&str>) -> Option<String> {
	let url = url?;
	url.trim_end_matches('/')
		.rsplit('/')
		.next()
		.filter(|s| !s.is_empty())
		.map(str::to_string)
}

/// Upstream reports `green`/`red` or `connected`/`disconnected`; only the
/// offline family maps to offline.
pub fn normalize_status(status: Option<&str>) -> NodeStatus {
	match status.map(str::to_ascii_lowercase).as_deref() {
		Some("red" | "disconnected" | "offline") => NodeStatus::Offline,
		_ => NodeStatus::Online,
	}
}
