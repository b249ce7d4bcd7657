//! Graph data model shared by the builder, session, filter and canvas.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A 2-D coordinate. For device nodes this is an offset from the owning node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
	pub x: f64,
	pub y: f64,
}

impl Position {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn offset_by(self, other: Position) -> Position {
		Position::new(self.x + other.x, self.y + other.y)
	}

	pub fn relative_to(self, origin: Position) -> Position {
		Position::new(self.x - origin.x, self.y - origin.y)
	}

	pub fn distance_to(self, other: Position) -> f64 {
		let (dx, dy) = (self.x - other.x, self.y - other.y);
		(dx * dx + dy * dy).sqrt()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	Gateway,
	Relay,
	Device,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
	Online,
	Offline,
}

/// Mesh link quality tier. Variants are declared worst first so `Ord` ranks them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkQuality {
	Poor,
	Fair,
	Good,
	Excellent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
	Wired,
	Wireless,
}

impl ConnectionType {
	pub fn from_wireless(wireless: bool) -> Self {
		if wireless { Self::Wireless } else { Self::Wired }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
	Mesh,
	Client,
}

/// Attributes carried by gateway and relay nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshAttributes {
	pub mesh_quality_bars: Option<u8>,
	pub client_count: u32,
	pub model: Option<String>,
	pub wired: bool,
	pub ip_address: Option<String>,
	pub firmware_version: Option<String>,
}

/// Attributes carried by client device nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAttributes {
	pub signal_strength: Option<i32>,
	pub connection_type: ConnectionType,
	pub ip: Option<String>,
	pub mac: Option<String>,
	pub manufacturer: Option<String>,
	pub blocked: bool,
	pub paused: bool,
	pub profile_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeDetails {
	Mesh(MeshAttributes),
	Device(DeviceAttributes),
}

/// How much information the canvas prints next to each node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
	Minimal,
	#[default]
	Standard,
	Detailed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
	pub id: String,
	pub kind: NodeKind,
	pub label: String,
	pub status: NodeStatus,
	pub position: Position,
	/// Owning gateway/relay id, set for device nodes only.
	pub parent: Option<String>,
	pub details: NodeDetails,
}

impl GraphNode {
	pub fn is_device(&self) -> bool {
		self.kind == NodeKind::Device
	}

	pub fn is_online(&self) -> bool {
		self.status == NodeStatus::Online
	}

	pub fn mesh(&self) -> Option<&MeshAttributes> {
		match &self.details {
			NodeDetails::Mesh(m) => Some(m),
			NodeDetails::Device(_) => None,
		}
	}

	pub fn device(&self) -> Option<&DeviceAttributes> {
		match &self.details {
			NodeDetails::Device(d) => Some(d),
			NodeDetails::Mesh(_) => None,
		}
	}

	/// Caption lines drawn next to the node for the given detail level.
	pub fn caption(&self, detail: DetailLevel) -> Vec<String> {
		let mut lines = vec![self.label.clone()];
		if detail == DetailLevel::Minimal {
			return lines;
		}
		match &self.details {
			NodeDetails::Mesh(m) => {
				let link = if m.wired { "wired" } else { "wireless" };
				match &m.model {
					Some(model) => lines.push(format!("{model} · {link}")),
					None => lines.push(link.to_string()),
				}
				if detail == DetailLevel::Detailed {
					if let Some(ip) = &m.ip_address {
						lines.push(ip.clone());
					}
					if let Some(fw) = &m.firmware_version {
						lines.push(format!("fw {fw}"));
					}
					lines.push(format!("{} clients", m.client_count));
				}
			}
			NodeDetails::Device(d) => {
				lines.push(match d.connection_type {
					ConnectionType::Wired => "wired".to_string(),
					ConnectionType::Wireless => "wireless".to_string(),
				});
				if detail == DetailLevel::Detailed {
					if let Some(ip) = &d.ip {
						lines.push(ip.clone());
					}
					if let Some(maker) = &d.manufacturer {
						lines.push(maker.clone());
					}
					if let Some(dbm) = d.signal_strength {
						lines.push(format!("{dbm} dBm"));
					}
				}
			}
		}
		lines
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
	pub id: String,
	pub source: String,
	pub target: String,
	pub kind: EdgeKind,
	/// Set on mesh edges only.
	pub quality: Option<LinkQuality>,
	/// Set on client edges only.
	pub connection_type: Option<ConnectionType>,
	/// Rendering hint: the link deserves attention (poor mesh quality).
	pub animated: bool,
}

impl GraphEdge {
	pub fn mesh(source: &str, target: &str, quality: LinkQuality) -> Self {
		Self {
			id: format!("mesh-{source}-{target}"),
			source: source.to_string(),
			target: target.to_string(),
			kind: EdgeKind::Mesh,
			quality: Some(quality),
			connection_type: None,
			animated: quality == LinkQuality::Poor,
		}
	}

	pub fn client(source: &str, target: &str, connection_type: ConnectionType) -> Self {
		Self {
			id: format!("client-{source}-{target}"),
			source: source.to_string(),
			target: target.to_string(),
			kind: EdgeKind::Client,
			quality: None,
			connection_type: Some(connection_type),
			animated: false,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutType {
	#[default]
	Hierarchy,
	Radial,
	Horizontal,
	Force,
}

impl LayoutType {
	pub const ALL: [LayoutType; 4] = [
		LayoutType::Hierarchy,
		LayoutType::Radial,
		LayoutType::Horizontal,
		LayoutType::Force,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			LayoutType::Hierarchy => "hierarchy",
			LayoutType::Radial => "radial",
			LayoutType::Horizontal => "horizontal",
			LayoutType::Force => "force",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|l| l.as_str() == raw)
	}
}

impl DetailLevel {
	pub const ALL: [DetailLevel; 3] = [DetailLevel::Minimal, DetailLevel::Standard, DetailLevel::Detailed];

	pub fn as_str(self) -> &'static str {
		match self {
			DetailLevel::Minimal => "minimal",
			DetailLevel::Standard => "standard",
			DetailLevel::Detailed => "detailed",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|d| d.as_str() == raw)
	}
}

/// Display options. `layout_type` and `group_by_eero` shape the built graph,
/// the rest only affect the filtered view and captions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutOptions {
	pub layout_type: LayoutType,
	pub detail_level: DetailLevel,
	pub show_devices: bool,
	pub show_offline_devices: bool,
	pub group_by_eero: bool,
}

impl Default for LayoutOptions {
	fn default() -> Self {
		Self {
			layout_type: LayoutType::default(),
			detail_level: DetailLevel::default(),
			show_devices: true,
			show_offline_devices: true,
			group_by_eero: true,
		}
	}
}

impl LayoutOptions {
	/// Whether switching from `self` to `other` requires rebuilding the graph.
	pub fn needs_rebuild(&self, other: &LayoutOptions) -> bool {
		self.layout_type != other.layout_type || self.group_by_eero != other.group_by_eero
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyGraph {
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
}

impl TopologyGraph {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	pub fn gateway(&self) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.kind == NodeKind::Gateway)
	}

	/// Canvas position of a node; devices resolve through their owner.
	pub fn absolute_position(&self, id: &str) -> Option<Position> {
		let node = self.node(id)?;
		match &node.parent {
			Some(parent) => Some(self.node(parent)?.position.offset_by(node.position)),
			None => Some(node.position),
		}
	}

	/// True when every edge endpoint names a node of this graph.
	pub fn is_edge_consistent(&self) -> bool {
		let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		self.edges
			.iter()
			.all(|e| ids.contains(e.source.as_str()) && ids.contains(e.target.as_str()))
	}

	pub fn stats(&self) -> GraphStats {
		let mut stats = GraphStats::default();
		for node in &self.nodes {
			match node.kind {
				NodeKind::Gateway => stats.gateways += 1,
				NodeKind::Relay => stats.relays += 1,
				NodeKind::Device => {
					stats.devices += 1;
					if !node.is_online() {
						stats.offline_devices += 1;
					}
				}
			}
		}
		stats.poor_links = self
			.edges
			.iter()
			.filter(|e| e.quality == Some(LinkQuality::Poor))
			.count();
		stats
	}
}

/// Counts shown in the canvas overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
	pub gateways: usize,
	pub relays: usize,
	pub devices: usize,
	pub offline_devices: usize,
	pub poor_links: usize,
}
