//! Turns raw node/device summaries into a positioned graph.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::{debug, warn};

use super::grouping::{
	DeviceGroups, GroupingResolver, LocationResolver, MeshAnchor, UNKNOWN_GROUP, single_group,
};
use super::layout::{LayoutInput, strategy_for};
use super::quality::classify;
use super::source::{DeviceSummary, NodeSummary};
use super::types::{
	ConnectionType, DeviceAttributes, GraphEdge, GraphNode, LayoutOptions, MeshAttributes,
	NodeDetails, NodeKind, NodeStatus, Position, TopologyGraph,
};

/// A gateway's link to itself is always perfect.
const GATEWAY_QUALITY_BARS: u8 = 5;

pub struct GraphBuilder<'o, R = LocationResolver> {
	options: &'o LayoutOptions,
	seed: u64,
	resolver: R,
}

impl<'o> GraphBuilder<'o> {
	pub fn new(options: &'o LayoutOptions) -> Self {
		Self {
			options,
			seed: 0,
			resolver: LocationResolver,
		}
	}
}

impl<'o, R: GroupingResolver> GraphBuilder<'o, R> {
	/// Seed for the force layout.
	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = seed;
		self
	}

	pub fn with_resolver<T: GroupingResolver>(self, resolver: T) -> GraphBuilder<'o, T> {
		GraphBuilder {
			options: self.options,
			seed: self.seed,
			resolver,
		}
	}

	pub fn build(&self, nodes: &[NodeSummary], devices: &[DeviceSummary]) -> TopologyGraph {
		if nodes.is_empty() {
			debug!("no mesh nodes reported, graph is empty");
			return TopologyGraph::new();
		}

		let mut taken = HashSet::new();
		let node_ids: Vec<String> = nodes
			.iter()
			.enumerate()
			.map(|(i, n)| unique_id(n.upstream_id(), format!("node-{i}"), &mut taken))
			.collect();

		let gateway_idx = nodes.iter().position(|n| n.is_gateway);
		let demoted = nodes.iter().filter(|n| n.is_gateway).count().saturating_sub(1);
		if demoted > 0 {
			warn!("{demoted} extra node(s) report as gateway, treating them as relays");
		}
		let relay_idx: Vec<usize> = (0..nodes.len()).filter(|i| Some(*i) != gateway_idx).collect();

		let device_ids: Vec<String> = devices
			.iter()
			.enumerate()
			.map(|(i, d)| unique_id(d.upstream_id(), format!("device-{i}"), &mut taken))
			.collect();

		// gateway first, then relays in input order
		let anchors: Vec<MeshAnchor> = gateway_idx
			.into_iter()
			.chain(relay_idx.iter().copied())
			.map(|i| MeshAnchor {
				id: node_ids[i].clone(),
				location: nodes[i].location.clone(),
				model: nodes[i].model.clone(),
			})
			.collect();
		// devices nobody claims hang off the gateway, or the first relay without one
		let fallback = anchors[0].id.as_str();

		let groups: DeviceGroups = if self.options.group_by_eero {
			self.resolver.resolve(devices, &anchors)
		} else {
			single_group(fallback, devices.len())
		};
		debug_assert_eq!(groups.total(), devices.len(), "grouping must place every device");
		for (group, members) in groups.iter().filter(|(_, m)| !m.is_empty()) {
			debug!("group {group}: {} device(s)", members.len());
		}
		let mut owned: IndexMap<&str, Vec<usize>> = anchors
			.iter()
			.map(|a| (a.id.as_str(), groups.get(&a.id).to_vec()))
			.collect();
		if let Some(members) = owned.get_mut(fallback) {
			members.extend_from_slice(groups.get(UNKNOWN_GROUP));
		}

		let input = LayoutInput {
			gateway: gateway_idx.map(|i| node_ids[i].as_str()),
			relays: relay_idx.iter().map(|&i| node_ids[i].as_str()).collect(),
			devices: owned
				.iter()
				.map(|(owner, members)| {
					(*owner, members.iter().map(|&d| device_ids[d].as_str()).collect())
				})
				.collect(),
		};
		let positions = strategy_for(self.options.layout_type, self.seed).layout(&input);
		let position_of = |id: &str| positions.get(id).copied().unwrap_or_default();

		let mut graph = TopologyGraph::new();
		if let Some(gw) = gateway_idx {
			graph.nodes.push(mesh_node(
				&nodes[gw],
				&node_ids[gw],
				NodeKind::Gateway,
				Some(GATEWAY_QUALITY_BARS),
				position_of(&node_ids[gw]),
			));
		}
		for &i in &relay_idx {
			let node = &nodes[i];
			graph.nodes.push(mesh_node(
				node,
				&node_ids[i],
				NodeKind::Relay,
				node.mesh_quality_bars,
				position_of(&node_ids[i]),
			));
			if let Some(gw) = gateway_idx {
				let quality = classify(node.mesh_quality_bars);
				graph
					.edges
					.push(GraphEdge::mesh(&node_ids[gw], &node_ids[i], quality));
			}
		}

		for (owner, members) in &owned {
			for &d in members {
				let device = &devices[d];
				let id = &device_ids[d];
				let connection = ConnectionType::from_wireless(device.wireless);
				graph
					.nodes
					.push(device_node(device, id, owner, connection, position_of(id)));
				graph.edges.push(GraphEdge::client(owner, id, connection));
			}
		}
		graph
	}
}

/// Build with the default resolver.
pub fn build_graph(
	nodes: &[NodeSummary],
	devices: &[DeviceSummary],
	options: &LayoutOptions,
	seed: u64,
) -> TopologyGraph {
	GraphBuilder::new(options).with_seed(seed).build(nodes, devices)
}

/// Upstream id when free, else `synthetic`, suffixed until nothing else holds it.
fn unique_id(preferred: Option<String>, synthetic: String, taken: &mut HashSet<String>) -> String {
	let mut id = match preferred {
		Some(id) if !id.is_empty() && !taken.contains(&id) => id,
		_ => synthetic.clone(),
	};
	let mut suffix = 0;
	while taken.contains(&id) {
		suffix += 1;
		id = format!("{synthetic}-{suffix}");
	}
	taken.insert(id.clone());
	id
}

fn mesh_node(
	node: &NodeSummary,
	id: &str,
	kind: NodeKind,
	bars: Option<u8>,
	position: Position,
) -> GraphNode {
	GraphNode {
		id: id.to_string(),
		kind,
		label: node.display_name().unwrap_or(id).to_string(),
		status: node.node_status(),
		position,
		parent: None,
		details: NodeDetails::Mesh(MeshAttributes {
			mesh_quality_bars: bars,
			client_count: node.client_count,
			model: node.model.clone(),
			wired: node.wired,
			ip_address: node.ip_address.clone(),
			firmware_version: node.firmware_version.clone(),
		}),
	}
}

fn device_node(
	device: &DeviceSummary,
	id: &str,
	owner: &str,
	connection_type: ConnectionType,
	position: Position,
) -> GraphNode {
	GraphNode {
		id: id.to_string(),
		kind: NodeKind::Device,
		label: device.display_name().unwrap_or(id).to_string(),
		status: if device.connected {
			NodeStatus::Online
		} else {
			NodeStatus::Offline
		},
		position,
		parent: Some(owner.to_string()),
		details: NodeDetails::Device(DeviceAttributes {
			signal_strength: device.signal_strength,
			connection_type,
			ip: device.ip.clone(),
			mac: device.mac.clone(),
			manufacturer: device.manufacturer.clone(),
			blocked: device.blocked,
			paused: device.paused,
			profile_name: device.profile_name.clone(),
		}),
	}
}
