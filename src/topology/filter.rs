use std::collections::HashSet;

use super::types::{GraphNode, LayoutOptions, TopologyGraph};

fn visible(node: &GraphNode, options: &LayoutOptions) -> bool {
	if !node.is_device() {
		return true;
	}
	options.show_devices && (options.show_offline_devices || node.is_online())
}

/// Project `graph` through the device visibility options. Gateways, relays and
/// mesh edges always pass; any edge touching a hidden node is dropped.
pub fn filter_graph(graph: &TopologyGraph, options: &LayoutOptions) -> TopologyGraph {
	let nodes: Vec<GraphNode> = graph
		.nodes
		.iter()
		.filter(|n| visible(n, options))
		.cloned()
		.collect();
	let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
	let edges = graph
		.edges
		.iter()
		.filter(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()))
		.cloned()
		.collect();
	TopologyGraph { nodes, edges }
}
