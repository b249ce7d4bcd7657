use std::collections::{HashMap, HashSet};

use crate::topology::layout::CENTER;
use crate::topology::{DetailLevel, NodeKind, Position, TopologyGraph};

pub const GATEWAY_RADIUS: f64 = 14.0;
pub const RELAY_RADIUS: f64 = 10.0;
pub const DEVICE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 16.0;
/// Pointer travel (screen px) below which a press counts as a click.
pub const CLICK_SLOP: f64 = 3.0;

pub fn radius_of(kind: NodeKind) -> f64 {
	match kind {
		NodeKind::Gateway => GATEWAY_RADIUS,
		NodeKind::Relay => RELAY_RADIUS,
		NodeKind::Device => DEVICE_RADIUS,
	}
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start: Position,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<String>,
	pub neighbors: HashSet<String>,
	pub highlight_t: f64,
	pub prev_node: Option<String>,
	pub prev_neighbors: HashSet<String>,
	delay_t: f64,
}

/// What a finished pointer gesture means for the session.
#[derive(Clone, Debug, PartialEq)]
pub enum Gesture {
	Select(Option<String>),
	/// Node moved to a position in node coordinates (offset for devices).
	Reposition(String, Position),
}

pub struct CanvasState {
	pub graph: TopologyGraph,
	/// Absolute canvas position per node id.
	pub positions: HashMap<String, Position>,
	pub detail: DetailLevel,
	pub selected: Option<String>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
}

impl CanvasState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			graph: TopologyGraph::new(),
			positions: HashMap::new(),
			detail: DetailLevel::default(),
			selected: None,
			transform: ViewTransform {
				x: width / 2.0 - CENTER.x,
				y: height / 2.0 - CENTER.y,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			flow_time: 0.0,
		}
	}

	/// Swap in a freshly filtered graph.
	pub fn set_view(&mut self, graph: TopologyGraph, detail: DetailLevel, selected: Option<String>) {
		self.graph = graph;
		self.detail = detail;
		self.selected = selected;
		self.refresh_positions();
		if let Some(hovered) = self.hover.node.clone() {
			if self.graph.contains(&hovered) {
				self.set_hover(Some(hovered));
			} else {
				self.set_hover(None);
			}
		}
		if self.drag.node.as_deref().is_some_and(|id| !self.graph.contains(id)) {
			self.drag = DragState::default();
		}
	}

	fn refresh_positions(&mut self) {
		self.positions = self
			.graph
			.nodes
			.iter()
			.filter_map(|n| Some((n.id.clone(), self.graph.absolute_position(&n.id)?)))
			.collect();
	}

	pub fn position(&self, id: &str) -> Option<Position> {
		self.positions.get(id).copied()
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Position {
		Position::new(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under the pointer. Devices are drawn last so they win.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<String> {
		let p = self.screen_to_graph(sx, sy);
		let mut found: Option<(&str, bool)> = None;
		for node in &self.graph.nodes {
			let Some(pos) = self.position(&node.id) else {
				continue;
			};
			if pos.distance_to(p) < HIT_RADIUS.max(radius_of(node.kind)) {
				let replace = match found {
					Some((_, was_device)) => node.is_device() || !was_device,
					None => true,
				};
				if replace {
					found = Some((&node.id, node.is_device()));
				}
			}
		}
		found.map(|(id, _)| id.to_string())
	}

	pub fn set_hover(&mut self, node: Option<String>) {
		if self.hover.node == node && node.is_none() {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the previous highlight around for the fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.neighbors.clear();
		if let Some(id) = &node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in &self.graph.edges {
				if &edge.source == id {
					self.hover.neighbors.insert(edge.target.clone());
				} else if &edge.target == id {
					self.hover.neighbors.insert(edge.source.clone());
				}
			}
		}
		self.hover.node = node;
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id)
			|| self.hover.neighbors.contains(id)
			|| self.hover.prev_node.as_deref() == Some(id)
			|| self.hover.prev_neighbors.contains(id)
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id) || self.hover.prev_node.as_deref() == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn is_selected(&self, id: &str) -> bool {
		self.selected.as_deref() == Some(id)
	}

	/// Pointer pressed at screen coordinates.
	pub fn press(&mut self, sx: f64, sy: f64) {
		match self.node_at_position(sx, sy) {
			Some(id) => {
				let node_start = self.position(&id).unwrap_or_default();
				self.drag = DragState {
					active: true,
					node: Some(id),
					start_x: sx,
					start_y: sy,
					node_start,
					moved: false,
				};
			}
			None => {
				self.pan = PanState {
					active: true,
					start_x: sx,
					start_y: sy,
					transform_start_x: self.transform.x,
					transform_start_y: self.transform.y,
					moved: false,
				};
			}
		}
	}

	/// Pointer moved to screen coordinates.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if !self.drag.active {
			let hovered = self.node_at_position(sx, sy);
			if hovered != self.hover.node {
				self.set_hover(hovered);
			}
		}

		if self.drag.active {
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if dx.hypot(dy) > CLICK_SLOP {
				self.drag.moved = true;
			}
			if !self.drag.moved {
				return;
			}
			let Some(id) = self.drag.node.clone() else {
				return;
			};
			let target = Position::new(
				self.drag.node_start.x + dx / self.transform.k,
				self.drag.node_start.y + dy / self.transform.k,
			);
			let local = self.node_coordinates(&id, target);
			if let Some(node) = self.graph.node_mut(&id) {
				node.position = local;
			}
			self.refresh_positions();
		} else if self.pan.active {
			let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
			if dx.hypot(dy) > CLICK_SLOP {
				self.pan.moved = true;
			}
			self.transform.x = self.pan.transform_start_x + dx;
			self.transform.y = self.pan.transform_start_y + dy;
		}
	}

	/// Pointer released. Returns what the session should hear about.
	pub fn release(&mut self) -> Option<Gesture> {
		let gesture = if self.drag.active {
			let id = self.drag.node.clone();
			match id {
				Some(id) if self.drag.moved => {
					let pos = self.graph.node(&id).map(|n| n.position).unwrap_or_default();
					Some(Gesture::Reposition(id, pos))
				}
				Some(id) => Some(Gesture::Select(Some(id))),
				None => None,
			}
		} else if self.pan.active && !self.pan.moved {
			Some(Gesture::Select(None))
		} else {
			None
		};
		self.cancel();
		gesture
	}

	/// Pointer left the canvas.
	pub fn cancel(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
		self.pan.moved = false;
	}

	/// Convert an absolute position into the node's own coordinates.
	fn node_coordinates(&self, id: &str, absolute: Position) -> Position {
		let parent = self.graph.node(id).and_then(|n| n.parent.as_deref());
		match parent.and_then(|p| self.position(p)) {
			Some(origin) => absolute.relative_to(origin),
			None => absolute,
		}
	}

	pub fn zoom(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}
