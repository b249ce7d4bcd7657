//! Owns the current graph, load state, selection and manual positions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::{info, warn};

use super::builder::build_graph;
use super::config::TopologyConfig;
use super::error::{FetchError, Result, TopologyError};
use super::filter::filter_graph;
use super::source::{Snapshot, TopologySource, fetch_snapshot};
use super::types::{GraphNode, LayoutOptions, Position, TopologyGraph};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
	#[default]
	Idle,
	Loading,
	Loaded,
	Error(String),
}

/// Tags one `load()` call; only the newest ticket may publish its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
	generation: u64,
}

impl LoadTicket {
	pub fn generation(&self) -> u64 {
		self.generation
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
	LoadStarted,
	Loaded,
	LoadFailed(String),
	SelectionChanged(Option<String>),
	Repositioned(String),
	OptionsChanged,
	Cleared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&SessionEvent)>;

/// What the canvas draws: the filtered graph plus load status.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologyView {
	pub graph: TopologyGraph,
	pub loading: bool,
	pub error: Option<String>,
}

/// Single-owner topology state. Subscribers must not call back into the session.
pub struct TopologySession {
	graph: TopologyGraph,
	load_state: LoadState,
	selected_node_id: Option<String>,
	position_overrides: HashMap<String, Position>,
	options: LayoutOptions,
	force_seed: Option<u64>,
	generation: u64,
	snapshot: Option<Snapshot>,
	subscribers: Vec<(SubscriptionId, Subscriber)>,
	next_subscription: u64,
}

impl Default for TopologySession {
	fn default() -> Self {
		Self::new(TopologyConfig::default())
	}
}

impl TopologySession {
	pub fn new(config: TopologyConfig) -> Self {
		Self {
			graph: TopologyGraph::new(),
			load_state: LoadState::Idle,
			selected_node_id: None,
			position_overrides: HashMap::new(),
			options: config.options,
			force_seed: config.force_seed,
			generation: 0,
			snapshot: None,
			subscribers: Vec::new(),
			next_subscription: 0,
		}
	}

	pub fn graph(&self) -> &TopologyGraph {
		&self.graph
	}

	pub fn load_state(&self) -> &LoadState {
		&self.load_state
	}

	pub fn is_loading(&self) -> bool {
		self.load_state == LoadState::Loading
	}

	pub fn error(&self) -> Option<&str> {
		match &self.load_state {
			LoadState::Error(message) => Some(message),
			_ => None,
		}
	}

	pub fn options(&self) -> &LayoutOptions {
		&self.options
	}

	pub fn selected_node_id(&self) -> Option<&str> {
		self.selected_node_id.as_deref()
	}

	pub fn position_overrides(&self) -> &HashMap<String, Position> {
		&self.position_overrides
	}

	/// The graph filtered by the current display options.
	pub fn filtered_graph(&self) -> TopologyGraph {
		filter_graph(&self.graph, &self.options)
	}

	pub fn view(&self) -> TopologyView {
		TopologyView {
			graph: self.filtered_graph(),
			loading: self.is_loading(),
			error: self.error().map(str::to_string),
		}
	}

	/// The selected node if it is visible in the filtered graph.
	pub fn selected_node(&self) -> Option<GraphNode> {
		let id = self.selected_node_id.as_deref()?;
		self.filtered_graph().node(id).cloned()
	}

	pub fn subscribe(&mut self, callback: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_subscription);
		self.next_subscription += 1;
		self.subscribers.push((id, Box::new(callback)));
		id
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.subscribers.len();
		self.subscribers.retain(|(sub, _)| *sub != id);
		self.subscribers.len() != before
	}

	fn notify(&mut self, event: SessionEvent) {
		for (_, callback) in &mut self.subscribers {
			callback(&event);
		}
	}

	/// Start a load. Any ticket handed out earlier becomes stale.
	pub fn begin_load(&mut self) -> LoadTicket {
		self.generation += 1;
		self.load_state = LoadState::Loading;
		info!("topology load #{} started", self.generation);
		self.notify(SessionEvent::LoadStarted);
		LoadTicket {
			generation: self.generation,
		}
	}

	/// Publish the outcome of a fetch round started with `ticket`.
	///
	/// Stale tickets are discarded without touching state. A failed fetch keeps
	/// the previous graph and moves to [`LoadState::Error`].
	pub fn finish_load(
		&mut self,
		ticket: LoadTicket,
		fetched: std::result::Result<Snapshot, FetchError>,
	) -> Result<()> {
		if ticket.generation != self.generation {
			warn!(
				"dropping result of load #{}, load #{} is newer",
				ticket.generation, self.generation
			);
			return Err(TopologyError::Superseded {
				generation: ticket.generation,
			});
		}
		match fetched {
			Ok(snapshot) => {
				self.snapshot = Some(snapshot);
				self.rebuild();
				self.load_state = LoadState::Loaded;
				let stats = self.graph.stats();
				info!(
					"topology load #{} finished: {} relays, {} devices, {} edges",
					ticket.generation,
					stats.relays,
					stats.devices,
					self.graph.edges.len()
				);
				self.notify(SessionEvent::Loaded);
				Ok(())
			}
			Err(err) => {
				let message = err.to_string();
				warn!("topology load #{} failed: {message}", ticket.generation);
				self.load_state = LoadState::Error(message.clone());
				self.notify(SessionEvent::LoadFailed(message));
				Err(err.into())
			}
		}
	}

	/// Fetch and rebuild while holding the session exclusively.
	pub async fn load<S: TopologySource>(&mut self, source: &S) -> Result<()> {
		let ticket = self.begin_load();
		let fetched = fetch_snapshot(source).await;
		self.finish_load(ticket, fetched)
	}

	pub fn select(&mut self, node_id: Option<String>) {
		self.selected_node_id = node_id.clone();
		self.notify(SessionEvent::SelectionChanged(node_id));
	}

	/// Pin a node. Device positions are offsets from their owner.
	pub fn reposition(&mut self, node_id: &str, position: Position) {
		self.position_overrides.insert(node_id.to_string(), position);
		if let Some(node) = self.graph.node_mut(node_id) {
			node.position = position;
		}
		self.notify(SessionEvent::Repositioned(node_id.to_string()));
	}

	/// Replace the display options, rebuilding from the cached snapshot when
	/// the layout or grouping changed.
	pub fn set_options(&mut self, options: LayoutOptions) {
		let rebuild = self.options.needs_rebuild(&options);
		self.options = options;
		if rebuild && self.snapshot.is_some() {
			self.rebuild();
		}
		self.notify(SessionEvent::OptionsChanged);
	}

	pub fn update_options(&mut self, update: impl FnOnce(&mut LayoutOptions)) {
		let mut options = self.options.clone();
		update(&mut options);
		self.set_options(options);
	}

	/// Back to idle: no graph, no selection, no overrides. In-flight loads are dropped.
	pub fn clear(&mut self) {
		self.generation += 1;
		self.graph = TopologyGraph::new();
		self.load_state = LoadState::Idle;
		self.selected_node_id = None;
		self.position_overrides.clear();
		self.snapshot = None;
		self.notify(SessionEvent::Cleared);
	}

	fn rebuild(&mut self) {
		let Some(snapshot) = &self.snapshot else {
			return;
		};
		let seed = self.force_seed.unwrap_or_else(rand::random);
		let mut graph = build_graph(&snapshot.nodes, &snapshot.devices, &self.options, seed);
		for node in &mut graph.nodes {
			if let Some(pos) = self.position_overrides.get(&node.id) {
				node.position = *pos;
			}
		}
		self.graph = graph;
	}
}

/// Load into a shared session without holding the borrow across the fetch,
/// so the UI stays usable. Overlapping calls resolve by ticket: the newest
/// `load` wins regardless of which fetch finishes last.
pub async fn load_shared<S: TopologySource>(
	session: &Rc<RefCell<TopologySession>>,
	source: &S,
) -> Result<()> {
	let ticket = session.borrow_mut().begin_load();
	let fetched = fetch_snapshot(source).await;
	session.borrow_mut().finish_load(ticket, fetched)
}

#[cfg(test)]
mod tests {
	use futures::channel::oneshot;
	use futures::executor::block_on;
	use futures::future::{FutureExt, Shared};
	use futures::join;

	use super::*;
	use crate::topology::builder::tests::{device, node};
	use crate::topology::source::{DeviceSummary, NodeSummary, StaticSource};
	use crate::topology::types::{LayoutType, NodeStatus};

	struct FailingSource;

	impl TopologySource for FailingSource {
		async fn fetch_nodes(&self) -> std::result::Result<Vec<NodeSummary>, FetchError> {
			Err(FetchError::Nodes("timeout".into()))
		}

		async fn fetch_devices(&self) -> std::result::Result<Vec<DeviceSummary>, FetchError> {
			Ok(Vec::new())
		}
	}

	/// Node fetch blocks until the gate opens.
	struct GatedSource {
		gate: Shared<oneshot::Receiver<()>>,
		inner: StaticSource,
	}

	impl TopologySource for GatedSource {
		async fn fetch_nodes(&self) -> std::result::Result<Vec<NodeSummary>, FetchError> {
			let _ = self.gate.clone().await;
			self.inner.fetch_nodes().await
		}

		async fn fetch_devices(&self) -> std::result::Result<Vec<DeviceSummary>, FetchError> {
			self.inner.fetch_devices().await
		}
	}

	fn home() -> StaticSource {
		StaticSource::new(
			vec![node("gw1", "Office", true, None), node("r1", "Kitchen", false, Some(4))],
			vec![
				device("phone", "Kitchen", true, true),
				device("laptop", "Kitchen", true, false),
			],
		)
	}

	fn cabin() -> StaticSource {
		StaticSource::new(vec![node("cabin-gw", "Cabin", true, None)], vec![])
	}

	fn seeded() -> TopologySession {
		TopologySession::new(TopologyConfig {
			force_seed: Some(9),
			..Default::default()
		})
	}

	#[test]
	fn starts_idle_and_empty() {
		let session = TopologySession::default();
		assert_eq!(session.load_state(), &LoadState::Idle);
		assert!(session.graph().is_empty());
		assert_eq!(session.view(), TopologyView::default());
	}

	#[test]
	fn load_builds_graph() {
		let mut session = seeded();
		block_on(session.load(&home())).unwrap();
		assert_eq!(session.load_state(), &LoadState::Loaded);
		assert_eq!(session.graph().nodes.len(), 4);
		assert_eq!(session.graph().edges.len(), 3);
	}

	#[test]
	fn failed_load_keeps_previous_graph() {
		let mut session = seeded();
		block_on(session.load(&home())).unwrap();
		let before = session.graph().clone();

		let err = block_on(session.load(&FailingSource)).unwrap_err();
		assert!(matches!(err, TopologyError::Fetch(FetchError::Nodes(_))));
		assert_eq!(session.graph(), &before);
		assert_eq!(session.error(), Some("failed to fetch mesh nodes: timeout"));
		let view = session.view();
		assert!(!view.loading);
		assert_eq!(view.error.as_deref(), Some("failed to fetch mesh nodes: timeout"));

		block_on(session.load(&home())).unwrap();
		assert_eq!(session.error(), None);
	}

	#[test]
	fn overrides_survive_reload_and_ignore_missing_nodes() {
		let mut session = seeded();
		block_on(session.load(&home())).unwrap();
		session.reposition("r1", Position::new(1.0, 2.0));
		session.reposition("ghost", Position::new(5.0, 5.0));
		assert_eq!(session.graph().node("r1").unwrap().position, Position::new(1.0, 2.0));

		block_on(session.load(&home())).unwrap();
		assert_eq!(session.graph().node("r1").unwrap().position, Position::new(1.0, 2.0));
		assert!(!session.graph().contains("ghost"));
		assert_eq!(session.position_overrides().len(), 2);
	}

	#[test]
	fn reposition_moves_only_that_node() {
		let mut session = seeded();
		block_on(session.load(&home())).unwrap();
		let gw_before = session.graph().node("gw1").unwrap().position;
		session.reposition("phone", Position::new(-3.0, 40.0));
		assert_eq!(session.graph().node("gw1").unwrap().position, gw_before);
		assert_eq!(
			session.graph().absolute_position("phone"),
			Some(session.graph().node("r1").unwrap().position.offset_by(Position::new(-3.0, 40.0)))
		);
	}

	#[test]
	fn selection_survives_reload_but_not_clear() {
		let mut session = seeded();
		block_on(session.load(&home())).unwrap();
		session.select(Some("phone".into()));
		assert_eq!(session.selected_node().map(|n| n.id), Some("phone".into()));

		block_on(session.load(&cabin())).unwrap();
		assert_eq!(session.selected_node_id(), Some("phone"));
		assert!(session.selected_node().is_none());

		session.clear();
		assert_eq!(session.selected_node_id(), None);
		assert_eq!(session.load_state(), &LoadState::Idle);
		assert!(session.graph().is_empty());
		assert!(session.position_overrides().is_empty());
	}

	#[test]
	fn selecting_a_hidden_node_yields_nothing() {
		let mut session = seeded();
		block_on(session.load(&home())).unwrap();
		session.select(Some("laptop".into()));
		assert!(session.selected_node().is_some());
		session.update_options(|o| o.show_offline_devices = false);
		assert!(session.selected_node().is_none());
		assert!(session.view().graph.nodes.iter().all(|n| n.status == NodeStatus::Online));
	}

	#[test]
	fn layout_change_rebuilds_from_cache() {
		let mut session = seeded();
		block_on(session.load(&home())).unwrap();
		session.reposition("gw1", Position::new(7.0, 7.0));
		let hierarchy_r1 = session.graph().node("r1").unwrap().position;

		session.update_options(|o| o.layout_type = LayoutType::Radial);
		assert_ne!(session.graph().node("r1").unwrap().position, hierarchy_r1);
		assert_eq!(session.graph().node("gw1").unwrap().position, Position::new(7.0, 7.0));
		assert_eq!(session.load_state(), &LoadState::Loaded);
	}

	#[test]
	fn subscribers_see_every_mutation() {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let mut session = seeded();
		let sink = seen.clone();
		let id = session.subscribe(move |e| sink.borrow_mut().push(e.clone()));

		block_on(session.load(&home())).unwrap();
		session.select(None);
		session.reposition("r1", Position::default());
		session.update_options(|o| o.show_devices = false);
		session.clear();
		assert_eq!(
			*seen.borrow(),
			vec![
				SessionEvent::LoadStarted,
				SessionEvent::Loaded,
				SessionEvent::SelectionChanged(None),
				SessionEvent::Repositioned("r1".into()),
				SessionEvent::OptionsChanged,
				SessionEvent::Cleared,
			]
		);

		assert!(session.unsubscribe(id));
		assert!(!session.unsubscribe(id));
		session.select(Some("r1".into()));
		assert_eq!(seen.borrow().len(), 6);
	}

	#[test]
	fn stale_ticket_is_discarded() {
		let mut session = seeded();
		let first = session.begin_load();
		let second = session.begin_load();
		let cabin = Snapshot {
			nodes: cabin().nodes,
			devices: vec![],
		};
		let home = Snapshot {
			nodes: home().nodes,
			devices: home().devices,
		};

		assert_eq!((first.generation(), second.generation()), (1, 2));
		session.finish_load(second, Ok(cabin)).unwrap();
		let err = session.finish_load(first, Ok(home)).unwrap_err();
		assert!(matches!(err, TopologyError::Superseded { generation: 1 }));
		assert!(session.graph().contains("cabin-gw"));
		assert!(!session.graph().contains("gw1"));
	}

	#[test]
	fn stale_failure_does_not_flag_error() {
		let mut session = seeded();
		let first = session.begin_load();
		let second = session.begin_load();
		let _ = session.finish_load(first, Err(FetchError::Devices("reset".into())));
		assert!(session.is_loading());
		session
			.finish_load(second, Ok(Snapshot::default()))
			.unwrap();
		assert_eq!(session.load_state(), &LoadState::Loaded);
	}

	#[test]
	fn clear_drops_in_flight_load() {
		let mut session = seeded();
		let ticket = session.begin_load();
		session.clear();
		let fetched = Ok(Snapshot {
			nodes: home().nodes,
			devices: vec![],
		});
		assert!(session.finish_load(ticket, fetched).is_err());
		assert!(session.graph().is_empty());
		assert_eq!(session.load_state(), &LoadState::Idle);
	}

	#[test]
	fn reload_race_newest_call_wins_even_if_it_finishes_first() {
		let session = Rc::new(RefCell::new(seeded()));
		let (open_first, gate_first) = oneshot::channel::<()>();
		let (open_second, gate_second) = oneshot::channel::<()>();
		let first = GatedSource {
			gate: gate_first.shared(),
			inner: home(),
		};
		let second = GatedSource {
			gate: gate_second.shared(),
			inner: cabin(),
		};

		// the second call resolves first, then releases the first call
		let _ = open_second.send(());
		let second_then_first = async {
			let result = load_shared(&session, &second).await;
			let _ = open_first.send(());
			result
		};
		let (a, b) = block_on(async { join!(load_shared(&session, &first), second_then_first) });

		assert!(matches!(a, Err(TopologyError::Superseded { generation: 1 })));
		assert!(b.is_ok());
		let session = session.borrow();
		assert_eq!(session.load_state(), &LoadState::Loaded);
		assert!(session.graph().contains("cabin-gw"));
		assert!(!session.graph().contains("gw1"));
	}

	#[test]
	fn reload_race_in_call_order() {
		let session = Rc::new(RefCell::new(seeded()));
		let (open_first, gate_first) = oneshot::channel::<()>();
		let (open_second, gate_second) = oneshot::channel::<()>();
		let first = GatedSource {
			gate: gate_first.shared(),
			inner: home(),
		};
		let second = GatedSource {
			gate: gate_second.shared(),
			inner: cabin(),
		};

		let _ = open_first.send(());
		let first_then_second = async {
			let result = load_shared(&session, &first).await;
			let _ = open_second.send(());
			result
		};
		let (a, b) = block_on(async { join!(first_then_second, load_shared(&session, &second)) });

		assert!(a.is_ok());
		assert!(b.is_ok());
		assert!(session.borrow().graph().contains("cabin-gw"));
	}
}
