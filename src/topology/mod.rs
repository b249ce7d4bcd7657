//! Mesh topology engine: turns node/device summaries into a positioned graph.

pub mod builder;
pub mod config;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod layout;
pub mod quality;
pub mod session;
pub mod source;
pub mod types;

pub use builder::{GraphBuilder, build_graph};
pub use config::TopologyConfig;
pub use error::{FetchError, Result, TopologyError};
pub use filter::filter_graph;
pub use grouping::{GroupingResolver, LocationResolver, UNKNOWN_GROUP};
pub use session::{LoadState, SessionEvent, TopologySession, TopologyView, load_shared};
pub use source::{DeviceSummary, NodeSummary, StaticSource, TopologySource};
pub use types::{
	ConnectionType, DetailLevel, EdgeKind, GraphEdge, GraphNode, LayoutOptions, LayoutType, LinkQuality,
	NodeKind, NodeStatus, Position, TopologyGraph,
};
