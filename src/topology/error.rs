use thiserror::Error;

/// Failure reported by the fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
	#[error("failed to fetch mesh nodes: {0}")]
	Nodes(String),

	#[error("failed to fetch devices: {0}")]
	Devices(String),

	#[error("malformed response: {0}")]
	Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TopologyError {
	#[error(transparent)]
	Fetch(#[from] FetchError),

	/// A newer load started before this one finished; its result was dropped.
	#[error("load #{generation} was superseded by a newer load")]
	Superseded { generation: u64 },

	#[error("invalid configuration: {0}")]
	Config(String),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
