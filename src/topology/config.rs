use serde::Deserialize;

use super::error::{Result, TopologyError};
use super::types::LayoutOptions;

/// Session configuration, usually embedded in the page as JSON.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopologyConfig {
	pub options: LayoutOptions,
	/// Fixed seed for the force layout. `None` draws a fresh seed per rebuild.
	pub force_seed: Option<u64>,
}

impl TopologyConfig {
	pub fn from_json(raw: &str) -> Result<Self> {
		serde_json::from_str(raw).map_err(|e| TopologyError::Config(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::topology::types::{DetailLevel, LayoutType};

	#[test]
	fn missing_fields_take_defaults() {
		let config = TopologyConfig::from_json("{}").unwrap();
		assert_eq!(config, TopologyConfig::default());
		assert!(config.options.show_devices);
		assert!(config.options.group_by_eero);
	}

	#[test]
	fn parses_camel_case_options() {
		let config = TopologyConfig::from_json(
			r#"{"options": {"layoutType": "radial", "detailLevel": "detailed", "showOfflineDevices": false}, "forceSeed": 7}"#,
		)
		.unwrap();
		assert_eq!(config.options.layout_type, LayoutType::Radial);
		assert_eq!(config.options.detail_level, DetailLevel::Detailed);
		assert!(!config.options.show_offline_devices);
		assert!(config.options.show_devices);
		assert_eq!(config.force_seed, Some(7));
	}

	#[test]
	fn rejects_unknown_layout() {
		let err = TopologyConfig::from_json(r#"{"options": {"layoutType": "spiral"}}"#).unwrap_err();
		assert!(matches!(err, TopologyError::Config(_)));
	}
}
