//! Assigns client devices to the mesh node they are attached to.
//!
//! Upstream has no device -> node foreign key, only the free-text location (or
//! model) of the node a device reports, so the join here is best-effort.

use indexmap::IndexMap;
use log::debug;

use super::source::DeviceSummary;

/// Bucket for devices that match no mesh node.
pub const UNKNOWN_GROUP: &str = "unknown";

/// The identifying fields of a gateway or relay that devices are matched against.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshAnchor {
	pub id: String,
	pub location: Option<String>,
	pub model: Option<String>,
}

/// Device indices per node id, in anchor order, with `unknown` always last.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceGroups {
	groups: IndexMap<String, Vec<usize>>,
}

impl DeviceGroups {
	/// Empty groups for every anchor plus the `unknown` bucket.
	pub fn new<'a>(anchor_ids: impl IntoIterator<Item = &'a str>) -> Self {
		let mut groups: IndexMap<String, Vec<usize>> = anchor_ids
			.into_iter()
			.filter(|id| *id != UNKNOWN_GROUP)
			.map(|id| (id.to_string(), Vec::new()))
			.collect();
		groups.insert(UNKNOWN_GROUP.to_string(), Vec::new());
		Self { groups }
	}

	pub fn assign(&mut self, group: &str, device: usize) {
		match self.groups.get_mut(group) {
			Some(members) => members.push(device),
			None => self.unknown_mut().push(device),
		}
	}

	pub fn get(&self, group: &str) -> &[usize] {
		self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn unknown(&self) -> &[usize] {
		self.get(UNKNOWN_GROUP)
	}

	fn unknown_mut(&mut self) -> &mut Vec<usize> {
		self.groups.entry(UNKNOWN_GROUP.to_string()).or_default()
	}

	pub fn total(&self) -> usize {
		self.groups.values().map(Vec::len).sum()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
		self.groups.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
	}
}

/// Seam for the device -> node join, so a keyed join can replace the heuristic.
pub trait GroupingResolver {
	fn resolve(&self, devices: &[DeviceSummary], anchors: &[MeshAnchor]) -> DeviceGroups;
}

/// Matches by reported node id, then exact location/model, then the same
/// fields case-insensitively. Everything else lands in `unknown`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocationResolver;

impl LocationResolver {
	fn match_device<'a>(device: &DeviceSummary, anchors: &'a [MeshAnchor]) -> Option<&'a str> {
		if let Some(id) = device.connected_to_id.as_deref() {
			if let Some(anchor) = anchors.iter().find(|a| a.id == id) {
				return Some(&anchor.id);
			}
		}
		let wanted = device.connected_to.as_deref()?;
		let fields = |a: &'a MeshAnchor| [a.location.as_deref(), a.model.as_deref()];

		anchors
			.iter()
			.find(|a| fields(*a).into_iter().flatten().any(|f| f == wanted))
			.or_else(|| {
				let wanted = wanted.to_lowercase();
				anchors.iter().find(|a| {
					fields(*a)
						.into_iter()
						.flatten()
						.any(|f| f.to_lowercase() == wanted)
				})
			})
			.map(|a| a.id.as_str())
	}
}

impl GroupingResolver for LocationResolver {
	fn resolve(&self, devices: &[DeviceSummary], anchors: &[MeshAnchor]) -> DeviceGroups {
		let mut groups = DeviceGroups::new(anchors.iter().map(|a| a.id.as_str()));
		for (idx, device) in devices.iter().enumerate() {
			match Self::match_device(device, anchors) {
				Some(id) => groups.assign(id, idx),
				None => {
					debug!(
						"device #{idx} ({:?}) matched no mesh node, grouping as unknown",
						device.connected_to
					);
					groups.assign(UNKNOWN_GROUP, idx);
				}
			}
		}
		groups
	}
}

/// Every device in one bucket under `anchor`, skipping the matching heuristics.
pub fn single_group(anchor: &str, device_count: usize) -> DeviceGroups {
	let mut groups = DeviceGroups::new([anchor]);
	for idx in 0..device_count {
		groups.assign(anchor, idx);
	}
	groups
}

#[cfg(test)]
mod tests {
	use super::*;

	fn anchor(id: &str, location: &str, model: &str) -> MeshAnchor {
		MeshAnchor {
			id: id.into(),
			location: Some(location.into()),
			model: Some(model.into()),
		}
	}

	fn attached(to: Option<&str>) -> DeviceSummary {
		DeviceSummary {
			connected_to: to.map(String::from),
			..Default::default()
		}
	}

	fn anchors() -> Vec<MeshAnchor> {
		vec![
			anchor("gw1", "Office", "eero Pro 6E"),
			anchor("r1", "Kitchen", "eero 6"),
			anchor("r2", "kitchen", "eero Beacon"),
		]
	}

	#[test]
	fn exact_match_beats_case_insensitive() {
		let groups = LocationResolver.resolve(&[attached(Some("kitchen"))], &anchors());
		assert_eq!(groups.get("r2"), &[0]);
		assert!(groups.get("r1").is_empty());
	}

	#[test]
	fn falls_back_to_case_insensitive_and_model() {
		let devices = [attached(Some("OFFICE")), attached(Some("eero Beacon"))];
		let groups = LocationResolver.resolve(&devices, &anchors());
		assert_eq!(groups.get("gw1"), &[0]);
		assert_eq!(groups.get("r2"), &[1]);
	}

	#[test]
	fn reported_node_id_wins() {
		let device = DeviceSummary {
			connected_to: Some("Office".into()),
			connected_to_id: Some("r1".into()),
			..Default::default()
		};
		let groups = LocationResolver.resolve(&[device], &anchors());
		assert_eq!(groups.get("r1"), &[0]);
	}

	#[test]
	fn unmatched_and_missing_go_to_unknown() {
		let devices = [attached(Some("Unknown Room")), attached(None)];
		let groups = LocationResolver.resolve(&devices, &anchors());
		assert_eq!(groups.unknown(), &[0, 1]);
	}

	#[test]
	fn totality_holds_for_any_input() {
		let cases: Vec<(Vec<DeviceSummary>, Vec<MeshAnchor>)> = vec![
			(vec![], vec![]),
			(vec![attached(Some("Office"))], vec![]),
			(vec![], anchors()),
			(
				vec![
					attached(Some("Office")),
					attached(Some("garage")),
					attached(None),
					attached(Some("KITCHEN")),
				],
				anchors(),
			),
		];
		for (devices, anchors) in cases {
			let groups = LocationResolver.resolve(&devices, &anchors);
			assert_eq!(groups.total(), devices.len());
			assert!(groups.iter().any(|(id, _)| id == UNKNOWN_GROUP));
		}
	}

	#[test]
	fn single_group_holds_everything() {
		let groups = single_group("gw1", 3);
		assert_eq!(groups.get("gw1"), &[0, 1, 2]);
		assert!(groups.unknown().is_empty());
		assert_eq!(groups.total(), 3);
	}
}
