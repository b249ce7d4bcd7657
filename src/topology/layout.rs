//! Coordinate layouts for the mesh graph.
//!
//! Every strategy returns absolute positions for the gateway and relays and
//! offsets (relative to the owning node) for devices.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::types::{LayoutType, Position};

pub const CENTER: Position = Position::new(400.0, 300.0);

// hierarchy
pub const HIERARCHY_GATEWAY_Y: f64 = 60.0;
pub const HIERARCHY_RELAY_Y: f64 = 240.0;
pub const HIERARCHY_RELAY_PITCH: f64 = 260.0;
pub const HIERARCHY_GRID_COLUMNS: usize = 4;
pub const HIERARCHY_DEVICE_TOP: f64 = 110.0;
pub const HIERARCHY_DEVICE_DX: f64 = 60.0;
pub const HIERARCHY_DEVICE_DY: f64 = 55.0;

// radial
pub const RADIAL_RELAY_RADIUS: f64 = 260.0;
pub const RADIAL_DEVICES_PER_ROW: usize = 6;
pub const RADIAL_DEVICE_ARC: f64 = 2.0 * PI / 3.0;
pub const RADIAL_DEVICE_RADIUS: f64 = 80.0;
pub const RADIAL_ROW_STEP: f64 = 50.0;

// horizontal
pub const HORIZONTAL_GATEWAY_X: f64 = 80.0;
pub const HORIZONTAL_RELAY_X: f64 = 380.0;
pub const HORIZONTAL_TOP: f64 = 80.0;
pub const HORIZONTAL_RELAY_PITCH: f64 = 180.0;
pub const HORIZONTAL_DEVICES_PER_COLUMN: usize = 6;
pub const HORIZONTAL_DEVICE_X: f64 = 160.0;
pub const HORIZONTAL_COLUMN_STEP: f64 = 150.0;
pub const HORIZONTAL_DEVICE_DY: f64 = 40.0;

// force
pub const FORCE_RELAY_RADIUS: f64 = 240.0;
pub const FORCE_RADIUS_JITTER: f64 = 40.0;
pub const FORCE_ANGLE_JITTER: f64 = 0.25;
pub const FORCE_DEVICES_PER_RING: usize = 8;
pub const FORCE_DEVICE_RADIUS: f64 = 70.0;
pub const FORCE_RING_STEP: f64 = 35.0;
pub const FORCE_DEVICE_MAX_RADIUS: f64 = 180.0;
pub const FORCE_DEVICE_JITTER: f64 = 10.0;
/// No force-layout coordinate lies further than this from `CENTER`.
pub const FORCE_ENVELOPE: f64 =
	FORCE_RELAY_RADIUS + FORCE_RADIUS_JITTER + FORCE_DEVICE_MAX_RADIUS + FORCE_DEVICE_JITTER;

/// Ordered node ids to lay out. `devices` maps an owner id to its device ids.
#[derive(Clone, Debug, Default)]
pub struct LayoutInput<'a> {
	pub gateway: Option<&'a str>,
	pub relays: Vec<&'a str>,
	pub devices: IndexMap<&'a str, Vec<&'a str>>,
}

impl<'a> LayoutInput<'a> {
	fn devices_of(&self, owner: &str) -> &[&'a str] {
		self.devices.get(owner).map(Vec::as_slice).unwrap_or(&[])
	}

	fn owners(&self) -> impl Iterator<Item = &'a str> + '_ {
		self.gateway.into_iter().chain(self.relays.iter().copied())
	}
}

pub type PositionMap = IndexMap<String, Position>;

pub trait LayoutStrategy {
	fn layout(&self, input: &LayoutInput<'_>) -> PositionMap;
}

/// Strategy for a layout type. `seed` only matters for [`LayoutType::Force`].
pub fn strategy_for(layout: LayoutType, seed: u64) -> Box<dyn LayoutStrategy> {
	match layout {
		LayoutType::Hierarchy => Box::new(HierarchyLayout),
		LayoutType::Radial => Box::new(RadialLayout),
		LayoutType::Horizontal => Box::new(HorizontalLayout),
		LayoutType::Force => Box::new(ForceLayout { seed }),
	}
}

/// Offset of item `idx` in a row of `count` items spaced `pitch` apart, centred on 0.
fn centred(idx: usize, count: usize, pitch: f64) -> f64 {
	(idx as f64 - (count.saturating_sub(1)) as f64 / 2.0) * pitch
}

/// Number of items in row `row` when `total` items wrap every `width`.
fn row_len(row: usize, total: usize, width: usize) -> usize {
	total.saturating_sub(row * width).min(width)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HierarchyLayout;

impl LayoutStrategy for HierarchyLayout {
	fn layout(&self, input: &LayoutInput<'_>) -> PositionMap {
		let mut out = PositionMap::new();
		if let Some(gw) = input.gateway {
			out.insert(gw.to_string(), Position::new(CENTER.x, HIERARCHY_GATEWAY_Y));
		}
		let count = input.relays.len();
		for (i, relay) in input.relays.iter().enumerate() {
			let x = CENTER.x + centred(i, count, HIERARCHY_RELAY_PITCH);
			out.insert(relay.to_string(), Position::new(x, HIERARCHY_RELAY_Y));
		}
		for owner in input.owners() {
			let devices = input.devices_of(owner);
			for (j, device) in devices.iter().enumerate() {
				let (row, col) = (j / HIERARCHY_GRID_COLUMNS, j % HIERARCHY_GRID_COLUMNS);
				let in_row = row_len(row, devices.len(), HIERARCHY_GRID_COLUMNS);
				out.insert(
					device.to_string(),
					Position::new(
						centred(col, in_row, HIERARCHY_DEVICE_DX),
						HIERARCHY_DEVICE_TOP + row as f64 * HIERARCHY_DEVICE_DY,
					),
				);
			}
		}
		out
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RadialLayout;

impl LayoutStrategy for RadialLayout {
	fn layout(&self, input: &LayoutInput<'_>) -> PositionMap {
		let mut out = PositionMap::new();
		if let Some(gw) = input.gateway {
			out.insert(gw.to_string(), CENTER);
		}
		let count = input.relays.len();
		for (i, relay) in input.relays.iter().enumerate() {
			// start at the top, y grows downwards
			let angle = -FRAC_PI_2 + i as f64 * TAU / count as f64;
			out.insert(
				relay.to_string(),
				Position::new(
					CENTER.x + RADIAL_RELAY_RADIUS * angle.cos(),
					CENTER.y + RADIAL_RELAY_RADIUS * angle.sin(),
				),
			);
		}
		let step = RADIAL_DEVICE_ARC / (RADIAL_DEVICES_PER_ROW - 1) as f64;
		for owner in input.owners() {
			let devices = input.devices_of(owner);
			for (j, device) in devices.iter().enumerate() {
				let (row, slot) = (j / RADIAL_DEVICES_PER_ROW, j % RADIAL_DEVICES_PER_ROW);
				let in_row = row_len(row, devices.len(), RADIAL_DEVICES_PER_ROW);
				let angle = FRAC_PI_2 + centred(slot, in_row, step);
				let radius = RADIAL_DEVICE_RADIUS + row as f64 * RADIAL_ROW_STEP;
				out.insert(
					device.to_string(),
					Position::new(radius * angle.cos(), radius * angle.sin()),
				);
			}
		}
		out
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HorizontalLayout;

impl LayoutStrategy for HorizontalLayout {
	fn layout(&self, input: &LayoutInput<'_>) -> PositionMap {
		let mut out = PositionMap::new();
		let count = input.relays.len();
		if let Some(gw) = input.gateway {
			let y = HORIZONTAL_TOP + count.saturating_sub(1) as f64 * HORIZONTAL_RELAY_PITCH / 2.0;
			out.insert(gw.to_string(), Position::new(HORIZONTAL_GATEWAY_X, y));
		}
		for (i, relay) in input.relays.iter().enumerate() {
			out.insert(
				relay.to_string(),
				Position::new(
					HORIZONTAL_RELAY_X,
					HORIZONTAL_TOP + i as f64 * HORIZONTAL_RELAY_PITCH,
				),
			);
		}
		for owner in input.owners() {
			let devices = input.devices_of(owner);
			for (j, device) in devices.iter().enumerate() {
				let (col, row) = (
					j / HORIZONTAL_DEVICES_PER_COLUMN,
					j % HORIZONTAL_DEVICES_PER_COLUMN,
				);
				let in_col = row_len(col, devices.len(), HORIZONTAL_DEVICES_PER_COLUMN);
				out.insert(
					device.to_string(),
					Position::new(
						HORIZONTAL_DEVICE_X + col as f64 * HORIZONTAL_COLUMN_STEP,
						centred(row, in_col, HORIZONTAL_DEVICE_DY),
					),
				);
			}
		}
		out
	}
}

/// Circle placement with seeded, bounded jitter. Not a physics simulation.
#[derive(Clone, Copy, Debug)]
pub struct ForceLayout {
	pub seed: u64,
}

impl LayoutStrategy for ForceLayout {
	fn layout(&self, input: &LayoutInput<'_>) -> PositionMap {
		let mut rng = StdRng::seed_from_u64(self.seed);
		let mut out = PositionMap::new();
		if let Some(gw) = input.gateway {
			out.insert(gw.to_string(), CENTER);
		}
		let count = input.relays.len();
		for (i, relay) in input.relays.iter().enumerate() {
			let angle = i as f64 / count as f64 * TAU
				+ rng.gen_range(-FORCE_ANGLE_JITTER..=FORCE_ANGLE_JITTER);
			let radius =
				FORCE_RELAY_RADIUS + rng.gen_range(-FORCE_RADIUS_JITTER..=FORCE_RADIUS_JITTER);
			out.insert(
				relay.to_string(),
				Position::new(CENTER.x + radius * angle.cos(), CENTER.y + radius * angle.sin()),
			);
		}
		for owner in input.owners() {
			let devices = input.devices_of(owner);
			let n = devices.len();
			for (j, device) in devices.iter().enumerate() {
				let ring = (j / FORCE_DEVICES_PER_RING) as f64;
				let angle = j as f64 / n as f64 * TAU;
				let radius = (FORCE_DEVICE_RADIUS + ring * FORCE_RING_STEP)
					.min(FORCE_DEVICE_MAX_RADIUS)
					+ rng.gen_range(-FORCE_DEVICE_JITTER..=FORCE_DEVICE_JITTER);
				out.insert(
					device.to_string(),
					Position::new(radius * angle.cos(), radius * angle.sin()),
				);
			}
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input<'a>(relays: &[&'a str], devices: &[(&'a str, Vec<&'a str>)]) -> LayoutInput<'a> {
		LayoutInput {
			gateway: Some("gw"),
			relays: relays.to_vec(),
			devices: devices.iter().cloned().collect(),
		}
	}

	fn busy<'a>(ids: &'a [String]) -> LayoutInput<'a> {
		let names: Vec<&str> = ids.iter().map(String::as_str).collect();
		input(
			&["r1", "r2", "r3"],
			&[("gw", names[..5].to_vec()), ("r2", names[5..].to_vec())],
		)
	}

	fn device_ids(n: usize) -> Vec<String> {
		(0..n).map(|i| format!("d{i}")).collect()
	}

	#[test]
	fn every_node_gets_a_position() {
		let ids = device_ids(30);
		let input = busy(&ids);
		for layout in [
			LayoutType::Hierarchy,
			LayoutType::Radial,
			LayoutType::Horizontal,
			LayoutType::Force,
		] {
			let out = strategy_for(layout, 1).layout(&input);
			assert_eq!(out.len(), 1 + 3 + 30, "{layout:?}");
			assert!(out.values().all(|p| p.x.is_finite() && p.y.is_finite()));
		}
	}

	#[test]
	fn deterministic_layouts_repeat_exactly() {
		let ids = device_ids(17);
		let input = busy(&ids);
		for strategy in [
			&HierarchyLayout as &dyn LayoutStrategy,
			&RadialLayout,
			&HorizontalLayout,
		] {
			let a = strategy.layout(&input);
			let b = strategy.layout(&input);
			assert!(a.iter().eq(b.iter()));
		}
	}

	#[test]
	fn force_is_reproducible_per_seed() {
		let ids = device_ids(12);
		let input = busy(&ids);
		let a = ForceLayout { seed: 42 }.layout(&input);
		let b = ForceLayout { seed: 42 }.layout(&input);
		let c = ForceLayout { seed: 43 }.layout(&input);
		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	#[test]
	fn force_stays_inside_envelope() {
		let ids = device_ids(200);
		let names: Vec<&str> = ids.iter().map(String::as_str).collect();
		let input = input(&["r1", "r2"], &[("r1", names.clone()), ("gw", names[..9].to_vec())]);
		for seed in 0..50 {
			let out = ForceLayout { seed }.layout(&input);
			for (owner, devices) in &input.devices {
				let origin = out[*owner];
				for device in devices {
					let abs = origin.offset_by(out[*device]);
					assert!(abs.distance_to(CENTER) <= FORCE_ENVELOPE, "seed {seed}");
				}
			}
			for relay in &input.relays {
				assert!(out[*relay].distance_to(CENTER) <= FORCE_RELAY_RADIUS + FORCE_RADIUS_JITTER);
			}
		}
	}

	#[test]
	fn hierarchy_centres_gateway_over_relays() {
		let out = HierarchyLayout.layout(&input(&["r1", "r2", "r3"], &[]));
		assert_eq!(out["gw"], Position::new(CENTER.x, HIERARCHY_GATEWAY_Y));
		assert_eq!(out["r2"].x, CENTER.x);
		assert_eq!(out["r3"].x - out["r2"].x, HIERARCHY_RELAY_PITCH);
		assert_eq!(out["r1"].y, HIERARCHY_RELAY_Y);
	}

	#[test]
	fn hierarchy_devices_wrap_into_centred_rows() {
		let ids = device_ids(6);
		let names: Vec<&str> = ids.iter().map(String::as_str).collect();
		let out = HierarchyLayout.layout(&input(&["r1"], &[("r1", names)]));
		// first row of four, second row of two, both centred under the owner
		assert_eq!(out["d0"].x, -1.5 * HIERARCHY_DEVICE_DX);
		assert_eq!(out["d3"].x, 1.5 * HIERARCHY_DEVICE_DX);
		assert_eq!(out["d4"].x, -0.5 * HIERARCHY_DEVICE_DX);
		assert_eq!(out["d4"].y, HIERARCHY_DEVICE_TOP + HIERARCHY_DEVICE_DY);
		assert!(out["d0"].y > 0.0);
	}

	#[test]
	fn radial_starts_at_top_and_fans_below() {
		let out = RadialLayout.layout(&input(&["r1", "r2", "r3", "r4"], &[("r1", vec!["a", "b", "c"])]));
		assert_eq!(out["gw"], CENTER);
		assert!((out["r1"].x - CENTER.x).abs() < 1e-9);
		assert!((out["r1"].y - (CENTER.y - RADIAL_RELAY_RADIUS)).abs() < 1e-9);
		for d in ["a", "b", "c"] {
			let p = out[d];
			assert!(p.y > 0.0, "device {d} should hang below its relay");
			assert!((p.distance_to(Position::default()) - RADIAL_DEVICE_RADIUS).abs() < 1e-9);
		}
		assert!(out["b"].x.abs() < 1e-9);
	}

	#[test]
	fn horizontal_gateway_is_vertically_centred() {
		let out = HorizontalLayout.layout(&input(&["r1", "r2", "r3"], &[("r3", vec!["a", "b"])]));
		assert_eq!(out["gw"].x, HORIZONTAL_GATEWAY_X);
		assert_eq!(out["gw"].y, out["r2"].y);
		assert!(out["r1"].x > out["gw"].x);
		assert_eq!(out["a"].x, HORIZONTAL_DEVICE_X);
		assert_eq!(out["a"].y, -out["b"].y);
	}

	#[test]
	fn lone_gateway_and_no_gateway() {
		let out = RadialLayout.layout(&input(&[], &[("gw", vec!["a"])]));
		assert_eq!(out.len(), 2);

		let headless = LayoutInput {
			gateway: None,
			relays: vec!["r1"],
			devices: IndexMap::new(),
		};
		for layout in [LayoutType::Hierarchy, LayoutType::Horizontal, LayoutType::Force] {
			assert_eq!(strategy_for(layout, 0).layout(&headless).len(), 1);
		}
	}
}
