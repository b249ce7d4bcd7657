use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{CanvasState, radius_of};
use crate::topology::{ConnectionType, EdgeKind, GraphNode, LinkQuality, NodeKind};

const BACKGROUND: &str = "#1a1a2e";
const CAPTION_LINE_HEIGHT: f64 = 11.0;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn quality_rgb(quality: Option<LinkQuality>) -> (u8, u8, u8) {
	match quality {
		Some(LinkQuality::Excellent) => (46, 204, 113),
		Some(LinkQuality::Good) => (100, 180, 255),
		Some(LinkQuality::Fair) => (241, 196, 15),
		Some(LinkQuality::Poor) => (231, 76, 60),
		None => (150, 150, 170),
	}
}

fn node_color(node: &GraphNode) -> &'static str {
	if !node.is_online() {
		return "#555a66";
	}
	match node.kind {
		NodeKind::Gateway => "#9467bd",
		NodeKind::Relay => "#1f77b4",
		NodeKind::Device => match node.device() {
			Some(d) if d.blocked => "#d62728",
			Some(d) if d.paused => "#ff7f0e",
			_ => "#17becf",
		},
	}
}

pub fn render(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: Option<(f64, f64)>) {
	let pattern = match dash {
		Some((on, off)) => js_sys::Array::of2(&JsValue::from_f64(on), &JsValue::from_f64(off)),
		None => js_sys::Array::new(),
	};
	let _ = ctx.set_line_dash(&pattern);
}

fn draw_edges(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (dash, gap) = (8.0 / k, 4.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);

	for edge in &state.graph.edges {
		let (Some(a), Some(b)) = (state.position(&edge.source), state.position(&edge.target)) else {
			continue;
		};
		let (dx, dy) = (b.x - a.x, b.y - a.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let is_highlighted = state.is_highlighted(&edge.source) && state.is_highlighted(&edge.target);
		let base_width = match edge.kind {
			EdgeKind::Mesh => 2.5 / k,
			EdgeKind::Client => 1.0 / k,
		};
		let (alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, base_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, base_width * (1.0 - 0.3 * t))
		};

		let (r, g, b_) = quality_rgb(edge.quality);
		ctx.set_stroke_style_str(&format!("rgba({r}, {g}, {b_}, {alpha})"));
		ctx.set_line_width(width);
		if edge.animated {
			set_dash(ctx, Some((dash, gap)));
			ctx.set_line_dash_offset(dash_offset);
		} else if edge.connection_type == Some(ConnectionType::Wireless) {
			set_dash(ctx, Some((dash / 2.0, gap)));
			ctx.set_line_dash_offset(0.0);
		} else {
			set_dash(ctx, None);
		}

		let (ux, uy) = (dx / dist, dy / dist);
		let (ra, rb) = (
			state.graph.node(&edge.source).map(|n| radius_of(n.kind)).unwrap_or(0.0),
			state.graph.node(&edge.target).map(|n| radius_of(n.kind)).unwrap_or(0.0),
		);
		ctx.begin_path();
		ctx.move_to(a.x + ux * ra, a.y + uy * ra);
		ctx.line_to(b.x - ux * rb, b.y - uy * rb);
		ctx.stroke();
	}
	set_dash(ctx, None);
}

fn draw_node(state: &CanvasState, ctx: &CanvasRenderingContext2d, node: &GraphNode, alpha: f64, scale: f64) {
	let Some(pos) = state.position(&node.id) else {
		return;
	};
	let k = state.transform.k;
	let radius = radius_of(node.kind) * scale;

	ctx.set_global_alpha(alpha);
	ctx.begin_path();
	let _ = ctx.arc(pos.x, pos.y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(node_color(node));
	ctx.fill();

	if state.is_selected(&node.id) {
		ctx.begin_path();
		let _ = ctx.arc(pos.x, pos.y, radius + 4.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str("rgba(255, 255, 255, 0.9)");
		ctx.set_line_width(2.0 / k);
		ctx.stroke();
	}

	ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.85));
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	for (i, line) in node.caption(state.detail).iter().enumerate() {
		let _ = ctx.fill_text(line, pos.x + radius + 3.0, pos.y + 3.0 + i as f64 * CAPTION_LINE_HEIGHT);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_nodes(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
	);

	// mesh nodes under devices, highlighted nodes over everything
	let mut order: Vec<&GraphNode> = state.graph.nodes.iter().collect();
	order.sort_by_key(|n| n.is_device());

	for node in &order {
		if has_highlight && state.is_highlighted(&node.id) {
			continue;
		}
		draw_node(state, ctx, node, 1.0 - 0.7 * t, 1.0 - 0.15 * t);
	}

	if !has_highlight {
		return;
	}

	for node in &order {
		if !state.is_highlighted(&node.id) {
			continue;
		}
		let scale = if state.is_hovered(&node.id) {
			1.0 + 0.35 * t
		} else {
			1.0 + 0.2 * t
		};
		draw_node(state, ctx, node, 1.0, scale);
	}
}
