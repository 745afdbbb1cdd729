use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{
	Hit, MARKER_RADIUS, PlanGraphState, cluster_badge, id_badge, marker_center, title_badge,
};
use crate::layout::{Point, Rect};
use crate::model::{CORE_HEADER, DETAIL_ROW_HEIGHT, GraphNode, NodeKind};
use crate::plan::InputOrdering;
use crate::scale::{category_color, magnitude_color};
use crate::selection::{SelectableId, SelectionCoordinator};

const BACKGROUND: &str = "#ffffff";
const NODE_FILL: &str = "#ffffff";
const NODE_STROKE: &str = "#555555";
const SLOT_FILL: &str = "#f2f2f2";
const EDGE_STROKE: &str = "#999999";
const EDGE_HOVER_STROKE: &str = "#333333";
const STAGE_FILL: &str = "#eedd22";
const ID_BADGE_FILL: &str = "#dddddd";
const INPUT_MARKER: &str = "#1f77b4";
const OUTPUT_MARKER: &str = "#ff7f0e";
const ARROW_SIZE: f64 = 8.0;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &PlanGraphState, selection: &SelectionCoordinator, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_groups(state, selection, ctx);
	draw_edges(state, selection, ctx);
	draw_nodes(state, selection, ctx);
	ctx.restore();
}

fn rounded_rect(ctx: &CanvasRenderingContext2d, r: &Rect, radius: f64) {
	let radius = radius.min(r.width / 2.0).min(r.height / 2.0);
	ctx.begin_path();
	ctx.move_to(r.x + radius, r.y);
	let _ = ctx.arc_to(r.right(), r.y, r.right(), r.bottom(), radius);
	let _ = ctx.arc_to(r.right(), r.bottom(), r.x, r.bottom(), radius);
	let _ = ctx.arc_to(r.x, r.bottom(), r.x, r.y, radius);
	let _ = ctx.arc_to(r.x, r.y, r.right(), r.y, radius);
	ctx.close_path();
}

fn draw_groups(state: &PlanGraphState, selection: &SelectionCoordinator, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	for (group, bounds) in state.loaded.model.groups.iter().zip(&state.layout.frame().groups) {
		let Some(r) = bounds else {
			continue;
		};
		let color = category_color(group.cluster);
		rounded_rect(ctx, r, 8.0);
		ctx.set_global_alpha(0.08);
		ctx.set_fill_style_str(color);
		ctx.fill();
		ctx.set_global_alpha(1.0);

		let selected = selection.color_of(&SelectableId::Cluster(group.cluster));
		match selected {
			Some(c) => {
				ctx.set_stroke_style_str(&c.to_string());
				ctx.set_line_width(3.0 / k);
			}
			None => {
				ctx.set_stroke_style_str(color);
				ctx.set_line_width(1.0 / k);
			}
		}
		ctx.stroke();

		ctx.set_fill_style_str(color);
		ctx.set_font("bold 12px sans-serif");
		ctx.set_text_align("left");
		ctx.set_text_baseline("top");
		let _ = ctx.fill_text(&group.label, r.x + 6.0, r.y + 4.0);
	}
}

fn draw_edges(state: &PlanGraphState, selection: &SelectionCoordinator, ctx: &CanvasRenderingContext2d) {
	let frame = state.layout.frame();
	let model = &state.loaded.model;
	let plan = &state.loaded.plan;

	for (i, link) in model.visible_links() {
		let Some(route) = frame.routes.get(i).and_then(Option::as_ref) else {
			continue;
		};
		let (Some(tip), Some((ux, uy))) = (route.tip(), route.end_direction()) else {
			continue;
		};
		let selected = link.edge.and_then(|e| plan.edges.get(e)).and_then(|e| {
			selection.color_of(&SelectableId::Edge {
				source: e.source_proc,
				dest: e.dest_proc,
			})
		});
		let hovered = state.hover.target == Some(Hit::Edge(i));
		let color = match (selected, hovered) {
			(Some(c), _) => c.to_string(),
			(None, true) => EDGE_HOVER_STROKE.to_string(),
			(None, false) => EDGE_STROKE.to_string(),
		};
		let width = if selected.is_some() || hovered {
			link.width * 1.5
		} else {
			link.width
		};

		ctx.set_stroke_style_str(&color);
		ctx.set_line_width(width);
		let dash = if link.dashed {
			js_sys::Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(4.0))
		} else {
			js_sys::Array::new()
		};
		let _ = ctx.set_line_dash(&dash);

		// Stop the line at the arrowhead's base.
		let (back_x, back_y) = (tip.x - ux * ARROW_SIZE, tip.y - uy * ARROW_SIZE);
		ctx.begin_path();
		let [first, middle @ .., _] = route.points.as_slice() else {
			continue;
		};
		ctx.move_to(first.x, first.y);
		for p in middle {
			ctx.line_to(p.x, p.y);
		}
		ctx.line_to(back_x, back_y);
		ctx.stroke();

		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.set_fill_style_str(&color);
		let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);
		ctx.begin_path();
		ctx.move_to(tip.x, tip.y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_nodes(state: &PlanGraphState, selection: &SelectionCoordinator, ctx: &CanvasRenderingContext2d) {
	let frame = state.layout.frame();
	for node in &state.loaded.model.nodes {
		let Some(r) = frame.node(node.id) else {
			continue;
		};
		match node.kind {
			NodeKind::Core => draw_core(state, selection, ctx, node, r),
			NodeKind::Synchronizer | NodeKind::Router => draw_slot(state, ctx, node, r),
		}
	}
}

fn draw_slot(state: &PlanGraphState, ctx: &CanvasRenderingContext2d, node: &GraphNode, r: &Rect) {
	let hovered = state.hover.target == Some(Hit::Node(node.id));
	rounded_rect(ctx, r, node.geometry.corner_radius);
	ctx.set_fill_style_str(SLOT_FILL);
	ctx.fill();
	ctx.set_stroke_style_str(NODE_STROKE);
	ctx.set_line_width(if hovered { 2.0 } else { 1.0 });
	ctx.stroke();

	ctx.set_fill_style_str("black");
	ctx.set_font("10px sans-serif");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let c = r.center();
	let _ = ctx.fill_text(&node.title, c.x, c.y);
}

fn draw_core(
	state: &PlanGraphState,
	selection: &SelectionCoordinator,
	ctx: &CanvasRenderingContext2d,
	node: &GraphNode,
	r: &Rect,
) {
	let plan = &state.loaded.plan;
	let processor = &plan.processors[node.processor];

	rounded_rect(ctx, r, node.geometry.corner_radius);
	match selection.color_of(&SelectableId::Processor(node.processor)) {
		Some(c) => ctx.set_fill_style_str(&c.to_string()),
		None => ctx.set_fill_style_str(NODE_FILL),
	}
	ctx.fill();
	if state.hover.lit_stage() == Some(node.stage) {
		ctx.set_global_alpha(ease_out_cubic(state.hover.highlight_t.clamp(0.0, 1.0)));
		ctx.set_fill_style_str(STAGE_FILL);
		ctx.fill();
		ctx.set_global_alpha(1.0);
	}
	match selection.color_of(&SelectableId::Cluster(node.cluster)) {
		Some(c) => {
			ctx.set_stroke_style_str(&c.to_string());
			ctx.set_line_width(3.0);
		}
		None => {
			ctx.set_stroke_style_str(NODE_STROKE);
			ctx.set_line_width(1.0);
		}
	}
	ctx.stroke();

	// Cluster badge
	let badge = cluster_badge(r);
	rounded_rect(ctx, &badge, 3.0);
	ctx.set_fill_style_str(category_color(node.cluster));
	ctx.fill();
	ctx.set_fill_style_str("white");
	ctx.set_font("bold 9px sans-serif");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let c = badge.center();
	let _ = ctx.fill_text(&format!("N{}", plan.node_name(node.processor)), c.x, c.y);

	// Processor id badge
	let id = id_badge(r);
	rounded_rect(ctx, &id, 3.0);
	ctx.set_fill_style_str(ID_BADGE_FILL);
	ctx.fill();
	ctx.set_fill_style_str("black");
	let c = id.center();
	let _ = ctx.fill_text(&node.processor.to_string(), c.x, c.y);

	// Title badge
	let title = title_badge(r);
	if state.hover.target == Some(Hit::TitleBadge(node.id)) {
		rounded_rect(ctx, &title, 3.0);
		ctx.set_fill_style_str("#e8e8e8");
		ctx.fill();
	}
	ctx.set_fill_style_str("black");
	ctx.set_font("bold 10px sans-serif");
	ctx.set_text_align("left");
	let _ = ctx.fill_text_with_max_width(
		&node.title,
		title.x + 2.0,
		title.center().y,
		(title.width - 4.0).max(1.0),
	);

	// Input and output markers
	let markers = [
		(processor.has_input(InputOrdering::Ordered), "O", INPUT_MARKER),
		(processor.has_input(InputOrdering::Unordered), "U", INPUT_MARKER),
		(!processor.outputs.is_empty(), "H", OUTPUT_MARKER),
	];
	for (i, (_, label, color)) in markers.iter().rev().filter(|m| m.0).enumerate() {
		draw_marker(ctx, marker_center(r, i), label, color);
	}

	draw_detail_rows(ctx, node, r);
}

fn draw_marker(ctx: &CanvasRenderingContext2d, at: Point, label: &str, color: &str) {
	ctx.begin_path();
	let _ = ctx.arc(at.x, at.y, MARKER_RADIUS, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(color);
	ctx.fill();
	ctx.set_fill_style_str("white");
	ctx.set_font("bold 7px sans-serif");
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	let _ = ctx.fill_text(label, at.x, at.y);
}

/// Detail lines as chips, filled by order of magnitude where numeric.
fn draw_detail_rows(ctx: &CanvasRenderingContext2d, node: &GraphNode, r: &Rect) {
	let rows = ((r.height - CORE_HEADER) / DETAIL_ROW_HEIGHT).floor().max(0.0) as usize;
	ctx.set_font("8px sans-serif");
	ctx.set_text_align("left");
	ctx.set_text_baseline("middle");
	for (j, line) in node.details.iter().take(rows).enumerate() {
		let chip = Rect {
			x: r.x + 4.0,
			y: r.y + CORE_HEADER + j as f64 * DETAIL_ROW_HEIGHT,
			width: r.width - 8.0,
			height: DETAIL_ROW_HEIGHT - 1.0,
		};
		let fill = line
			.split_once(':')
			.and_then(|(name, _)| node.metrics.value(name.trim()))
			.and_then(|v| v.positive())
			.and_then(magnitude_color);
		let text_color = match fill {
			Some(c) => {
				rounded_rect(ctx, &chip, 2.0);
				ctx.set_fill_style_str(&c.to_string());
				ctx.fill();
				c.text_color()
			}
			None => "black",
		};
		ctx.set_fill_style_str(text_color);
		let _ = ctx.fill_text(line, chip.x + 2.0, chip.center().y);
	}
}
