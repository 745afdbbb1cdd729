use std::sync::Arc;

use crate::components::tooltip::TooltipContent;
use crate::config::ViewerConfig;
use crate::error::Result;
use crate::layout::geometry::distance_to_polyline;
use crate::layout::{LayoutEngine, LayoutKind, Point, Rect, ViewTransform, create_layout};
use crate::model::{CORE_HEADER, NodeId, NodeKind};
use crate::selection::SelectableId;
use crate::session::LoadedPlan;

/// Width of the invisible stroke that catches edge hovers, in pixels.
pub const EDGE_HIT_WIDTH: f64 = 10.0;
/// Pointer travel below which a press counts as a click, in pixels.
pub const CLICK_TOLERANCE: f64 = 3.0;
pub const BADGE_INSET: f64 = 4.0;
pub const BADGE_HEIGHT: f64 = CORE_HEADER - 2.0 * BADGE_INSET;
pub const CLUSTER_BADGE_WIDTH: f64 = 28.0;
pub const ID_BADGE_WIDTH: f64 = 20.0;
pub const MARKER_RADIUS: f64 = 5.0;
pub const MARKER_SPACING: f64 = 13.0;
/// Room kept for the input/output markers at the right of the header.
const MARKER_AREA: f64 = 3.0 * MARKER_SPACING;

/// What the pointer is over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
	ClusterBadge(NodeId),
	TitleBadge(NodeId),
	Node(NodeId),
	/// Index into the model's links
	Edge(usize),
}

pub fn cluster_badge(core: &Rect) -> Rect {
	Rect {
		x: core.x + BADGE_INSET,
		y: core.y + BADGE_INSET,
		width: CLUSTER_BADGE_WIDTH,
		height: BADGE_HEIGHT,
	}
}

/// Processor index badge, between the cluster badge and the title. Shows
/// the same id as the processor table's first column.
pub fn id_badge(core: &Rect) -> Rect {
	Rect {
		x: core.x + 2.0 * BADGE_INSET + CLUSTER_BADGE_WIDTH,
		y: core.y + BADGE_INSET,
		width: ID_BADGE_WIDTH,
		height: BADGE_HEIGHT,
	}
}

pub fn title_badge(core: &Rect) -> Rect {
	let x = id_badge(core).right() + BADGE_INSET;
	Rect {
		x,
		y: core.y + BADGE_INSET,
		width: (core.right() - MARKER_AREA - BADGE_INSET - x).max(0.0),
		height: BADGE_HEIGHT,
	}
}

/// Center of the `i`-th marker from the right of a core's header.
pub fn marker_center(core: &Rect, i: usize) -> Point {
	Point::new(
		core.right() - BADGE_INSET - MARKER_RADIUS - MARKER_SPACING * i as f64,
		core.y + CORE_HEADER / 2.0,
	)
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<NodeId>,
	pub start: Point,
	pub node_start: Point,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start: Point,
	pub transform_start: ViewTransform,
}

/// A pointer press that may still turn out to be a click.
#[derive(Clone, Debug, Default)]
pub struct PressState {
	pub target: Option<Hit>,
	pub start: Point,
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub target: Option<Hit>,
	/// Stage whose cores are highlighted; stage 0 never is
	pub stage: Option<u32>,
	/// Stage still fading out after the pointer left it
	pub fading: Option<u32>,
	pub highlight_t: f64,
}

impl HoverState {
	/// Stage drawn with the highlight, hovered or fading.
	pub fn lit_stage(&self) -> Option<u32> {
		self.stage.or(self.fading)
	}
}

pub struct PlanGraphState {
	pub loaded: Arc<LoadedPlan>,
	pub layout: Box<dyn LayoutEngine>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub press: Option<PressState>,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	min_zoom: f64,
	max_zoom: f64,
	fitted: bool,
}

impl PlanGraphState {
	pub fn new(loaded: Arc<LoadedPlan>, config: &ViewerConfig, width: f64, height: f64) -> Result<Self> {
		let layout = create_layout(&loaded.model, config, width, height)?;
		Ok(Self {
			loaded,
			layout,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			press: None,
			hover: HoverState::default(),
			width,
			height,
			min_zoom: config.min_zoom,
			max_zoom: config.max_zoom,
			fitted: false,
		})
	}

	pub fn hit(&self, screen: Point) -> Option<Hit> {
		let p = self.transform.to_layout(screen);
		let frame = self.layout.frame();
		let model = &self.loaded.model;

		// Nodes are drawn over edges, later nodes over earlier ones.
		for node in model.nodes.iter().rev() {
			let Some(r) = frame.node(node.id) else {
				continue;
			};
			if !r.contains(p) {
				continue;
			}
			if node.kind == NodeKind::Core {
				if cluster_badge(r).contains(p) {
					return Some(Hit::ClusterBadge(node.id));
				}
				if title_badge(r).contains(p) {
					return Some(Hit::TitleBadge(node.id));
				}
			}
			return Some(Hit::Node(node.id));
		}

		let tolerance = EDGE_HIT_WIDTH / 2.0 / self.transform.k;
		model
			.visible_links()
			.filter_map(|(i, _)| {
				let route = frame.routes.get(i)?.as_ref()?;
				Some((i, distance_to_polyline(p, &route.points)))
			})
			.filter(|(_, d)| *d <= tolerance)
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(i, _)| Hit::Edge(i))
	}

	/// Returns whether the hovered target changed.
	pub fn set_hover(&mut self, target: Option<Hit>) -> bool {
		if self.hover.target == target {
			return false;
		}
		self.hover.target = target;
		let stage = match target {
			Some(Hit::Node(id) | Hit::TitleBadge(id) | Hit::ClusterBadge(id)) => {
				let node = self.loaded.model.node(id);
				(node.kind == NodeKind::Core && node.stage != 0).then_some(node.stage)
			}
			_ => None,
		};
		if stage != self.hover.stage {
			if stage.is_some() {
				self.hover.fading = None;
				self.hover.highlight_t = 0.0;
			} else {
				self.hover.fading = self.hover.stage;
			}
			self.hover.stage = stage;
		}
		true
	}

	/// The selectable entity a click on `hit` toggles.
	pub fn selectable(&self, hit: Hit) -> Option<SelectableId> {
		let model = &self.loaded.model;
		match hit {
			Hit::ClusterBadge(id) => Some(SelectableId::Cluster(model.node(id).cluster)),
			Hit::TitleBadge(id) | Hit::Node(id) => {
				Some(SelectableId::Processor(model.node(id).processor))
			}
			Hit::Edge(i) => {
				let edge = &self.loaded.plan.edges[model.links.get(i)?.edge?];
				Some(SelectableId::Edge {
					source: edge.source_proc,
					dest: edge.dest_proc,
				})
			}
		}
	}

	/// Tooltip for a hover target at the given screen position.
	pub fn tooltip(&self, hit: Hit, at: Point) -> Option<TooltipContent> {
		let model = &self.loaded.model;
		let plan = &self.loaded.plan;
		let (title, lines) = match hit {
			Hit::TitleBadge(id) => {
				let node = model.node(id);
				(node.title.clone(), node.details.clone())
			}
			Hit::ClusterBadge(id) => {
				let cluster = model.node(id).cluster;
				let group = model.groups.get(cluster)?;
				let processors = model.cores.iter().filter(|c| model.node(**c).cluster == cluster).count();
				(group.label.clone(), vec![format!("processors: {processors}")])
			}
			Hit::Node(id) => {
				let node = model.node(id);
				if node.kind == NodeKind::Core {
					return None;
				}
				(node.title.clone(), node.details.clone())
			}
			Hit::Edge(i) => {
				let link = model.links.get(i)?;
				let edge = &plan.edges[link.edge?];
				let stats = link.stats.clone()?;
				(format!("{} → {}", edge.source_proc, edge.dest_proc), stats)
			}
		};
		Some(TooltipContent {
			x: at.x,
			y: at.y,
			title,
			lines,
		})
	}

	pub fn pointer_down(&mut self, at: Point) {
		let target = self.hit(at);
		self.press = Some(PressState {
			target,
			start: at,
			moved: false,
		});

		let draggable = match target {
			Some(Hit::Node(id) | Hit::TitleBadge(id) | Hit::ClusterBadge(id))
				if self.layout.kind() == LayoutKind::Constraint =>
			{
				self.layout.frame().node(id).map(|r| (id, r.center()))
			}
			_ => None,
		};
		if let Some((id, center)) = draggable {
			self.drag = DragState {
				active: true,
				node: Some(id),
				start: at,
				node_start: center,
			};
		} else {
			self.pan = PanState {
				active: true,
				start: at,
				transform_start: self.transform,
			};
		}
	}

	/// Returns whether the hover target changed.
	pub fn pointer_move(&mut self, at: Point) -> bool {
		if let Some(press) = &mut self.press {
			press.moved |= press.start.distance(at) > CLICK_TOLERANCE;
		}
		let moved = self.press.as_ref().is_some_and(|p| p.moved);

		if self.drag.active {
			if let (Some(id), true) = (self.drag.node, moved) {
				let k = self.transform.k;
				let to = Point::new(
					self.drag.node_start.x + (at.x - self.drag.start.x) / k,
					self.drag.node_start.y + (at.y - self.drag.start.y) / k,
				);
				self.layout.drag_node(id, to);
			}
			false
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start.x + (at.x - self.pan.start.x);
			self.transform.y = self.pan.transform_start.y + (at.y - self.pan.start.y);
			false
		} else {
			let hit = self.hit(at);
			self.set_hover(hit)
		}
	}

	/// Ends a press; a press that did not move selects what it started on.
	pub fn pointer_up(&mut self) -> Option<SelectableId> {
		let press = self.press.take();
		self.drag = DragState::default();
		self.pan.active = false;
		match press {
			Some(PressState {
				target: Some(hit),
				moved: false,
				..
			}) => self.selectable(hit),
			_ => None,
		}
	}

	pub fn pointer_leave(&mut self) {
		self.press = None;
		self.drag = DragState::default();
		self.pan.active = false;
		self.set_hover(None);
	}

	/// Wheel zoom around the pointer.
	pub fn zoom(&mut self, at: Point, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.transform.zoom_at(at, factor, self.min_zoom, self.max_zoom);
	}

	pub fn tick(&mut self, dt: f64) {
		self.layout.tick();
		if !self.fitted {
			if let Some(fit) = self.layout.frame().initial_transform {
				self.transform = fit;
				self.fitted = true;
			}
		}

		let (target, speed) = if self.hover.stage.is_some() {
			(1.0, 1.8)
		} else {
			(0.0, 1.26)
		};
		self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
		if self.hover.stage.is_none() && self.hover.highlight_t < 0.01 {
			self.hover.highlight_t = 0.0;
			self.hover.fading = None;
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::LayoutKind;
	use crate::plan::tests::sample_plan;
	use crate::session::Session;

	fn state() -> PlanGraphState {
		let config = ViewerConfig {
			layout: LayoutKind::Layered,
			..ViewerConfig::default()
		};
		let mut session = Session::new(config.max_detail_rows);
		session.load(sample_plan()).unwrap();
		let loaded = session.loaded().unwrap().clone();
		let mut state = PlanGraphState::new(loaded, &config, 1000.0, 800.0).unwrap();
		state.tick(0.016);
		state
	}

	fn screen_of(state: &PlanGraphState, p: Point) -> Point {
		state.transform.to_screen(p)
	}

	fn core_rect(state: &PlanGraphState, processor: usize) -> Rect {
		let core = state.loaded.model.cores[processor];
		*state.layout.frame().node(core).unwrap()
	}

	/// Halfway along a straight route.
	fn route_midpoint(state: &PlanGraphState, link: usize) -> Point {
		let route = state.layout.frame().routes[link].as_ref().unwrap();
		let (a, b) = (route.points[0], route.tip().unwrap());
		Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
	}

	#[test]
	fn first_tick_applies_the_fit() {
		let state = state();
		assert_eq!(Some(state.transform), state.layout.frame().initial_transform);
	}

	#[test]
	fn hits_badges_nodes_and_edges() {
		let state = state();
		let core = state.loaded.model.cores[0];
		let r = core_rect(&state, 0);

		let badge = screen_of(&state, cluster_badge(&r).center());
		assert_eq!(state.hit(badge), Some(Hit::ClusterBadge(core)));
		let title = screen_of(&state, title_badge(&r).center());
		assert_eq!(state.hit(title), Some(Hit::TitleBadge(core)));
		let body = screen_of(&state, Point::new(r.center().x, r.bottom() - 2.0));
		assert_eq!(state.hit(body), Some(Hit::Node(core)));

		let mid = screen_of(&state, route_midpoint(&state, 2));
		assert_eq!(state.hit(mid), Some(Hit::Edge(2)));

		assert_eq!(state.hit(Point::new(-5000.0, -5000.0)), None);
	}

	#[test]
	fn clicks_select_what_they_hit() {
		let mut state = state();
		let r = core_rect(&state, 2);

		let at = screen_of(&state, Point::new(r.center().x, r.bottom() - 2.0));
		state.pointer_down(at);
		assert_eq!(state.pointer_up(), Some(SelectableId::Processor(2)));

		let at = screen_of(&state, cluster_badge(&r).center());
		state.pointer_down(at);
		assert_eq!(state.pointer_up(), Some(SelectableId::Cluster(0)));

		let at = screen_of(&state, route_midpoint(&state, 0));
		state.pointer_down(at);
		assert_eq!(state.pointer_up(), Some(SelectableId::Edge { source: 0, dest: 2 }));
	}

	#[test]
	fn dragging_pans_instead_of_clicking() {
		let mut state = state();
		let before = state.transform;
		state.pointer_down(Point::new(-5000.0, -5000.0));
		state.pointer_move(Point::new(-4950.0, -4980.0));
		assert_eq!(state.pointer_up(), None);
		assert_eq!(state.transform.x, before.x + 50.0);
		assert_eq!(state.transform.y, before.y + 20.0);
	}

	#[test]
	fn hovering_a_core_highlights_its_stage() {
		let mut state = state();
		let r = core_rect(&state, 1);
		let at = screen_of(&state, Point::new(r.center().x, r.bottom() - 2.0));
		assert!(state.pointer_move(at));
		assert_eq!(state.hover.stage, Some(1));
		state.tick(0.016);
		assert!(state.hover.highlight_t > 0.0);

		// The response processor is stage 0.
		let r = core_rect(&state, 3);
		let at = screen_of(&state, Point::new(r.center().x, r.bottom() - 2.0));
		state.pointer_move(at);
		assert_eq!(state.hover.stage, None);
	}

	#[test]
	fn id_badge_sits_between_cluster_and_title() {
		let state = state();
		let r = core_rect(&state, 2);
		let (cluster, id, title) = (cluster_badge(&r), id_badge(&r), title_badge(&r));
		assert!(cluster.right() <= id.x && id.right() <= title.x);
		assert!(id.y >= r.y && id.bottom() <= r.y + CORE_HEADER);

		// Clicking the id selects its processor.
		let at = screen_of(&state, id.center());
		assert_eq!(state.hit(at), Some(Hit::Node(state.loaded.model.cores[2])));
		assert_eq!(
			state.selectable(Hit::Node(state.loaded.model.cores[2])),
			Some(SelectableId::Processor(2))
		);
	}

	#[test]
	fn highlight_fades_after_the_pointer_leaves() {
		let mut state = state();
		let core = state.loaded.model.cores[0];
		state.set_hover(Some(Hit::Node(core)));
		for _ in 0..30 {
			state.tick(0.016);
		}
		let lit = state.hover.highlight_t;
		assert!(lit > 0.0);

		state.set_hover(None);
		assert_eq!(state.hover.stage, None);
		assert_eq!(state.hover.lit_stage(), Some(1));
		state.tick(0.016);
		assert!(state.hover.highlight_t > 0.0 && state.hover.highlight_t < lit);

		for _ in 0..1000 {
			state.tick(0.016);
		}
		assert_eq!(state.hover.highlight_t, 0.0);
		assert_eq!(state.hover.lit_stage(), None);
	}

	#[test]
	fn tooltips_show_details_and_stats() {
		let state = state();
		let at = Point::new(1.0, 2.0);
		let core = state.loaded.model.cores[0];

		let tip = state.tooltip(Hit::TitleBadge(core), at).unwrap();
		assert_eq!(tip.title, "TableReader/0");
		assert_eq!(tip.lines.len(), 3);

		let tip = state.tooltip(Hit::Edge(0), at).unwrap();
		assert_eq!(tip.lines[0], "network latency: 120µs");
		assert_eq!(tip.x, 1.0);
		// No stats were captured for the second edge.
		assert_eq!(state.tooltip(Hit::Edge(1), at), None);

		let tip = state.tooltip(Hit::ClusterBadge(core), at).unwrap();
		assert_eq!(tip.title, "Node 1");
		assert_eq!(tip.lines, ["processors: 3"]);
	}

	#[test]
	fn zoom_is_clamped() {
		let mut state = state();
		for _ in 0..200 {
			state.zoom(Point::new(500.0, 400.0), -1.0);
		}
		assert_eq!(state.transform.k, ViewerConfig::default().max_zoom);
		for _ in 0..200 {
			state.zoom(Point::new(500.0, 400.0), 1.0);
		}
		assert_eq!(state.transform.k, ViewerConfig::default().min_zoom);
	}
}
