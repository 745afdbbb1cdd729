use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::info;

use super::geometry::{Point, Rect, bounding, edge_between};
use super::{EdgeRoute, LayoutEngine, LayoutFrame, LayoutKind, Viewport};
use crate::model::{AlignmentConstraint, Axis, GraphModel, NodeId, NodeKind};

/// Simulation step per animation frame, in seconds.
const DT: f32 = 0.016;
/// Minimum vertical distance from a link's source to its target.
const FLOW_GAP: f64 = 80.0;
/// Clearance kept around every node box.
const NODE_MARGIN: f64 = 10.0;
/// Fraction of the distance to the group centroid covered per tick.
const GROUP_PULL: f64 = 0.02;
/// Frame on which the initial pan/zoom is derived.
const FIT_TICK: u32 = 2;
const FIT_SHRINK: f64 = 0.95;
/// Small diagrams are not blown up past this scale.
const FIT_MAX_SCALE: f64 = 0.7;
const SETTLE_DISTANCE: f64 = 0.05;
const SETTLE_TICKS: u32 = 10;
const MAX_TICKS: u32 = 600;

const RANK_SPACING: f64 = 220.0;
const COLUMN_SPACING: f64 = 260.0;

struct Link {
	source: NodeId,
	target: NodeId,
	visible: bool,
}

struct GroupLeaves {
	cluster: usize,
	leaves: Vec<NodeId>,
	padding: f64,
}

/// Force-directed layout with alignment, flow and grouping constraints
/// projected after every simulation step.
pub struct ConstraintLayout {
	graph: ForceGraph<NodeId, ()>,
	handles: Vec<DefaultNodeIdx>,
	sizes: Vec<(f64, f64)>,
	/// Owning processor of each node
	processors: Vec<usize>,
	/// Nodes of each processor; they move as one block
	members: Vec<Vec<usize>>,
	/// Processors in topological order along visible links
	flow_order: Vec<usize>,
	links: Vec<Link>,
	groups: Vec<GroupLeaves>,
	cluster_count: usize,
	constraints: Vec<AlignmentConstraint>,
	anchored: Vec<bool>,
	positions: Vec<Point>,
	viewport: Viewport,
	frame: LayoutFrame,
	settled_ticks: u32,
	converged: bool,
}

impl ConstraintLayout {
	pub fn new(model: &GraphModel, viewport: Viewport) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 250.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});

		let positions = initial_positions(model);
		let handles = model
			.nodes
			.iter()
			.map(|node| {
				let p = positions[node.id.0];
				graph.add_node(NodeData {
					x: p.x as f32,
					y: p.y as f32,
					mass: if node.kind == NodeKind::Core { 10.0 } else { 5.0 },
					is_anchor: false,
					user_data: node.id,
				})
			})
			.collect::<Vec<_>>();
		for link in &model.links {
			graph.add_edge(
				handles[link.source.0],
				handles[link.target.0],
				EdgeData::default(),
			);
		}

		let mut members = vec![Vec::new(); model.cores.len()];
		for node in &model.nodes {
			members[node.processor].push(node.id.0);
		}

		let mut layout = ConstraintLayout {
			graph,
			handles,
			members,
			flow_order: flow_order(model),
			sizes: model
				.nodes
				.iter()
				.map(|n| (n.geometry.width, n.geometry.height))
				.collect(),
			processors: model.nodes.iter().map(|n| n.processor).collect(),
			links: model
				.links
				.iter()
				.map(|l| Link {
					source: l.source,
					target: l.target,
					visible: l.visible,
				})
				.collect(),
			groups: model
				.groups
				.iter()
				.map(|g| GroupLeaves {
					cluster: g.cluster,
					leaves: g.leaves.clone(),
					padding: g.padding,
				})
				.collect(),
			cluster_count: model.groups.len(),
			constraints: model.constraints.clone(),
			anchored: vec![false; model.nodes.len()],
			positions,
			viewport,
			frame: LayoutFrame::default(),
			settled_ticks: 0,
			converged: model.nodes.is_empty(),
		};
		layout.project();
		layout.write_positions();
		layout.rebuild_frame();
		layout
	}

	fn read_positions(&mut self) {
		let positions = &mut self.positions;
		self.graph.visit_nodes(|node| {
			positions[node.data.user_data.0] = Point::new(node.x() as f64, node.y() as f64);
		});
	}

	fn write_positions(&mut self) {
		let positions = &self.positions;
		self.graph.visit_nodes_mut(|node| {
			let p = positions[node.data.user_data.0];
			node.data.x = p.x as f32;
			node.data.y = p.y as f32;
		});
	}

	/// Moves nodes so the layout constraints hold. Group pull only nudges;
	/// alignment, flow and overlap removal are exact and run in that order.
	/// The last two move whole processors, so alignment survives them and
	/// the horizontal spread cannot undo the flow.
	fn project(&mut self) {
		self.pull_groups();
		self.align();
		self.settle_flow();
		self.spread_blocks();
	}

	fn pull_groups(&mut self) {
		for group in &self.groups {
			if group.leaves.is_empty() {
				continue;
			}
			let n = group.leaves.len() as f64;
			let (sx, sy) = group.leaves.iter().fold((0.0, 0.0), |(x, y), id| {
				(x + self.positions[id.0].x, y + self.positions[id.0].y)
			});
			let centroid = Point::new(sx / n, sy / n);
			for id in &group.leaves {
				if self.anchored[id.0] {
					continue;
				}
				let p = &mut self.positions[id.0];
				p.x += (centroid.x - p.x) * GROUP_PULL;
				p.y += (centroid.y - p.y) * GROUP_PULL;
			}
		}
	}

	/// Pushes processors down, sources first, until every visible link
	/// drops by at least `FLOW_GAP`. Pinned processors stay put.
	fn settle_flow(&mut self) {
		for k in 0..self.flow_order.len() {
			let p = self.flow_order[k];
			if self.block_anchored(p) {
				continue;
			}
			let push = self
				.links
				.iter()
				.filter(|l| {
					l.visible
						&& self.processors[l.target.0] == p
						&& self.processors[l.source.0] != p
				})
				.map(|l| self.positions[l.source.0].y + FLOW_GAP - self.positions[l.target.0].y)
				.fold(0.0, f64::max);
			if push > 0.0 {
				self.shift_block(p, 0.0, push);
			}
		}
	}

	/// Slides processors right until no two of them overlap. Pinned
	/// processors are placed first and never move.
	fn spread_blocks(&mut self) {
		let mut order: Vec<(bool, f64, usize)> = (0..self.members.len())
			.filter_map(|p| {
				let bounds = self.block_bounds(p)?;
				Some((!self.block_anchored(p), bounds.center().x, p))
			})
			.collect();
		order.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));

		let mut placed: Vec<Rect> = Vec::with_capacity(order.len());
		for (movable, _, p) in order {
			let Some(mut rect) = self.block_bounds(p) else {
				continue;
			};
			if movable {
				let start = rect.x;
				while let Some(right) = placed
					.iter()
					.filter(|r| r.overlap(&rect).is_some())
					.map(Rect::right)
					.reduce(f64::max)
				{
					rect.x = right;
				}
				self.shift_block(p, rect.x - start, 0.0);
			}
			placed.push(rect);
		}
	}

	fn block_anchored(&self, p: usize) -> bool {
		self.members[p].iter().any(|&i| self.anchored[i])
	}

	fn block_bounds(&self, p: usize) -> Option<Rect> {
		bounding(self.members[p].iter().map(|&i| self.bounds(i)))
	}

	fn shift_block(&mut self, p: usize, dx: f64, dy: f64) {
		for &i in &self.members[p] {
			self.positions[i].x += dx;
			self.positions[i].y += dy;
		}
	}

	fn align(&mut self) {
		for c in &self.constraints {
			let coord = |p: &Point| match c.axis {
				Axis::X => p.x,
				Axis::Y => p.y,
			};
			let pinned = c.offsets.iter().find(|(id, _)| self.anchored[id.0]);
			let base = match pinned {
				Some((id, offset)) => coord(&self.positions[id.0]) - offset,
				None => {
					let sum: f64 = c
						.offsets
						.iter()
						.map(|(id, offset)| coord(&self.positions[id.0]) - offset)
						.sum();
					sum / c.offsets.len() as f64
				}
			};
			for (id, offset) in &c.offsets {
				if self.anchored[id.0] {
					continue;
				}
				let p = &mut self.positions[id.0];
				match c.axis {
					Axis::X => p.x = base + offset,
					Axis::Y => p.y = base + offset,
				}
			}
		}
	}

	fn bounds(&self, i: usize) -> Rect {
		let (w, h) = self.sizes[i];
		Rect::centered(self.positions[i], w, h).inflate(NODE_MARGIN)
	}

	fn rebuild_frame(&mut self) {
		let nodes: Vec<Option<Rect>> = (0..self.positions.len())
			.map(|i| {
				let (w, h) = self.sizes[i];
				Some(Rect::centered(self.positions[i], w, h))
			})
			.collect();

		let mut groups = vec![None; self.cluster_count];
		for g in &self.groups {
			groups[g.cluster] = bounding(g.leaves.iter().filter_map(|id| nodes[id.0]))
				.map(|r| r.inflate(NODE_MARGIN + g.padding));
		}

		let routes = self
			.links
			.iter()
			.map(|l| {
				if !l.visible {
					return None;
				}
				let (from, to) = edge_between(&nodes[l.source.0]?, &nodes[l.target.0]?);
				Some(EdgeRoute {
					points: vec![from, to],
				})
			})
			.collect();

		let extent = bounding(groups.iter().flatten().copied())
			.or_else(|| bounding(nodes.iter().flatten().copied()));

		let initial_transform = match (self.frame.initial_transform, extent) {
			(None, Some(extent)) if self.frame.tick >= FIT_TICK => {
				Some(self.viewport.fit(extent, FIT_SHRINK, FIT_MAX_SCALE))
			}
			(t, _) => t,
		};

		self.frame = LayoutFrame {
			tick: self.frame.tick,
			nodes,
			groups,
			routes,
			extent,
			initial_transform,
		};
	}
}

impl LayoutEngine for ConstraintLayout {
	fn tick(&mut self) {
		if self.converged {
			return;
		}
		let before = self.positions.clone();

		self.graph.update(DT);
		self.read_positions();
		self.project();
		self.write_positions();

		self.frame.tick += 1;
		self.rebuild_frame();

		let moved = before
			.iter()
			.zip(&self.positions)
			.map(|(a, b)| a.distance(*b))
			.fold(0.0, f64::max);
		if moved < SETTLE_DISTANCE {
			self.settled_ticks += 1;
		} else {
			self.settled_ticks = 0;
		}
		if (self.settled_ticks >= SETTLE_TICKS && self.frame.tick >= FIT_TICK)
			|| self.frame.tick >= MAX_TICKS
		{
			self.converged = true;
			info!("constraint layout settled after {} ticks", self.frame.tick);
		}
	}

	fn is_converged(&self) -> bool {
		self.converged
	}

	fn frame(&self) -> &LayoutFrame {
		&self.frame
	}

	fn drag_node(&mut self, id: NodeId, to: Point) {
		let Some(&handle) = self.handles.get(id.0) else {
			return;
		};
		self.positions[id.0] = to;
		self.anchored[id.0] = true;
		self.graph.visit_nodes_mut(|node| {
			if node.index() == handle {
				node.data.x = to.x as f32;
				node.data.y = to.y as f32;
				node.data.is_anchor = true;
			}
		});
		// Let the rest of the diagram settle around the pinned node.
		self.converged = false;
		self.settled_ticks = 0;
		self.project();
		self.write_positions();
		self.rebuild_frame();
	}

	fn kind(&self) -> LayoutKind {
		LayoutKind::Constraint
	}
}

/// Kahn order over processors along visible links. Processors caught in
/// a cycle follow in index order.
fn flow_order(model: &GraphModel) -> Vec<usize> {
	let processors = model.cores.len();
	let mut outgoing = vec![Vec::new(); processors];
	let mut indegree = vec![0usize; processors];
	for (_, l) in model.visible_links() {
		let (s, t) = (model.node(l.source).processor, model.node(l.target).processor);
		if s != t {
			outgoing[s].push(t);
			indegree[t] += 1;
		}
	}

	let mut order: Vec<usize> = (0..processors).filter(|&p| indegree[p] == 0).collect();
	let mut next = 0;
	while next < order.len() {
		let p = order[next];
		next += 1;
		for &t in &outgoing[p] {
			indegree[t] -= 1;
			if indegree[t] == 0 {
				order.push(t);
			}
		}
	}
	let mut seen = vec![false; processors];
	for &p in &order {
		seen[p] = true;
	}
	order.extend((0..processors).filter(|&p| !seen[p]));
	order
}

/// Deterministic starting point: processors ranked by longest path along
/// visible links, spread into columns within a rank, slots at their
/// alignment offsets.
fn initial_positions(model: &GraphModel) -> Vec<Point> {
	let processors = model.cores.len();
	let mut rank = vec![0usize; processors];
	let edges: Vec<(usize, usize)> = model
		.visible_links()
		.map(|(_, l)| (model.node(l.source).processor, model.node(l.target).processor))
		.filter(|(s, t)| s != t)
		.collect();
	// Bounded relaxation; cycles simply stop deepening.
	for _ in 0..processors {
		let mut changed = false;
		for &(s, t) in &edges {
			if rank[t] < rank[s] + 1 && rank[s] + 1 < processors {
				rank[t] = rank[s] + 1;
				changed = true;
			}
		}
		if !changed {
			break;
		}
	}

	let mut column = vec![0usize; processors];
	let mut next_in_rank = vec![0usize; processors.max(1)];
	for p in 0..processors {
		column[p] = next_in_rank[rank[p]];
		next_in_rank[rank[p]] += 1;
	}

	let mut positions = vec![Point::default(); model.nodes.len()];
	for (p, &core) in model.cores.iter().enumerate() {
		let cluster = model.node(core).cluster as f64;
		positions[core.0] = Point::new(
			(column[p] as f64 + cluster * 0.5) * COLUMN_SPACING,
			rank[p] as f64 * RANK_SPACING,
		);
	}
	for c in &model.constraints {
		let Some(&(core, _)) = c.offsets.first() else {
			continue;
		};
		let base = positions[core.0];
		for &(id, offset) in &c.offsets[1..] {
			match c.axis {
				Axis::X => positions[id.0].x = base.x + offset,
				Axis::Y => positions[id.0].y = base.y + offset,
			}
		}
	}
	positions
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Margin;
	use crate::model::build_graph;
	use crate::plan::tests::sample_plan;
	use crate::plan::{Core, Edge, Plan, Processor, Router, Synchronizer};

	fn viewport() -> Viewport {
		Viewport {
			width: 1200.0,
			height: 800.0,
			margin: Margin::uniform(20.0),
		}
	}

	fn settled(model: &GraphModel) -> ConstraintLayout {
		let mut layout = ConstraintLayout::new(model, viewport());
		while !layout.is_converged() {
			layout.tick();
		}
		layout
	}

	fn assert_aligned(layout: &ConstraintLayout, model: &GraphModel) {
		for c in &model.constraints {
			let (core, _) = c.offsets[0];
			let base = layout.frame().node(core).unwrap().center();
			for &(id, offset) in &c.offsets[1..] {
				let p = layout.frame().node(id).unwrap().center();
				let delta = match c.axis {
					Axis::X => p.x - base.x,
					Axis::Y => p.y - base.y,
				};
				assert!((delta - offset).abs() < 1e-6, "{:?} off by {}", id, delta - offset);
			}
		}
	}

	/// `n` processors chained router to synchronizer, with a skip edge every
	/// third step, spread round-robin over `clusters` nodes.
	fn chained_plan(n: usize, clusters: usize) -> Plan {
		let slot = |title: &str| (title.to_string(), vec!["rows: 10".to_string()]);
		let processors = (0..n)
			.map(|i| Processor {
				node_idx: i % clusters,
				stage: i as u32 + 1,
				core: Core {
					title: format!("Op/{i}"),
					details: vec!["execution time: 1ms".into(), "rows output: 10".into()],
				},
				inputs: (i > 0)
					.then(|| {
						let (title, details) = slot("unordered");
						Synchronizer { title, details }
					})
					.into_iter()
					.collect(),
				outputs: (i + 1 < n)
					.then(|| {
						let (title, details) = slot("by hash");
						Router { title, details }
					})
					.into_iter()
					.collect(),
			})
			.collect();
		let chain = (0..n.saturating_sub(1)).map(|i| (i, i + 1));
		let skips = (0..n.saturating_sub(2)).step_by(3).map(|i| (i, i + 2));
		let edges = chain
			.chain(skips)
			.map(|(s, d)| Edge {
				source_proc: s,
				source_output: 1,
				dest_proc: d,
				dest_input: 1,
				stats: None,
			})
			.collect();
		Plan {
			processors,
			edges,
			node_names: (1..=clusters).map(|c| c.to_string()).collect(),
			sql: String::new(),
		}
	}

	#[test]
	fn chained_plan_is_valid() {
		let plan = chained_plan(30, 5);
		assert!(plan.validate().is_ok());
		assert_eq!(plan.edges.len(), 29 + 10);
	}

	#[test]
	fn settled_links_point_down() {
		let model = build_graph(&chained_plan(30, 5)).unwrap();
		let layout = settled(&model);
		let frame = layout.frame();
		for (_, link) in model.visible_links() {
			let src = frame.node(link.source).unwrap().center();
			let dst = frame.node(link.target).unwrap().center();
			assert!(
				dst.y - src.y >= FLOW_GAP - 1e-6,
				"{} -> {} drops only {}",
				link.source,
				link.target,
				dst.y - src.y
			);
		}
		assert_aligned(&layout, &model);
	}

	#[test]
	fn processors_do_not_overlap() {
		let model = build_graph(&chained_plan(30, 5)).unwrap();
		for layout in [ConstraintLayout::new(&model, viewport()), settled(&model)] {
			let frame = layout.frame();
			for a in &model.nodes {
				for b in &model.nodes {
					if a.processor >= b.processor {
						continue;
					}
					let (ra, rb) = (frame.node(a.id).unwrap(), frame.node(b.id).unwrap());
					assert!(ra.overlap(rb).is_none(), "{} overlaps {}", a.key, b.key);
				}
			}
		}
	}

	#[test]
	fn every_node_is_placed_and_aligned() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = ConstraintLayout::new(&model, viewport());
		assert_eq!(layout.frame().nodes.len(), model.nodes.len());
		assert!(layout.frame().nodes.iter().all(Option::is_some));
		assert_aligned(&layout, &model);
	}

	#[test]
	fn converges_and_stays_aligned() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = settled(&model);
		assert!(layout.frame().tick >= FIT_TICK);
		assert!(layout.frame().tick <= MAX_TICKS);
		assert_aligned(&layout, &model);
	}

	#[test]
	fn fit_is_derived_on_the_second_tick() {
		let model = build_graph(&sample_plan()).unwrap();
		let mut layout = ConstraintLayout::new(&model, viewport());
		assert!(layout.frame().initial_transform.is_none());
		layout.tick();
		assert!(layout.frame().initial_transform.is_none());
		layout.tick();
		let fit = layout.frame().initial_transform.unwrap();
		assert!(fit.k > 0.0 && fit.k <= FIT_MAX_SCALE);

		// Later ticks keep the first fit.
		layout.tick();
		assert_eq!(layout.frame().initial_transform, Some(fit));
	}

	#[test]
	fn only_visible_links_are_routed() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = settled(&model);
		let frame = layout.frame();
		for (i, link) in model.links.iter().enumerate() {
			assert_eq!(frame.routes[i].is_some(), link.visible);
		}

		// Routes start and end on their nodes.
		let link = &model.links[0];
		let route = frame.routes[0].as_ref().unwrap();
		let src = frame.node(link.source).unwrap();
		let dst = frame.node(link.target).unwrap();
		assert!(src.inflate(1e-6).contains(route.points[0]));
		assert!(dst.inflate(1e-6).contains(route.tip().unwrap()));
	}

	#[test]
	fn groups_enclose_their_leaves() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = settled(&model);
		let frame = layout.frame();
		for g in &model.groups {
			let bounds = frame.groups[g.cluster].unwrap();
			for leaf in &g.leaves {
				let r = frame.node(*leaf).unwrap();
				assert!(bounds.contains(Point::new(r.x, r.y)));
				assert!(bounds.contains(Point::new(r.right(), r.bottom())));
			}
		}
	}

	#[test]
	fn dragged_nodes_stay_pinned() {
		let model = build_graph(&sample_plan()).unwrap();
		let mut layout = settled(&model);
		let core = model.cores[3];
		let to = Point::new(-500.0, 900.0);
		layout.drag_node(core, to);
		assert!(!layout.is_converged());
		for _ in 0..20 {
			layout.tick();
		}
		let center = layout.frame().node(core).unwrap().center();
		assert!(center.distance(to) < 1e-3);
		assert_aligned(&layout, &model);
	}
}
