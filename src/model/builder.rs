use log::debug;

use super::GraphModel;
use super::types::{
	AlignmentConstraint, Axis, GraphLink, GraphNode, Group, NodeGeometry, NodeId, NodeKind,
};
use crate::error::Result;
use crate::plan::{InputOrdering, MetricMap, Plan};

pub const DEFAULT_DETAIL_ROWS: usize = 10;

/// Horizontal distance between neighbouring synchronizers or routers.
const H_SPACING: f64 = 80.0;
/// Base vertical distance between a core and its synchronizers/routers.
const V_SPACING: f64 = 28.0;
/// Extra vertical distance per displayed detail row.
const V_SPACING_PER_ROW: f64 = 10.0;
const MAX_LINK_WIDTH: f64 = 3.0;
const MIN_LINK_WIDTH: f64 = 1.0;
const GROUP_PADDING: f64 = 15.0;

const CORE_WIDTH: f64 = 150.0;
pub(crate) const CORE_HEADER: f64 = 24.0;
pub(crate) const DETAIL_ROW_HEIGHT: f64 = 10.0;
const SLOT_GEOMETRY: NodeGeometry = NodeGeometry {
	width: 70.0,
	height: 28.0,
	corner_radius: 14.0,
};

/// Builds the graph model with the default number of detail rows per core.
pub fn build_graph(plan: &Plan) -> Result<GraphModel> {
	build_graph_with(plan, DEFAULT_DETAIL_ROWS)
}

/// Builds the graph model. Fails on any out-of-range index instead of
/// dropping the offending edge.
pub fn build_graph_with(plan: &Plan, max_detail_rows: usize) -> Result<GraphModel> {
	plan.validate()?;

	let mut model = GraphModel::default();
	// Node ids of each processor's inputs and outputs.
	let mut inputs: Vec<Vec<NodeId>> = Vec::with_capacity(plan.processors.len());
	let mut outputs: Vec<Vec<NodeId>> = Vec::with_capacity(plan.processors.len());

	for (pi, p) in plan.processors.iter().enumerate() {
		let rows = p.core.details.len().min(max_detail_rows);
		let core = push_node(&mut model, GraphNode {
			id: NodeId(0),
			key: format!("core-{pi}"),
			kind: NodeKind::Core,
			processor: pi,
			slot: None,
			cluster: p.node_idx,
			stage: p.stage,
			title: p.core.title.clone(),
			details: p.core.details.clone(),
			metrics: MetricMap::parse(&p.core.details),
			geometry: NodeGeometry {
				width: CORE_WIDTH,
				height: CORE_HEADER + DETAIL_ROW_HEIGHT * rows as f64,
				corner_radius: 5.0,
			},
		});
		model.cores.push(core);

		let slots = |kind: NodeKind, prefix: &str, title: &str, details: &[String], j: usize| {
			GraphNode {
				id: NodeId(0),
				key: format!("{prefix}-{pi}-{j}"),
				kind,
				processor: pi,
				slot: Some(j),
				cluster: p.node_idx,
				stage: p.stage,
				title: title.to_string(),
				details: details.to_vec(),
				metrics: MetricMap::parse(details),
				geometry: SLOT_GEOMETRY,
			}
		};
		inputs.push(
			p.inputs
				.iter()
				.enumerate()
				.map(|(j, s)| {
					let node = slots(NodeKind::Synchronizer, "sync", &s.title, &s.details, j);
					push_node(&mut model, node)
				})
				.collect(),
		);
		outputs.push(
			p.outputs
				.iter()
				.enumerate()
				.map(|(j, r)| {
					let node = slots(NodeKind::Router, "router", &r.title, &r.details, j);
					push_node(&mut model, node)
				})
				.collect(),
		);
	}

	for (ei, e) in plan.edges.iter().enumerate() {
		let src = &plan.processors[e.source_proc];
		let dst = &plan.processors[e.dest_proc];

		let mut siblings = 1;
		let source = if e.source_output > 0 {
			if src.outputs[e.source_output - 1].is_partitioning() {
				siblings += plan
					.edges
					.iter()
					.enumerate()
					.filter(|(j, o)| {
						*j != ei
							&& o.source_proc == e.source_proc
							&& o.source_output == e.source_output
					})
					.count();
			}
			outputs[e.source_proc][e.source_output - 1]
		} else {
			model.cores[e.source_proc]
		};

		let (target, dashed) = if e.dest_input > 0 {
			let sync = &dst.inputs[e.dest_input - 1];
			(
				inputs[e.dest_proc][e.dest_input - 1],
				sync.ordering() == Some(InputOrdering::Unordered),
			)
		} else {
			(model.cores[e.dest_proc], false)
		};

		model.links.push(GraphLink {
			source,
			target,
			visible: true,
			width: link_width(siblings),
			edge: Some(ei),
			stats: e.stats.clone(),
			dashed,
		});
	}

	model.groups = plan
		.node_names
		.iter()
		.enumerate()
		.map(|(cluster, name)| Group {
			cluster,
			label: format!("Node {name}"),
			leaves: Vec::new(),
			padding: GROUP_PADDING,
		})
		.collect();
	for (pi, p) in plan.processors.iter().enumerate() {
		let leaves = &mut model.groups[p.node_idx].leaves;
		leaves.push(model.cores[pi]);
		leaves.extend(&inputs[pi]);
		leaves.extend(&outputs[pi]);
	}

	for (pi, p) in plan.processors.iter().enumerate() {
		if p.inputs.is_empty() && p.outputs.is_empty() {
			continue;
		}
		let core = model.cores[pi];
		let rows = p.core.details.len().min(max_detail_rows);
		let v_spacing = V_SPACING + V_SPACING_PER_ROW * rows as f64;

		let mut x = AlignmentConstraint {
			axis: Axis::X,
			offsets: vec![(core, 0.0)],
		};
		let mut y = AlignmentConstraint {
			axis: Axis::Y,
			offsets: vec![(core, 0.0)],
		};
		for (slots, dy) in [(&inputs[pi], -v_spacing), (&outputs[pi], v_spacing)] {
			for (j, &n) in slots.iter().enumerate() {
				x.offsets.push((n, spread_offset(j, slots.len())));
				y.offsets.push((n, dy));
				let (source, target) = if dy < 0.0 { (n, core) } else { (core, n) };
				model.links.push(GraphLink {
					source,
					target,
					visible: false,
					width: 0.0,
					edge: None,
					stats: None,
					dashed: false,
				});
			}
		}
		model.constraints.push(x);
		model.constraints.push(y);
	}

	debug!(
		"built graph model: {} nodes, {} links, {} groups, {} constraints",
		model.nodes.len(),
		model.links.len(),
		model.groups.len(),
		model.constraints.len()
	);
	Ok(model)
}

fn push_node(model: &mut GraphModel, mut node: GraphNode) -> NodeId {
	let id = NodeId(model.nodes.len());
	node.id = id;
	model.nodes.push(node);
	id
}

/// Line width for an edge sharing its router with `siblings - 1` others.
pub fn link_width(siblings: usize) -> f64 {
	(MAX_LINK_WIDTH / siblings.max(1) as f64).max(MIN_LINK_WIDTH)
}

/// Horizontal offset of slot `j` out of `n`, symmetric about the core.
fn spread_offset(j: usize, n: usize) -> f64 {
	H_SPACING * (2.0 * j as f64 + 1.0 - n as f64)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::ViewerError;
	use crate::plan::tests::sample_plan;
	use crate::plan::{Core, Edge, Processor, Router};

	#[test]
	fn one_node_per_core_input_and_output() {
		let plan = sample_plan();
		let model = build_graph(&plan).unwrap();
		let expected: usize = plan
			.processors
			.iter()
			.map(|p| 1 + p.inputs.len() + p.outputs.len())
			.sum();
		assert_eq!(model.nodes.len(), expected);
		assert_eq!(model.nodes.len(), 9);

		let keys: std::collections::HashSet<_> = model.nodes.iter().map(|n| &n.key).collect();
		assert_eq!(keys.len(), model.nodes.len());
		for (i, n) in model.nodes.iter().enumerate() {
			assert_eq!(n.id, NodeId(i));
		}
	}

	#[test]
	fn edges_resolve_to_slots() {
		let plan = sample_plan();
		let model = build_graph(&plan).unwrap();

		// TableReader/0's router feeds the aggregator's unordered synchronizer.
		let link = &model.links[0];
		assert_eq!(model.node(link.source).key, "router-0-0");
		assert_eq!(model.node(link.target).key, "sync-2-0");
		assert!(link.dashed);
		assert_eq!(link.edge, Some(0));
		assert!(link.stats.is_some());

		let last = &model.links[2];
		assert_eq!(model.node(last.target).key, "sync-3-0");
		assert!(!last.dashed);
		assert!(last.stats.is_none());
	}

	#[test]
	fn direct_edges_connect_cores() {
		let mut plan = sample_plan();
		plan.edges.push(Edge {
			source_proc: 0,
			dest_proc: 3,
			..Edge::default()
		});
		let model = build_graph(&plan).unwrap();
		let link = &model.links[3];
		assert_eq!(link.source, model.cores[0]);
		assert_eq!(link.target, model.cores[3]);
		assert_eq!(link.width, 3.0);
	}

	fn fan_out_plan(k: usize, router: &str) -> Plan {
		let mut plan = Plan {
			node_names: vec!["1".into()],
			..Plan::default()
		};
		plan.processors.push(Processor {
			core: Core {
				title: "TableReader".into(),
				details: vec![],
			},
			outputs: vec![Router {
				title: router.into(),
				details: vec![],
			}],
			..Processor::default()
		});
		for i in 0..k {
			plan.processors.push(Processor {
				core: Core {
					title: format!("Joiner/{i}"),
					details: vec![],
				},
				..Processor::default()
			});
			plan.edges.push(Edge {
				source_proc: 0,
				source_output: 1,
				dest_proc: i + 1,
				..Edge::default()
			});
		}
		plan
	}

	#[test]
	fn hash_fan_out_narrows_links() {
		for k in 1..=6 {
			let model = build_graph(&fan_out_plan(k, "by hash")).unwrap();
			let expected = (3.0 / k as f64).max(1.0);
			for link in model.visible_links().map(|(_, l)| l) {
				assert_eq!(link.width, expected, "k = {k}");
			}
		}
		let model = build_graph(&fan_out_plan(2, "by range")).unwrap();
		assert_eq!(model.links[0].width, 1.5);
	}

	#[test]
	fn mirror_routers_keep_full_width() {
		let model = build_graph(&fan_out_plan(4, "mirror")).unwrap();
		assert!(model.visible_links().all(|(_, l)| l.width == 3.0));
	}

	#[test]
	fn groups_hold_every_node_of_their_cluster() {
		let plan = sample_plan();
		let model = build_graph(&plan).unwrap();
		assert_eq!(model.groups.len(), 2);
		assert_eq!(model.groups[0].label, "Node 1");

		let total: usize = model.groups.iter().map(|g| g.leaves.len()).sum();
		assert_eq!(total, model.nodes.len());
		for g in &model.groups {
			for leaf in &g.leaves {
				assert_eq!(model.node(*leaf).cluster, g.cluster);
			}
		}
	}

	#[test]
	fn alignment_constraints_and_hidden_links() {
		let plan = sample_plan();
		let model = build_graph(&plan).unwrap();

		// Every processor has an input or an output.
		assert_eq!(model.constraints.len(), 2 * plan.processors.len());

		// The aggregator: one input above, one output below, both centered.
		let agg = model.cores[2];
		let x = model
			.constraints
			.iter()
			.find(|c| c.axis == Axis::X && c.offsets[0].0 == agg)
			.unwrap();
		assert_eq!(x.offsets.iter().map(|o| o.1).collect::<Vec<_>>(), [0.0, 0.0, 0.0]);
		let y = model
			.constraints
			.iter()
			.find(|c| c.axis == Axis::Y && c.offsets[0].0 == agg)
			.unwrap();
		// Two detail lines on the aggregator.
		assert_eq!(y.offsets[1].1, -48.0);
		assert_eq!(y.offsets[2].1, 48.0);

		let hidden: Vec<_> = model.links.iter().filter(|l| !l.visible).collect();
		let slots = model.nodes.iter().filter(|n| n.kind != NodeKind::Core).count();
		assert_eq!(hidden.len(), slots);
		assert!(hidden.iter().all(|l| l.edge.is_none()));
	}

	#[test]
	fn slots_spread_symmetrically() {
		assert_eq!(spread_offset(0, 1), 0.0);
		assert_eq!(spread_offset(0, 2), -80.0);
		assert_eq!(spread_offset(1, 2), 80.0);
		assert_eq!(spread_offset(0, 3), -160.0);
		assert_eq!(spread_offset(2, 3), 160.0);
	}

	#[test]
	fn malformed_edges_fail_the_build() {
		let mut plan = sample_plan();
		plan.edges[0].source_proc = plan.processors.len();
		assert!(matches!(
			build_graph(&plan),
			Err(ViewerError::IndexOutOfRange { field: "sourceProc", .. })
		));
	}
}
