use std::collections::BTreeSet;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use super::geometry::{Point, Rect, bounding, catmull_rom};
use super::{EdgeRoute, LayoutEngine, LayoutFrame, LayoutKind, Viewport};
use crate::config::LayeredDirection;
use crate::error::{Result, ViewerError};
use crate::model::GraphModel;

const NODE_GAP: f64 = 40.0;
const RANK_GAP: f64 = 80.0;
const DUMMY_WIDTH: f64 = 10.0;
const SWEEPS: usize = 4;
const CURVE_SAMPLES: usize = 8;
const FIT_MAX_SCALE: f64 = 5.0;

/// A processor, or a bend point of an edge spanning several ranks.
struct Vertex {
	rank: usize,
	processor: Option<usize>,
	width: f64,
}

/// Layered drawing of the processor DAG: longest-path ranks, dummy
/// vertices on long edges, barycenter ordering. Only cores are placed.
pub struct LayeredLayout {
	ranks: Vec<usize>,
	frame: LayoutFrame,
}

impl LayeredLayout {
	pub fn new(model: &GraphModel, viewport: Viewport, direction: LayeredDirection) -> Result<Self> {
		let processors = model.cores.len();
		let mut dag: DiGraph<usize, ()> = DiGraph::new();
		let handles: Vec<NodeIndex> = (0..processors).map(|p| dag.add_node(p)).collect();

		let pairs: BTreeSet<(usize, usize)> = model
			.visible_links()
			.map(|(_, l)| (model.node(l.source).processor, model.node(l.target).processor))
			.filter(|(s, t)| s != t)
			.collect();
		for &(s, t) in &pairs {
			dag.add_edge(handles[s], handles[t], ());
		}

		let order = toposort(&dag, None).map_err(|cycle| ViewerError::Cycle(dag[cycle.node_id()]))?;
		let mut ranks = vec![0usize; processors];
		for n in order {
			let s = dag[n];
			for e in dag.edges(n) {
				let t = dag[e.target()];
				ranks[t] = ranks[t].max(ranks[s] + 1);
			}
		}

		let mut vertices: Vec<Vertex> = (0..processors)
			.map(|p| Vertex {
				rank: ranks[p],
				processor: Some(p),
				width: model.node(model.cores[p]).geometry.width,
			})
			.collect();
		// Vertex chain of every processor pair, source to target.
		let mut chains: Vec<((usize, usize), Vec<usize>)> = Vec::with_capacity(pairs.len());
		// (upper, lower) vertices on adjacent ranks.
		let mut segments: Vec<(usize, usize)> = Vec::new();
		for &(s, t) in &pairs {
			let mut chain = vec![s];
			for rank in ranks[s] + 1..ranks[t] {
				vertices.push(Vertex {
					rank,
					processor: None,
					width: DUMMY_WIDTH,
				});
				chain.push(vertices.len() - 1);
			}
			chain.push(t);
			segments.extend(chain.windows(2).map(|w| (w[0], w[1])));
			chains.push(((s, t), chain));
		}

		let depth = ranks.iter().copied().max().map_or(0, |r| r + 1);
		let mut layers: Vec<Vec<usize>> = vec![Vec::new(); depth];
		for (i, v) in vertices.iter().enumerate() {
			layers[v.rank].push(i);
		}
		order_layers(&mut layers, &vertices, &segments);

		let rank_height = model
			.cores
			.iter()
			.map(|&c| model.node(c).geometry.height)
			.fold(0.0, f64::max)
			+ RANK_GAP;
		let sign = match direction {
			LayeredDirection::Down => 1.0,
			LayeredDirection::Up => -1.0,
		};
		let mut centers = vec![Point::default(); vertices.len()];
		for (rank, layer) in layers.iter().enumerate() {
			let total: f64 = layer.iter().map(|&v| vertices[v].width).sum::<f64>()
				+ NODE_GAP * layer.len().saturating_sub(1) as f64;
			let mut x = -total / 2.0;
			for &v in layer {
				let w = vertices[v].width;
				centers[v] = Point::new(x + w / 2.0, sign * rank as f64 * rank_height);
				x += w + NODE_GAP;
			}
		}

		let mut nodes = vec![None; model.nodes.len()];
		for v in &vertices {
			if let Some(p) = v.processor {
				let core = model.cores[p];
				let g = model.node(core).geometry;
				nodes[core.0] = Some(Rect::centered(centers[p], g.width, g.height));
			}
		}

		// Leave the source on the side facing the target.
		let exit = |r: &Rect| match direction {
			LayeredDirection::Down => Point::new(r.center().x, r.bottom()),
			LayeredDirection::Up => Point::new(r.center().x, r.y),
		};
		let entry = |r: &Rect| match direction {
			LayeredDirection::Down => Point::new(r.center().x, r.y),
			LayeredDirection::Up => Point::new(r.center().x, r.bottom()),
		};
		let routes = model
			.links
			.iter()
			.map(|l| {
				if !l.visible {
					return None;
				}
				let key = (model.node(l.source).processor, model.node(l.target).processor);
				let (_, chain) = chains.iter().find(|(pair, _)| *pair == key)?;
				let (first, last) = (chain.first()?, chain.last()?);
				let mut points = vec![exit(nodes[model.cores[*first].0].as_ref()?)];
				points.extend(chain[1..chain.len() - 1].iter().map(|&d| centers[d]));
				points.push(entry(nodes[model.cores[*last].0].as_ref()?));
				Some(EdgeRoute {
					points: catmull_rom(&points, CURVE_SAMPLES),
				})
			})
			.collect();

		let groups: Vec<Option<Rect>> = model
			.groups
			.iter()
			.map(|g| {
				bounding(g.leaves.iter().filter_map(|id| nodes[id.0])).map(|r| r.inflate(g.padding))
			})
			.collect();
		let extent = bounding(groups.iter().flatten().copied())
			.or_else(|| bounding(nodes.iter().flatten().copied()));

		Ok(LayeredLayout {
			ranks,
			frame: LayoutFrame {
				tick: 0,
				nodes,
				groups,
				routes,
				extent,
				initial_transform: extent.map(|e| viewport.fit(e, 1.0, FIT_MAX_SCALE)),
			},
		})
	}

	/// Rank of a processor; sources are at rank 0.
	pub fn rank(&self, processor: usize) -> Option<usize> {
		self.ranks.get(processor).copied()
	}
}

/// Reorders each layer to reduce crossings, alternating downward and
/// upward barycenter sweeps.
fn order_layers(layers: &mut [Vec<usize>], vertices: &[Vertex], segments: &[(usize, usize)]) {
	let mut position = vec![0.0; vertices.len()];
	let record = |layers: &[Vec<usize>], position: &mut [f64]| {
		for layer in layers {
			for (i, &v) in layer.iter().enumerate() {
				position[v] = i as f64;
			}
		}
	};
	record(layers, &mut position);

	for _ in 0..SWEEPS {
		for downward in [true, false] {
			let ranks: Vec<usize> = if downward {
				(1..layers.len()).collect()
			} else {
				(0..layers.len().saturating_sub(1)).rev().collect()
			};
			for r in ranks {
				let bary = |v: usize| {
					let neighbors: Vec<f64> = segments
						.iter()
						.filter_map(|&(upper, lower)| match downward {
							true if lower == v => Some(position[upper]),
							false if upper == v => Some(position[lower]),
							_ => None,
						})
						.collect();
					if neighbors.is_empty() {
						position[v]
					} else {
						neighbors.iter().sum::<f64>() / neighbors.len() as f64
					}
				};
				let mut keyed: Vec<(f64, usize)> = layers[r].iter().map(|&v| (bary(v), v)).collect();
				keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
				layers[r] = keyed.into_iter().map(|(_, v)| v).collect();
				for (i, &v) in layers[r].iter().enumerate() {
					position[v] = i as f64;
				}
			}
		}
	}
}

impl LayoutEngine for LayeredLayout {
	fn tick(&mut self) {}

	fn is_converged(&self) -> bool {
		true
	}

	fn frame(&self) -> &LayoutFrame {
		&self.frame
	}

	fn kind(&self) -> LayoutKind {
		LayoutKind::Layered
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Margin;
	use crate::model::build_graph;
	use crate::plan::Edge;
	use crate::plan::tests::sample_plan;

	fn viewport() -> Viewport {
		Viewport {
			width: 1000.0,
			height: 800.0,
			margin: Margin::uniform(20.0),
		}
	}

	fn core_center(layout: &LayeredLayout, model: &GraphModel, p: usize) -> Point {
		layout.frame().node(model.cores[p]).unwrap().center()
	}

	#[test]
	fn ranks_follow_longest_paths() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = LayeredLayout::new(&model, viewport(), LayeredDirection::Down).unwrap();
		assert_eq!((0..4).map(|p| layout.rank(p).unwrap()).collect::<Vec<_>>(), [0, 0, 1, 2]);

		let y: Vec<f64> = (0..4).map(|p| core_center(&layout, &model, p).y).collect();
		assert_eq!(y[0], y[1]);
		assert!(y[0] < y[2] && y[2] < y[3]);
		assert!(layout.is_converged());
	}

	#[test]
	fn only_cores_are_placed() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = LayeredLayout::new(&model, viewport(), LayeredDirection::Down).unwrap();
		for node in &model.nodes {
			let placed = layout.frame().node(node.id).is_some();
			assert_eq!(placed, model.cores.contains(&node.id), "{}", node.key);
		}
	}

	#[test]
	fn upward_direction_mirrors_ranks() {
		let model = build_graph(&sample_plan()).unwrap();
		let down = LayeredLayout::new(&model, viewport(), LayeredDirection::Down).unwrap();
		let up = LayeredLayout::new(&model, viewport(), LayeredDirection::Up).unwrap();
		for p in 0..4 {
			assert_eq!(core_center(&up, &model, p).y, -core_center(&down, &model, p).y);
		}
		// Routes run from the source's top to the target's bottom.
		let route = up.frame().routes[2].as_ref().unwrap();
		let src = up.frame().node(model.cores[2]).unwrap();
		assert_eq!(route.points[0].y, src.y);
	}

	#[test]
	fn long_edges_bend_through_dummies() {
		let mut plan = sample_plan();
		plan.edges.push(Edge {
			source_proc: 0,
			dest_proc: 3,
			..Edge::default()
		});
		let model = build_graph(&plan).unwrap();
		let layout = LayeredLayout::new(&model, viewport(), LayeredDirection::Down).unwrap();

		// Two segments, curved.
		let long = layout.frame().routes[3].as_ref().unwrap();
		assert_eq!(long.points.len(), 2 * CURVE_SAMPLES + 1);
		// Adjacent ranks: a straight line.
		let short = layout.frame().routes[2].as_ref().unwrap();
		assert_eq!(short.points.len(), 2);

		let src = layout.frame().node(model.cores[0]).unwrap();
		let dst = layout.frame().node(model.cores[3]).unwrap();
		assert!(long.points[0].distance(Point::new(src.center().x, src.bottom())) < 1e-9);
		assert_eq!(long.tip(), Some(Point::new(dst.center().x, dst.y)));
	}

	#[test]
	fn hidden_links_are_not_routed() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = LayeredLayout::new(&model, viewport(), LayeredDirection::Down).unwrap();
		for (i, link) in model.links.iter().enumerate() {
			assert_eq!(layout.frame().routes[i].is_some(), link.visible);
		}
	}

	#[test]
	fn cycles_are_rejected() {
		let mut plan = sample_plan();
		plan.edges.push(Edge {
			source_proc: 3,
			dest_proc: 0,
			..Edge::default()
		});
		let model = build_graph(&plan).unwrap();
		let err = LayeredLayout::new(&model, viewport(), LayeredDirection::Down)
			.err()
			.unwrap();
		assert!(matches!(err, ViewerError::Cycle(_)));
	}

	#[test]
	fn fits_the_whole_diagram() {
		let model = build_graph(&sample_plan()).unwrap();
		let layout = LayeredLayout::new(&model, viewport(), LayeredDirection::Down).unwrap();
		let frame = layout.frame();
		let fit = frame.initial_transform.unwrap();
		assert!(fit.k <= FIT_MAX_SCALE);
		let extent = frame.extent.unwrap();
		let top_left = fit.to_screen(Point::new(extent.x, extent.y));
		let bottom_right = fit.to_screen(Point::new(extent.right(), extent.bottom()));
		assert!(top_left.x >= 20.0 - 1e-9 && top_left.y >= 20.0 - 1e-9);
		assert!(bottom_right.x <= 980.0 + 1e-9 && bottom_right.y <= 780.0 + 1e-9);
	}
}
