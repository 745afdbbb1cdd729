//! Cross-view selection state.
//!
//! The graph canvas and the tables both toggle entries here and re-query it
//! when they draw; neither keeps its own copy of what is selected.

use std::collections::{HashMap, HashSet};
use std::fmt;

use log::debug;

use crate::plan::Plan;
use crate::scale::{Rgb, interpolate_rainbow};

/// Something a user can select in more than one view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SelectableId {
	Processor(usize),
	Edge { source: usize, dest: usize },
	/// Every processor placed on one cluster node
	Cluster(usize),
}

impl fmt::Display for SelectableId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SelectableId::Processor(i) => write!(f, "processor-{i}"),
			SelectableId::Edge { source, dest } => write!(f, "edge-{source}-{dest}"),
			SelectableId::Cluster(i) => write!(f, "cluster-{i}"),
		}
	}
}

/// Identifiers of a plan in their stable global order: processors, then
/// edges, then cluster nodes.
pub fn plan_identifiers(plan: &Plan) -> Vec<SelectableId> {
	let processors = (0..plan.processors.len()).map(SelectableId::Processor);
	let edges = plan.edges.iter().map(|e| SelectableId::Edge {
		source: e.source_proc,
		dest: e.dest_proc,
	});
	let clusters = (0..plan.node_names.len()).map(SelectableId::Cluster);
	processors.chain(edges).chain(clusters).collect()
}

#[derive(Clone, Debug, Default)]
pub struct SelectionCoordinator {
	registry: Vec<SelectableId>,
	ranks: HashMap<SelectableId, usize>,
	selected: HashSet<SelectableId>,
}

impl SelectionCoordinator {
	pub fn new() -> Self {
		Self::default()
	}

	/// A coordinator whose registry holds every identifier of `plan`.
	pub fn for_plan(plan: &Plan) -> Self {
		let mut coordinator = Self::new();
		for id in plan_identifiers(plan) {
			coordinator.register(id);
		}
		coordinator
	}

	/// Appends an identifier to the global order. Re-registering is a no-op.
	pub fn register(&mut self, id: SelectableId) -> usize {
		*self.ranks.entry(id).or_insert_with(|| {
			self.registry.push(id);
			self.registry.len() - 1
		})
	}

	/// Flips `id` in or out of the selection and returns whether it is now
	/// selected.
	pub fn toggle(&mut self, id: SelectableId) -> bool {
		self.register(id);
		let selected = if self.selected.remove(&id) {
			false
		} else {
			self.selected.insert(id);
			true
		};
		debug!("selection {id}: {}", if selected { "on" } else { "off" });
		selected
	}

	pub fn is_selected(&self, id: &SelectableId) -> bool {
		self.selected.contains(id)
	}

	/// Highlight color of a selected identifier; `None` when unselected.
	pub fn color_of(&self, id: &SelectableId) -> Option<Rgb> {
		if self.is_selected(id) {
			self.color_for_rank(id)
		} else {
			None
		}
	}

	/// The color `id` gets whenever it is selected.
	pub fn color_for_rank(&self, id: &SelectableId) -> Option<Rgb> {
		let rank = *self.ranks.get(id)?;
		Some(interpolate_rainbow(rank as f64 / self.registry.len() as f64))
	}

	pub fn selected(&self) -> impl Iterator<Item = &SelectableId> {
		self.selected.iter()
	}

	pub fn identifiers(&self) -> &[SelectableId] {
		&self.registry
	}

	/// Forgets the selection and the identifier order.
	pub fn reset(&mut self) {
		self.registry.clear();
		self.ranks.clear();
		self.selected.clear();
	}
}
