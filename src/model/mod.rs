//! Graph model derived from a plan: nodes, links, groups and alignment
//! constraints, ready for layout.

mod builder;
mod types;

pub use builder::{build_graph, build_graph_with};
pub(crate) use builder::{CORE_HEADER, DETAIL_ROW_HEIGHT};
pub use types::{
	AlignmentConstraint, Axis, GraphLink, GraphNode, Group, NodeGeometry, NodeId, NodeKind,
};

#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
	pub groups: Vec<Group>,
	pub constraints: Vec<AlignmentConstraint>,
	/// Core node of each processor, by processor index
	pub cores: Vec<NodeId>,
}

impl GraphModel {
	pub fn node(&self, id: NodeId) -> &GraphNode {
		&self.nodes[id.0]
	}

	pub fn visible_links(&self) -> impl Iterator<Item = (usize, &GraphLink)> {
		self.links.iter().enumerate().filter(|(_, l)| l.visible)
	}

	pub fn core_of(&self, processor: usize) -> Option<NodeId> {
		self.cores.get(processor).copied()
	}
}
