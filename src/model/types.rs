use std::fmt;

use crate::plan::MetricMap;

/// Index of a node in [`GraphModel::nodes`](super::GraphModel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "n{}", self.0)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Core,
	Synchronizer,
	Router,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeGeometry {
	pub width: f64,
	pub height: f64,
	pub corner_radius: f64,
}

#[derive(Clone, Debug)]
pub struct GraphNode {
	pub id: NodeId,
	/// Stable key, e.g. `core-3`, `sync-3-0`, `router-3-1`
	pub key: String,
	pub kind: NodeKind,
	pub processor: usize,
	/// Position within the processor's inputs or outputs
	pub slot: Option<usize>,
	pub cluster: usize,
	pub stage: u32,
	pub title: String,
	pub details: Vec<String>,
	pub metrics: MetricMap,
	pub geometry: NodeGeometry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	pub source: NodeId,
	pub target: NodeId,
	/// Alignment links steer the layout and are never drawn.
	pub visible: bool,
	pub width: f64,
	/// Index of the plan edge this link draws
	pub edge: Option<usize>,
	pub stats: Option<Vec<String>>,
	/// Ends at an unordered synchronizer
	pub dashed: bool,
}

/// Processors (with their synchronizers and routers) placed on one cluster
/// node.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
	pub cluster: usize,
	pub label: String,
	pub leaves: Vec<NodeId>,
	pub padding: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
	X,
	Y,
}

/// Keeps every listed node at a fixed offset from the others along one axis.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentConstraint {
	pub axis: Axis,
	pub offsets: Vec<(NodeId, f64)>,
}
