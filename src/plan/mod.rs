//! The captured plan document and everything derived directly from its text.
//!
//! A [`Plan`] is immutable once loaded. [`Plan::validate`] checks every index
//! the document carries so later stages can index without re-checking.

mod decode;
pub mod metrics;
mod sql;
pub mod units;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};

pub use decode::{decode_fragment, parse_plan};
pub use metrics::{Metric, MetricMap};
pub use sql::format_sql;

/// Router titles that split their output across every outgoing edge.
pub const PARTITIONING_ROUTERS: &[&str] = &["by hash", "by range"];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
	#[serde(default)]
	pub processors: Vec<Processor>,
	#[serde(default)]
	pub edges: Vec<Edge>,
	#[serde(default)]
	pub node_names: Vec<String>,
	#[serde(default)]
	pub sql: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processor {
	pub node_idx: usize,
	#[serde(default)]
	pub stage: u32,
	pub core: Core,
	#[serde(default)]
	pub inputs: Vec<Synchronizer>,
	#[serde(default)]
	pub outputs: Vec<Router>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Core {
	pub title: String,
	#[serde(default)]
	pub details: Vec<String>,
}

/// Input merge point of a processor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Synchronizer {
	pub title: String,
	#[serde(default)]
	pub details: Vec<String>,
}

/// Output distribution point of a processor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Router {
	pub title: String,
	#[serde(default)]
	pub details: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
	pub source_proc: usize,
	#[serde(default)]
	pub source_output: usize,
	pub dest_proc: usize,
	#[serde(default)]
	pub dest_input: usize,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stats: Option<Vec<String>>,
}

/// Row ordering guarantee of a synchronizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputOrdering {
	Ordered,
	Unordered,
}

impl Synchronizer {
	pub fn ordering(&self) -> Option<InputOrdering> {
		match self.title.as_str() {
			"ordered" => Some(InputOrdering::Ordered),
			"unordered" => Some(InputOrdering::Unordered),
			_ => None,
		}
	}
}

impl Router {
	/// Whether this router partitions rows across its outgoing edges.
	pub fn is_partitioning(&self) -> bool {
		PARTITIONING_ROUTERS.contains(&self.title.as_str())
	}
}

impl Processor {
	pub fn has_input(&self, ordering: InputOrdering) -> bool {
		self.inputs.iter().any(|s| s.ordering() == Some(ordering))
	}

	/// The operator name without any `/<id>` suffix.
	pub fn operator(&self) -> &str {
		self.core.title.split('/').next().unwrap_or_default().trim()
	}
}

impl Plan {
	/// Checks every processor and edge index against the document.
	pub fn validate(&self) -> Result<()> {
		for (i, p) in self.processors.iter().enumerate() {
			check(format!("processor {i}"), "nodeIdx", p.node_idx, self.node_names.len())?;
		}
		for (i, e) in self.edges.iter().enumerate() {
			let entity = || format!("edge {i}");
			let n = self.processors.len();
			check(entity(), "sourceProc", e.source_proc, n)?;
			check(entity(), "destProc", e.dest_proc, n)?;
			if e.source_output > 0 {
				let outputs = self.processors[e.source_proc].outputs.len();
				check(entity(), "sourceOutput", e.source_output - 1, outputs)?;
			}
			if e.dest_input > 0 {
				let inputs = self.processors[e.dest_proc].inputs.len();
				check(entity(), "destInput", e.dest_input - 1, inputs)?;
			}
		}
		Ok(())
	}

	/// Label of the cluster node a processor runs on.
	pub fn node_name(&self, processor: usize) -> &str {
		self.processors
			.get(processor)
			.and_then(|p| self.node_names.get(p.node_idx))
			.map(String::as_str)
			.unwrap_or_default()
	}

	/// Pretty-printed JSON for the raw plan view.
	pub fn to_pretty_json(&self) -> Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}
}

fn check(entity: String, field: &'static str, index: usize, len: usize) -> Result<()> {
	if index < len {
		Ok(())
	} else {
		Err(ViewerError::IndexOutOfRange {
			entity,
			field,
			index,
			len,
		})
	}
}
