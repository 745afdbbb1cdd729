//! Load/reset lifecycle of the viewer.
//!
//! Every load starts from an empty session, so a failed rebuild never
//! leaves derived state from the previous plan behind.

use std::sync::Arc;

use log::{error, info};

use crate::error::{Result, ViewerError};
use crate::model::{GraphModel, build_graph_with};
use crate::plan::{Plan, decode_fragment, format_sql, parse_plan};
use crate::selection::{SelectableId, SelectionCoordinator};

/// A plan together with everything derived from it at load time.
#[derive(Debug)]
pub struct LoadedPlan {
	pub plan: Plan,
	pub model: GraphModel,
	/// Pretty-printed plan, for the editor
	pub json: String,
	/// Formatted SQL text
	pub sql: String,
}

#[derive(Clone, Debug)]
pub struct Session {
	loaded: Option<Arc<LoadedPlan>>,
	selection: SelectionCoordinator,
	error: Option<ViewerError>,
	generation: u64,
	max_detail_rows: usize,
}

impl Session {
	pub fn new(max_detail_rows: usize) -> Self {
		Session {
			loaded: None,
			selection: SelectionCoordinator::new(),
			error: None,
			generation: 0,
			max_detail_rows,
		}
	}

	/// Drops the plan, the selection and any error, and starts a new render
	/// generation.
	pub fn reset(&mut self) {
		self.loaded = None;
		self.selection.reset();
		self.error = None;
		self.generation += 1;
	}

	pub fn load(&mut self, plan: Plan) -> Result<()> {
		self.reset();
		let loaded = derive(plan, self.max_detail_rows);
		self.finish(loaded)
	}

	/// Parses plan JSON (e.g. from the editor) and loads it.
	pub fn load_text(&mut self, text: &str) -> Result<()> {
		self.reset();
		let loaded = parse_plan(text).and_then(|plan| derive(plan, self.max_detail_rows));
		self.finish(loaded)
	}

	/// Loads the plan carried in a URL fragment. Returns `Ok(false)` when
	/// the fragment is empty.
	pub fn load_fragment(&mut self, fragment: &str) -> Result<bool> {
		self.reset();
		match decode_fragment(fragment) {
			Ok(None) => Ok(false),
			Ok(Some(plan)) => {
				let loaded = derive(plan, self.max_detail_rows);
				self.finish(loaded).map(|()| true)
			}
			Err(e) => self.finish(Err(e)).map(|()| false),
		}
	}

	fn finish(&mut self, loaded: Result<LoadedPlan>) -> Result<()> {
		match loaded {
			Ok(loaded) => {
				info!(
					"loaded plan: {} processors, {} edges, {} cluster nodes",
					loaded.plan.processors.len(),
					loaded.plan.edges.len(),
					loaded.plan.node_names.len()
				);
				self.selection = SelectionCoordinator::for_plan(&loaded.plan);
				self.loaded = Some(Arc::new(loaded));
				Ok(())
			}
			Err(e) => {
				error!("failed to load plan: {e}");
				self.error = Some(e.clone());
				Err(e)
			}
		}
	}

	/// Records a failure found after loading (e.g. by the layout) and drops
	/// the plan it concerns.
	pub fn fail(&mut self, err: ViewerError) {
		error!("cannot display plan: {err}");
		self.loaded = None;
		self.error = Some(err);
	}

	pub fn loaded(&self) -> Option<&Arc<LoadedPlan>> {
		self.loaded.as_ref()
	}

	pub fn error(&self) -> Option<&ViewerError> {
		self.error.as_ref()
	}

	/// Bumped on every load or reset; views rebuild when it changes.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn selection(&self) -> &SelectionCoordinator {
		&self.selection
	}

	pub fn toggle(&mut self, id: SelectableId) -> bool {
		self.selection.toggle(id)
	}
}

fn derive(plan: Plan, max_detail_rows: usize) -> Result<LoadedPlan> {
	let model = build_graph_with(&plan, max_detail_rows)?;
	let json = plan.to_pretty_json()?;
	let sql = format_sql(&plan.sql);
	Ok(LoadedPlan {
		plan,
		model,
		json,
		sql,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::DEFAULT_MAX_DETAIL_ROWS;
	use crate::plan::tests::sample_plan;

	fn session() -> Session {
		Session::new(DEFAULT_MAX_DETAIL_ROWS)
	}

	#[test]
	fn load_derives_everything() {
		let mut s = session();
		s.load(sample_plan()).unwrap();
		let loaded = s.loaded().unwrap();
		assert_eq!(loaded.model.nodes.len(), 9);
		assert_eq!(parse_plan(&loaded.json).unwrap(), sample_plan());
		assert_eq!(loaded.sql, format_sql("SELECT count(*) FROM t"));
		assert!(loaded.sql.lines().any(|l| l.trim_start().starts_with("FROM")));
		assert_eq!(s.selection().identifiers().len(), 9);
		assert!(s.error().is_none());
	}

	#[test]
	fn failed_reload_discards_previous_plan() {
		let mut s = session();
		s.load(sample_plan()).unwrap();
		s.toggle(SelectableId::Processor(1));
		let before = s.generation();

		let mut broken = sample_plan();
		broken.edges[0].source_proc = 42;
		let err = s.load(broken).unwrap_err();

		assert!(matches!(err, ViewerError::IndexOutOfRange { .. }));
		assert!(s.loaded().is_none());
		assert_eq!(s.error(), Some(&err));
		assert_eq!(s.selection().selected().count(), 0);
		assert!(s.generation() > before);
	}

	#[test]
	fn reload_clears_selection() {
		let mut s = session();
		s.load(sample_plan()).unwrap();
		s.toggle(SelectableId::Cluster(0));
		s.load_text(&sample_plan().to_pretty_json().unwrap()).unwrap();
		assert!(!s.selection().is_selected(&SelectableId::Cluster(0)));
	}

	#[test]
	fn text_errors_are_kept() {
		let mut s = session();
		assert!(matches!(s.load_text("{ nope"), Err(ViewerError::Json(_))));
		assert!(matches!(s.error(), Some(ViewerError::Json(_))));

		s.reset();
		assert!(s.error().is_none());
	}

	#[test]
	fn late_failures_drop_the_plan() {
		let mut s = session();
		s.load(sample_plan()).unwrap();
		let generation = s.generation();
		s.fail(ViewerError::Cycle(2));
		assert!(s.loaded().is_none());
		assert_eq!(s.error(), Some(&ViewerError::Cycle(2)));
		assert_eq!(s.generation(), generation);
	}

	#[test]
	fn empty_fragment_is_not_an_error() {
		let mut s = session();
		assert_eq!(s.load_fragment("#"), Ok(false));
		assert!(s.loaded().is_none());
		assert!(s.error().is_none());

		assert!(s.load_fragment("#%%%").is_err());
		assert!(s.error().is_some());
	}
}
