//! Row derivation and sorting for the processor and edge tables.

use std::cmp::Ordering;

use log::debug;

use crate::model::GraphModel;
use crate::plan::units::{MetricValue, human_format};
use crate::plan::{MetricMap, Plan};
use crate::scale::{Rgb, magnitude_color};
use crate::selection::SelectableId;

pub const PROCESSOR_COLUMNS: &[&str] = &[
	"Id",
	"Node",
	"Processor",
	"Synchs",
	"Routers",
	"execution time",
	"input rows",
	"rows output",
	"batches output",
	"KV time",
	"KV contention time",
	"KV rows read",
	"KV bytes read",
	"max memory allocated",
	"max scratch disk allocated",
];
const PROCESSOR_INFO_COLUMNS: usize = 5;

pub const EDGE_COLUMNS: &[&str] = &[
	"Id",
	"Input",
	"Output",
	"network latency",
	"network wait time",
	"deserialization time",
	"network rows received",
	"network bytes received",
	"network messages received",
	"max memory allocated",
	"max sql temp disk usage",
	"batches output",
	"rows output",
];
const EDGE_INFO_COLUMNS: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
	/// Clickable selector
	Id(SelectableId, String),
	Text(String),
	Count(usize),
	/// `None` when the entity does not report the metric
	Metric(Option<MetricValue>),
}

#[derive(Debug, PartialEq)]
enum SortKey<'a> {
	Number(f64),
	Id(SelectableId),
	Text(&'a str),
}

impl SortKey<'_> {
	fn rank(&self) -> u8 {
		match self {
			SortKey::Number(_) => 0,
			SortKey::Id(_) => 1,
			SortKey::Text(_) => 2,
		}
	}

	fn compare(&self, other: &SortKey<'_>) -> Ordering {
		match (self, other) {
			(SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
			(SortKey::Id(a), SortKey::Id(b)) => a.cmp(b),
			(SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
			_ => self.rank().cmp(&other.rank()),
		}
	}
}

impl Cell {
	fn sort_key(&self) -> Option<SortKey<'_>> {
		match self {
			Cell::Id(id, _) => Some(SortKey::Id(*id)),
			Cell::Text(s) => Some(SortKey::Text(s)),
			Cell::Count(n) => Some(SortKey::Number(*n as f64)),
			Cell::Metric(None) => None,
			Cell::Metric(Some(MetricValue::Number(n))) => Some(SortKey::Number(*n)),
			Cell::Metric(Some(MetricValue::Text(s))) => Some(SortKey::Text(s)),
		}
	}

	/// Display text; metric magnitudes are shown in their column's unit.
	pub fn display(&self, column: &str) -> String {
		match self {
			Cell::Id(_, label) => label.clone(),
			Cell::Text(s) => s.clone(),
			Cell::Count(n) => n.to_string(),
			Cell::Metric(None) => String::new(),
			Cell::Metric(Some(MetricValue::Number(n))) if *n > 0.0 => human_format(column, *n),
			Cell::Metric(Some(v)) => v.to_string(),
		}
	}

	pub fn color(&self) -> Option<Rgb> {
		match self {
			Cell::Metric(Some(v)) => v.positive().and_then(magnitude_color),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
	pub id: SelectableId,
	pub cells: Vec<Cell>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
	#[default]
	Ascending,
	Descending,
}

impl SortDirection {
	fn apply(self, ord: Ordering) -> Ordering {
		match self {
			SortDirection::Ascending => ord,
			SortDirection::Descending => ord.reverse(),
		}
	}

	pub fn flipped(self) -> Self {
		match self {
			SortDirection::Ascending => SortDirection::Descending,
			SortDirection::Descending => SortDirection::Ascending,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableSort {
	pub column: usize,
	pub direction: SortDirection,
}

impl TableSort {
	/// A header click: the same column flips, a new column starts ascending.
	pub fn click(&mut self, column: usize) {
		if self.column == column {
			self.direction = self.direction.flipped();
		} else {
			self.column = column;
			self.direction = SortDirection::Ascending;
		}
		debug!("table sort: column {} {:?}", self.column, self.direction);
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
	pub columns: &'static [&'static str],
	/// Index of the first metric column
	pub metric_start: usize,
	pub rows: Vec<Row>,
}

impl Table {
	/// One row per processor, metrics read from the core's parsed details.
	pub fn processors(plan: &Plan, model: &GraphModel) -> Self {
		let rows = plan
			.processors
			.iter()
			.enumerate()
			.map(|(i, p)| {
				let metrics = model.core_of(i).map(|c| &model.node(c).metrics);
				let mut cells = vec![
					Cell::Id(SelectableId::Processor(i), i.to_string()),
					Cell::Text(plan.node_name(i).to_string()),
					Cell::Text(p.core.title.clone()),
					Cell::Count(p.inputs.len()),
					Cell::Count(p.outputs.len()),
				];
				cells.extend(
					PROCESSOR_COLUMNS[PROCESSOR_INFO_COLUMNS..]
						.iter()
						.map(|name| Cell::Metric(metrics.and_then(|m| m.value(name)).cloned())),
				);
				Row {
					id: SelectableId::Processor(i),
					cells,
				}
			})
			.collect();
		Table {
			columns: PROCESSOR_COLUMNS,
			metric_start: PROCESSOR_INFO_COLUMNS,
			rows,
		}
	}

	/// One row per edge that carries runtime stats; the rest are left out.
	pub fn edges(plan: &Plan) -> Self {
		let rows = plan
			.edges
			.iter()
			.filter_map(|e| {
				let stats = MetricMap::parse(e.stats.as_deref()?);
				let id = SelectableId::Edge {
					source: e.source_proc,
					dest: e.dest_proc,
				};
				let mut cells = vec![
					Cell::Id(id, format!("{}-{}", e.source_proc, e.dest_proc)),
					Cell::Text(plan.node_name(e.source_proc).to_string()),
					Cell::Text(plan.node_name(e.dest_proc).to_string()),
				];
				cells.extend(
					EDGE_COLUMNS[EDGE_INFO_COLUMNS..]
						.iter()
						.map(|name| Cell::Metric(stats.value(name).cloned())),
				);
				Some(Row { id, cells })
			})
			.collect();
		Table {
			columns: EDGE_COLUMNS,
			metric_start: EDGE_INFO_COLUMNS,
			rows,
		}
	}

	/// Descending on the first metric column.
	pub fn initial_sort(&self) -> TableSort {
		TableSort {
			column: self.metric_start,
			direction: SortDirection::Descending,
		}
	}

	/// Rows in sort order. Cells without a value always come last, and so
	/// do metrics that did not normalize to a number; ties keep plan order.
	pub fn sorted(&self, sort: TableSort) -> Vec<&Row> {
		let numeric = sort.column >= self.metric_start;
		let mut rows: Vec<&Row> = self.rows.iter().collect();
		rows.sort_by(|a, b| {
			match (
				sort_key(a, sort.column, numeric),
				sort_key(b, sort.column, numeric),
			) {
				(None, None) => Ordering::Equal,
				(None, Some(_)) => Ordering::Greater,
				(Some(_), None) => Ordering::Less,
				(Some(x), Some(y)) => sort.direction.apply(x.compare(&y)),
			}
		});
		rows
	}
}

/// Metric columns only sort by numbers.
fn sort_key(row: &Row, column: usize, numeric: bool) -> Option<SortKey<'_>> {
	row.cells
		.get(column)
		.and_then(Cell::sort_key)
		.filter(|k| !numeric || matches!(k, SortKey::Number(_)))
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::model::build_graph;
	use crate::plan::tests::sample_plan;

	fn processor_table() -> Table {
		let plan = sample_plan();
		let model = build_graph(&plan).unwrap();
		Table::processors(&plan, &model)
	}

	fn order(table: &Table, sort: TableSort) -> Vec<SelectableId> {
		table.sorted(sort).into_iter().map(|r| r.id).collect()
	}

	#[test]
	fn processor_rows() {
		let table = processor_table();
		assert_eq!(table.rows.len(), 4);
		let agg = &table.rows[2];
		assert_eq!(agg.cells[0].display("Id"), "2");
		assert_eq!(agg.cells[1], Cell::Text("1".into()));
		assert_eq!(agg.cells[2], Cell::Text("Aggregator/2".into()));
		assert_eq!(agg.cells[3], Cell::Count(1));
		assert_eq!(agg.cells[5], Cell::Metric(Some(MetricValue::Number(300.0))));
		assert_eq!(agg.cells[5].display("execution time"), "300µs");

		let reader = &table.rows[0];
		assert_eq!(reader.cells[7].display("rows output"), "1.0K");
		assert_eq!(reader.cells[13].display("max memory allocated"), "20.0 KiB");
		assert!(reader.cells[13].color().is_some());
		assert_eq!(reader.cells[9], Cell::Metric(None));
		assert_eq!(reader.cells[9].color(), None);
	}

	#[test]
	fn initial_sort_is_descending_execution_time() {
		let table = processor_table();
		let sort = table.initial_sort();
		assert_eq!(table.columns[sort.column], "execution time");
		// The response processor reports no time and sorts last.
		assert_eq!(order(&table, sort), [1, 0, 2, 3].map(SelectableId::Processor));
	}

	#[test]
	fn header_clicks_cycle_direction() {
		let table = processor_table();
		let mut sort = table.initial_sort();

		sort.click(6);
		assert_eq!(sort.direction, SortDirection::Ascending);
		sort.click(6);
		assert_eq!(sort.direction, SortDirection::Descending);
		sort.click(6);
		assert_eq!(sort.direction, SortDirection::Ascending);

		sort.click(5);
		assert_eq!(sort.column, 5);
		assert_eq!(sort.direction, SortDirection::Ascending);
		assert_eq!(order(&table, sort), [2, 0, 1, 3].map(SelectableId::Processor));
	}

	#[test]
	fn text_columns_sort_lexicographically() {
		let table = processor_table();
		let sort = TableSort {
			column: 2,
			direction: SortDirection::Ascending,
		};
		assert_eq!(order(&table, sort), [2, 3, 0, 1].map(SelectableId::Processor));
	}

	#[test]
	fn edges_without_stats_are_left_out() {
		let mut plan = sample_plan();
		let table = Table::edges(&plan);
		assert_eq!(table.rows.len(), 1);
		assert_eq!(table.rows[0].id, SelectableId::Edge { source: 0, dest: 2 });
		assert_eq!(table.rows[0].cells[0].display("Id"), "0-2");
		assert_eq!(table.rows[0].cells[3].display("network latency"), "120µs");
		assert_eq!(table.rows[0].cells[7].display("network bytes received"), "1.0 MiB");

		plan.edges[1].stats = Some(vec!["network latency: 1ms".into()]);
		let table = Table::edges(&plan);
		assert_eq!(table.rows.len(), 2);
		assert_eq!(
			order(&table, table.initial_sort()),
			[
				SelectableId::Edge { source: 1, dest: 2 },
				SelectableId::Edge { source: 0, dest: 2 },
			]
		);
	}

	fn single_column(cells: Vec<Cell>, metric_start: usize) -> Table {
		Table {
			columns: &["value"],
			metric_start,
			rows: cells
				.into_iter()
				.enumerate()
				.map(|(i, c)| Row {
					id: SelectableId::Processor(i),
					cells: vec![c],
				})
				.collect(),
		}
	}

	#[test]
	fn unparsed_metrics_sort_with_missing_values() {
		let table = single_column(
			vec![
				Cell::Metric(Some(MetricValue::Number(5e6))),
				Cell::Metric(Some(MetricValue::Text("n/a".into()))),
				Cell::Metric(None),
				Cell::Metric(Some(MetricValue::Number(300.0))),
			],
			0,
		);
		assert_eq!(
			order(&table, table.initial_sort()),
			[0, 3, 1, 2].map(SelectableId::Processor)
		);
		let asc = TableSort {
			column: 0,
			direction: SortDirection::Ascending,
		};
		assert_eq!(order(&table, asc), [3, 0, 1, 2].map(SelectableId::Processor));
	}

	#[test]
	fn numbers_sort_before_text() {
		// An info column keeps text and orders it after numbers.
		let table = single_column(
			vec![
				Cell::Text("b".into()),
				Cell::Metric(None),
				Cell::Count(5),
				Cell::Text("a".into()),
			],
			1,
		);
		let asc = TableSort {
			column: 0,
			direction: SortDirection::Ascending,
		};
		assert_eq!(order(&table, asc), [2, 3, 0, 1].map(SelectableId::Processor));
		let desc = TableSort {
			column: 0,
			direction: SortDirection::Descending,
		};
		assert_eq!(order(&table, desc), [0, 3, 2, 1].map(SelectableId::Processor));
	}

	proptest! {
		#[test]
		fn three_clicks_return_to_ascending(start in 0usize..15, column in 0usize..15) {
			let mut sort = TableSort { column: start, direction: SortDirection::Descending };
			sort.click(column);
			let first = sort.direction;
			sort.click(column);
			sort.click(column);
			prop_assert_eq!(sort.column, column);
			prop_assert_eq!(sort.direction, first);
			sort.click(column);
			prop_assert_eq!(sort.direction, first.flipped());
		}
	}
}
