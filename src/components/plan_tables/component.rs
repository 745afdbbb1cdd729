use leptos::prelude::*;

use super::rows::{Cell, Row, SortDirection, Table};
use crate::session::Session;

/// Processor and edge tables of the loaded plan.
#[component]
pub fn PlanTables(session: RwSignal<Session>) -> impl IntoView {
	let generation = Memo::new(move |_| session.with(Session::generation));
	let tables = Memo::new(move |_| {
		generation.track();
		session.with_untracked(|s| {
			s.loaded()
				.map(|l| (Table::processors(&l.plan, &l.model), Table::edges(&l.plan)))
		})
	});

	view! {
		<div class="plan-tables">
			{move || {
				tables
					.get()
					.map(|(processors, edges)| {
						view! {
							<h2>"Processors"</h2>
							<DataTable session table=processors />
							<h2>"Edges"</h2>
							<DataTable session table=edges />
						}
					})
			}}
		</div>
	}
}

#[component]
fn DataTable(session: RwSignal<Session>, table: Table) -> impl IntoView {
	let sort = RwSignal::new(table.initial_sort());
	let metric_start = table.metric_start;
	let table = StoredValue::new(table);

	let header = table.with_value(|t| {
		t.columns
			.iter()
			.enumerate()
			.map(|(i, name)| {
				let name = *name;
				let marker = move || {
					let s = sort.get();
					match (s.column == i, s.direction) {
						(false, _) => "",
						(true, SortDirection::Ascending) => " ▲",
						(true, SortDirection::Descending) => " ▼",
					}
				};
				view! {
					<th class:metric={i >= metric_start} on:click=move |_| sort.update(|s| s.click(i))>
						{name}
						{marker}
					</th>
				}
			})
			.collect_view()
	});

	let body = move || {
		let sort = sort.get();
		table.with_value(|t| {
			t.sorted(sort)
				.into_iter()
				.map(|row| table_row(session, t.columns, row))
				.collect_view()
		})
	};

	view! {
		<table class="details">
			<thead>
				<tr>{header}</tr>
			</thead>
			<tbody>{body}</tbody>
		</table>
	}
}

fn table_row(session: RwSignal<Session>, columns: &[&str], row: &Row) -> impl IntoView + use<> {
	let cells = row
		.cells
		.iter()
		.zip(columns)
		.map(|(cell, column)| {
			let text = cell.display(column);
			match cell {
				Cell::Id(id, _) => {
					let id = *id;
					let style = move || {
						session
							.with(|s| s.selection().color_of(&id))
							.map(|c| format!("background-color: {c}; color: {}", c.text_color()))
							.unwrap_or_default()
					};
					view! {
						<td
							class="selector"
							style=style
							on:click=move |_| {
								session
									.update(|s| {
										s.toggle(id);
									})
							}
						>
							{text}
						</td>
					}
						.into_any()
				}
				_ => {
					let style = cell
						.color()
						.map(|c| format!("background-color: {c}; color: {}", c.text_color()))
						.unwrap_or_default();
					view! { <td style=style>{text}</td> }.into_any()
				}
			}
		})
		.collect_view();
	view! { <tr>{cells}</tr> }
}
