use leptos::prelude::*;
use leptos_router::hooks::use_query_map;
use log::warn;

use crate::components::plan_editor::PlanEditor;
use crate::components::plan_graph::PlanGraphCanvas;
use crate::components::plan_tables::PlanTables;
use crate::components::sql_view::SqlView;
use crate::components::tooltip::{Tooltip, TooltipContent};
use crate::components::view_tabs::{View, ViewTabs};
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::session::Session;

fn location_fragment() -> String {
	window().location().hash().unwrap_or_else(|err| {
		warn!("Could not read the location fragment: {err:?}");
		String::new()
	})
}

/// Plan viewer page. The plan comes from the URL fragment and the layout
/// options from the query string.
#[component]
pub fn Home() -> impl IntoView {
	let query = use_query_map();
	let config = query.with_untracked(|q| ViewerConfig::from_query(|key| q.get(key)));

	let session = RwSignal::new(Session::new(config.max_detail_rows));
	let active = RwSignal::new(View::Graph);
	let tooltip = RwSignal::new(None::<TooltipContent>);

	let fragment = location_fragment();
	let mut shown = false;
	session.update(|s| shown = matches!(s.load_fragment(&fragment), Ok(true)));
	if !shown {
		active.set(View::Plan);
	}

	// Errors always surface next to the editor.
	Effect::new(move |_| {
		if session.with(|s| s.error().is_some()) {
			active.set(View::Plan);
		}
	});
	Effect::new(move |_| {
		if active.get() != View::Graph {
			tooltip.set(None);
		}
	});

	let status = move || -> Result<(), ViewerError> {
		session.with(|s| s.error().cloned().map_or(Ok(()), Err))
	};
	let panel = move |view: View| {
		move || if active.get() == view { "block" } else { "none" }
	};

	view! {
		<div class="fullscreen-graph">
			<PlanGraphCanvas session config tooltip />
			<div class="graph-overlay">
				<h1>"Distributed SQL Plan"</h1>
				<ViewTabs active />
				<ErrorBoundary fallback=|errors| {
					view! {
						<div class="plan-error">
							<p>"The plan could not be shown:"</p>
							<ul>
								{move || {
									errors
										.get()
										.into_iter()
										.map(|(_, e)| view! { <li>{e.to_string()}</li> })
										.collect_view()
								}}
							</ul>
						</div>
					}
				}>{status}</ErrorBoundary>
			</div>
			<Tooltip content=tooltip />
			<div class="panel" style:display=panel(View::Table)>
				<PlanTables session />
			</div>
			<div class="panel" style:display=panel(View::Sql)>
				<SqlView session />
			</div>
			<div class="panel" style:display=panel(View::Plan)>
				<PlanEditor session active />
			</div>
		</div>
	}
}
