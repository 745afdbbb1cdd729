use leptos::prelude::*;

/// The mutually exclusive views of a plan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
	#[default]
	Graph,
	Table,
	Sql,
	Plan,
}

impl View {
	pub const ALL: [View; 4] = [View::Graph, View::Table, View::Sql, View::Plan];

	pub fn label(self) -> &'static str {
		match self {
			View::Graph => "Graph",
			View::Table => "Table",
			View::Sql => "SQL",
			View::Plan => "Plan",
		}
	}
}

#[component]
pub fn ViewTabs(active: RwSignal<View>) -> impl IntoView {
	view! {
		<nav class="view-tabs">
			{View::ALL
				.into_iter()
				.map(|v| {
					view! {
						<button class:active=move || active.get() == v on:click=move |_| active.set(v)>
							{v.label()}
						</button>
					}
				})
				.collect_view()}
		</nav>
	}
}
