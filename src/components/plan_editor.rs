use leptos::prelude::*;

use super::view_tabs::View;
use crate::session::Session;

/// Editable plan JSON. "Refresh" reloads the session from the text and
/// shows the graph when the plan is valid.
#[component]
pub fn PlanEditor(session: RwSignal<Session>, active: RwSignal<View>) -> impl IntoView {
	let text = RwSignal::new(String::new());
	let generation = Memo::new(move |_| session.with(Session::generation));

	// Each successful load replaces the text; failed ones keep the user's edit.
	Effect::new(move |_| {
		generation.track();
		if let Some(json) = session.with_untracked(|s| s.loaded().map(|l| l.json.clone())) {
			text.set(json);
		}
	});

	let refresh = move |_| {
		let mut ok = false;
		session.update(|s| ok = text.with_untracked(|t| s.load_text(t)).is_ok());
		if ok {
			active.set(View::Graph);
		}
	};

	view! {
		<div class="plan-editor">
			<button class="refresh" on:click=refresh>
				"Refresh"
			</button>
			<textarea
				class="plan-json"
				spellcheck="false"
				prop:value=move || text.get()
				on:input=move |ev| text.set(event_target_value(&ev))
			/>
		</div>
	}
}
