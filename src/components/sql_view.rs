use leptos::prelude::*;

use crate::session::Session;

#[component]
pub fn SqlView(session: RwSignal<Session>) -> impl IntoView {
	let sql = move || {
		session.with(|s| s.loaded().map(|l| l.sql.clone()).unwrap_or_default())
	};
	view! { <pre class="sql">{sql}</pre> }
}
