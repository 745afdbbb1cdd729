//! Interactive viewer for distributed SQL physical plans.
//!
//! A plan arrives as a compressed URL fragment or as pasted JSON. It is
//! normalized into a graph model, laid out by one of two engines and shown
//! as a canvas diagram next to sortable processor and edge tables that
//! share one selection.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod plan;
pub mod scale;
pub mod selection;
pub mod session;

mod components;
mod pages;

pub use components::plan_tables::rows;

use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// An app router which renders the plan viewer and handles 404's
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		<Title text="Distributed SQL Plan Viewer" />

		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
