use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::PlanGraphState;
use crate::components::tooltip::TooltipContent;
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::layout::Point;
use crate::session::Session;

const FRAME_SECONDS: f64 = 0.016;

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d> {
	canvas
		.get_context("2d")
		.map_err(|e| ViewerError::Dom(format!("{e:?}")))?
		.ok_or_else(|| ViewerError::Dom("canvas has no 2d context".into()))?
		.dyn_into()
		.map_err(|_| ViewerError::Dom("2d context has an unexpected type".into()))
}

/// Pointer position relative to the canvas.
fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Full-window canvas drawing the loaded plan. Rebuilds its layout whenever
/// the session starts a new generation.
#[component]
pub fn PlanGraphCanvas(
	session: RwSignal<Session>,
	config: ViewerConfig,
	tooltip: RwSignal<Option<TooltipContent>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<PlanGraphState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());
	let generation = Memo::new(move |_| session.with(Session::generation));

	Effect::new(move |_| {
		generation.track();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let Some((w, h)) = window_size(&window) else {
			return;
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = match context_2d(&canvas) {
			Ok(ctx) => ctx,
			Err(e) => {
				session.update(|s| s.fail(e));
				return;
			}
		};

		let next = session
			.with_untracked(|s| s.loaded().cloned())
			.and_then(|loaded| match PlanGraphState::new(loaded, &config, w, h) {
				Ok(state) => Some(state),
				Err(e) => {
					session.update(|s| s.fail(e));
					None
				}
			});
		*state_init.borrow_mut() = next;
		tooltip.set(None);

		if resize_cb_init.borrow().is_none() {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				if let Err(e) =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())
				{
					error!("cannot listen for resizes: {e:?}");
				}
			}
		}

		if animate_init.borrow().is_none() {
			let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
			*animate_init.borrow_mut() = Some(Closure::new(move || {
				match *state_anim.borrow_mut() {
					Some(ref mut s) => {
						s.tick(FRAME_SECONDS);
						session.with_untracked(|sess| render::render(s, sess.selection(), &ctx));
					}
					None => {
						let canvas = ctx.canvas();
						let (cw, ch) = canvas.map_or((0.0, 0.0), |c| (c.width() as f64, c.height() as f64));
						ctx.clear_rect(0.0, 0.0, cw, ch);
					}
				}
				if let (Some(window), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
					let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
				}
			}));
			if let Some(ref cb) = *animate_init.borrow() {
				let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(at);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			if s.pointer_move(at) {
				tooltip.set(s.hover.target.and_then(|hit| s.tooltip(hit, at)));
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		let picked = state_mu.borrow_mut().as_mut().and_then(PlanGraphState::pointer_up);
		if let Some(id) = picked {
			session.update(|s| {
				s.toggle(id);
			});
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
		tooltip.set(None);
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(at) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom(at, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="plan-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
