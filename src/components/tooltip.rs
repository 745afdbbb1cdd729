use leptos::prelude::*;

/// Offset of the tooltip from the pointer, in pixels.
const POINTER_OFFSET: f64 = 12.0;

#[derive(Clone, Debug, PartialEq)]
pub struct TooltipContent {
	/// Pointer position relative to the canvas
	pub x: f64,
	pub y: f64,
	pub title: String,
	pub lines: Vec<String>,
}

/// Splits a `key: value` line into its two columns. Lines without the
/// separator only fill the value column.
pub fn split_line(line: &str) -> (Option<&str>, &str) {
	match line.split_once(": ") {
		Some((key, value)) => (Some(key), value),
		None => (None, line),
	}
}

#[component]
pub fn Tooltip(#[prop(into)] content: Signal<Option<TooltipContent>>) -> impl IntoView {
	move || {
		content.get().map(|c| {
			let style = format!(
				"position: absolute; left: {}px; top: {}px; pointer-events: none;",
				c.x + POINTER_OFFSET,
				c.y + POINTER_OFFSET
			);
			let rows = c
				.lines
				.iter()
				.map(|line| {
					let (key, value) = split_line(line);
					let (key, value) = (key.unwrap_or_default().to_string(), value.to_string());
					view! {
						<tr>
							<td class="tooltip-key">{key}</td>
							<td class="tooltip-value">{value}</td>
						</tr>
					}
				})
				.collect_view();
			view! {
				<div class="tooltip" style=style>
					<table class="tooltip">
						<thead>
							<tr>
								<th colspan="2">{c.title}</th>
							</tr>
						</thead>
						<tbody>{rows}</tbody>
					</table>
				</div>
			}
		})
	}
}
