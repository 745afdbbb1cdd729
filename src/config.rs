//! Viewer settings: defaults, overridable from the page's query string.
//!
//! | key         | values                  | default      |
//! |-------------|-------------------------|--------------|
//! | `layout`    | `constraint`, `layered` | `constraint` |
//! | `direction` | `down`, `up`            | `down`       |
//! | `rows`      | detail rows per node    | `10`         |

use std::str::FromStr;

use log::warn;

use crate::layout::LayoutKind;

pub const DEFAULT_MAX_DETAIL_ROWS: usize = 10;
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// Flow direction of the layered layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayeredDirection {
	/// Sources at the top
	#[default]
	Down,
	/// Sources at the bottom
	Up,
}

impl FromStr for LayeredDirection {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"down" | "tb" => Ok(LayeredDirection::Down),
			"up" | "bt" => Ok(LayeredDirection::Up),
			other => Err(format!("unknown direction `{other}`")),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Margin {
	pub top: f64,
	pub right: f64,
	pub bottom: f64,
	pub left: f64,
}

impl Margin {
	pub const fn uniform(m: f64) -> Self {
		Margin {
			top: m,
			right: m,
			bottom: m,
			left: m,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
	pub layout: LayoutKind,
	pub direction: LayeredDirection,
	pub max_detail_rows: usize,
	pub margin: Margin,
	pub min_zoom: f64,
	pub max_zoom: f64,
}

impl Default for ViewerConfig {
	fn default() -> Self {
		ViewerConfig {
			layout: LayoutKind::default(),
			direction: LayeredDirection::default(),
			max_detail_rows: DEFAULT_MAX_DETAIL_ROWS,
			margin: Margin::uniform(20.0),
			min_zoom: MIN_ZOOM,
			max_zoom: MAX_ZOOM,
		}
	}
}

impl ViewerConfig {
	/// Applies query-string overrides. Unparseable values keep the default.
	pub fn from_query(lookup: impl Fn(&str) -> Option<String>) -> Self {
		let mut config = ViewerConfig::default();
		if let Some(layout) = parse_key(&lookup, "layout") {
			config.layout = layout;
		}
		if let Some(direction) = parse_key(&lookup, "direction") {
			config.direction = direction;
		}
		if let Some(rows) = parse_key(&lookup, "rows") {
			config.max_detail_rows = rows;
		}
		config
	}
}

fn parse_key<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	let raw = lookup(key)?;
	match raw.parse() {
		Ok(v) => Some(v),
		Err(e) => {
			warn!("ignoring `{key}={raw}`: {e}");
			None
		}
	}
}
