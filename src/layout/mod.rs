//! Layout strategies behind one interface.
//!
//! The constraint strategy iterates a force simulation and is advanced once
//! per animation frame; the layered strategy is computed in one shot. Both
//! report node boxes, group boxes and edge routes through [`LayoutFrame`].

mod constraint;
pub mod geometry;
mod layered;

use std::fmt;
use std::str::FromStr;

use log::info;

pub use constraint::ConstraintLayout;
pub use geometry::{Point, Rect};
pub use layered::LayeredLayout;

use crate::config::{Margin, ViewerConfig};
use crate::error::Result;
use crate::model::{GraphModel, NodeId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayoutKind {
	/// Grouped force layout with alignment constraints
	#[default]
	Constraint,
	/// Top-down layered DAG of processors
	Layered,
}

impl FromStr for LayoutKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"constraint" | "grouped" | "cola" => Ok(LayoutKind::Constraint),
			"layered" | "dag" | "sugiyama" => Ok(LayoutKind::Layered),
			other => Err(format!("unknown layout `{other}`")),
		}
	}
}

impl fmt::Display for LayoutKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			LayoutKind::Constraint => "constraint",
			LayoutKind::Layered => "layered",
		})
	}
}

/// Pan/zoom transform from layout space to screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		ViewTransform {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn to_screen(&self, p: Point) -> Point {
		Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
	}

	pub fn to_layout(&self, p: Point) -> Point {
		Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
	}

	/// Zooms by `factor` around the screen point `at`, keeping the scale
	/// within `[min_k, max_k]`.
	pub fn zoom_at(&mut self, at: Point, factor: f64, min_k: f64, max_k: f64) {
		let k = (self.k * factor).clamp(min_k, max_k);
		let ratio = k / self.k;
		self.x = at.x - (at.x - self.x) * ratio;
		self.y = at.y - (at.y - self.y) * ratio;
		self.k = k;
	}
}

/// Screen area the diagram is fitted into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
	pub margin: Margin,
}

impl Viewport {
	/// Transform that centers `extent` in the viewport, scaled by `shrink`
	/// and never above `max_scale`.
	pub fn fit(&self, extent: Rect, shrink: f64, max_scale: f64) -> ViewTransform {
		let target_w = (self.width - self.margin.left - self.margin.right).max(1.0);
		let target_h = (self.height - self.margin.top - self.margin.bottom).max(1.0);
		let scale_x = if extent.width > 0.0 {
			target_w / extent.width
		} else {
			f64::INFINITY
		};
		let scale_y = if extent.height > 0.0 {
			target_h / extent.height
		} else {
			f64::INFINITY
		};
		let k = (scale_x.min(scale_y) * shrink).min(max_scale);
		let center = extent.center();
		ViewTransform {
			x: self.margin.left + target_w / 2.0 - center.x * k,
			y: self.margin.top + target_h / 2.0 - center.y * k,
			k,
		}
	}
}

/// Placed geometry of one edge; the last point is the arrow tip.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeRoute {
	pub points: Vec<Point>,
}

impl EdgeRoute {
	pub fn tip(&self) -> Option<Point> {
		self.points.last().copied()
	}

	/// Unit direction of the final segment.
	pub fn end_direction(&self) -> Option<(f64, f64)> {
		let [.., a, b] = self.points.as_slice() else {
			return None;
		};
		let d = a.distance(*b);
		(d > 1e-9).then(|| ((b.x - a.x) / d, (b.y - a.y) / d))
	}
}

/// Geometry of the current layout iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutFrame {
	/// Completed iterations
	pub tick: u32,
	/// Box per model node; `None` for nodes the strategy does not place
	pub nodes: Vec<Option<Rect>>,
	/// Box per cluster group; `None` for empty groups
	pub groups: Vec<Option<Rect>>,
	/// Route per model link; `None` for links that are not drawn
	pub routes: Vec<Option<EdgeRoute>>,
	/// Extent of everything drawn
	pub extent: Option<Rect>,
	/// Set once the strategy knows how to fit the diagram on screen
	pub initial_transform: Option<ViewTransform>,
}

impl LayoutFrame {
	pub fn node(&self, id: NodeId) -> Option<&Rect> {
		self.nodes.get(id.0).and_then(Option::as_ref)
	}
}

pub trait LayoutEngine {
	/// Advances the layout one iteration. No-op once converged.
	fn tick(&mut self);

	fn is_converged(&self) -> bool;

	fn frame(&self) -> &LayoutFrame;

	/// Pins a node at a layout-space position.
	fn drag_node(&mut self, _id: NodeId, _to: Point) {}

	fn kind(&self) -> LayoutKind;
}

/// Creates the configured layout strategy for a model.
pub fn create_layout(
	model: &GraphModel,
	config: &ViewerConfig,
	width: f64,
	height: f64,
) -> Result<Box<dyn LayoutEngine>> {
	let viewport = Viewport {
		width,
		height,
		margin: config.margin,
	};
	info!("laying out {} nodes with the {} layout", model.nodes.len(), config.layout);
	Ok(match config.layout {
		LayoutKind::Constraint => Box::new(ConstraintLayout::new(model, viewport)),
		LayoutKind::Layered => Box::new(LayeredLayout::new(model, viewport, config.direction)?),
	})
}
