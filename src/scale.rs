//! Color scales shared by the graph and table views.

use std::f64::consts::PI;
use std::fmt;

/// Fill for groups, keyed by cluster node.
pub const CATEGORY_COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Nine-class sequential reds, light to dark.
const REDS: &[Rgb] = &[
	Rgb::hex(0xfff5f0),
	Rgb::hex(0xfee0d2),
	Rgb::hex(0xfcbba1),
	Rgb::hex(0xfc9272),
	Rgb::hex(0xfb6a4a),
	Rgb::hex(0xef3b2c),
	Rgb::hex(0xcb181d),
	Rgb::hex(0xa50f15),
	Rgb::hex(0x67000d),
];

/// Orders of magnitude mapped onto the full reds range.
pub const MAGNITUDE_SPAN: f64 = 10.0;

/// Backgrounds lighter than this get black text.
const LUMINANCE_THRESHOLD: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Rgb {
	pub const fn hex(rgb: u32) -> Self {
		Rgb {
			r: ((rgb >> 16) & 0xff) as u8,
			g: ((rgb >> 8) & 0xff) as u8,
			b: (rgb & 0xff) as u8,
		}
	}

	fn from_unit(r: f64, g: f64, b: f64) -> Self {
		let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
		Rgb {
			r: channel(r),
			g: channel(g),
			b: channel(b),
		}
	}

	/// Relative luminance in `[0, 1]`.
	pub fn luminance(&self) -> f64 {
		let lin = |c: u8| {
			let c = c as f64 / 255.0;
			if c <= 0.03928 {
				c / 12.92
			} else {
				((c + 0.055) / 1.055).powf(2.4)
			}
		};
		0.2126 * lin(self.r) + 0.7152 * lin(self.g) + 0.0722 * lin(self.b)
	}

	/// Label color that stays legible on this background.
	pub fn text_color(&self) -> &'static str {
		if self.luminance() > LUMINANCE_THRESHOLD {
			"black"
		} else {
			"white"
		}
	}

	fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
		let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
		Rgb {
			r: mix(a.r, b.r),
			g: mix(a.g, b.g),
			b: mix(a.b, b.b),
		}
	}
}

impl fmt::Display for Rgb {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

/// Sequential reds for `t` in `[0, 1]`.
pub fn interpolate_reds(t: f64) -> Rgb {
	let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
	let scaled = t * (REDS.len() - 1) as f64;
	let i = (scaled.floor() as usize).min(REDS.len() - 2);
	Rgb::lerp(REDS[i], REDS[i + 1], scaled - i as f64)
}

/// Cyclical cubehelix rainbow for `t` in `[0, 1]`.
pub fn interpolate_rainbow(t: f64) -> Rgb {
	let t = t - t.floor();
	let ts = (t - 0.5).abs();
	let h = 360.0 * t - 100.0;
	let s = 1.5 - 1.5 * ts;
	let l = 0.8 - 0.9 * ts;

	let h = (h + 120.0) * PI / 180.0;
	let a = s * l * (1.0 - l);
	let (cos_h, sin_h) = (h.cos(), h.sin());
	Rgb::from_unit(
		l + a * (-0.14861 * cos_h + 1.78277 * sin_h),
		l + a * (-0.29227 * cos_h - 0.90649 * sin_h),
		l + a * (1.97294 * cos_h),
	)
}

/// Rounded order of magnitude of a positive value.
pub fn magnitude(value: f64) -> Option<i32> {
	(value > 0.0 && value.is_finite()).then(|| value.log10().round() as i32)
}

/// Heat color for a metric value; `None` for values that are not colored.
pub fn magnitude_color(value: f64) -> Option<Rgb> {
	magnitude(value).map(|m| interpolate_reds(m as f64 / MAGNITUDE_SPAN))
}

pub fn category_color(i: usize) -> &'static str {
	CATEGORY_COLORS[i % CATEGORY_COLORS.len()]
}
