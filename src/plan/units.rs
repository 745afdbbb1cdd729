//! Normalization of human-formatted metric values.
//!
//! Metrics arrive as display strings in whatever unit the producer picked
//! (`"2ms"`, `"1.5s"`, `"20 KiB"`, `"12,345"`). [`normalize`] turns them into a
//! single comparable magnitude: microseconds for durations, bytes for sizes,
//! plain numbers otherwise. [`human_format`] goes the other way for display.

use std::fmt;

/// A normalized metric: a comparable number, or the raw text when no numeric
/// reading applies.
#[derive(Clone, Debug, PartialEq)]
pub enum MetricValue {
	Number(f64),
	Text(String),
}

/// How a metric's magnitude should be displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
	/// Microseconds
	Duration,
	Bytes,
	Count,
}

const DURATION_METRICS: &[&str] = &[
	"execution time",
	"KV time",
	"KV contention time",
	"network latency",
	"network wait time",
	"deserialization time",
	"cumulative time spent in the KV layer",
	"cumulative time spent waiting in the KV layer",
];

const BYTE_METRICS: &[&str] = &[
	"max memory allocated",
	"max scratch disk allocated",
	"max sql temp disk usage",
	"max disk allocated",
	"KV bytes read",
	"network bytes received",
	"network bytes sent",
	"bytes read",
	"bytes sent",
];

const BINARY_UNITS: &[(&str, i32)] = &[("TiB", 4), ("GiB", 3), ("MiB", 2), ("KiB", 1)];

const MICROS_PER_MINUTE: f64 = 60_000_000.0;
const MICROS_PER_SECOND: f64 = 1_000_000.0;
const MICROS_PER_MILLI: f64 = 1_000.0;

/// Returns the display kind for a metric name.
pub fn metric_kind(name: &str) -> MetricKind {
	if DURATION_METRICS.contains(&name) {
		MetricKind::Duration
	} else if BYTE_METRICS.contains(&name) {
		MetricKind::Bytes
	} else {
		MetricKind::Count
	}
}

/// Converts a raw metric string into a comparable value.
///
/// Never fails: anything without a numeric reading comes back as
/// [`MetricValue::Text`] holding the input unchanged.
pub fn normalize(raw: &str) -> MetricValue {
	let v = raw.trim();

	if v.ends_with('s') {
		if let Some(micros) = parse_duration(v) {
			return MetricValue::Number(micros);
		}
	}

	for &(suffix, power) in BINARY_UNITS {
		if let Some(n) = v.strip_suffix(suffix).and_then(parse_number) {
			return MetricValue::Number((n * 1024f64.powi(power)).trunc());
		}
	}
	if let Some(n) = v.strip_suffix('B').and_then(parse_number) {
		return MetricValue::Number(n.trunc());
	}

	match parse_number(v) {
		Some(n) => MetricValue::Number(n),
		None => MetricValue::Text(raw.to_string()),
	}
}

impl MetricValue {
	pub fn as_number(&self) -> Option<f64> {
		match self {
			MetricValue::Number(n) => Some(*n),
			MetricValue::Text(_) => None,
		}
	}

	/// Numeric values above zero; the only values that get colored.
	pub fn positive(&self) -> Option<f64> {
		self.as_number().filter(|n| *n > 0.0)
	}

	/// Re-normalizes a value. Numbers pass through untouched.
	pub fn normalized(self) -> MetricValue {
		match self {
			MetricValue::Number(_) => self,
			MetricValue::Text(raw) => normalize(&raw),
		}
	}
}

impl From<f64> for MetricValue {
	fn from(n: f64) -> Self {
		MetricValue::Number(n)
	}
}

impl fmt::Display for MetricValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MetricValue::Number(n) => f.write_str(&trim_float(*n)),
			MetricValue::Text(s) => f.write_str(s),
		}
	}
}

/// Formats a normalized magnitude for display in the unit its metric uses.
pub fn human_format(metric: &str, value: f64) -> String {
	match metric_kind(metric) {
		MetricKind::Duration => human_duration(value),
		MetricKind::Bytes => human_bytes(value),
		MetricKind::Count => human_count(value),
	}
}

/// Picks the unit after rounding, so `999.7ms` shows as `1.0s` and not
/// `1000ms`.
pub fn human_duration(micros: f64) -> String {
	let seconds = micros / MICROS_PER_SECOND;
	if micros >= MICROS_PER_MINUTE || round_tenths(seconds) >= 60.0 {
		format!("{:.1}m", micros / MICROS_PER_MINUTE)
	} else if micros >= MICROS_PER_SECOND || (micros / MICROS_PER_MILLI).round() >= 1000.0 {
		format!("{seconds:.1}s")
	} else if micros >= MICROS_PER_MILLI {
		format!("{:.0}ms", micros / MICROS_PER_MILLI)
	} else {
		format!("{}µs", trim_float(micros))
	}
}

pub fn human_bytes(bytes: f64) -> String {
	if bytes.abs() < 1024.0 {
		return format!("{} B", trim_float(bytes));
	}
	let (scaled, unit) = scale_units(bytes, 1024.0, &["KiB", "MiB", "GiB", "TiB"]);
	format!("{scaled:.1} {unit}")
}

pub fn human_count(n: f64) -> String {
	if n.abs() < 1000.0 {
		return trim_float(n);
	}
	let (scaled, unit) = scale_units(n, 1000.0, &["K", "M", "G", "T"]);
	format!("{scaled:.1}{unit}")
}

/// Divides by `base` until the value, rounded to one decimal, stays below
/// `base` or the units run out.
fn scale_units(value: f64, base: f64, units: &[&'static str]) -> (f64, &'static str) {
	let mut scaled = value / base;
	let mut unit = 0;
	while round_tenths(scaled).abs() >= base && unit + 1 < units.len() {
		scaled /= base;
		unit += 1;
	}
	(scaled, units[unit])
}

fn round_tenths(n: f64) -> f64 {
	(n * 10.0).round() / 10.0
}

/// Parses a number that may carry thousands separators. Non-finite readings
/// are rejected.
fn parse_number(s: &str) -> Option<f64> {
	let s = s.trim();
	if s.is_empty() {
		return None;
	}
	let n: f64 = if s.contains(',') {
		s.replace(',', "").parse().ok()?
	} else {
		s.parse().ok()?
	};
	n.is_finite().then_some(n)
}

/// Parses a duration such as `"300µs"`, `"2ms"`, `"1.5s"` or the composite
/// `"1h2m3.5s"` form, returning microseconds.
fn parse_duration(s: &str) -> Option<f64> {
	let mut rest = s.trim();
	let mut total = 0.0;
	let mut parsed_any = false;

	while !rest.is_empty() {
		let num_len = rest
			.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
			.unwrap_or(rest.len());
		let number = parse_number(&rest[..num_len])?;
		rest = rest[num_len..].trim_start();

		let unit_len = rest
			.find(|c: char| c.is_ascii_digit() || c == '.' || c.is_whitespace())
			.unwrap_or(rest.len());
		let factor = match &rest[..unit_len] {
			"h" => 60.0 * MICROS_PER_MINUTE,
			"m" => MICROS_PER_MINUTE,
			"s" => MICROS_PER_SECOND,
			"ms" => MICROS_PER_MILLI,
			"µs" | "us" => 1.0,
			"ns" => 0.001,
			_ => return None,
		};
		total += number * factor;
		parsed_any = true;
		rest = rest[unit_len..].trim_start();
	}

	parsed_any.then_some(total)
}

fn trim_float(n: f64) -> String {
	if n.fract() == 0.0 && n.abs() < 1e15 {
		format!("{}", n as i64)
	} else {
		format!("{n}")
	}
}
