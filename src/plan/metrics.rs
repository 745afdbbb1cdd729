//! Typed view over `key: value` detail lines.

use std::collections::HashMap;

use super::units::{MetricValue, normalize};

#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
	pub name: String,
	/// Value text as it appeared after the colon
	pub raw: String,
	pub value: MetricValue,
}

/// Detail lines parsed once per entity: named metrics in their original
/// order plus the lines that carry no `name: value` pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricMap {
	metrics: Vec<Metric>,
	text: Vec<String>,
	index: HashMap<String, usize>,
}

impl MetricMap {
	pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
		let mut map = MetricMap::default();
		for line in lines {
			let line = line.as_ref();
			match line.split_once(':') {
				Some((name, raw)) if !name.trim().is_empty() => {
					let name = name.trim().to_string();
					let raw = raw.trim().to_string();
					// First occurrence wins.
					map.index.entry(name.clone()).or_insert(map.metrics.len());
					map.metrics.push(Metric {
						value: normalize(&raw),
						name,
						raw,
					});
				}
				_ => map.text.push(line.to_string()),
			}
		}
		map
	}

	pub fn get(&self, name: &str) -> Option<&Metric> {
		self.index.get(name).map(|&i| &self.metrics[i])
	}

	pub fn value(&self, name: &str) -> Option<&MetricValue> {
		self.get(name).map(|m| &m.value)
	}

	pub fn iter(&self) -> impl Iterator<Item = &Metric> {
		self.metrics.iter()
	}

	/// Metrics with a positive numeric value, in detail-line order.
	pub fn numeric(&self) -> impl Iterator<Item = (&Metric, f64)> {
		self.metrics
			.iter()
			.filter_map(|m| m.value.positive().map(|v| (m, v)))
	}

	/// Lines without a `name: value` pair.
	pub fn text_lines(&self) -> &[String] {
		&self.text
	}

	pub fn len(&self) -> usize {
		self.metrics.len() + self.text.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
