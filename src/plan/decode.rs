use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use flate2::read::ZlibDecoder;
use log::debug;

use super::Plan;
use crate::error::Result;

/// Decodes a plan from a URL fragment.
///
/// The fragment is URL-safe base64 of a zlib stream holding the plan JSON.
/// An empty fragment (with or without the leading `#`) means no plan was
/// supplied and yields `Ok(None)`.
pub fn decode_fragment(fragment: &str) -> Result<Option<Plan>> {
	let encoded = fragment.strip_prefix('#').unwrap_or(fragment).trim();
	if encoded.is_empty() {
		return Ok(None);
	}

	// Browsers may hand back the standard alphabet or keep padding.
	let normalized: String = encoded
		.chars()
		.filter(|c| *c != '=')
		.map(|c| match c {
			'+' => '-',
			'/' => '_',
			c => c,
		})
		.collect();
	let compressed = URL_SAFE_NO_PAD.decode(normalized.as_bytes())?;

	let mut inflated = Vec::new();
	ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut inflated)?;
	debug!(
		"inflated plan payload: {} -> {} bytes",
		compressed.len(),
		inflated.len()
	);

	let text = String::from_utf8(inflated)?;
	parse_plan(&text).map(Some)
}

/// Parses and validates plan JSON text.
pub fn parse_plan(text: &str) -> Result<Plan> {
	let plan: Plan = serde_json::from_str(text)?;
	plan.validate()?;
	Ok(plan)
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use base64::engine::general_purpose::{STANDARD, URL_SAFE};
	use flate2::Compression;
	use flate2::write::ZlibEncoder;

	use super::*;
	use crate::error::ViewerError;
	use crate::plan::tests::sample_plan;

	fn compress(text: &str) -> Vec<u8> {
		let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
		encoder.write_all(text.as_bytes()).unwrap();
		encoder.finish().unwrap()
	}

	#[test]
	fn empty_fragment_is_not_an_error() {
		assert_eq!(decode_fragment(""), Ok(None));
		assert_eq!(decode_fragment("#"), Ok(None));
	}

	#[test]
	fn decodes_url_safe_fragment() {
		let plan = sample_plan();
		let json = serde_json::to_string(&plan).unwrap();
		let fragment = format!("#{}", URL_SAFE.encode(compress(&json)));
		assert_eq!(decode_fragment(&fragment), Ok(Some(plan)));
	}

	#[test]
	fn accepts_standard_alphabet() {
		let plan = sample_plan();
		let json = serde_json::to_string(&plan).unwrap();
		let fragment = STANDARD.encode(compress(&json));
		assert_eq!(decode_fragment(&fragment), Ok(Some(plan)));
	}

	#[test]
	fn malformed_payloads_fail_loudly() {
		assert!(matches!(decode_fragment("#!!!"), Err(ViewerError::Base64(_))));

		let not_zlib = URL_SAFE.encode(b"plain text, not deflated");
		assert!(matches!(
			decode_fragment(&not_zlib),
			Err(ViewerError::Inflate(_))
		));

		let not_json = URL_SAFE.encode(compress("{\"processors\": ["));
		assert!(matches!(decode_fragment(&not_json), Err(ViewerError::Json(_))));
	}

	#[test]
	fn invalid_indices_fail_parse() {
		let mut plan = sample_plan();
		plan.edges[0].dest_proc = 42;
		let json = serde_json::to_string(&plan).unwrap();
		assert!(matches!(
			parse_plan(&json),
			Err(ViewerError::IndexOutOfRange { .. })
		));
	}
}
