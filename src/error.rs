//! Error types for loading and laying out a plan.

use thiserror::Error;

/// Failures surfaced while loading, validating or laying out a plan.
///
/// Payload-carrying variants hold rendered messages so the error can live in
/// reactive state and be cloned into views.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
	/// The URL fragment is not valid base64
	#[error("Plan payload is not valid base64: {0}")]
	Base64(String),

	/// The decoded payload could not be inflated
	#[error("Plan payload could not be decompressed: {0}")]
	Inflate(String),

	/// The inflated payload is not UTF-8 text
	#[error("Plan payload is not UTF-8 text: {0}")]
	Utf8(String),

	/// The plan text is not a valid plan document
	#[error("Plan is not valid JSON: {0}")]
	Json(String),

	/// A processor or edge references something that does not exist
	#[error("{entity}: {field} {index} is out of range (have {len})")]
	IndexOutOfRange {
		entity: String,
		field: &'static str,
		index: usize,
		len: usize,
	},

	/// The processor graph handed to the layered layout has a cycle
	#[error("Plan contains a cycle through processor {0}")]
	Cycle(usize),

	/// A browser API call failed
	#[error("DOM error: {0}")]
	Dom(String),
}

impl From<base64::DecodeError> for ViewerError {
	fn from(err: base64::DecodeError) -> Self {
		ViewerError::Base64(err.to_string())
	}
}

impl From<std::io::Error> for ViewerError {
	fn from(err: std::io::Error) -> Self {
		ViewerError::Inflate(err.to_string())
	}
}

impl From<std::string::FromUtf8Error> for ViewerError {
	fn from(err: std::string::FromUtf8Error) -> Self {
		ViewerError::Utf8(err.to_string())
	}
}

impl From<serde_json::Error> for ViewerError {
	fn from(err: serde_json::Error) -> Self {
		ViewerError::Json(err.to_string())
	}
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ViewerError>;
