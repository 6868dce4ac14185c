//! Serialization of Problems into `application/problem+json` bodies.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::problem::Problem;

/// Content type for Problem Details as per RFC 7807.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Problem content that cannot be rendered as strict JSON.
///
/// `serde_json`'s value model cannot represent NaN or Infinity, so the
/// renderer never emits non-standard tokens; what remains fatal is content
/// that cannot be converted into that model in the first place (e.g. maps
/// with non-string keys, or a failing `Serialize` impl).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerializationError {
    #[error("problem content cannot be rendered as strict JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render a Problem as JSON-serialized bytes.
///
/// Compact output (`,`/`:` separators, no whitespace) by default; 2-space
/// indented output when the Problem's `debug` flag is set. The two modes
/// differ only in byte layout, never in member set, values or ordering.
///
/// # Errors
///
/// Returns [`SerializationError`] when the body cannot be rendered as
/// strict JSON.
pub fn to_bytes(problem: &Problem) -> Result<Bytes, SerializationError> {
    let map = problem.to_map();
    let buf = if problem.debug {
        serde_json::to_vec_pretty(&map)?
    } else {
        serde_json::to_vec(&map)?
    };
    Ok(Bytes::from(buf))
}

/// Convert any serializable value into the strict JSON value model.
///
/// # Errors
///
/// Returns [`SerializationError`] when the value has no strict-JSON
/// representation.
pub fn to_strict_value<T: Serialize>(value: &T) -> Result<Value, SerializationError> {
    Ok(serde_json::to_value(value)?)
}
