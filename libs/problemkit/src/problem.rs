//! RFC 7807 Problem Details for HTTP APIs (pure data model, no HTTP framework
//! dependencies beyond `http` types).

use std::fmt;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::render::{self, SerializationError};

/// RFC 7807 Problem Details for HTTP APIs.
///
/// This models a "problem" as defined in RFC 7807. Applications construct one
/// directly (and return or raise it as an error), or let the classification
/// constructors in [`crate::catch`] derive one from an intercepted error.
///
/// Default values are applied to the `type`, `status` and `title` members at
/// construction time: `"about:blank"`, 500, and the canonical reason phrase
/// of the resolved status respectively.
///
/// Mutation after construction is possible but discouraged; a Problem is
/// meant to be built once per failed request and discarded after the
/// response is emitted.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    /// Serialized as `type`.
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    pub title: String,
    /// The HTTP status code for this occurrence of the problem.
    /// Serialized as a bare integer.
    pub status: StatusCode,
    /// A human-readable explanation specific to this occurrence.
    /// Serialized only when non-empty.
    pub detail: Option<String>,
    /// A URI reference that identifies this specific occurrence.
    /// Serialized only when non-empty.
    pub instance: Option<String>,
    /// Open set of additional members, kept in insertion order.
    ///
    /// Extension members never shadow the RFC-defined members during
    /// serialization; when a key collides, the defined field's value wins.
    pub extensions: Map<String, Value>,
    /// Extra HTTP headers to attach to the response carrying this Problem.
    /// Never serialized into the body.
    pub headers: HeaderMap,
    /// Selects pretty-printed output from the renderer. Formatting only;
    /// the serialized member set is identical either way.
    pub debug: bool,
}

impl Problem {
    /// Create a Problem with all defaults: `about:blank`, 500,
    /// "Internal Server Error".
    pub fn new() -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create a Problem for the given status code, titled with the status's
    /// canonical reason phrase.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: reason_phrase(status),
            status,
            detail: None,
            instance: None,
            extensions: Map::new(),
            headers: HeaderMap::new(),
            debug: false,
        }
    }

    /// Create a Problem from an open field mapping.
    ///
    /// The RFC-defined keys (`type`, `title`, `status`, `detail`,
    /// `instance`) are consumed into the corresponding members, with the
    /// usual defaults where absent or invalid; every remaining key becomes
    /// an extension member, in the mapping's order. An empty mapping yields
    /// the same Problem as [`Problem::new`].
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let status = fields
            .shift_remove("status")
            .as_ref()
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut problem = Self::from_status(status);
        if let Some(value) = fields.shift_remove("type") {
            problem.type_url = string_member(value);
        }
        if let Some(value) = fields.shift_remove("title") {
            problem.title = string_member(value);
        }
        if let Some(value) = fields.shift_remove("detail") {
            problem.detail = Some(string_member(value));
        }
        if let Some(value) = fields.shift_remove("instance") {
            problem.instance = Some(string_member(value));
        }
        problem.extensions = fields;
        problem
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = Some(uri.into());
        self
    }

    /// Attach an extension member. Insertion order is preserved in the
    /// serialized body.
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// Attach an extension member from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] when the value cannot be represented
    /// as strict JSON (e.g. a map with non-string keys).
    pub fn try_extension<T: Serialize>(
        mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, SerializationError> {
        self.extensions
            .insert(key.into(), render::to_strict_value(value)?);
        Ok(self)
    }

    /// Attach an extra response header for this Problem.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Flatten into the serialized member mapping.
    ///
    /// Extensions come first, in insertion order; the RFC-defined members
    /// are written last so a colliding extension key keeps its position but
    /// never its value. Empty `type`/`title` and unset `detail`/`instance`
    /// are omitted.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.extensions.clone();
        if !self.type_url.is_empty() {
            map.insert("type".to_owned(), Value::String(self.type_url.clone()));
        }
        if !self.title.is_empty() {
            map.insert("title".to_owned(), Value::String(self.title.clone()));
        }
        map.insert("status".to_owned(), Value::from(self.status.as_u16()));
        if let Some(detail) = self.detail.as_deref().filter(|d| !d.is_empty()) {
            map.insert("detail".to_owned(), Value::String(detail.to_owned()));
        }
        if let Some(instance) = self.instance.as_deref().filter(|i| !i.is_empty()) {
            map.insert("instance".to_owned(), Value::String(instance.to_owned()));
        }
        map
    }

    /// Render as JSON-serialized bytes, compact or pretty per the `debug`
    /// flag. See [`render::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`SerializationError`] when the body cannot be rendered as
    /// strict JSON.
    pub fn to_bytes(&self) -> Result<bytes::Bytes, SerializationError> {
        render::to_bytes(self)
    }
}

impl Default for Problem {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.to_map()) {
            Ok(body) => write!(f, "Problem:<{body}>"),
            Err(_) => write!(f, "Problem:<{} {}>", self.status, self.title),
        }
    }
}

impl std::error::Error for Problem {}

impl Serialize for Problem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Problem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_fields(Map::deserialize(deserializer)?))
    }
}

/// Canonical reason phrase for a status code, with a stable fallback for
/// unregistered codes.
fn reason_phrase(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown Status").to_owned()
}

fn string_member(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
