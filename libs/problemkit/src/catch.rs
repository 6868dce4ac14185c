//! Classification of caught errors into Problems.
//!
//! Interception deals with a closed set of collaborator error shapes rather
//! than open-ended runtime type inspection: everything the middleware can
//! catch is first expressed as a [`CaughtError`] variant, and
//! [`Problem::from_caught`] is total over that set.

use std::fmt;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::problem::Problem;

/// Host-framework HTTP-status error: a status code with optional detail and
/// extra response headers (e.g. `WWW-Authenticate` on a 401).
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct StatusError {
    pub status: StatusCode,
    pub detail: Option<String>,
    pub headers: HeaderMap,
}

impl StatusError {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            detail: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.detail.as_deref() {
            Some(detail) => write!(f, "HTTP {}: {detail}", self.status),
            None => write!(f, "HTTP {}", self.status),
        }
    }
}

impl std::error::Error for StatusError {}

/// Individual request-validation failure for one field or parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path to the failing input, e.g. `["body", "email"]`.
    pub loc: Vec<String>,
    /// Human-readable message describing the failure.
    pub msg: String,
    /// Machine-readable failure category, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    #[must_use]
    pub fn new(
        loc: impl IntoIterator<Item = impl Into<String>>,
        msg: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            loc: loc.into_iter().map(Into::into).collect(),
            msg: msg.into(),
            kind: kind.into(),
        }
    }
}

/// Request-validation failure: one or more [`FieldError`]s.
#[must_use]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationError {
    errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// The individual field failures, in the order they were recorded.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} request parameter(s) failed validation", self.errors.len())
    }
}

impl std::error::Error for ValidationError {}

/// An error intercepted on the request-handling path, expressed as one of
/// the known collaborator shapes plus a catch-all.
#[derive(Debug, Clone)]
pub enum CaughtError {
    /// An application-raised Problem, passed through unchanged.
    Problem(Problem),
    /// A host HTTP-status error.
    Status(StatusError),
    /// A request-validation failure.
    Validation(ValidationError),
    /// A plain key-value mapping of Problem fields.
    Fields(Map<String, Value>),
    /// Any other error: concrete type name plus rendered message.
    Unexpected { type_name: String, message: String },
    /// Unclassifiable content that is not an error at all.
    Content(String),
}

impl CaughtError {
    /// Capture a generic error, preserving its concrete type name.
    #[must_use]
    pub fn unexpected<E: fmt::Display>(error: &E) -> Self {
        Self::Unexpected {
            type_name: short_type_name::<E>().to_owned(),
            message: error.to_string(),
        }
    }

    /// Capture content that cannot be classified as any known error shape.
    #[must_use]
    pub fn content(content: impl fmt::Display) -> Self {
        Self::Content(content.to_string())
    }
}

impl fmt::Display for CaughtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Problem(problem) => problem.fmt(f),
            Self::Status(error) => error.fmt(f),
            Self::Validation(error) => error.fmt(f),
            Self::Fields(fields) => write!(f, "problem fields: {}", Value::Object(fields.clone())),
            Self::Unexpected { type_name, message } => write!(f, "{type_name}: {message}"),
            Self::Content(content) => write!(f, "unexpected content: {content}"),
        }
    }
}

impl From<Problem> for CaughtError {
    fn from(problem: Problem) -> Self {
        Self::Problem(problem)
    }
}

impl From<StatusError> for CaughtError {
    fn from(error: StatusError) -> Self {
        Self::Status(error)
    }
}

impl From<ValidationError> for CaughtError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}

impl Problem {
    /// Derive a Problem from any caught error. Total: every variant maps to
    /// a well-formed Problem, falling back to "Application Error" for
    /// unclassifiable content.
    pub fn from_caught(caught: &CaughtError) -> Self {
        match caught {
            CaughtError::Problem(problem) => problem.clone(),
            CaughtError::Status(error) => Self::from_status_error(error),
            CaughtError::Validation(error) => Self::from_validation_error(error),
            CaughtError::Fields(fields) => Self::from_fields(fields.clone()),
            CaughtError::Unexpected { type_name, message } => {
                Self::from_unexpected(type_name, message)
            }
            CaughtError::Content(content) => Self::from_content(content),
        }
    }

    /// Problem for a host HTTP-status error: the error's status code, the
    /// phrase-derived title, its detail if any, and its extra headers.
    pub fn from_status_error(error: &StatusError) -> Self {
        let mut problem = Self::from_status(error.status);
        problem.detail = error.detail.clone();
        problem.headers = error.headers.clone();
        problem
    }

    /// Problem for a request-validation failure: always 400, with the field
    /// failures carried in an `errors` extension member.
    pub fn from_validation_error(error: &ValidationError) -> Self {
        Self::from_status(StatusCode::BAD_REQUEST)
            .with_title("Validation Error")
            .with_detail("One or more user-provided parameters are invalid")
            .with_extension(
                "errors",
                serde_json::to_value(error.errors()).unwrap_or_default(),
            )
    }

    /// Problem for a generic unhandled error: always 500, with the error's
    /// concrete type name preserved in an `exc_type` extension member.
    pub fn from_unexpected(type_name: &str, message: &str) -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR)
            .with_title("Unexpected Server Error")
            .with_detail(message)
            .with_extension("exc_type", type_name)
    }

    /// Problem for unclassifiable content.
    pub fn from_content(content: &str) -> Self {
        Self::from_status(StatusCode::INTERNAL_SERVER_ERROR)
            .with_title("Application Error")
            .with_detail("Got unexpected content when trying to generate error response")
            .with_extension("content", content)
    }
}

/// Final path segment of a type's name, with generic parameters stripped:
/// `std::io::Error` becomes `Error`.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct BrokenPipe;

    impl fmt::Display for BrokenPipe {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "pipe closed mid-write")
        }
    }

    impl std::error::Error for BrokenPipe {}

    #[test]
    fn from_status_error_carries_detail_and_headers() {
        let error = StatusError::new(StatusCode::UNAUTHORIZED)
            .with_detail("user is unauthenticated")
            .with_header(
                http::header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer"),
            );

        let problem = Problem::from_status_error(&error);
        assert_eq!(problem.status, StatusCode::UNAUTHORIZED);
        assert_eq!(problem.title, "Unauthorized");
        assert_eq!(problem.detail.as_deref(), Some("user is unauthenticated"));
        assert_eq!(
            problem.headers.get(http::header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static("Bearer"))
        );
        assert!(problem.extensions.is_empty());
    }

    #[test]
    fn from_validation_error_maps_to_400() {
        let error = ValidationError::new(vec![
            FieldError::new(["here"], "foo", "value_error"),
            FieldError::new(["body", "email"], "bar", "missing"),
        ]);

        let problem = Problem::from_validation_error(&error);
        assert_eq!(problem.status, StatusCode::BAD_REQUEST);
        assert_eq!(problem.title, "Validation Error");
        assert_eq!(
            problem.detail.as_deref(),
            Some("One or more user-provided parameters are invalid")
        );
        assert_eq!(
            problem.extensions["errors"],
            json!([
                {"loc": ["here"], "msg": "foo", "type": "value_error"},
                {"loc": ["body", "email"], "msg": "bar", "type": "missing"},
            ])
        );
    }

    #[test]
    fn from_unexpected_keeps_type_name() {
        let caught = CaughtError::unexpected(&BrokenPipe);
        let problem = Problem::from_caught(&caught);

        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem.title, "Unexpected Server Error");
        assert_eq!(problem.detail.as_deref(), Some("pipe closed mid-write"));
        assert_eq!(problem.extensions["exc_type"], json!("BrokenPipe"));
    }

    #[test]
    fn from_content_is_the_catch_all() {
        let problem = Problem::from_caught(&CaughtError::content("['some', 'other', 'data']"));

        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(problem.title, "Application Error");
        assert_eq!(
            problem.detail.as_deref(),
            Some("Got unexpected content when trying to generate error response")
        );
        assert_eq!(problem.extensions["content"], json!("['some', 'other', 'data']"));
    }

    #[test]
    fn from_caught_passes_problems_through() {
        let original = Problem::from_status(StatusCode::CONFLICT).with_detail("busy");
        let caught = CaughtError::from(original.clone());
        assert_eq!(Problem::from_caught(&caught), original);
    }

    #[test]
    fn short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<u32>(), "u32");
    }

    #[test]
    fn validation_error_accessor_preserves_order() {
        let error = ValidationError::new(vec![
            FieldError::new(["a"], "first", "k"),
            FieldError::new(["b"], "second", "k"),
        ]);
        let msgs: Vec<&str> = error.errors().iter().map(|e| e.msg.as_str()).collect();
        assert_eq!(msgs, ["first", "second"]);
    }
}
