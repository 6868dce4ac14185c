#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! RFC 7807 Problem Details for HTTP APIs: data model, classification and
//! rendering.
//!
//! This crate carries the framework-light core:
//! - [`Problem`]: the canonical error representation, with defaulted RFC
//!   members and an open, insertion-ordered set of extension members.
//! - [`CaughtError`] and the `Problem::from_*` constructors: total
//!   classification of every intercepted error shape into a Problem.
//! - [`render`]: strict-JSON serialization, compact or pretty-printed by
//!   the Problem's debug flag.
//!
//! The `axum` feature adds `IntoResponse` conversions for [`Problem`],
//! [`StatusError`] and [`ValidationError`]; the companion `problemkit-axum`
//! crate provides the intercepting middleware, hooks and registration. The
//! `utoipa` feature adds an OpenAPI schema model in [`schema`].

pub mod catch;
pub mod problem;
pub mod render;

#[cfg(feature = "axum")]
mod response;
#[cfg(feature = "utoipa")]
pub mod schema;

pub use catch::{CaughtError, FieldError, StatusError, ValidationError, short_type_name};
pub use problem::Problem;
pub use render::{APPLICATION_PROBLEM_JSON, SerializationError, to_bytes};
