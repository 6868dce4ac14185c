#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! RFC 7807 problem responses for axum: hooks, exception handler and
//! intercepting middleware.
//!
//! Any error that escapes request handling (an application-raised
//! [`Problem`], a [`StatusError`], a [`ValidationError`], a panic, or an
//! `Err` from a fallible middleware stack) is classified and rendered as
//! an `application/problem+json` response with a matching status code,
//! unless the response has already started streaming.
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use problemkit_axum::{register, pre_hook_fn, ProblemHandler, StatusError};
//!
//! async fn me() -> Result<&'static str, StatusError> {
//!     Err(StatusError::new(http::StatusCode::UNAUTHORIZED)
//!         .with_detail("user is unauthenticated"))
//! }
//!
//! let handler = ProblemHandler::new()
//!     .with_debug(cfg!(debug_assertions))
//!     .with_pre_hook(pre_hook_fn(|request, error| {
//!         Box::pin(async move {
//!             tracing::info!(uri = %request.uri, %error, "request failed");
//!             Ok(())
//!         })
//!     }));
//!
//! let app: Router = register(Router::new().route("/me", get(me)), handler);
//! ```

pub mod handler;
pub mod hooks;
pub mod middleware;
mod register;

pub use handler::{HandlerError, ProblemHandler, ProblemSettings};
pub use hooks::{
    HookError, HookPolicy, PostHook, PreHook, post_hook_fn, pre_hook_fn, run_post_hooks,
    run_pre_hooks,
};
pub use middleware::{CapturedError, HandlerFailure, ProblemLayer, ProblemService};
pub use register::register;

// Re-export the data model so most applications need only this crate.
pub use problemkit::{
    APPLICATION_PROBLEM_JSON, CaughtError, FieldError, Problem, SerializationError, StatusError,
    ValidationError,
};
