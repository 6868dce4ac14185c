//! Axum integration: Problems and collaborator errors as responses.
//!
//! Each conversion renders a complete `application/problem+json` response
//! and additionally records the originating [`CaughtError`] in the response
//! extensions, so an installed intercepting layer can re-handle the error
//! with its configured hooks and debug formatting. Standalone (without the
//! layer) the rendered response is already well-formed.

use axum::body::Body;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::header::CONTENT_TYPE;

use crate::catch::{CaughtError, StatusError, ValidationError};
use crate::problem::Problem;
use crate::render::{self, APPLICATION_PROBLEM_JSON};

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let problem = self.clone();
        problem_response(&problem, CaughtError::Problem(self))
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let problem = Problem::from_status_error(&self);
        problem_response(&problem, CaughtError::Status(self))
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let problem = Problem::from_validation_error(&self);
        problem_response(&problem, CaughtError::Validation(self))
    }
}

fn problem_response(problem: &Problem, caught: CaughtError) -> Response {
    let body = match render::to_bytes(problem) {
        Ok(body) => body,
        Err(error) => {
            tracing::error!(error = %error, "failed to render problem response body");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response.extensions_mut().insert(caught);
            return response;
        }
    };

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = problem.status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
    );
    for (name, value) in &problem.headers {
        response.headers_mut().insert(name, value.clone());
    }
    response.extensions_mut().insert(caught);
    response
}
