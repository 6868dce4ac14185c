//! Orchestration of hooks, classification and rendering into a response.

use std::sync::Arc;

use axum::body::Body;
use axum::http::HeaderValue;
use axum::response::Response;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName, TRANSFER_ENCODING};
use http::request::Parts;
use problemkit::{APPLICATION_PROBLEM_JSON, CaughtError, Problem, SerializationError, render};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hooks::{self, HookError, HookPolicy, PostHook, PreHook};

/// Configuration for problem-response handling, shaped for host config
/// files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProblemSettings {
    /// Pretty-print response JSON. Typically mirrored from the host's own
    /// debug setting.
    pub debug: bool,
    /// What to do when a user hook fails.
    pub hook_policy: HookPolicy,
}

/// A failure on the problem-response path itself. Fatal to that response:
/// the caller falls back to the host's bare error behavior.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Render(#[from] SerializationError),
}

/// Converts a caught error into an RFC 7807 problem response, running the
/// configured hooks around classification and rendering.
#[derive(Clone, Default)]
pub struct ProblemHandler {
    settings: ProblemSettings,
    pre_hooks: Vec<Arc<dyn PreHook>>,
    post_hooks: Vec<Arc<dyn PostHook>>,
}

impl ProblemHandler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ProblemSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.settings.debug = debug;
        self
    }

    #[must_use]
    pub fn with_hook_policy(mut self, policy: HookPolicy) -> Self {
        self.settings.hook_policy = policy;
        self
    }

    /// Append a pre-hook. Hooks run in the order they were added.
    #[must_use]
    pub fn with_pre_hook(mut self, hook: Arc<dyn PreHook>) -> Self {
        self.pre_hooks.push(hook);
        self
    }

    /// Append a post-hook. Hooks run in the order they were added.
    #[must_use]
    pub fn with_post_hook(mut self, hook: Arc<dyn PostHook>) -> Self {
        self.post_hooks.push(hook);
        self
    }

    #[must_use]
    pub fn settings(&self) -> ProblemSettings {
        self.settings
    }

    /// Build the problem response for a caught error.
    ///
    /// Runs pre-hooks, classifies the error into a [`Problem`], renders it
    /// with this handler's debug setting, merges the Problem's extra
    /// headers, then runs post-hooks against the constructed response.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when a hook fails under
    /// [`HookPolicy::Propagate`] or when the Problem cannot be rendered as
    /// strict JSON. Either failure aborts this response.
    pub async fn handle(
        &self,
        request: &Parts,
        error: &CaughtError,
    ) -> Result<Response, HandlerError> {
        hooks::run_pre_hooks(&self.pre_hooks, self.settings.hook_policy, request, error).await?;

        let problem = Problem::from_caught(error).with_debug(self.settings.debug);
        let body = render::to_bytes(&problem)?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = problem.status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        // Problem-declared headers override the defaults set above, but a
        // Problem is never allowed to corrupt transport-level framing.
        for (name, value) in &problem.headers {
            if !is_transport_header(name) {
                response.headers_mut().insert(name, value.clone());
            }
        }

        hooks::run_post_hooks(
            &self.post_hooks,
            self.settings.hook_policy,
            request,
            &mut response,
            error,
        )
        .await?;

        Ok(response)
    }
}

fn is_transport_header(name: &HeaderName) -> bool {
    name == CONTENT_LENGTH || name == TRANSFER_ENCODING
}
