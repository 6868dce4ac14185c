//! User-supplied hooks around problem-response construction.
//!
//! Pre-hooks run before the caught error is classified into a Problem;
//! post-hooks run after the response is built and may mutate it (typically
//! its headers) before it is handed back. Hooks execute strictly in
//! registration order, one at a time, and each hook is awaited to
//! completion before the next starts.

use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use futures::future::BoxFuture;
use http::request::Parts;
use problemkit::CaughtError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Callback invoked before Problem classification and response
/// construction. Useful for logging or error-count metrics.
#[async_trait]
pub trait PreHook: Send + Sync {
    /// # Errors
    ///
    /// A returned error halts the hook batch and is handled per the
    /// configured [`HookPolicy`].
    async fn run(&self, request: &Parts, error: &CaughtError) -> anyhow::Result<()>;
}

/// Callback invoked after the problem response has been constructed but
/// before it is handed back to the caller. May mutate the response.
#[async_trait]
pub trait PostHook: Send + Sync {
    /// # Errors
    ///
    /// A returned error halts the hook batch and is handled per the
    /// configured [`HookPolicy`].
    async fn run(
        &self,
        request: &Parts,
        response: &mut Response,
        error: &CaughtError,
    ) -> anyhow::Result<()>;
}

/// A failure raised by a user hook, tagged with the hook's registration
/// position.
#[derive(Debug, Error)]
#[error("hook at position {index} failed: {error}")]
pub struct HookError {
    /// Zero-based registration position of the failing hook.
    pub index: usize,
    /// The hook's own error.
    pub error: anyhow::Error,
}

/// What to do when a hook fails.
///
/// Propagation is the primary contract: a misconfigured hook should surface
/// like any other unhandled error rather than be silently lost, since
/// observability is what hooks are for. Suppression is the explicit opt-in
/// alternative that logs the failure and keeps both the remaining hooks and
/// the response delivery going.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPolicy {
    /// Halt the batch at the first failing hook and abort the problem
    /// response path.
    #[default]
    Propagate,
    /// Log the failure at WARN and continue with the next hook.
    Suppress,
}

/// Execute pre-hooks sequentially in registration order.
///
/// # Errors
///
/// Under [`HookPolicy::Propagate`], returns the first hook failure; hooks
/// after the failing one do not run.
pub async fn run_pre_hooks(
    hooks: &[Arc<dyn PreHook>],
    policy: HookPolicy,
    request: &Parts,
    error: &CaughtError,
) -> Result<(), HookError> {
    for (index, hook) in hooks.iter().enumerate() {
        if let Err(failure) = hook.run(request, error).await {
            match policy {
                HookPolicy::Propagate => {
                    return Err(HookError {
                        index,
                        error: failure,
                    });
                }
                HookPolicy::Suppress => {
                    tracing::warn!(index, error = %failure, "pre-hook failed; continuing");
                }
            }
        }
    }
    Ok(())
}

/// Execute post-hooks sequentially in registration order.
///
/// # Errors
///
/// Under [`HookPolicy::Propagate`], returns the first hook failure; hooks
/// after the failing one do not run.
pub async fn run_post_hooks(
    hooks: &[Arc<dyn PostHook>],
    policy: HookPolicy,
    request: &Parts,
    response: &mut Response,
    error: &CaughtError,
) -> Result<(), HookError> {
    for (index, hook) in hooks.iter().enumerate() {
        if let Err(failure) = hook.run(request, response, error).await {
            match policy {
                HookPolicy::Propagate => {
                    return Err(HookError {
                        index,
                        error: failure,
                    });
                }
                HookPolicy::Suppress => {
                    tracing::warn!(index, error = %failure, "post-hook failed; continuing");
                }
            }
        }
    }
    Ok(())
}

/// Wrap an async closure as a [`PreHook`].
#[must_use]
pub fn pre_hook_fn<F>(f: F) -> Arc<dyn PreHook>
where
    F: for<'a> Fn(&'a Parts, &'a CaughtError) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnPreHook(f))
}

/// Wrap an async closure as a [`PostHook`].
#[must_use]
pub fn post_hook_fn<F>(f: F) -> Arc<dyn PostHook>
where
    F: for<'a> Fn(
            &'a Parts,
            &'a mut Response,
            &'a CaughtError,
        ) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnPostHook(f))
}

struct FnPreHook<F>(F);

#[async_trait]
impl<F> PreHook for FnPreHook<F>
where
    F: for<'a> Fn(&'a Parts, &'a CaughtError) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    async fn run(&self, request: &Parts, error: &CaughtError) -> anyhow::Result<()> {
        (self.0)(request, error).await
    }
}

struct FnPostHook<F>(F);

#[async_trait]
impl<F> PostHook for FnPostHook<F>
where
    F: for<'a> Fn(
            &'a Parts,
            &'a mut Response,
            &'a CaughtError,
        ) -> BoxFuture<'a, anyhow::Result<()>>
        + Send
        + Sync
        + 'static,
{
    async fn run(
        &self,
        request: &Parts,
        response: &mut Response,
        error: &CaughtError,
    ) -> anyhow::Result<()> {
        (self.0)(request, response, error).await
    }
}
