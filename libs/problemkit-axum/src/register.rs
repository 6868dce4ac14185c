//! Single-call registration on an axum Router.

use axum::Router;

use crate::handler::ProblemHandler;
use crate::middleware::ProblemLayer;

/// Install the problem-details machinery on a Router.
///
/// Three things cooperate after registration:
///
/// 1. HTTP-status errors ([`problemkit::StatusError`]) returned by handlers
///    convert into problem responses through their `IntoResponse` impl.
/// 2. Request-validation failures ([`problemkit::ValidationError`]) convert
///    the same way, always as 400.
/// 3. [`ProblemLayer`] wraps the whole router and captures everything else
///    (panics, errors from fallible middleware, application-raised
///    [`problemkit::Problem`]s), re-handling all of them with the given
///    handler's hooks and debug formatting.
///
/// Call this last so the layer ends up outermost; errors escaping inner
/// layers are then captured too.
///
/// When the handler's debug setting is enabled (typically mirrored from the
/// host's own debug flag) response JSON is pretty-printed for readability;
/// otherwise it is rendered in compact form.
#[must_use]
pub fn register<S>(router: Router<S>, handler: ProblemHandler) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(ProblemLayer::new(handler))
}
