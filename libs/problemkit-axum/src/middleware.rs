//! Intercepting middleware: captures errors escaping the inner service and
//! substitutes an RFC 7807 problem response while that is still possible.
//!
//! A request goes through three stages here. While the inner future is
//! pending, no response exists yet; any failure observed in that window
//! (an `Err` from a fallible stack, a panicking handler, or an application
//! error carried in the response extensions) is converted into a problem
//! response. Once the inner service has produced a response head, the
//! transport is committed: errors surfaced while the body streams are
//! logged and forwarded untouched, and a second response is never
//! constructed.
//!
//! The intercepted error is always preserved for upstream observability: a
//! structured ERROR event is emitted and a [`CapturedError`] extension is
//! recorded on the emitted response.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures::FutureExt;
use http::Request;
use http::request::Parts;
use pin_project_lite::pin_project;
use problemkit::CaughtError;
use tower::{Layer, Service};

use crate::handler::{HandlerError, ProblemHandler};

/// The error originally intercepted for a request, recorded on the emitted
/// response so upstream layers and test harnesses still observe it.
#[derive(Debug, Clone)]
pub struct CapturedError(pub Arc<CaughtError>);

/// A problem-path failure (hook or rendering), recorded on the bare 500
/// fallback response it produced.
#[derive(Debug, Clone)]
pub struct HandlerFailure(pub Arc<HandlerError>);

/// Tower layer installing [`ProblemService`] around an inner service.
#[derive(Clone, Default)]
pub struct ProblemLayer {
    handler: Arc<ProblemHandler>,
}

impl ProblemLayer {
    #[must_use]
    pub fn new(handler: ProblemHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }
}

impl<S> Layer<S> for ProblemLayer {
    type Service = ProblemService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ProblemService {
            inner,
            handler: self.handler.clone(),
        }
    }
}

/// Service wrapper that converts errors escaping the inner service into
/// problem responses. See the module documentation for the state rules.
#[derive(Clone)]
pub struct ProblemService<S> {
    inner: S,
    handler: Arc<ProblemHandler>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for ProblemService<S>
where
    S: Service<Request<ReqBody>, Response = Response> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // Swap so we consume the instance that was poll_ready'd,
        // leaving a fresh clone for the next poll_ready cycle.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let handler = self.handler.clone();

        let (parts, body) = request.into_parts();
        let peeked = parts.clone();
        let request = Request::from_parts(parts, body);

        Box::pin(async move {
            match AssertUnwindSafe(inner.call(request)).catch_unwind().await {
                Ok(Ok(mut response)) => {
                    if let Some(caught) = response.extensions_mut().remove::<CaughtError>() {
                        Ok(respond(&handler, &peeked, caught).await)
                    } else {
                        Ok(guard_started_response(response))
                    }
                }
                Ok(Err(error)) => {
                    let caught = CaughtError::unexpected(&error);
                    // Consumed before the await so the future stays Send
                    // regardless of the inner error type.
                    drop(error);
                    Ok(respond(&handler, &peeked, caught).await)
                }
                Err(panic) => Ok(respond(&handler, &peeked, caught_panic(panic.as_ref())).await),
            }
        })
    }
}

/// Build the problem response for an intercepted error, falling back to a
/// bare 500 when the problem path itself fails.
async fn respond(handler: &ProblemHandler, request: &Parts, caught: CaughtError) -> Response {
    tracing::error!(
        error = %caught,
        method = %request.method,
        uri = %request.uri,
        "request failed; building problem response"
    );

    let caught = Arc::new(caught);
    match handler.handle(request, &caught).await {
        Ok(mut response) => {
            response.extensions_mut().insert(CapturedError(caught));
            response
        }
        Err(failure) => {
            tracing::error!(error = %failure, "problem response aborted; falling back to a bare 500");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            response.extensions_mut().insert(CapturedError(caught));
            response
                .extensions_mut()
                .insert(HandlerFailure(Arc::new(failure)));
            response
        }
    }
}

fn caught_panic(payload: &(dyn Any + Send)) -> CaughtError {
    let message = if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "request handler panicked".to_owned()
    };
    CaughtError::Unexpected {
        type_name: "panic".to_owned(),
        message,
    }
}

fn guard_started_response(response: Response) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(StartedBody { inner: body }))
}

pin_project! {
    /// Body of a response whose head has already been handed to the
    /// transport. Stream errors are logged and passed through untouched.
    struct StartedBody {
        #[pin]
        inner: Body,
    }
}

impl http_body::Body for StartedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<http_body::Frame<Bytes>, Self::Error>>> {
        let this = self.project();
        match ready!(this.inner.poll_frame(cx)) {
            Some(Err(error)) => {
                tracing::error!(
                    error = %error,
                    "response body failed after the response started; passing the error through"
                );
                Poll::Ready(Some(Err(error)))
            }
            other => Poll::Ready(other),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> http_body::SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::BodyExt;

    #[derive(Clone)]
    struct FailingService;

    impl Service<Request<Body>> for FailingService {
        type Response = Response;
        type Error = std::io::Error;
        type Future = Pin<Box<dyn Future<Output = Result<Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: Request<Body>) -> Self::Future {
            Box::pin(async {
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset",
                ))
            })
        }
    }

    #[tokio::test]
    async fn inner_service_error_becomes_a_problem_response() {
        let layer = ProblemLayer::new(ProblemHandler::new());
        let mut service = layer.layer(FailingService);

        let request = Request::builder().uri("/fail").body(Body::empty()).unwrap();
        let response = service.call(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<CapturedError>().is_some());

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["title"], "Unexpected Server Error");
        assert_eq!(body["exc_type"], "Error");
        assert_eq!(body["detail"], "connection reset");
    }

    #[test]
    fn panic_payload_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert!(matches!(
            caught_panic(boxed.as_ref()),
            CaughtError::Unexpected { ref type_name, ref message }
                if type_name == "panic" && message == "boom"
        ));

        let boxed: Box<dyn Any + Send> = Box::new(format!("boom {}", 2));
        assert!(matches!(
            caught_panic(boxed.as_ref()),
            CaughtError::Unexpected { ref message, .. } if message == "boom 2"
        ));

        let boxed: Box<dyn Any + Send> = Box::new(42_u8);
        assert!(matches!(
            caught_panic(boxed.as_ref()),
            CaughtError::Unexpected { ref message, .. } if message == "request handler panicked"
        ));
    }
}
