//! Tower middleware applying an admission policy to axum routes.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use tower::{Layer, Service};
use tracing::warn;

use crate::policy::{Admission, AdmissionPolicy};

/// Layer wrapping services with an [`AdmissionService`].
pub struct AdmissionLayer<P> {
    policy: Arc<P>,
}

impl<P> AdmissionLayer<P> {
    /// Create a layer enforcing `policy`.
    pub fn new(policy: P) -> Self {
        Self::from_shared(Arc::new(policy))
    }

    /// Create a layer enforcing a policy shared with other layers.
    pub fn from_shared(policy: Arc<P>) -> Self {
        Self { policy }
    }

    /// The enforced policy.
    pub fn policy(&self) -> &Arc<P> {
        &self.policy
    }
}

impl<P> Clone for AdmissionLayer<P> {
    fn clone(&self) -> Self {
        Self {
            policy: self.policy.clone(),
        }
    }
}

impl<S, P> Layer<S> for AdmissionLayer<P> {
    type Service = AdmissionService<S, P>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// Middleware service admitting or rejecting each request.
///
/// Denied requests are answered with `429 Too Many Requests` and never reach
/// the inner service. Admitted requests are forwarded unchanged.
pub struct AdmissionService<S, P> {
    inner: S,
    policy: Arc<P>,
}

impl<S: Clone, P> Clone for AdmissionService<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S, P> Service<Request> for AdmissionService<S, P>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
    P: AdmissionPolicy<Request> + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        match self.policy.admit(&req) {
            Admission::Admitted => Box::pin(self.inner.call(req)),
            Admission::Denied(denial) => {
                warn!(
                    dimension = denial.dimension,
                    method = %req.method(),
                    path = %req.uri().path(),
                    "Request rejected, quota exhausted"
                );
                Box::pin(async move { Ok(denial.into_response()) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::extract::ClientIp;
    use crate::policy::{SingleKeyPolicy, ADDRESS};
    use crate::quota::QuotaTracker;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(capacity: u64, hits: Arc<AtomicUsize>) -> Router {
        let tracker = Arc::new(QuotaTracker::new(capacity, Duration::from_secs(60)).unwrap());
        let policy = SingleKeyPolicy::new(ADDRESS, tracker, ClientIp::peer());

        Router::new()
            .route(
                "/ping",
                get(move || {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "pong"
                    }
                }),
            )
            .layer(AdmissionLayer::new(policy))
    }

    fn ping(ip: &str) -> Request {
        let addr = SocketAddr::new(ip.parse().unwrap(), 40000);
        let mut req = axum::http::Request::builder()
            .uri("/ping")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[tokio::test]
    async fn test_admitted_request_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(1, hits.clone());

        let response = app.oneshot(ping("127.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_request_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = app(1, hits.clone());

        let response = app.clone().oneshot(ping("127.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(ping("127.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // Another client is unaffected
        let response = app.oneshot(ping("127.0.0.2")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
