//! Axum middleware for correlation ids and error mapping.
//!
//! This module provides middleware layers for:
//! - **Correlation ID tracking**: extract or generate a correlation id per request
//! - **Error mapping**: render every [`AppError`](crate::AppError) through the [`ErrorMapper`]
//! - **Panic capture**: turn a panicking handler into an unexpected failure
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use jsondata_web::middleware::{correlation_id_layer, error_mapping_layer, panic_layer};
//!
//! let app = Router::new()
//!     .route("/api/users", post(create_user))
//!     .layer(panic_layer())
//!     .layer(error_mapping_layer())
//!     .layer(correlation_id_layer());
//! ```
//!
//! # Flow
//!
//! 1. **Extract** correlation ID from `X-Correlation-ID` header (or generate new UUID)
//! 2. **Store** it in request extensions and in a task-local for the request's duration
//! 3. **Map** any failure response into the JSON error body, reading the
//!    correlation id through [`RequestCorrelation`]
//! 4. **Inject** the correlation ID into the response `X-Correlation-ID` header

use std::any::Any;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use http::{HeaderName, HeaderValue};
use jsondata_core::{CorrelationSource, UNDEFINED_CORRELATION};
use tower::{Layer, Service};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::AppError;
use crate::mapper::ErrorMapper;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

tokio::task_local! {
    static CURRENT_CORRELATION: String;
}

/// [`CorrelationSource`] reading the id of the request being served.
///
/// Outside a request wrapped by [`CorrelationIdLayer`] it reports
/// `UNDEFINED`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestCorrelation;

impl CorrelationSource for RequestCorrelation {
    fn correlation(&self) -> String {
        CURRENT_CORRELATION
            .try_with(Clone::clone)
            .unwrap_or_else(|_| UNDEFINED_CORRELATION.to_string())
    }
}

/// Create a layer that adds correlation ID tracking to all requests.
///
/// This layer:
/// - Extracts correlation ID from request header or generates new UUID
/// - Stores correlation ID in request extensions
/// - Makes it available to [`RequestCorrelation`] while the request runs
/// - Creates tracing span with `correlation_id` field
/// - Injects correlation ID into response header
#[must_use]
pub fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer::new(HeaderName::from_static("x-correlation-id"))
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer {
    header: HeaderName,
}

impl CorrelationIdLayer {
    /// Track correlation ids in `header`.
    #[must_use]
    pub const fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware {
            inner,
            header: self.header.clone(),
        }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
    header: HeaderName,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        // Extract correlation ID from header or generate new
        let correlation_id = req
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        // Store in request extensions for handler access
        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri(),
        );

        let header = self.header.clone();
        let fut = self.inner.call(req);

        Box::pin(CURRENT_CORRELATION.scope(correlation_id.to_string(), async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(header, header_value);
            }

            Ok(response)
        }))
    }
}

/// Extension trait for extracting correlation ID from request extensions.
pub trait CorrelationIdExt {
    /// Get the correlation ID, if [`CorrelationIdLayer`] is installed.
    fn try_correlation_id(&self) -> Option<Uuid>;
}

impl CorrelationIdExt for Request {
    fn try_correlation_id(&self) -> Option<Uuid> {
        self.extensions().get::<Uuid>().copied()
    }
}

/// Create a layer rendering failures with [`RequestCorrelation`] ids.
#[must_use]
pub fn error_mapping_layer() -> ErrorMappingLayer {
    ErrorMappingLayer::new(ErrorMapper::new(Arc::new(RequestCorrelation)))
}

/// Layer that sends every failure response through an [`ErrorMapper`].
#[derive(Clone, Debug)]
pub struct ErrorMappingLayer {
    mapper: ErrorMapper,
}

impl ErrorMappingLayer {
    /// Map failures with `mapper`.
    #[must_use]
    pub const fn new(mapper: ErrorMapper) -> Self {
        Self { mapper }
    }
}

impl<S> Layer<S> for ErrorMappingLayer {
    type Service = ErrorMappingMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorMappingMiddleware {
            inner,
            mapper: self.mapper.clone(),
        }
    }
}

/// Middleware service for error mapping.
#[derive(Clone, Debug)]
pub struct ErrorMappingMiddleware<S> {
    inner: S,
    mapper: ErrorMapper,
}

impl<S> Service<Request> for ErrorMappingMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let mapper = self.mapper.clone();
        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;
            Ok(mapper.map_response(response))
        })
    }
}

/// Handler signature used by [`panic_layer`].
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Create a layer that turns handler panics into unexpected failures.
///
/// Install it inside the error mapping layer so the failure gets rendered.
#[must_use]
pub fn panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    tracing::warn!(panic = %detail, "Handler panicked");
    AppError::unexpected(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use jsondata_core::ServiceError;
    use jsondata_testing::helpers::body_json;
    use tower::ServiceExt;

    async fn explode() -> &'static str {
        panic!("handler exploded")
    }

    fn app() -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/missing",
                get(|| async { Err::<String, AppError>(ServiceError::not_found().into()) }),
            )
            .route(
                "/boom",
                get(|| async { Err::<String, AppError>(anyhow::anyhow!("boom").into()) }),
            )
            .route("/panic", get(explode))
            .layer(panic_layer())
            .layer(error_mapping_layer())
            .layer(correlation_id_layer())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn response_correlation(response: &Response) -> String {
        response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let response = app().oneshot(get_request("/ok")).await.unwrap();

        let correlation_id = response_correlation(&response);
        assert!(Uuid::parse_str(&correlation_id).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let request_uuid = Uuid::new_v4();
        let request = Request::builder()
            .uri("/ok")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response_correlation(&response), request_uuid.to_string());
    }

    #[tokio::test]
    async fn test_invalid_uuid_generates_new() {
        let request = Request::builder()
            .uri("/ok")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        let correlation_id = response_correlation(&response);
        assert!(Uuid::parse_str(&correlation_id).is_ok());
        assert_ne!(correlation_id, "not-a-uuid");
    }

    #[tokio::test]
    async fn test_service_error_body_carries_request_correlation() {
        let response = app().oneshot(get_request("/missing")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let correlation_id = response_correlation(&response);
        let body = body_json(response).await;
        assert_eq!(body["error.code"], "NOT_FOUND");
        assert_eq!(body["error.correlation"], correlation_id.as_str());
    }

    #[tokio::test]
    async fn test_unexpected_error_is_internal_error() {
        let response = app().oneshot(get_request("/boom")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error.code"], "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_panic_is_mapped() {
        let response = app().oneshot(get_request("/panic")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let correlation_id = response_correlation(&response);
        let body = body_json(response).await;
        assert_eq!(body["error.code"], "INTERNAL_ERROR");
        assert_eq!(body["error.correlation"], correlation_id.as_str());
    }

    #[tokio::test]
    async fn test_correlation_in_extensions() {
        async fn handler(req: Request<Body>) -> String {
            req.try_correlation_id()
                .map(|id| id.to_string())
                .unwrap_or_default()
        }

        let app = Router::new()
            .route("/echo", get(handler))
            .layer(correlation_id_layer());

        let response = app.oneshot(get_request("/echo")).await.unwrap();
        let header = response_correlation(&response);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(body, header.as_bytes());
    }

    #[test]
    fn test_request_correlation_outside_request() {
        assert_eq!(RequestCorrelation.correlation(), "UNDEFINED");
    }

    #[tokio::test]
    async fn test_request_correlation_inside_scope() {
        let seen = CURRENT_CORRELATION
            .scope("abc".to_string(), async { RequestCorrelation.correlation() })
            .await;

        assert_eq!(seen, "abc");
    }
}
