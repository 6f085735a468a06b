//! Custom Axum extractors.
//!
//! - `Entity<T>`: decode a JSON object body into a [`JsonEntity`]
//! - `CorrelationId`: the request's correlation id
//!
//! # Examples
//!
//! ```ignore
//! use jsondata_core::JsonBean;
//! use jsondata_web::extractors::{CorrelationId, Entity};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     Entity(bean): Entity<JsonBean>,
//! ) -> Result<Entity<JsonBean>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, "Echoing entity");
//!     Ok(Entity(bean))
//! }
//! ```

use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use jsondata_core::{JsonEntity, JsonMap, ServiceError, codes};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;

/// JSON entity extractor and response.
///
/// The body must be a JSON object sent as `application/json`. Anything else
/// is rejected with a `BAD_CONTENT` bad request.
///
/// # Example
///
/// ```ignore
/// async fn create(Entity(order): Entity<Order>) -> Entity<Order> {
///     Entity(order)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Entity<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Entity<T>
where
    T: JsonEntity + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match <Json<JsonMap> as FromRequest<S>>::from_request(req, state).await {
            Ok(Json(map)) => Ok(Self(T::from_map(map))),
            Err(rejection) => {
                tracing::debug!(rejection = %rejection, "Rejected request body");
                Err(ServiceError::bad_request(codes::BAD_CONTENT)
                    .with_cause(rejection)
                    .into())
            }
        }
    }
}

impl<T: JsonEntity> IntoResponse for Entity<T> {
    fn into_response(self) -> Response {
        Json(self.0.into_map()).into_response()
    }
}

/// Correlation ID for request tracing.
///
/// Reads the id stored by the correlation layer, which honours the header
/// configured through [`WebConfig`](crate::WebConfig). Without the layer it
/// falls back to the default [`CORRELATION_ID_HEADER`] only, or generates a
/// new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use jsondata_core::JsonBean;
    use jsondata_testing::helpers::body_json;
    use serde_json::json;

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn extract(req: Request<Body>) -> Result<Entity<JsonBean>, AppError> {
        <Entity<JsonBean> as FromRequest<()>>::from_request(req, &()).await
    }

    async fn reject(req: Request<Body>) -> AppError {
        match extract(req).await {
            Ok(_) => unreachable!("body should be rejected"),
            Err(error) => error,
        }
    }

    #[tokio::test]
    async fn test_entity_from_object_body() {
        let Entity(bean) = extract(json_request(r#"{"foo":"FOO"}"#)).await.unwrap();

        assert_eq!(bean.get_str("foo"), Some("FOO"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_content() {
        let error = reject(json_request("{not json")).await;

        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.code(), "BAD_CONTENT");
    }

    #[tokio::test]
    async fn test_non_object_is_bad_content() {
        let error = reject(json_request("[1, 2, 3]")).await;

        assert_eq!(error.code(), "BAD_CONTENT");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_content() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(r#"{"foo":"FOO"}"#))
            .unwrap();

        let error = reject(req).await;

        assert_eq!(error.code(), "BAD_CONTENT");
    }

    #[tokio::test]
    async fn test_entity_response_is_bare_object() {
        let bean = JsonBean::new().put_string("foo", "FOO");

        let response = Entity(bean).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"foo": "FOO"}));
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let (mut parts, ()) = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .unwrap()
            .into_parts();
        parts.extensions.insert(stored);

        let CorrelationId(id) = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(id, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let header = Uuid::new_v4();
        let (mut parts, ()) = Request::builder()
            .header(CORRELATION_ID_HEADER, header.to_string())
            .body(())
            .unwrap()
            .into_parts();

        let CorrelationId(id) = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(id, header);
    }
}
