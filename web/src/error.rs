//! Error types for web handlers.
//!
//! Handlers return [`AppError`], which is either a categorized
//! [`ServiceError`] or an unexpected failure. Turning an `AppError` into an
//! HTTP response is the job of the [`ErrorMapper`](crate::mapper::ErrorMapper);
//! the `IntoResponse` impl here only records the failure on the response so
//! the mapping layer can pick it up.

use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsondata_core::{
    ErrorKind, JsonEntity, JsonMap, ServiceError, UNDEFINED_CORRELATION, codes, json_entity,
};
use serde_json::Value;

/// Field holding the error code in an error body.
pub const ERROR_CODE_FIELD: &str = "error.code";

/// Field holding the correlation id in an error body.
pub const ERROR_CORRELATION_FIELD: &str = "error.correlation";

/// Application error type for web handlers.
///
/// `?` works on both [`ServiceError`] and [`anyhow::Error`]. An `anyhow::Error`
/// that wraps a `ServiceError` is unwrapped, so a categorized failure is never
/// reported as unexpected just because it travelled through `anyhow`.
///
/// # Examples
///
/// ```ignore
/// async fn handler(Path(id): Path<u64>) -> Result<Entity<JsonBean>, AppError> {
///     let user = repo.find(id).await?.ok_or_else(ServiceError::not_found)?;
///     Ok(Entity(user))
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A failure the service raised on purpose.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Anything else.
    #[error(transparent)]
    Unexpected(anyhow::Error),
}

impl AppError {
    /// Wrap an arbitrary error as unexpected.
    #[must_use]
    pub fn unexpected(error: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected(error.into())
    }

    /// HTTP status the mapper answers with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Service(error) => status_for(error.kind()),
            Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code the mapper puts in the body.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Service(error) => error.code(),
            Self::Unexpected(_) => codes::INTERNAL_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<ServiceError>() {
            Ok(service) => Self::Service(service),
            Err(other) => Self::Unexpected(other),
        }
    }
}

/// HTTP status for each error category.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Failure carried on a response until the mapping layer renders it.
#[derive(Debug, Clone)]
pub(crate) struct PendingFailure(pub(crate) Arc<AppError>);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Body uses an undefined correlation until the mapping layer replaces it.
        let body = ErrorResponse::new(self.code(), UNDEFINED_CORRELATION);
        let mut response = (self.status(), Json(body)).into_response();
        response
            .extensions_mut()
            .insert(PendingFailure(Arc::new(self)));
        response
    }
}

/// Error response body (JSON).
///
/// Serializes as `{"error.code": "...", "error.correlation": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse(JsonMap);

impl ErrorResponse {
    /// Build the body for one failed call.
    #[must_use]
    pub fn new(code: impl Into<String>, correlation: impl Into<String>) -> Self {
        let mut map = JsonMap::new();
        map.insert(ERROR_CODE_FIELD.to_string(), Value::String(code.into()));
        map.insert(
            ERROR_CORRELATION_FIELD.to_string(),
            Value::String(correlation.into()),
        );
        Self(map)
    }

    /// Error code.
    #[must_use]
    pub fn code(&self) -> &str {
        self.get_str(ERROR_CODE_FIELD).unwrap_or_default()
    }

    /// Correlation id.
    #[must_use]
    pub fn correlation(&self) -> &str {
        self.get_str(ERROR_CORRELATION_FIELD).unwrap_or_default()
    }
}

impl JsonEntity for ErrorResponse {
    fn from_map(map: JsonMap) -> Self {
        Self(map)
    }

    fn as_map(&self) -> &JsonMap {
        &self.0
    }

    fn into_map(self) -> JsonMap {
        self.0
    }
}

json_entity!(ErrorResponse);

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(status_for(ErrorKind::BadRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorKind::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::InternalError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(ErrorKind::ServiceUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_anyhow_wrapping_service_error_is_unwrapped() {
        let error = AppError::from(anyhow::Error::new(ServiceError::unauthorized()));

        assert!(matches!(
            error,
            AppError::Service(ServiceError::Unauthorized { .. })
        ));
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_other_anyhow_errors_are_unexpected() {
        let error = AppError::from(anyhow::anyhow!("database exploded"));

        assert!(matches!(error, AppError::Unexpected(_)));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_error_response_wire_format() {
        let body = ErrorResponse::new("NOT_FOUND", "abc-123");

        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error.code":"NOT_FOUND","error.correlation":"abc-123"}"#
        );
        assert_eq!(body.code(), "NOT_FOUND");
        assert_eq!(body.correlation(), "abc-123");
    }

    #[test]
    fn test_error_response_round_trip() {
        let body = ErrorResponse::new("INVALID_REQUEST", "c-1");

        let decoded: ErrorResponse =
            serde_json::from_str(&serde_json::to_string(&body).unwrap()).unwrap();

        assert_eq!(decoded, body);
    }

    #[test]
    fn test_into_response_records_failure() {
        let response = AppError::from(ServiceError::forbidden()).into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let pending = response.extensions().get::<PendingFailure>().unwrap();
        assert_eq!(pending.0.code(), "FORBIDDEN");
    }
}
