//! Conversion of handler failures into error responses.
//!
//! The [`ErrorMapper`] is the single place where a failure becomes an HTTP
//! response. It asks its [`CorrelationSource`] for the current correlation id,
//! logs the failure at error level, and answers with the status from the
//! failure's category and an [`ErrorResponse`] body.
//!
//! Dispatch is an ordered table, most specific first:
//!
//! | Failure | Status | Code |
//! |---|---|---|
//! | `ServiceError::Unauthorized` | 401 | `UNAUTHORIZED` |
//! | `ServiceError::Forbidden` | 403 | `FORBIDDEN` |
//! | `ServiceError::NotFound` | 404 | `NOT_FOUND` |
//! | `ServiceError::BadRequest` | 400 | error's code |
//! | `ServiceError::InternalError` | 500 | error's code |
//! | `ServiceError::ServiceUnavailable` | 503 | error's code |
//! | anything else | 500 | `INTERNAL_ERROR` |
//!
//! Error responses that did not come from an [`AppError`] and carry no JSON
//! body, such as axum extractor rejections, are mapped too:
//!
//! | Status | Treated as |
//! |---|---|
//! | 400, 413, 415, 422 | `ServiceError::BadRequest` with `BAD_CONTENT` |
//! | 401, 403, 404 | the matching `ServiceError` |
//! | any other 4xx or 5xx | unexpected |

use std::fmt;
use std::sync::Arc;

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use jsondata_core::{CorrelationSource, ServiceError, codes};

use crate::error::{AppError, ErrorResponse, PendingFailure};

/// Renders failures as JSON error responses.
#[derive(Clone)]
pub struct ErrorMapper {
    correlation: Arc<dyn CorrelationSource>,
}

impl ErrorMapper {
    /// Create a mapper reporting correlation ids from `correlation`.
    #[must_use]
    pub fn new(correlation: Arc<dyn CorrelationSource>) -> Self {
        Self { correlation }
    }

    /// Log `error` and build the status and body answering it.
    ///
    /// Never fails. The failure's cause goes to the log only; the body holds
    /// nothing but the code and the correlation id.
    #[must_use]
    pub fn error_response(&self, error: &AppError) -> (StatusCode, ErrorResponse) {
        let correlation = self.correlation.correlation();
        let status = error.status();
        let label = label(error);
        let code = error.code();

        tracing::error!(
            status = status.as_u16(),
            code = %code,
            correlation = %correlation,
            error = ?error,
            "{label}"
        );

        (status, ErrorResponse::new(code, correlation))
    }

    /// Log `error` and build the full HTTP response.
    #[must_use]
    pub fn handle(&self, error: &AppError) -> Response {
        let (status, body) = self.error_response(error);
        (status, Json(body)).into_response()
    }

    /// Replace a failure response with the mapped one.
    ///
    /// A response produced from an [`AppError`] is mapped from that error.
    /// Any other 4xx or 5xx response without a JSON body is mapped from its
    /// status. Everything else is returned unchanged.
    #[must_use]
    pub fn map_response(&self, response: Response) -> Response {
        if let Some(PendingFailure(error)) = response.extensions().get::<PendingFailure>().cloned()
        {
            return self.handle(&error);
        }

        match bare_failure(&response) {
            Some(error) => self.handle(&error),
            None => response,
        }
    }
}

impl fmt::Debug for ErrorMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorMapper").finish_non_exhaustive()
    }
}

/// Log label for a failure.
const fn label(error: &AppError) -> &'static str {
    match error {
        AppError::Service(ServiceError::Unauthorized { .. }) => "Unauthorized",
        AppError::Service(ServiceError::Forbidden { .. }) => "Forbidden",
        AppError::Service(ServiceError::NotFound { .. }) => "Not found",
        AppError::Service(ServiceError::BadRequest { .. }) => "Bad request",
        AppError::Service(ServiceError::InternalError { .. }) => "Internal error",
        AppError::Service(ServiceError::ServiceUnavailable { .. }) => "Service unavailable",
        AppError::Unexpected(_) => "Unexpected error",
    }
}

/// Failure behind an error response that bypassed [`AppError`].
fn bare_failure(response: &Response) -> Option<AppError> {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || has_json_body(response) {
        return None;
    }

    let cause = format!("{status} response without an error body");
    let error = match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE
        | StatusCode::UNPROCESSABLE_ENTITY => ServiceError::bad_request(codes::BAD_CONTENT),
        StatusCode::UNAUTHORIZED => ServiceError::unauthorized(),
        StatusCode::FORBIDDEN => ServiceError::forbidden(),
        StatusCode::NOT_FOUND => ServiceError::not_found(),
        _ => return Some(AppError::unexpected(anyhow::Error::msg(cause))),
    };

    Some(error.with_cause(cause).into())
}

fn has_json_body(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}
