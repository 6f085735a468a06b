//! Interceptors wrapped around service operations.
//!
//! A guard is an explicit decorator: the caller hands it the operation as a
//! closure and the guard decides whether and how the operation runs.
//!
//! - [`RequestGuard`] validates the request entity *before* the operation and
//!   skips the operation entirely when validation fails.
//! - [`ResponseGuard`] runs the operation first and validates the entity it
//!   returned.
//! - [`Guards`] combines both on a single operation.
//! - [`wrap_errors`] turns any failure that is not a [`ServiceError`] into an
//!   internal error.
//!
//! Guards are generic over the operation's error type: anything implementing
//! `From<ServiceError>` works, so handlers can keep their own error type.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use jsondata_core::{JsonBean, JsonEntity, RequestGuard, SchemaRegistry, ServiceError};
//! use serde_json::json;
//!
//! let schemas = SchemaRegistry::new()
//!     .register("foo.json", &json!({"required": ["foo"]}))
//!     .unwrap();
//! let guard = RequestGuard::new(Arc::new(schemas), "foo.json");
//!
//! let echoed: Result<JsonBean, ServiceError> =
//!     guard.call(JsonBean::new().put_string("foo", "FOO"), Ok);
//! assert!(echoed.is_ok());
//!
//! let rejected: Result<JsonBean, ServiceError> = guard.call(JsonBean::new(), Ok);
//! assert_eq!(rejected.unwrap_err().code(), "INVALID_REQUEST");
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::entity::JsonEntity;
use crate::error::{ServiceError, codes};
use crate::validation::{Validator, ValidatorSource};

/// Validates the request entity before the operation runs.
#[derive(Clone)]
pub struct RequestGuard {
    validators: Arc<dyn ValidatorSource>,
    schema: String,
}

impl RequestGuard {
    /// Guard requests with the schema named `schema`.
    #[must_use]
    pub fn new(validators: Arc<dyn ValidatorSource>, schema: impl Into<String>) -> Self {
        Self {
            validators,
            schema: schema.into(),
        }
    }

    /// Name of the enforced schema.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Validate a request entity.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` with code `INVALID_REQUEST` when the entity does not
    /// match, or `InternalError` with code `INTERNAL_ERROR` when the schema
    /// cannot be resolved.
    pub fn check<E: JsonEntity>(&self, request: &E) -> Result<(), ServiceError> {
        let validator = resolve(self.validators.as_ref(), &self.schema)?;
        validator.validate(request.as_map()).map_err(|error| {
            tracing::debug!(
                schema = %self.schema,
                violations = error.violations().len(),
                "Request rejected by schema"
            );
            ServiceError::bad_request(codes::INVALID_REQUEST).with_cause(error)
        })
    }

    /// Validate `request`, then run `operation` with it.
    ///
    /// The operation is not called if validation fails.
    ///
    /// # Errors
    ///
    /// Returns the validation failure converted into `Err`, or whatever the
    /// operation returns.
    pub fn call<E, T, Err, F>(&self, request: E, operation: F) -> Result<T, Err>
    where
        E: JsonEntity,
        Err: From<ServiceError>,
        F: FnOnce(E) -> Result<T, Err>,
    {
        self.check(&request)?;
        operation(request)
    }

    /// Async form of [`call`](Self::call).
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_async<E, T, Err, F, Fut>(&self, request: E, operation: F) -> Result<T, Err>
    where
        E: JsonEntity,
        Err: From<ServiceError>,
        F: FnOnce(E) -> Fut,
        Fut: Future<Output = Result<T, Err>>,
    {
        self.check(&request)?;
        operation(request).await
    }
}

impl fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGuard")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Validates the entity an operation returns.
#[derive(Clone)]
pub struct ResponseGuard {
    validators: Arc<dyn ValidatorSource>,
    schema: String,
}

impl ResponseGuard {
    /// Guard responses with the schema named `schema`.
    #[must_use]
    pub fn new(validators: Arc<dyn ValidatorSource>, schema: impl Into<String>) -> Self {
        Self {
            validators,
            schema: schema.into(),
        }
    }

    /// Name of the enforced schema.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Validate a response entity.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` with code `INVALID_RESPONSE` when the entity
    /// does not match, or `InternalError` with code `INTERNAL_ERROR` when the
    /// schema cannot be resolved.
    pub fn check<E: JsonEntity>(&self, response: &E) -> Result<(), ServiceError> {
        let validator = resolve(self.validators.as_ref(), &self.schema)?;
        validator.validate(response.as_map()).map_err(|error| {
            tracing::debug!(
                schema = %self.schema,
                violations = error.violations().len(),
                "Response rejected by schema"
            );
            ServiceError::internal(codes::INVALID_RESPONSE).with_cause(error)
        })
    }

    /// Run `operation`, then validate the entity it returned.
    ///
    /// A failing operation is passed through untouched and nothing is
    /// validated. An invalid result is dropped, never returned.
    ///
    /// # Errors
    ///
    /// Returns the operation's error, or the validation failure converted
    /// into `Err`.
    pub fn call<T, Err, F>(&self, operation: F) -> Result<T, Err>
    where
        T: JsonEntity,
        Err: From<ServiceError>,
        F: FnOnce() -> Result<T, Err>,
    {
        let response = operation()?;
        self.check(&response)?;
        Ok(response)
    }

    /// Async form of [`call`](Self::call).
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_async<T, Err, Fut>(&self, operation: Fut) -> Result<T, Err>
    where
        T: JsonEntity,
        Err: From<ServiceError>,
        Fut: Future<Output = Result<T, Err>>,
    {
        let response = operation.await?;
        self.check(&response)?;
        Ok(response)
    }
}

impl fmt::Debug for ResponseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseGuard")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Request and response guards attached to one operation.
///
/// Either side is optional; an empty `Guards` just runs the operation.
#[derive(Debug, Clone, Default)]
pub struct Guards {
    request: Option<RequestGuard>,
    response: Option<ResponseGuard>,
}

impl Guards {
    /// No guards.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate requests against `schema` from `validators`.
    #[must_use]
    pub fn validate_request(
        mut self,
        validators: Arc<dyn ValidatorSource>,
        schema: impl Into<String>,
    ) -> Self {
        self.request = Some(RequestGuard::new(validators, schema));
        self
    }

    /// Validate responses against `schema` from `validators`.
    #[must_use]
    pub fn validate_response(
        mut self,
        validators: Arc<dyn ValidatorSource>,
        schema: impl Into<String>,
    ) -> Self {
        self.response = Some(ResponseGuard::new(validators, schema));
        self
    }

    /// The request guard, if any.
    #[must_use]
    pub const fn request(&self) -> Option<&RequestGuard> {
        self.request.as_ref()
    }

    /// The response guard, if any.
    #[must_use]
    pub const fn response(&self) -> Option<&ResponseGuard> {
        self.response.as_ref()
    }

    /// Run `operation` between the configured guards.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure or the operation's own error.
    pub fn call<Req, Res, Err, F>(&self, request: Req, operation: F) -> Result<Res, Err>
    where
        Req: JsonEntity,
        Res: JsonEntity,
        Err: From<ServiceError>,
        F: FnOnce(Req) -> Result<Res, Err>,
    {
        if let Some(guard) = &self.request {
            guard.check(&request)?;
        }
        let response = operation(request)?;
        if let Some(guard) = &self.response {
            guard.check(&response)?;
        }
        Ok(response)
    }

    /// Async form of [`call`](Self::call).
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_async<Req, Res, Err, F, Fut>(
        &self,
        request: Req,
        operation: F,
    ) -> Result<Res, Err>
    where
        Req: JsonEntity,
        Res: JsonEntity,
        Err: From<ServiceError>,
        F: FnOnce(Req) -> Fut,
        Fut: Future<Output = Result<Res, Err>>,
    {
        if let Some(guard) = &self.request {
            guard.check(&request)?;
        }
        let response = operation(request).await?;
        if let Some(guard) = &self.response {
            guard.check(&response)?;
        }
        Ok(response)
    }
}

/// Run `operation` and make sure any failure is a [`ServiceError`].
///
/// # Errors
///
/// A [`ServiceError`] raised by the operation is returned as is; any other
/// failure becomes `InternalError` with code `INTERNAL_ERROR`.
pub fn wrap_errors<T, F>(operation: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    operation().map_err(into_service_error)
}

/// Classify an arbitrary failure as a [`ServiceError`].
///
/// A wrapped `ServiceError` is unwrapped; anything else becomes
/// `InternalError` with code `INTERNAL_ERROR` and the original as cause.
#[must_use]
pub fn into_service_error(error: anyhow::Error) -> ServiceError {
    match error.downcast::<ServiceError>() {
        Ok(service) => service,
        Err(other) => ServiceError::internal(codes::INTERNAL_ERROR).with_cause(other),
    }
}

fn resolve(validators: &dyn ValidatorSource, schema: &str) -> Result<Arc<dyn Validator>, ServiceError> {
    validators.validator(schema).map_err(|error| {
        tracing::error!(schema = %schema, error = %error, "Schema could not be resolved");
        ServiceError::internal(codes::INTERNAL_ERROR).with_cause(error)
    })
}
