//! Application state for Axum handlers.
//!
//! `AppState` holds the schema source shared by every guarded handler.
//! Applications with more state can embed it in their own state struct.
//!
//! # Examples
//!
//! ```ignore
//! use axum::extract::State;
//! use jsondata_core::JsonBean;
//! use jsondata_web::{AppError, AppState, Entity};
//!
//! async fn create(
//!     State(state): State<AppState>,
//!     Entity(order): Entity<JsonBean>,
//! ) -> Result<Entity<JsonBean>, AppError> {
//!     let saved = state
//!         .guards("order-request.json", "order-response.json")
//!         .call_async(order, |order| async move { Ok::<_, AppError>(order) })
//!         .await?;
//!     Ok(Entity(saved))
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use jsondata_core::{Guards, RequestGuard, ResponseGuard, SchemaDirectory, ValidatorSource};

use crate::config::WebConfig;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    validators: Arc<dyn ValidatorSource>,
}

impl AppState {
    /// Create a state resolving schemas through `validators`.
    #[must_use]
    pub fn new(validators: Arc<dyn ValidatorSource>) -> Self {
        Self { validators }
    }

    /// Create a state loading schemas from the configured directory.
    #[must_use]
    pub fn from_config(config: &WebConfig) -> Self {
        Self::new(Arc::new(SchemaDirectory::new(config.schema_dir.clone())))
    }

    /// The shared schema source.
    #[must_use]
    pub fn validators(&self) -> Arc<dyn ValidatorSource> {
        Arc::clone(&self.validators)
    }

    /// Guard requests against `schema`.
    #[must_use]
    pub fn request_guard(&self, schema: impl Into<String>) -> RequestGuard {
        RequestGuard::new(self.validators(), schema)
    }

    /// Guard responses against `schema`.
    #[must_use]
    pub fn response_guard(&self, schema: impl Into<String>) -> ResponseGuard {
        ResponseGuard::new(self.validators(), schema)
    }

    /// Guard both sides of an operation.
    #[must_use]
    pub fn guards(&self, request: impl Into<String>, response: impl Into<String>) -> Guards {
        Guards::new()
            .validate_request(self.validators(), request)
            .validate_response(self.validators(), response)
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use jsondata_core::{JsonBean, ServiceError};
    use jsondata_testing::mocks::StaticValidatorSource;

    const FOO_SCHEMA: &str =
        r#"{"required":["foo"],"properties":{"foo":{"enum":["FOO"]}}}"#;

    fn state() -> AppState {
        AppState::new(Arc::new(StaticValidatorSource::parse(FOO_SCHEMA).unwrap()))
    }

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for Axum)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_request_guard_uses_shared_validators() {
        let guard = state().request_guard("foo.json");

        assert_eq!(guard.schema(), "foo.json");
        assert!(guard.check(&JsonBean::new().put_string("foo", "FOO")).is_ok());
        assert_eq!(
            guard.check(&JsonBean::new()).unwrap_err().code(),
            "INVALID_REQUEST"
        );
    }

    #[test]
    fn test_response_guard_uses_shared_validators() {
        let guard = state().response_guard("foo.json");

        let error = guard
            .check(&JsonBean::new().put_string("foo", "BAR"))
            .unwrap_err();

        assert_eq!(error.code(), "INVALID_RESPONSE");
    }

    #[test]
    fn test_guards_cover_both_sides() {
        let guards = state().guards("in.json", "out.json");

        let result: Result<JsonBean, ServiceError> = guards.call(
            JsonBean::new().put_string("foo", "FOO"),
            |_| Ok(JsonBean::new().put_string("foo", "BAR")),
        );

        assert_eq!(result.unwrap_err().code(), "INVALID_RESPONSE");
    }

    #[test]
    fn test_from_config_reads_schema_dir() {
        let dir = std::env::temp_dir().join("jsondata-state-missing");
        let state = AppState::from_config(&WebConfig::default().with_schema_dir(&dir));

        let error = state
            .request_guard("absent.json")
            .check(&JsonBean::new().put_string("foo", "FOO"))
            .unwrap_err();

        assert_eq!(error.code(), "INTERNAL_ERROR");
    }
}
