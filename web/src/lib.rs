//! Axum web framework integration for JsonData.
//!
//! This crate puts the pieces of `jsondata-core` behind HTTP:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  CorrelationIdLayer                     │  ← correlation id per request
//! │  ┌───────────────────────────────────┐  │
//! │  │  ErrorMappingLayer                │  │  ← failure → JSON error body
//! │  │  ┌─────────────────────────────┐  │  │
//! │  │  │  panic layer                │  │  │  ← panic → unexpected failure
//! │  │  │  ┌───────────────────────┐  │  │  │
//! │  │  │  │  handler + guards     │  │  │  │  ← Entity<T>, schema checks
//! │  │  │  └───────────────────────┘  │  │  │
//! │  │  └─────────────────────────────┘  │  │
//! │  └───────────────────────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. **HTTP Request** gets a correlation id
//! 2. **Extract** the body as an [`Entity`]
//! 3. **Guard** the operation with request and response schemas
//! 4. **Map** any failure to `{"error.code": ..., "error.correlation": ...}`
//! 5. **Return response** to client
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, extract::State, routing::post};
//! use jsondata_core::JsonBean;
//! use jsondata_web::{AppError, AppState, Entity, WebConfig, install};
//!
//! async fn echo(
//!     State(state): State<AppState>,
//!     Entity(request): Entity<JsonBean>,
//! ) -> Result<Entity<JsonBean>, AppError> {
//!     let response = state
//!         .request_guard("echo.json")
//!         .call(request, Ok::<_, AppError>)?;
//!     Ok(Entity(response))
//! }
//!
//! let config = WebConfig::from_env()?;
//! let app = install(
//!     Router::new().route("/echo", post(echo)),
//!     &config,
//! )?
//! .with_state(AppState::from_config(&config));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod mapper;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use axum::Router;

// Re-export key types for convenience
pub use config::{ConfigError, WebConfig};
pub use error::{AppError, ErrorResponse};
pub use extractors::{CorrelationId, Entity};
pub use mapper::ErrorMapper;
pub use middleware::{
    CORRELATION_ID_HEADER, CorrelationIdExt, CorrelationIdLayer, ErrorMappingLayer,
    RequestCorrelation, correlation_id_layer, error_mapping_layer, panic_layer,
};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Apply the JsonData layers to `router`.
///
/// Outermost first: correlation id, error mapping (with
/// [`RequestCorrelation`]), then the panic layer when
/// [`WebConfig::catch_panics`] is set.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidHeader`] if the configured correlation header
/// is not a valid header name.
pub fn install<S>(router: Router<S>, config: &WebConfig) -> Result<Router<S>, ConfigError>
where
    S: Clone + Send + Sync + 'static,
{
    install_with(
        router,
        config,
        ErrorMapper::new(Arc::new(RequestCorrelation)),
    )
}

/// Like [`install`], mapping failures with `mapper`.
///
/// # Errors
///
/// Same as [`install`].
pub fn install_with<S>(
    router: Router<S>,
    config: &WebConfig,
    mapper: ErrorMapper,
) -> Result<Router<S>, ConfigError>
where
    S: Clone + Send + Sync + 'static,
{
    let header = config.header_name()?;

    let router = if config.catch_panics {
        router.layer(panic_layer())
    } else {
        router
    };

    tracing::debug!(
        header = %header,
        catch_panics = config.catch_panics,
        "Installing JsonData layers"
    );

    Ok(router
        .layer(ErrorMappingLayer::new(mapper))
        .layer(CorrelationIdLayer::new(header)))
}
