//! # JsonData Core
//!
//! Framework-independent building blocks for JSON HTTP services.
//!
//! This crate provides:
//! - [`JsonEntity`]: a wrapper around an ordered JSON object, with [`JsonBean`]
//!   as the generic implementation
//! - [`codec`]: serde glue that makes entities (de)serialize as plain objects
//! - [`ServiceError`]: the categorized failures a service raises on purpose
//! - [`validation`]: named JSON schemas resolved through a [`ValidatorSource`]
//! - [`guard`]: request/response interceptors wrapped around operations
//! - [`correlation`]: the source of correlation ids attached to error bodies
//!
//! ## Example
//!
//! ```
//! use jsondata_core::{JsonBean, JsonEntity};
//!
//! let bean: JsonBean = serde_json::from_str(r#"{"foo":"FOO"}"#).unwrap();
//! assert_eq!(bean.get_str("foo"), Some("FOO"));
//! assert_eq!(serde_json::to_string(&bean).unwrap(), r#"{"foo":"FOO"}"#);
//! ```

pub mod codec;
pub mod correlation;
pub mod entity;
pub mod error;
pub mod guard;
pub mod validation;

pub use correlation::{CorrelationSource, UNDEFINED_CORRELATION, UndefinedCorrelation};
pub use entity::{JsonBean, JsonEntity, JsonMap};
pub use error::{BoxError, ErrorKind, ServiceError, codes};
pub use guard::{Guards, RequestGuard, ResponseGuard, into_service_error, wrap_errors};
pub use validation::{
    JsonValidator, SchemaDirectory, SchemaError, SchemaRegistry, ValidationError, Validator,
    ValidatorSource, Violation,
};

/// Re-exports used by [`json_entity!`]; not part of the public API.
#[doc(hidden)]
pub mod __private {
    pub use serde;
}
