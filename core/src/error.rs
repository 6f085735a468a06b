//! Service error taxonomy.
//!
//! [`ServiceError`] is what a service raises on purpose. Each variant belongs
//! to one [`ErrorKind`], which the web layer turns into an HTTP status, and
//! each instance carries a short machine-readable `code` that is shown to the
//! caller. The optional `cause` is only for logs and error chains.

use thiserror::Error;

/// Boxed error stored as the cause of a [`ServiceError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Well-known error codes.
pub mod codes {
    /// Fixed code of [`ServiceError::Unauthorized`](super::ServiceError::Unauthorized).
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    /// Fixed code of [`ServiceError::Forbidden`](super::ServiceError::Forbidden).
    pub const FORBIDDEN: &str = "FORBIDDEN";
    /// Fixed code of [`ServiceError::NotFound`](super::ServiceError::NotFound).
    pub const NOT_FOUND: &str = "NOT_FOUND";
    /// Code for failures that were not raised as a [`ServiceError`](super::ServiceError).
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    /// A request entity failed its schema.
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    /// A response entity failed its schema.
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
    /// A request body could not be decoded as a JSON object.
    pub const BAD_CONTENT: &str = "BAD_CONTENT";
}

/// Category of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Client sent something the service cannot accept.
    BadRequest,
    /// Caller is not authenticated.
    Unauthorized,
    /// Caller is authenticated but not allowed.
    Forbidden,
    /// Requested resource does not exist.
    NotFound,
    /// The service failed on its own.
    InternalError,
    /// The service cannot handle requests right now.
    ServiceUnavailable,
}

impl ErrorKind {
    /// Whether the failure was caused by the client.
    ///
    /// `Unauthorized`, `Forbidden` and `NotFound` are refinements of
    /// `BadRequest` and count as client errors.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(
            self,
            Self::BadRequest | Self::Unauthorized | Self::Forbidden | Self::NotFound
        )
    }
}

/// A categorized failure raised by a service.
///
/// # Examples
///
/// ```
/// use jsondata_core::{ErrorKind, ServiceError};
///
/// let error = ServiceError::bad_request("MISSING_NAME");
/// assert_eq!(error.code(), "MISSING_NAME");
/// assert_eq!(error.kind(), ErrorKind::BadRequest);
///
/// let error = ServiceError::not_found();
/// assert_eq!(error.code(), "NOT_FOUND");
/// assert!(error.kind().is_client_error());
/// ```
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input, with a caller-chosen code.
    #[error("Bad request: {code}")]
    BadRequest {
        /// Machine-readable error code
        code: String,
        /// Underlying failure, logged but never returned to the caller
        #[source]
        cause: Option<BoxError>,
    },

    /// Missing or invalid credentials.
    #[error("Unauthorized")]
    Unauthorized {
        /// Underlying failure, logged but never returned to the caller
        #[source]
        cause: Option<BoxError>,
    },

    /// Access denied.
    #[error("Forbidden")]
    Forbidden {
        /// Underlying failure, logged but never returned to the caller
        #[source]
        cause: Option<BoxError>,
    },

    /// Resource not found.
    #[error("Not found")]
    NotFound {
        /// Underlying failure, logged but never returned to the caller
        #[source]
        cause: Option<BoxError>,
    },

    /// Server-side failure, with a caller-chosen code.
    #[error("Internal error: {code}")]
    InternalError {
        /// Machine-readable error code
        code: String,
        /// Underlying failure, logged but never returned to the caller
        #[source]
        cause: Option<BoxError>,
    },

    /// Temporary outage, with a caller-chosen code.
    #[error("Service unavailable: {code}")]
    ServiceUnavailable {
        /// Machine-readable error code
        code: String,
        /// Underlying failure, logged but never returned to the caller
        #[source]
        cause: Option<BoxError>,
    },
}

impl ServiceError {
    /// Create a `BadRequest` error with the given code.
    #[must_use]
    pub fn bad_request(code: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            cause: None,
        }
    }

    /// Create an `Unauthorized` error.
    #[must_use]
    pub const fn unauthorized() -> Self {
        Self::Unauthorized { cause: None }
    }

    /// Create a `Forbidden` error.
    #[must_use]
    pub const fn forbidden() -> Self {
        Self::Forbidden { cause: None }
    }

    /// Create a `NotFound` error.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::NotFound { cause: None }
    }

    /// Create an `InternalError` with the given code.
    #[must_use]
    pub fn internal(code: impl Into<String>) -> Self {
        Self::InternalError {
            code: code.into(),
            cause: None,
        }
    }

    /// Create a `ServiceUnavailable` error with the given code.
    #[must_use]
    pub fn unavailable(code: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            code: code.into(),
            cause: None,
        }
    }

    /// Attach the underlying failure.
    #[must_use]
    pub fn with_cause(mut self, error: impl Into<BoxError>) -> Self {
        let slot = match &mut self {
            Self::BadRequest { cause, .. }
            | Self::Unauthorized { cause }
            | Self::Forbidden { cause }
            | Self::NotFound { cause }
            | Self::InternalError { cause, .. }
            | Self::ServiceUnavailable { cause, .. } => cause,
        };
        *slot = Some(error.into());
        self
    }

    /// The error's category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest { .. } => ErrorKind::BadRequest,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InternalError { .. } => ErrorKind::InternalError,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
        }
    }

    /// The machine-readable code shown to the caller.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::BadRequest { code, .. }
            | Self::InternalError { code, .. }
            | Self::ServiceUnavailable { code, .. } => code,
            Self::Unauthorized { .. } => codes::UNAUTHORIZED,
            Self::Forbidden { .. } => codes::FORBIDDEN,
            Self::NotFound { .. } => codes::NOT_FOUND,
        }
    }

    /// The underlying failure, if one was attached.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::BadRequest { cause, .. }
            | Self::Unauthorized { cause }
            | Self::Forbidden { cause }
            | Self::NotFound { cause }
            | Self::InternalError { cause, .. }
            | Self::ServiceUnavailable { cause, .. } => cause.as_deref(),
        }
    }
}
