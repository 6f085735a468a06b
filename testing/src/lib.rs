//! # JsonData Testing
//!
//! Testing utilities and helpers for JsonData.
//!
//! This crate provides:
//! - Mock implementations of the collaborator traits
//! - Test helpers for entities and HTTP responses
//! - Property-based testing strategies for JSON data
//! - A Given-When-Then harness for guarded operations
//!
//! ## Example
//!
//! ```ignore
//! use jsondata_testing::{GuardTest, mocks::StaticValidatorSource};
//!
//! #[test]
//! fn rejects_wrong_foo() {
//!     let schemas = StaticValidatorSource::parse(FOO_SCHEMA).unwrap();
//!
//!     GuardTest::new(Guards::new().validate_request(Arc::new(schemas), "foo.json"))
//!         .given_request(bean(json!({"foo": "BAR"})))
//!         .then_error_code("INVALID_REQUEST")
//!         .then_not_called()
//!         .run();
//! }
//! ```

pub mod strategies;

pub use guard_test::GuardTest;

/// Mock implementations for testing.
pub mod mocks {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use jsondata_core::{
        CorrelationSource, JsonValidator, SchemaError, Validator, ValidatorSource,
    };
    use serde_json::Value;

    /// Correlation source that always reports the same id.
    ///
    /// # Example
    ///
    /// ```
    /// use jsondata_core::CorrelationSource;
    /// use jsondata_testing::mocks::FixedCorrelation;
    ///
    /// let correlation = FixedCorrelation::new("CORRELATION");
    /// assert_eq!(correlation.correlation(), "CORRELATION");
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedCorrelation {
        id: String,
    }

    impl FixedCorrelation {
        /// Create a new fixed correlation source.
        #[must_use]
        pub fn new(id: impl Into<String>) -> Self {
            Self { id: id.into() }
        }
    }

    impl CorrelationSource for FixedCorrelation {
        fn correlation(&self) -> String {
            self.id.clone()
        }
    }

    /// Validator source answering every schema name with one validator.
    #[derive(Clone)]
    pub struct StaticValidatorSource {
        validator: Arc<dyn Validator>,
    }

    impl StaticValidatorSource {
        /// Serve `validator` for every name.
        #[must_use]
        pub fn new(validator: Arc<dyn Validator>) -> Self {
            Self { validator }
        }

        /// Serve the schema given as JSON text.
        ///
        /// # Errors
        ///
        /// Returns a [`SchemaError`] if the schema does not compile.
        pub fn parse(schema: &str) -> Result<Self, SchemaError> {
            Ok(Self::new(Arc::new(JsonValidator::parse("static", schema)?)))
        }

        /// Serve the schema given as a JSON value.
        ///
        /// # Errors
        ///
        /// Returns a [`SchemaError`] if the schema does not compile.
        pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
            Ok(Self::new(Arc::new(JsonValidator::new("static", schema)?)))
        }
    }

    impl std::fmt::Debug for StaticValidatorSource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("StaticValidatorSource").finish_non_exhaustive()
        }
    }

    impl ValidatorSource for StaticValidatorSource {
        fn validator(&self, _schema: &str) -> Result<Arc<dyn Validator>, SchemaError> {
            Ok(Arc::clone(&self.validator))
        }
    }

    /// Validator source that knows no schemas at all.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct MissingSchemas;

    impl ValidatorSource for MissingSchemas {
        fn validator(&self, schema: &str) -> Result<Arc<dyn Validator>, SchemaError> {
            Err(SchemaError::NotFound {
                name: schema.to_string(),
            })
        }
    }

    /// Counts how often a guarded operation ran.
    ///
    /// Clones share the counter, so a clone can be moved into the operation.
    ///
    /// # Example
    ///
    /// ```
    /// use jsondata_testing::mocks::CountingOperation;
    ///
    /// let operation = CountingOperation::new();
    /// let echoed = operation.echo(42);
    /// assert_eq!(echoed, 42);
    /// assert_eq!(operation.calls(), 1);
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct CountingOperation {
        calls: Arc<AtomicUsize>,
    }

    impl CountingOperation {
        /// Create a counter at zero.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Record one call.
        pub fn record(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }

        /// Record one call and hand `value` back.
        pub fn echo<T>(&self, value: T) -> T {
            self.record();
            value
        }

        /// Number of recorded calls.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Whether the operation never ran.
        #[must_use]
        pub fn never_called(&self) -> bool {
            self.calls() == 0
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use std::io;
    use std::sync::Arc;

    use axum::response::Response;
    use parking_lot::Mutex;
    use jsondata_core::{JsonBean, JsonMap};
    use serde_json::Value;

    /// Build a [`JsonBean`] from a JSON literal.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not a JSON object.
    #[must_use]
    #[allow(clippy::panic)] // Test helper
    pub fn bean(value: Value) -> JsonBean {
        match value {
            Value::Object(map) => JsonBean::from(map),
            other => panic!("expected a JSON object, got {other}"),
        }
    }

    /// Build a [`JsonMap`] from a JSON literal.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not a JSON object.
    #[must_use]
    pub fn map(value: Value) -> JsonMap {
        bean(value).into()
    }

    /// Read a response body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body cannot be read or is not JSON.
    #[allow(clippy::expect_used)] // Test helper
    pub async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body should be readable");
        serde_json::from_slice(&bytes).expect("response body should be JSON")
    }

    /// Install a tracing subscriber for test output.
    ///
    /// Safe to call from every test; only the first call installs it.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "jsondata_core=debug,jsondata_web=debug".into()),
            )
            .with_test_writer()
            .try_init();
    }

    /// Writer collecting formatted log lines in memory.
    #[derive(Debug, Clone, Default)]
    pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        /// Everything written so far.
        #[must_use]
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a subscriber recording its events, returning `f`'s result
    /// and the formatted log output.
    ///
    /// Lines carry the level first (`ERROR`, ` WARN`, ...) without timestamps
    /// or colors, followed by the target, the message and `key=value` fields.
    pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        (result, buffer.contents())
    }
}

// Re-export commonly used items
pub use helpers::{bean, body_json, capture_logs, init_test_tracing};
pub use mocks::{CountingOperation, FixedCorrelation, MissingSchemas, StaticValidatorSource};

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use jsondata_core::{JsonEntity, ValidatorSource};
    use serde_json::json;

    #[test]
    fn test_fixed_correlation() {
        use jsondata_core::CorrelationSource;

        let correlation = FixedCorrelation::new("abc");
        assert_eq!(correlation.correlation(), correlation.correlation());
        assert_eq!(correlation.correlation(), "abc");
    }

    #[test]
    fn test_static_source_ignores_name() {
        let source = StaticValidatorSource::from_value(&json!({"required": ["foo"]})).unwrap();

        let any = source.validator("anything.json").unwrap();
        let other = source.validator("other.json").unwrap();

        assert!(any.validate(bean(json!({"foo": 1})).as_map()).is_ok());
        assert!(other.validate(bean(json!({})).as_map()).is_err());
    }

    #[test]
    fn test_missing_schemas() {
        assert!(MissingSchemas.validator("foo.json").is_err());
    }

    #[test]
    fn test_counting_operation_shares_counter() {
        let operation = CountingOperation::new();
        let clone = operation.clone();

        assert!(operation.never_called());
        clone.record();
        clone.record();

        assert_eq!(operation.calls(), 2);
    }

    #[test]
    fn test_capture_logs_records_level_and_fields() {
        let (value, logs) = capture_logs(|| {
            tracing::error!(code = "NOT_FOUND", "Not found");
            42
        });

        assert_eq!(value, 42);
        let line = logs.lines().next().unwrap();
        assert!(line.starts_with("ERROR"));
        assert!(line.contains("Not found"));
        assert!(line.contains("code=\"NOT_FOUND\""));
    }

    #[test]
    fn test_bean_helper() {
        let bean = bean(json!({"a": 1, "b": "two"}));

        assert_eq!(bean.get_i64("a"), Some(1));
        assert_eq!(bean.get_str("b"), Some("two"));
    }
}
