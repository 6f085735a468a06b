//! Named JSON schemas and the sources that resolve them.
//!
//! A guard only knows the name of the schema it enforces. At call time it asks
//! a [`ValidatorSource`] for the compiled [`Validator`] behind that name.
//! Two sources are provided:
//!
//! - [`SchemaRegistry`]: schemas registered up front, e.g. from `include_str!`
//! - [`SchemaDirectory`]: schemas loaded lazily from files and cached
//!
//! Schema evaluation itself is delegated to the `jsonschema` crate.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use crate::entity::JsonMap;

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending value (empty for the root)
    pub pointer: String,
    /// What the schema expected
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pointer.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.pointer, self.message)
        }
    }
}

/// An entity did not match its schema.
#[derive(Debug, Clone, Error)]
#[error("Entity does not match schema '{schema}': {}", summarize(.violations))]
pub struct ValidationError {
    schema: String,
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Create a validation error for the named schema.
    #[must_use]
    pub fn new(schema: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            schema: schema.into(),
            violations,
        }
    }

    /// Name of the schema that rejected the entity.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Every violation reported by the schema.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A schema could not be resolved into a validator.
///
/// This is a configuration problem of the service, never the caller's fault.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema is known under this name.
    #[error("Schema '{name}' not found")]
    NotFound {
        /// Requested schema name
        name: String,
    },

    /// The name would escape the schema directory.
    #[error("Schema name '{name}' must be a relative path without '..'")]
    InvalidName {
        /// Requested schema name
        name: String,
    },

    /// The schema file exists but could not be read.
    #[error("Failed to read schema '{name}': {source}")]
    Io {
        /// Requested schema name
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The schema is not valid JSON.
    #[error("Schema '{name}' is not valid JSON: {source}")]
    Parse {
        /// Requested schema name
        name: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The schema is valid JSON but not a valid JSON Schema.
    #[error("Schema '{name}' failed to compile: {message}")]
    Compile {
        /// Requested schema name
        name: String,
        /// Compiler diagnostic
        message: String,
    },
}

/// Checks JSON objects against one schema.
pub trait Validator: Send + Sync {
    /// Validate an entity's JSON object.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violation.
    fn validate(&self, entity: &JsonMap) -> Result<(), ValidationError>;
}

/// Resolves schema names into validators.
///
/// Implementations are shared between concurrent requests and must be safe
/// for concurrent reads.
pub trait ValidatorSource: Send + Sync {
    /// Look up the validator for `schema`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the schema is unknown or broken.
    fn validator(&self, schema: &str) -> Result<Arc<dyn Validator>, SchemaError>;
}

/// [`Validator`] backed by a compiled JSON Schema.
///
/// # Examples
///
/// ```
/// use jsondata_core::{JsonBean, JsonEntity, JsonValidator, Validator};
///
/// let validator = JsonValidator::parse(
///     "foo",
///     r#"{"required":["foo"],"properties":{"foo":{"enum":["FOO"]}}}"#,
/// )
/// .unwrap();
///
/// assert!(validator.validate(JsonBean::new().put_string("foo", "FOO").as_map()).is_ok());
/// assert!(validator.validate(JsonBean::new().put_string("foo", "BAR").as_map()).is_err());
/// ```
pub struct JsonValidator {
    name: String,
    schema: jsonschema::Validator,
}

impl JsonValidator {
    /// Compile a schema given as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Compile`] if `schema` is not a valid JSON Schema.
    pub fn new(name: impl Into<String>, schema: &Value) -> Result<Self, SchemaError> {
        let name = name.into();
        match jsonschema::validator_for(schema) {
            Ok(compiled) => Ok(Self {
                name,
                schema: compiled,
            }),
            Err(error) => Err(SchemaError::Compile {
                message: error.to_string(),
                name,
            }),
        }
    }

    /// Compile a schema given as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] for malformed JSON and
    /// [`SchemaError::Compile`] for an invalid schema.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, SchemaError> {
        let name = name.into();
        match serde_json::from_str::<Value>(text) {
            Ok(schema) => Self::new(name, &schema),
            Err(source) => Err(SchemaError::Parse { name, source }),
        }
    }

    /// Name this validator reports in its errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for JsonValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonValidator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Validator for JsonValidator {
    fn validate(&self, entity: &JsonMap) -> Result<(), ValidationError> {
        let instance = Value::Object(entity.clone());
        let violations: Vec<Violation> = self
            .schema
            .iter_errors(&instance)
            .map(|error| Violation {
                pointer: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.name.clone(), violations))
        }
    }
}

/// Fixed set of schemas registered at startup.
///
/// # Examples
///
/// ```
/// use jsondata_core::{SchemaRegistry, ValidatorSource};
/// use serde_json::json;
///
/// let registry = SchemaRegistry::new()
///     .register("user.json", &json!({"required": ["name"]}))
///     .unwrap();
///
/// assert!(registry.validator("user.json").is_ok());
/// assert!(registry.validator("order.json").is_err());
/// ```
#[derive(Default, Clone)]
pub struct SchemaRegistry {
    validators: HashMap<String, Arc<dyn Validator>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a schema under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Compile`] if the schema is invalid.
    pub fn register(self, name: impl Into<String>, schema: &Value) -> Result<Self, SchemaError> {
        let name = name.into();
        let validator = JsonValidator::new(name.clone(), schema)?;
        Ok(self.with_validator(name, Arc::new(validator)))
    }

    /// Register a schema given as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] or [`SchemaError::Compile`].
    pub fn register_str(self, name: impl Into<String>, text: &str) -> Result<Self, SchemaError> {
        let name = name.into();
        let validator = JsonValidator::parse(name.clone(), text)?;
        Ok(self.with_validator(name, Arc::new(validator)))
    }

    /// Register an already-built validator.
    #[must_use]
    pub fn with_validator(mut self, name: impl Into<String>, validator: Arc<dyn Validator>) -> Self {
        self.validators.insert(name.into(), validator);
        self
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.validators.keys().collect();
        names.sort();
        f.debug_struct("SchemaRegistry")
            .field("schemas", &names)
            .finish()
    }
}

impl ValidatorSource for SchemaRegistry {
    fn validator(&self, schema: &str) -> Result<Arc<dyn Validator>, SchemaError> {
        self.validators
            .get(schema)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound {
                name: schema.to_string(),
            })
    }
}

/// Schemas stored as files under a root directory.
///
/// A schema name is a path relative to the root (for example
/// `"users/create.json"`). Each schema is compiled on first use and cached for
/// the lifetime of the source.
pub struct SchemaDirectory {
    root: PathBuf,
    cache: RwLock<HashMap<String, Arc<dyn Validator>>>,
}

impl SchemaDirectory {
    /// Serve schemas from `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Directory schemas are loaded from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of schemas compiled so far.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }

    fn load(&self, name: &str) -> Result<JsonValidator, SchemaError> {
        let relative = Path::new(name);
        let is_plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || !is_plain {
            return Err(SchemaError::InvalidName {
                name: name.to_string(),
            });
        }

        let path = self.root.join(relative);
        let text = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                SchemaError::NotFound {
                    name: name.to_string(),
                }
            } else {
                SchemaError::Io {
                    name: name.to_string(),
                    source,
                }
            }
        })?;

        tracing::debug!(schema = %name, path = %path.display(), "Compiling schema");
        JsonValidator::parse(name, &text)
    }
}

impl fmt::Debug for SchemaDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDirectory")
            .field("root", &self.root)
            .field("cached", &self.cached())
            .finish()
    }
}

impl ValidatorSource for SchemaDirectory {
    fn validator(&self, schema: &str) -> Result<Arc<dyn Validator>, SchemaError> {
        if let Some(validator) = self.cache.read().get(schema) {
            return Ok(Arc::clone(validator));
        }

        let loaded: Arc<dyn Validator> = Arc::new(self.load(schema)?);
        let mut cache = self.cache.write();
        // Another request may have compiled the same schema meanwhile; keep the first.
        let validator = cache
            .entry(schema.to_string())
            .or_insert_with(|| loaded);
        Ok(Arc::clone(validator))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::entity::{JsonBean, JsonEntity};
    use serde_json::json;

    const FOO_SCHEMA: &str = r#"{"required":["foo"],"properties":{"foo":{"enum":["FOO"]}}}"#;

    fn bean(value: Value) -> JsonBean {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validator_accepts_matching_entity() {
        let validator = JsonValidator::parse("foo.json", FOO_SCHEMA).unwrap();

        assert!(validator.validate(bean(json!({"foo": "FOO"})).as_map()).is_ok());
    }

    #[test]
    fn test_validator_reports_every_violation() {
        let schema = json!({
            "required": ["foo", "bar"],
            "properties": {"foo": {"enum": ["FOO"]}}
        });
        let validator = JsonValidator::new("pair.json", &schema).unwrap();

        let error = validator
            .validate(bean(json!({"foo": "BAR"})).as_map())
            .unwrap_err();

        assert_eq!(error.schema(), "pair.json");
        assert_eq!(error.violations().len(), 2);
        assert!(
            error
                .violations()
                .iter()
                .any(|violation| violation.pointer == "/foo")
        );
    }

    #[test]
    fn test_invalid_schema_text() {
        let error = JsonValidator::parse("broken.json", "{not json").unwrap_err();
        assert!(matches!(error, SchemaError::Parse { .. }));

        let error = JsonValidator::new("typo.json", &json!({"type": "string", "pattern": "("})).unwrap_err();
        assert!(matches!(error, SchemaError::Compile { .. }));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SchemaRegistry::new()
            .register_str("foo.json", FOO_SCHEMA)
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.validator("foo.json").is_ok());
        assert!(matches!(
            registry.validator("bar.json"),
            Err(SchemaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_directory_loads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("users")).unwrap();
        std::fs::write(dir.path().join("users/foo.json"), FOO_SCHEMA).unwrap();
        let source = SchemaDirectory::new(dir.path());

        let first = source.validator("users/foo.json").unwrap();
        let second = source.validator("users/foo.json").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.cached(), 1);
        assert!(first.validate(bean(json!({"foo": "BAR"})).as_map()).is_err());
    }

    #[test]
    fn test_directory_missing_schema() {
        let dir = tempfile::tempdir().unwrap();
        let source = SchemaDirectory::new(dir.path());

        assert!(matches!(
            source.validator("absent.json"),
            Err(SchemaError::NotFound { .. })
        ));
        assert_eq!(source.cached(), 0);
    }

    #[test]
    fn test_directory_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let source = SchemaDirectory::new(dir.path());

        for name in ["../secret.json", "/etc/passwd", "a/../../b.json", ""] {
            assert!(
                matches!(source.validator(name), Err(SchemaError::InvalidName { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_schema_accepts_anything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty-schema.json"), "{}").unwrap();
        let source = SchemaDirectory::new(dir.path());

        let validator = source.validator("empty-schema.json").unwrap();

        assert!(validator.validate(bean(json!({"any": [1, 2]})).as_map()).is_ok());
    }
}
