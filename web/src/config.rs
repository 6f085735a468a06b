//! Configuration for the web integration.
//!
//! Loads settings from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

use http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::middleware::CORRELATION_ID_HEADER;

/// Directory holding schema files, relative to the working directory.
pub const DEFAULT_SCHEMA_DIR: &str = "schemas";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The correlation header is not a valid HTTP header name.
    #[error("invalid correlation header name: {0:?}")]
    InvalidHeader(String),

    /// A boolean setting could not be parsed.
    #[error("invalid value for {key}: {value:?} (expected true or false)")]
    InvalidFlag {
        /// Environment variable name.
        key: &'static str,
        /// Value found.
        value: String,
    },
}

/// Web integration configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    /// Directory the schema files are loaded from (`JSONDATA_SCHEMA_DIR`)
    pub schema_dir: PathBuf,
    /// Header carrying the correlation id (`JSONDATA_CORRELATION_HEADER`)
    pub correlation_header: String,
    /// Map handler panics to error responses (`JSONDATA_CATCH_PANICS`)
    pub catch_panics: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
            correlation_header: CORRELATION_ID_HEADER.to_string(),
            catch_panics: true,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidFlag`] if `JSONDATA_CATCH_PANICS` is set
    /// to something other than a boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let catch_panics = match lookup("JSONDATA_CATCH_PANICS") {
            Some(value) => parse_flag("JSONDATA_CATCH_PANICS", &value)?,
            None => defaults.catch_panics,
        };

        Ok(Self {
            schema_dir: lookup("JSONDATA_SCHEMA_DIR")
                .map_or(defaults.schema_dir, PathBuf::from),
            correlation_header: lookup("JSONDATA_CORRELATION_HEADER")
                .unwrap_or(defaults.correlation_header),
            catch_panics,
        })
    }

    /// Set the schema directory.
    #[must_use]
    pub fn with_schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = dir.into();
        self
    }

    /// Set the correlation header.
    #[must_use]
    pub fn with_correlation_header(mut self, header: impl Into<String>) -> Self {
        self.correlation_header = header.into();
        self
    }

    /// Enable or disable panic mapping.
    #[must_use]
    pub const fn with_catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }

    /// Parsed correlation header name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHeader`] if the configured name is not a
    /// valid header name.
    pub fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::try_from(self.correlation_header.as_str())
            .map_err(|_| ConfigError::InvalidHeader(self.correlation_header.clone()))
    }
}

fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: value.to_string(),
        }),
    }
}
