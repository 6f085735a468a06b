//! Correlation ids for error responses.

/// Correlation reported when nothing better is known.
pub const UNDEFINED_CORRELATION: &str = "UNDEFINED";

/// Supplies the correlation id of the call currently being handled.
///
/// The error mapper asks for it once per failure. Implementations must not
/// fail and must be safe to call from many requests at once.
pub trait CorrelationSource: Send + Sync {
    /// Correlation id of the current call.
    fn correlation(&self) -> String;
}

/// Source that always reports [`UNDEFINED_CORRELATION`].
///
/// Used when the service does not track correlation ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UndefinedCorrelation;

impl CorrelationSource for UndefinedCorrelation {
    fn correlation(&self) -> String {
        UNDEFINED_CORRELATION.to_string()
    }
}
