//! Client error types.
//!
//! Provides the error hierarchy for all client operations:
//! - `ClientError`: Top-level error for validation, gateway and view operations
//! - `ValidationErrors`: Ordered collection of field-scoped input failures

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// One or more input fields failed validation.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The gateway answered with an error status.
    #[error("gateway error: {status} {message}")]
    Gateway {
        /// HTTP status code returned by the gateway.
        status: u16,
        /// Error text from the response body, if any.
        message: String,
    },

    /// The gateway could not be reached at the transport level.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The requested resource does not exist.
    #[error("not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// A gateway response did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The operation is not allowed in the current state.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// The expected state.
        expected: String,
        /// The actual state.
        actual: String,
    },

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Returns `true` when the failure is a transport or server problem
    /// rather than a problem with the submitted input.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ClientError::Gateway { .. } | ClientError::ConnectionFailed(_)
        )
    }

    /// Returns the field-scoped errors when the failure is a validation one.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationErrors> {
        match self {
            ClientError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// A single field-scoped validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The offending field, as named on the wire.
    pub field: String,
    /// Human-readable description of the failure.
    pub message: String,
}

/// An ordered collection of field-scoped validation failures.
///
/// Preserves insertion order so errors render in the same order as the
/// fields they describe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Absorbs another collection, prefixing each field with `prefix`.
    ///
    /// Used by the batch path to scope per-row failures (`row 2 Age`).
    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for e in other.errors {
            self.errors.push(FieldError {
                field: format!("{prefix} {}", e.field),
                message: e.message,
            });
        }
    }

    /// Returns `true` when no failures have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterates the failures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Returns the message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// Converts into `Err(ClientError::Validation)` when non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] carrying the collected failures.
    pub fn into_result(self) -> ClientResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::ConnectionFailed("host unreachable".into());
        assert_eq!(err.to_string(), "connection failed: host unreachable");
    }

    #[test]
    fn test_gateway_error_display() {
        let err = ClientError::Gateway {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("bad gateway"));
        assert!(err.is_network());
    }

    #[test]
    fn test_invalid_state_error() {
        let err = ClientError::InvalidState {
            expected: "at least two rows".into(),
            actual: "a single row".into(),
        };
        assert!(err.to_string().contains("at least two rows"));
        assert!(err.to_string().contains("a single row"));
        assert!(!err.is_network());
    }

    #[test]
    fn test_validation_errors_display_order() {
        let mut errors = ValidationErrors::new();
        errors.push("Age", "must be a whole number (got 'abc')");
        errors.push("Monthly_Spend", "must be between 10 and 400 (got 900)");
        assert_eq!(
            errors.to_string(),
            "Age: must be a whole number (got 'abc'); \
             Monthly_Spend: must be between 10 and 400 (got 900)"
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("Age"), Some("must be a whole number (got 'abc')"));
        assert_eq!(errors.get("Satisfaction_Score"), None);
    }

    #[test]
    fn test_validation_errors_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());

        let mut errors = ValidationErrors::new();
        errors.push("Age", "must be a whole number (got '')");
        let err = errors.into_result().unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(err.as_validation().is_some());
        assert!(err.to_string().contains("Age"));
    }

    #[test]
    fn test_extend_prefixed_scopes_fields() {
        let mut row_errors = ValidationErrors::new();
        row_errors.push("Age", "must be a whole number (got 'x')");

        let mut all = ValidationErrors::new();
        all.extend_prefixed("row 2", row_errors);
        assert_eq!(all.get("row 2 Age"), Some("must be a whole number (got 'x')"));
    }
}
