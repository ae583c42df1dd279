//! Error types for the Aura client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Aura client.
///
/// Variants map onto the propagation classes in [`ErrorClass`]: authentication
/// failures cancel the whole session, validation failures roll back the
/// initiating controller's optimistic state, connectivity failures are retried
/// on the next poll tick and malformed responses are discarded at the
/// reconciliation boundary.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuraError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound { entity_type: String, id: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend rejected the bearer token (401).
    #[error("Session expired")]
    SessionExpired,

    /// The backend rejected the request with a detail message (4xx).
    #[error("{detail}")]
    Validation { detail: String },

    /// The authenticated user lacks the role for this endpoint (403).
    #[error("Forbidden: {detail}")]
    Forbidden { detail: String },

    /// Network, DNS or timeout failure.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// The backend answered with a 5xx status.
    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// The backend answered 2xx but the body did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How an error propagates through the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Session-wide: stop every poller, clear the session, go to login.
    Auth,
    /// Local to the initiating controller: roll back and show the detail.
    Validation,
    /// Transient: keep the schedule, retry on the next tick.
    Connectivity,
    /// Discarded at the reconciler; previous render state is retained.
    Malformed,
    /// Everything else.
    Other,
}

impl AuraError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Validation error carrying the server-provided detail
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    /// Creates a Forbidden error
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    /// Creates a Connectivity error
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity(message.into())
    }

    /// Creates a MalformedResponse error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Returns the propagation class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::SessionExpired => ErrorClass::Auth,
            Self::Validation { .. } | Self::Forbidden { .. } => ErrorClass::Validation,
            Self::Connectivity(_) | Self::Server { .. } => ErrorClass::Connectivity,
            Self::MalformedResponse(_) => ErrorClass::Malformed,
            _ => ErrorClass::Other,
        }
    }

    /// Check if this is an authentication failure
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Check if this is a validation rejection (including 403)
    pub fn is_validation(&self) -> bool {
        self.class() == ErrorClass::Validation
    }

    /// Check if this is a transient transport or server failure
    pub fn is_connectivity(&self) -> bool {
        self.class() == ErrorClass::Connectivity
    }

    /// Check if this is a malformed response
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Text shown to the user for this error.
    ///
    /// Validation details are surfaced verbatim; connectivity failures get a
    /// generic message so transport internals never reach the view.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { detail } | Self::Forbidden { detail } => detail.clone(),
            Self::Connectivity(_) | Self::Server { .. } => {
                "Unable to reach the server. Please try again.".to_string()
            }
            Self::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for AuraError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for AuraError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for AuraError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from String (for error messages)
impl From<String> for AuraError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, AuraError>`.
pub type Result<T> = std::result::Result<T, AuraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(AuraError::SessionExpired.class(), ErrorClass::Auth);
        assert_eq!(AuraError::validation("bad").class(), ErrorClass::Validation);
        assert_eq!(AuraError::forbidden("no").class(), ErrorClass::Validation);
        assert_eq!(
            AuraError::connectivity("timeout").class(),
            ErrorClass::Connectivity
        );
        assert_eq!(
            AuraError::Server {
                status: 502,
                detail: "bad gateway".into()
            }
            .class(),
            ErrorClass::Connectivity
        );
        assert_eq!(AuraError::malformed("x").class(), ErrorClass::Malformed);
        assert_eq!(AuraError::internal("x").class(), ErrorClass::Other);
    }

    #[test]
    fn test_validation_detail_is_verbatim() {
        let err = AuraError::validation("Tên tài khoản đã được sử dụng");
        assert_eq!(err.user_message(), "Tên tài khoản đã được sử dụng");
        assert_eq!(err.to_string(), "Tên tài khoản đã được sử dụng");
    }

    #[test]
    fn test_connectivity_message_is_generic() {
        let err = AuraError::connectivity("error sending request for url (http://x)");
        assert!(!err.user_message().contains("http://x"));
    }

    #[test]
    fn test_from_json_error() {
        let err: AuraError = serde_json::from_str::<serde_json::Value>("{ nope")
            .unwrap_err()
            .into();
        assert!(matches!(err, AuraError::Serialization { ref format, .. } if format == "JSON"));
    }
}
