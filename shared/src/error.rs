//! # Error Types for the Status List Service
//!
//! This module defines all error types used throughout the system,
//! providing detailed error information for callers and for logging.

use thiserror::Error;

/// Main error type for the entire system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    // =========================================================================
    // VALIDATION ERRORS
    // =========================================================================

    /// Status list length is zero or above the configured maximum
    #[error("Invalid status list length {length}: {reason}")]
    InvalidLength { length: usize, reason: String },

    /// Index outside `[0, length)`
    #[error("Index {index} is out of range for status list of length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// Action not legal for the list's purpose
    #[error("Action '{action}' is not supported on a {purpose} status list")]
    UnsupportedAction { action: String, purpose: String },

    /// Malformed symmetric key
    #[error("Invalid symmetric key: {0}")]
    InvalidKey(String),

    /// Invalid request format or parameter combination
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // LOOKUP ERRORS
    // =========================================================================

    /// No version exists for the requested name (or version tag)
    #[error("Status list '{name}' not found in collection '{collection_id}'")]
    NotFound { collection_id: String, name: String },

    /// A chain already exists for the name being created
    #[error("Status list '{name}' already exists in collection '{collection_id}'")]
    AlreadyExists { collection_id: String, name: String },

    // =========================================================================
    // PAYLOAD ERRORS
    // =========================================================================

    /// Wrong key or tampered ciphertext
    #[error("Failed to decrypt status list: {0}")]
    DecryptionError(String),

    /// Malformed transport payload
    #[error("Failed to decode status list: {0}")]
    DecodingError(String),

    /// Payload could not be produced
    #[error("Failed to encode status list: {0}")]
    EncodingError(String),

    // =========================================================================
    // CHAIN ERRORS
    // =========================================================================

    /// More than one version of a chain claims to be the head
    #[error("Status list '{name}' has {heads} competing head versions")]
    AmbiguousHead { name: String, heads: usize },

    /// Conditional append rejected because the head moved
    #[error("Head of status list '{name}' changed during publication")]
    HeadConflict { name: String },

    /// A version was stored but could not be linked to its predecessor
    #[error("Version {resource_id} of status list '{name}' was stored but not linked: {reason}")]
    PartialPublish {
        name: String,
        resource_id: String,
        reason: String,
    },

    // =========================================================================
    // REGISTRY ERRORS
    // =========================================================================

    /// Transient registry I/O failure
    #[error("Resource registry unavailable: {0}")]
    RegistryUnavailable(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Missing required environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // =========================================================================
    // GENERIC ERRORS
    // =========================================================================

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type alias using StatusError
pub type StatusResult<T> = Result<T, StatusError>;

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<serde_json::Error> for StatusError {
    fn from(err: serde_json::Error) -> Self {
        StatusError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for StatusError {
    fn from(err: std::io::Error) -> Self {
        StatusError::InternalError(err.to_string())
    }
}

impl From<hex::FromHexError> for StatusError {
    fn from(err: hex::FromHexError) -> Self {
        StatusError::DecodingError(err.to_string())
    }
}

impl From<base64::DecodeError> for StatusError {
    fn from(err: base64::DecodeError) -> Self {
        StatusError::DecodingError(err.to_string())
    }
}

// =============================================================================
// ERROR CATEGORIES (for logging and HTTP mapping)
// =============================================================================

impl StatusError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            StatusError::InvalidLength { .. }
            | StatusError::IndexOutOfRange { .. }
            | StatusError::UnsupportedAction { .. }
            | StatusError::InvalidKey(_)
            | StatusError::InvalidRequest(_) => "validation",

            StatusError::NotFound { .. } => "not_found",

            StatusError::AlreadyExists { .. } => "already_exists",

            StatusError::DecryptionError(_) => "decryption",

            StatusError::DecodingError(_) | StatusError::EncodingError(_) => "codec",

            StatusError::AmbiguousHead { .. }
            | StatusError::HeadConflict { .. }
            | StatusError::PartialPublish { .. } => "chain",

            StatusError::RegistryUnavailable(_) => "registry",

            StatusError::ConfigurationError(_) | StatusError::MissingEnvVar(_) => "config",

            StatusError::SerializationError(_) | StatusError::InternalError(_) => "internal",
        }
    }

    /// Whether the caller may retry the whole operation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StatusError::RegistryUnavailable(_) | StatusError::HeadConflict { .. }
        )
    }

    /// Whether the error stems from caller input rather than system state
    pub fn is_validation(&self) -> bool {
        self.category() == "validation"
    }

    /// Shorthand for `StatusError::NotFound`
    pub fn not_found(collection_id: &str, name: &str) -> Self {
        StatusError::NotFound {
            collection_id: collection_id.to_string(),
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = StatusError::IndexOutOfRange { index: 9, length: 8 };
        assert_eq!(err.category(), "validation");
        assert!(err.is_validation());

        let err = StatusError::AmbiguousHead { name: "list".into(), heads: 2 };
        assert_eq!(err.category(), "chain");

        let err = StatusError::not_found("did:example:123", "list");
        assert_eq!(err.category(), "not_found");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_is_retryable() {
        assert!(StatusError::RegistryUnavailable("timeout".into()).is_retryable());
        assert!(StatusError::HeadConflict { name: "list".into() }.is_retryable());
        assert!(!StatusError::DecryptionError("bad tag".into()).is_retryable());

        let err = StatusError::PartialPublish {
            name: "list".into(),
            resource_id: "r2".into(),
            reason: "registry unavailable".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.category(), "chain");
    }

    #[test]
    fn test_error_message_carries_context() {
        let err = StatusError::UnsupportedAction {
            action: "revoke".into(),
            purpose: "suspension".into(),
        };
        assert_eq!(
            err.to_string(),
            "Action 'revoke' is not supported on a suspension status list"
        );
    }
}
