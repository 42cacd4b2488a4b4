//! # Constants for the Status List Service
//!
//! Defaults and wire-level names shared by the service, the HTTP adapter
//! and the benchmark tooling.

// =============================================================================
// STATUS LIST DEFAULTS
// =============================================================================

/// Default number of bits in a freshly allocated status list (16 KB raw)
pub const DEFAULT_STATUS_LIST_LENGTH: usize = 140_000;

/// Upper bound on the number of bits a single list may hold
pub const MAX_STATUS_LIST_LENGTH: usize = 1 << 24;

/// Default transport encoding for published lists
pub const DEFAULT_STATUS_LIST_ENCODING: &str = "base64url";

/// Default number of read-modify-write attempts when the registry rejects a
/// conditional append because the head moved
pub const DEFAULT_MAX_PUBLISH_ATTEMPTS: u32 = 3;

// =============================================================================
// RESOURCE TYPES
// =============================================================================

/// Resource type for unencrypted revocation lists
pub const RESOURCE_TYPE_REVOCATION: &str = "StatusList2021Revocation";

/// Resource type for unencrypted suspension lists
pub const RESOURCE_TYPE_SUSPENSION: &str = "StatusList2021Suspension";

/// Resource type for encrypted revocation lists
pub const RESOURCE_TYPE_ENCRYPTED_REVOCATION: &str = "EncryptedStatusList2021Revocation";

/// Resource type for encrypted suspension lists
pub const RESOURCE_TYPE_ENCRYPTED_SUSPENSION: &str = "EncryptedStatusList2021Suspension";

/// Media type of every published status list resource
pub const STATUS_LIST_MEDIA_TYPE: &str = "application/json";

/// `type` of the embedded list for revocation purpose
pub const LIST_TYPE_REVOCATION: &str = "RevocationList2021";

/// `type` of the embedded list for suspension purpose
pub const LIST_TYPE_SUSPENSION: &str = "SuspensionList2021";

/// Credential status entry type embedded in issued credentials
pub const STATUS_ENTRY_TYPE: &str = "StatusList2021Entry";

// =============================================================================
// CIPHER
// =============================================================================

/// Symmetric key length in bytes (AES-256)
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes
pub const CIPHER_NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const CIPHER_TAG_LEN: usize = 16;

// =============================================================================
// CACHE CONFIGURATION
// =============================================================================

/// Time-to-live for cached resource bodies (1 hour)
pub const CACHE_TTL_RESOURCE_SECS: u64 = 60 * 60;

/// Maximum number of cached resource bodies
pub const CACHE_MAX_RESOURCES: u64 = 10_000;

// =============================================================================
// API CONFIGURATION
// =============================================================================

/// Default API port
pub const STATUS_SERVICE_PORT: u16 = 8080;

/// API version prefix
pub const API_VERSION: &str = "v1";

/// Maximum request body size (4 MB, large enough for a broadcast list)
pub const MAX_REQUEST_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Default registry request timeout (seconds)
pub const REGISTRY_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default registry endpoint for the HTTP backend
pub const DEFAULT_REGISTRY_URL: &str = "http://127.0.0.1:9100";

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

/// Registry backend (`memory` or `http`)
pub const ENV_REGISTRY_BACKEND: &str = "STATUS_REGISTRY_BACKEND";

/// Registry base URL for the HTTP backend
pub const ENV_REGISTRY_URL: &str = "STATUS_REGISTRY_URL";

/// Registry request timeout in seconds
pub const ENV_REGISTRY_TIMEOUT_SECS: &str = "STATUS_REGISTRY_TIMEOUT_SECS";

/// Whether the registry honours conditional appends
pub const ENV_REGISTRY_CONDITIONAL: &str = "STATUS_REGISTRY_CONDITIONAL";

/// Maximum publish attempts on head conflicts
pub const ENV_MAX_PUBLISH_ATTEMPTS: &str = "STATUS_MAX_PUBLISH_ATTEMPTS";

/// API bind host
pub const ENV_API_HOST: &str = "STATUS_API_HOST";

/// API bind port
pub const ENV_API_PORT: &str = "STATUS_API_PORT";

/// Log level for the service binary
pub const ENV_LOG_LEVEL: &str = "STATUS_LOG_LEVEL";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_length_is_16kb() {
        assert_eq!(DEFAULT_STATUS_LIST_LENGTH.div_ceil(8), 17_500);
        assert!(DEFAULT_STATUS_LIST_LENGTH < MAX_STATUS_LIST_LENGTH);
    }
}
