//! # Configuration for the Status List Service
//!
//! Configuration is loaded from environment variables on top of defaults
//! and validated once at startup.

use crate::constants::*;
use crate::error::{StatusError, StatusResult};
use crate::types::Encoding;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// REGISTRY CONFIGURATION
// =============================================================================

/// Which resource registry backend to talk to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// In-process registry (development, tests, benchmarks)
    #[default]
    Memory,
    /// Remote registry reached over its REST API
    Http,
}

impl FromStr for RegistryBackend {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" | "inmemory" => Ok(RegistryBackend::Memory),
            "http" | "rest" => Ok(RegistryBackend::Http),
            other => Err(StatusError::ConfigurationError(format!(
                "unknown registry backend '{other}'"
            ))),
        }
    }
}

impl fmt::Display for RegistryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryBackend::Memory => write!(f, "memory"),
            RegistryBackend::Http => write!(f, "http"),
        }
    }
}

/// Registry connection and publication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub backend: RegistryBackend,

    /// Base URL of the HTTP backend
    pub endpoint: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Whether the registry honours conditional appends
    pub conditional_append: bool,

    /// Read-modify-write attempts before a head conflict is surfaced
    pub max_publish_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::default(),
            endpoint: DEFAULT_REGISTRY_URL.into(),
            timeout_secs: REGISTRY_REQUEST_TIMEOUT_SECS,
            conditional_append: true,
            max_publish_attempts: DEFAULT_MAX_PUBLISH_ATTEMPTS,
        }
    }
}

// =============================================================================
// STATUS LIST CONFIGURATION
// =============================================================================

/// Defaults applied to newly created lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusListConfig {
    /// Length used when a create request gives none
    pub default_length: usize,

    /// Encoding used when a create request gives none
    pub default_encoding: Encoding,

    /// Largest accepted list length
    pub max_length: usize,
}

impl Default for StatusListConfig {
    fn default() -> Self {
        Self {
            default_length: DEFAULT_STATUS_LIST_LENGTH,
            default_encoding: Encoding::Base64Url,
            max_length: MAX_STATUS_LIST_LENGTH,
        }
    }
}

// =============================================================================
// API CONFIGURATION
// =============================================================================

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    pub enable_cors: bool,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: STATUS_SERVICE_PORT,
            enable_cors: true,
            max_body_size: MAX_REQUEST_BODY_SIZE,
        }
    }
}

impl ApiConfig {
    /// Get the bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// CACHE CONFIGURATION
// =============================================================================

/// Cache for immutable resource bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,

    pub resource_ttl_secs: u64,

    pub max_resources: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resource_ttl_secs: CACHE_TTL_RESOURCE_SECS,
            max_resources: CACHE_MAX_RESOURCES,
        }
    }
}

// =============================================================================
// STATUS SERVICE CONFIGURATION
// =============================================================================

/// Configuration for the Status Service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusServiceConfig {
    pub registry: RegistryConfig,

    pub status_list: StatusListConfig,

    pub api: ApiConfig,

    pub cache: CacheConfig,

    /// `tracing` level name for the service binary
    pub log_level: String,
}

impl Default for StatusServiceConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            status_list: StatusListConfig::default(),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl StatusServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> StatusResult<Self> {
        let mut config = Self::default();

        if let Ok(backend) = env::var(ENV_REGISTRY_BACKEND) {
            config.registry.backend = backend.parse()?;
        }

        if let Ok(url) = env::var(ENV_REGISTRY_URL) {
            config.registry.endpoint = url;
        }

        if let Some(timeout) = parse_env::<u64>(ENV_REGISTRY_TIMEOUT_SECS)? {
            config.registry.timeout_secs = timeout;
        }

        if let Some(conditional) = parse_env::<bool>(ENV_REGISTRY_CONDITIONAL)? {
            config.registry.conditional_append = conditional;
        }

        if let Some(attempts) = parse_env::<u32>(ENV_MAX_PUBLISH_ATTEMPTS)? {
            config.registry.max_publish_attempts = attempts;
        }

        if let Ok(host) = env::var(ENV_API_HOST) {
            config.api.host = host;
        }

        if let Some(port) = parse_env::<u16>(ENV_API_PORT)? {
            config.api.port = port;
        }

        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> StatusResult<()> {
        if self.registry.max_publish_attempts == 0 {
            return Err(StatusError::ConfigurationError(
                "max_publish_attempts must be at least 1".into(),
            ));
        }

        if self.registry.backend == RegistryBackend::Http
            && self.registry.endpoint.trim().is_empty()
        {
            return Err(StatusError::MissingEnvVar(ENV_REGISTRY_URL.into()));
        }

        let list = &self.status_list;
        if list.max_length == 0 || list.max_length > MAX_STATUS_LIST_LENGTH {
            return Err(StatusError::ConfigurationError(format!(
                "max_length must be within 1..={MAX_STATUS_LIST_LENGTH}"
            )));
        }
        if list.default_length == 0 || list.default_length > list.max_length {
            return Err(StatusError::ConfigurationError(format!(
                "default_length {} exceeds max_length {}",
                list.default_length, list.max_length
            )));
        }

        Ok(())
    }
}

fn parse_env<T: FromStr>(name: &str) -> StatusResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                StatusError::ConfigurationError(format!("invalid value '{raw}' for {name}"))
            }),
        Err(_) => Ok(None),
    }
}
