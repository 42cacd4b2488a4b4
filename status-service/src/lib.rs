//! # Status Service
//!
//! Versioned bitstring status lists for verifiable credentials:
//! - Compact gzip-compressed bitstrings, optionally AES-256-GCM encrypted
//! - Immutable versions chained in a resource registry
//! - Revocation (irreversible) and suspension (reversible) purposes
//! - REST API over the four status operations
//!
//! ## Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`status_list`] | codec, cipher and the in-memory engine |
//! | [`registry`] | registry trait, in-memory and HTTP backends |
//! | [`chain`] | head resolution and conditional publication |
//! | [`service`] | create / broadcast / check / update façade |
//! | [`api`] | axum router |

pub mod api;
pub mod cache;
pub mod chain;
pub mod registry;
pub mod service;
pub mod status_list;

use std::sync::Arc;

use shared::config::StatusServiceConfig;
use shared::error::StatusResult;

/// Application state shared across handlers
pub struct AppState {
    /// Configuration
    pub config: StatusServiceConfig,
    /// Status operations
    pub service: service::StatusService,
    /// Resource cache, shared with the service
    pub cache: Arc<cache::CacheManager>,
}

impl AppState {
    /// Wire registry, cache and service from configuration
    pub fn from_config(config: StatusServiceConfig) -> StatusResult<Self> {
        let registry = registry::from_config(&config.registry)?;
        let cache = Arc::new(cache::CacheManager::new(&config.cache));
        let service = service::StatusService::new(registry, Arc::clone(&cache), &config);

        Ok(Self { config, service, cache })
    }
}
