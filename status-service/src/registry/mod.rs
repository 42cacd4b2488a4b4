//! # Resource Registry
//!
//! The registry is the only durable store: an append-only collection of
//! immutable resources per collection id, plus a mutable
//! `nextVersionId` link on each resource.
//!
//! Two implementations are provided:
//! - [`InMemoryRegistry`] for tests, local runs and benchmarks
//! - [`HttpRegistry`] for a remote registry reached over REST

mod http;
mod memory;

pub use http::HttpRegistry;
pub use memory::InMemoryRegistry;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use shared::config::{RegistryBackend, RegistryConfig};
use shared::error::{StatusError, StatusResult};
use shared::types::{ResourceDraft, ResourceMetadata, StoredResource};

/// Storage operations the chain manager relies on
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
    /// Append a new immutable resource
    async fn put_resource(
        &self,
        collection_id: &str,
        draft: ResourceDraft,
    ) -> StatusResult<ResourceMetadata>;

    /// Set `nextVersionId` of `previous_id` to `next_id`
    async fn link_version(
        &self,
        collection_id: &str,
        previous_id: &str,
        next_id: &str,
    ) -> StatusResult<()>;

    /// Metadata of every resource carrying `name`, in creation order
    async fn list_resources_by_name(
        &self,
        collection_id: &str,
        name: &str,
    ) -> StatusResult<Vec<ResourceMetadata>>;

    /// Metadata of every resource in a collection, in creation order
    async fn list_resources(&self, collection_id: &str) -> StatusResult<Vec<ResourceMetadata>>;

    /// Metadata and body of one resource
    async fn get_resource(
        &self,
        collection_id: &str,
        resource_id: &str,
    ) -> StatusResult<StoredResource>;

    /// Whether [`compare_and_append`](Self::compare_and_append) is honoured
    fn supports_conditional_append(&self) -> bool {
        false
    }

    /// Atomically append `draft` as the successor of `expected_head` and
    /// link it, failing with `HeadConflict` if the chain's head is no longer
    /// `expected_head` (`None` expects an empty chain).
    async fn compare_and_append(
        &self,
        collection_id: &str,
        draft: ResourceDraft,
        expected_head: Option<&str>,
    ) -> StatusResult<ResourceMetadata> {
        let _ = (collection_id, draft, expected_head);
        Err(StatusError::InternalError(format!(
            "{} registry does not support conditional append",
            self.backend_name()
        )))
    }

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Build the registry selected by configuration
pub fn from_config(config: &RegistryConfig) -> StatusResult<Arc<dyn ResourceRegistry>> {
    let registry: Arc<dyn ResourceRegistry> = match config.backend {
        RegistryBackend::Memory if config.conditional_append => Arc::new(InMemoryRegistry::new()),
        RegistryBackend::Memory => Arc::new(InMemoryRegistry::append_only()),
        RegistryBackend::Http => Arc::new(HttpRegistry::new(config)?),
    };

    info!(
        backend = registry.backend_name(),
        conditional_append = registry.supports_conditional_append(),
        "Resource registry ready"
    );

    Ok(registry)
}

/// Versions of `name` and `resource_type` without a successor
pub(crate) fn chain_heads<'a>(
    resources: impl Iterator<Item = &'a ResourceMetadata>,
    name: &str,
    resource_type: &str,
) -> Vec<&'a ResourceMetadata> {
    resources
        .filter(|m| m.name == name && m.resource_type == resource_type && m.is_head())
        .collect()
}
