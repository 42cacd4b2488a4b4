//! # In-Memory Resource Registry
//!
//! Process-local registry used by tests, local runs and benchmarks.
//! Conditional appends are atomic under a single write lock.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

use shared::constants::STATUS_LIST_MEDIA_TYPE;
use shared::error::{StatusError, StatusResult};
use shared::types::{ResourceDraft, ResourceMetadata, StoredResource};

use super::{chain_heads, ResourceRegistry};

/// Process-local registry
pub struct InMemoryRegistry {
    /// Resources per collection, in creation order
    collections: RwLock<HashMap<String, Vec<StoredResource>>>,

    conditional: bool,

    available: AtomicBool,

    /// Number of write calls received
    writes: AtomicUsize,
}

impl InMemoryRegistry {
    /// Registry with conditional append
    pub fn new() -> Self {
        Self::with_conditional(true)
    }

    /// Registry without conditional append: only put + link
    pub fn append_only() -> Self {
        Self::with_conditional(false)
    }

    fn with_conditional(conditional: bool) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            conditional,
            available: AtomicBool::new(true),
            writes: AtomicUsize::new(0),
        }
    }

    /// Simulate an outage: every call fails with `RegistryUnavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of write calls (put, link, conditional append) received
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Total number of stored resources
    pub fn len(&self) -> usize {
        self.collections.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> StatusResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StatusError::RegistryUnavailable("in-memory registry is offline".into()))
        }
    }

    fn record_write(&self) -> StatusResult<()> {
        self.ensure_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn store(
        resources: &mut Vec<StoredResource>,
        collection_id: &str,
        draft: ResourceDraft,
    ) -> ResourceMetadata {
        let metadata = ResourceMetadata {
            collection_id: collection_id.to_string(),
            resource_id: Uuid::new_v4().to_string(),
            name: draft.name,
            resource_type: draft.resource_type.as_str().to_string(),
            version: draft.version,
            media_type: STATUS_LIST_MEDIA_TYPE.to_string(),
            created: Utc::now(),
            checksum: draft.checksum,
            previous_version_id: draft.previous_version_id,
            next_version_id: None,
            also_known_as: draft.also_known_as,
        };

        debug!(
            collection_id = %collection_id,
            resource_id = %metadata.resource_id,
            name = %metadata.name,
            "Stored resource"
        );

        resources.push(StoredResource {
            metadata: metadata.clone(),
            data: draft.data,
        });
        metadata
    }

    fn link(
        resources: &mut [StoredResource],
        collection_id: &str,
        previous_id: &str,
        next_id: &str,
    ) -> StatusResult<()> {
        let previous = resources
            .iter_mut()
            .find(|r| r.metadata.resource_id == previous_id)
            .ok_or_else(|| StatusError::not_found(collection_id, previous_id))?;
        previous.metadata.next_version_id = Some(next_id.to_string());
        Ok(())
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceRegistry for InMemoryRegistry {
    async fn put_resource(
        &self,
        collection_id: &str,
        draft: ResourceDraft,
    ) -> StatusResult<ResourceMetadata> {
        self.record_write()?;
        let mut collections = self.collections.write();
        let resources = collections.entry(collection_id.to_string()).or_default();
        Ok(Self::store(resources, collection_id, draft))
    }

    async fn link_version(
        &self,
        collection_id: &str,
        previous_id: &str,
        next_id: &str,
    ) -> StatusResult<()> {
        self.record_write()?;
        let mut collections = self.collections.write();
        let resources = collections
            .get_mut(collection_id)
            .ok_or_else(|| StatusError::not_found(collection_id, previous_id))?;
        Self::link(resources, collection_id, previous_id, next_id)
    }

    async fn list_resources_by_name(
        &self,
        collection_id: &str,
        name: &str,
    ) -> StatusResult<Vec<ResourceMetadata>> {
        self.ensure_available()?;
        Ok(self
            .collections
            .read()
            .get(collection_id)
            .map(|resources| {
                resources
                    .iter()
                    .filter(|r| r.metadata.name == name)
                    .map(|r| r.metadata.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_resources(&self, collection_id: &str) -> StatusResult<Vec<ResourceMetadata>> {
        self.ensure_available()?;
        Ok(self
            .collections
            .read()
            .get(collection_id)
            .map(|resources| resources.iter().map(|r| r.metadata.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_resource(
        &self,
        collection_id: &str,
        resource_id: &str,
    ) -> StatusResult<StoredResource> {
        self.ensure_available()?;
        self.collections
            .read()
            .get(collection_id)
            .and_then(|resources| resources.iter().find(|r| r.metadata.resource_id == resource_id))
            .cloned()
            .ok_or_else(|| StatusError::not_found(collection_id, resource_id))
    }

    fn supports_conditional_append(&self) -> bool {
        self.conditional
    }

    async fn compare_and_append(
        &self,
        collection_id: &str,
        mut draft: ResourceDraft,
        expected_head: Option<&str>,
    ) -> StatusResult<ResourceMetadata> {
        if !self.conditional {
            return Err(StatusError::InternalError(
                "registry does not support conditional append".into(),
            ));
        }
        self.record_write()?;

        let mut collections = self.collections.write();
        let resources = collections.entry(collection_id.to_string()).or_default();

        let heads: Vec<String> = chain_heads(
            resources.iter().map(|r| &r.metadata),
            &draft.name,
            draft.resource_type.as_str(),
        )
        .into_iter()
        .map(|m| m.resource_id.clone())
        .collect();

        let matches = match expected_head {
            None => heads.is_empty(),
            Some(expected) => heads.len() == 1 && heads[0] == expected,
        };
        if !matches {
            return Err(StatusError::HeadConflict { name: draft.name });
        }

        draft.previous_version_id = expected_head.map(str::to_string);
        let metadata = Self::store(resources, collection_id, draft);
        if let Some(previous_id) = expected_head {
            Self::link(resources, collection_id, previous_id, &metadata.resource_id)?;
        }

        Ok(metadata)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
