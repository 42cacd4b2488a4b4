//! # Resource Version Chain Manager
//!
//! Every version of a status list is an immutable registry resource. The
//! versions sharing `(collection_id, name, resource_type)` form a chain
//! linked through `previousVersionId`/`nextVersionId`; the version with no
//! successor is the head.
//!
//! ## Publication
//!
//! When the registry supports conditional append, a publication is a
//! read-modify-write cycle that is re-run from a fresh head whenever the
//! registry reports that the head moved. Otherwise publication is put +
//! link, and concurrent writers fork the chain. A fork is never repaired
//! here; it surfaces as `AmbiguousHead` on the next resolution.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use shared::constants::DEFAULT_MAX_PUBLISH_ATTEMPTS;
use shared::error::{StatusError, StatusResult};
use shared::types::{
    AlternativeUri, ResourceDraft, ResourceMetadata, StatusListPayload, StatusListResourceType,
    StatusListResourceVersion, StatusListSummary, StatusPurpose,
};

use crate::cache::CacheManager;
use crate::registry::ResourceRegistry;
use crate::status_list::payload_checksum;

/// Narrows name resolution to some of the four resource types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainSelector {
    pub purpose: Option<StatusPurpose>,
    pub encrypted: Option<bool>,
}

impl ChainSelector {
    /// Any status list type
    pub fn any() -> Self {
        Self::default()
    }

    /// Exactly one resource type
    pub fn exact(resource_type: StatusListResourceType) -> Self {
        Self {
            purpose: Some(resource_type.purpose()),
            encrypted: Some(resource_type.is_encrypted()),
        }
    }

    pub fn new(purpose: Option<StatusPurpose>, encrypted: Option<bool>) -> Self {
        Self { purpose, encrypted }
    }

    pub fn matches(&self, metadata: &ResourceMetadata) -> bool {
        metadata
            .status_list_type()
            .is_some_and(|t| t.matches(self.purpose, self.encrypted))
    }
}

/// What to publish on top of the current head
#[derive(Debug, Clone)]
pub struct PublishPlan {
    pub resource_type: StatusListResourceType,
    pub payload: StatusListPayload,

    /// Version tag; defaults to the publication timestamp
    pub version: Option<String>,

    pub also_known_as: Vec<AlternativeUri>,
}

/// Resolves and extends status list chains
pub struct ChainManager {
    registry: Arc<dyn ResourceRegistry>,
    cache: Arc<CacheManager>,
    max_publish_attempts: u32,
}

impl ChainManager {
    pub fn new(registry: Arc<dyn ResourceRegistry>, cache: Arc<CacheManager>) -> Self {
        Self {
            registry,
            cache,
            max_publish_attempts: DEFAULT_MAX_PUBLISH_ATTEMPTS,
        }
    }

    /// Set the number of read-modify-write attempts (at least one)
    pub fn with_max_publish_attempts(mut self, attempts: u32) -> Self {
        self.max_publish_attempts = attempts.max(1);
        self
    }

    pub fn registry(&self) -> &Arc<dyn ResourceRegistry> {
        &self.registry
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// The single head of the chain selected by `name` and `selector`
    pub async fn resolve_head(
        &self,
        collection_id: &str,
        name: &str,
        selector: ChainSelector,
    ) -> StatusResult<StatusListResourceVersion> {
        self.try_resolve_head(collection_id, name, selector)
            .await?
            .ok_or_else(|| StatusError::not_found(collection_id, name))
    }

    /// Like [`resolve_head`](Self::resolve_head), but `None` for an empty chain
    pub async fn try_resolve_head(
        &self,
        collection_id: &str,
        name: &str,
        selector: ChainSelector,
    ) -> StatusResult<Option<StatusListResourceVersion>> {
        let members = self.members(collection_id, name, selector).await?;
        if members.is_empty() {
            return Ok(None);
        }

        let mut heads: Vec<ResourceMetadata> =
            members.into_iter().filter(ResourceMetadata::is_head).collect();
        match heads.len() {
            0 => Err(StatusError::InternalError(format!(
                "status list '{name}' has versions but no head"
            ))),
            1 => {
                let head = heads.remove(0);
                self.load(head).await.map(Some)
            }
            count => {
                warn!(
                    collection_id = %collection_id,
                    name = %name,
                    heads = count,
                    resource_ids = ?heads
                        .iter()
                        .map(|h| h.resource_id.as_str())
                        .collect::<Vec<_>>(),
                    "Status list chain has competing heads"
                );
                Err(StatusError::AmbiguousHead {
                    name: name.to_string(),
                    heads: count,
                })
            }
        }
    }

    /// Whether any version of the selected chain exists
    pub async fn exists(
        &self,
        collection_id: &str,
        name: &str,
        selector: ChainSelector,
    ) -> StatusResult<bool> {
        Ok(!self.members(collection_id, name, selector).await?.is_empty())
    }

    /// The version tagged `version`, or the head when `None`.
    ///
    /// If several versions carry the same tag, the most recently created
    /// one wins.
    pub async fn resolve_version(
        &self,
        collection_id: &str,
        name: &str,
        selector: ChainSelector,
        version: Option<&str>,
    ) -> StatusResult<StatusListResourceVersion> {
        let Some(tag) = version else {
            return self.resolve_head(collection_id, name, selector).await;
        };

        let tagged = self
            .members(collection_id, name, selector)
            .await?
            .into_iter()
            .filter(|m| m.version == tag)
            .enumerate()
            .max_by_key(|(position, m)| (m.created, *position))
            .map(|(_, m)| m)
            .ok_or_else(|| StatusError::NotFound {
                collection_id: collection_id.to_string(),
                name: format!("{name}@{tag}"),
            })?;

        self.load(tagged).await
    }

    /// Head versions of a collection, optionally filtered. A forked chain
    /// shows up once per head.
    pub async fn search(
        &self,
        collection_id: &str,
        purpose: Option<StatusPurpose>,
        name: Option<&str>,
    ) -> StatusResult<Vec<StatusListSummary>> {
        let resources = match name {
            Some(name) => self.registry.list_resources_by_name(collection_id, name).await?,
            None => self.registry.list_resources(collection_id).await?,
        };

        let mut summaries: Vec<StatusListSummary> = resources
            .iter()
            .filter(|m| m.is_head())
            .filter_map(|m| {
                let resource_type = m.status_list_type()?;
                resource_type
                    .matches(purpose, None)
                    .then(|| StatusListSummary::from_metadata(m, resource_type))
            })
            .collect();

        summaries.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(
            collection_id = %collection_id,
            results = summaries.len(),
            "Searched status lists"
        );

        Ok(summaries)
    }

    /// The chain from its head back to the first version
    pub async fn history(
        &self,
        collection_id: &str,
        name: &str,
        selector: ChainSelector,
    ) -> StatusResult<Vec<StatusListResourceVersion>> {
        let members = self.members(collection_id, name, selector).await?;
        let head = self.resolve_head(collection_id, name, selector).await?;

        let by_id: HashMap<&str, &ResourceMetadata> =
            members.iter().map(|m| (m.resource_id.as_str(), m)).collect();
        let mut visited = HashSet::new();
        visited.insert(head.resource_id().to_string());

        let mut cursor = head.resource.previous_version_id.clone();
        let mut chain = vec![head];

        while let Some(id) = cursor {
            if !visited.insert(id.clone()) {
                return Err(StatusError::InternalError(format!(
                    "status list '{name}' has a cycle at {id}"
                )));
            }
            let metadata = by_id
                .get(id.as_str())
                .ok_or_else(|| StatusError::not_found(collection_id, &id))?;
            let version = self.load((*metadata).clone()).await?;
            cursor = version.resource.previous_version_id.clone();
            chain.push(version);
        }

        Ok(chain)
    }

    // =========================================================================
    // PUBLICATION
    // =========================================================================

    /// Publish `payload` as the new head of its chain
    pub async fn publish_head(
        &self,
        collection_id: &str,
        name: &str,
        resource_type: StatusListResourceType,
        payload: StatusListPayload,
        version: Option<String>,
    ) -> StatusResult<StatusListResourceVersion> {
        let (published, ()) = self
            .publish_with(collection_id, name, ChainSelector::exact(resource_type), |_| {
                Ok((
                    PublishPlan {
                        resource_type,
                        payload: payload.clone(),
                        version: version.clone(),
                        also_known_as: Vec::new(),
                    },
                    (),
                ))
            })
            .await?;
        Ok(published)
    }

    /// Resolve the head, let `build` derive the next version from it and
    /// publish the result.
    ///
    /// With conditional append the whole cycle, `build` included, is re-run
    /// when the head moves underneath it.
    pub async fn publish_with<F, T>(
        &self,
        collection_id: &str,
        name: &str,
        selector: ChainSelector,
        mut build: F,
    ) -> StatusResult<(StatusListResourceVersion, T)>
    where
        F: FnMut(Option<&StatusListResourceVersion>) -> StatusResult<(PublishPlan, T)> + Send,
        T: Send,
    {
        let conditional = self.registry.supports_conditional_append();

        for attempt in 1..=self.max_publish_attempts {
            let head = self.try_resolve_head(collection_id, name, selector).await?;
            let (plan, output) = build(head.as_ref())?;
            let head_id = head.as_ref().map(|h| h.resource_id().to_string());
            let draft = Self::draft(name, &plan, head_id.clone())?;

            let metadata = if conditional {
                match self
                    .registry
                    .compare_and_append(collection_id, draft, head_id.as_deref())
                    .await
                {
                    Ok(metadata) => metadata,
                    Err(StatusError::HeadConflict { .. }) => {
                        warn!(
                            collection_id = %collection_id,
                            name = %name,
                            attempt,
                            max_attempts = self.max_publish_attempts,
                            "Head moved during publication, retrying"
                        );
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            } else {
                let metadata = self.registry.put_resource(collection_id, draft).await?;
                if let Some(previous) = head_id.as_deref() {
                    if let Err(e) = self
                        .registry
                        .link_version(collection_id, previous, &metadata.resource_id)
                        .await
                    {
                        // The new version is stored but unlinked; the chain now has two heads
                        error!(
                            collection_id = %collection_id,
                            name = %name,
                            resource_id = %metadata.resource_id,
                            previous_version_id = %previous,
                            error = %e,
                            "Published version could not be linked"
                        );
                        return Err(StatusError::PartialPublish {
                            name: name.to_string(),
                            resource_id: metadata.resource_id,
                            reason: e.to_string(),
                        });
                    }
                }
                metadata
            };

            info!(
                collection_id = %collection_id,
                name = %name,
                resource_id = %metadata.resource_id,
                resource_type = %metadata.resource_type,
                version = %metadata.version,
                previous_version_id = ?metadata.previous_version_id,
                "Published status list version"
            );

            self.cache
                .put_payload(collection_id, &metadata.resource_id, Arc::new(plan.payload.clone()))
                .await;

            let version = StatusListResourceVersion {
                resource: metadata,
                payload: plan.payload,
            };
            return Ok((version, output));
        }

        Err(StatusError::HeadConflict { name: name.to_string() })
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    async fn members(
        &self,
        collection_id: &str,
        name: &str,
        selector: ChainSelector,
    ) -> StatusResult<Vec<ResourceMetadata>> {
        Ok(self
            .registry
            .list_resources_by_name(collection_id, name)
            .await?
            .into_iter()
            .filter(|m| selector.matches(m))
            .collect())
    }

    /// Fetch, parse and checksum-verify the body of a version
    async fn load(&self, metadata: ResourceMetadata) -> StatusResult<StatusListResourceVersion> {
        let cached = self
            .cache
            .get_payload(&metadata.collection_id, &metadata.resource_id)
            .await;
        if let Some(payload) = cached {
            return Ok(StatusListResourceVersion {
                resource: metadata,
                payload: (*payload).clone(),
            });
        }

        let stored = self
            .registry
            .get_resource(&metadata.collection_id, &metadata.resource_id)
            .await?;

        let payload: StatusListPayload = serde_json::from_slice(&stored.data).map_err(|e| {
            StatusError::DecodingError(format!(
                "resource {} is not a status list: {e}",
                metadata.resource_id
            ))
        })?;

        let checksum = payload_checksum(&payload)?;
        if !checksum.eq_ignore_ascii_case(&metadata.checksum) {
            return Err(StatusError::DecodingError(format!(
                "checksum mismatch for resource {}",
                metadata.resource_id
            )));
        }

        self.cache
            .put_payload(&metadata.collection_id, &metadata.resource_id, Arc::new(payload.clone()))
            .await;

        Ok(StatusListResourceVersion {
            resource: metadata,
            payload,
        })
    }

    fn draft(
        name: &str,
        plan: &PublishPlan,
        previous_version_id: Option<String>,
    ) -> StatusResult<ResourceDraft> {
        Ok(ResourceDraft {
            name: name.to_string(),
            resource_type: plan.resource_type,
            version: plan
                .version
                .clone()
                .unwrap_or_else(|| plan.payload.status_list.valid_from.to_rfc3339()),
            checksum: payload_checksum(&plan.payload)?,
            previous_version_id,
            also_known_as: plan.also_known_as.clone(),
            data: serde_json::to_vec(&plan.payload)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use crate::status_list::StatusList;
    use shared::types::{Encoding, StatusAction};

    fn manager(registry: Arc<InMemoryRegistry>) -> ChainManager {
        ChainManager::new(registry, Arc::new(CacheManager::disabled()))
    }

    fn payload(list: &StatusList) -> StatusListPayload {
        list.seal(Encoding::Base64Url, None).unwrap()
    }

    #[tokio::test]
    async fn test_publish_links_versions() {
        let registry = Arc::new(InMemoryRegistry::new());
        let chain = manager(registry.clone());
        let mut list = StatusList::allocate(16, StatusPurpose::Revocation).unwrap();

        let first = chain
            .publish_head(
                "did:1",
                "list",
                StatusListResourceType::Revocation,
                payload(&list),
                Some("1".into()),
            )
            .await
            .unwrap();
        assert!(first.resource.previous_version_id.is_none());

        list.apply_batch(&[3], StatusAction::Revoke).unwrap();
        let second = chain
            .publish_head(
                "did:1",
                "list",
                StatusListResourceType::Revocation,
                payload(&list),
                Some("2".into()),
            )
            .await
            .unwrap();
        assert_eq!(second.resource.previous_version_id.as_deref(), Some(first.resource_id()));

        let head = chain.resolve_head("did:1", "list", ChainSelector::any()).await.unwrap();
        assert_eq!(head.resource_id(), second.resource_id());

        let old = chain
            .resolve_version("did:1", "list", ChainSelector::any(), Some("1"))
            .await
            .unwrap();
        assert_eq!(old.resource.next_version_id.as_deref(), Some(second.resource_id()));

        let history = chain.history("did:1", "list", ChainSelector::any()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].resource_id(), first.resource_id());
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let chain = manager(Arc::new(InMemoryRegistry::new()));
        assert!(matches!(
            chain.resolve_head("did:1", "nope", ChainSelector::any()).await,
            Err(StatusError::NotFound { .. })
        ));
        assert!(matches!(
            chain
                .resolve_version("did:1", "nope", ChainSelector::any(), Some("v9"))
                .await,
            Err(StatusError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_name_shared_across_types_is_ambiguous() {
        let chain = manager(Arc::new(InMemoryRegistry::new()));
        let revocation = StatusList::allocate(8, StatusPurpose::Revocation).unwrap();
        let suspension = StatusList::allocate(8, StatusPurpose::Suspension).unwrap();

        chain
            .publish_head(
                "did:1",
                "shared",
                StatusListResourceType::Revocation,
                payload(&revocation),
                None,
            )
            .await
            .unwrap();
        chain
            .publish_head(
                "did:1",
                "shared",
                StatusListResourceType::Suspension,
                payload(&suspension),
                None,
            )
            .await
            .unwrap();

        assert!(matches!(
            chain.resolve_head("did:1", "shared", ChainSelector::any()).await,
            Err(StatusError::AmbiguousHead { heads: 2, .. })
        ));

        let narrowed = chain
            .resolve_head(
                "did:1",
                "shared",
                ChainSelector::new(Some(StatusPurpose::Suspension), None),
            )
            .await
            .unwrap();
        assert_eq!(narrowed.purpose(), StatusPurpose::Suspension);

        let found = chain.search("did:1", Some(StatusPurpose::Revocation), None).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(chain.search("did:1", None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fork_without_conditional_append() {
        let registry = Arc::new(InMemoryRegistry::append_only());
        let chain = manager(registry.clone());
        let list = StatusList::allocate(8, StatusPurpose::Suspension).unwrap();
        let first = chain
            .publish_head("did:1", "list", StatusListResourceType::Suspension, payload(&list), None)
            .await
            .unwrap();

        // A second writer that read the same head
        for _ in 0..2 {
            let data = serde_json::to_vec(&payload(&list)).unwrap();
            let draft = ResourceDraft {
                name: "list".into(),
                resource_type: StatusListResourceType::Suspension,
                version: "fork".into(),
                checksum: payload_checksum(&serde_json::from_slice(&data).unwrap()).unwrap(),
                previous_version_id: Some(first.resource_id().to_string()),
                also_known_as: Vec::new(),
                data,
            };
            let created = registry.put_resource("did:1", draft).await.unwrap();
            registry
                .link_version("did:1", first.resource_id(), &created.resource_id)
                .await
                .unwrap();
        }

        assert!(matches!(
            chain.resolve_head("did:1", "list", ChainSelector::any()).await,
            Err(StatusError::AmbiguousHead { heads: 2, .. })
        ));
        assert_eq!(chain.search("did:1", None, Some("list")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_decoding_error() {
        let registry = Arc::new(InMemoryRegistry::new());
        let chain = manager(registry.clone());
        let list = StatusList::allocate(8, StatusPurpose::Revocation).unwrap();
        let body = payload(&list);

        registry
            .put_resource(
                "did:1",
                ResourceDraft {
                    name: "bad".into(),
                    resource_type: StatusListResourceType::Revocation,
                    version: "1".into(),
                    checksum: "00".repeat(32),
                    previous_version_id: None,
                    also_known_as: Vec::new(),
                    data: serde_json::to_vec(&body).unwrap(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            chain.resolve_head("did:1", "bad", ChainSelector::any()).await,
            Err(StatusError::DecodingError(_))
        ));
    }

    /// Registry whose head always moves before a conditional append lands
    struct AlwaysConflicting {
        inner: InMemoryRegistry,
        appends: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ResourceRegistry for AlwaysConflicting {
        async fn put_resource(
            &self,
            collection_id: &str,
            draft: ResourceDraft,
        ) -> StatusResult<ResourceMetadata> {
            self.inner.put_resource(collection_id, draft).await
        }

        async fn link_version(
            &self,
            collection_id: &str,
            previous_id: &str,
            next_id: &str,
        ) -> StatusResult<()> {
            self.inner.link_version(collection_id, previous_id, next_id).await
        }

        async fn list_resources_by_name(
            &self,
            collection_id: &str,
            name: &str,
        ) -> StatusResult<Vec<ResourceMetadata>> {
            self.inner.list_resources_by_name(collection_id, name).await
        }

        async fn list_resources(&self, collection_id: &str) -> StatusResult<Vec<ResourceMetadata>> {
            self.inner.list_resources(collection_id).await
        }

        async fn get_resource(
            &self,
            collection_id: &str,
            resource_id: &str,
        ) -> StatusResult<shared::types::StoredResource> {
            self.inner.get_resource(collection_id, resource_id).await
        }

        fn supports_conditional_append(&self) -> bool {
            true
        }

        async fn compare_and_append(
            &self,
            _collection_id: &str,
            draft: ResourceDraft,
            _expected_head: Option<&str>,
        ) -> StatusResult<ResourceMetadata> {
            self.appends.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(StatusError::HeadConflict { name: draft.name })
        }

        fn backend_name(&self) -> &'static str {
            "conflicting"
        }
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let registry = Arc::new(AlwaysConflicting {
            inner: InMemoryRegistry::new(),
            appends: Default::default(),
        });
        let chain = ChainManager::new(registry.clone(), Arc::new(CacheManager::disabled()))
            .with_max_publish_attempts(2);
        let list = StatusList::allocate(8, StatusPurpose::Revocation).unwrap();

        let mut builds = 0;
        let result = chain
            .publish_with("did:1", "list", ChainSelector::any(), |_| {
                builds += 1;
                Ok((
                    PublishPlan {
                        resource_type: StatusListResourceType::Revocation,
                        payload: payload(&list),
                        version: None,
                        also_known_as: Vec::new(),
                    },
                    (),
                ))
            })
            .await;

        assert!(matches!(result, Err(StatusError::HeadConflict { .. })));
        assert_eq!(builds, 2);
        assert_eq!(registry.appends.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
