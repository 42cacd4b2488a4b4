//! # Status Service
//!
//! Orchestrates codec, cipher, engine and chain manager into the four
//! status operations: `create`, `broadcast`, `check` and `update`, plus
//! `search` over a collection. Every operation is one sequential pipeline:
//! validate, resolve, decode, mutate, encode, publish. Publication is the
//! commit point; anything that fails before it leaves the registry
//! untouched.

mod entry;

pub use entry::{parse_status_entry, status_entry, ParsedStatusEntry};

use std::sync::Arc;
use tracing::info;

use shared::config::{StatusListConfig, StatusServiceConfig};
use shared::error::{StatusError, StatusResult};
use shared::types::{
    BroadcastStatusListRequest, CheckStatusRequest, CheckStatusResult, CreateStatusListRequest,
    IndexChange, SearchStatusListRequest, StatusListPayload, StatusListResourceType,
    StatusListResourceVersion, StatusListSummary, StatusRequest, StatusResponse,
    UpdateStatusRequest, UpdateStatusResult,
};

use crate::cache::CacheManager;
use crate::chain::{ChainManager, ChainSelector, PublishPlan};
use crate::registry::ResourceRegistry;
use crate::status_list::cipher::SymmetricKey;
use crate::status_list::{check_length, codec, seal_compressed, StatusList};

/// Façade over a resource registry
pub struct StatusService {
    chain: ChainManager,
    config: StatusListConfig,
}

impl StatusService {
    pub fn new(
        registry: Arc<dyn ResourceRegistry>,
        cache: Arc<CacheManager>,
        config: &StatusServiceConfig,
    ) -> Self {
        let chain = ChainManager::new(registry, cache)
            .with_max_publish_attempts(config.registry.max_publish_attempts);

        Self {
            chain,
            config: config.status_list.clone(),
        }
    }

    /// Service with default configuration and no cache
    pub fn with_registry(registry: Arc<dyn ResourceRegistry>) -> Self {
        Self::new(
            registry,
            Arc::new(CacheManager::disabled()),
            &StatusServiceConfig::default(),
        )
    }

    pub fn chain(&self) -> &ChainManager {
        &self.chain
    }

    /// Dispatch a tagged request
    pub async fn handle(&self, request: StatusRequest) -> StatusResult<StatusResponse> {
        Ok(match request {
            StatusRequest::Create(r) => StatusResponse::Published(self.create(r).await?),
            StatusRequest::Broadcast(r) => StatusResponse::Published(self.broadcast(r).await?),
            StatusRequest::Check(r) => StatusResponse::Checked(self.check(r).await?),
            StatusRequest::Update(r) => StatusResponse::Updated(self.update(r).await?),
            StatusRequest::Search(r) => StatusResponse::Found(self.search(r).await?),
        })
    }

    // =========================================================================
    // CREATE / BROADCAST
    // =========================================================================

    /// Allocate an all-zero list and publish it as the first version
    pub async fn create(
        &self,
        request: CreateStatusListRequest,
    ) -> StatusResult<StatusListResourceVersion> {
        request.validate()?;
        let key = parse_key(request.key.as_deref())?;

        let length = request.length.unwrap_or(self.config.default_length);
        let encoding = request.encoding.unwrap_or(self.config.default_encoding);
        let list = StatusList::allocate_bounded(length, request.purpose, self.config.max_length)?;
        let resource_type = StatusListResourceType::new(request.purpose, request.encrypted);
        let selector = ChainSelector::exact(resource_type);

        if self.chain.exists(&request.collection_id, &request.name, selector).await? {
            return Err(already_exists(&request.collection_id, &request.name));
        }

        let payload = list.seal(encoding, key.as_ref())?;
        let (version, ()) = self
            .chain
            .publish_with(&request.collection_id, &request.name, selector, |head| {
                if head.is_some() {
                    return Err(already_exists(&request.collection_id, &request.name));
                }
                Ok((
                    PublishPlan {
                        resource_type,
                        payload: payload.clone(),
                        version: request.version.clone(),
                        also_known_as: request.also_known_as.clone(),
                    },
                    (),
                ))
            })
            .await?;

        info!(
            collection_id = %request.collection_id,
            name = %request.name,
            resource_id = %version.resource_id(),
            length,
            encrypted = request.encrypted,
            "Created status list"
        );

        Ok(version)
    }

    /// Publish caller-supplied compressed bits as the new head
    pub async fn broadcast(
        &self,
        request: BroadcastStatusListRequest,
    ) -> StatusResult<StatusListResourceVersion> {
        request.validate()?;
        let key = parse_key(request.key.as_deref())?;

        let compressed = codec::from_transport(&request.encoded_list, request.encoding)?;
        let bits = codec::decompress(&compressed)?;
        let length = request.length.unwrap_or(bits.len());
        codec::truncate(bits, length)?;
        check_length(length, self.config.max_length)?;

        let resource_type = StatusListResourceType::new(request.purpose, request.encrypted);
        let payload = seal_compressed(
            compressed,
            request.purpose,
            length,
            request.encoding,
            key.as_ref(),
        )?;

        let (version, ()) = self
            .chain
            .publish_with(
                &request.collection_id,
                &request.name,
                ChainSelector::exact(resource_type),
                |head| {
                    if let Some(expected) = head.and_then(StatusListResourceVersion::length) {
                        if expected != length {
                            return Err(StatusError::InvalidLength {
                                length,
                                reason: format!(
                                    "status list '{}' has length {expected}",
                                    request.name
                                ),
                            });
                        }
                    }
                    // A successor keeps the head's alternative URIs unless new ones are given
                    let also_known_as = match (&request.also_known_as[..], head) {
                        ([], Some(head)) => head.resource.also_known_as.clone(),
                        _ => request.also_known_as.clone(),
                    };
                    Ok((
                        PublishPlan {
                            resource_type,
                            payload: payload.clone(),
                            version: request.version.clone(),
                            also_known_as,
                        },
                        (),
                    ))
                },
            )
            .await?;

        info!(
            collection_id = %request.collection_id,
            name = %request.name,
            resource_id = %version.resource_id(),
            length,
            "Broadcast status list"
        );

        Ok(version)
    }

    // =========================================================================
    // CHECK / UPDATE
    // =========================================================================

    /// Test one index of the head, or of a tagged version
    pub async fn check(&self, request: CheckStatusRequest) -> StatusResult<CheckStatusResult> {
        request.validate()?;
        let key = parse_key(request.key.as_deref())?;
        let selector = ChainSelector::new(request.purpose, request.encrypted);

        let version = self
            .chain
            .resolve_version(
                &request.collection_id,
                &request.name,
                selector,
                request.version.as_deref(),
            )
            .await?;
        let list = StatusList::open(&version.payload, key.as_ref())?;
        let status = list.test_bit(request.index)?;

        Ok(CheckStatusResult {
            name: request.name,
            index: request.index,
            purpose: list.purpose(),
            status,
            resource_id: version.resource.resource_id,
            version: version.resource.version,
        })
    }

    /// Apply an action to a batch of indices of the head. With
    /// `publish == false` nothing is written to the registry.
    pub async fn update(&self, request: UpdateStatusRequest) -> StatusResult<UpdateStatusResult> {
        request.validate()?;
        let key = parse_key(request.key.as_deref())?;
        let selector = ChainSelector::new(request.purpose, request.encrypted);

        if !request.publish {
            let head = self
                .chain
                .resolve_head(&request.collection_id, &request.name, selector)
                .await?;
            let (changed, payload) = apply_to(&head, &request, key.as_ref())?;

            return Ok(UpdateStatusResult {
                name: request.name,
                action: request.action,
                changed,
                published: false,
                previous_version_id: head.resource.resource_id,
                version: None,
                payload,
            });
        }

        let (version, (changed, previous_version_id)) = self
            .chain
            .publish_with(&request.collection_id, &request.name, selector, |head| {
                let head = head.ok_or_else(|| {
                    StatusError::not_found(&request.collection_id, &request.name)
                })?;
                let (changed, payload) = apply_to(head, &request, key.as_ref())?;
                Ok((
                    PublishPlan {
                        resource_type: head.resource_type(),
                        payload,
                        version: request.version.clone(),
                        also_known_as: head.resource.also_known_as.clone(),
                    },
                    (changed, head.resource_id().to_string()),
                ))
            })
            .await?;

        info!(
            collection_id = %request.collection_id,
            name = %request.name,
            action = %request.action,
            indices = changed.len(),
            changed = changed.iter().filter(|c| c.changed).count(),
            resource_id = %version.resource_id(),
            "Updated status list"
        );

        Ok(UpdateStatusResult {
            name: request.name,
            action: request.action,
            changed,
            published: true,
            previous_version_id,
            payload: version.payload.clone(),
            version: Some(version),
        })
    }

    /// Head versions of a collection
    pub async fn search(
        &self,
        request: SearchStatusListRequest,
    ) -> StatusResult<Vec<StatusListSummary>> {
        request.validate()?;
        self.chain
            .search(&request.collection_id, request.purpose, request.name.as_deref())
            .await
    }
}

/// Decode `head`, apply the request's batch and re-encode the result
fn apply_to(
    head: &StatusListResourceVersion,
    request: &UpdateStatusRequest,
    key: Option<&SymmetricKey>,
) -> StatusResult<(Vec<IndexChange>, StatusListPayload)> {
    let mut list = StatusList::open(&head.payload, key)?;
    let changed = list.apply_batch(&request.indices, request.action)?;
    let payload = list.seal(head.encoding(), key)?;
    Ok((changed, payload))
}

fn parse_key(key: Option<&str>) -> StatusResult<Option<SymmetricKey>> {
    key.map(SymmetricKey::from_hex).transpose()
}

fn already_exists(collection_id: &str, name: &str) -> StatusError {
    StatusError::AlreadyExists {
        collection_id: collection_id.to_string(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryRegistry;
    use shared::types::{Encoding, StatusAction, StatusPurpose};

    const DID: &str = "did:example:issuer";

    fn service() -> (StatusService, Arc<InMemoryRegistry>) {
        let registry = Arc::new(InMemoryRegistry::new());
        (StatusService::with_registry(registry.clone()), registry)
    }

    fn create(name: &str, purpose: StatusPurpose, length: usize) -> CreateStatusListRequest {
        CreateStatusListRequest {
            collection_id: DID.into(),
            name: name.into(),
            purpose,
            length: Some(length),
            encoding: None,
            encrypted: false,
            key: None,
            version: None,
            also_known_as: Vec::new(),
        }
    }

    fn update(
        name: &str,
        indices: Vec<usize>,
        action: StatusAction,
        publish: bool,
    ) -> UpdateStatusRequest {
        UpdateStatusRequest {
            collection_id: DID.into(),
            name: name.into(),
            indices,
            action,
            publish,
            purpose: None,
            encrypted: None,
            key: None,
            version: None,
        }
    }

    fn check(name: &str, index: usize) -> CheckStatusRequest {
        CheckStatusRequest {
            collection_id: DID.into(),
            name: name.into(),
            index,
            purpose: None,
            encrypted: None,
            key: None,
            version: None,
        }
    }

    #[tokio::test]
    async fn test_create_twice_fails() {
        let (service, _) = service();
        service.create(create("list", StatusPurpose::Revocation, 64)).await.unwrap();
        assert!(matches!(
            service.create(create("list", StatusPurpose::Revocation, 64)).await,
            Err(StatusError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_uses_configured_defaults() {
        let (service, _) = service();
        let mut request = create("list", StatusPurpose::Suspension, 1);
        request.length = None;
        let version = service.create(request).await.unwrap();
        assert_eq!(version.length(), Some(140_000));
        assert_eq!(version.encoding(), Encoding::Base64Url);
        assert_eq!(version.resource.media_type, "application/json");
    }

    #[tokio::test]
    async fn test_dry_run_never_writes() {
        let (service, registry) = service();
        service.create(create("list", StatusPurpose::Suspension, 32)).await.unwrap();
        let writes = registry.write_count();

        let result = service
            .update(update("list", vec![1, 2], StatusAction::Suspend, false))
            .await
            .unwrap();
        assert!(!result.published);
        assert!(result.version.is_none());
        assert!(result.any_changed());
        assert_eq!(registry.write_count(), writes);

        assert!(!service.check(check("list", 1)).await.unwrap().status);
    }

    #[tokio::test]
    async fn test_update_missing_list() {
        let (service, _) = service();
        assert!(matches!(
            service.update(update("ghost", vec![0], StatusAction::Revoke, true)).await,
            Err(StatusError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_encrypted_list_requires_key() {
        let (service, _) = service();
        let key = SymmetricKey::generate().to_hex();
        let mut request = create("secret", StatusPurpose::Revocation, 16);
        request.encrypted = true;
        request.key = Some(key.clone());
        let version = service.create(request).await.unwrap();
        assert_eq!(version.resource.resource_type, "EncryptedStatusList2021Revocation");

        assert!(matches!(
            service.check(check("secret", 3)).await,
            Err(StatusError::InvalidRequest(_))
        ));

        let mut revoke = update("secret", vec![3], StatusAction::Revoke, true);
        revoke.key = Some(key.clone());
        service.update(revoke).await.unwrap();

        let mut request = check("secret", 3);
        request.key = Some(key);
        assert!(service.check(request).await.unwrap().status);

        let mut wrong = check("secret", 3);
        wrong.key = Some(SymmetricKey::generate().to_hex());
        assert!(matches!(service.check(wrong).await, Err(StatusError::DecryptionError(_))));
    }

    #[tokio::test]
    async fn test_broadcast_length_must_match_chain() {
        let (service, _) = service();
        service.create(create("list", StatusPurpose::Revocation, 16)).await.unwrap();

        let mut bits = StatusList::allocate(16, StatusPurpose::Revocation).unwrap();
        bits.apply_batch(&[15], StatusAction::Revoke).unwrap();
        let encoded = codec::encode(bits.bits(), Encoding::Hex).unwrap();

        let broadcast = |length| BroadcastStatusListRequest {
            collection_id: DID.into(),
            name: "list".into(),
            purpose: StatusPurpose::Revocation,
            encoded_list: encoded.clone(),
            encoding: Encoding::Hex,
            length,
            encrypted: false,
            key: None,
            version: Some("external".into()),
            also_known_as: Vec::new(),
        };

        assert!(matches!(
            service.broadcast(broadcast(Some(8))).await,
            Err(StatusError::InvalidLength { .. })
        ));

        let version = service.broadcast(broadcast(None)).await.unwrap();
        assert_eq!(version.resource.version, "external");
        assert!(service.check(check("list", 15)).await.unwrap().status);
    }

    #[tokio::test]
    async fn test_broadcast_rejects_zero_length() {
        let (service, registry) = service();
        let list = StatusList::allocate(16, StatusPurpose::Revocation).unwrap();
        let request = BroadcastStatusListRequest {
            collection_id: DID.into(),
            name: "list".into(),
            purpose: StatusPurpose::Revocation,
            encoded_list: codec::encode(list.bits(), Encoding::Base64).unwrap(),
            encoding: Encoding::Base64,
            length: Some(0),
            encrypted: false,
            key: None,
            version: None,
            also_known_as: Vec::new(),
        };
        assert!(matches!(
            service.broadcast(request).await,
            Err(StatusError::InvalidLength { length: 0, .. })
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_rejects_garbage() {
        let (service, _) = service();
        let request = BroadcastStatusListRequest {
            collection_id: DID.into(),
            name: "list".into(),
            purpose: StatusPurpose::Suspension,
            encoded_list: "bm90IGd6aXA".into(),
            encoding: Encoding::Base64Url,
            length: None,
            encrypted: false,
            key: None,
            version: None,
            also_known_as: Vec::new(),
        };
        assert!(matches!(
            service.broadcast(request).await,
            Err(StatusError::DecodingError(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_dispatches() {
        let (service, _) = service();
        let response = service
            .handle(StatusRequest::Create(create("list", StatusPurpose::Revocation, 8)))
            .await
            .unwrap();
        assert!(matches!(response, StatusResponse::Published(_)));

        let response = service
            .handle(StatusRequest::Search(SearchStatusListRequest {
                collection_id: DID.into(),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert!(matches!(response, StatusResponse::Found(ref found) if found.len() == 1));
    }
}
