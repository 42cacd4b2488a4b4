//! # Shared Data Types for the Status List Service
//!
//! This module defines the domain vocabulary (purposes, actions, encodings,
//! resource types), the registry records, the published payload shape and
//! the strongly typed request/response structs of the four status operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::error::{StatusError, StatusResult};

// =============================================================================
// STATUS VOCABULARY
// =============================================================================

/// What the bits of a status list mean
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StatusPurpose {
    /// Bits are irreversible once set
    Revocation,
    /// Bits may be set and cleared
    Suspension,
}

impl StatusPurpose {
    /// All purposes, in search order
    pub const ALL: [StatusPurpose; 2] = [StatusPurpose::Revocation, StatusPurpose::Suspension];

    /// `type` of the list embedded in the published payload
    pub fn list_type(&self) -> &'static str {
        match self {
            StatusPurpose::Revocation => LIST_TYPE_REVOCATION,
            StatusPurpose::Suspension => LIST_TYPE_SUSPENSION,
        }
    }
}

impl fmt::Display for StatusPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusPurpose::Revocation => write!(f, "revocation"),
            StatusPurpose::Suspension => write!(f, "suspension"),
        }
    }
}

impl FromStr for StatusPurpose {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "revocation" => Ok(StatusPurpose::Revocation),
            "suspension" => Ok(StatusPurpose::Suspension),
            other => Err(StatusError::InvalidRequest(format!("invalid status purpose '{other}'"))),
        }
    }
}

/// Mutation applied to a batch of indices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
    Revoke,
    Suspend,
    Reinstate,
}

impl StatusAction {
    /// The only purpose on which this action is legal
    pub fn required_purpose(&self) -> StatusPurpose {
        match self {
            StatusAction::Revoke => StatusPurpose::Revocation,
            StatusAction::Suspend | StatusAction::Reinstate => StatusPurpose::Suspension,
        }
    }

    /// Bit value the action drives an index towards
    pub fn target_bit(&self) -> bool {
        !matches!(self, StatusAction::Reinstate)
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusAction::Revoke => write!(f, "revoke"),
            StatusAction::Suspend => write!(f, "suspend"),
            StatusAction::Reinstate => write!(f, "reinstate"),
        }
    }
}

impl FromStr for StatusAction {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "revoke" => Ok(StatusAction::Revoke),
            "suspend" => Ok(StatusAction::Suspend),
            "reinstate" => Ok(StatusAction::Reinstate),
            other => Err(StatusError::InvalidRequest(format!("invalid status action '{other}'"))),
        }
    }
}

/// Observable status of a single index
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BitStatus {
    Active,
    Revoked,
    Suspended,
}

/// Transport encoding of the compressed bitstring
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Encoding {
    #[serde(rename = "hex")]
    Hex,
    #[serde(rename = "base64")]
    Base64,
    #[default]
    #[serde(rename = "base64url")]
    Base64Url,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Hex => write!(f, "hex"),
            Encoding::Base64 => write!(f, "base64"),
            Encoding::Base64Url => write!(f, "base64url"),
        }
    }
}

impl FromStr for Encoding {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hex" => Ok(Encoding::Hex),
            "base64" => Ok(Encoding::Base64),
            "base64url" => Ok(Encoding::Base64Url),
            other => Err(StatusError::EncodingError(format!("unsupported encoding '{other}'"))),
        }
    }
}

/// Registry resource type: purpose x encrypted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StatusListResourceType {
    #[serde(rename = "StatusList2021Revocation")]
    Revocation,
    #[serde(rename = "StatusList2021Suspension")]
    Suspension,
    #[serde(rename = "EncryptedStatusList2021Revocation")]
    EncryptedRevocation,
    #[serde(rename = "EncryptedStatusList2021Suspension")]
    EncryptedSuspension,
}

impl StatusListResourceType {
    /// All four variants
    pub const ALL: [StatusListResourceType; 4] = [
        StatusListResourceType::Revocation,
        StatusListResourceType::Suspension,
        StatusListResourceType::EncryptedRevocation,
        StatusListResourceType::EncryptedSuspension,
    ];

    pub fn new(purpose: StatusPurpose, encrypted: bool) -> Self {
        match (purpose, encrypted) {
            (StatusPurpose::Revocation, false) => StatusListResourceType::Revocation,
            (StatusPurpose::Suspension, false) => StatusListResourceType::Suspension,
            (StatusPurpose::Revocation, true) => StatusListResourceType::EncryptedRevocation,
            (StatusPurpose::Suspension, true) => StatusListResourceType::EncryptedSuspension,
        }
    }

    pub fn purpose(&self) -> StatusPurpose {
        match self {
            StatusListResourceType::Revocation | StatusListResourceType::EncryptedRevocation => {
                StatusPurpose::Revocation
            }
            StatusListResourceType::Suspension | StatusListResourceType::EncryptedSuspension => {
                StatusPurpose::Suspension
            }
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(
            self,
            StatusListResourceType::EncryptedRevocation
                | StatusListResourceType::EncryptedSuspension
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusListResourceType::Revocation => RESOURCE_TYPE_REVOCATION,
            StatusListResourceType::Suspension => RESOURCE_TYPE_SUSPENSION,
            StatusListResourceType::EncryptedRevocation => RESOURCE_TYPE_ENCRYPTED_REVOCATION,
            StatusListResourceType::EncryptedSuspension => RESOURCE_TYPE_ENCRYPTED_SUSPENSION,
        }
    }

    /// Parse a registry resource type; `None` for resources that are not
    /// status lists
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Whether this type passes optional purpose/encryption filters
    pub fn matches(&self, purpose: Option<StatusPurpose>, encrypted: Option<bool>) -> bool {
        purpose.map_or(true, |p| p == self.purpose())
            && encrypted.map_or(true, |e| e == self.is_encrypted())
    }
}

impl fmt::Display for StatusListResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// REGISTRY RECORDS
// =============================================================================

/// Metadata the registry keeps for every stored resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    /// Namespace owned by the issuing DID
    pub collection_id: String,

    /// Opaque unique id of this version
    pub resource_id: String,

    /// Human-assigned name shared by every version of a chain
    pub name: String,

    /// Registry resource type string
    pub resource_type: String,

    /// Version tag
    pub version: String,

    pub media_type: String,

    /// When the registry accepted the resource
    pub created: DateTime<Utc>,

    /// SHA-256 (hex) of the transport-decoded `encodedList`
    pub checksum: String,

    pub previous_version_id: Option<String>,

    pub next_version_id: Option<String>,

    /// Alternative URIs the resource is also reachable at
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_known_as: Vec<AlternativeUri>,
}

/// An alternative URI of a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlternativeUri {
    pub uri: String,
    pub description: String,
}

impl AlternativeUri {
    pub fn validate(&self) -> StatusResult<()> {
        if self.uri.trim().is_empty() {
            return Err(StatusError::InvalidRequest("alsoKnownAs uri must not be empty".into()));
        }
        Ok(())
    }
}

impl ResourceMetadata {
    /// Parsed status list type, if this resource is a status list
    pub fn status_list_type(&self) -> Option<StatusListResourceType> {
        StatusListResourceType::parse(&self.resource_type)
    }

    /// Whether no newer version supersedes this one
    pub fn is_head(&self) -> bool {
        self.next_version_id.is_none()
    }
}

/// A resource about to be appended to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDraft {
    pub name: String,
    pub resource_type: StatusListResourceType,
    pub version: String,
    pub checksum: String,
    pub previous_version_id: Option<String>,
    pub also_known_as: Vec<AlternativeUri>,

    /// Serialized resource body
    pub data: Vec<u8>,
}

/// A resource as stored by the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResource {
    pub metadata: ResourceMetadata,
    pub data: Vec<u8>,
}

// =============================================================================
// PUBLISHED PAYLOAD
// =============================================================================

/// Body of a published status list resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusListPayload {
    #[serde(rename = "StatusList2021")]
    pub status_list: StatusList2021,

    pub metadata: PayloadMetadata,
}

/// Embedded status list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusList2021 {
    /// Codec output (possibly encrypted)
    pub encoded_list: String,

    /// `RevocationList2021` or `SuspensionList2021`
    #[serde(rename = "type")]
    pub list_type: String,

    pub valid_from: DateTime<Utc>,
}

/// Decoding hints published next to the list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PayloadMetadata {
    pub encoding: Encoding,

    pub encrypted: bool,

    /// Bit length of the list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
}

/// A resolved version of a status list chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusListResourceVersion {
    #[serde(flatten)]
    pub resource: ResourceMetadata,

    pub payload: StatusListPayload,
}

impl StatusListResourceVersion {
    pub fn resource_id(&self) -> &str {
        &self.resource.resource_id
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    pub fn resource_type(&self) -> StatusListResourceType {
        self.resource.status_list_type().unwrap_or_else(|| {
            StatusListResourceType::new(self.purpose(), self.payload.metadata.encrypted)
        })
    }

    pub fn purpose(&self) -> StatusPurpose {
        match self.payload.status_list.list_type.as_str() {
            LIST_TYPE_SUSPENSION => StatusPurpose::Suspension,
            _ => StatusPurpose::Revocation,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.payload.metadata.encrypted
    }

    pub fn encoding(&self) -> Encoding {
        self.payload.metadata.encoding
    }

    pub fn length(&self) -> Option<usize> {
        self.payload.metadata.length
    }

    pub fn summary(&self) -> StatusListSummary {
        StatusListSummary::from_metadata(&self.resource, self.resource_type())
    }
}

/// Head version reduced for search results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusListSummary {
    #[serde(rename = "statusListName")]
    pub name: String,

    #[serde(rename = "statusPurpose")]
    pub purpose: StatusPurpose,

    pub encrypted: bool,

    #[serde(rename = "statusListVersion")]
    pub version: String,

    #[serde(rename = "statusListId")]
    pub resource_id: String,

    #[serde(rename = "statusListNextVersion")]
    pub next_version_id: Option<String>,
}

impl StatusListSummary {
    pub fn from_metadata(
        metadata: &ResourceMetadata,
        resource_type: StatusListResourceType,
    ) -> Self {
        Self {
            name: metadata.name.clone(),
            purpose: resource_type.purpose(),
            encrypted: resource_type.is_encrypted(),
            version: metadata.version.clone(),
            resource_id: metadata.resource_id.clone(),
            next_version_id: metadata.next_version_id.clone(),
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Allocate and publish a new, all-zero status list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatusListRequest {
    #[serde(alias = "did")]
    pub collection_id: String,

    #[serde(alias = "statusListName")]
    pub name: String,

    #[serde(alias = "statusPurpose")]
    pub purpose: StatusPurpose,

    /// Defaults to the configured list length
    #[serde(default)]
    pub length: Option<usize>,

    /// Defaults to the configured encoding
    #[serde(default)]
    pub encoding: Option<Encoding>,

    #[serde(default)]
    pub encrypted: bool,

    /// Hex symmetric key, required iff `encrypted`
    #[serde(default, alias = "symmetricKey")]
    pub key: Option<String>,

    /// Defaults to the publication timestamp
    #[serde(default, alias = "statusListVersion")]
    pub version: Option<String>,

    #[serde(default)]
    pub also_known_as: Vec<AlternativeUri>,
}

impl CreateStatusListRequest {
    pub fn validate(&self) -> StatusResult<()> {
        require_scope(&self.collection_id, &self.name)?;
        require_alternative_uris(&self.also_known_as)?;
        require_key_consistency(self.encrypted, self.key.as_deref())
    }
}

/// Publish an externally computed, already compressed status list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastStatusListRequest {
    #[serde(alias = "did")]
    pub collection_id: String,

    #[serde(alias = "statusListName")]
    pub name: String,

    #[serde(alias = "statusPurpose")]
    pub purpose: StatusPurpose,

    /// Gzip-compressed packed bits, transport-encoded with `encoding`
    pub encoded_list: String,

    pub encoding: Encoding,

    /// Bit length; defaults to the byte-aligned length of the data
    #[serde(default)]
    pub length: Option<usize>,

    #[serde(default)]
    pub encrypted: bool,

    #[serde(default, alias = "symmetricKey")]
    pub key: Option<String>,

    #[serde(default, alias = "statusListVersion")]
    pub version: Option<String>,

    #[serde(default)]
    pub also_known_as: Vec<AlternativeUri>,
}

impl BroadcastStatusListRequest {
    pub fn validate(&self) -> StatusResult<()> {
        require_scope(&self.collection_id, &self.name)?;
        require_alternative_uris(&self.also_known_as)?;
        if self.encoded_list.trim().is_empty() {
            return Err(StatusError::InvalidRequest("encodedList must not be empty".into()));
        }
        require_key_consistency(self.encrypted, self.key.as_deref())
    }
}

/// Test one index of a published list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusRequest {
    #[serde(alias = "did")]
    pub collection_id: String,

    #[serde(alias = "statusListName")]
    pub name: String,

    #[serde(alias = "statusListIndex")]
    pub index: usize,

    /// Narrows resolution when a name is shared across list types
    #[serde(default, alias = "statusPurpose")]
    pub purpose: Option<StatusPurpose>,

    #[serde(default)]
    pub encrypted: Option<bool>,

    #[serde(default, alias = "symmetricKey")]
    pub key: Option<String>,

    /// Check a historical version instead of the head
    #[serde(default, alias = "statusListVersion")]
    pub version: Option<String>,
}

impl CheckStatusRequest {
    pub fn validate(&self) -> StatusResult<()> {
        require_scope(&self.collection_id, &self.name)
    }
}

/// Apply an action to a batch of indices of the head version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(alias = "did")]
    pub collection_id: String,

    #[serde(alias = "statusListName")]
    pub name: String,

    pub indices: Vec<usize>,

    #[serde(alias = "statusAction")]
    pub action: StatusAction,

    /// `false` computes the result without writing to the registry
    #[serde(default = "default_publish")]
    pub publish: bool,

    #[serde(default, alias = "statusPurpose")]
    pub purpose: Option<StatusPurpose>,

    #[serde(default)]
    pub encrypted: Option<bool>,

    #[serde(default, alias = "symmetricKey")]
    pub key: Option<String>,

    /// Version tag of the new head
    #[serde(default, alias = "statusListVersion")]
    pub version: Option<String>,
}

fn default_publish() -> bool {
    true
}

impl UpdateStatusRequest {
    pub fn validate(&self) -> StatusResult<()> {
        require_scope(&self.collection_id, &self.name)?;
        if self.indices.is_empty() {
            return Err(StatusError::InvalidRequest("at least one index is required".into()));
        }
        Ok(())
    }
}

/// List head versions of a collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchStatusListRequest {
    #[serde(alias = "did")]
    pub collection_id: String,

    #[serde(default, alias = "statusPurpose")]
    pub purpose: Option<StatusPurpose>,

    #[serde(default, alias = "statusListName")]
    pub name: Option<String>,
}

impl SearchStatusListRequest {
    pub fn validate(&self) -> StatusResult<()> {
        if self.collection_id.trim().is_empty() {
            return Err(StatusError::InvalidRequest("collectionId is required".into()));
        }
        Ok(())
    }
}

/// Any status operation, tagged by `operation`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum StatusRequest {
    Create(CreateStatusListRequest),
    Broadcast(BroadcastStatusListRequest),
    Check(CheckStatusRequest),
    Update(UpdateStatusRequest),
    Search(SearchStatusListRequest),
}

fn require_scope(collection_id: &str, name: &str) -> StatusResult<()> {
    if collection_id.trim().is_empty() {
        return Err(StatusError::InvalidRequest("collectionId is required".into()));
    }
    if name.trim().is_empty() {
        return Err(StatusError::InvalidRequest("statusListName is required".into()));
    }
    Ok(())
}

fn require_alternative_uris(uris: &[AlternativeUri]) -> StatusResult<()> {
    uris.iter().try_for_each(AlternativeUri::validate)
}

fn require_key_consistency(encrypted: bool, key: Option<&str>) -> StatusResult<()> {
    match (encrypted, key) {
        (true, None) => Err(StatusError::InvalidRequest(
            "a symmetric key is required for an encrypted status list".into(),
        )),
        (false, Some(_)) => Err(StatusError::InvalidRequest(
            "a symmetric key was supplied for an unencrypted status list".into(),
        )),
        _ => Ok(()),
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Per-index outcome of a batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexChange {
    pub index: usize,
    pub changed: bool,
}

/// Result of `check`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckStatusResult {
    pub name: String,
    pub index: usize,
    pub purpose: StatusPurpose,

    /// `true` when the bit is set (revoked or suspended)
    pub status: bool,

    pub resource_id: String,
    pub version: String,
}

/// Result of `update`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusResult {
    pub name: String,
    pub action: StatusAction,
    pub changed: Vec<IndexChange>,
    pub published: bool,

    /// Head the update was computed from
    pub previous_version_id: String,

    /// The new head; absent on a dry run
    pub version: Option<StatusListResourceVersion>,

    /// Payload that was (or would have been) published
    pub payload: StatusListPayload,
}

impl UpdateStatusResult {
    /// Whether any index changed state
    pub fn any_changed(&self) -> bool {
        self.changed.iter().any(|c| c.changed)
    }
}

/// Response to a `StatusRequest`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StatusResponse {
    Published(StatusListResourceVersion),
    Checked(CheckStatusResult),
    Updated(UpdateStatusResult),
    Found(Vec<StatusListSummary>),
}

// =============================================================================
// CREDENTIAL STATUS ENTRY
// =============================================================================

/// `credentialStatus` entry embedded in an issued credential
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusListEntry {
    pub id: String,

    #[serde(rename = "type")]
    pub entry_type: String,

    pub status_purpose: StatusPurpose,

    /// Decimal index, as a string on the wire
    pub status_list_index: String,

    pub status_list_credential: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_matrix() {
        for purpose in StatusPurpose::ALL {
            for encrypted in [false, true] {
                let t = StatusListResourceType::new(purpose, encrypted);
                assert_eq!(t.purpose(), purpose);
                assert_eq!(t.is_encrypted(), encrypted);
                assert_eq!(StatusListResourceType::parse(t.as_str()), Some(t));
            }
        }
        assert_eq!(StatusListResourceType::parse("DIDDocument"), None);
    }

    #[test]
    fn test_action_purpose() {
        assert_eq!(StatusAction::Revoke.required_purpose(), StatusPurpose::Revocation);
        assert_eq!(StatusAction::Reinstate.required_purpose(), StatusPurpose::Suspension);
        assert!(!StatusAction::Reinstate.target_bit());
        assert!(StatusAction::Suspend.target_bit());
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("HEX".parse::<Encoding>().unwrap(), Encoding::Hex);
        assert_eq!("base64url".parse::<Encoding>().unwrap(), Encoding::Base64Url);
        let err = "base58".parse::<Encoding>().unwrap_err();
        assert!(matches!(err, StatusError::EncodingError(_)));
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = StatusListPayload {
            status_list: StatusList2021 {
                encoded_list: "H4sIAAAA".into(),
                list_type: LIST_TYPE_REVOCATION.into(),
                valid_from: Utc::now(),
            },
            metadata: PayloadMetadata {
                encoding: Encoding::Base64Url,
                encrypted: false,
                length: Some(8),
            },
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["StatusList2021"]["encodedList"], "H4sIAAAA");
        assert_eq!(json["StatusList2021"]["type"], "RevocationList2021");
        assert!(json["StatusList2021"]["validFrom"].is_string());
        assert_eq!(json["metadata"]["encoding"], "base64url");
        assert_eq!(json["metadata"]["encrypted"], false);
    }

    #[test]
    fn test_update_request_accepts_original_field_names() {
        let request: UpdateStatusRequest = serde_json::from_value(serde_json::json!({
            "did": "did:cheqd:testnet:abc",
            "statusListName": "employees",
            "indices": [1, 2],
            "statusAction": "suspend"
        }))
        .unwrap();

        assert_eq!(request.collection_id, "did:cheqd:testnet:abc");
        assert_eq!(request.action, StatusAction::Suspend);
        assert!(request.publish);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_tagged_request() {
        let request: StatusRequest = serde_json::from_value(serde_json::json!({
            "operation": "check",
            "collectionId": "did:example:1",
            "name": "list",
            "index": 3
        }))
        .unwrap();
        assert!(matches!(request, StatusRequest::Check(ref c) if c.index == 3));
    }

    #[test]
    fn test_key_consistency() {
        let mut request = CreateStatusListRequest {
            collection_id: "did:example:1".into(),
            name: "list".into(),
            purpose: StatusPurpose::Revocation,
            length: None,
            encoding: None,
            encrypted: true,
            key: None,
            version: None,
            also_known_as: Vec::new(),
        };
        assert!(request.validate().is_err());

        request.key = Some("00".repeat(32));
        assert!(request.validate().is_ok());

        request.encrypted = false;
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_also_known_as_parsed_and_validated() {
        let request: CreateStatusListRequest = serde_json::from_value(serde_json::json!({
            "did": "did:example:1",
            "statusListName": "list",
            "statusPurpose": "revocation",
            "alsoKnownAs": [{ "uri": "https://issuer.example/lists/1", "description": "mirror" }]
        }))
        .unwrap();
        assert_eq!(request.also_known_as.len(), 1);
        assert_eq!(request.also_known_as[0].uri, "https://issuer.example/lists/1");
        assert!(request.validate().is_ok());

        let mut blank = request.clone();
        blank.also_known_as[0].uri = " ".into();
        assert!(matches!(blank.validate(), Err(StatusError::InvalidRequest(_))));
    }

    #[test]
    fn test_negative_index_rejected_at_boundary() {
        let result: Result<CheckStatusRequest, _> = serde_json::from_value(serde_json::json!({
            "collectionId": "did:example:1",
            "name": "list",
            "index": -1
        }));
        assert!(result.is_err());
    }
}
