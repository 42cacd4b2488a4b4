//! # HTTP Resource Registry
//!
//! Client for a registry exposing collections of immutable resources over
//! REST. Conditional appends use `If-Match` / `If-None-Match` on the
//! expected head.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use shared::config::RegistryConfig;
use shared::constants::STATUS_LIST_MEDIA_TYPE;
use shared::error::{StatusError, StatusResult};
use shared::types::{AlternativeUri, ResourceDraft, ResourceMetadata, StoredResource};

use super::ResourceRegistry;

/// Registry reached over REST.
///
/// | Operation | Request |
/// |-----------|---------|
/// | put | `POST {base}/collections/{id}/resources` |
/// | conditional put | same, with `If-Match: <head>` or `If-None-Match: *` |
/// | link | `PUT {base}/collections/{id}/resources/{prev}/next` |
/// | list | `GET {base}/collections/{id}/resources[?name=..]` |
/// | get | `GET {base}/collections/{id}/resources/{resource}` |
pub struct HttpRegistry {
    base_url: String,
    http_client: reqwest::Client,
    conditional: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutResourceBody<'a> {
    name: &'a str,
    resource_type: &'a str,
    version: &'a str,
    media_type: &'a str,
    checksum: &'a str,
    previous_version_id: Option<&'a str>,
    #[serde(skip_serializing_if = "no_uris")]
    also_known_as: &'a [AlternativeUri],
    /// Base64 of the resource body
    data: String,
}

fn no_uris(uris: &&[AlternativeUri]) -> bool {
    uris.is_empty()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LinkBody<'a> {
    next_version_id: &'a str,
}

#[derive(Deserialize)]
struct ResourceBody {
    metadata: ResourceMetadata,
    data: String,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> StatusResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StatusError::ConfigurationError(format!("registry client: {e}")))?;

        Ok(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            http_client,
            conditional: config.conditional_append,
        })
    }

    fn resources_url(&self, collection_id: &str) -> String {
        format!(
            "{}/collections/{}/resources",
            self.base_url,
            urlencoding::encode(collection_id)
        )
    }

    fn resource_url(&self, collection_id: &str, resource_id: &str) -> String {
        format!(
            "{}/{}",
            self.resources_url(collection_id),
            urlencoding::encode(resource_id)
        )
    }

    async fn send(
        &self,
        request: RequestBuilder,
        collection_id: &str,
        subject: &str,
    ) -> StatusResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| StatusError::RegistryUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "Registry request rejected");

        Err(match status {
            StatusCode::NOT_FOUND => StatusError::not_found(collection_id, subject),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => StatusError::HeadConflict {
                name: subject.to_string(),
            },
            s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                StatusError::RegistryUnavailable(format!("registry returned {s}: {body}"))
            }
            s => StatusError::InternalError(format!("registry returned {s}: {body}")),
        })
    }

    async fn list(
        &self,
        collection_id: &str,
        name: Option<&str>,
    ) -> StatusResult<Vec<ResourceMetadata>> {
        let mut request = self.http_client.get(self.resources_url(collection_id));
        if let Some(name) = name {
            request = request.query(&[("name", name)]);
        }

        match self.send(request, collection_id, name.unwrap_or(collection_id)).await {
            Ok(response) => response
                .json()
                .await
                .map_err(|e| StatusError::SerializationError(e.to_string())),
            Err(StatusError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn put_request(&self, collection_id: &str, draft: &ResourceDraft) -> RequestBuilder {
        let body = PutResourceBody {
            name: &draft.name,
            resource_type: draft.resource_type.as_str(),
            version: &draft.version,
            media_type: STATUS_LIST_MEDIA_TYPE,
            checksum: &draft.checksum,
            previous_version_id: draft.previous_version_id.as_deref(),
            also_known_as: &draft.also_known_as,
            data: STANDARD.encode(&draft.data),
        };
        self.http_client.post(self.resources_url(collection_id)).json(&body)
    }
}

#[async_trait]
impl ResourceRegistry for HttpRegistry {
    async fn put_resource(
        &self,
        collection_id: &str,
        draft: ResourceDraft,
    ) -> StatusResult<ResourceMetadata> {
        let request = self.put_request(collection_id, &draft);
        self.send(request, collection_id, &draft.name)
            .await?
            .json()
            .await
            .map_err(|e| StatusError::SerializationError(e.to_string()))
    }

    async fn link_version(
        &self,
        collection_id: &str,
        previous_id: &str,
        next_id: &str,
    ) -> StatusResult<()> {
        let url = format!("{}/next", self.resource_url(collection_id, previous_id));
        let request = self.http_client.put(url).json(&LinkBody { next_version_id: next_id });
        self.send(request, collection_id, previous_id).await?;
        Ok(())
    }

    async fn list_resources_by_name(
        &self,
        collection_id: &str,
        name: &str,
    ) -> StatusResult<Vec<ResourceMetadata>> {
        self.list(collection_id, Some(name)).await
    }

    async fn list_resources(&self, collection_id: &str) -> StatusResult<Vec<ResourceMetadata>> {
        self.list(collection_id, None).await
    }

    async fn get_resource(
        &self,
        collection_id: &str,
        resource_id: &str,
    ) -> StatusResult<StoredResource> {
        let request = self.http_client.get(self.resource_url(collection_id, resource_id));
        let body: ResourceBody = self
            .send(request, collection_id, resource_id)
            .await?
            .json()
            .await
            .map_err(|e| StatusError::SerializationError(e.to_string()))?;

        Ok(StoredResource {
            metadata: body.metadata,
            data: STANDARD.decode(body.data)?,
        })
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
        draft.previous_version_id = expected_head.map(str::to_string);
        let request = self.put_request(collection_id, &draft);
        let request = match expected_head {
            Some(head) => request.header(reqwest::header::IF_MATCH, head),
            None => request.header(reqwest::header::IF_NONE_MATCH, "*"),
        };

        let result = self.send(request, collection_id, &draft.name).await;
        if let Err(StatusError::HeadConflict { .. }) = &result {
            warn!(
                collection_id = %collection_id,
                name = %draft.name,
                expected_head = ?expected_head,
                "Registry rejected conditional append"
            );
        }

        result?
            .json()
            .await
            .map_err(|e| StatusError::SerializationError(e.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::types::StatusListResourceType;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const COLLECTION: &str = "issuer-1";
    const RESOURCES: &str = "/collections/issuer-1/resources";

    fn registry(endpoint: &str) -> HttpRegistry {
        HttpRegistry::new(&RegistryConfig {
            endpoint: endpoint.into(),
            ..RegistryConfig::default()
        })
        .unwrap()
    }

    fn metadata(resource_id: &str, previous: Option<&str>) -> ResourceMetadata {
        ResourceMetadata {
            collection_id: COLLECTION.into(),
            resource_id: resource_id.into(),
            name: "list".into(),
            resource_type: StatusListResourceType::Revocation.as_str().into(),
            version: "1".into(),
            media_type: STATUS_LIST_MEDIA_TYPE.into(),
            created: Utc::now(),
            checksum: "00".into(),
            previous_version_id: previous.map(str::to_string),
            next_version_id: None,
            also_known_as: Vec::new(),
        }
    }

    fn draft() -> ResourceDraft {
        ResourceDraft {
            name: "list".into(),
            resource_type: StatusListResourceType::Revocation,
            version: "1".into(),
            checksum: "00".into(),
            previous_version_id: None,
            also_known_as: vec![AlternativeUri {
                uri: "https://issuer.example/lists/1".into(),
                description: "mirror".into(),
            }],
            data: b"{\"k\":1}".to_vec(),
        }
    }

    async fn failing_list(status: u16) -> StatusError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RESOURCES))
            .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
            .mount(&server)
            .await;
        registry(&server.uri()).list_resources(COLLECTION).await.unwrap_err()
    }

    #[test]
    fn test_urls_escape_collection_id() {
        let registry = registry("http://registry.local/");
        assert_eq!(
            registry.resource_url("did:cheqd:testnet:abc", "r1"),
            "http://registry.local/collections/did%3Acheqd%3Atestnet%3Aabc/resources/r1"
        );
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_retryable() {
        // Port 9 (discard) is not expected to serve HTTP
        let registry = registry("http://127.0.0.1:9");
        let err = registry.list_resources("did:example:1").await.unwrap_err();
        assert!(matches!(err, StatusError::RegistryUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_list_by_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RESOURCES))
            .and(query_param("name", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(vec![metadata("r1", None)]))
            .expect(1)
            .mount(&server)
            .await;

        let listed = registry(&server.uri())
            .list_resources_by_name(COLLECTION, "list")
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].resource_id, "r1");
    }

    #[tokio::test]
    async fn test_missing_collection_lists_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(RESOURCES))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let listed = registry(&server.uri()).list_resources(COLLECTION).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_missing_resource_is_not_found() {
        let server = MockServer::start().await;
        let err = registry(&server.uri())
            .get_resource(COLLECTION, "r404")
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        for status in [409, 412] {
            let err = failing_list(status).await;
            assert!(matches!(err, StatusError::HeadConflict { .. }), "{status}: {err:?}");
        }

        for status in [500, 503, 429] {
            let err = failing_list(status).await;
            assert!(matches!(err, StatusError::RegistryUnavailable(_)), "{status}: {err:?}");
            assert!(err.is_retryable());
        }

        let err = failing_list(400).await;
        assert!(matches!(err, StatusError::InternalError(ref m) if m.contains("nope")));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_get_resource_decodes_body() {
        let server = MockServer::start().await;
        let data = b"{\"StatusList2021\":{}}".to_vec();
        Mock::given(method("GET"))
            .and(path(format!("{RESOURCES}/r1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "metadata": metadata("r1", None),
                "data": STANDARD.encode(&data),
            })))
            .mount(&server)
            .await;

        let stored = registry(&server.uri()).get_resource(COLLECTION, "r1").await.unwrap();
        assert_eq!(stored.metadata.resource_id, "r1");
        assert_eq!(stored.data, data);
    }

    #[tokio::test]
    async fn test_put_sends_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RESOURCES))
            .and(body_partial_json(serde_json::json!({
                "name": "list",
                "resourceType": "StatusList2021Revocation",
                "mediaType": STATUS_LIST_MEDIA_TYPE,
                "data": STANDARD.encode(b"{\"k\":1}"),
                "alsoKnownAs": [{
                    "uri": "https://issuer.example/lists/1",
                    "description": "mirror"
                }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(metadata("r1", None)))
            .expect(1)
            .mount(&server)
            .await;

        let stored = registry(&server.uri()).put_resource(COLLECTION, draft()).await.unwrap();
        assert_eq!(stored.resource_id, "r1");
    }

    #[tokio::test]
    async fn test_link_version() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("{RESOURCES}/r1/next")))
            .and(body_partial_json(serde_json::json!({ "nextVersionId": "r2" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        registry(&server.uri())
            .link_version(COLLECTION, "r1", "r2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_conditional_append_on_head() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RESOURCES))
            .and(header("if-match", "r1"))
            .and(body_partial_json(serde_json::json!({ "previousVersionId": "r1" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(metadata("r2", Some("r1"))))
            .expect(1)
            .mount(&server)
            .await;

        let stored = registry(&server.uri())
            .compare_and_append(COLLECTION, draft(), Some("r1"))
            .await
            .unwrap();
        assert_eq!(stored.previous_version_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_conditional_append_of_first_version() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RESOURCES))
            .and(header("if-none-match", "*"))
            .respond_with(ResponseTemplate::new(201).set_body_json(metadata("r1", None)))
            .expect(1)
            .mount(&server)
            .await;

        let stored = registry(&server.uri())
            .compare_and_append(COLLECTION, draft(), None)
            .await
            .unwrap();
        assert_eq!(stored.resource_id, "r1");
    }

    #[tokio::test]
    async fn test_conditional_append_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RESOURCES))
            .respond_with(ResponseTemplate::new(412))
            .mount(&server)
            .await;

        let err = registry(&server.uri())
            .compare_and_append(COLLECTION, draft(), Some("stale"))
            .await
            .unwrap_err();
        assert!(matches!(err, StatusError::HeadConflict { .. }));
    }
}
