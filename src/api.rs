//! HTTP client for a running proxy, used by the terminal frontend.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Result, WizError, WizErrorType};
use crate::filters::{
    CloudResourceFilters, EntityAnnotations, EntityIds, IssueFilters, QueryFilter,
    VersionControlFilters, VulnerabilityFilters,
};
use crate::responses::{
    CloudResourcesResponse, Connection, IssuesResponse, IssuesStatsResponse, PageAccumulator,
    VersionControlResourcesResponse, VulnerabilitiesResponse,
};
use crate::types::{IssueNode, VulnerabilityNode};

/// Error payload as sent by the proxy, read leniently so that a partial
/// body still yields a typed error.
#[derive(Deserialize, Default)]
struct ErrorPayload {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    details: Option<Value>,
}

pub struct WizApiClient {
    http: Client,
    base_url: String,
}

impl WizApiClient {
    pub fn new(http: Client, base_url: &str) -> Result<Self> {
        Url::parse(base_url).map_err(|e| WizError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, route: &str, query: String) -> Result<T> {
        let url = if query.is_empty() {
            format!("{}/{route}", self.base_url)
        } else {
            format!("{}/{route}?{query}", self.base_url)
        };
        debug!(%url, "Calling Wiz proxy");

        let response = self.http.get(&url).send().await?;
        handle_response(response).await
    }

    pub async fn fetch_issues(
        &self,
        filters: &IssueFilters,
        after: Option<&str>,
    ) -> Result<IssuesResponse> {
        self.get("wiz-issues", filters.to_query_string(after)).await
    }

    pub async fn fetch_vulnerabilities(
        &self,
        filters: &VulnerabilityFilters,
        after: Option<&str>,
    ) -> Result<VulnerabilitiesResponse> {
        self.get("wiz-vulnerabilities", filters.to_query_string(after))
            .await
    }

    pub async fn fetch_issues_stats(&self, filters: &IssueFilters) -> Result<IssuesStatsResponse> {
        self.get("wiz-issues-stats", filters.to_query_string(None))
            .await
    }

    pub async fn fetch_cloud_resources(
        &self,
        filters: &CloudResourceFilters,
    ) -> Result<CloudResourcesResponse> {
        self.get("wiz-cloud-resources", filters.to_query_string(None))
            .await
    }

    pub async fn fetch_version_control_resources(
        &self,
        filters: &VersionControlFilters,
    ) -> Result<VersionControlResourcesResponse> {
        self.get("wiz-version-control", filters.to_query_string(None))
            .await
    }

    /// Build the entity's id sets, looking up external asset ids and repo
    /// ids concurrently. Annotations without values skip their lookup.
    pub async fn resolve_entity_ids(&self, annotations: EntityAnnotations) -> Result<EntityIds> {
        let cloud = async {
            if annotations.external_asset_ids.is_empty() {
                return Ok(Vec::new());
            }
            let filters = CloudResourceFilters {
                provider_unique_id: annotations.external_asset_ids.clone(),
            };
            self.fetch_cloud_resources(&filters)
                .await
                .map(|r| r.ids())
                .map_err(|e| with_context("Failed to fetch cloud resources", e))
        };

        let repos = async {
            if annotations.repo_ids.is_empty() {
                return Ok(Vec::new());
            }
            let filters = VersionControlFilters {
                search: annotations.repo_ids.clone(),
            };
            self.fetch_version_control_resources(&filters)
                .await
                .map(|r| r.ids())
                .map_err(|e| with_context("Failed to fetch version control resources", e))
        };

        let (cloud_resource_ids, version_control_ids) = tokio::try_join!(cloud, repos)?;
        Ok(annotations.into_entity_ids(cloud_resource_ids, version_control_ids))
    }
}

fn with_context(context: &str, err: WizError) -> WizError {
    let details = err.details().cloned();
    WizError::from_kind(err.kind(), format!("{context}: {err}"), details)
}

/// Decode a success body, or turn an error body into a typed error with a
/// message suited to the failure kind.
pub async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await?;
    Err(classify_error_body(status, &body))
}

fn classify_error_body(status: StatusCode, body: &str) -> WizError {
    let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) else {
        return WizError::api(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        ));
    };

    let server_message = payload.message.filter(|m| !m.is_empty());
    let (kind, message) = match payload.error_type.as_deref() {
        Some("MISSING_CONFIG") => (
            WizErrorType::MissingConfig,
            "Wiz plugin is not properly configured".to_string(),
        ),
        Some("UNAUTHORIZED") => (
            WizErrorType::Unauthorized,
            "Authentication failed with Wiz API".to_string(),
        ),
        Some("FORBIDDEN") => (
            WizErrorType::Forbidden,
            "Insufficient permissions to access Wiz resources".to_string(),
        ),
        Some("INVALID_REQUEST") => (
            WizErrorType::InvalidRequest,
            server_message.unwrap_or_else(|| "Invalid request parameters".to_string()),
        ),
        _ => (
            WizErrorType::ApiError,
            server_message.unwrap_or_else(|| "Unknown error occurred".to_string()),
        ),
    };

    WizError::from_kind(kind, message, payload.details)
}

/// A filter whose results come back one page at a time.
#[async_trait]
pub trait FindingsQuery: QueryFilter + Send + Sync {
    type Node: Send;

    async fn fetch_page(
        &self,
        client: &WizApiClient,
        after: Option<&str>,
    ) -> Result<Connection<Self::Node>>;
}

#[async_trait]
impl FindingsQuery for IssueFilters {
    type Node = IssueNode;

    async fn fetch_page(
        &self,
        client: &WizApiClient,
        after: Option<&str>,
    ) -> Result<Connection<IssueNode>> {
        Ok(client.fetch_issues(self, after).await?.issues)
    }
}

#[async_trait]
impl FindingsQuery for VulnerabilityFilters {
    type Node = VulnerabilityNode;

    async fn fetch_page(
        &self,
        client: &WizApiClient,
        after: Option<&str>,
    ) -> Result<Connection<VulnerabilityNode>> {
        Ok(client
            .fetch_vulnerabilities(self, after)
            .await?
            .vulnerability_findings)
    }
}

/// "Load more" paging over issues or vulnerabilities.
pub struct FindingsPager<'a, F: FindingsQuery> {
    client: &'a WizApiClient,
    filters: F,
    pages: PageAccumulator<F::Node>,
}

impl<'a, F: FindingsQuery> FindingsPager<'a, F> {
    pub fn new(client: &'a WizApiClient, filters: F) -> Self {
        Self {
            client,
            filters,
            pages: PageAccumulator::new(),
        }
    }

    /// Whether another page can be requested.
    pub fn has_more(&self) -> bool {
        self.pages.pages() == 0 || self.pages.next_cursor().is_some()
    }

    /// Fetch the next page. Returns `false` when nothing was left to fetch.
    pub async fn load_more(&mut self) -> Result<bool> {
        if !self.has_more() {
            return Ok(false);
        }
        let after = self.pages.next_cursor().map(String::from);
        let page = self.filters.fetch_page(self.client, after.as_deref()).await?;
        debug!(
            page = self.pages.pages() + 1,
            received = page.nodes.len(),
            "Loaded findings page"
        );
        self.pages.push(page);
        Ok(true)
    }

    /// Keep loading until `limit` nodes are held, the last page is reached,
    /// or `max_pages` pages have been fetched.
    pub async fn load_until(&mut self, limit: Option<usize>, max_pages: usize) -> Result<()> {
        while self.pages.pages() < max_pages.max(1) {
            if limit.is_some_and(|limit| self.pages.nodes().len() >= limit) {
                break;
            }
            if !self.load_more().await? {
                break;
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[F::Node] {
        self.pages.nodes()
    }

    pub fn total_count(&self) -> u64 {
        self.pages.total_count()
    }

    pub fn into_connection(self) -> Connection<F::Node> {
        self.pages.into_connection()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_follow_the_type_tag() {
        let err = classify_error_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Missing Configuration","message":"Missing wiz.clientId","type":"MISSING_CONFIG"}"#,
        );
        assert_eq!(err.kind(), WizErrorType::MissingConfig);
        assert_eq!(err.to_string(), "Wiz plugin is not properly configured");

        let err = classify_error_body(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid Wiz credentials","type":"UNAUTHORIZED"}"#,
        );
        assert_eq!(err.to_string(), "Authentication failed with Wiz API");

        let err = classify_error_body(StatusCode::FORBIDDEN, r#"{"type":"FORBIDDEN"}"#);
        assert_eq!(err.to_string(), "Insufficient permissions to access Wiz resources");
    }

    #[test]
    fn test_invalid_request_and_api_errors_keep_server_message() {
        let err = classify_error_body(
            StatusCode::BAD_REQUEST,
            r#"{"message":"Invalid relatedEntity format","type":"INVALID_REQUEST","details":{"cause":"x"}}"#,
        );
        assert_eq!(err.kind(), WizErrorType::InvalidRequest);
        assert_eq!(err.to_string(), "Invalid relatedEntity format");
        assert_eq!(err.details().unwrap()["cause"], "x");

        let err = classify_error_body(StatusCode::BAD_REQUEST, r#"{"type":"INVALID_REQUEST"}"#);
        assert_eq!(err.to_string(), "Invalid request parameters");

        let err = classify_error_body(StatusCode::INTERNAL_SERVER_ERROR, r#"{"type":"SOMETHING"}"#);
        assert_eq!(err.kind(), WizErrorType::ApiError);
        assert_eq!(err.to_string(), "Unknown error occurred");
    }

    #[test]
    fn test_non_json_error_body_reports_status() {
        let err = classify_error_body(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.kind(), WizErrorType::ApiError);
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_context_keeps_kind() {
        let err = with_context(
            "Failed to fetch cloud resources",
            WizError::forbidden("Access forbidden"),
        );
        assert_eq!(err.kind(), WizErrorType::Forbidden);
        assert_eq!(
            err.to_string(),
            "Failed to fetch cloud resources: Access forbidden"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(WizApiClient::new(Client::new(), "not a url").is_err());
        assert!(WizApiClient::new(Client::new(), "http://localhost:7007/api/wiz/").is_ok());
    }
}
