use std::sync::Arc;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::config::PaginationSettings;
use crate::error::{Result, WizError};
use crate::filters::{
    CloudResourceFilters, IssueFilters, VersionControlFilters, VulnerabilityFilters,
};
use crate::queries::{
    CLOUD_RESOURCES_QUERY, ISSUES_GROUPED_COUNT_QUERY, ISSUES_GROUP_BY, ISSUES_QUERY,
    ISSUES_SEVERITY_COUNTS_QUERY, VERSION_CONTROL_RESOURCES_QUERY, VULNERABILITY_FINDINGS_QUERY,
};
use crate::responses::{
    CloudResourcesData, CloudResourcesResponse, DataEnvelope, IssuesCountsResponse,
    IssuesGroupedResponse, IssuesResponse, NodeConnection, VersionControlResourcesData,
    VersionControlResourcesResponse, VulnerabilitiesResponse,
};
use crate::types::ResourceNode;

/// GraphQL client for the Wiz API, authenticated with a bearer token.
pub struct WizClient {
    http: Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
    pagination: PaginationSettings,
}

#[derive(Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize, Debug)]
struct GraphQLError {
    message: String,
    #[serde(default)]
    extensions: Option<GraphQLErrorExtensions>,
}

#[derive(Deserialize, Debug)]
struct GraphQLErrorExtensions {
    code: Option<String>,
}

impl WizClient {
    pub fn new(
        http: Client,
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        pagination: PaginationSettings,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            tokens,
            pagination,
        }
    }

    pub async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let token = self.tokens.ensure_valid_token().await?;
        let request = GraphQLRequest { query, variables };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                WizError::api_with_details(
                    "Network error while connecting to Wiz API",
                    json!({ "cause": e.to_string() }),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            warn!(status = status.as_u16(), "Wiz API request failed");
            return Err(WizError::from_status(status.as_u16(), || {
                WizError::api_with_details(
                    format!("Wiz API request failed with status {}", status.as_u16()),
                    json!({ "status": status.as_u16(), "body": body }),
                )
            }));
        }

        let gql_response: GraphQLResponse<T> = response.json().await.map_err(|e| {
            WizError::api_with_details(
                "Invalid response from Wiz API",
                json!({ "cause": e.to_string() }),
            )
        })?;

        if let Some(errors) = gql_response.errors.filter(|e| !e.is_empty()) {
            return Err(classify_graphql_errors(errors));
        }

        gql_response
            .data
            .ok_or_else(|| WizError::api("Empty response from Wiz API"))
    }

    /// One page of issues; the caller drives pagination with `after`.
    pub async fn get_issues(
        &self,
        filters: &IssueFilters,
        after: Option<&str>,
    ) -> Result<IssuesResponse> {
        let variables = json!({
            "filterBy": filters,
            "first": self.pagination.issues_page_size,
            "after": after,
            "orderBy": { "field": "SEVERITY", "direction": "DESC" },
        });
        self.query(ISSUES_QUERY, variables).await
    }

    /// One page of vulnerability findings.
    pub async fn get_vulnerability_findings(
        &self,
        filters: &VulnerabilityFilters,
        after: Option<&str>,
    ) -> Result<VulnerabilitiesResponse> {
        let variables = json!({
            "filterBy": filters,
            "first": self.pagination.issues_page_size,
            "after": after,
        });
        self.query(VULNERABILITY_FINDINGS_QUERY, variables).await
    }

    pub async fn get_issues_severity_counts(
        &self,
        filters: &IssueFilters,
    ) -> Result<IssuesCountsResponse> {
        self.query(ISSUES_SEVERITY_COUNTS_QUERY, json!({ "filterBy": filters }))
            .await
    }

    pub async fn get_issues_grouped_count(
        &self,
        filters: &IssueFilters,
    ) -> Result<IssuesGroupedResponse> {
        let variables = json!({
            "groupBy": ISSUES_GROUP_BY,
            "filterBy": filters,
        });
        self.query(ISSUES_GROUPED_COUNT_QUERY, variables).await
    }

    /// Every cloud resource matching the filter, across all pages.
    pub async fn get_all_cloud_resources(
        &self,
        filters: &CloudResourceFilters,
    ) -> Result<CloudResourcesResponse> {
        let cloud_resources = self
            .fetch_all(CLOUD_RESOURCES_QUERY, filters, |page: CloudResourcesData| {
                page.cloud_resources
            })
            .await?;

        Ok(DataEnvelope {
            data: CloudResourcesData { cloud_resources },
        })
    }

    /// Every version-control resource matching the filter, across all pages.
    pub async fn get_version_control_resources(
        &self,
        filters: &VersionControlFilters,
    ) -> Result<VersionControlResourcesResponse> {
        let version_control_resources = self
            .fetch_all(
                VERSION_CONTROL_RESOURCES_QUERY,
                filters,
                |page: VersionControlResourcesData| page.version_control_resources,
            )
            .await?;

        Ok(DataEnvelope {
            data: VersionControlResourcesData {
                version_control_resources,
            },
        })
    }

    /// Follow `pageInfo` until the last page, bounded by `max_pages`. Any
    /// failure discards the pages fetched so far.
    async fn fetch_all<D, S, F>(
        &self,
        query: &str,
        filter_by: &S,
        extract: F,
    ) -> Result<NodeConnection<ResourceNode>>
    where
        D: DeserializeOwned,
        S: Serialize,
        F: Fn(D) -> NodeConnection<ResourceNode>,
    {
        let max_pages = self.pagination.max_pages.max(1);
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let variables = json!({
                "filterBy": filter_by,
                "first": self.pagination.resources_page_size,
                "after": after,
            });
            let page = extract(self.query::<D>(query, variables).await?);
            pages += 1;

            debug!(pages, received = page.nodes.len(), "Fetched resource page");
            nodes.extend(page.nodes);

            if !page.page_info.has_next_page {
                return Ok(NodeConnection {
                    nodes,
                    page_info: page.page_info,
                });
            }

            let Some(cursor) = page.page_info.next_cursor().map(String::from) else {
                return Err(WizError::api(
                    "Wiz API reported more pages without an end cursor",
                ));
            };

            if pages >= max_pages {
                warn!(max_pages, "Stopping resource pagination at page limit");
                return Err(WizError::api_with_details(
                    format!("Pagination limit of {max_pages} pages reached"),
                    json!({ "pages": pages, "maxPages": max_pages }),
                ));
            }

            after = Some(cursor);
        }
    }
}

fn classify_graphql_errors(errors: Vec<GraphQLError>) -> WizError {
    let code = errors
        .iter()
        .filter_map(|e| e.extensions.as_ref().and_then(|x| x.code.as_deref()))
        .next()
        .map(str::to_ascii_uppercase);
    let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
    let details = Some(json!({ "errors": messages }));
    let message = format!("GraphQL errors: {}", messages.join(", "));

    match code.as_deref() {
        Some("UNAUTHENTICATED") | Some("UNAUTHORIZED") => WizError::Unauthorized { message, details },
        Some("FORBIDDEN") => WizError::Forbidden { message, details },
        _ => WizError::Api { message, details },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WizErrorType;

    fn error(message: &str, code: Option<&str>) -> GraphQLError {
        GraphQLError {
            message: message.to_string(),
            extensions: code.map(|c| GraphQLErrorExtensions {
                code: Some(c.to_string()),
            }),
        }
    }

    #[test]
    fn test_graphql_errors_without_code_are_api_errors() {
        let err = classify_graphql_errors(vec![error("bad field", None), error("other", None)]);
        assert_eq!(err.kind(), WizErrorType::ApiError);
        assert_eq!(err.to_string(), "GraphQL errors: bad field, other");
        assert_eq!(err.details().unwrap()["errors"][1], "other");
    }

    #[test]
    fn test_graphql_error_codes_are_classified() {
        let err = classify_graphql_errors(vec![error("nope", Some("UNAUTHENTICATED"))]);
        assert_eq!(err.kind(), WizErrorType::Unauthorized);

        let err = classify_graphql_errors(vec![error("nope", Some("forbidden"))]);
        assert_eq!(err.kind(), WizErrorType::Forbidden);
    }
}
