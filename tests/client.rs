use std::sync::Arc;

use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wiz_proxy::auth::StaticToken;
use wiz_proxy::client::WizClient;
use wiz_proxy::config::PaginationSettings;
use wiz_proxy::filters::{CloudResourceFilters, IssueFilters, VersionControlFilters};
use wiz_proxy::WizErrorType;

fn client(server: &MockServer, pagination: PaginationSettings) -> WizClient {
    WizClient::new(
        Client::new(),
        format!("{}/graphql", server.uri()),
        Arc::new(StaticToken("test-token".to_string())),
        pagination,
    )
}

fn resource_page(ids: &[&str], next: Option<&str>) -> serde_json::Value {
    let nodes: Vec<_> = ids.iter().map(|id| json!({ "id": id })).collect();
    json!({
        "data": {
            "cloudResources": {
                "nodes": nodes,
                "pageInfo": { "hasNextPage": next.is_some(), "endCursor": next }
            }
        }
    })
}

#[tokio::test]
async fn test_issues_query_sends_bearer_token_and_variables() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "variables": {
                "filterBy": { "project": ["p1"] },
                "first": 20,
                "after": "c1",
                "orderBy": { "field": "SEVERITY", "direction": "DESC" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "issues": {
                    "totalCount": 1,
                    "nodes": [{
                        "id": "i1",
                        "createdAt": "2024-01-01T00:00:00Z",
                        "status": "OPEN",
                        "severity": "HIGH"
                    }],
                    "pageInfo": { "hasNextPage": false, "endCursor": null }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filters = IssueFilters {
        project: vec!["p1".to_string()],
        ..Default::default()
    };
    let response = client(&server, PaginationSettings::default())
        .get_issues(&filters, Some("c1"))
        .await
        .unwrap();

    assert_eq!(response.issues.total_count, Some(1));
    assert_eq!(response.issues.nodes[0].id, "i1");
}

#[tokio::test]
async fn test_graphql_errors_become_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Field 'x' is not defined" }]
        })))
        .mount(&server)
        .await;

    let err = client(&server, PaginationSettings::default())
        .get_issues_severity_counts(&IssueFilters::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WizErrorType::ApiError);
    assert_eq!(err.to_string(), "GraphQL errors: Field 'x' is not defined");
}

#[tokio::test]
async fn test_success_without_data_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let err = client(&server, PaginationSettings::default())
        .get_issues(&IssueFilters::default(), None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WizErrorType::ApiError);
    assert_eq!(err.to_string(), "Empty response from Wiz API");
}

#[tokio::test]
async fn test_undecodable_success_body_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server, PaginationSettings::default())
        .get_issues_severity_counts(&IssueFilters::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WizErrorType::ApiError);
    assert_eq!(err.to_string(), "Invalid response from Wiz API");
    assert!(err.details().unwrap()["cause"].is_string());
}

#[tokio::test]
async fn test_upstream_status_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client(&server, PaginationSettings::default())
        .get_issues_grouped_count(&IssueFilters::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), WizErrorType::Forbidden);
}

#[tokio::test]
async fn test_full_pagination_accumulates_pages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "after": null } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_page(&["r1", "r2"], Some("c1"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "after": "c1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_page(&["r3"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let filters = CloudResourceFilters {
        provider_unique_id: vec!["arn:1".to_string()],
    };
    let response = client(&server, PaginationSettings::default())
        .get_all_cloud_resources(&filters)
        .await
        .unwrap();

    assert_eq!(response.ids(), vec!["r1", "r2", "r3"]);
    assert!(!response.data.cloud_resources.page_info.has_next_page);
}

#[tokio::test]
async fn test_full_pagination_stops_at_page_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "versionControlResources": {
                    "nodes": [{ "id": "v" }],
                    "pageInfo": { "hasNextPage": true, "endCursor": "again" }
                }
            }
        })))
        .expect(3)
        .mount(&server)
        .await;

    let pagination = PaginationSettings {
        max_pages: 3,
        ..Default::default()
    };
    let err = client(&server, pagination)
        .get_version_control_resources(&VersionControlFilters {
            search: vec!["org/app".to_string()],
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WizErrorType::ApiError);
    assert_eq!(err.details().unwrap()["maxPages"], 3);
}

#[tokio::test]
async fn test_mid_pagination_failure_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "after": null } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(resource_page(&["r1"], Some("c1"))))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "after": "c1" } })))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server, PaginationSettings::default())
        .get_all_cloud_resources(&CloudResourceFilters::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), WizErrorType::ApiError);
    assert_eq!(err.details().unwrap()["status"], 502);
}
