use axum::extract::{RawQuery, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use super::params::{
    parse_asset_tags, parse_provider_unique_ids, parse_related_entity, ParamReader, QueryParams,
};
use super::AppState;
use crate::error::Result;
use crate::filters::{
    CloudResourceFilters, IssueFilters, QueryFilter, RelatedEntity, VersionControlFilters,
    VulnerabilityFilters,
};
use crate::responses::{
    CloudResourcesResponse, IssuesResponse, IssuesStatsResponse, VersionControlResourcesResponse,
    VulnerabilitiesResponse,
};

fn parse_query(query: Option<String>) -> QueryParams {
    QueryParams::parse(query.as_deref().unwrap_or_default())
}

fn related_entity_filter(raw: Option<&str>) -> Result<RelatedEntity> {
    Ok(raw.map(parse_related_entity).transpose()?.unwrap_or_default())
}

fn issue_filters(params: &QueryParams) -> Result<(IssueFilters, Option<String>)> {
    let mut reader = ParamReader::new(params);
    let project = reader.string_list("project");
    let related_entity = reader.string("relatedEntity");
    let search = reader.string("search");
    let after = reader.string("after");
    reader.finish()?;

    let related_entity = related_entity_filter(related_entity.as_deref())?;

    let filters = IssueFilters {
        project,
        related_entity,
        search,
    }
    .clean();
    Ok((filters, after))
}

/// Stats count every issue for an entity, so only `project` and
/// `relatedEntity` are read.
fn issue_stats_filters(params: &QueryParams) -> Result<IssueFilters> {
    let mut reader = ParamReader::new(params);
    let project = reader.string_list("project");
    let related_entity = reader.string("relatedEntity");
    reader.finish()?;

    let related_entity = related_entity_filter(related_entity.as_deref())?;

    Ok(IssueFilters {
        project,
        related_entity,
        search: None,
    }
    .clean())
}

fn vulnerability_filters(params: &QueryParams) -> Result<(VulnerabilityFilters, Option<String>)> {
    let mut reader = ParamReader::new(params);
    let project_id = reader.string_list("projectId");
    let asset_id = reader.string_list("assetId");
    let vulnerability_external_id = reader.string_list("vulnerabilityExternalId");
    let after = reader.string("after");
    let asset_tags = reader.raw("assetTags");
    reader.finish()?;

    let filters = VulnerabilityFilters {
        project_id,
        asset_id,
        asset_tags: parse_asset_tags(asset_tags)?,
        vulnerability_external_id,
    }
    .clean();
    Ok((filters, after))
}

pub async fn get_issues(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<IssuesResponse>> {
    let (filters, after) = issue_filters(&parse_query(query))?;
    debug!(projects = filters.project.len(), after = ?after, "Fetching Wiz issues");

    let issues = state.client.get_issues(&filters, after.as_deref()).await?;
    Ok(Json(issues))
}

pub async fn get_vulnerabilities(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<VulnerabilitiesResponse>> {
    let (filters, after) = vulnerability_filters(&parse_query(query))?;
    debug!(projects = filters.project_id.len(), after = ?after, "Fetching Wiz vulnerabilities");

    let findings = state
        .client
        .get_vulnerability_findings(&filters, after.as_deref())
        .await?;
    Ok(Json(findings))
}

/// Severity counts and the grouped count for one filter, fetched together.
pub async fn get_issues_stats(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<IssuesStatsResponse>> {
    let filters = issue_stats_filters(&parse_query(query))?;
    debug!(projects = filters.project.len(), "Fetching Wiz issue stats");

    let (severity_counts, grouped_counts) = tokio::try_join!(
        state.client.get_issues_severity_counts(&filters),
        state.client.get_issues_grouped_count(&filters),
    )?;

    Ok(Json(IssuesStatsResponse {
        severity_counts,
        grouped_counts,
    }))
}

pub async fn get_cloud_resources(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<CloudResourcesResponse>> {
    let params = parse_query(query);
    let provider_unique_id = params
        .get("providerUniqueId")
        .map(parse_provider_unique_ids)
        .transpose()?
        .unwrap_or_default();

    let filters = CloudResourceFilters { provider_unique_id }.clean();
    debug!(ids = filters.provider_unique_id.len(), "Resolving cloud resources");

    let resources = state.client.get_all_cloud_resources(&filters).await?;
    Ok(Json(resources))
}

pub async fn get_version_control(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<VersionControlResourcesResponse>> {
    let params = parse_query(query);
    let mut reader = ParamReader::new(&params);
    let search = reader.string_list("search");
    reader.finish()?;

    let filters = VersionControlFilters { search }.clean();
    debug!(terms = filters.search.len(), "Resolving version control resources");

    let resources = state.client.get_version_control_resources(&filters).await?;
    Ok(Json(resources))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{WizError, WizErrorType};

    #[test]
    fn test_issue_filters_from_query() {
        let params = QueryParams::parse(
            "project=p1&project=p1&project=p2&relatedEntity=%7B%22ids%22%3A%5B%22a%22%5D%7D&search=+s+&after=c1",
        );
        let (filters, after) = issue_filters(&params).unwrap();
        assert_eq!(filters.project, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(filters.related_entity.ids, vec!["a".to_string()]);
        assert_eq!(filters.search.as_deref(), Some("s"));
        assert_eq!(after.as_deref(), Some("c1"));
    }

    #[test]
    fn test_malformed_related_entity_is_invalid_request() {
        let params = QueryParams::parse("relatedEntity=not-json");
        let err = issue_filters(&params).unwrap_err();
        assert_eq!(err.kind(), WizErrorType::InvalidRequest);
        assert!(matches!(err, WizError::InvalidRequest { .. }));
    }

    #[test]
    fn test_stats_filters_ignore_search() {
        let params = QueryParams::parse("project=p1&search=leak&after=c1");
        let filters = issue_stats_filters(&params).unwrap();
        assert_eq!(filters.project, vec!["p1".to_string()]);
        assert!(filters.search.is_none());
    }

    #[test]
    fn test_vulnerability_filters_accept_bracketed_tags() {
        let params = QueryParams::parse("projectId=p1&assetTags[containsAny]=t1&assetTags[containsAny]=t2");
        let (filters, after) = vulnerability_filters(&params).unwrap();
        assert_eq!(filters.project_id, vec!["p1".to_string()]);
        assert_eq!(filters.asset_tags.contains_any.len(), 2);
        assert!(after.is_none());
    }

    #[test]
    fn test_repeated_after_is_a_validation_error() {
        let params = QueryParams::parse("after=a&after=b");
        assert!(matches!(
            vulnerability_filters(&params),
            Err(WizError::Validation { .. })
        ));
    }
}
