//! Typed filters for each proxy endpoint and the builders that derive them
//! from an entity's Wiz annotations.
//!
//! Every filter is a closed struct. `clean` prunes it (trims, de-duplicates,
//! drops empties) and is idempotent; serialization to GraphQL variables and
//! to query-string pairs skips whatever is empty.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const WIZ_PROJECT_ANNOTATION: &str = "wiz.io/project-id";
pub const WIZ_ASSET_ANNOTATION: &str = "wiz.io/asset-id";
pub const WIZ_EXTERNAL_ASSET_ANNOTATION: &str = "wiz.io/external-asset-id";
pub const WIZ_REPO_ANNOTATION: &str = "wiz.io/repo-id";

/// Operations every endpoint filter supports.
pub trait QueryFilter: Serialize {
    /// Return the pruned form of this filter.
    fn clean(self) -> Self;

    fn is_empty(&self) -> bool;

    /// Query-string pairs: arrays repeat their key, nested objects are
    /// JSON-encoded into one value, scalars are written as-is.
    fn query_pairs(&self) -> Vec<(String, String)>;

    /// Render as a query string, appending `after` when given.
    fn to_query_string(&self, after: Option<&str>) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.query_pairs() {
            serializer.append_pair(&key, &value);
        }
        if let Some(cursor) = after.filter(|c| !c.is_empty()) {
            serializer.append_pair("after", cursor);
        }
        serializer.finish()
    }
}

/// Trim, drop blanks and de-duplicate, keeping first-seen order.
pub fn dedup_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Intersect the non-empty lists. Empty lists are skipped rather than
/// intersected, so they never shrink the result. Order follows the first
/// non-empty list.
pub fn intersect_ids(lists: &[&[String]]) -> Vec<String> {
    let mut non_empty = lists.iter().filter(|ids| !ids.is_empty());

    let Some(first) = non_empty.next() else {
        return Vec::new();
    };

    let rest: Vec<HashSet<&str>> = non_empty
        .map(|ids| ids.iter().map(String::as_str).collect())
        .collect();

    dedup_ids(
        first
            .iter()
            .filter(|id| rest.iter().all(|set| set.contains(id.as_str()))),
    )
}

fn push_list(pairs: &mut Vec<(String, String)>, key: &str, values: &[String]) {
    pairs.extend(
        values
            .iter()
            .filter(|v| !v.is_empty())
            .map(|v| (key.to_string(), v.clone())),
    );
}

fn push_json<T: Serialize>(pairs: &mut Vec<(String, String)>, key: &str, value: &T) {
    // Serializing these plain structs cannot fail.
    if let Ok(encoded) = serde_json::to_string(value) {
        pairs.push((key.to_string(), encoded));
    }
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Entity ids
// ---------------------------------------------------------------------------

/// Identifier sets derived once per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityIds {
    pub cloud_resource_ids: Vec<String>,
    pub version_control_ids: Vec<String>,
    pub direct_asset_ids: Vec<String>,
    pub project_ids: Vec<String>,
}

impl EntityIds {
    pub fn is_empty(&self) -> bool {
        self.cloud_resource_ids.is_empty()
            && self.version_control_ids.is_empty()
            && self.direct_asset_ids.is_empty()
            && self.project_ids.is_empty()
    }

    /// Intersection of the asset-like id sets.
    pub fn related_ids(&self) -> Vec<String> {
        intersect_ids(&[
            self.direct_asset_ids.as_slice(),
            self.cloud_resource_ids.as_slice(),
            self.version_control_ids.as_slice(),
        ])
    }
}

/// The Wiz annotations of a catalog entity, split into id lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityAnnotations {
    pub project_ids: Vec<String>,
    pub asset_ids: Vec<String>,
    pub external_asset_ids: Vec<String>,
    pub repo_ids: Vec<String>,
}

impl EntityAnnotations {
    /// Split a comma-separated annotation value.
    pub fn split_value(value: &str) -> Vec<String> {
        dedup_ids(value.split(','))
    }

    pub fn from_map(annotations: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| {
            annotations
                .get(key)
                .map(|v| Self::split_value(v))
                .unwrap_or_default()
        };

        Self {
            project_ids: get(WIZ_PROJECT_ANNOTATION),
            asset_ids: get(WIZ_ASSET_ANNOTATION),
            external_asset_ids: get(WIZ_EXTERNAL_ASSET_ANNOTATION),
            repo_ids: get(WIZ_REPO_ANNOTATION),
        }
    }

    /// Wiz views are offered when a project is annotated.
    pub fn is_wiz_available(&self) -> bool {
        !self.project_ids.is_empty()
    }

    pub fn are_missing(&self) -> bool {
        self.project_ids.is_empty()
            && self.asset_ids.is_empty()
            && self.external_asset_ids.is_empty()
            && self.repo_ids.is_empty()
    }

    /// Entity ids for the annotations that need no lookup; the resolved
    /// cloud and version-control ids are supplied by the caller.
    pub fn into_entity_ids(
        self,
        cloud_resource_ids: Vec<String>,
        version_control_ids: Vec<String>,
    ) -> EntityIds {
        EntityIds {
            cloud_resource_ids: dedup_ids(cloud_resource_ids),
            version_control_ids: dedup_ids(version_control_ids),
            direct_asset_ids: self.asset_ids,
            project_ids: self.project_ids,
        }
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

impl RelatedEntity {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub project: Vec<String>,
    #[serde(rename = "relatedEntity", skip_serializing_if = "RelatedEntity::is_empty")]
    pub related_entity: RelatedEntity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl QueryFilter for IssueFilters {
    fn clean(self) -> Self {
        Self {
            project: dedup_ids(self.project),
            related_entity: RelatedEntity {
                ids: dedup_ids(self.related_entity.ids),
            },
            search: clean_text(self.search),
        }
    }

    fn is_empty(&self) -> bool {
        self.project.is_empty() && self.related_entity.is_empty() && self.search.is_none()
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, "project", &self.project);
        if !self.related_entity.is_empty() {
            push_json(&mut pairs, "relatedEntity", &self.related_entity);
        }
        if let Some(search) = &self.search {
            pairs.push(("search".to_string(), search.clone()));
        }
        pairs
    }
}

/// Filter for the issues view: projects, the intersected asset ids as the
/// related entity, and the search text as a single string.
pub fn build_issue_filter(entity_ids: &EntityIds, search_text: Option<&str>) -> IssueFilters {
    IssueFilters {
        project: entity_ids.project_ids.clone(),
        related_entity: RelatedEntity {
            ids: entity_ids.related_ids(),
        },
        search: search_text.map(String::from),
    }
    .clean()
}

// ---------------------------------------------------------------------------
// Vulnerabilities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTags {
    #[serde(rename = "containsAny", default, skip_serializing_if = "Vec::is_empty")]
    pub contains_any: Vec<String>,
}

impl AssetTags {
    pub fn is_empty(&self) -> bool {
        self.contains_any.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VulnerabilityFilters {
    #[serde(rename = "projectId", skip_serializing_if = "Vec::is_empty")]
    pub project_id: Vec<String>,
    #[serde(rename = "assetId", skip_serializing_if = "Vec::is_empty")]
    pub asset_id: Vec<String>,
    #[serde(rename = "assetTags", skip_serializing_if = "AssetTags::is_empty")]
    pub asset_tags: AssetTags,
    #[serde(rename = "vulnerabilityExternalId", skip_serializing_if = "Vec::is_empty")]
    pub vulnerability_external_id: Vec<String>,
}

impl QueryFilter for VulnerabilityFilters {
    fn clean(self) -> Self {
        Self {
            project_id: dedup_ids(self.project_id),
            asset_id: dedup_ids(self.asset_id),
            asset_tags: AssetTags {
                contains_any: dedup_ids(self.asset_tags.contains_any),
            },
            vulnerability_external_id: dedup_ids(self.vulnerability_external_id),
        }
    }

    fn is_empty(&self) -> bool {
        self.project_id.is_empty()
            && self.asset_id.is_empty()
            && self.asset_tags.is_empty()
            && self.vulnerability_external_id.is_empty()
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, "projectId", &self.project_id);
        push_list(&mut pairs, "assetId", &self.asset_id);
        if !self.asset_tags.is_empty() {
            push_json(&mut pairs, "assetTags", &self.asset_tags);
        }
        push_list(
            &mut pairs,
            "vulnerabilityExternalId",
            &self.vulnerability_external_id,
        );
        pairs
    }
}

/// Filter for the vulnerabilities view. Unlike the issues view, the search
/// text is a comma-separated list of vulnerability external ids.
pub fn build_vulnerability_filter(
    entity_ids: &EntityIds,
    search_text: Option<&str>,
) -> VulnerabilityFilters {
    let external_ids = search_text
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.split(',').map(String::from).collect())
        .unwrap_or_default();

    VulnerabilityFilters {
        project_id: entity_ids.project_ids.clone(),
        asset_id: entity_ids.related_ids(),
        asset_tags: AssetTags::default(),
        vulnerability_external_id: external_ids,
    }
    .clean()
}

// ---------------------------------------------------------------------------
// Resource lookups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloudResourceFilters {
    #[serde(rename = "providerUniqueId", skip_serializing_if = "Vec::is_empty")]
    pub provider_unique_id: Vec<String>,
}

impl QueryFilter for CloudResourceFilters {
    fn clean(self) -> Self {
        Self {
            provider_unique_id: dedup_ids(self.provider_unique_id),
        }
    }

    fn is_empty(&self) -> bool {
        self.provider_unique_id.is_empty()
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, "providerUniqueId", &self.provider_unique_id);
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionControlFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search: Vec<String>,
}

impl QueryFilter for VersionControlFilters {
    fn clean(self) -> Self {
        Self {
            search: dedup_ids(self.search),
        }
    }

    fn is_empty(&self) -> bool {
        self.search.is_empty()
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        push_list(&mut pairs, "search", &self.search);
        pairs
    }
}
