//! Shared GraphQL response types used by the proxy and its clients.

use serde::{Deserialize, Serialize};

use crate::types::{GroupedCount, IssueNode, IssuesCounts, ResourceNode, VulnerabilityNode};

/// Pagination info for cursor-based pagination.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor for the next page, if there is one. Empty cursors count as none.
    pub fn next_cursor(&self) -> Option<&str> {
        if !self.has_next_page {
            return None;
        }
        self.end_cursor.as_deref().filter(|c| !c.is_empty())
    }
}

/// A page of a counted connection.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Connection<T> {
    #[serde(rename = "totalCount", default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
}

/// A page of an uncounted connection (resource lookups).
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NodeConnection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IssuesResponse {
    pub issues: Connection<IssueNode>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VulnerabilitiesResponse {
    #[serde(rename = "vulnerabilityFindings")]
    pub vulnerability_findings: Connection<VulnerabilityNode>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IssuesCountsResponse {
    pub issues: IssuesCounts,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IssuesGroupedResponse {
    #[serde(rename = "issuesGroupedByValue")]
    pub issues_grouped_by_value: GroupedCount,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IssuesStatsResponse {
    #[serde(rename = "severityCounts")]
    pub severity_counts: IssuesCountsResponse,
    #[serde(rename = "groupedCounts")]
    pub grouped_counts: IssuesGroupedResponse,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CloudResourcesData {
    #[serde(rename = "cloudResources")]
    pub cloud_resources: NodeConnection<ResourceNode>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VersionControlResourcesData {
    #[serde(rename = "versionControlResources")]
    pub version_control_resources: NodeConnection<ResourceNode>,
}

/// Resource lookups keep the GraphQL `data` envelope on the wire.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DataEnvelope<T> {
    pub data: T,
}

pub type CloudResourcesResponse = DataEnvelope<CloudResourcesData>;
pub type VersionControlResourcesResponse = DataEnvelope<VersionControlResourcesData>;

impl CloudResourcesResponse {
    pub fn ids(&self) -> Vec<String> {
        self.data
            .cloud_resources
            .nodes
            .iter()
            .map(|n| n.id.clone())
            .collect()
    }
}

impl VersionControlResourcesResponse {
    pub fn ids(&self) -> Vec<String> {
        self.data
            .version_control_resources
            .nodes
            .iter()
            .map(|n| n.id.clone())
            .collect()
    }
}

/// Accumulates the pages of a counted connection.
///
/// The upstream API sometimes reports `totalCount: 0` on a continuation page;
/// such a zero never replaces a total learned from an earlier page once
/// items have been seen.
#[derive(Debug, Clone)]
pub struct PageAccumulator<T> {
    nodes: Vec<T>,
    total_count: u64,
    page_info: PageInfo,
    pages: usize,
}

impl<T> Default for PageAccumulator<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            total_count: 0,
            page_info: PageInfo::default(),
            pages: 0,
        }
    }
}

impl<T> PageAccumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: Connection<T>) {
        let continuation = self.pages > 0;
        let total_count = page.total_count.unwrap_or_default();
        let zero_on_continuation = total_count == 0
            && continuation
            && (!self.nodes.is_empty() || !page.nodes.is_empty() || page.page_info.has_next_page);

        if !zero_on_continuation {
            self.total_count = total_count;
        }
        self.nodes.extend(page.nodes);
        self.page_info = page.page_info;
        self.pages += 1;
    }

    pub fn nodes(&self) -> &[T] {
        &self.nodes
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Cursor to request next, or `None` when the last page has been seen.
    pub fn next_cursor(&self) -> Option<&str> {
        self.page_info.next_cursor()
    }

    pub fn into_connection(self) -> Connection<T> {
        Connection {
            total_count: Some(self.total_count),
            nodes: self.nodes,
            page_info: self.page_info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: u64, ids: std::ops::Range<u32>, next: Option<&str>) -> Connection<u32> {
        Connection {
            total_count: Some(total),
            nodes: ids.collect(),
            page_info: PageInfo {
                has_next_page: next.is_some(),
                end_cursor: next.map(String::from),
            },
        }
    }

    #[test]
    fn test_zero_total_on_continuation_keeps_first_total() {
        let mut acc = PageAccumulator::new();
        acc.push(page(10, 0..5, Some("c1")));
        acc.push(page(0, 5..10, None));

        assert_eq!(acc.total_count(), 10);
        assert_eq!(acc.nodes().len(), 10);
        assert_eq!(acc.next_cursor(), None);
    }

    #[test]
    fn test_zero_total_on_first_page_is_taken() {
        let mut acc: PageAccumulator<u32> = PageAccumulator::new();
        acc.push(page(0, 0..0, None));
        assert_eq!(acc.total_count(), 0);
        assert_eq!(acc.pages(), 1);
    }

    #[test]
    fn test_non_zero_total_on_continuation_replaces() {
        let mut acc = PageAccumulator::new();
        acc.push(page(10, 0..5, Some("c1")));
        acc.push(page(12, 5..10, Some("c2")));
        assert_eq!(acc.total_count(), 12);
        assert_eq!(acc.next_cursor(), Some("c2"));
    }

    #[test]
    fn test_next_cursor_ignores_empty_cursor() {
        let info = PageInfo {
            has_next_page: true,
            end_cursor: Some(String::new()),
        };
        assert_eq!(info.next_cursor(), None);
    }

    #[test]
    fn test_connection_tolerates_missing_fields() {
        let conn: Connection<u32> = serde_json::from_str(r#"{"nodes":[1,2]}"#).unwrap();
        assert_eq!(conn.total_count, None);
        assert!(!conn.page_info.has_next_page);
    }

    #[test]
    fn test_connection_keeps_upstream_shape() {
        let conn: Connection<u32> = serde_json::from_str(r#"{"nodes":[1]}"#).unwrap();
        let value = serde_json::to_value(&conn).unwrap();
        assert!(value.get("totalCount").is_none());

        let counted: Connection<u32> =
            serde_json::from_str(r#"{"totalCount":0,"nodes":[]}"#).unwrap();
        assert_eq!(serde_json::to_value(&counted).unwrap()["totalCount"], 0);
    }
}
