//! GraphQL documents sent to the Wiz API.

use const_format::concatcp;

const PAGE_INFO: &str = r#"
        pageInfo {
            hasNextPage
            endCursor
        }
"#;

pub const ISSUES_QUERY: &str = concatcp!(
    r#"
query IssuesTable($filterBy: IssueFilters, $first: Int, $after: String, $orderBy: IssueOrder) {
    issues: issuesV2(filterBy: $filterBy, first: $first, after: $after, orderBy: $orderBy) {
        totalCount
        nodes {
            url
            id
            sourceRule {
                __typename
                ... on Control {
                    id
                    name
                }
                ... on CloudConfigurationRule {
                    id
                    name
                }
                ... on CloudEventRule {
                    id
                    name
                }
            }
            createdAt
            type
            status
            severity
            entitySnapshot {
                id
                type
                name
            }
        }"#,
    PAGE_INFO,
    r#"    }
}
"#
);

pub const VULNERABILITY_FINDINGS_QUERY: &str = concatcp!(
    r#"
query VulnerabilityFindingsPage($filterBy: VulnerabilityFindingFilters, $first: Int, $after: String, $orderBy: VulnerabilityFindingOrder) {
    vulnerabilityFindings(filterBy: $filterBy, first: $first, after: $after, orderBy: $orderBy) {
        totalCount
        nodes {
            id
            vulnerabilityExternalId
            portalUrl
            name
            CVSSSeverity
            hasExploit
            hasCisaKevExploit
            relatedIssueAnalytics {
                issueCount
                criticalSeverityCount
                highSeverityCount
                mediumSeverityCount
                lowSeverityCount
                informationalSeverityCount
            }
            status
            vendorSeverity
            firstDetectedAt
            lastDetectedAt
            fixedVersion
            vulnerableAsset {
                ... on VulnerableAssetBase {
                    id
                    type
                    name
                    providerUniqueId
                }
                ... on VulnerableAssetVirtualMachine {
                    id
                    type
                    name
                    providerUniqueId
                }
                ... on VulnerableAssetServerless {
                    id
                    type
                    name
                    providerUniqueId
                }
                ... on VulnerableAssetContainerImage {
                    id
                    type
                    name
                    providerUniqueId
                }
                ... on VulnerableAssetContainer {
                    id
                    type
                    name
                    providerUniqueId
                }
            }
        }"#,
    PAGE_INFO,
    r#"    }
}
"#
);

pub const ISSUES_SEVERITY_COUNTS_QUERY: &str = r#"
query IssuesSeverityCounts($filterBy: IssueFilters, $filterScope: IssueFiltersScope) {
    issues: issuesV2(filterBy: $filterBy, filterScope: $filterScope) {
        ...IssueCounts
    }
}

fragment IssueCounts on IssueConnection {
    totalCount
    criticalSeverityCount
    highSeverityCount
    mediumSeverityCount
    lowSeverityCount
    informationalSeverityCount
}
"#;

pub const ISSUES_GROUPED_COUNT_QUERY: &str = r#"
query IssuesGroupedByValueTotalCount($groupBy: IssuesGroupedByValueField!, $filterBy: IssueFilters) {
    issuesGroupedByValue(groupBy: $groupBy, filterBy: $filterBy) {
        totalCount
    }
}
"#;

pub const CLOUD_RESOURCES_QUERY: &str = concatcp!(
    r#"
query CloudResourceSearch($filterBy: CloudResourceFilters, $first: Int, $after: String) {
    cloudResources(filterBy: $filterBy, first: $first, after: $after) {
        nodes {
            id
        }"#,
    PAGE_INFO,
    r#"    }
}
"#
);

pub const VERSION_CONTROL_RESOURCES_QUERY: &str = concatcp!(
    r#"
query VersionControlResources($first: Int, $after: String, $filterBy: VersionControlResourceFilters) {
    versionControlResources(first: $first, after: $after, filterBy: $filterBy) {
        nodes {
            id
        }"#,
    PAGE_INFO,
    r#"    }
}
"#
);

/// Field the grouped issue count is bucketed by.
pub const ISSUES_GROUP_BY: &str = "SOURCE_RULE";
