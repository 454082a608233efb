use serde::{Deserialize, Serialize};

/// Issue totals broken down by severity.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct IssuesCounts {
    #[serde(rename = "totalCount")]
    pub total_count: u64,
    #[serde(rename = "criticalSeverityCount")]
    pub critical_severity_count: u64,
    #[serde(rename = "highSeverityCount")]
    pub high_severity_count: u64,
    #[serde(rename = "mediumSeverityCount")]
    pub medium_severity_count: u64,
    #[serde(rename = "lowSeverityCount")]
    pub low_severity_count: u64,
    #[serde(rename = "informationalSeverityCount")]
    pub informational_severity_count: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct GroupedCount {
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}
