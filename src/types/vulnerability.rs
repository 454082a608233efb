use serde::{Deserialize, Serialize};

/// One row of the vulnerability findings query.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VulnerabilityNode {
    pub id: String,
    #[serde(rename = "vulnerabilityExternalId", default)]
    pub vulnerability_external_id: Option<String>,
    #[serde(rename = "portalUrl")]
    pub portal_url: Option<String>,
    pub name: String,
    #[serde(rename = "CVSSSeverity")]
    pub cvss_severity: Option<String>,
    #[serde(rename = "hasExploit", default)]
    pub has_exploit: bool,
    #[serde(rename = "hasCisaKevExploit", default)]
    pub has_cisa_kev_exploit: bool,
    #[serde(rename = "relatedIssueAnalytics")]
    pub related_issue_analytics: Option<RelatedIssueAnalytics>,
    pub status: Option<String>,
    #[serde(rename = "vendorSeverity")]
    pub vendor_severity: Option<String>,
    #[serde(rename = "firstDetectedAt")]
    pub first_detected_at: Option<String>,
    #[serde(rename = "lastDetectedAt")]
    pub last_detected_at: Option<String>,
    #[serde(rename = "fixedVersion", default)]
    pub fixed_version: Option<String>,
    #[serde(rename = "vulnerableAsset")]
    pub vulnerable_asset: Option<VulnerableAsset>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct VulnerableAsset {
    pub id: String,
    #[serde(rename = "type")]
    pub asset_type: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "providerUniqueId")]
    pub provider_unique_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RelatedIssueAnalytics {
    #[serde(rename = "issueCount")]
    pub issue_count: u64,
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
