use tabled::Tabled;

use super::{print_findings, resolve_entity};
use crate::api::{FindingsPager, WizApiClient};
use crate::cli::FindingsArgs;
use crate::config::Config;
use crate::error::Result;
use crate::filters::{build_vulnerability_filter, QueryFilter};
use crate::output::{format_date, print_message, truncate, yes_no};
use crate::types::{Severity, VulnerabilityNode};

#[derive(Tabled)]
struct VulnerabilityRow {
    #[tabled(rename = "CVE")]
    name: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Exploit")]
    exploit: String,
    #[tabled(rename = "CISA KEV")]
    kev: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Fixed In")]
    fixed_version: String,
    #[tabled(rename = "First Seen")]
    first_detected: String,
}

impl From<&VulnerabilityNode> for VulnerabilityRow {
    fn from(finding: &VulnerabilityNode) -> Self {
        let severity = finding
            .cvss_severity
            .as_deref()
            .or(finding.vendor_severity.as_deref())
            .map(Severity::parse)
            .unwrap_or(Severity::None);

        Self {
            name: finding.name.clone(),
            severity: severity.colored(),
            exploit: yes_no(finding.has_exploit),
            kev: yes_no(finding.has_cisa_kev_exploit),
            asset: finding
                .vulnerable_asset
                .as_ref()
                .map(|a| truncate(a.name.as_deref().unwrap_or(&a.id), 40))
                .unwrap_or_else(|| "-".to_string()),
            fixed_version: finding.fixed_version.clone().unwrap_or_else(|| "-".to_string()),
            first_detected: finding
                .first_detected_at
                .as_deref()
                .map(format_date)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

pub async fn list(api: &WizApiClient, config: &Config, args: FindingsArgs) -> Result<()> {
    let Some(entity_ids) = resolve_entity(api, &args.entity).await? else {
        return Ok(());
    };

    let filters = build_vulnerability_filter(&entity_ids, args.search.as_deref());
    if filters.is_empty() {
        print_message("No Wiz ids matched the given annotations.");
        return Ok(());
    }

    let pager = FindingsPager::new(api, filters);
    print_findings(
        pager,
        args.limit(),
        config.pagination.max_pages,
        "vulnerabilities",
        |finding: &VulnerabilityNode| VulnerabilityRow::from(finding),
    )
    .await
}
