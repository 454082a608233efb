use tabled::Tabled;

use super::{print_findings, resolve_entity};
use crate::api::{FindingsPager, WizApiClient};
use crate::cli::FindingsArgs;
use crate::config::Config;
use crate::error::Result;
use crate::filters::{build_issue_filter, QueryFilter};
use crate::output::{format_date, print_message, status_colored, truncate};
use crate::types::{IssueNode, Severity};

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&IssueNode> for IssueRow {
    fn from(issue: &IssueNode) -> Self {
        Self {
            severity: Severity::parse(&issue.severity).colored(),
            status: status_colored(&issue.status),
            rule: issue
                .source_rule
                .as_ref()
                .and_then(|r| r.name.as_deref())
                .map(|name| truncate(name, 50))
                .unwrap_or_else(|| "-".to_string()),
            resource: issue
                .entity_snapshot
                .as_ref()
                .map(|e| truncate(e.name.as_deref().unwrap_or(&e.id), 40))
                .unwrap_or_else(|| "-".to_string()),
            created: format_date(&issue.created_at),
        }
    }
}

pub async fn list(api: &WizApiClient, config: &Config, args: FindingsArgs) -> Result<()> {
    let Some(entity_ids) = resolve_entity(api, &args.entity).await? else {
        return Ok(());
    };

    let filters = build_issue_filter(&entity_ids, args.search.as_deref());
    if filters.is_empty() {
        print_message("No Wiz ids matched the given annotations.");
        return Ok(());
    }

    let pager = FindingsPager::new(api, filters);
    print_findings(
        pager,
        args.limit(),
        config.pagination.max_pages,
        "issues",
        |issue: &IssueNode| IssueRow::from(issue),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntitySnapshot, SourceRule};

    #[test]
    fn test_issue_row_prefers_names() {
        colored::control::set_override(false);
        let issue = IssueNode {
            id: "i1".into(),
            url: None,
            source_rule: Some(SourceRule {
                typename: Some("CloudConfigurationRule".into()),
                id: Some("r1".into()),
                name: Some("Bucket is public".into()),
            }),
            created_at: "2024-03-01T10:00:00Z".into(),
            issue_type: Some("TOXIC_COMBINATION".into()),
            status: "OPEN".into(),
            severity: "HIGH".into(),
            entity_snapshot: Some(EntitySnapshot {
                id: "e1".into(),
                entity_type: Some("BUCKET".into()),
                name: None,
            }),
        };

        let row = IssueRow::from(&issue);
        assert_eq!(row.severity, "High");
        assert_eq!(row.rule, "Bucket is public");
        assert_eq!(row.resource, "e1");
    }
}
