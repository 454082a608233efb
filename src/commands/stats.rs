use super::resolve_entity;
use crate::api::WizApiClient;
use crate::cli::EntityArgs;
use crate::config::Config;
use crate::error::Result;
use crate::filters::{build_issue_filter, QueryFilter};
use crate::output::{print_item, print_message};
use crate::responses::IssuesStatsResponse;
use crate::types::{IssuesCounts, Severity};

fn severity_lines(counts: &IssuesCounts) -> Vec<(Severity, u64)> {
    vec![
        (Severity::Critical, counts.critical_severity_count),
        (Severity::High, counts.high_severity_count),
        (Severity::Medium, counts.medium_severity_count),
        (Severity::Low, counts.low_severity_count),
        (Severity::Informational, counts.informational_severity_count),
    ]
}

fn display(stats: &IssuesStatsResponse, dashboard_link: Option<&str>) {
    let counts = &stats.severity_counts.issues;
    println!("Issues: {}", counts.total_count);
    println!();
    for (severity, count) in severity_lines(counts) {
        // Pad before coloring so escape codes do not skew the column.
        let label = format!("{:<10}", severity.label());
        println!(
            "  {}{count}",
            label.replacen(severity.label(), &severity.colored(), 1)
        );
    }
    println!();
    println!(
        "Distinct source rules: {}",
        stats.grouped_counts.issues_grouped_by_value.total_count
    );
    if let Some(link) = dashboard_link {
        println!("Dashboard: {link}");
    }
}

pub async fn show(api: &WizApiClient, config: &Config, args: EntityArgs) -> Result<()> {
    if !args.annotations().is_wiz_available() {
        print_message("Issue stats need a Wiz project. Use --project.");
        return Ok(());
    }

    let Some(entity_ids) = resolve_entity(api, &args).await? else {
        return Ok(());
    };

    let filters = build_issue_filter(&entity_ids, None);
    if filters.is_empty() {
        print_message("No Wiz ids matched the given annotations.");
        return Ok(());
    }

    let stats = api.fetch_issues_stats(&filters).await?;
    let dashboard_link = config.wiz.dashboard_link.as_deref();
    print_item(&stats, |s| display(s, dashboard_link));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_lines_are_ordered_most_severe_first() {
        let counts = IssuesCounts {
            total_count: 6,
            critical_severity_count: 1,
            high_severity_count: 2,
            medium_severity_count: 3,
            ..Default::default()
        };
        let lines = severity_lines(&counts);
        assert_eq!(lines[0], (Severity::Critical, 1));
        assert_eq!(lines[2], (Severity::Medium, 3));
        assert!(lines.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
