pub mod init;
pub mod issues;
pub mod resolve;
pub mod serve;
pub mod stats;
pub mod vulnerabilities;

use tabled::Tabled;

use crate::api::{FindingsPager, FindingsQuery, WizApiClient};
use crate::cli::EntityArgs;
use crate::error::Result;
use crate::filters::EntityIds;
use crate::output::{is_json_output, print_message, print_table};
use crate::responses::Connection;

/// Resolve the entity's ids, or print a notice and return `None` when no
/// annotation was given.
pub(crate) async fn resolve_entity(
    api: &WizApiClient,
    args: &EntityArgs,
) -> Result<Option<EntityIds>> {
    let annotations = args.annotations();
    if annotations.are_missing() {
        print_message(
            "No Wiz annotations given. Use --project, --asset, --external-asset or --repo.",
        );
        return Ok(None);
    }
    api.resolve_entity_ids(annotations).await.map(Some)
}

/// Load pages up to `limit` and print them with a summary footer.
pub(crate) async fn print_findings<F, R>(
    mut pager: FindingsPager<'_, F>,
    limit: Option<usize>,
    max_pages: usize,
    noun: &str,
    to_row: impl Fn(&F::Node) -> R,
) -> Result<()>
where
    F: FindingsQuery,
    F::Node: serde::Serialize,
    R: Tabled,
{
    pager.load_until(limit, max_pages).await?;
    let more = pager.has_more();
    let total = pager.total_count();

    let Connection {
        total_count,
        mut nodes,
        page_info,
    } = pager.into_connection();
    if let Some(limit) = limit {
        nodes.truncate(limit);
    }

    if nodes.is_empty() && !is_json_output() {
        print_message(&format!("No {noun} found."));
        return Ok(());
    }

    let shown = nodes.len();
    let page = Connection {
        total_count,
        nodes,
        page_info,
    };
    print_table(&page.nodes, to_row, &page);

    if !is_json_output() {
        println!("Showing {shown} of {total} {noun}");
        if more {
            println!("More results available. Use --all or a higher --limit.");
        }
    }
    Ok(())
}
