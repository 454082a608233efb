use super::resolve_entity;
use crate::api::WizApiClient;
use crate::cli::EntityArgs;
use crate::error::Result;
use crate::filters::EntityIds;
use crate::output::print_item;

fn display(ids: &EntityIds) {
    let sections = [
        ("Projects", &ids.project_ids),
        ("Assets", &ids.direct_asset_ids),
        ("Cloud resources", &ids.cloud_resource_ids),
        ("Version control", &ids.version_control_ids),
    ];
    for (title, values) in sections {
        if values.is_empty() {
            println!("{title}: -");
        } else {
            println!("{title}: {}", values.join(", "));
        }
    }

    let related = ids.related_ids();
    if !related.is_empty() {
        println!("Related entity ids: {}", related.join(", "));
    }
}

pub async fn run(api: &WizApiClient, args: EntityArgs) -> Result<()> {
    if let Some(ids) = resolve_entity(api, &args).await? {
        print_item(&ids, display);
    }
    Ok(())
}
