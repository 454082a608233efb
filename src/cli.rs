use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::filters::{
    EntityAnnotations, WIZ_ASSET_ANNOTATION, WIZ_EXTERNAL_ASSET_ANNOTATION,
    WIZ_PROJECT_ANNOTATION, WIZ_REPO_ANNOTATION,
};

#[derive(Parser)]
#[command(name = "wiz")]
#[command(about = "Wiz security findings proxy and terminal client", version)]
#[command(after_help = "EXAMPLES:
    wiz serve                                  Start the proxy on 127.0.0.1:7007
    wiz issues --project p-123                 List issues for a project
    wiz vulnerabilities --project p-123 --all  List every vulnerability finding
    wiz stats --project p-123 --repo org/app   Show issue counts by severity")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to the config file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Debug logging and full error chains
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP proxy in front of the Wiz API
    #[command(after_help = "EXAMPLES:
    wiz serve
    wiz serve --host 0.0.0.0 --port 8080")]
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },
    /// List security issues for an entity
    #[command(after_help = "EXAMPLES:
    wiz issues --project p-123
    wiz issues --project p-123 --asset a-1,a-2 --search bucket
    wiz issues --project p-123 --all --json")]
    Issues(FindingsArgs),
    /// List vulnerability findings for an entity
    #[command(after_help = "EXAMPLES:
    wiz vulnerabilities --project p-123
    wiz vulnerabilities --project p-123 --search CVE-2024-1234,CVE-2023-9999")]
    Vulnerabilities(FindingsArgs),
    /// Show issue counts by severity
    #[command(after_help = "EXAMPLES:
    wiz stats --project p-123
    wiz stats --project p-123 --external-asset arn:aws:s3:::bucket")]
    Stats(EntityArgs),
    /// Print the ids resolved from an entity's annotations
    #[command(after_help = "EXAMPLES:
    wiz resolve --external-asset arn:aws:s3:::bucket --repo org/app")]
    Resolve(EntityArgs),
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    wiz completions bash > ~/.bash_completion.d/wiz
    wiz completions zsh > ~/.zfunc/_wiz
    wiz completions fish > ~/.config/fish/completions/wiz.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration file interactively
    #[command(after_help = "EXAMPLES:
    wiz init")]
    Init,
}

/// The Wiz annotations of a catalog entity, given as flags. Each flag takes
/// a comma-separated list and may be repeated.
#[derive(Args, Clone, Debug, Default)]
pub struct EntityArgs {
    /// Wiz project ids (wiz.io/project-id)
    #[arg(long, value_delimiter = ',')]
    pub project: Vec<String>,

    /// Wiz asset ids (wiz.io/asset-id)
    #[arg(long, value_delimiter = ',')]
    pub asset: Vec<String>,

    /// Provider unique ids of cloud resources (wiz.io/external-asset-id)
    #[arg(long = "external-asset", value_delimiter = ',')]
    pub external_asset: Vec<String>,

    /// Repository names to look up (wiz.io/repo-id)
    #[arg(long, value_delimiter = ',')]
    pub repo: Vec<String>,
}

impl EntityArgs {
    /// The flags as the annotation map a catalog entity would carry.
    pub fn annotation_map(&self) -> BTreeMap<String, String> {
        [
            (WIZ_PROJECT_ANNOTATION, &self.project),
            (WIZ_ASSET_ANNOTATION, &self.asset),
            (WIZ_EXTERNAL_ASSET_ANNOTATION, &self.external_asset),
            (WIZ_REPO_ANNOTATION, &self.repo),
        ]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(key, values)| (key.to_string(), values.join(",")))
        .collect()
    }

    pub fn annotations(&self) -> EntityAnnotations {
        EntityAnnotations::from_map(&self.annotation_map())
    }
}

#[derive(Args, Clone, Debug)]
pub struct FindingsArgs {
    #[command(flatten)]
    pub entity: EntityArgs,

    /// Search text (issues) or comma-separated CVE ids (vulnerabilities)
    #[arg(long, short)]
    pub search: Option<String>,

    /// Maximum number of findings to show
    #[arg(long, short, default_value = "20")]
    pub limit: usize,

    /// Fetch every page (bounded by pagination.max_pages)
    #[arg(long)]
    pub all: bool,
}

impl FindingsArgs {
    pub fn limit(&self) -> Option<usize> {
        (!self.all).then_some(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_annotation_flags_split_on_commas() {
        let cli = Cli::parse_from([
            "wiz",
            "issues",
            "--project",
            "p1, p2",
            "--project",
            "p1",
            "--repo",
            "org/app",
            "--all",
        ]);
        let Commands::Issues(args) = cli.command else {
            panic!("expected issues command");
        };
        let annotations = args.entity.annotations();
        assert_eq!(annotations.project_ids, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(annotations.repo_ids, vec!["org/app".to_string()]);
        assert_eq!(args.limit(), None);
    }

    #[test]
    fn test_stats_without_project_is_not_wiz_available() {
        let cli = Cli::parse_from(["wiz", "stats", "--asset", "a1"]);
        let Commands::Stats(args) = cli.command else {
            panic!("expected stats command");
        };
        let map = args.annotation_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map[WIZ_ASSET_ANNOTATION], "a1");
        assert!(!args.annotations().is_wiz_available());
        assert!(!args.annotations().are_missing());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["wiz", "stats", "--project", "p1", "--json", "-v"]);
        assert!(cli.json);
        assert!(cli.verbose);
    }
}
