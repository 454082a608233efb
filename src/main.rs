mod cli;
mod commands;
mod output;

use std::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use reqwest::Client;

use wiz_proxy::{api, config, error, filters, logging, responses, routes, types};

use api::WizApiClient;
use cli::{Cli, Commands};
use config::Config;
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            if let Some(details) = e.details() {
                eprintln!("Details: {details}");
            }
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    output::set_json_output(cli.json);

    match cli.command {
        // Commands that don't require config
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "wiz", &mut io::stdout());
        }
        Commands::Init => {
            let path = match cli.config {
                Some(path) => path,
                None => Config::config_path()?,
            };
            commands::init::run(&path).await?;
        }
        command => {
            let config = match &cli.config {
                Some(path) => Config::load_from(path)?,
                None => Config::load()?,
            };
            logging::init(&config.logging, cli.verbose);

            if let Commands::Serve { host, port } = command {
                return commands::serve::run(config, host, port).await;
            }

            if !config.wiz.enabled {
                output::print_message("Wiz integration is disabled (wiz.enabled = false).");
                return Ok(());
            }

            let http = Client::builder().timeout(config.request_timeout()).build()?;
            let api = WizApiClient::new(http, &config.client.base_url)?;

            match command {
                Commands::Issues(args) => {
                    commands::issues::list(&api, &config, args).await?;
                }
                Commands::Vulnerabilities(args) => {
                    commands::vulnerabilities::list(&api, &config, args).await?;
                }
                Commands::Stats(args) => {
                    commands::stats::show(&api, &config, args).await?;
                }
                Commands::Resolve(args) => {
                    commands::resolve::run(&api, args).await?;
                }
                Commands::Serve { .. } | Commands::Completions { .. } | Commands::Init => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
