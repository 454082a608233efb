use std::io::{self, Write};
use std::path::Path;

use crate::config::{CLIENT_ID_KEY, CLIENT_SECRET_KEY};
use crate::error::{Result, WizError};

const DEFAULT_AUTH_URL: &str = "https://auth.app.wiz.io/oauth/token";

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

/// Render the config file for the answers given.
fn render(
    client_id: &str,
    client_secret: &str,
    auth_url: &str,
    api_endpoint_url: &str,
    dashboard_link: Option<&str>,
) -> String {
    let mut content = String::from("[wiz]\n");
    content.push_str(&format!("client_id = {}\n", quoted(client_id)));
    content.push_str(&format!("client_secret = {}\n", quoted(client_secret)));
    content.push_str(&format!("auth_url = {}\n", quoted(auth_url)));
    content.push_str(&format!("api_endpoint_url = {}\n", quoted(api_endpoint_url)));
    if let Some(link) = dashboard_link {
        content.push_str(&format!("dashboard_link = {}\n", quoted(link)));
    }
    content
}

pub async fn run(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        let answer = prompt(&format!(
            "Config file already exists at {}. Overwrite? [y/N] ",
            config_path.display()
        ))?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    println!("Wiz Configuration");
    println!("=================\n");

    let client_id = prompt("Enter your Wiz service account client ID: ")?;
    if client_id.is_empty() {
        return Err(WizError::missing_config(CLIENT_ID_KEY));
    }

    let client_secret = prompt("Enter the client secret: ")?;
    if client_secret.is_empty() {
        return Err(WizError::missing_config(CLIENT_SECRET_KEY));
    }

    let auth_url = prompt(&format!("Token URL [{DEFAULT_AUTH_URL}]: "))?;
    let auth_url = if auth_url.is_empty() {
        DEFAULT_AUTH_URL.to_string()
    } else {
        auth_url
    };

    let api_endpoint_url =
        prompt("GraphQL endpoint (e.g., https://api.us17.app.wiz.io/graphql): ")?;
    if api_endpoint_url.is_empty() {
        return Err(WizError::missing_config(crate::config::API_ENDPOINT_URL_KEY));
    }

    let dashboard_link = prompt("Wiz dashboard link [optional]: ")?;
    let dashboard_link = Some(dashboard_link.as_str()).filter(|l| !l.is_empty());

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| WizError::ConfigRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
    }

    let content = render(
        &client_id,
        &client_secret,
        &auth_url,
        &api_endpoint_url,
        dashboard_link,
    );
    std::fs::write(config_path, content).map_err(|e| WizError::ConfigRead {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    println!("\nConfig saved to {}", config_path.display());
    println!("Start the proxy with 'wiz serve'.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_rendered_config_loads_back() {
        let content = render(
            "id",
            "se\"cret",
            DEFAULT_AUTH_URL,
            "https://api.example/graphql",
            Some("https://app.wiz.io"),
        );
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.wiz.client_secret.as_deref(), Some("se\"cret"));
        assert_eq!(config.wiz.dashboard_link.as_deref(), Some("https://app.wiz.io"));
        assert_eq!(config.credentials().unwrap().auth_url, DEFAULT_AUTH_URL);
    }
}
