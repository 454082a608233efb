//! HTTP surface of the proxy.

pub mod error_handler;
pub mod handlers;
pub mod params;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use reqwest::Client;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::WizAuth;
use crate::client::WizClient;
use crate::config::Config;
use crate::error::Result;

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<WizClient>,
}

/// Validate configuration, fetch the first token and build the routes.
///
/// Fails before binding anything when a credential is missing or the token
/// exchange is rejected, so a misconfigured proxy never starts serving.
pub async fn create_router(config: &Config) -> Result<Router> {
    let credentials = config.credentials()?;

    let http = Client::builder().timeout(config.request_timeout()).build()?;
    let auth = WizAuth::new(http.clone(), &credentials);

    let token = auth.fetch_access_token().await.inspect_err(|e| {
        error!(error_type = %e.kind(), error = %e, "Failed to obtain initial Wiz access token");
    })?;
    auth.store(&token).await;
    info!("Obtained initial Wiz access token");

    let client = WizClient::new(
        http,
        credentials.api_endpoint_url,
        Arc::new(auth),
        config.pagination.clone(),
    );

    let router = router(AppState {
        client: Arc::new(client),
    });
    Ok(mount(router, &config.server.base_path))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/wiz-issues", get(handlers::get_issues))
        .route("/wiz-vulnerabilities", get(handlers::get_vulnerabilities))
        .route("/wiz-issues-stats", get(handlers::get_issues_stats))
        .route("/wiz-cloud-resources", get(handlers::get_cloud_resources))
        .route("/wiz-version-control", get(handlers::get_version_control))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Nest the routes under `base_path`; an empty or root path mounts them
/// directly.
pub fn mount(router: Router, base_path: &str) -> Router {
    let base_path = base_path.trim_end_matches('/');
    if base_path.is_empty() {
        return router;
    }

    let base_path = if base_path.starts_with('/') {
        base_path.to_string()
    } else {
        format!("/{base_path}")
    };
    Router::new().nest(&base_path, router)
}
