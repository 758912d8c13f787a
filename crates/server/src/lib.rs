//! MCP server exposing Google Analytics 4 reports as tools.
//!
//! One stdio session per process. Each `tools/call` is validated, mapped onto a single
//! `runReport` request against the configured property, and answered with the report as
//! pretty-printed JSON text.

pub mod config;
pub mod dates;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod tools;

use anyhow::Context as _;
use config::ServerConfig;
use dispatcher::Dispatcher;
use ga4_data_api::{ReportClient, ServiceAccountCredentials, ServiceAccountTokenSource};
use handler::AnalyticsServer;
use rmcp::ServiceExt as _;
use std::sync::Arc;

/// Wire the report client for `config` into an MCP handler.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built, the private key is not a valid RSA PEM,
/// or the property id / API base URL are malformed.
pub fn build_server(config: &ServerConfig) -> anyhow::Result<AnalyticsServer> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("ga4-mcp-server/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build HTTP client")?;

    let tokens = ServiceAccountTokenSource::new(
        http.clone(),
        ServiceAccountCredentials {
            client_email: config.client_email.clone(),
            private_key: config.private_key.clone(),
            token_uri: config.token_uri.clone(),
        },
    )
    .context("load service account credentials")?;

    let client = ReportClient::new(
        http,
        &config.api_base_url,
        &config.property_id,
        Arc::new(tokens),
    )
    .context("configure report client")?;

    tracing::debug!(report_url = %client.report_url(), "report client ready");
    Ok(AnalyticsServer::new(Dispatcher::new(Arc::new(client))))
}

/// Serve MCP over stdin/stdout until the peer disconnects.
///
/// # Errors
///
/// Returns an error if the server cannot be built or the MCP session fails to initialize.
pub async fn serve_stdio(config: ServerConfig) -> anyhow::Result<()> {
    let server = build_server(&config)?;

    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .context("initialize MCP session on stdio")?;
    tracing::info!(
        property_id = %config.property_id,
        "Google Analytics MCP server running on stdio"
    );

    let reason = service.waiting().await.context("MCP session task")?;
    tracing::info!(?reason, "MCP session ended");
    Ok(())
}
