use clap::{Parser, ValueEnum};
use ga4_mcp_server::config::ServerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ga4-mcp-server",
    version,
    about = "Google Analytics 4 MCP server over stdio"
)]
struct Cli {
    /// Log filter directive (`info`, `ga4_data_api=debug`, ...). Logs go to stderr.
    #[arg(long, env = "GA4_MCP_LOG", default_value = "info")]
    log_level: String,

    #[arg(long, env = "GA4_MCP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Analytics Data API base URL
    #[arg(long, env = "GA_API_BASE_URL")]
    api_base_url: Option<String>,

    /// OAuth2 token endpoint used for the service-account grant
    #[arg(long, env = "GOOGLE_TOKEN_URI")]
    token_uri: Option<String>,
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries the MCP transport.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "uncaught panic");
        std::process::exit(1);
    }));

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    if let Some(url) = cli.api_base_url.filter(|v| !v.is_empty()) {
        config.api_base_url = url;
    }
    if let Some(uri) = cli.token_uri.filter(|v| !v.is_empty()) {
        config.token_uri = uri;
    }

    if let Err(e) = ga4_mcp_server::serve_stdio(config).await {
        tracing::error!("Failed to start server: {e:#}");
        std::process::exit(1);
    }
}
