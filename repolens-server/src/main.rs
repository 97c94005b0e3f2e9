use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Use JSON logs in production (REPOLENS_LOG_JSON=1), human-readable otherwise
    let json_logs = std::env::var("REPOLENS_LOG_JSON").unwrap_or_default() == "1";
    let filter = EnvFilter::from_default_env()
        .add_directive("repolens_server=info".parse()?)
        .add_directive("repolens_analysis=info".parse()?);
    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = repolens_server::config::ServerConfig::parse();
    tracing::info!("Starting repolens server on {}", config.listen_addr);
    tracing::info!("Generation model: {}", config.gemini_model);
    if config.github_token.is_some() {
        tracing::info!("GitHub token configured");
    }

    let server = repolens_server::server::Server::new(config);
    server.run().await
}
