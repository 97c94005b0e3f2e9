//! Shared state and server lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use repolens_analysis::GeminiClient;
use repolens_analysis::feedback::FeedbackStore;

use crate::config::ServerConfig;
use crate::github::GitHubClient;

/// Everything the route handlers need, built once at startup.
///
/// The feedback store is the only mutable piece; it serializes its own
/// writers internally.
pub struct AppState {
    pub config: ServerConfig,
    pub llm: GeminiClient,
    pub github: GitHubClient,
    pub feedback: FeedbackStore,
}

impl AppState {
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let llm =
            GeminiClient::new(config.gemini_api_key.clone()).with_model(&config.gemini_model);
        let github = GitHubClient::new(config.github_token.clone());
        let feedback = FeedbackStore::open(&config.feedback_path).with_context(|| {
            format!(
                "failed to load feedback log from {}",
                config.feedback_path.display()
            )
        })?;
        Ok(Self {
            config,
            llm,
            github,
            feedback,
        })
    }
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Bind the listener and spawn the serve task. Returns the bound
    /// address so tests can use an ephemeral port.
    pub async fn start(self) -> Result<(SocketAddr, tokio::task::JoinHandle<Result<()>>)> {
        let listen_addr = self.config.listen_addr.clone();
        let state = Arc::new(AppState::from_config(self.config)?);
        let app = crate::web::router(state);

        let listener = tokio::net::TcpListener::bind(&listen_addr)
            .await
            .with_context(|| format!("failed to bind {listen_addr}"))?;
        let local_addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.map_err(Into::into)
        });
        Ok((local_addr, handle))
    }

    /// Run until the serve task exits.
    pub async fn run(self) -> Result<()> {
        let (addr, handle) = self.start().await?;
        tracing::info!("HTTP server listening on {addr}");
        handle.await?
    }
}
