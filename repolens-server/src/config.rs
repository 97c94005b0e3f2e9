//! Server configuration, parsed from flags and environment.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "repolens-server",
    about = "Web backend for AI-assisted code and repository analysis"
)]
pub struct ServerConfig {
    /// Address for the HTTP listener.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub listen_addr: String,

    /// Gemini API key (or set GEMINI_API_KEY).
    #[arg(long, env = "GEMINI_API_KEY")]
    pub gemini_api_key: String,

    /// Model used for all generation calls.
    #[arg(long, default_value = "gemini-2.0-flash")]
    pub gemini_model: String,

    /// GitHub token for higher rate limits (or set GITHUB_TOKEN).
    #[arg(long, env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Path of the persisted feedback log.
    #[arg(long, default_value = "feedback_data.json")]
    pub feedback_path: PathBuf,

    /// Directory of static web assets, served with an index.html fallback.
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Allowed CORS origin (repeatable). Any origin when none given.
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,
}
