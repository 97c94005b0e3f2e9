//! HTTP routes.
//!
//! Handlers are thin: validate the request, call into the analysis crate
//! or the GitHub client, map domain errors to status codes. Validation
//! failures are the caller's problem (400) and are never logged as
//! faults; upstream failures surface as 502.

use std::sync::Arc;
use std::time::SystemTime;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use repolens_analysis::AnalysisError;
use repolens_analysis::analyze::run_pipeline;
use repolens_analysis::feedback::FeedbackCategory;
use repolens_analysis::llm::TextGenerator;
use repolens_analysis::overview::{project_overview, role_summary_report};
use repolens_analysis::roles::{AnalysisRole, build_analysis_prompt};
use repolens_analysis::snapshot::RepoSnapshot;

use crate::github::GitHubError;
use crate::server::AppState;

// ── Router ─────────────────────────────────────────────────────────────

/// Build the axum router: API routes, CORS, optional static assets.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api/v1/health", get(api_health))
        .route("/api/analyze", post(api_analyze))
        .route("/api/analyze-repo", post(api_analyze_repo))
        .route("/api/analyze-codebase", post(api_analyze_codebase))
        .route("/api/role-report", post(api_role_report))
        .route("/api/submit-feedback", post(api_submit_feedback))
        .route("/api/feedback-stats", get(api_feedback_stats))
        .route("/api/clear-feedback", post(api_clear_feedback))
        .layer(cors_layer(&state));

    // Serve the web client if the directory exists.
    if let Some(ref dir) = state.config.static_dir {
        if dir.exists() {
            tracing::info!("Serving static assets from {}", dir.display());
            let index_path = dir.join("index.html");
            let serve = tower_http::services::ServeDir::new(dir)
                .append_index_html_on_directories(true)
                .fallback(tower_http::services::ServeFile::new(index_path));
            app = app.fallback_service(serve);
        } else {
            tracing::warn!("Static dir not found: {}", dir.display());
        }
    }

    app.with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    use axum::http::{Method, header};
    use tower_http::cors::{AllowOrigin, Any};

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    if state.config.cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(
            state.config.cors_origins.iter().filter_map(|o| o.parse().ok()),
        ))
    }
}

// ── Request types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct AnalyzeRequest {
    role: Option<String>,
    input: Option<String>,
}

#[derive(Deserialize)]
struct RepoRequest {
    owner: Option<String>,
    repo: Option<String>,
}

#[derive(Deserialize)]
struct CodebaseRequest {
    path: Option<String>,
}

#[derive(Deserialize)]
struct FeedbackRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    rating: Option<Value>,
    feedback_text: Option<String>,
    #[serde(default)]
    additional_data: Value,
}

// ── Handlers ───────────────────────────────────────────────────────────

/// Server start time (set once on first call).
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

async fn api_health() -> Json<Value> {
    let started = START_TIME.get_or_init(SystemTime::now);
    let uptime = started.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    Json(json!({"status": "ok", "uptime_secs": uptime}))
}

/// Quick role-based analysis of pasted code or a question.
async fn api_analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Response {
    let Some(role) = req.role.as_deref().and_then(AnalysisRole::parse) else {
        return bad_request("Invalid role");
    };
    let input = req.input.unwrap_or_default();
    if input.trim().is_empty() {
        return bad_request("Empty input");
    }

    let prompt = build_analysis_prompt(role, &state.feedback, &input);
    match state.llm.generate(&prompt).await {
        Ok(reply) => Json(json!({"response": markdown_to_html(&reply)})).into_response(),
        Err(e) => upstream_error(&e),
    }
}

/// Browse a GitHub repository: rendered tree plus language percentages.
async fn api_analyze_repo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RepoRequest>,
) -> Response {
    let (Some(owner), Some(repo)) = (non_empty(req.owner), non_empty(req.repo)) else {
        return bad_request("Missing owner or repository name");
    };

    let structure = match state.github.directory_structure(&owner, &repo).await {
        Ok(s) => s,
        Err(e) => return github_error(&e, &owner, &repo),
    };

    let languages = match state.github.languages(&owner, &repo).await {
        Ok(l) => l,
        Err(e) => return github_error(&e, &owner, &repo),
    };
    if languages.is_empty() {
        return error_response(
            StatusCode::NOT_FOUND,
            "No language data available for this repository",
        );
    }
    let total: u64 = languages.values().sum();
    let percentages: serde_json::Map<String, Value> = languages
        .iter()
        .map(|(lang, bytes)| {
            let pct = *bytes as f64 / total as f64 * 100.0;
            (lang.clone(), json!(pct))
        })
        .collect();

    Json(json!({"structure": structure, "languages": percentages})).into_response()
}

/// Full perspective pipeline over a local checkout.
async fn api_analyze_codebase(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodebaseRequest>,
) -> Response {
    let Some(snapshot) = open_snapshot(req.path) else {
        return bad_request("Invalid repository path");
    };

    match run_pipeline(&snapshot, &state.llm).await {
        Ok(report) => Json(report).into_response(),
        Err(AnalysisError::Detection { reason, raw }) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": "Failed to detect perspectives",
                "details": reason,
                "raw_response": raw,
            })),
        )
            .into_response(),
        Err(e) => upstream_error(&e),
    }
}

/// Multi-role summary report over a local checkout.
async fn api_role_report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodebaseRequest>,
) -> Response {
    let Some(snapshot) = open_snapshot(req.path) else {
        return bad_request("Invalid repository path");
    };

    let overview = project_overview(&snapshot, &state.llm).await;
    let report = role_summary_report(&snapshot, overview, &state.llm).await;
    Json(report).into_response()
}

async fn api_submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FeedbackRequest>,
) -> Response {
    let (Some(kind), Some(rating), Some(text)) = (req.kind, req.rating, req.feedback_text)
    else {
        return bad_request(
            "Missing required fields. Please provide type, rating, and feedback_text",
        );
    };

    let Some(category) = FeedbackCategory::parse(&kind) else {
        return bad_request(
            "Invalid feedback type. Must be one of: code_analysis, repo_analysis, diagram",
        );
    };

    let Some(rating) = parse_rating(&rating) else {
        return bad_request("Rating must be a number between 1 and 5");
    };

    match state
        .feedback
        .save(category, rating, &text, req.additional_data)
    {
        Ok(()) => Json(json!({
            "message": "Feedback submitted successfully",
            "status": "success",
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("failed to save feedback: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save feedback")
        }
    }
}

async fn api_feedback_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut stats = serde_json::Map::new();
    for category in FeedbackCategory::ALL {
        let s = state.feedback.category_stats(category);
        stats.insert(
            category.as_str().to_string(),
            serde_json::to_value(s).unwrap_or_else(|_| json!({})),
        );
    }
    Json(Value::Object(stats))
}

async fn api_clear_feedback(State(state): State<Arc<AppState>>) -> Response {
    match state.feedback.clear() {
        Ok(()) => Json(json!({
            "message": "All feedback data cleared",
            "status": "success",
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("failed to clear feedback: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to clear feedback")
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// A snapshot over the request path, when it names an existing directory.
fn open_snapshot(path: Option<String>) -> Option<RepoSnapshot> {
    let path = non_empty(path)?;
    let root = std::path::PathBuf::from(path);
    if !root.is_dir() {
        return None;
    }
    Some(RepoSnapshot::new(root))
}

/// Accept a rating as a JSON number or numeric string, in 1..=5.
fn parse_rating(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u8::try_from(n).ok().filter(|r| (1..=5).contains(r))
}

fn bad_request(msg: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, msg)
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({"error": msg}))).into_response()
}

fn upstream_error(e: &AnalysisError) -> Response {
    (StatusCode::BAD_GATEWAY, Json(json!({"error": e.to_string()}))).into_response()
}

fn github_error(e: &GitHubError, owner: &str, repo: &str) -> Response {
    match e {
        GitHubError::NotFound => error_response(
            StatusCode::NOT_FOUND,
            &format!("Repository not found: {owner}/{repo}"),
        ),
        GitHubError::RateLimited => error_response(
            StatusCode::FORBIDDEN,
            "Rate limit exceeded. Please try again later or use a GitHub token.",
        ),
        other => error_response(
            StatusCode::BAD_GATEWAY,
            &format!("Error connecting to GitHub: {other}"),
        ),
    }
}

/// Render model Markdown to HTML for direct display.
fn markdown_to_html(markdown: &str) -> String {
    use pulldown_cmark::{Options, Parser, html};
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_rating(&json!(4)), Some(4));
        assert_eq!(parse_rating(&json!("4")), Some(4));
        assert_eq!(parse_rating(&json!(0)), None);
        assert_eq!(parse_rating(&json!(6)), None);
        assert_eq!(parse_rating(&json!("four")), None);
        assert_eq!(parse_rating(&json!(4.5)), None);
        assert_eq!(parse_rating(&json!(null)), None);
    }

    #[test]
    fn markdown_renders_to_html() {
        let html = markdown_to_html("# Title\n\n- **bold** item");
        assert!(html.contains("<h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }
}
