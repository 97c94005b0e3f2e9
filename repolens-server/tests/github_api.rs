//! GitHub client tests against a local stub of the content API.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use base64::Engine;
use serde_json::json;

use repolens_server::github::{GitHubClient, GitHubError};

async fn languages(Path((_, repo)): Path<(String, String)>) -> Response {
    match repo.as_str() {
        "missing" => StatusCode::NOT_FOUND.into_response(),
        "limited" => StatusCode::FORBIDDEN.into_response(),
        "empty" => Json(json!({})).into_response(),
        _ => Json(json!({"Rust": 3000, "Python": 1000})).into_response(),
    }
}

async fn root_contents(Path((_, repo)): Path<(String, String)>) -> Response {
    if repo == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!([
        {"name": "src", "path": "src", "type": "dir"},
        {"name": "README.md", "path": "README.md", "type": "file"}
    ]))
    .into_response()
}

async fn sub_contents(Path((_, _, path)): Path<(String, String, String)>) -> Response {
    match path.as_str() {
        "src" => Json(json!([
            {"name": "main.rs", "path": "src/main.rs", "type": "file"}
        ]))
        .into_response(),
        "README.md" => {
            // GitHub wraps base64 payloads across lines.
            let encoded = base64::engine::general_purpose::STANDARD.encode("# Hello repolens\n");
            let (head, tail) = encoded.split_at(8);
            Json(json!({
                "content": format!("{head}\n{tail}"),
                "encoding": "base64"
            }))
            .into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn start_stub() -> SocketAddr {
    let app = Router::new()
        .route("/repos/{owner}/{repo}/languages", get(languages))
        .route("/repos/{owner}/{repo}/contents/", get(root_contents))
        .route("/repos/{owner}/{repo}/contents/{*path}", get(sub_contents));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn client() -> GitHubClient {
    let addr = start_stub().await;
    GitHubClient::new(None).with_base_url(&format!("http://{addr}"))
}

#[tokio::test]
async fn lists_repository_contents() {
    let gh = client().await;
    let entries = gh.list_contents("acme", "demo", "").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].is_dir());
    assert_eq!(entries[1].name, "README.md");
}

#[tokio::test]
async fn languages_decode_into_byte_counts() {
    let gh = client().await;
    let langs = gh.languages("acme", "demo").await.unwrap();
    assert_eq!(langs["Rust"], 3000);
    assert_eq!(langs["Python"], 1000);
}

#[tokio::test]
async fn file_content_is_base64_decoded_across_line_breaks() {
    let gh = client().await;
    let content = gh.file_content("acme", "demo", "README.md").await.unwrap();
    assert_eq!(content, "# Hello repolens\n");
}

#[tokio::test]
async fn directory_structure_renders_nested_entries() {
    let gh = client().await;
    let structure = gh.directory_structure("acme", "demo").await.unwrap();
    let lines: Vec<&str> = structure.lines().collect();
    assert_eq!(lines[0], "📁 src/");
    assert_eq!(lines[1], "  📄 main.rs");
    assert_eq!(lines[2], "📄 README.md");
}

#[tokio::test]
async fn missing_repository_maps_to_not_found() {
    let gh = client().await;
    assert!(matches!(
        gh.languages("acme", "missing").await,
        Err(GitHubError::NotFound)
    ));
    assert!(matches!(
        gh.directory_structure("acme", "missing").await,
        Err(GitHubError::NotFound)
    ));
}

#[tokio::test]
async fn rate_limiting_is_distinguished_from_not_found() {
    let gh = client().await;
    assert!(matches!(
        gh.languages("acme", "limited").await,
        Err(GitHubError::RateLimited)
    ));
}

#[tokio::test]
async fn empty_language_map_is_not_an_error() {
    let gh = client().await;
    let langs = gh.languages("acme", "empty").await.unwrap();
    assert!(langs.is_empty());
}
