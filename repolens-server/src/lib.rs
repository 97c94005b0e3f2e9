//! repolens-server: web backend for AI-assisted code and repository
//! analysis.
//!
//! Thin axum route handlers over the `repolens-analysis` pipeline plus a
//! GitHub content API client for repository browsing. All state lives in
//! one `AppState` built at startup and shared via `Arc`.

pub mod config;
pub mod github;
pub mod server;
pub mod web;
