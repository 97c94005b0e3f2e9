//! Whole-project overview and multi-role summary reports.
//!
//! A two-stage flow: one model call summarizes the repository from its
//! tree and config files, then each summary role gets its own file
//! selection and JSON-format prompt. Per-role failures degrade to error
//! payloads; the report always contains every role it attempted.

use std::collections::HashSet;

use serde_json::{Map, Value, json};

use crate::llm::TextGenerator;
use crate::parse::{ParsedOutput, parse_model_output};
use crate::prompts;
use crate::snapshot::{FileKind, FileRecord, RepoSnapshot};

/// Roles covered by the multi-role summary report, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryRole {
    Frontend,
    Backend,
    Data,
    Product,
}

impl SummaryRole {
    pub const ALL: [SummaryRole; 4] = [
        SummaryRole::Frontend,
        SummaryRole::Backend,
        SummaryRole::Data,
        SummaryRole::Product,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryRole::Frontend => "frontend",
            SummaryRole::Backend => "backend",
            SummaryRole::Data => "data",
            SummaryRole::Product => "product",
        }
    }

    /// Key under `role_summaries` in the report.
    fn summary_key(&self) -> String {
        format!("{}_summary", self.as_str())
    }
}

/// File-selection patterns for one role.
struct RolePatterns {
    dir_types: &'static [&'static str],
    extensions: &'static [&'static str],
    config_files: &'static [&'static str],
}

fn patterns(role: SummaryRole) -> Option<&'static RolePatterns> {
    const FRONTEND: RolePatterns = RolePatterns {
        dir_types: &[
            "frontend", "client", "web", "ui", "src", "app", "components", "pages", "views",
            "public", "static",
        ],
        extensions: &[
            ".js", ".jsx", ".ts", ".tsx", ".vue", ".html", ".css", ".scss", ".sass", ".less",
        ],
        config_files: &[
            "package.json",
            "webpack.config.js",
            "vite.config.js",
            "next.config.js",
            "angular.json",
            "tsconfig.json",
        ],
    };
    const BACKEND: RolePatterns = RolePatterns {
        dir_types: &[
            "backend", "server", "api", "src", "app", "lib", "services", "controllers",
            "routes", "middleware", "utils",
        ],
        extensions: &[
            ".py", ".java", ".go", ".rb", ".php", ".js", ".ts", ".cs", ".rs", ".swift", ".kt",
        ],
        config_files: &[
            "requirements.txt",
            "pom.xml",
            "build.gradle",
            "package.json",
            "composer.json",
            "Gemfile",
            "go.mod",
            "Cargo.toml",
        ],
    };
    const DATA: RolePatterns = RolePatterns {
        dir_types: &[
            "database", "models", "schema", "migrations", "data", "db", "sql", "mongo",
            "redis", "cache",
        ],
        extensions: &[
            ".sql", ".py", ".js", ".ts", ".rb", ".php", ".json", ".yaml", ".yml", ".xml",
            ".csv",
        ],
        config_files: &[
            "schema.prisma",
            "sequelize.config.js",
            "typeorm.config.ts",
            "database.yml",
            "db.config.js",
        ],
    };
    match role {
        SummaryRole::Frontend => Some(&FRONTEND),
        SummaryRole::Backend => Some(&BACKEND),
        SummaryRole::Data => Some(&DATA),
        SummaryRole::Product => None,
    }
}

/// Ask the model for a structural overview of the repository.
///
/// Degrades to an error payload (never an `Err`) so the multi-role report
/// can proceed with whatever context it has.
pub async fn project_overview<G: TextGenerator>(
    snapshot: &RepoSnapshot,
    generator: &G,
) -> Value {
    let tree = snapshot.full_tree();
    let config_files = snapshot.config_files();
    let mut config_map = Map::new();
    for f in &config_files {
        config_map.insert(
            f.path.clone(),
            json!({"content": f.content, "description": config_description(&f.path)}),
        );
    }
    let config_json = serde_json::to_string_pretty(&Value::Object(config_map))
        .unwrap_or_else(|_| "{}".to_string());

    let prompt = prompts::overview_prompt(&tree, &config_json);
    match generator.generate(&prompt).await {
        Ok(reply) => match parse_model_output(&reply) {
            ParsedOutput::Json(value) => value,
            ParsedOutput::Markdown(raw) | ParsedOutput::Failed { raw, .. } => json!({
                "error": "Failed to parse overview response as JSON",
                "raw_response": raw,
            }),
        },
        Err(e) => {
            tracing::warn!("project overview failed: {e}");
            json!({
                "error": "Failed to analyze codebase",
                "details": e.to_string(),
            })
        }
    }
}

fn config_description(path: &str) -> &'static str {
    crate::snapshot::CONFIG_FILES
        .iter()
        .find(|(name, _)| *name == path)
        .map(|(_, description)| *description)
        .unwrap_or("Configuration file")
}

/// Select the files relevant to a role: its config files at the root,
/// then files with matching extensions under directories the overview
/// classified as this role's territory (falling back to conventional
/// directory names, then the whole repository).
pub fn select_role_files(
    snapshot: &RepoSnapshot,
    overview: &Value,
    role: SummaryRole,
) -> Vec<FileRecord> {
    let Some(patterns) = patterns(role) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for name in patterns.config_files {
        if let Some(content) = snapshot.read_capped(name)
            && seen.insert((*name).to_string())
        {
            records.push(FileRecord {
                path: (*name).to_string(),
                content,
                kind: FileKind::Config,
            });
        }
    }

    let mut dirs: Vec<String> = overview
        .get("key_directories")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter(|d| {
                    d.get("type")
                        .and_then(Value::as_str)
                        .is_some_and(|t| patterns.dir_types.contains(&t))
                })
                .filter_map(|d| d.get("path").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if dirs.is_empty() {
        dirs = patterns
            .dir_types
            .iter()
            .filter(|d| snapshot.root().join(d).is_dir())
            .map(|d| (*d).to_string())
            .collect();
    }
    if dirs.is_empty() {
        dirs.push(String::new()); // whole repository
    }

    for dir in &dirs {
        snapshot.collect_with_extensions(dir, patterns.extensions, &mut seen, &mut records);
    }

    records
}

/// Generate the multi-role summary report.
///
/// Roles are processed sequentially in a fixed order; each role's failure
/// degrades to an error payload under its own key.
pub async fn role_summary_report<G: TextGenerator>(
    snapshot: &RepoSnapshot,
    overview: Value,
    generator: &G,
) -> Value {
    let overview_json =
        serde_json::to_string_pretty(&overview).unwrap_or_else(|_| "{}".to_string());

    let mut summaries = Map::new();
    for role in SummaryRole::ALL {
        let files = select_role_files(snapshot, &overview, role);
        let files_json = render_file_summary(&files);
        let prompt = prompts::role_summary_prompt(role, &overview_json, &files_json);

        let summary = match generator.generate(&prompt).await {
            Ok(reply) => match parse_model_output(&reply) {
                ParsedOutput::Json(value) => value,
                ParsedOutput::Markdown(raw) | ParsedOutput::Failed { raw, .. } => json!({
                    "error": "Failed to parse summary response as JSON",
                    "raw_response": raw,
                }),
            },
            Err(e) => {
                tracing::warn!(role = role.as_str(), "role summary failed: {e}");
                json!({
                    "error": format!("Failed to generate {} summary", role.as_str()),
                    "details": e.to_string(),
                })
            }
        };
        summaries.insert(role.summary_key(), summary);
    }

    json!({
        "project_overview": overview,
        "role_summaries": Value::Object(summaries),
    })
}

/// Serialize selected files as the config/code map the role prompts embed.
fn render_file_summary(files: &[FileRecord]) -> String {
    let mut config = Map::new();
    let mut code = Map::new();
    for f in files {
        let target = match f.kind {
            FileKind::Config => &mut config,
            FileKind::Code => &mut code,
        };
        target.insert(f.path.clone(), Value::String(f.content.clone()));
    }
    serde_json::to_string_pretty(&json!({
        "config_files": Value::Object(config),
        "code_files": Value::Object(code),
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, RepoSnapshot) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("client/components")).unwrap();
        fs::create_dir_all(dir.path().join("server")).unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(dir.path().join("client/components/app.jsx"), "jsx").unwrap();
        fs::write(dir.path().join("client/components/logo.png"), "png").unwrap();
        fs::write(dir.path().join("server/main.py"), "py").unwrap();
        let snapshot = RepoSnapshot::new(dir.path());
        (dir, snapshot)
    }

    #[test]
    fn overview_directories_win_over_conventions() {
        let (_dir, snapshot) = fixture();
        let overview = json!({
            "key_directories": [
                {"path": "client", "type": "frontend", "description": "UI"},
                {"path": "server", "type": "backend", "description": "API"}
            ]
        });
        let files = select_role_files(&snapshot, &overview, SummaryRole::Frontend);
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert!(paths.contains(&"package.json"));
        assert!(paths.contains(&"client/components/app.jsx"));
        assert!(!paths.iter().any(|p| p.starts_with("server")));
    }

    #[test]
    fn extension_filter_excludes_binary_assets() {
        let (_dir, snapshot) = fixture();
        let overview = json!({"key_directories": [{"path": "client", "type": "frontend"}]});
        let files = select_role_files(&snapshot, &overview, SummaryRole::Frontend);
        assert!(!files.iter().any(|f| f.path.ends_with(".png")));
    }

    #[test]
    fn product_role_selects_no_files() {
        let (_dir, snapshot) = fixture();
        assert!(select_role_files(&snapshot, &json!({}), SummaryRole::Product).is_empty());
    }

    #[test]
    fn conventional_directories_are_the_fallback() {
        let (_dir, snapshot) = fixture();
        // No usable key_directories in the overview; "client" is a
        // conventional frontend directory name and exists on disk.
        let files = select_role_files(&snapshot, &json!({}), SummaryRole::Frontend);
        assert!(files.iter().any(|f| f.path == "client/components/app.jsx"));
    }
}
