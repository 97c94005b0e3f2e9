//! Perspective detection: one model call that maps a repository to its
//! functional layers.
//!
//! Detection is the only step in the pipeline where a parse failure is
//! fatal — everything downstream keys off the detected perspective list.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::llm::TextGenerator;
use crate::parse::{ParsedOutput, parse_model_output};
use crate::prompts;
use crate::snapshot::RepoSnapshot;

/// One detected functional layer. Immutable once created; `name` is the
/// lookup key when reports are assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perspective {
    #[serde(rename = "perspective_name")]
    pub name: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub key_directories: Vec<String>,
    #[serde(rename = "entry_points_or_main_files", default)]
    pub entry_point_files: Vec<String>,
}

/// Full detection result as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub project_summary: String,
    #[serde(default)]
    pub detected_tech_stack: Vec<String>,
    pub identified_perspectives: Vec<Perspective>,
}

/// Detect the perspectives of a repository snapshot.
///
/// Gathers README, known config files, and the top-level directory tree
/// (each optional — missing inputs are omitted from the prompt), asks the
/// model for the detection JSON, and validates the shape.
pub async fn detect_perspectives<G: TextGenerator>(
    snapshot: &RepoSnapshot,
    generator: &G,
) -> Result<DetectionResult, AnalysisError> {
    let readme = snapshot.readme();
    // README goes into its own prompt section, not the config block.
    let config_files: Vec<_> = snapshot
        .config_files()
        .into_iter()
        .filter(|f| f.path != "README.md")
        .collect();
    let tree = snapshot.top_level_tree();

    let prompt = prompts::detection_prompt(readme.as_deref(), &config_files, &tree);
    let reply = generator.generate(&prompt).await?;

    match parse_model_output(&reply) {
        ParsedOutput::Json(value) => {
            serde_json::from_value::<DetectionResult>(value).map_err(|e| {
                AnalysisError::Detection {
                    reason: e.to_string(),
                    raw: reply,
                }
            })
        }
        ParsedOutput::Markdown(raw) => Err(AnalysisError::Detection {
            reason: "response is not JSON".to_string(),
            raw,
        }),
        ParsedOutput::Failed { reason, raw } => Err(AnalysisError::Detection { reason, raw }),
    }
}
