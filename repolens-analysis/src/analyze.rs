//! Per-perspective analysis and report consolidation.
//!
//! The analyzer never fails the overall pipeline: a model call or parse
//! failure for one perspective degrades to an error payload for that
//! perspective and the remaining perspectives proceed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::detect::{DetectionResult, Perspective};
use crate::error::AnalysisError;
use crate::llm::TextGenerator;
use crate::parse::{ParsedOutput, parse_model_output};
use crate::prompts;
use crate::snapshot::RepoSnapshot;

/// Terminal output of one analysis request. The perspectives map is keyed
/// by name; consumers must not rely on insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub project_summary: String,
    pub detected_tech_stack: Vec<String>,
    pub perspectives: BTreeMap<String, Value>,
}

/// Analyze one perspective: gather its files, pick the template family for
/// its name, call the generator, parse the reply.
///
/// Always returns a payload — structured JSON on success, the raw reply
/// under `raw_markdown` when structured extraction fails, an error payload
/// when the model call itself fails.
pub async fn analyze_perspective<G: TextGenerator>(
    snapshot: &RepoSnapshot,
    generator: &G,
    project_summary: &str,
    perspective: &Perspective,
) -> Value {
    let files = snapshot.gather(&perspective.entry_point_files, &perspective.key_directories);
    let kind = prompts::classify(&perspective.name);
    let prompt = prompts::perspective_prompt(kind, project_summary, perspective, &files);

    match generator.generate(&prompt).await {
        Ok(reply) => match parse_model_output(&reply) {
            ParsedOutput::Json(value) => value,
            ParsedOutput::Markdown(raw) | ParsedOutput::Failed { raw, .. } => {
                json!({"raw_markdown": raw})
            }
        },
        Err(e) => {
            tracing::warn!(perspective = %perspective.name, "perspective analysis failed: {e}");
            json!({
                "error": "Failed to analyze perspective",
                "details": e.to_string(),
            })
        }
    }
}

/// Merge the detection result and per-perspective reports into the final
/// report. Pure: no network or filesystem access, deterministic,
/// idempotent.
pub fn consolidate(
    detection: &DetectionResult,
    reports: impl IntoIterator<Item = (String, Value)>,
) -> ConsolidatedReport {
    ConsolidatedReport {
        project_summary: detection.project_summary.clone(),
        detected_tech_stack: detection.detected_tech_stack.clone(),
        perspectives: reports.into_iter().collect(),
    }
}

/// Run the full pipeline: detect, analyze each perspective sequentially in
/// detection order, consolidate.
///
/// Only detection failures abort; every detected perspective ends up with
/// exactly one report entry even when its analysis fails.
pub async fn run_pipeline<G: TextGenerator>(
    snapshot: &RepoSnapshot,
    generator: &G,
) -> Result<ConsolidatedReport, AnalysisError> {
    let detection = crate::detect::detect_perspectives(snapshot, generator).await?;
    let mut reports = Vec::with_capacity(detection.identified_perspectives.len());
    for perspective in &detection.identified_perspectives {
        let report =
            analyze_perspective(snapshot, generator, &detection.project_summary, perspective)
                .await;
        reports.push((perspective.name.clone(), report));
    }
    Ok(consolidate(&detection, reports))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection() -> DetectionResult {
        DetectionResult {
            project_summary: "A demo app".to_string(),
            detected_tech_stack: vec!["React".to_string(), "Flask".to_string()],
            identified_perspectives: vec![],
        }
    }

    #[test]
    fn consolidate_copies_summary_and_stack() {
        let report = consolidate(&detection(), vec![]);
        assert_eq!(report.project_summary, "A demo app");
        assert_eq!(report.detected_tech_stack, vec!["React", "Flask"]);
        assert!(report.perspectives.is_empty());
    }

    #[test]
    fn consolidate_is_order_independent() {
        let a = ("Frontend UI Layer".to_string(), json!({"ok": 1}));
        let b = ("Backend API Layer".to_string(), json!({"ok": 2}));
        let forward = consolidate(&detection(), vec![a.clone(), b.clone()]);
        let backward = consolidate(&detection(), vec![b, a]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn consolidate_is_idempotent_on_identical_input() {
        let reports = vec![("Core".to_string(), json!({"x": true}))];
        let once = consolidate(&detection(), reports.clone());
        let twice = consolidate(&detection(), reports);
        assert_eq!(once, twice);
    }
}
