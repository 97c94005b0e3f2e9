//! Role instruction sets for the quick code-analysis endpoint.

use crate::feedback::FeedbackStore;

/// Reviewer persona for a quick analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisRole {
    Frontend,
    Backend,
    NonTechnical,
}

const FRONTEND_INSTRUCTIONS: &str = "You are an expert Frontend Developer. \
Analyze the following code or question, suggest improvements, and point out any issues in frontend development. \
Focus only on frontend concerns like UI, UX, performance, rendering, and frameworks like React, HTML, CSS, etc.";

const BACKEND_INSTRUCTIONS: &str = "You are an expert Backend Developer. \
Analyze the following code or question, suggest improvements, and point out any issues in backend logic, database queries, APIs, scalability, etc.";

const NON_TECHNICAL_INSTRUCTIONS: &str = "You are a friendly assistant who explains technical concepts in simple, easy-to-understand language. \
Avoid technical jargon and explain ideas as if speaking to someone without a tech background.";

impl AnalysisRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "frontend" => Some(AnalysisRole::Frontend),
            "backend" => Some(AnalysisRole::Backend),
            "non-technical" => Some(AnalysisRole::NonTechnical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisRole::Frontend => "frontend",
            AnalysisRole::Backend => "backend",
            AnalysisRole::NonTechnical => "non-technical",
        }
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            AnalysisRole::Frontend => FRONTEND_INSTRUCTIONS,
            AnalysisRole::Backend => BACKEND_INSTRUCTIONS,
            AnalysisRole::NonTechnical => NON_TECHNICAL_INSTRUCTIONS,
        }
    }
}

/// Assemble the full prompt for a quick analysis request: role
/// instructions (augmented with learned feedback themes), a Markdown
/// formatting request, then the user input.
pub fn build_analysis_prompt(role: AnalysisRole, store: &FeedbackStore, input: &str) -> String {
    let instructions = store.augment(role.instructions(), role.as_str());
    format!(
        "{instructions}\n\nPlease format your response using Markdown. \
Use **bold**, # headings, bullet points, and emojis where appropriate.\n\n{input}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_parsing_round_trips() {
        for role in [
            AnalysisRole::Frontend,
            AnalysisRole::Backend,
            AnalysisRole::NonTechnical,
        ] {
            assert_eq!(AnalysisRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(AnalysisRole::parse("devops"), None);
    }

    #[test]
    fn prompt_ends_with_the_user_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("fb.json")).unwrap();
        let prompt = build_analysis_prompt(AnalysisRole::Backend, &store, "review this fn");
        assert!(prompt.starts_with("You are an expert Backend Developer."));
        assert!(prompt.ends_with("review this fn"));
    }

    #[test]
    fn learned_themes_land_between_instructions_and_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = FeedbackStore::open(dir.path().join("fb.json")).unwrap();
        store
            .save(
                crate::feedback::FeedbackCategory::CodeAnalysis,
                2,
                "too verbose",
                json!({"role": "backend"}),
            )
            .unwrap();
        let prompt = build_analysis_prompt(AnalysisRole::Backend, &store, "review this fn");
        let theme = prompt.find("too verbose").unwrap();
        let input = prompt.find("review this fn").unwrap();
        assert!(theme < input);
    }
}
