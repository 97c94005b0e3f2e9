//! Gemini generateContent API client.
//!
//! One prompt in, one text reply out. No conversation state, no retries:
//! a failed call surfaces immediately and the caller decides whether to
//! degrade or abort.

use std::time::Duration;

use serde::Deserialize;

use crate::error::AnalysisError;

/// Fixed budget for a single generation call.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// The seam between the pipeline and the generative API.
///
/// Pipeline functions are generic over this so tests can substitute a
/// scripted generator.
pub trait TextGenerator {
    fn generate(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, AnalysisError>> + Send;
}

/// Response shape of the generateContent endpoint. Only the nested text
/// field is of interest; everything else is ignored.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Gemini API client.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiClient {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: Self::DEFAULT_MODEL.to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Override the API origin (tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let body = serde_json::json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}]
                }
            ]
        });

        let resp = self
            .http
            .post(self.endpoint())
            .timeout(GENERATION_TIMEOUT)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::UpstreamTimeout
                } else {
                    AnalysisError::Upstream(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalysisError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                AnalysisError::UpstreamTimeout
            } else {
                AnalysisError::Upstream(e.to_string())
            }
        })?;

        reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(AnalysisError::MissingText)
    }
}
