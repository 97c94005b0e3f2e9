//! Error taxonomy for the analysis pipeline.
//!
//! Upstream failures are never retried; callers decide whether to degrade
//! (per-perspective error payloads) or abort (perspective detection).

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The generation call exceeded its fixed time budget.
    #[error("generation request timed out")]
    UpstreamTimeout,

    /// The generation API returned a non-success status.
    #[error("generation API returned {status}: {body}")]
    UpstreamHttp { status: u16, body: String },

    /// Transport-level failure reaching the generation API.
    #[error("generation API unreachable: {0}")]
    Upstream(String),

    /// The response payload omitted the expected nested text field.
    #[error("generation response missing text content")]
    MissingText,

    /// The perspective-detection response could not be coerced into the
    /// expected JSON schema. Carries the raw response for diagnostics.
    #[error("could not parse perspective detection response: {reason}")]
    Detection { reason: String, raw: String },
}
