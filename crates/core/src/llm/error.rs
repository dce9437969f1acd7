use std::fmt;

/// Failure from the generative service, carrying the raw model output so the
/// fallback path can log what the model actually produced.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LLM error (stage={}): {}", self.stage, self.detail)
    }
}

impl std::error::Error for LlmDiagnosticsError {}
