pub mod anthropic;
pub mod error;
pub mod json;

use crate::domain::analysis::AnalysisResult;
use crate::domain::questionnaire::Timeframe;

/// Everything the generative service needs to produce a verdict: the pair,
/// the selected timeframes, a pre-scored questionnaire summary, and the
/// optional market snapshot, already serialized for the prompt.
#[derive(Debug, Clone)]
pub struct AnalysisPrompt {
    pub pair: String,
    pub selected_timeframes: Vec<Timeframe>,
    pub questionnaire_json: serde_json::Value,
    pub market_json: Option<serde_json::Value>,
}

impl AnalysisPrompt {
    pub fn selected_codes(&self) -> Vec<&'static str> {
        self.selected_timeframes.iter().map(|tf| tf.code()).collect()
    }
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate_analysis(&self, prompt: &AnalysisPrompt)
        -> anyhow::Result<AnalysisResult>;
}
