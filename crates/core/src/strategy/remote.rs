use crate::domain::analysis::AnalysisResult;
use crate::llm::{AnalysisPrompt, LlmClient};
use crate::strategy::local::LocalStrategy;
use crate::strategy::{AnalysisRequest, AnalysisStrategy};
use serde_json::json;

/// Delegates the verdict to the generative service. Any failure along the
/// way (transport, rate limit, malformed or schema-breaking output) falls
/// back to the local strategy with the same request, as an explicit call;
/// the caller never sees the remote error.
pub struct RemoteStrategy {
    llm: Box<dyn LlmClient>,
    fallback: LocalStrategy,
}

impl RemoteStrategy {
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self {
            llm,
            fallback: LocalStrategy::default(),
        }
    }

    fn build_prompt(&self, request: &AnalysisRequest) -> AnalysisPrompt {
        let questions: std::collections::HashMap<i64, _> =
            request.questions.iter().map(|q| (q.id, q)).collect();

        let answered: Vec<_> = request
            .answers
            .iter()
            .filter_map(|answer| {
                let question = questions.get(&answer.question_id)?;
                Some(json!({
                    "timeframe": question.timeframe.code(),
                    "question": &question.text,
                    "answer": &answer.value,
                }))
            })
            .collect();

        // The locally scored breakdown rides along so the model grounds its
        // verdict in the same per-timeframe numbers the fallback would use.
        let local_scores = self.fallback.score_breakdown(request);

        AnalysisPrompt {
            pair: request.pair.clone(),
            selected_timeframes: request.selected_timeframes.clone(),
            questionnaire_json: json!({
                "answers": answered,
                "local_timeframe_scores": local_scores,
            }),
            market_json: request
                .market_snapshot
                .as_ref()
                .and_then(|snapshot| serde_json::to_value(snapshot).ok()),
        }
    }
}

#[async_trait::async_trait]
impl AnalysisStrategy for RemoteStrategy {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn run(&self, request: &AnalysisRequest) -> anyhow::Result<AnalysisResult> {
        let prompt = self.build_prompt(request);
        match self.llm.generate_analysis(&prompt).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(
                    pair = %request.pair,
                    model = self.llm.model_name(),
                    error = %err,
                    "generative service failed; falling back to local scoring"
                );
                Ok(self.fallback.evaluate(request))
            }
        }
    }
}
