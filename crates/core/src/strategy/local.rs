use crate::domain::analysis::{AnalysisResult, TimeframeBreakdown};
use crate::domain::questionnaire::{Question, Timeframe};
use crate::narrative;
use crate::scoring::{aggregate, normalize_answer, score_timeframe, AggregationConfig};
use crate::strategy::{AnalysisRequest, AnalysisStrategy};
use std::collections::HashMap;

/// Fully deterministic scoring pipeline: normalize answers, score each
/// selected timeframe, aggregate, and template the narrative. No I/O.
#[derive(Debug, Default)]
pub struct LocalStrategy {
    config: AggregationConfig,
}

impl LocalStrategy {
    pub fn with_config(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, request: &AnalysisRequest) -> AnalysisResult {
        let breakdown = self.score_breakdown(request);
        let verdict = aggregate(
            &self.config,
            &breakdown,
            &request.selected_timeframes,
            request.market_snapshot.as_ref(),
        );
        narrative::assemble(&request.pair, breakdown, verdict)
    }

    /// Scores every selected timeframe from the request's answers. Answers to
    /// questions on unselected timeframes are ignored; selected timeframes
    /// with no answers score the neutral baseline.
    pub fn score_breakdown(&self, request: &AnalysisRequest) -> TimeframeBreakdown {
        let questions: HashMap<i64, &Question> =
            request.questions.iter().map(|q| (q.id, q)).collect();

        let mut contributions: HashMap<Timeframe, Vec<_>> = request
            .selected_timeframes
            .iter()
            .map(|&tf| (tf, Vec::new()))
            .collect();

        for answer in &request.answers {
            let Some(question) = questions.get(&answer.question_id) else {
                continue;
            };
            let Some(bucket) = contributions.get_mut(&question.timeframe) else {
                continue;
            };
            bucket.push(normalize_answer(answer, question));
        }

        request
            .selected_timeframes
            .iter()
            .map(|&tf| score_timeframe(tf, &contributions[&tf]))
            .collect()
    }
}

#[async_trait::async_trait]
impl AnalysisStrategy for LocalStrategy {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn run(&self, request: &AnalysisRequest) -> anyhow::Result<AnalysisResult> {
        Ok(self.evaluate(request))
    }
}
