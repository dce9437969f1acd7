pub mod local;
pub mod remote;

use crate::config::Settings;
use crate::domain::analysis::AnalysisResult;
use crate::domain::questionnaire::{Answer, Question, Timeframe};
use crate::error::InvalidInputError;
use crate::llm::anthropic::AnthropicClient;
use crate::market::provider::{HttpJsonMarketProvider, MarketDataClient};
use crate::market::MarketSnapshot;
use local::LocalStrategy;
use remote::RemoteStrategy;
use std::collections::HashSet;

/// Full input snapshot for one analysis run. The engine is a pure function
/// of this value; nothing is read from anywhere else during scoring.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub pair: String,
    pub selected_timeframes: Vec<Timeframe>,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub market_snapshot: Option<MarketSnapshot>,
}

impl AnalysisRequest {
    /// The only rejection point in the engine. Answers may be empty: a
    /// questionnaire with no answers is a valid all-neutral request.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        if self.pair.trim().is_empty() {
            return Err(InvalidInputError::new("pair", "currency pair must be non-empty"));
        }
        if self.selected_timeframes.is_empty() {
            return Err(InvalidInputError::new(
                "selected_timeframes",
                "at least one timeframe must be selected",
            ));
        }
        let mut seen = HashSet::new();
        for &tf in &self.selected_timeframes {
            if !seen.insert(tf) {
                return Err(InvalidInputError::new(
                    "selected_timeframes",
                    format!("timeframe {tf} selected more than once"),
                ));
            }
        }
        if self.questions.is_empty() {
            return Err(InvalidInputError::new("questions", "question list must be non-empty"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait AnalysisStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, request: &AnalysisRequest) -> anyhow::Result<AnalysisResult>;
}

/// Front door of the engine: validates the request, optionally fills in a
/// market snapshot, and runs the remote strategy when a credential is
/// configured, the local one otherwise. Past validation, no failure escapes;
/// the worst case for a caller is the local deterministic path.
pub struct Analyzer {
    local: LocalStrategy,
    remote: Option<RemoteStrategy>,
    market: Option<Box<dyn MarketDataClient>>,
}

impl Analyzer {
    pub fn from_settings(settings: &Settings) -> Self {
        let remote = AnthropicClient::from_settings(settings)
            .ok()
            .map(|client| RemoteStrategy::new(Box::new(client)));
        let market = HttpJsonMarketProvider::from_settings(settings)
            .ok()
            .map(|provider| Box::new(provider) as Box<dyn MarketDataClient>);
        Self {
            local: LocalStrategy::default(),
            remote,
            market,
        }
    }

    pub fn local_only() -> Self {
        Self {
            local: LocalStrategy::default(),
            remote: None,
            market: None,
        }
    }

    pub async fn analyze(
        &self,
        mut request: AnalysisRequest,
    ) -> Result<AnalysisResult, InvalidInputError> {
        request.validate()?;

        if request.market_snapshot.is_none() {
            if let Some(market) = &self.market {
                request.market_snapshot = Some(market.fetch_snapshot(&request.pair).await);
            }
        }

        let result = match &self.remote {
            Some(remote) => match remote.run(&request).await {
                Ok(result) => result,
                Err(err) => {
                    tracing::warn!(pair = %request.pair, error = %err, "remote strategy failed; using local scoring");
                    self.local.evaluate(&request)
                }
            },
            None => self.local.evaluate(&request),
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::questionnaire::{AnswerKind, AnswerValue};

    fn question(id: i64, timeframe: Timeframe) -> Question {
        Question {
            id,
            timeframe,
            text: format!("Question {id}"),
            kind: AnswerKind::Choice,
            options: vec!["Bullish".into(), "Bearish".into(), "Sideways".into()],
            sort_order: 0,
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            pair: "EURUSD".to_string(),
            selected_timeframes: vec![Timeframe::Daily],
            questions: vec![question(1, Timeframe::Daily)],
            answers: vec![Answer {
                question_id: 1,
                analysis_id: 9,
                value: AnswerValue::Choice("Bullish".into()),
            }],
            market_snapshot: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn empty_pair_is_rejected() {
        let mut req = request();
        req.pair = "  ".to_string();
        let err = req.validate().unwrap_err();
        assert_eq!(err.field, "pair");
    }

    #[test]
    fn empty_selection_is_rejected() {
        let mut req = request();
        req.selected_timeframes.clear();
        assert_eq!(req.validate().unwrap_err().field, "selected_timeframes");
    }

    #[test]
    fn duplicate_selection_is_rejected() {
        let mut req = request();
        req.selected_timeframes = vec![Timeframe::Daily, Timeframe::Daily];
        assert_eq!(req.validate().unwrap_err().field, "selected_timeframes");
    }

    #[test]
    fn missing_questions_are_rejected() {
        let mut req = request();
        req.questions.clear();
        assert_eq!(req.validate().unwrap_err().field, "questions");
    }

    #[test]
    fn empty_answers_are_allowed() {
        let mut req = request();
        req.answers.clear();
        assert!(req.validate().is_ok());
    }

    #[tokio::test]
    async fn analyzer_without_remote_runs_local_path() {
        let analyzer = Analyzer::local_only();
        let result = analyzer.analyze(request()).await.unwrap();
        assert_eq!(result.overall_probability, 65.0);
        assert_eq!(result.timeframe_breakdown.timeframes(), vec![Timeframe::Daily]);
    }

    #[tokio::test]
    async fn analyzer_propagates_only_invalid_input() {
        let analyzer = Analyzer::local_only();
        let mut req = request();
        req.pair = String::new();
        assert!(analyzer.analyze(req).await.is_err());
    }
}
