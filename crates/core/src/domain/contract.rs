use crate::domain::analysis::{
    clamp_score, AnalysisResult, Recommendation, RiskLevel, Sentiment, TimeframeBreakdown,
    TimeframeResult,
};
use crate::domain::questionnaire::Timeframe;
use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Loose verdict shape as returned by the generative service, before any
/// validation. Field names match the schema spelled out in the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAnalysisResult {
    pub overall_probability: f64,
    pub recommendation: String,
    pub confidence_level: f64,
    pub risk_level: String,
    #[serde(default)]
    pub entry_strategy: String,
    #[serde(default)]
    pub exit_strategy: String,
    #[serde(default)]
    pub position_sizing: String,
    #[serde(default)]
    pub market_sentiment_summary: String,
    #[serde(default)]
    pub technical_summary: String,
    pub timeframe_breakdown: BTreeMap<String, LlmTimeframeResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmTimeframeResult {
    pub probability: f64,
    pub sentiment: String,
    pub strength: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl LlmAnalysisResult {
    /// Validates the model output against the verdict contract and converts
    /// it into a domain result. The breakdown must cover exactly the selected
    /// timeframes; the returned breakdown follows selection order.
    pub fn validate_and_into_result(
        self,
        pair: &str,
        selected: &[Timeframe],
    ) -> anyhow::Result<AnalysisResult> {
        let recommendation: Recommendation = self
            .recommendation
            .parse()
            .context("LLM output recommendation label")?;
        let risk_level: RiskLevel = self.risk_level.parse().context("LLM output risk label")?;

        ensure!(
            self.timeframe_breakdown.len() == selected.len(),
            "LLM breakdown has {} timeframes, expected {}",
            self.timeframe_breakdown.len(),
            selected.len()
        );

        let mut parsed = BTreeMap::<Timeframe, LlmTimeframeResult>::new();
        for (code, result) in self.timeframe_breakdown {
            let timeframe: Timeframe = code
                .parse()
                .with_context(|| format!("LLM breakdown key {code:?}"))?;
            if parsed.insert(timeframe, result).is_some() {
                bail!("duplicate timeframe {timeframe} in LLM breakdown");
            }
        }

        let mut breakdown = TimeframeBreakdown::new();
        for &timeframe in selected {
            let Some(result) = parsed.remove(&timeframe) else {
                bail!("LLM breakdown is missing selected timeframe {timeframe}");
            };
            breakdown.push(result.into_timeframe_result(timeframe)?);
        }
        if let Some((&extra, _)) = parsed.iter().next() {
            bail!("LLM breakdown contains unselected timeframe {extra}");
        }

        Ok(AnalysisResult {
            pair: pair.to_string(),
            overall_probability: clamp_score(self.overall_probability),
            recommendation,
            confidence_level: clamp_score(self.confidence_level),
            risk_level,
            risk_reward_ratio: risk_level.risk_reward_ratio(),
            entry_strategy: self.entry_strategy,
            exit_strategy: self.exit_strategy,
            position_sizing: self.position_sizing,
            market_sentiment_summary: self.market_sentiment_summary,
            technical_summary: self.technical_summary,
            timeframe_breakdown: breakdown,
        })
    }
}

impl LlmTimeframeResult {
    fn into_timeframe_result(self, timeframe: Timeframe) -> anyhow::Result<TimeframeResult> {
        let sentiment: Sentiment = self
            .sentiment
            .parse()
            .with_context(|| format!("LLM sentiment label for {timeframe}"))?;
        Ok(TimeframeResult {
            timeframe,
            probability: clamp_score(self.probability),
            sentiment,
            strength: clamp_score(self.strength),
            reasoning: self.reasoning,
        })
    }
}
