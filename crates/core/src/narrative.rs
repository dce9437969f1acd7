//! Templated narrative fields for locally produced verdicts. Everything here
//! is string assembly over already-computed numbers; no free-text generation.

use crate::domain::analysis::{AnalysisResult, RiskLevel, TimeframeBreakdown, TimeframeResult};
use crate::scoring::Verdict;

const ACTIONABLE_SCORE_FLOOR: f64 = 60.0;

/// Builds the final structured result from the aggregated verdict and the
/// per-timeframe breakdown.
pub fn assemble(pair: &str, breakdown: TimeframeBreakdown, verdict: Verdict) -> AnalysisResult {
    let best = best_timeframe(&breakdown);

    let entry_strategy = match best {
        Some(result) => format!(
            "Plan the entry on the {} timeframe (score {:.1}); wait for a pullback \
             confirmation before committing at a {:.1}:1 reward-to-risk multiple.",
            result.timeframe, result.probability, verdict.risk_reward_ratio
        ),
        None => "No timeframe scores above 60; stand aside until a clearer setup forms."
            .to_string(),
    };

    let exit_strategy = match best {
        Some(result) => format!(
            "Take profit at {:.1} times the risked distance and exit early if the {} \
             timeframe loses its bias.",
            verdict.risk_reward_ratio, result.timeframe
        ),
        None => "Without an actionable setup there is no exit to manage.".to_string(),
    };

    let position_sizing = match verdict.risk {
        RiskLevel::Low => "Risk 1% of account equity per trade.",
        RiskLevel::Medium => "Risk 0.5% of account equity per trade.",
        RiskLevel::High => "Risk 0.2% of account equity per trade.",
    }
    .to_string();

    let market_sentiment_summary = join_breakdown(&breakdown, |r| {
        format!("{}: {:?}", r.timeframe, r.sentiment).to_uppercase()
    });
    let technical_summary = join_breakdown(&breakdown, |r| {
        format!("{} {:.1}/100 (strength {:.0}%)", r.timeframe, r.probability, r.strength)
    });

    AnalysisResult {
        pair: pair.to_string(),
        overall_probability: verdict.overall_probability,
        recommendation: verdict.recommendation,
        confidence_level: verdict.confidence,
        risk_level: verdict.risk,
        risk_reward_ratio: verdict.risk_reward_ratio,
        entry_strategy,
        exit_strategy,
        position_sizing,
        market_sentiment_summary,
        technical_summary,
        timeframe_breakdown: breakdown,
    }
}

/// Highest-scoring timeframe above the actionable floor, if any.
fn best_timeframe(breakdown: &TimeframeBreakdown) -> Option<&TimeframeResult> {
    breakdown
        .iter()
        .filter(|r| r.probability > ACTIONABLE_SCORE_FLOOR)
        .max_by(|a, b| a.probability.total_cmp(&b.probability))
}

fn join_breakdown(
    breakdown: &TimeframeBreakdown,
    render: impl Fn(&TimeframeResult) -> String,
) -> String {
    breakdown.iter().map(render).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{Recommendation, Sentiment};
    use crate::domain::questionnaire::Timeframe;

    fn entry(tf: Timeframe, probability: f64, sentiment: Sentiment) -> TimeframeResult {
        TimeframeResult {
            timeframe: tf,
            probability,
            sentiment,
            strength: 100.0,
            reasoning: String::new(),
        }
    }

    fn verdict(risk: RiskLevel) -> Verdict {
        Verdict {
            overall_probability: 65.0,
            recommendation: Recommendation::Long,
            confidence: 65.0,
            risk,
            risk_reward_ratio: risk.risk_reward_ratio(),
        }
    }

    #[test]
    fn entry_names_best_timeframe_above_floor() {
        let breakdown: TimeframeBreakdown = [
            entry(Timeframe::Daily, 72.0, Sentiment::Bullish),
            entry(Timeframe::H1, 81.0, Sentiment::Bullish),
        ]
        .into_iter()
        .collect();
        let result = assemble("EURUSD", breakdown, verdict(RiskLevel::Medium));
        assert!(result.entry_strategy.contains("H1"));
        assert!(result.entry_strategy.contains("2.0:1"));
    }

    #[test]
    fn no_actionable_timeframe_gets_stand_aside_text() {
        let breakdown: TimeframeBreakdown =
            [entry(Timeframe::Daily, 50.0, Sentiment::Neutral)].into_iter().collect();
        let result = assemble("EURUSD", breakdown, verdict(RiskLevel::Medium));
        assert!(result.entry_strategy.contains("stand aside"));
    }

    #[test]
    fn position_sizing_is_fixed_per_risk_level() {
        let breakdown: TimeframeBreakdown =
            [entry(Timeframe::Daily, 65.0, Sentiment::Bullish)].into_iter().collect();
        for (risk, fraction) in [
            (RiskLevel::Low, "1%"),
            (RiskLevel::Medium, "0.5%"),
            (RiskLevel::High, "0.2%"),
        ] {
            let result = assemble("EURUSD", breakdown.clone(), verdict(risk));
            assert!(result.position_sizing.contains(fraction));
        }
    }

    #[test]
    fn summaries_cover_every_selected_timeframe() {
        let breakdown: TimeframeBreakdown = [
            entry(Timeframe::Daily, 65.0, Sentiment::Bullish),
            entry(Timeframe::H1, 42.0, Sentiment::Bearish),
        ]
        .into_iter()
        .collect();
        let result = assemble("GBPUSD", breakdown, verdict(RiskLevel::Medium));
        assert!(result.market_sentiment_summary.contains("DAILY: BULLISH"));
        assert!(result.market_sentiment_summary.contains("H1: BEARISH"));
        assert!(result.technical_summary.contains("DAILY 65.0/100"));
        assert!(result.technical_summary.contains("H1 42.0/100"));
    }
}
