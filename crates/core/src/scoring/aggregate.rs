use crate::domain::analysis::{clamp_score, Recommendation, RiskLevel, Sentiment, TimeframeBreakdown};
use crate::domain::questionnaire::Timeframe;
use crate::market::{MarketSnapshot, MarketTrend};
use std::collections::HashMap;

const STRONG_ALIGNMENT: f64 = 0.7;
const WEAK_ALIGNMENT: f64 = 0.3;
const ALIGNMENT_NUDGE: f64 = 10.0;
const HIGH_VOLATILITY: f64 = 2.0;
const LOW_VOLATILITY: f64 = 0.5;

/// Immutable weighting injected into the aggregation step, so the engine
/// stays a pure function of its explicit inputs.
#[derive(Debug, Clone)]
pub struct AggregationConfig {
    weights: HashMap<Timeframe, f64>,
    pub default_weight: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        // Larger timeframes carry more weight in the overall verdict.
        let weights = HashMap::from([
            (Timeframe::Mn1, 3.0),
            (Timeframe::W1, 2.5),
            (Timeframe::Daily, 2.0),
            (Timeframe::H8, 1.5),
            (Timeframe::H4, 1.2),
            (Timeframe::H2, 1.0),
            (Timeframe::H1, 0.8),
            (Timeframe::M30, 0.5),
            (Timeframe::M15, 0.3),
            (Timeframe::M10, 0.2),
        ]);
        Self {
            weights,
            default_weight: 0.1,
        }
    }
}

impl AggregationConfig {
    pub fn with_weights(weights: HashMap<Timeframe, f64>, default_weight: f64) -> Self {
        Self {
            weights,
            default_weight,
        }
    }

    pub fn weight(&self, timeframe: Timeframe) -> f64 {
        self.weights
            .get(&timeframe)
            .copied()
            .unwrap_or(self.default_weight)
    }

    fn heaviest_selected(&self, selected: &[Timeframe]) -> Option<Timeframe> {
        selected
            .iter()
            .copied()
            .max_by(|a, b| self.weight(*a).total_cmp(&self.weight(*b)))
    }
}

/// Aggregated verdict before the narrative fields are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub overall_probability: f64,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub risk: RiskLevel,
    pub risk_reward_ratio: f64,
}

/// Combines per-timeframe scores into the overall verdict: weighted mean,
/// threshold banding, then the optional market alignment and volatility
/// adjustments when a snapshot is present.
pub fn aggregate(
    config: &AggregationConfig,
    breakdown: &TimeframeBreakdown,
    selected: &[Timeframe],
    snapshot: Option<&MarketSnapshot>,
) -> Verdict {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for &timeframe in selected {
        if let Some(result) = breakdown.get(timeframe) {
            let weight = config.weight(timeframe);
            weighted_sum += weight * result.probability;
            total_weight += weight;
        }
    }

    let mut probability = if total_weight > 0.0 {
        round2(weighted_sum / total_weight)
    } else {
        50.0
    };

    // Directional calls follow the sentiment of the highest-weighted selected
    // timeframe (deliberate choice; see DESIGN.md).
    let reference_sentiment = config
        .heaviest_selected(selected)
        .and_then(|tf| breakdown.get(tf))
        .map(|r| r.sentiment)
        .unwrap_or(Sentiment::Neutral);
    let directional = if reference_sentiment == Sentiment::Bullish {
        Recommendation::Long
    } else {
        Recommendation::Short
    };

    let (recommendation, mut confidence, mut risk) = if probability >= 75.0 {
        (directional, (probability + 10.0).min(95.0), RiskLevel::Low)
    } else if probability >= 60.0 {
        (directional, probability, RiskLevel::Medium)
    } else if probability >= 45.0 {
        (Recommendation::Neutral, probability, RiskLevel::Medium)
    } else {
        (Recommendation::Avoid, 100.0 - probability, RiskLevel::High)
    };

    if let Some(snapshot) = snapshot {
        if let Some(alignment) = market_alignment(breakdown, snapshot) {
            if alignment >= STRONG_ALIGNMENT {
                probability = clamp_score(probability + ALIGNMENT_NUDGE);
            } else if alignment <= WEAK_ALIGNMENT {
                probability = clamp_score(probability - ALIGNMENT_NUDGE);
            }
        }

        if let Some(change) = snapshot.daily_change_percent {
            let volatility = change.abs();
            if volatility > HIGH_VOLATILITY {
                confidence = (confidence - 15.0).max(0.0);
                risk = RiskLevel::High;
            } else if volatility < LOW_VOLATILITY {
                confidence = (confidence + 10.0).min(100.0);
                risk = RiskLevel::Low;
            }
        }
    }

    Verdict {
        overall_probability: probability,
        recommendation,
        confidence: clamp_score(confidence),
        risk,
        risk_reward_ratio: risk.risk_reward_ratio(),
    }
}

/// Share of non-neutral timeframes agreeing with the snapshot trend.
/// None when the snapshot carries no trend tag; with zero non-neutral
/// timeframes the ratio sits at 0.5 so neither nudge fires.
fn market_alignment(breakdown: &TimeframeBreakdown, snapshot: &MarketSnapshot) -> Option<f64> {
    let trend = snapshot.trend?;
    let trend_sentiment = match trend {
        MarketTrend::Bullish => Sentiment::Bullish,
        MarketTrend::Bearish => Sentiment::Bearish,
    };

    let mut aligned = 0usize;
    let mut opinionated = 0usize;
    for result in breakdown.iter() {
        if result.sentiment == Sentiment::Neutral {
            continue;
        }
        opinionated += 1;
        if result.sentiment == trend_sentiment {
            aligned += 1;
        }
    }

    if opinionated == 0 {
        Some(0.5)
    } else {
        Some(aligned as f64 / opinionated as f64)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
