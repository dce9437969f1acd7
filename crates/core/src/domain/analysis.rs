use crate::domain::questionnaire::Timeframe;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl FromStr for Sentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BULLISH" => Ok(Sentiment::Bullish),
            "BEARISH" => Ok(Sentiment::Bearish),
            "NEUTRAL" => Ok(Sentiment::Neutral),
            other => anyhow::bail!("unknown sentiment label: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Long,
    Short,
    Neutral,
    Avoid,
}

impl FromStr for Recommendation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Recommendation::Long),
            "SHORT" | "SELL" => Ok(Recommendation::Short),
            "NEUTRAL" => Ok(Recommendation::Neutral),
            "AVOID" => Ok(Recommendation::Avoid),
            other => anyhow::bail!("unknown recommendation label: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Fixed reward-to-risk multiple per risk band.
    pub fn risk_reward_ratio(&self) -> f64 {
        match self {
            RiskLevel::Low => 1.5,
            RiskLevel::Medium => 2.0,
            RiskLevel::High => 3.0,
        }
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            other => anyhow::bail!("unknown risk level label: {other}"),
        }
    }
}

/// Aggregated verdict for one timeframe's questionnaire signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeResult {
    pub timeframe: Timeframe,
    pub probability: f64,
    pub sentiment: Sentiment,
    pub strength: f64,
    pub reasoning: String,
}

/// Per-timeframe results keyed by timeframe, in selection order.
///
/// Serializes as a JSON object `{"DAILY": {...}, "H1": {...}}` so the wire
/// shape stays a map while insertion order follows the caller's selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeframeBreakdown(Vec<TimeframeResult>);

impl TimeframeBreakdown {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, result: TimeframeResult) {
        self.0.push(result);
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&TimeframeResult> {
        self.0.iter().find(|r| r.timeframe == timeframe)
    }

    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.0.iter().map(|r| r.timeframe).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeframeResult> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TimeframeResult> for TimeframeBreakdown {
    fn from_iter<I: IntoIterator<Item = TimeframeResult>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for TimeframeBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in &self.0 {
            map.serialize_entry(result.timeframe.code(), result)?;
        }
        map.end()
    }
}

/// The final aggregated verdict. Built fresh per request; a full replace of
/// any prior result for the same analysis, never an incremental merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub pair: String,
    pub overall_probability: f64,
    pub recommendation: Recommendation,
    pub confidence_level: f64,
    pub risk_level: RiskLevel,
    pub risk_reward_ratio: f64,
    pub entry_strategy: String,
    pub exit_strategy: String,
    pub position_sizing: String,
    pub market_sentiment_summary: String,
    pub technical_summary: String,
    pub timeframe_breakdown: TimeframeBreakdown,
}

pub(crate) fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
