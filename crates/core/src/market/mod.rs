pub mod provider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse trend tag attached to a market snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketTrend {
    Bullish,
    Bearish,
}

/// Externally sourced market indicators, normalized to a small fixed shape.
/// Every field besides the pair is optional: a missing or failed source is
/// treated as absent and the pipeline proceeds on neutral defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub pair: String,
    pub current_price: Option<f64>,
    pub previous_price: Option<f64>,
    pub daily_change_percent: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub trend: Option<MarketTrend>,
    pub as_of: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    pub fn neutral(pair: &str) -> Self {
        Self {
            pair: pair.to_string(),
            current_price: None,
            previous_price: None,
            daily_change_percent: None,
            high: None,
            low: None,
            trend: None,
            as_of: None,
        }
    }

    pub(crate) fn apply_quote(&mut self, quote: provider::QuotePayload) {
        self.current_price = quote.price;
        self.previous_price = quote.previous_close;
        self.high = quote.high;
        self.low = quote.low;
        self.as_of = quote.timestamp;
        self.daily_change_percent = quote.change_percent.or_else(|| {
            match (quote.price, quote.previous_close) {
                (Some(current), Some(previous)) if previous != 0.0 => {
                    Some((current - previous) / previous * 100.0)
                }
                _ => None,
            }
        });
    }

    pub(crate) fn apply_technicals(&mut self, technicals: provider::TechnicalsPayload) {
        if let Some(trend) = technicals.trend.as_deref() {
            self.trend = parse_trend(trend);
        }
    }

    /// News sentiment only breaks a tie when the technicals source gave no
    /// trend of its own.
    pub(crate) fn apply_news(&mut self, news: provider::NewsSentimentPayload) {
        if self.trend.is_some() {
            return;
        }
        if let Some(score) = news.sentiment_score {
            if score >= 0.2 {
                self.trend = Some(MarketTrend::Bullish);
            } else if score <= -0.2 {
                self.trend = Some(MarketTrend::Bearish);
            }
        }
    }
}

fn parse_trend(label: &str) -> Option<MarketTrend> {
    match label.trim().to_ascii_uppercase().as_str() {
        "BULLISH" | "UP" | "UPTREND" => Some(MarketTrend::Bullish),
        "BEARISH" | "DOWN" | "DOWNTREND" => Some(MarketTrend::Bearish),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::provider::{NewsSentimentPayload, QuotePayload, TechnicalsPayload};
    use super::*;

    #[test]
    fn quote_derives_change_percent_when_missing() {
        let mut snap = MarketSnapshot::neutral("EURUSD");
        snap.apply_quote(QuotePayload {
            price: Some(1.10),
            previous_close: Some(1.00),
            change_percent: None,
            high: Some(1.11),
            low: Some(0.99),
            timestamp: None,
        });
        let change = snap.daily_change_percent.unwrap();
        assert!((change - 10.0).abs() < 1e-9);
        assert_eq!(snap.current_price, Some(1.10));
    }

    #[test]
    fn explicit_change_percent_wins() {
        let mut snap = MarketSnapshot::neutral("EURUSD");
        snap.apply_quote(QuotePayload {
            price: Some(1.10),
            previous_close: Some(1.00),
            change_percent: Some(3.5),
            high: None,
            low: None,
            timestamp: None,
        });
        assert_eq!(snap.daily_change_percent, Some(3.5));
    }

    #[test]
    fn technicals_trend_labels_are_tolerant() {
        let mut snap = MarketSnapshot::neutral("GBPUSD");
        snap.apply_technicals(TechnicalsPayload {
            trend: Some("uptrend".to_string()),
        });
        assert_eq!(snap.trend, Some(MarketTrend::Bullish));

        snap.apply_technicals(TechnicalsPayload {
            trend: Some("ranging".to_string()),
        });
        assert_eq!(snap.trend, None);
    }

    #[test]
    fn news_only_fills_trend_when_technicals_did_not() {
        let mut snap = MarketSnapshot::neutral("USDJPY");
        snap.apply_news(NewsSentimentPayload {
            sentiment_score: Some(-0.6),
        });
        assert_eq!(snap.trend, Some(MarketTrend::Bearish));

        snap.apply_news(NewsSentimentPayload {
            sentiment_score: Some(0.9),
        });
        // Existing trend is kept.
        assert_eq!(snap.trend, Some(MarketTrend::Bearish));
    }

    #[test]
    fn weak_news_sentiment_stays_neutral() {
        let mut snap = MarketSnapshot::neutral("USDJPY");
        snap.apply_news(NewsSentimentPayload {
            sentiment_score: Some(0.1),
        });
        assert_eq!(snap.trend, None);
    }
}
