use crate::config::Settings;
use crate::market::MarketSnapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const QUOTE_PATH: &str = "/v1/quote";
const TECHNICALS_PATH: &str = "/v1/technicals";
const NEWS_SENTIMENT_PATH: &str = "/v1/news_sentiment";

#[derive(Debug, Clone, Deserialize)]
pub struct QuotePayload {
    pub price: Option<f64>,
    pub previous_close: Option<f64>,
    pub change_percent: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TechnicalsPayload {
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsSentimentPayload {
    pub sentiment_score: Option<f64>,
}

/// External market-data seam. A snapshot fetch never fails as a whole;
/// individual sources that error are treated as absent.
#[async_trait::async_trait]
pub trait MarketDataClient: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_snapshot(&self, pair: &str) -> MarketSnapshot;
}

#[derive(Debug, Clone)]
pub struct HttpJsonMarketProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpJsonMarketProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_market_data_base_url()?.to_string();
        let api_key = settings.market_data_api_key.clone();

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, pair: &str) -> Result<T> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(&[("pair", pair)])
            .send()
            .await
            .with_context(|| format!("market data request failed: {path}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status} on {path}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("market data response on {path} is not the expected JSON"))
    }
}

#[async_trait::async_trait]
impl MarketDataClient for HttpJsonMarketProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    /// Fetches the quote, technicals, and news-sentiment sources
    /// concurrently. Each source degrades independently: a failure is logged
    /// and its fields stay at their neutral defaults.
    async fn fetch_snapshot(&self, pair: &str) -> MarketSnapshot {
        let (quote, technicals, news) = tokio::join!(
            self.get_json::<QuotePayload>(QUOTE_PATH, pair),
            self.get_json::<TechnicalsPayload>(TECHNICALS_PATH, pair),
            self.get_json::<NewsSentimentPayload>(NEWS_SENTIMENT_PATH, pair),
        );

        let mut snapshot = MarketSnapshot::neutral(pair);
        match quote {
            Ok(payload) => snapshot.apply_quote(payload),
            Err(err) => tracing::warn!(pair, error = %err, "quote source unavailable"),
        }
        match technicals {
            Ok(payload) => snapshot.apply_technicals(payload),
            Err(err) => tracing::warn!(pair, error = %err, "technicals source unavailable"),
        }
        match news {
            Ok(payload) => snapshot.apply_news(payload),
            Err(err) => tracing::warn!(pair, error = %err, "news sentiment source unavailable"),
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quote_payload_tolerates_missing_fields() {
        let payload: QuotePayload = serde_json::from_value(json!({
            "price": 1.0835,
        }))
        .unwrap();
        assert_eq!(payload.price, Some(1.0835));
        assert!(payload.previous_close.is_none());
        assert!(payload.timestamp.is_none());
    }

    #[test]
    fn quote_payload_parses_full_shape() {
        let payload: QuotePayload = serde_json::from_value(json!({
            "price": 1.0835,
            "previous_close": 1.0790,
            "change_percent": 0.42,
            "high": 1.0860,
            "low": 1.0770,
            "timestamp": "2026-08-28T16:00:00Z",
        }))
        .unwrap();
        assert_eq!(payload.change_percent, Some(0.42));
        assert!(payload.timestamp.is_some());
    }

    #[test]
    fn url_joins_without_double_slash() {
        let settings = Settings {
            anthropic_api_key: None,
            market_data_base_url: Some("https://md.example.com/".to_string()),
            market_data_api_key: None,
        };
        let provider = HttpJsonMarketProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.url(QUOTE_PATH), "https://md.example.com/v1/quote");
    }

    #[test]
    fn from_settings_requires_base_url() {
        let settings = Settings {
            anthropic_api_key: None,
            market_data_base_url: None,
            market_data_api_key: None,
        };
        assert!(HttpJsonMarketProvider::from_settings(&settings).is_err());
    }
}
