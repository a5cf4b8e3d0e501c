use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use core_types::{AnalysisError, Article};
use serde::Deserialize;
use std::time::Duration;

use crate::collector::{ApiUsage, Collector};
use crate::rate_limiter::{CompositeLimiter, WindowLimiter};
use crate::retry::with_backoff;

#[derive(Debug, Deserialize)]
struct AvFeedItem {
    title: Option<String>,
    url: Option<String>,
    time_published: Option<String>,
    summary: Option<String>,
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvResponse {
    feed: Option<Vec<AvFeedItem>>,
}

pub struct AlphaVantageCollector {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    limiter: CompositeLimiter,
}

impl AlphaVantageCollector {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://www.alphavantage.co/query".to_string(),
            client: reqwest::Client::new(),
            limiter: CompositeLimiter::new(vec![
                WindowLimiter::new(5, Duration::from_secs(60)),
                WindowLimiter::new(500, Duration::from_secs(86_400)),
            ]),
        }
    }

    /// AlphaVantage's `time_published` is `YYYYMMDDTHHMMSS`, not RFC3339.
    fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn normalize(raw: AvFeedItem, idx: usize, symbol: &str) -> Option<Article> {
        let title = raw.title?;
        let published_at = raw.time_published.as_deref().and_then(Self::parse_timestamp)?;
        Some(Article {
            id: raw.url.clone().unwrap_or_else(|| format!("alphavantage-{symbol}-{idx}")),
            title,
            source: raw.source.unwrap_or_else(|| "AlphaVantage".to_string()),
            published_at,
            url: raw.url,
            summary: raw.summary,
            content: None,
            relevance_score: 0.0,
        })
    }
}

#[async_trait]
impl Collector for AlphaVantageCollector {
    fn source_name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Article>, AnalysisError> {
        self.limiter.try_acquire("alpha_vantage")?;

        let symbol = symbol.to_uppercase();

        let response: AvResponse = with_backoff(|| async {
            let resp = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("function", "NEWS_SENTIMENT"),
                    ("tickers", symbol.as_str()),
                    ("apikey", self.api_key.as_str()),
                ])
                .send()
                .await
                .map_err(|e| AnalysisError::CollectorConnectionError(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(AnalysisError::CollectorProtocolError(format!(
                    "alpha vantage returned HTTP {}",
                    resp.status()
                )));
            }

            resp.json::<AvResponse>()
                .await
                .map_err(|e| AnalysisError::CollectorProtocolError(e.to_string()))
        })
        .await?;

        let articles: Vec<Article> = response
            .feed
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| Self::normalize(raw, idx, &symbol))
            .take(limit)
            .collect();

        Ok(articles)
    }

    fn api_usage(&self) -> ApiUsage {
        ApiUsage {
            provider: "alpha_vantage",
            calls_remaining: Some(self.limiter.remaining()),
            limit_description: "5 calls/minute, 500 calls/day",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alpha_vantage_timestamp() {
        let parsed = AlphaVantageCollector::parse_timestamp("20260115T143000").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-01-15T14:30:00+00:00");
    }
}
