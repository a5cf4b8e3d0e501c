use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{AnalysisError, Article};
use serde::Deserialize;
use std::time::Duration;

use crate::collector::{ApiUsage, Collector};
use crate::date_range::DateRangeCalculator;
use crate::rate_limiter::WindowLimiter;
use crate::retry::with_backoff;

#[derive(Debug, Deserialize)]
struct FinnhubArticle {
    id: Option<i64>,
    headline: Option<String>,
    source: Option<String>,
    datetime: Option<i64>,
    url: Option<String>,
    summary: Option<String>,
}

pub struct FinnhubCollector {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    limiter: WindowLimiter,
}

impl FinnhubCollector {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://finnhub.io/api/v1".to_string(),
            client: reqwest::Client::new(),
            limiter: WindowLimiter::new(60, Duration::from_secs(60)),
        }
    }

    fn normalize(raw: FinnhubArticle, symbol: &str) -> Option<Article> {
        let title = raw.headline?;
        let timestamp = raw.datetime?;
        let published_at = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
        Some(Article {
            id: raw
                .id
                .map(|i| i.to_string())
                .unwrap_or_else(|| format!("finnhub-{symbol}-{timestamp}")),
            title,
            source: raw.source.unwrap_or_else(|| "Finnhub".to_string()),
            published_at,
            url: raw.url,
            summary: raw.summary,
            content: None,
            relevance_score: 0.0,
        })
    }
}

#[async_trait]
impl Collector for FinnhubCollector {
    fn source_name(&self) -> &'static str {
        "finnhub"
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Article>, AnalysisError> {
        self.limiter.try_acquire("finnhub")?;

        let dates = DateRangeCalculator::format_for_api(from, to, "finnhub");
        let url = format!("{}/company-news", self.base_url);
        let symbol = symbol.to_uppercase();

        let response_json: serde_json::Value = with_backoff(|| async {
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("symbol", symbol.as_str()),
                    ("from", dates["from"].as_str()),
                    ("to", dates["to"].as_str()),
                    ("token", self.api_key.as_str()),
                ])
                .send()
                .await
                .map_err(|e| AnalysisError::CollectorConnectionError(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(AnalysisError::CollectorProtocolError(format!(
                    "finnhub returned HTTP {}",
                    resp.status()
                )));
            }

            resp.json::<serde_json::Value>()
                .await
                .map_err(|e| AnalysisError::CollectorProtocolError(e.to_string()))
        })
        .await?;

        let raw_articles: Vec<FinnhubArticle> = match response_json {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match serde_json::from_value::<FinnhubArticle>(v) {
                    Ok(a) => Some(a),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping malformed finnhub article");
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        let articles: Vec<Article> = raw_articles
            .into_iter()
            .filter_map(|raw| Self::normalize(raw, &symbol))
            .take(limit)
            .collect();

        Ok(articles)
    }

    fn api_usage(&self) -> ApiUsage {
        ApiUsage {
            provider: "finnhub",
            calls_remaining: Some(self.limiter.remaining()),
            limit_description: "60 calls/minute",
        }
    }
}
