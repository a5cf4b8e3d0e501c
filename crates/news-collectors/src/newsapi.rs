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
struct NewsApiSource {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
    source: Option<NewsApiSource>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    url: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    articles: Option<Vec<NewsApiArticle>>,
}

pub struct NewsApiCollector {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    limiter: WindowLimiter,
}

impl NewsApiCollector {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://newsapi.org/v2".to_string(),
            client: reqwest::Client::new(),
            limiter: WindowLimiter::new(1000, Duration::from_secs(86_400)),
        }
    }

    fn normalize(raw: NewsApiArticle, idx: usize, symbol: &str) -> Option<Article> {
        let title = raw.title?;
        let published_at = raw
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))?;
        Some(Article {
            id: raw
                .url
                .clone()
                .unwrap_or_else(|| format!("newsapi-{symbol}-{idx}")),
            title,
            source: raw.source.and_then(|s| s.name).unwrap_or_else(|| "NewsAPI".to_string()),
            published_at,
            url: raw.url,
            summary: raw.description,
            content: raw.content,
            relevance_score: 0.0,
        })
    }
}

#[async_trait]
impl Collector for NewsApiCollector {
    fn source_name(&self) -> &'static str {
        "newsapi"
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Article>, AnalysisError> {
        self.limiter.try_acquire("newsapi")?;

        let dates = DateRangeCalculator::format_for_api(from, to, "newsapi");
        let url = format!("{}/everything", self.base_url);
        let symbol = symbol.to_uppercase();
        let page_size = limit.clamp(1, 100).to_string();

        let response: NewsApiResponse = with_backoff(|| async {
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("q", symbol.as_str()),
                    ("from", dates["from"].as_str()),
                    ("to", dates["to"].as_str()),
                    ("language", "en"),
                    ("pageSize", page_size.as_str()),
                    ("apiKey", self.api_key.as_str()),
                ])
                .send()
                .await
                .map_err(|e| AnalysisError::CollectorConnectionError(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(AnalysisError::CollectorProtocolError(format!(
                    "newsapi returned HTTP {}",
                    resp.status()
                )));
            }

            resp.json::<NewsApiResponse>()
                .await
                .map_err(|e| AnalysisError::CollectorProtocolError(e.to_string()))
        })
        .await?;

        let articles: Vec<Article> = response
            .articles
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
            provider: "newsapi",
            calls_remaining: Some(self.limiter.remaining()),
            limit_description: "1000 calls/day",
        }
    }
}
