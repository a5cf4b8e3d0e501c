use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{AnalysisError, Article};
use serde::Deserialize;

use crate::collector::{ApiUsage, Collector};

static MOCK_FIXTURE: &str = include_str!("../fixtures/mock_news.json");

#[derive(Debug, Deserialize)]
struct FixtureArticle {
    title: String,
    source: String,
    summary: String,
    content: String,
    hours_ago: i64,
}

/// Deterministic offline collector: loads a bundled fixture keyed by symbol, or
/// synthesizes a small deterministic set for any symbol not in the fixture so every
/// symbol has *something* to analyze when running without API keys (§4.1).
pub struct MockCollector;

impl MockCollector {
    pub fn new() -> Self {
        Self
    }

    fn fixture_for(symbol: &str) -> Vec<FixtureArticle> {
        let table: std::collections::HashMap<String, Vec<FixtureArticle>> =
            serde_json::from_str(MOCK_FIXTURE).expect("bundled mock fixture must be valid JSON");
        table.into_iter().find(|(k, _)| k == symbol).map(|(_, v)| v).unwrap_or_default()
    }

    fn synthesize(symbol: &str) -> Vec<FixtureArticle> {
        vec![
            FixtureArticle {
                title: format!("{symbol} Shares Trade Higher Amid Broad Market Gains"),
                source: "Mock Wire".to_string(),
                summary: format!("{symbol} shares rose in trading today alongside broader market gains."),
                content: format!(
                    "Shares of {symbol} traded higher today as investors responded positively to broader market conditions. Trading volume was in line with recent averages."
                ),
                hours_ago: 4,
            },
            FixtureArticle {
                title: format!("Analysts Maintain Neutral Rating on {symbol}"),
                source: "Mock Financial".to_string(),
                summary: format!("Analysts kept their rating on {symbol} unchanged following recent trading activity."),
                content: format!(
                    "Several analysts covering {symbol} maintained their current ratings, citing a lack of material news catalysts this week."
                ),
                hours_ago: 16,
            },
        ]
    }
}

impl Default for MockCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for MockCollector {
    fn source_name(&self) -> &'static str {
        "mock"
    }

    fn is_mock(&self) -> bool {
        true
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Article>, AnalysisError> {
        let symbol = symbol.to_uppercase();
        let mut fixtures = Self::fixture_for(&symbol);
        if fixtures.is_empty() {
            fixtures = Self::synthesize(&symbol);
        }

        let articles: Vec<Article> = fixtures
            .into_iter()
            .enumerate()
            .map(|(idx, f)| {
                let published_at = to - chrono::Duration::hours(f.hours_ago);
                Article {
                    id: format!("mock-{symbol}-{idx}"),
                    title: f.title,
                    source: f.source,
                    published_at,
                    url: None,
                    summary: Some(f.summary),
                    content: Some(f.content),
                    relevance_score: 0.0,
                }
            })
            .filter(|a| a.published_at >= from && a.published_at <= to)
            .take(limit)
            .collect();

        Ok(articles)
    }

    fn api_usage(&self) -> ApiUsage {
        ApiUsage {
            provider: "mock",
            calls_remaining: None,
            limit_description: "no limit (mock)",
        }
    }
}
