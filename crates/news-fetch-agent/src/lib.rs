use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Agent, AnalysisError, Article, DataSource, HealthStatus, TimeHorizon};
use news_collectors::{
    ApiUsage, Collector, DateRangeCalculator, DuplicateFilter, RelevanceFilter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for one `NewsFetchAgent::process` call (§4.4).
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub time_horizon: TimeHorizon,
    pub min_relevance: f64,
    pub max_articles: usize,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            time_horizon: TimeHorizon::Days1,
            min_relevance: 0.3,
            max_articles: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Result of one fetch, matching §4.4 step 6's emitted fields.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub symbol: String,
    pub articles: Vec<Article>,
    pub fetched_at: DateTime<Utc>,
    pub total_count: usize,
    pub raw_articles_count: usize,
    pub sources: Vec<String>,
    pub time_horizon: TimeHorizon,
    pub date_range: DateRange,
    pub api_usage: Vec<ApiUsage>,
    pub data_source: DataSource,
    pub status: core_types::Status,
}

/// Orchestrates concurrent provider fetch, dynamic window expansion, relevance
/// filtering, deduplication, and final trimming (§4.4).
pub struct NewsFetchAgent {
    collectors: Vec<Arc<dyn Collector>>,
}

impl NewsFetchAgent {
    pub fn new(collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self { collectors }
    }

    /// Fans out to all collectors concurrently, collecting successes and logging
    /// failures; a collector that errors never fails the overall fetch.
    async fn fan_out(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> (Vec<Article>, Vec<String>, Vec<ApiUsage>) {
        let futures = self.collectors.iter().map(|collector| {
            let collector = Arc::clone(collector);
            let symbol = symbol.to_string();
            async move {
                let result = collector.fetch_news(&symbol, from, to, limit).await;
                (collector.source_name(), collector.is_mock(), collector.api_usage(), result)
            }
        });

        let outcomes = futures_util::future::join_all(futures).await;

        let mut merged = Vec::new();
        let mut sources_used = Vec::new();
        let mut usages = Vec::new();
        for (source, _is_mock, usage, result) in outcomes {
            usages.push(usage);
            match result {
                Ok(articles) => {
                    if !articles.is_empty() {
                        sources_used.push(source.to_string());
                    }
                    merged.extend(articles);
                }
                Err(err) => {
                    tracing::warn!(source, error = %err, "collector failed, continuing without it");
                }
            }
        }
        (merged, sources_used, usages)
    }

    fn merge_dedup_by_id_or_url(existing: Vec<Article>, new: Vec<Article>) -> Vec<Article> {
        let mut merged = existing;
        for article in new {
            let is_dup = merged
                .iter()
                .any(|a| a.id == article.id || (a.url.is_some() && a.url == article.url));
            if !is_dup {
                merged.push(article);
            }
        }
        merged
    }
}

#[async_trait]
impl Agent for NewsFetchAgent {
    type Params = FetchParams;
    type Output = FetchResult;

    async fn init(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    async fn process(&self, symbol: &str, params: FetchParams) -> Result<FetchResult, AnalysisError> {
        let now = Utc::now();
        let (mut from, to) = DateRangeCalculator::calculate(params.time_horizon, now);

        let (mut all_articles, mut sources_used, mut api_usage) =
            self.fan_out(symbol, from, to, params.max_articles).await;

        let floor = params.max_articles.min(10);
        let mut expansions = 0;
        while all_articles.len() < floor && expansions < 2 {
            let (expanded_from, _) = DateRangeCalculator::expand_window(from, to, 1.5);
            from = expanded_from;
            let (more, more_sources, more_usage) =
                self.fan_out(symbol, from, to, params.max_articles).await;
            all_articles = Self::merge_dedup_by_id_or_url(all_articles, more);
            for s in more_sources {
                if !sources_used.contains(&s) {
                    sources_used.push(s);
                }
            }
            api_usage = more_usage;
            expansions += 1;
        }

        // Pre-trim by most-recent publishedAt to `limit` (step 4).
        all_articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        all_articles.truncate(params.max_articles);
        let raw_articles_count = all_articles.len();

        RelevanceFilter::score_articles(&mut all_articles, symbol);
        let filtered = RelevanceFilter::filter_by_threshold(all_articles, params.min_relevance);
        let deduped = DuplicateFilter::remove_duplicates(filtered, None);
        let sorted = RelevanceFilter::sort_by_relevance(deduped, true);
        let mut final_articles = sorted;
        final_articles.truncate(params.max_articles);

        let data_source = if self.collectors.iter().all(|c| c.is_mock()) {
            DataSource::Mock
        } else if sources_used.is_empty() {
            DataSource::Unknown
        } else {
            DataSource::Api
        };

        Ok(FetchResult {
            symbol: symbol.to_string(),
            total_count: final_articles.len(),
            raw_articles_count,
            articles: final_articles,
            fetched_at: now,
            sources: sources_used,
            time_horizon: params.time_horizon,
            date_range: DateRange { from, to },
            api_usage,
            data_source,
            status: core_types::Status::Success,
        })
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::ok(
            "news_fetch_agent",
            serde_json::json!({ "collectors": self.collectors.len() }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use news_collectors::MockCollector;

    fn agent() -> NewsFetchAgent {
        NewsFetchAgent::new(vec![Arc::new(MockCollector::new())])
    }

    #[tokio::test]
    async fn mock_only_fetch_respects_threshold_and_limit() {
        let agent = agent();
        let params = FetchParams {
            time_horizon: TimeHorizon::Days1,
            min_relevance: 0.3,
            max_articles: 10,
        };
        let result = agent.process("AAPL", params).await.unwrap();
        assert!(result.articles.len() <= 10);
        assert!(result.articles.iter().all(|a| a.relevance_score >= 0.3));
        for window in result.articles.windows(2) {
            assert!(window[0].relevance_score >= window[1].relevance_score);
        }
    }

    #[tokio::test]
    async fn zero_articles_is_success_not_error() {
        let agent = agent();
        let params = FetchParams {
            time_horizon: TimeHorizon::Days1,
            min_relevance: 0.99,
            max_articles: 10,
        };
        let result = agent.process("ZZZZ", params).await.unwrap();
        assert_eq!(result.total_count, 0);
        assert!(matches!(result.status, core_types::Status::Success));
    }
}
