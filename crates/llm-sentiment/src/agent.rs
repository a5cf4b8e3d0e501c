use async_trait::async_trait;
use chrono::Utc;
use core_types::{Agent, AnalysisError, Article, HealthStatus, SentimentScore, TimeHorizon};
use serde::Serialize;
use std::sync::Arc;

use crate::client::LLMClient;
use crate::semantic_cache::SemanticCache;

pub struct SentimentParams {
    pub articles: Vec<Article>,
    pub use_cache: bool,
    pub time_horizon: TimeHorizon,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentBatchResult {
    pub sentiment_scores: Vec<SentimentScore>,
    pub cache_stats: CacheStats,
    pub total_articles: usize,
    pub total_analyzed: usize,
    pub filtered_by_confidence: usize,
    pub confidence_threshold: f64,
    pub time_horizon: TimeHorizon,
    pub status: core_types::Status,
}

/// Per-article sentiment scoring with semantic caching and horizon-tuned
/// confidence filtering (§4.5).
pub struct LLMSentimentAgent {
    llm_client: Arc<dyn LLMClient>,
    cache: SemanticCache,
}

impl LLMSentimentAgent {
    pub fn new(llm_client: Arc<dyn LLMClient>, similarity_threshold: f64) -> Self {
        Self { llm_client, cache: SemanticCache::new(similarity_threshold) }
    }

    async fn analyze_one(&self, article: &Article, symbol: &str, use_cache: bool) -> (SentimentScore, bool) {
        if use_cache {
            if let Some(cached) = self.cache.get_similar(article, symbol).await {
                return (
                    SentimentScore {
                        article_id: article.id.clone(),
                        symbol: symbol.to_string(),
                        score: cached.score,
                        label: cached.label,
                        confidence: cached.confidence,
                        reasoning: cached.reasoning,
                        cached: true,
                        processed_at: Utc::now(),
                    },
                    true,
                );
            }
        }

        let result = match self.llm_client.analyze_sentiment(article, symbol).await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(article_id = %article.id, error = %err, "LLM sentiment call failed");
                return (
                    SentimentScore {
                        article_id: article.id.clone(),
                        symbol: symbol.to_string(),
                        score: 0.0,
                        label: core_types::SentimentLabel::Neutral,
                        confidence: 0.0,
                        reasoning: format!("analysis unavailable: {err}"),
                        cached: false,
                        processed_at: Utc::now(),
                    },
                    false,
                );
            }
        };

        if use_cache {
            self.cache.store(article, &result, symbol).await;
        }

        (
            SentimentScore {
                article_id: article.id.clone(),
                symbol: symbol.to_string(),
                score: result.score,
                label: result.label,
                confidence: result.confidence,
                reasoning: result.reasoning,
                cached: false,
                processed_at: Utc::now(),
            },
            false,
        )
    }
}

#[async_trait]
impl Agent for LLMSentimentAgent {
    type Params = SentimentParams;
    type Output = SentimentBatchResult;

    async fn init(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    async fn process(
        &self,
        symbol: &str,
        params: SentimentParams,
    ) -> Result<SentimentBatchResult, AnalysisError> {
        let confidence_threshold = params.time_horizon.confidence_threshold();
        let total_articles = params.articles.len();

        let futures = params
            .articles
            .iter()
            .map(|article| self.analyze_one(article, symbol, params.use_cache));
        let outcomes = futures_util::future::join_all(futures).await;

        let mut hits = 0;
        let mut scores = Vec::with_capacity(outcomes.len());
        for (score, cached) in outcomes {
            if cached {
                hits += 1;
            }
            scores.push(score);
        }

        let before_filter = scores.len();
        scores.retain(|s| s.confidence >= confidence_threshold);
        let filtered_by_confidence = before_filter - scores.len();

        Ok(SentimentBatchResult {
            total_analyzed: scores.len(),
            filtered_by_confidence,
            cache_stats: CacheStats { hits, misses: before_filter - hits, size: self.cache.len().await },
            sentiment_scores: scores,
            total_articles,
            confidence_threshold,
            time_horizon: params.time_horizon,
            status: core_types::Status::Success,
        })
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::ok(
            "llm_sentiment_agent",
            serde_json::json!({ "backend": self.llm_client.backend_name(), "cache_size": self.cache.len().await }),
        )
    }
}
