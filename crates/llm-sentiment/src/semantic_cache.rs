use core_types::Article;

use crate::client::SentimentResult;
use crate::vector_store::{StoredSentiment, VectorStore};

const EMBEDDING_DIM: usize = 64;
const EMBED_TEXT_MAX_CHARS: usize = 500;

/// Deterministic, dependency-free text embedding: hashes whitespace-separated
/// tokens into fixed-size buckets. Not semantically rich, but stable and cheap —
/// good enough to dedupe near-identical article text, which is all the cache
/// needs. Treated as CPU-bound work per §5.
fn embed(text: &str) -> Vec<f64> {
    let mut vector = vec![0.0f64; EMBEDDING_DIM];
    for token in text.to_lowercase().split_whitespace() {
        let mut hash: u64 = 1469598103934665603; // FNV offset basis
        for byte in token.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(1099511628211);
        }
        let bucket = (hash as usize) % EMBEDDING_DIM;
        vector[bucket] += 1.0;
    }
    vector
}

fn embedding_text(article: &Article) -> String {
    let body = article.content.as_deref().or(article.summary.as_deref()).unwrap_or("");
    let full = format!("{}. {}", article.title, body);
    full.chars().take(EMBED_TEXT_MAX_CHARS).collect()
}

/// Suppresses duplicate paid LLM calls by caching sentiment results keyed by
/// semantic similarity of the source text, not exact article id (§4.5).
pub struct SemanticCache {
    store: VectorStore,
    similarity_threshold: f64,
    enabled: bool,
}

impl SemanticCache {
    pub fn new(similarity_threshold: f64) -> Self {
        Self { store: VectorStore::new(), similarity_threshold, enabled: true }
    }

    pub fn disabled() -> Self {
        Self { store: VectorStore::new(), similarity_threshold: 0.85, enabled: false }
    }

    pub async fn get_similar(&self, article: &Article, symbol: &str) -> Option<SentimentResult> {
        if !self.enabled {
            return None;
        }
        let query = embed(&embedding_text(article));
        let hit = self.store.find_similar(&query, self.similarity_threshold).await?;
        if hit.metadata.symbol != symbol {
            return None;
        }
        Some(SentimentResult {
            score: hit.metadata.score,
            label: hit.metadata.label,
            confidence: hit.metadata.confidence,
            reasoning: hit.metadata.reasoning.clone(),
        })
    }

    pub async fn store(&self, article: &Article, result: &SentimentResult, symbol: &str) {
        if !self.enabled {
            return;
        }
        let vector = embed(&embedding_text(article));
        self.store
            .insert(
                article.id.clone(),
                vector,
                StoredSentiment {
                    score: result.score,
                    label: result.label,
                    confidence: result.confidence,
                    reasoning: result.reasoning.clone(),
                    symbol: symbol.to_string(),
                    title: article.title.clone(),
                },
            )
            .await;
    }

    pub async fn clear(&self) {
        self.store.clear().await;
    }

    pub async fn len(&self) -> usize {
        self.store.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::SentimentLabel;

    fn article(title: &str, content: &str) -> Article {
        Article {
            id: "1".into(),
            title: title.into(),
            source: "wire".into(),
            published_at: Utc::now(),
            url: None,
            summary: None,
            content: Some(content.into()),
            relevance_score: 0.0,
        }
    }

    #[tokio::test]
    async fn repeated_article_is_a_cache_hit() {
        let cache = SemanticCache::new(0.85);
        let a = article("Apple reports record revenue", "Strong quarter across all segments");
        let result = SentimentResult {
            score: 0.6,
            label: SentimentLabel::Positive,
            confidence: 0.8,
            reasoning: "strong results".into(),
        };
        cache.store(&a, &result, "AAPL").await;
        let hit = cache.get_similar(&a, "AAPL").await;
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn different_symbol_is_a_cache_miss() {
        let cache = SemanticCache::new(0.85);
        let a = article("Apple reports record revenue", "Strong quarter across all segments");
        let result = SentimentResult {
            score: 0.6,
            label: SentimentLabel::Positive,
            confidence: 0.8,
            reasoning: "strong results".into(),
        };
        cache.store(&a, &result, "AAPL").await;
        let hit = cache.get_similar(&a, "MSFT").await;
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let cache = SemanticCache::disabled();
        let a = article("Apple reports record revenue", "Strong quarter across all segments");
        let result = SentimentResult {
            score: 0.6,
            label: SentimentLabel::Positive,
            confidence: 0.8,
            reasoning: "strong results".into(),
        };
        cache.store(&a, &result, "AAPL").await;
        assert!(cache.get_similar(&a, "AAPL").await.is_none());
    }
}
