use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;

/// One stored embedding plus the metadata needed to reconstruct a cache hit.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub vector: Vec<f64>,
    pub metadata: StoredSentiment,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredSentiment {
    pub score: f64,
    pub label: core_types::SentimentLabel,
    pub confidence: f64,
    pub reasoning: String,
    pub symbol: String,
    pub title: String,
}

fn normalize(vector: &[f64]) -> Vec<f64> {
    let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Shared embedding map protected by a read-write lock (§5): similarity search
/// holds a read lock, insertion holds a write lock.
pub struct VectorStore {
    entries: RwLock<DashMap<String, VectorEntry>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self { entries: RwLock::new(DashMap::new()) }
    }

    pub async fn insert(&self, article_id: String, vector: Vec<f64>, metadata: StoredSentiment) {
        let guard = self.entries.write().await;
        guard.insert(
            article_id,
            VectorEntry { vector: normalize(&vector), metadata, added_at: Utc::now() },
        );
    }

    /// Returns the single best match whose cosine similarity meets `threshold`,
    /// normalising the query vector first (both sides are unit-length, so cosine
    /// similarity reduces to a dot product).
    pub async fn find_similar(&self, query: &[f64], threshold: f64) -> Option<VectorEntry> {
        let query = normalize(query);
        let guard = self.entries.read().await;
        let mut best: Option<(f64, VectorEntry)> = None;
        for entry in guard.iter() {
            let sim = cosine_similarity(&query, &entry.vector);
            if sim >= threshold {
                if best.as_ref().map(|(s, _)| sim > *s).unwrap_or(true) {
                    best = Some((sim, entry.clone()));
                }
            }
        }
        best.map(|(_, entry)| entry)
    }

    pub async fn clear(&self) {
        let guard = self.entries.write().await;
        guard.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drops entries older than `ttl`.
    pub async fn evict_expired(&self, ttl: chrono::Duration) {
        let guard = self.entries.write().await;
        let now = Utc::now();
        guard.retain(|_, entry| now - entry.added_at < ttl);
    }
}

impl Default for VectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sentiment() -> StoredSentiment {
        StoredSentiment {
            score: 0.5,
            label: core_types::SentimentLabel::Positive,
            confidence: 0.8,
            reasoning: "test".into(),
            symbol: "AAPL".into(),
            title: "Apple earnings".into(),
        }
    }

    #[tokio::test]
    async fn exact_match_is_found_above_threshold() {
        let store = VectorStore::new();
        store.insert("1".into(), vec![1.0, 0.0, 0.0], sample_sentiment()).await;
        let hit = store.find_similar(&[1.0, 0.0, 0.0], 0.85).await;
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn dissimilar_vector_misses() {
        let store = VectorStore::new();
        store.insert("1".into(), vec![1.0, 0.0, 0.0], sample_sentiment()).await;
        let hit = store.find_similar(&[0.0, 1.0, 0.0], 0.85).await;
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn clear_wipes_all_entries() {
        let store = VectorStore::new();
        store.insert("1".into(), vec![1.0, 0.0], sample_sentiment()).await;
        store.clear().await;
        assert_eq!(store.len().await, 0);
    }
}
