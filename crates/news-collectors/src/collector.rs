use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{AnalysisError, Article};
use serde::Serialize;

/// Snapshot of a collector's current provider budget, surfaced on health checks
/// and included in the pipeline's per-source diagnostics (§4.4 step 7).
#[derive(Debug, Clone, Serialize)]
pub struct ApiUsage {
    pub provider: &'static str,
    pub calls_remaining: Option<usize>,
    pub limit_description: &'static str,
}

/// A single news provider. Each implementation owns its own rate limiting and
/// normalizes provider-specific JSON into the shared `Article` shape.
#[async_trait]
pub trait Collector: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Mock collectors never count against a real provider budget and are always
    /// available; the orchestrator uses this to decide whether a missing API key
    /// should silently fall back instead of surfacing a collector outage.
    fn is_mock(&self) -> bool {
        false
    }

    async fn fetch_news(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Article>, AnalysisError>;

    fn api_usage(&self) -> ApiUsage;
}
