use async_trait::async_trait;
use serde::Serialize;

use crate::error::AnalysisError;

/// Health status returned by `Agent::health_check`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub agent: &'static str,
    pub details: serde_json::Value,
}

impl HealthStatus {
    pub fn ok(agent: &'static str, details: serde_json::Value) -> Self {
        Self {
            status: "ok",
            agent,
            details,
        }
    }
}

/// Common capability set shared by every pipeline agent: `Init`, `Process`, `HealthCheck`.
///
/// Each concrete agent (NewsFetch, LLMSentiment, Aggregator, SupportResistance) fixes
/// `Params`/`Output` to its own request/response shape rather than inheriting from a
/// shared base class.
#[async_trait]
pub trait Agent: Send + Sync {
    type Params: Send;
    type Output: Send;

    async fn init(&self) -> Result<(), AnalysisError>;

    async fn process(&self, symbol: &str, params: Self::Params) -> Result<Self::Output, AnalysisError>;

    async fn health_check(&self) -> HealthStatus;
}
