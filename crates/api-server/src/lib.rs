pub mod levels_routes;
pub mod news_pipeline_routes;
pub mod request_id;
pub mod security_headers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use core_types::AnalysisError;
use llm_sentiment::{HttpLLMClient, LLMSentimentAgent, MockLLMClient};
use ml_level_scorer::MlLevelScorer;
use news_collectors::{AlphaVantageCollector, Collector, FinnhubCollector, MockCollector, NewsApiCollector};
use news_fetch_agent::NewsFetchAgent;
use sentiment_aggregator::SentimentAggregator;
use sr_agent::SupportResistanceAgent;
use sr_detection::DataLoader;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state, assembled once at startup and cloned (cheaply,
/// via `Arc`) into every handler.
#[derive(Clone)]
pub struct AppState {
    pub news_fetch_agent: Arc<NewsFetchAgent>,
    pub llm_sentiment_agent: Arc<LLMSentimentAgent>,
    pub sentiment_aggregator: Arc<SentimentAggregator>,
    pub sr_agent: Arc<SupportResistanceAgent>,
    pub config: Arc<core_types::AppConfig>,
}

/// Wraps any error reaching a handler. Downcasts to `AnalysisError` to decide
/// the HTTP status (spec §7); anything else is a 500.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<AnalysisError>() {
            Some(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
            "trace": format!("{:?}", self.0),
        }));
        (status, body).into_response()
    }
}

fn build_collectors(config: &core_types::AppConfig) -> Vec<Arc<dyn Collector>> {
    if config.use_mock_data {
        return vec![Arc::new(MockCollector::new())];
    }

    let mut collectors: Vec<Arc<dyn Collector>> = Vec::new();
    if let Some(key) = &config.finnhub_api_key {
        collectors.push(Arc::new(FinnhubCollector::new(key.clone())));
    }
    if let Some(key) = &config.newsapi_key {
        collectors.push(Arc::new(NewsApiCollector::new(key.clone())));
    }
    if let Some(key) = &config.alpha_vantage_api_key {
        collectors.push(Arc::new(AlphaVantageCollector::new(key.clone())));
    }
    if collectors.is_empty() {
        tracing::warn!("no provider API keys configured, falling back to the mock collector");
        collectors.push(Arc::new(MockCollector::new()));
    }
    collectors
}

fn build_app_state(config: core_types::AppConfig) -> AppState {
    let collectors = build_collectors(&config);
    let news_fetch_agent = Arc::new(NewsFetchAgent::new(collectors));

    let llm_sentiment_agent = if config.use_mock_data || config.openai_api_key.is_none() {
        Arc::new(LLMSentimentAgent::new(Arc::new(MockLLMClient::new()), config.similarity_threshold))
    } else {
        let client = HttpLLMClient::new(
            "https://api.openai.com/v1/chat/completions".to_string(),
            config.openai_api_key.clone().unwrap_or_default(),
            "the company".to_string(),
        );
        Arc::new(LLMSentimentAgent::new(Arc::new(client), config.similarity_threshold))
    };

    let sentiment_aggregator = Arc::new(SentimentAggregator::new());

    // The workspace has no real historical-bar client yet (§4.7 names a
    // Yahoo-style provider as the non-mock fallback); `DataLoader` is already
    // built to accept one via `BarProvider` when it lands.
    let ml_scorer = if config.use_ml_predictions {
        match &config.ml_model_path {
            Some(path) => MlLevelScorer::load(path),
            None => {
                tracing::warn!("use_ml_predictions set but no ml_model_path configured, scoring falls back to rules");
                MlLevelScorer::disabled()
            }
        }
    } else {
        MlLevelScorer::disabled()
    };
    let sr_agent = Arc::new(SupportResistanceAgent::new(DataLoader::mock(), ml_scorer));

    AppState {
        news_fetch_agent,
        llm_sentiment_agent,
        sentiment_aggregator,
        sr_agent,
        config: Arc::new(config),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .try_init();
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(news_pipeline_routes::routes())
        .merge(levels_routes::routes())
        .layer(axum::middleware::from_fn(security_headers::security_headers_middleware))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    init_tracing();
    let config = core_types::AppConfig::from_env();
    let port: u16 = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);

    let state = build_app_state(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "api-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
