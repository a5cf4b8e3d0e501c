//! Support/resistance level routes (spec §6).

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use core_types::{Agent, AnalysisError, LevelType, PredictedLevel, Status, Timeframe};
use serde::{Deserialize, Serialize};
use sr_agent::{LevelDetectionParams, LevelDetectionResult};

use crate::{AppError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/levels/:symbol", get(get_levels))
        .route("/api/v1/levels/detect", post(detect_levels))
        .route("/api/v1/levels/batch", post(batch_detect_levels))
        .route("/api/v1/levels/:symbol/nearest", get(nearest_levels))
        .route("/api/v1/levels/health", get(levels_health))
}

#[derive(Deserialize)]
struct LevelsQuery {
    min_strength: Option<u8>,
    max_levels: Option<usize>,
    timeframe: Option<String>,
    project_future: Option<bool>,
    #[allow(dead_code)]
    projection_periods: Option<i64>,
    lookback_days: Option<i64>,
}

#[derive(Deserialize)]
struct DetectRequest {
    symbol: String,
    min_strength: Option<u8>,
    max_levels: Option<usize>,
    timeframe: Option<String>,
    project_future: Option<bool>,
    #[allow(dead_code)]
    projection_periods: Option<i64>,
    lookback_days: Option<i64>,
}

#[derive(Deserialize)]
struct BatchRequest {
    symbols: Vec<String>,
    min_strength: Option<u8>,
    max_levels: Option<usize>,
    timeframe: Option<String>,
    project_future: Option<bool>,
    lookback_days: Option<i64>,
    #[serde(default)]
    parallel: bool,
}

fn parse_timeframe(raw: Option<&str>) -> Result<Timeframe, AppError> {
    match raw {
        None => Ok(Timeframe::Day1),
        Some(raw) => {
            Timeframe::parse(raw).ok_or_else(|| AppError::from(AnalysisError::UnsupportedTimeframe(raw.to_string())))
        }
    }
}

fn build_params(
    state: &AppState,
    min_strength: Option<u8>,
    max_levels: Option<usize>,
    timeframe: Option<&str>,
    project_future: Option<bool>,
    lookback_days: Option<i64>,
) -> Result<LevelDetectionParams, AppError> {
    Ok(LevelDetectionParams {
        min_strength: min_strength.unwrap_or(state.config.min_strength),
        max_levels: max_levels.unwrap_or(state.config.max_levels),
        timeframe: parse_timeframe(timeframe)?,
        project_future: project_future.unwrap_or(false),
        lookback_days,
    })
}

/// `PriceLevel` as emitted over HTTP: `breakoutProbability` is a 0-100 percentage
/// here (spec §3), while the rest of the pipeline scores it on a 0-1 scale
/// internally alongside `validationRate`.
#[derive(Serialize)]
struct LevelDto {
    price: f64,
    level_type: LevelType,
    touches: usize,
    first_touch: DateTime<Utc>,
    last_touch: DateTime<Utc>,
    validation_rate: f64,
    validated: bool,
    strength: u8,
    breakout_probability: f64,
    volume: Option<f64>,
    volume_percentile: Option<f64>,
    has_volume_confirmation: bool,
    projected_valid_until: Option<DateTime<Utc>>,
    projected_validity_probability: Option<f64>,
    projected_strength: Option<f64>,
}

impl From<&core_types::PriceLevel> for LevelDto {
    fn from(l: &core_types::PriceLevel) -> Self {
        Self {
            price: l.price,
            level_type: l.level_type,
            touches: l.touches,
            first_touch: l.first_touch,
            last_touch: l.last_touch,
            validation_rate: l.validation_rate,
            validated: l.validated,
            strength: l.strength,
            breakout_probability: (l.breakout_probability * 100.0).clamp(0.0, 100.0),
            volume: l.volume,
            volume_percentile: l.volume_percentile,
            has_volume_confirmation: l.has_volume_confirmation,
            projected_valid_until: l.projected_valid_until,
            projected_validity_probability: l.projected_validity_probability,
            projected_strength: l.projected_strength,
        }
    }
}

#[derive(Serialize)]
struct DetectionResponse {
    symbol: String,
    current_price: f64,
    support_levels: Vec<LevelDto>,
    resistance_levels: Vec<LevelDto>,
    predicted_levels: Vec<PredictedLevel>,
    summary_keys: Vec<String>,
    bar_source: String,
    bars_analyzed: usize,
    processing_time_ms: u64,
    status: Status,
}

impl From<LevelDetectionResult> for DetectionResponse {
    fn from(r: LevelDetectionResult) -> Self {
        Self {
            support_levels: r.support.iter().map(LevelDto::from).collect(),
            resistance_levels: r.resistance.iter().map(LevelDto::from).collect(),
            predicted_levels: r.predicted,
            symbol: r.symbol,
            current_price: r.current_price,
            summary_keys: r.summary_keys,
            bar_source: r.bar_source,
            bars_analyzed: r.bars_analyzed,
            processing_time_ms: r.processing_time_ms,
            status: r.status,
        }
    }
}

async fn get_levels(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<LevelsQuery>,
) -> Result<Json<DetectionResponse>, AppError> {
    let params = build_params(
        &state,
        query.min_strength,
        query.max_levels,
        query.timeframe.as_deref(),
        query.project_future,
        query.lookback_days,
    )?;
    let result = state.sr_agent.process(&symbol.to_uppercase(), params).await?;
    Ok(Json(result.into()))
}

async fn detect_levels(
    State(state): State<AppState>,
    Json(req): Json<DetectRequest>,
) -> Result<Json<DetectionResponse>, AppError> {
    let params = build_params(
        &state,
        req.min_strength,
        req.max_levels,
        req.timeframe.as_deref(),
        req.project_future,
        req.lookback_days,
    )?;
    let result = state.sr_agent.process(&req.symbol.to_uppercase(), params).await?;
    Ok(Json(result.into()))
}

#[derive(Serialize)]
struct BatchEntry {
    symbol: String,
    result: Option<DetectionResponse>,
    error: Option<String>,
}

async fn batch_detect_levels(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Vec<BatchEntry>>, AppError> {
    let params = build_params(
        &state,
        req.min_strength,
        req.max_levels,
        req.timeframe.as_deref(),
        req.project_future,
        req.lookback_days,
    )?;
    let symbols: Vec<String> = req.symbols.iter().map(|s| s.to_uppercase()).collect();
    let results = state.sr_agent.detect_batch(&symbols, params, req.parallel).await;

    let entries = results
        .into_iter()
        .map(|(symbol, result)| match result {
            Ok(r) => BatchEntry { symbol, result: Some(r.into()), error: None },
            Err(e) => BatchEntry { symbol, result: None, error: Some(e.to_string()) },
        })
        .collect();

    Ok(Json(entries))
}

#[derive(Serialize)]
struct NearestLevelsResponse {
    symbol: String,
    current_price: f64,
    nearest_support: Option<LevelDto>,
    nearest_resistance: Option<LevelDto>,
}

async fn nearest_levels(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<LevelsQuery>,
) -> Result<Json<NearestLevelsResponse>, AppError> {
    let params = build_params(
        &state,
        query.min_strength,
        query.max_levels,
        query.timeframe.as_deref(),
        query.project_future,
        query.lookback_days,
    )?;
    let symbol = symbol.to_uppercase();
    let result = state.sr_agent.process(&symbol, params).await?;

    // `support`/`resistance` are already sorted by strength descending; pick
    // the strongest level on each side that actually brackets the current
    // price, falling back to the strongest overall if none does.
    let nearest_support = result
        .support
        .iter()
        .filter(|l| l.price < result.current_price)
        .max_by(|a, b| a.price.partial_cmp(&b.price).unwrap())
        .or_else(|| result.support.first())
        .map(LevelDto::from);

    let nearest_resistance = result
        .resistance
        .iter()
        .filter(|l| l.price > result.current_price)
        .min_by(|a, b| a.price.partial_cmp(&b.price).unwrap())
        .or_else(|| result.resistance.first())
        .map(LevelDto::from);

    Ok(Json(NearestLevelsResponse {
        symbol,
        current_price: result.current_price,
        nearest_support,
        nearest_resistance,
    }))
}

async fn levels_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health = state.sr_agent.health_check().await;
    Json(serde_json::json!({ "status": "ok", "agent": health }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use llm_sentiment::{LLMSentimentAgent, MockLLMClient};
    use news_collectors::MockCollector;
    use news_fetch_agent::NewsFetchAgent;
    use sentiment_aggregator::SentimentAggregator;
    use std::sync::Arc;

    fn mock_state() -> AppState {
        AppState {
            news_fetch_agent: Arc::new(NewsFetchAgent::new(vec![Arc::new(MockCollector::new())])),
            llm_sentiment_agent: Arc::new(LLMSentimentAgent::new(Arc::new(MockLLMClient::new()), 0.85)),
            sentiment_aggregator: Arc::new(SentimentAggregator::new()),
            sr_agent: Arc::new(sr_agent::SupportResistanceAgent::mock()),
            config: Arc::new(core_types::AppConfig::default()),
        }
    }

    #[tokio::test]
    async fn get_levels_scales_breakout_probability_to_a_percentage() {
        let state = mock_state();
        let query = LevelsQuery {
            min_strength: None,
            max_levels: None,
            timeframe: None,
            project_future: None,
            projection_periods: None,
            lookback_days: None,
        };
        let Json(resp) = get_levels(State(state), Path("AAPL".to_string()), Query(query)).await.unwrap();
        assert_eq!(resp.symbol, "AAPL");
        for level in resp.support_levels.iter().chain(resp.resistance_levels.iter()) {
            assert!((0.0..=100.0).contains(&level.breakout_probability));
        }
    }

    #[tokio::test]
    async fn get_levels_rejects_unsupported_timeframe() {
        let state = mock_state();
        let query = LevelsQuery {
            min_strength: None,
            max_levels: None,
            timeframe: Some("3d".to_string()),
            project_future: None,
            projection_periods: None,
            lookback_days: None,
        };
        let err = get_levels(State(state), Path("AAPL".to_string()), Query(query)).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_detect_isolates_failures_per_symbol() {
        let state = mock_state();
        let req = BatchRequest {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            min_strength: None,
            max_levels: None,
            timeframe: None,
            project_future: None,
            lookback_days: None,
            parallel: false,
        };
        let Json(entries) = batch_detect_levels(State(state), Json(req)).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.error.is_none() && e.result.is_some()));
    }

    #[tokio::test]
    async fn nearest_levels_brackets_current_price() {
        let state = mock_state();
        let query = LevelsQuery {
            min_strength: None,
            max_levels: None,
            timeframe: None,
            project_future: None,
            projection_periods: None,
            lookback_days: None,
        };
        let Json(resp) = nearest_levels(State(state), Path("AAPL".to_string()), Query(query)).await.unwrap();
        // Either side may be empty (no levels detected at all), and the
        // bracketing fallback can hand back the strongest level on that side
        // even if it doesn't bracket the price, so only finiteness is assured.
        if let Some(support) = &resp.nearest_support {
            assert!(support.price.is_finite());
        }
        if let Some(resistance) = &resp.nearest_resistance {
            assert!(resistance.price.is_finite());
        }
    }
}
