pub mod cache;

pub use cache::{DetectionCache, DetectionCacheKey};

use async_trait::async_trait;
use chrono::Utc;
use core_types::{
    Agent, AnalysisError, ExtremaPoint, HealthStatus, LevelType, PredictedLevel, PriceLevel,
    Status, Timeframe,
};
use futures_util::stream::{self, StreamExt};
use ml_level_scorer::MlLevelScorer;
use sr_detection::{
    DataLoader, DbscanClusterer, ExtremaDetector, LevelProjector, LevelValidator,
    StrengthCalculator, VolumeProfiler,
};
use std::time::Instant;

const NOISE_FILTER_PCT: f64 = 0.005;
const MAX_EXTREMA_PER_SIDE: usize = 500;
const MIN_TOUCHES: usize = 1;
const BATCH_PARALLEL_THRESHOLD: usize = 5;
const BATCH_MAX_CONCURRENCY: usize = 10;

#[derive(Debug, Clone)]
pub struct LevelDetectionParams {
    pub min_strength: u8,
    pub max_levels: usize,
    pub timeframe: Timeframe,
    pub project_future: bool,
    pub lookback_days: Option<i64>,
}

impl Default for LevelDetectionParams {
    fn default() -> Self {
        Self {
            min_strength: 0,
            max_levels: 10,
            timeframe: Timeframe::Day1,
            project_future: false,
            lookback_days: None,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LevelDetectionResult {
    pub symbol: String,
    pub current_price: f64,
    pub support: Vec<PriceLevel>,
    pub resistance: Vec<PriceLevel>,
    pub predicted: Vec<PredictedLevel>,
    pub summary_keys: Vec<String>,
    pub bar_source: String,
    pub bars_analyzed: usize,
    pub processing_time_ms: u64,
    pub status: Status,
}

impl LevelDetectionResult {
    fn insufficient_data(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            current_price: 0.0,
            support: Vec::new(),
            resistance: Vec::new(),
            predicted: Vec::new(),
            summary_keys: Vec::new(),
            bar_source: "none".to_string(),
            bars_analyzed: 0,
            processing_time_ms: 0,
            status: Status::Error,
        }
    }
}

/// Detects, validates, scores, and optionally projects support/resistance
/// levels for a symbol, orchestrating the modules in `sr-detection` (§4.14).
pub struct SupportResistanceAgent {
    data_loader: DataLoader,
    extrema_detector: ExtremaDetector,
    clusterer: DbscanClusterer,
    validator: LevelValidator,
    strength_calculator: StrengthCalculator,
    volume_profiler: VolumeProfiler,
    projector: LevelProjector,
    ml_scorer: MlLevelScorer,
    cache: DetectionCache<LevelDetectionResult>,
}

impl SupportResistanceAgent {
    pub fn new(data_loader: DataLoader, ml_scorer: MlLevelScorer) -> Self {
        Self {
            data_loader,
            extrema_detector: ExtremaDetector::default(),
            clusterer: DbscanClusterer::default(),
            validator: LevelValidator::default(),
            strength_calculator: StrengthCalculator,
            volume_profiler: VolumeProfiler::default(),
            projector: LevelProjector,
            ml_scorer,
            cache: DetectionCache::new(),
        }
    }

    pub fn mock() -> Self {
        Self::new(DataLoader::mock(), MlLevelScorer::disabled())
    }

    fn min_bars_required(timeframe: Timeframe, lookback_days: i64) -> usize {
        match timeframe {
            Timeframe::Day1 => 50usize.max((0.6 * lookback_days as f64) as usize),
            _ => 50usize.min(lookback_days.max(0) as usize),
        }
    }

    /// Keeps the `max_count` extrema whose price deviates most from the
    /// current price, preserving their original (chronological) order.
    fn cap_by_significance(extrema: Vec<ExtremaPoint>, current_price: f64, max_count: usize) -> Vec<ExtremaPoint> {
        if extrema.len() <= max_count {
            return extrema;
        }
        let mut ranked: Vec<(usize, f64)> = extrema
            .iter()
            .enumerate()
            .map(|(i, e)| (i, (e.price - current_price).abs()))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        ranked.truncate(max_count);

        let mut keep: Vec<usize> = ranked.into_iter().map(|(i, _)| i).collect();
        keep.sort_unstable();
        keep.into_iter().map(|i| extrema[i]).collect()
    }

    async fn detect_uncached(
        &self,
        symbol: &str,
        params: &LevelDetectionParams,
    ) -> Result<LevelDetectionResult, AnalysisError> {
        let started = Instant::now();
        let lookback_days = params.lookback_days.unwrap_or_else(|| params.timeframe.default_lookback_days());
        let end = Utc::now();
        let start = end - chrono::Duration::days(lookback_days);

        let (bars, source) = self.data_loader.load_ohlcv(symbol, Some(start), Some(end), params.timeframe).await?;

        let min_required = Self::min_bars_required(params.timeframe, lookback_days);
        if bars.len() < min_required {
            tracing::warn!(
                "{symbol}: only {} bars available, need {min_required} for {}",
                bars.len(),
                params.timeframe.as_str()
            );
            return Ok(LevelDetectionResult::insufficient_data(symbol));
        }

        let current_price = bars.last().unwrap().close;

        let peaks = self.extrema_detector.detect_peaks(&bars);
        let valleys = self.extrema_detector.detect_valleys(&bars);
        let peaks = ExtremaDetector::filter_noise(peaks, NOISE_FILTER_PCT);
        let valleys = ExtremaDetector::filter_noise(valleys, NOISE_FILTER_PCT);
        let peaks = Self::cap_by_significance(peaks, current_price, MAX_EXTREMA_PER_SIDE);
        let valleys = Self::cap_by_significance(valleys, current_price, MAX_EXTREMA_PER_SIDE);

        let mut resistance = self.clusterer.cluster_levels(&peaks);
        let mut support = self.clusterer.cluster_levels(&valleys);
        resistance = DbscanClusterer::filter_clusters(resistance, MIN_TOUCHES);
        support = DbscanClusterer::filter_clusters(support, MIN_TOUCHES);

        self.validator.validate_all(&mut support, &bars);
        self.validator.validate_all(&mut resistance, &bars);

        let now = Utc::now();
        self.strength_calculator.score_all(&mut support, now);
        self.strength_calculator.score_all(&mut resistance, now);

        let volume_levels = self.volume_profiler.detect_volume_levels(&bars, current_price);
        let (volume_support, volume_resistance): (Vec<_>, Vec<_>) =
            volume_levels.into_iter().partition(|l| l.level_type == LevelType::Support);
        support = VolumeProfiler::merge_with_price_levels(support, volume_support);
        resistance = VolumeProfiler::merge_with_price_levels(resistance, volume_resistance);

        // Volume-only levels just appended above still carry default
        // validation/strength; re-run both passes so nothing escapes scoring.
        self.validator.validate_all(&mut support, &bars);
        self.validator.validate_all(&mut resistance, &bars);
        self.strength_calculator.score_all(&mut support, now);
        self.strength_calculator.score_all(&mut resistance, now);

        for level in support.iter_mut().chain(resistance.iter_mut()) {
            level.breakout_probability = StrengthCalculator::calculate_breakout_probability(level, current_price);
            level.breakout_probability = self.ml_scorer.blend_breakout_probability(level, &bars, params.timeframe);
        }

        let predicted = if params.project_future {
            self.projector.project_all(&mut support, now);
            self.projector.project_all(&mut resistance, now);
            self.projector.predict_future_levels(&bars, current_price)
        } else {
            Vec::new()
        };

        support.retain(|l| l.strength >= params.min_strength);
        resistance.retain(|l| l.strength >= params.min_strength);
        support.sort_by(|a, b| b.strength.cmp(&a.strength));
        resistance.sort_by(|a, b| b.strength.cmp(&a.strength));
        support.truncate(params.max_levels);
        resistance.truncate(params.max_levels);

        let summary_keys = support.iter().chain(resistance.iter()).map(|l| l.summary_key()).collect();

        Ok(LevelDetectionResult {
            symbol: symbol.to_string(),
            current_price,
            support,
            resistance,
            predicted,
            summary_keys,
            bar_source: source.as_str().to_string(),
            bars_analyzed: bars.len(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            status: Status::Success,
        })
    }

    /// Detects levels for many symbols. Sequential unless `parallel` is set and
    /// there are enough symbols to make a worker pool worthwhile; concurrency is
    /// capped so one batch request can't exhaust the data provider. Per-symbol
    /// failures are isolated and reported individually.
    pub async fn detect_batch(
        &self,
        symbols: &[String],
        params: LevelDetectionParams,
        parallel: bool,
    ) -> Vec<(String, Result<LevelDetectionResult, AnalysisError>)> {
        let concurrency = if parallel && symbols.len() > BATCH_PARALLEL_THRESHOLD {
            symbols.len().min(BATCH_MAX_CONCURRENCY)
        } else {
            1
        };

        stream::iter(symbols.iter().cloned())
            .map(|symbol| {
                let params = params.clone();
                async move {
                    let result = self.process(&symbol, params).await;
                    (symbol, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await
    }
}

#[async_trait]
impl Agent for SupportResistanceAgent {
    type Params = LevelDetectionParams;
    type Output = LevelDetectionResult;

    async fn init(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    async fn process(&self, symbol: &str, params: LevelDetectionParams) -> Result<LevelDetectionResult, AnalysisError> {
        let key = DetectionCacheKey::new(
            symbol,
            params.min_strength,
            params.max_levels,
            params.timeframe,
            params.project_future,
            params.lookback_days,
        );
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let result = self.detect_uncached(symbol, &params).await?;
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::ok("sr-agent", serde_json::json!({ "cache_size": self.cache.len() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_detection_round_trips_through_cache() {
        let agent = SupportResistanceAgent::mock();
        let params = LevelDetectionParams::default();
        let first = agent.process("AAPL", params.clone()).await.unwrap();
        assert_eq!(first.status, Status::Success);
        assert!(first.bars_analyzed > 0);

        let second = agent.process("AAPL", params).await.unwrap();
        assert_eq!(second.processing_time_ms, first.processing_time_ms);
    }

    #[tokio::test]
    async fn batch_detection_isolates_per_symbol_results() {
        let agent = SupportResistanceAgent::mock();
        let symbols = vec!["AAPL".to_string(), "MSFT".to_string(), "GOOGL".to_string()];
        let results = agent.detect_batch(&symbols, LevelDetectionParams::default(), false).await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }
}
