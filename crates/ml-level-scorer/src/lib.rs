pub mod error;
pub mod features;
#[cfg(feature = "ml")]
mod python;

pub use error::{ScorerError, ScorerResult};
pub use features::LevelFeatures;

use core_types::{OhlcvBar, PriceLevel, Timeframe};

const RULE_WEIGHT: f64 = 0.4;
const ML_WEIGHT: f64 = 0.6;

/// Optional ML-backed breakout-probability scorer. Without the `ml` feature
/// (or without a trained model on disk) this is a pure no-op and the rule-based
/// probability computed by `sr_detection::StrengthCalculator` passes through
/// unchanged.
pub struct MlLevelScorer {
    #[cfg(feature = "ml")]
    model: Option<python::EmbeddedScorerModel>,
}

impl MlLevelScorer {
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "ml")]
            model: None,
        }
    }

    #[cfg(feature = "ml")]
    pub fn load(model_dir: &str) -> Self {
        if !python::has_model_files(model_dir) {
            tracing::info!("ML level scorer: no trained model in {model_dir}, falling back to rule-based scoring");
            return Self { model: None };
        }
        match python::EmbeddedScorerModel::load(model_dir) {
            Ok(model) => {
                tracing::info!("ML level scorer loaded from {model_dir}");
                Self { model: Some(model) }
            }
            Err(e) => {
                tracing::warn!("ML level scorer failed to load from {model_dir}: {e}");
                Self { model: None }
            }
        }
    }

    #[cfg(not(feature = "ml"))]
    pub fn load(_model_dir: &str) -> Self {
        Self::disabled()
    }

    #[cfg(feature = "ml")]
    fn ml_probability(&self, features: &LevelFeatures) -> Option<f64> {
        let model = self.model.as_ref()?;
        match model.predict(features) {
            Ok(p) => Some(p.clamp(0.0, 1.0)),
            Err(e) => {
                tracing::warn!("ML level scorer prediction failed: {e}");
                None
            }
        }
    }

    #[cfg(not(feature = "ml"))]
    fn ml_probability(&self, _features: &LevelFeatures) -> Option<f64> {
        None
    }

    /// Blends the rule-based breakout probability already on `level` with an ML
    /// prediction, `0.4 * rule + 0.6 * ml`. Returns the rule-based value
    /// unchanged when no model is loaded.
    pub fn blend_breakout_probability(&self, level: &PriceLevel, bars: &[OhlcvBar], timeframe: Timeframe) -> f64 {
        let rule_probability = level.breakout_probability;
        let features = LevelFeatures::extract(level, bars, timeframe);
        match self.ml_probability(&features) {
            Some(ml_probability) => (RULE_WEIGHT * rule_probability + ML_WEIGHT * ml_probability).clamp(0.0, 1.0),
            None => rule_probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_types::LevelType;

    fn bar(close: f64) -> OhlcvBar {
        OhlcvBar { timestamp: Utc::now(), open: close, high: close + 1.0, low: close - 1.0, close, volume: 1_000.0 }
    }

    fn level(breakout_probability: f64) -> PriceLevel {
        PriceLevel {
            price: 100.0,
            level_type: LevelType::Resistance,
            touches: 3,
            first_touch: Utc::now(),
            last_touch: Utc::now(),
            validation_rate: 0.6,
            validated: true,
            strength: 50,
            breakout_probability,
            volume: None,
            volume_percentile: None,
            has_volume_confirmation: false,
            projected_valid_until: None,
            projected_validity_probability: None,
            projected_strength: None,
        }
    }

    #[test]
    fn disabled_scorer_passes_rule_probability_through() {
        let scorer = MlLevelScorer::disabled();
        let bars: Vec<OhlcvBar> = (0..10).map(|i| bar(100.0 + i as f64)).collect();
        let lvl = level(0.42);
        let blended = scorer.blend_breakout_probability(&lvl, &bars, Timeframe::Day1);
        assert_eq!(blended, 0.42);
    }
}
