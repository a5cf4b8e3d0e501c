use chrono::{DateTime, Duration, Utc};
use core_types::{LevelType, OhlcvBar, PredictedLevel, PredictionSource, PriceLevel};

const FIBONACCI_RATIOS: &[f64] = &[0.236, 0.382, 0.5, 0.618, 0.786];
const FIBONACCI_LOOKBACK_BARS: usize = 50;
const FIBONACCI_PROXIMITY: f64 = 0.10;
const PSYCHOLOGICAL_STEP: f64 = 10.0;
const MERGE_TOLERANCE: f64 = 0.01;

/// Projects how much longer a validated level is likely to hold, and proposes
/// brand-new forward-looking candidate levels that haven't been touched yet
/// (§4.13).
pub struct LevelProjector;

impl LevelProjector {
    /// Lifespan band (days) and monthly strength decay (points), by strength tier.
    fn band(strength: u8) -> (i64, f64) {
        match strength {
            70..=100 => (120, 5.0),
            40..=69 => (60, 8.0),
            _ => (30, 10.0),
        }
    }

    /// Annotates `level.projected_valid_until`, `.projected_validity_probability`,
    /// and `.projected_strength` based on the level's current strength and age.
    pub fn project_level_validity(&self, level: &mut PriceLevel, now: DateTime<Utc>) {
        let (lifespan_days, monthly_decay) = Self::band(level.strength);
        let age_days = (now - level.last_touch).num_days().max(0) as f64;

        let validity_probability = (1.0 - age_days / lifespan_days as f64).clamp(0.0, 1.0);
        let months_elapsed = age_days / 30.0;
        let decayed_strength = (level.strength as f64 - monthly_decay * months_elapsed).max(0.0);

        level.projected_valid_until = Some(level.last_touch + Duration::days(lifespan_days));
        level.projected_validity_probability = Some(validity_probability);
        level.projected_strength = Some(decayed_strength);
    }

    pub fn project_all(&self, levels: &mut [PriceLevel], now: DateTime<Utc>) {
        for level in levels.iter_mut() {
            self.project_level_validity(level, now);
        }
    }

    /// Combines Fibonacci retracements, round numbers, and historical bar
    /// spacing into forward-looking candidate levels near the current price.
    /// Never merged into the validated `PriceLevel` set.
    pub fn predict_future_levels(&self, bars: &[OhlcvBar], current_price: f64) -> Vec<PredictedLevel> {
        let mut predicted = Vec::new();
        predicted.extend(Self::fibonacci_levels(bars, current_price));
        predicted.extend(Self::round_number_levels(current_price));
        if let Some(spacing_level) = Self::spacing_level(bars, current_price) {
            predicted.push(spacing_level);
        }

        let deduped = Self::dedupe(predicted);
        let mut sorted = deduped;
        sorted.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
        sorted
    }

    fn fibonacci_levels(bars: &[OhlcvBar], current_price: f64) -> Vec<PredictedLevel> {
        let window = &bars[bars.len().saturating_sub(FIBONACCI_LOOKBACK_BARS)..];
        if window.is_empty() {
            return Vec::new();
        }
        let swing_high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let swing_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let span = swing_high - swing_low;
        if span <= 0.0 {
            return Vec::new();
        }

        FIBONACCI_RATIOS
            .iter()
            .map(|ratio| swing_high - span * ratio)
            .filter(|price| ((price - current_price) / current_price).abs() <= FIBONACCI_PROXIMITY)
            .map(|price| PredictedLevel {
                price,
                level_type: if price >= current_price { LevelType::Resistance } else { LevelType::Support },
                source: PredictionSource::Fibonacci,
                confidence: 0.5,
                projected_timeframe: 30,
            })
            .collect()
    }

    fn round_number_levels(current_price: f64) -> Vec<PredictedLevel> {
        let base = (current_price / PSYCHOLOGICAL_STEP).round() * PSYCHOLOGICAL_STEP;
        [base - PSYCHOLOGICAL_STEP, base, base + PSYCHOLOGICAL_STEP]
            .into_iter()
            .filter(|&price| price > 0.0)
            .map(|price| PredictedLevel {
                price,
                level_type: if price >= current_price { LevelType::Resistance } else { LevelType::Support },
                source: PredictionSource::RoundNumber,
                confidence: 0.4,
                projected_timeframe: 30,
            })
            .collect()
    }

    /// A single projected level at the mean historical gap between consecutive
    /// closes, away from the current price in the direction of recent drift.
    fn spacing_level(bars: &[OhlcvBar], current_price: f64) -> Option<PredictedLevel> {
        if bars.len() < 2 {
            return None;
        }
        let gaps: Vec<f64> = bars.windows(2).map(|w| (w[1].close - w[0].close).abs()).collect();
        let mean_gap = core_types::stats::mean(&gaps);
        if mean_gap <= 0.0 {
            return None;
        }
        let drift_up = bars.last().unwrap().close >= bars.first().unwrap().close;
        let price = if drift_up { current_price + mean_gap } else { current_price - mean_gap };
        if price <= 0.0 {
            return None;
        }
        Some(PredictedLevel {
            price,
            level_type: if drift_up { LevelType::Resistance } else { LevelType::Support },
            source: PredictionSource::SpacingPattern,
            confidence: 0.3,
            projected_timeframe: 14,
        })
    }

    fn dedupe(mut levels: Vec<PredictedLevel>) -> Vec<PredictedLevel> {
        levels.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap());
        let mut kept: Vec<PredictedLevel> = Vec::with_capacity(levels.len());
        for level in levels {
            if let Some(last) = kept.last_mut() {
                let tolerance = last.price * MERGE_TOLERANCE;
                if (level.price - last.price).abs() <= tolerance {
                    if level.confidence > last.confidence {
                        *last = level;
                    }
                    continue;
                }
            }
            kept.push(level);
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(strength: u8, last_touch: DateTime<Utc>) -> PriceLevel {
        PriceLevel {
            price: 100.0,
            level_type: LevelType::Support,
            touches: 3,
            first_touch: last_touch,
            last_touch,
            validation_rate: 0.6,
            validated: true,
            strength,
            breakout_probability: 0.1,
            volume: None,
            volume_percentile: None,
            has_volume_confirmation: false,
            projected_valid_until: None,
            projected_validity_probability: None,
            projected_strength: None,
        }
    }

    #[test]
    fn stronger_levels_get_longer_projected_lifespan() {
        let projector = LevelProjector;
        let now = Utc::now();
        let mut strong = level(85, now - Duration::days(10));
        let mut weak = level(20, now - Duration::days(10));
        projector.project_level_validity(&mut strong, now);
        projector.project_level_validity(&mut weak, now);
        assert!(strong.projected_valid_until.unwrap() > weak.projected_valid_until.unwrap());
    }

    #[test]
    fn fibonacci_levels_stay_within_proximity_band() {
        let bars: Vec<OhlcvBar> = (0..60)
            .map(|i| {
                let price = 90.0 + i as f64;
                OhlcvBar { timestamp: Utc::now(), open: price, high: price + 1.0, low: price - 1.0, close: price, volume: 1_000.0 }
            })
            .collect();
        let projector = LevelProjector;
        let current_price = bars.last().unwrap().close;
        let predicted = projector.predict_future_levels(&bars, current_price);
        for p in &predicted {
            assert!(((p.price - current_price) / current_price).abs() <= 0.5);
        }
    }

    #[test]
    fn dedupe_keeps_higher_confidence_candidate() {
        let levels = vec![
            PredictedLevel { price: 100.0, level_type: LevelType::Resistance, source: PredictionSource::RoundNumber, confidence: 0.4, projected_timeframe: 30 },
            PredictedLevel { price: 100.5, level_type: LevelType::Resistance, source: PredictionSource::Fibonacci, confidence: 0.5, projected_timeframe: 30 },
        ];
        let deduped = LevelProjector::dedupe(levels);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].source, PredictionSource::Fibonacci);
    }
}
