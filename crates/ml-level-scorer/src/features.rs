use core_types::{stats::mean, LevelType, OhlcvBar, PriceLevel, Timeframe};

/// The fixed 12-dimensional feature vector fed to the optional ML scorer.
/// Field order is the contract with the trained model — do not reorder
/// without retraining.
#[derive(Debug, Clone, Copy)]
pub struct LevelFeatures {
    pub normalized_distance: f64,
    pub is_support: f64,
    pub is_resistance: f64,
    pub rule_confidence: f64,
    pub recent_volatility: f64,
    pub trend_sign: f64,
    pub nearby_volume_share: f64,
    pub historical_touch_density: f64,
    pub level_type_sign: f64,
    pub relative_position_50: f64,
    pub timeframe_encoding: f64,
    pub touches_normalized: f64,
}

const TOUCH_NORMALIZATION_CAP: f64 = 20.0;
const RECENT_WINDOW: usize = 20;
const RANGE_WINDOW: usize = 50;

impl LevelFeatures {
    pub fn extract(level: &PriceLevel, bars: &[OhlcvBar], timeframe: Timeframe) -> Self {
        let current_price = bars.last().map(|b| b.close).unwrap_or(level.price);

        let normalized_distance = if current_price > 0.0 {
            ((level.price - current_price) / current_price).abs()
        } else {
            0.0
        };

        let recent = &bars[bars.len().saturating_sub(RECENT_WINDOW)..];
        let returns: Vec<f64> = recent.windows(2).map(|w| (w[1].close - w[0].close) / w[0].close).collect();
        let recent_volatility = if returns.is_empty() {
            0.0
        } else {
            let avg = mean(&returns);
            (returns.iter().map(|r| (r - avg).powi(2)).sum::<f64>() / returns.len() as f64).sqrt()
        };

        let trend_sign = match (recent.first(), recent.last()) {
            (Some(first), Some(last)) if last.close > first.close => 1.0,
            (Some(first), Some(last)) if last.close < first.close => -1.0,
            _ => 0.0,
        };

        let total_volume: f64 = bars.iter().map(|b| b.volume).sum();
        let nearby_volume_share = match level.volume {
            Some(v) if total_volume > 0.0 => v / total_volume,
            _ => 0.0,
        };

        let historical_touch_density = if bars.is_empty() { 0.0 } else { level.touches as f64 / bars.len() as f64 };

        let window = &bars[bars.len().saturating_sub(RANGE_WINDOW)..];
        let range_high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let range_low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let relative_position_50 = if range_high > range_low {
            ((level.price - range_low) / (range_high - range_low)).clamp(0.0, 1.0)
        } else {
            0.5
        };

        Self {
            normalized_distance,
            is_support: if level.level_type == LevelType::Support { 1.0 } else { 0.0 },
            is_resistance: if level.level_type == LevelType::Resistance { 1.0 } else { 0.0 },
            rule_confidence: level.validation_rate,
            recent_volatility,
            trend_sign,
            nearby_volume_share,
            historical_touch_density,
            level_type_sign: if level.level_type == LevelType::Resistance { 1.0 } else { -1.0 },
            relative_position_50,
            timeframe_encoding: Self::timeframe_index(timeframe) as f64 / 9.0,
            touches_normalized: (level.touches as f64 / TOUCH_NORMALIZATION_CAP).min(1.0),
        }
    }

    fn timeframe_index(timeframe: Timeframe) -> u8 {
        match timeframe {
            Timeframe::Minute1 => 0,
            Timeframe::Minute5 => 1,
            Timeframe::Minute15 => 2,
            Timeframe::Minute30 => 3,
            Timeframe::Hour1 => 4,
            Timeframe::Hour4 => 5,
            Timeframe::Day1 => 6,
            Timeframe::Week1 => 7,
            Timeframe::Month1 => 8,
            Timeframe::Year1 => 9,
        }
    }

    pub fn to_vec(self) -> Vec<f64> {
        vec![
            self.normalized_distance,
            self.is_support,
            self.is_resistance,
            self.rule_confidence,
            self.recent_volatility,
            self.trend_sign,
            self.nearby_volume_share,
            self.historical_touch_density,
            self.level_type_sign,
            self.relative_position_50,
            self.timeframe_encoding,
            self.touches_normalized,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(close: f64) -> OhlcvBar {
        OhlcvBar { timestamp: Utc::now(), open: close, high: close + 1.0, low: close - 1.0, close, volume: 1_000.0 }
    }

    fn level() -> PriceLevel {
        PriceLevel {
            price: 100.0,
            level_type: LevelType::Resistance,
            touches: 4,
            first_touch: Utc::now(),
            last_touch: Utc::now(),
            validation_rate: 0.7,
            validated: true,
            strength: 60,
            breakout_probability: 0.3,
            volume: Some(500.0),
            volume_percentile: None,
            has_volume_confirmation: true,
            projected_valid_until: None,
            projected_validity_probability: None,
            projected_strength: None,
        }
    }

    #[test]
    fn extracts_twelve_features() {
        let bars: Vec<OhlcvBar> = (0..60).map(|i| bar(90.0 + i as f64)).collect();
        let features = LevelFeatures::extract(&level(), &bars, Timeframe::Day1);
        assert_eq!(features.to_vec().len(), 12);
        assert_eq!(features.is_resistance, 1.0);
        assert_eq!(features.is_support, 0.0);
    }
}
