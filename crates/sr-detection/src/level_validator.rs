use core_types::{LevelType, OhlcvBar, PriceLevel};

const DEFAULT_TOLERANCE: f64 = 0.005;
const DEFAULT_LOOKFORWARD_BARS: usize = 5;
const LARGE_SERIES_THRESHOLD: usize = 200;
const BATCH_TOP_N: usize = 10;

/// Confirms candidate levels against the bar history that produced them: counts
/// how many touches were followed by a genuine reaction within `lookforward_bars`
/// (§4.10).
pub struct LevelValidator {
    tolerance: f64,
    lookforward_bars: usize,
}

impl LevelValidator {
    pub fn new(tolerance: f64, lookforward_bars: usize) -> Self {
        Self { tolerance, lookforward_bars }
    }
}

impl Default for LevelValidator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_LOOKFORWARD_BARS)
    }
}

impl LevelValidator {
    /// Validates a single level against the full bar series. For series longer
    /// than `LARGE_SERIES_THRESHOLD` bars, skips per-touch reaction counting and
    /// applies a fixed heuristic instead — full validation on that much history
    /// is not worth the cost for a level that has already survived clustering.
    pub fn validate(&self, level: &mut PriceLevel, bars: &[OhlcvBar]) {
        if bars.len() > LARGE_SERIES_THRESHOLD {
            level.validation_rate = 0.5;
            level.validated = false;
            return;
        }

        let touches = self.find_touches(level.price, bars);
        if touches.is_empty() {
            level.validation_rate = 0.0;
            level.validated = false;
            return;
        }

        let reactions = touches
            .iter()
            .filter(|&&idx| self.reacted(level.level_type, level.price, idx, bars))
            .count();

        level.validation_rate = reactions as f64 / touches.len() as f64;
        level.validated = level.validation_rate >= 0.5;
    }

    pub fn validate_all(&self, levels: &mut [PriceLevel], bars: &[OhlcvBar]) {
        for level in levels.iter_mut() {
            self.validate(level, bars);
        }
    }

    /// Restricts validation to the top `BATCH_TOP_N` levels by touch count —
    /// used in the batch detection path where many symbols are processed at once.
    pub fn validate_top_by_touches(&self, levels: &mut Vec<PriceLevel>, bars: &[OhlcvBar]) {
        levels.sort_by(|a, b| b.touches.cmp(&a.touches));
        for level in levels.iter_mut().take(BATCH_TOP_N) {
            self.validate(level, bars);
        }
    }

    fn find_touches(&self, price: f64, bars: &[OhlcvBar]) -> Vec<usize> {
        let band = price * self.tolerance;
        bars.iter()
            .enumerate()
            .filter(|(_, bar)| bar.low - band <= price && price <= bar.high + band)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// A touch "reacted" if price moved away from the level (in the expected
    /// direction) by at least one tolerance band within the lookforward window.
    fn reacted(&self, level_type: LevelType, price: f64, touch_index: usize, bars: &[OhlcvBar]) -> bool {
        let end = (touch_index + self.lookforward_bars + 1).min(bars.len());
        if touch_index + 1 >= end {
            return false;
        }
        let band = price * self.tolerance;
        bars[touch_index + 1..end].iter().any(|bar| match level_type {
            LevelType::Support => bar.close >= price + band,
            LevelType::Resistance => bar.close <= price - band,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar { timestamp: Utc::now(), open, high, low, close, volume: 1_000.0 }
    }

    fn level(price: f64, level_type: LevelType) -> PriceLevel {
        PriceLevel {
            price,
            level_type,
            touches: 1,
            first_touch: Utc::now(),
            last_touch: Utc::now(),
            validation_rate: 0.0,
            validated: false,
            strength: 0,
            breakout_probability: 0.0,
            volume: None,
            volume_percentile: None,
            has_volume_confirmation: false,
            projected_valid_until: None,
            projected_validity_probability: None,
            projected_strength: None,
        }
    }

    #[test]
    fn support_bounce_counts_as_reaction() {
        let validator = LevelValidator::default();
        let bars = vec![
            bar(101.0, 102.0, 100.0, 101.0),
            bar(100.2, 100.5, 99.9, 100.0), // touches 100 support
            bar(100.0, 103.0, 99.9, 102.5), // reacts upward
        ];
        let mut lvl = level(100.0, LevelType::Support);
        validator.validate(&mut lvl, &bars);
        assert!(lvl.validated);
        assert_eq!(lvl.validation_rate, 1.0);
    }

    #[test]
    fn no_touches_means_unvalidated() {
        let validator = LevelValidator::default();
        let bars = vec![bar(200.0, 201.0, 199.0, 200.0)];
        let mut lvl = level(100.0, LevelType::Support);
        validator.validate(&mut lvl, &bars);
        assert!(!lvl.validated);
        assert_eq!(lvl.validation_rate, 0.0);
    }

    #[test]
    fn long_series_uses_fast_path_heuristic() {
        let validator = LevelValidator::default();
        let bars: Vec<OhlcvBar> = (0..250).map(|_| bar(100.0, 101.0, 99.0, 100.0)).collect();
        let mut lvl = level(100.0, LevelType::Support);
        validator.validate(&mut lvl, &bars);
        assert_eq!(lvl.validation_rate, 0.5);
        assert!(!lvl.validated);
    }
}
