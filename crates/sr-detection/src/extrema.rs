use core_types::{ExtremaPoint, LevelType, OhlcvBar};

/// Finds local peaks/valleys via windowed neighbour comparison, then thins them
/// by minimum spacing and minimum price change (§4.8).
pub struct ExtremaDetector {
    window_size: usize,
    min_distance: usize,
}

impl ExtremaDetector {
    pub fn new(window_size: usize, min_distance: usize) -> Self {
        Self { window_size, min_distance }
    }
}

impl Default for ExtremaDetector {
    fn default() -> Self {
        Self::new(5, 10)
    }
}

impl ExtremaDetector {
    fn detect(&self, bars: &[OhlcvBar], is_peak: bool) -> Vec<ExtremaPoint> {
        let w = self.window_size;
        if bars.len() < 2 * w + 1 {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for i in w..bars.len() - w {
            let value = if is_peak { bars[i].high } else { bars[i].low };
            let is_extremum = (i - w..i).chain(i + 1..=i + w).all(|j| {
                let other = if is_peak { bars[j].high } else { bars[j].low };
                if is_peak {
                    value > other
                } else {
                    value < other
                }
            });
            if is_extremum {
                candidates.push(ExtremaPoint {
                    index: i,
                    timestamp: bars[i].timestamp,
                    price: value,
                    level_type: if is_peak { LevelType::Resistance } else { LevelType::Support },
                });
            }
        }

        self.enforce_min_distance(candidates)
    }

    /// Keeps the earlier of two extrema closer than `min_distance` bars apart.
    fn enforce_min_distance(&self, candidates: Vec<ExtremaPoint>) -> Vec<ExtremaPoint> {
        let mut kept: Vec<ExtremaPoint> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(last) = kept.last() {
                if candidate.index - last.index < self.min_distance {
                    continue;
                }
            }
            kept.push(candidate);
        }
        kept
    }

    pub fn detect_peaks(&self, bars: &[OhlcvBar]) -> Vec<ExtremaPoint> {
        self.detect(bars, true)
    }

    pub fn detect_valleys(&self, bars: &[OhlcvBar]) -> Vec<ExtremaPoint> {
        self.detect(bars, false)
    }

    /// Keeps endpoints and any extremum whose relative price change from the
    /// previously-kept point is at least `min_price_change_pct`.
    pub fn filter_noise(mut extrema: Vec<ExtremaPoint>, min_price_change_pct: f64) -> Vec<ExtremaPoint> {
        if extrema.len() <= 2 {
            return extrema;
        }
        extrema.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));

        let mut kept = vec![extrema[0]];
        for point in &extrema[1..extrema.len() - 1] {
            let last_price = kept.last().unwrap().price;
            if last_price == 0.0 {
                continue;
            }
            let change = ((point.price - last_price) / last_price).abs();
            if change >= min_price_change_pct {
                kept.push(*point);
            }
        }
        kept.push(*extrema.last().unwrap());
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(high: f64, low: f64) -> OhlcvBar {
        OhlcvBar { timestamp: Utc::now(), open: (high + low) / 2.0, high, low, close: (high + low) / 2.0, volume: 1000.0 }
    }

    #[test]
    fn detects_a_clear_peak() {
        let detector = ExtremaDetector::new(2, 1);
        let bars = vec![
            bar(10.0, 9.0),
            bar(11.0, 10.0),
            bar(15.0, 14.0),
            bar(11.0, 10.0),
            bar(10.0, 9.0),
        ];
        let peaks = detector.detect_peaks(&bars);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
    }

    #[test]
    fn min_distance_drops_close_successive_extrema() {
        let detector = ExtremaDetector::new(1, 5);
        let bars = vec![
            bar(10.0, 9.0),
            bar(15.0, 14.0),
            bar(10.0, 9.0),
            bar(16.0, 15.0),
            bar(10.0, 9.0),
        ];
        let peaks = detector.detect_peaks(&bars);
        assert!(peaks.len() <= 1);
    }
}
