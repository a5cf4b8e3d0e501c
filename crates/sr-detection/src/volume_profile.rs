use core_types::{stats::percentile, LevelType, OhlcvBar, PriceLevel};

const BIN_COUNT: usize = 50;
const HIGH_VOLUME_PERCENTILE: f64 = 60.0;
const MERGE_TOLERANCE: f64 = 0.02;

/// A single price bucket of the volume profile.
#[derive(Debug, Clone, Copy)]
pub struct VolumeBin {
    pub price_low: f64,
    pub price_high: f64,
    pub volume: f64,
}

impl VolumeBin {
    pub fn midpoint(&self) -> f64 {
        (self.price_low + self.price_high) / 2.0
    }
}

/// Builds a volume-at-price histogram and cross-references it against
/// cluster-derived price levels (§4.11).
pub struct VolumeProfiler {
    bin_count: usize,
}

impl VolumeProfiler {
    pub fn new(bin_count: usize) -> Self {
        Self { bin_count: bin_count.max(1) }
    }
}

impl Default for VolumeProfiler {
    fn default() -> Self {
        Self::new(BIN_COUNT)
    }
}

impl VolumeProfiler {
    /// Builds the profile, distributing each bar's volume across every bin its
    /// high/low range overlaps, weighted by the fraction of the bar's range
    /// that falls in that bin.
    pub fn build_profile(&self, bars: &[OhlcvBar]) -> Vec<VolumeBin> {
        if bars.is_empty() {
            return Vec::new();
        }

        let lo = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let hi = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        if hi <= lo {
            return Vec::new();
        }

        let width = (hi - lo) / self.bin_count as f64;
        let mut bins: Vec<VolumeBin> = (0..self.bin_count)
            .map(|i| VolumeBin {
                price_low: lo + i as f64 * width,
                price_high: lo + (i + 1) as f64 * width,
                volume: 0.0,
            })
            .collect();

        for bar in bars {
            let bar_range = (bar.high - bar.low).max(f64::EPSILON);
            for bin in bins.iter_mut() {
                let overlap_low = bar.low.max(bin.price_low);
                let overlap_high = bar.high.min(bin.price_high);
                if overlap_high > overlap_low {
                    let fraction = (overlap_high - overlap_low) / bar_range;
                    bin.volume += bar.volume * fraction;
                }
            }
        }

        bins
    }

    /// Bins at or above the `HIGH_VOLUME_PERCENTILE` of bin volumes — "high
    /// volume nodes".
    pub fn high_volume_nodes<'a>(&self, bins: &'a [VolumeBin]) -> Vec<&'a VolumeBin> {
        if bins.is_empty() {
            return Vec::new();
        }
        let volumes: Vec<f64> = bins.iter().map(|b| b.volume).collect();
        let threshold = percentile(&volumes, HIGH_VOLUME_PERCENTILE);
        bins.iter().filter(|b| b.volume >= threshold).collect()
    }

    /// Turns high-volume nodes into `PriceLevel`s classified by whether they sit
    /// above or below the current close.
    pub fn detect_volume_levels(&self, bars: &[OhlcvBar], current_close: f64) -> Vec<PriceLevel> {
        let profile = self.build_profile(bars);
        let nodes = self.high_volume_nodes(&profile);

        nodes
            .into_iter()
            .map(|bin| {
                let price = bin.midpoint();
                let level_type = if price >= current_close { LevelType::Resistance } else { LevelType::Support };
                let touches = bars
                    .iter()
                    .filter(|b| b.low <= bin.price_high && b.high >= bin.price_low)
                    .count();
                PriceLevel {
                    price,
                    level_type,
                    touches,
                    first_touch: bars.first().map(|b| b.timestamp).unwrap_or_else(chrono::Utc::now),
                    last_touch: bars.last().map(|b| b.timestamp).unwrap_or_else(chrono::Utc::now),
                    validation_rate: 0.0,
                    validated: false,
                    strength: 0,
                    breakout_probability: 0.0,
                    volume: Some(bin.volume),
                    volume_percentile: None,
                    has_volume_confirmation: true,
                    projected_valid_until: None,
                    projected_validity_probability: None,
                    projected_strength: None,
                }
            })
            .collect()
    }

    /// Merges volume-derived levels into cluster-derived ones: any existing
    /// level within `MERGE_TOLERANCE` of a volume level is annotated with its
    /// volume data rather than duplicated; unmatched volume levels are appended.
    pub fn merge_with_price_levels(mut levels: Vec<PriceLevel>, volume_levels: Vec<PriceLevel>) -> Vec<PriceLevel> {
        for vol_level in volume_levels {
            let existing = levels.iter_mut().find(|l| {
                let tolerance = l.price * MERGE_TOLERANCE;
                (l.price - vol_level.price).abs() <= tolerance
            });
            match existing {
                Some(matched) => {
                    matched.volume = vol_level.volume;
                    matched.has_volume_confirmation = true;
                }
                None => levels.push(vol_level),
            }
        }
        levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(high: f64, low: f64, volume: f64) -> OhlcvBar {
        OhlcvBar { timestamp: Utc::now(), open: (high + low) / 2.0, high, low, close: (high + low) / 2.0, volume }
    }

    #[test]
    fn profile_concentrates_volume_where_bars_overlap() {
        let profiler = VolumeProfiler::new(10);
        let bars = vec![
            bar(101.0, 99.0, 10_000.0),
            bar(101.0, 99.0, 10_000.0),
            bar(151.0, 149.0, 100.0),
        ];
        let profile = profiler.build_profile(&bars);
        assert_eq!(profile.len(), 10);
        let nodes = profiler.high_volume_nodes(&profile);
        assert!(nodes.iter().any(|b| b.midpoint() < 110.0));
    }

    #[test]
    fn merge_annotates_existing_level_instead_of_duplicating() {
        let existing = PriceLevel {
            price: 100.0,
            level_type: LevelType::Support,
            touches: 3,
            first_touch: Utc::now(),
            last_touch: Utc::now(),
            validation_rate: 0.6,
            validated: true,
            strength: 50,
            breakout_probability: 0.1,
            volume: None,
            volume_percentile: None,
            has_volume_confirmation: false,
            projected_valid_until: None,
            projected_validity_probability: None,
            projected_strength: None,
        };
        let volume_level = PriceLevel { price: 100.5, volume: Some(50_000.0), ..existing.clone() };
        let merged = VolumeProfiler::merge_with_price_levels(vec![existing], vec![volume_level]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].has_volume_confirmation);
        assert_eq!(merged[0].volume, Some(50_000.0));
    }
}
