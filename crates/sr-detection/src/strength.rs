use chrono::{DateTime, Utc};
use core_types::PriceLevel;

const TOUCH_WEIGHT: f64 = 0.4;
const TIME_WEIGHT: f64 = 0.3;
const REACTION_WEIGHT: f64 = 0.3;

/// Scores a level's durability on a 0-100 scale from three weighted
/// components — touch count, age, and validation (reaction) rate — and derives
/// a breakout probability from strength and proximity to the current price
/// (§4.12).
pub struct StrengthCalculator;

impl StrengthCalculator {
    fn touch_component(touches: usize) -> f64 {
        match touches {
            0 => 0.0,
            1 => 0.2,
            2 => 0.4,
            3 => 0.6,
            4 => 0.8,
            _ => 1.0,
        }
    }

    fn time_component(first_touch: DateTime<Utc>, last_touch: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let span_days = (last_touch - first_touch).num_days().max(0) as f64;
        let age_days = (now - first_touch).num_days().max(0) as f64;

        let span_score = match span_days as i64 {
            0..=6 => 0.3,
            7..=29 => 0.6,
            30..=89 => 0.8,
            _ => 1.0,
        };
        let recency_penalty = if age_days > 180.0 { 0.7 } else { 1.0 };
        (span_score * recency_penalty).min(1.0)
    }

    fn reaction_component(validation_rate: f64) -> f64 {
        validation_rate.clamp(0.0, 1.0)
    }

    /// Writes `level.strength` in place from its own touches/first_touch/
    /// last_touch/validation_rate fields.
    pub fn score(&self, level: &mut PriceLevel, now: DateTime<Utc>) {
        let touch = Self::touch_component(level.touches);
        let time = Self::time_component(level.first_touch, level.last_touch, now);
        let reaction = Self::reaction_component(level.validation_rate);

        let raw = TOUCH_WEIGHT * touch + TIME_WEIGHT * time + REACTION_WEIGHT * reaction;
        level.strength = (raw * 100.0).round().clamp(0.0, 100.0) as u8;
    }

    pub fn score_all(&self, levels: &mut [PriceLevel], now: DateTime<Utc>) {
        for level in levels.iter_mut() {
            self.score(level, now);
        }
    }

    /// Probability that price breaks through the level rather than reversing,
    /// combining how close price already is to the level, how weak the level
    /// is, and which side of the level price currently sits on.
    pub fn calculate_breakout_probability(level: &PriceLevel, current_price: f64) -> f64 {
        let distance_pct = ((current_price - level.price) / level.price).abs();
        let distance_factor = (1.0 - (distance_pct / 0.05).min(1.0)).max(0.0);
        let strength_factor = 1.0 - (level.strength as f64 / 100.0);

        let direction_factor = match level.level_type {
            core_types::LevelType::Resistance if current_price < level.price => 0.6,
            core_types::LevelType::Support if current_price > level.price => 0.4,
            _ => 0.5,
        };

        let probability = 0.4 * distance_factor + 0.4 * strength_factor + 0.2 * direction_factor;
        probability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core_types::LevelType;

    fn level(touches: usize, first_touch: DateTime<Utc>, last_touch: DateTime<Utc>, validation_rate: f64) -> PriceLevel {
        PriceLevel {
            price: 100.0,
            level_type: LevelType::Support,
            touches,
            first_touch,
            last_touch,
            validation_rate,
            validated: validation_rate >= 0.5,
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
    fn more_touches_and_reactions_score_higher() {
        let calc = StrengthCalculator;
        let now = Utc::now();
        let mut weak = level(1, now - Duration::days(5), now - Duration::days(1), 0.2);
        let mut strong = level(6, now - Duration::days(100), now - Duration::days(1), 0.9);
        calc.score(&mut weak, now);
        calc.score(&mut strong, now);
        assert!(strong.strength > weak.strength);
    }

    #[test]
    fn strength_is_clamped_to_0_100() {
        let calc = StrengthCalculator;
        let now = Utc::now();
        let mut lvl = level(10, now - Duration::days(200), now, 1.0);
        calc.score(&mut lvl, now);
        assert!(lvl.strength <= 100);
    }

    #[test]
    fn breakout_probability_rises_as_price_approaches_level() {
        let mut lvl = level(5, Utc::now() - Duration::days(30), Utc::now(), 0.8);
        lvl.strength = 40;
        let far = StrengthCalculator::calculate_breakout_probability(&lvl, 110.0);
        let near = StrengthCalculator::calculate_breakout_probability(&lvl, 100.5);
        assert!(near > far);
    }
}
