use chrono::{DateTime, Utc};
use core_types::{AnalysisError, TimeHorizon};
use std::collections::HashMap;

/// Date range for a news fetch, grounded in the original `DateRangeCalculator`:
/// centralizes the horizon-to-window mapping so every agent asks the same question
/// the same way.
pub struct DateRangeCalculator;

impl DateRangeCalculator {
    /// Calculates `(from, to)` for a horizon, using `TimeHorizon::base_window()` as the
    /// single source of truth for window sizes (§3/§4.4).
    pub fn calculate(horizon: TimeHorizon, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = now - horizon.base_window();
        (from, now)
    }

    /// Parses a raw horizon string and calculates its range, surfacing
    /// `UnsupportedTimeframe` for anything `TimeHorizon::parse` rejects.
    pub fn calculate_str(
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), AnalysisError> {
        let horizon = TimeHorizon::parse(raw)
            .ok_or_else(|| AnalysisError::UnsupportedTimeframe(raw.to_string()))?;
        Ok(Self::calculate(horizon, now))
    }

    /// Expands a window by `multiplier` (default 1.5), keeping `to` fixed and pushing
    /// `from` further back — used when an initial fetch comes back short on articles.
    pub fn expand_window(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        multiplier: f64,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let window = to - from;
        let expanded_secs = (window.num_seconds() as f64 * multiplier).round() as i64;
        let expanded_from = to - chrono::Duration::seconds(expanded_secs);
        (expanded_from, to)
    }

    /// Reformats a date range per-provider, since Finnhub/NewsAPI/AlphaVantage each
    /// expect different date string shapes on the wire.
    pub fn format_for_api(
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        provider: &str,
    ) -> HashMap<&'static str, String> {
        let mut out = HashMap::with_capacity(2);
        match provider {
            "finnhub" => {
                out.insert("from", from.format("%Y-%m-%d").to_string());
                out.insert("to", to.format("%Y-%m-%d").to_string());
            }
            "newsapi" => {
                out.insert("from", from.format("%Y-%m-%dT%H:%M:%S").to_string());
                out.insert("to", to.format("%Y-%m-%dT%H:%M:%S").to_string());
            }
            _ => {
                out.insert("from", from.to_rfc3339());
                out.insert("to", to.to_rfc3339());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn calculate_uses_base_window() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let (from, to) = DateRangeCalculator::calculate(TimeHorizon::Days1, now);
        assert_eq!(to, now);
        assert_eq!(now - from, chrono::Duration::days(3));
    }

    #[test]
    fn expand_window_scales_by_multiplier() {
        let to = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let from = to - chrono::Duration::days(3);
        let (expanded_from, expanded_to) = DateRangeCalculator::expand_window(from, to, 1.5);
        assert_eq!(expanded_to, to);
        assert_eq!(to - expanded_from, chrono::Duration::hours(108)); // 4.5 days
    }

    #[test]
    fn unsupported_horizon_errors() {
        let now = Utc::now();
        assert!(DateRangeCalculator::calculate_str("2d", now).is_err());
    }

    #[test]
    fn format_for_api_finnhub_uses_date_only() {
        let to = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 0).unwrap();
        let from = to - chrono::Duration::days(3);
        let formatted = DateRangeCalculator::format_for_api(from, to, "finnhub");
        assert_eq!(formatted["to"], "2026-01-15");
    }
}
