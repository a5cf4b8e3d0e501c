use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prediction time horizon; controls news window, confidence floor, and decay half-life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    #[serde(rename = "1s")]
    Seconds1,
    #[serde(rename = "1m")]
    Minutes1,
    #[serde(rename = "1h")]
    Hours1,
    #[serde(rename = "1d")]
    Days1,
    #[serde(rename = "1w")]
    Weeks1,
    #[serde(rename = "1mo")]
    Months1,
    #[serde(rename = "1y")]
    Years1,
}

impl TimeHorizon {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim().to_lowercase().as_str() {
            "1s" => Self::Seconds1,
            "1m" => Self::Minutes1,
            "1h" => Self::Hours1,
            "1d" => Self::Days1,
            "1w" => Self::Weeks1,
            "1mo" => Self::Months1,
            "1y" => Self::Years1,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seconds1 => "1s",
            Self::Minutes1 => "1m",
            Self::Hours1 => "1h",
            Self::Days1 => "1d",
            Self::Weeks1 => "1w",
            Self::Months1 => "1mo",
            Self::Years1 => "1y",
        }
    }

    /// Per-horizon confidence floor (hard filter) used by LLMSentimentAgent.
    pub fn confidence_threshold(&self) -> f64 {
        match self {
            Self::Seconds1 => 0.8,
            Self::Minutes1 => 0.75,
            Self::Hours1 => 0.7,
            Self::Days1 => 0.65,
            Self::Weeks1 => 0.6,
            Self::Months1 => 0.55,
            Self::Years1 => 0.5,
        }
    }

    /// Per-horizon minimum-article floor (warning-only) used by SentimentAggregator.
    pub fn min_article_floor(&self) -> usize {
        match self {
            Self::Seconds1 => 3,
            Self::Minutes1 => 5,
            Self::Hours1 => 8,
            Self::Days1 => 10,
            Self::Weeks1 => 15,
            Self::Months1 => 20,
            Self::Years1 => 25,
        }
    }

    /// (half_life_hours, max_age_hours) for TimeWeightedAggregator.
    pub fn decay_params(&self) -> (f64, f64) {
        match self {
            Self::Seconds1 | Self::Minutes1 => (0.1, 0.5), // 6min / 30min
            Self::Hours1 => (2.0, 6.0),
            Self::Days1 => (24.0, 72.0),
            Self::Weeks1 => (72.0, 168.0),
            Self::Months1 => (168.0, 720.0),
            Self::Years1 => (720.0, 8760.0),
        }
    }

    /// Base news window as a chrono::Duration.
    pub fn base_window(&self) -> chrono::Duration {
        match self {
            Self::Seconds1 => chrono::Duration::minutes(5),
            Self::Minutes1 => chrono::Duration::minutes(15),
            Self::Hours1 => chrono::Duration::hours(6),
            Self::Days1 => chrono::Duration::days(3),
            Self::Weeks1 => chrono::Duration::days(7),
            Self::Months1 => chrono::Duration::days(30),
            Self::Years1 => chrono::Duration::days(365),
        }
    }
}

/// A candle timeframe accepted by the support/resistance engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
    #[serde(rename = "1mo")]
    Month1,
    #[serde(rename = "1y")]
    Year1,
}

impl Timeframe {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw.trim().to_lowercase().as_str() {
            "1m" => Self::Minute1,
            "5m" => Self::Minute5,
            "15m" => Self::Minute15,
            "30m" => Self::Minute30,
            "1h" => Self::Hour1,
            "4h" => Self::Hour4,
            "1d" => Self::Day1,
            "1w" => Self::Week1,
            "1mo" => Self::Month1,
            "1y" => Self::Year1,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minute1 => "1m",
            Self::Minute5 => "5m",
            Self::Minute15 => "15m",
            Self::Minute30 => "30m",
            Self::Hour1 => "1h",
            Self::Hour4 => "4h",
            Self::Day1 => "1d",
            Self::Week1 => "1w",
            Self::Month1 => "1mo",
            Self::Year1 => "1y",
        }
    }

    /// Default lookback window in days when the caller does not specify one.
    pub fn default_lookback_days(&self) -> i64 {
        match self {
            Self::Minute1 | Self::Minute5 | Self::Minute15 | Self::Minute30 => 30,
            Self::Hour1 | Self::Hour4 => 90,
            Self::Day1 => 730,
            Self::Week1 => 1095,
            Self::Month1 => 1825,
            Self::Year1 => 3650,
        }
    }

    /// Provider history caps (§4.7): minute bars capped tighter than hourly.
    pub fn provider_history_cap_days(&self) -> Option<i64> {
        match self {
            Self::Minute1 | Self::Minute5 | Self::Minute15 | Self::Minute30 => Some(5),
            Self::Hour1 | Self::Hour4 => Some(60),
            _ => None,
        }
    }
}

/// A news article normalised into the standard shape used throughout the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub relevance_score: f64,
}

/// Sentiment label derived from a numeric score via fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// `>0.3 positive, <-0.3 negative, else neutral` (spec §3).
    pub fn from_score(score: f64) -> Self {
        if score > 0.3 {
            Self::Positive
        } else if score < -0.3 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

/// Per-article sentiment score produced by LLMSentimentAgent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentScore {
    pub article_id: String,
    pub symbol: String,
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub reasoning: String,
    pub cached: bool,
    pub processed_at: DateTime<Utc>,
}

/// Tertiary impact classification combining sentiment strength, volume, recency, confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ImpactLabel {
    High,
    Medium,
    Low,
}

impl ImpactLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

/// Aggregated sentiment signal for a symbol, produced per request (not persisted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedSentiment {
    pub symbol: String,
    pub aggregated_score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub impact: ImpactLabel,
    pub news_count: usize,
    pub time_weighted: bool,
    pub time_horizon: TimeHorizon,
}

/// A single OHLCV candle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    pub fn is_valid(&self) -> bool {
        self.open > 0.0
            && self.high > 0.0
            && self.low > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Type of a detected price level / extremum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelType {
    Support,
    Resistance,
}

impl LevelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Support => "support",
            Self::Resistance => "resistance",
        }
    }
}

/// A local peak (resistance candidate) or valley (support candidate).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtremaPoint {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub level_type: LevelType,
}

/// Source of a predicted/projected level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Fibonacci,
    RoundNumber,
    SpacingPattern,
}

/// A validated, scored support/resistance level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub level_type: LevelType,
    pub touches: usize,
    pub first_touch: DateTime<Utc>,
    pub last_touch: DateTime<Utc>,
    pub validation_rate: f64,
    pub validated: bool,
    pub strength: u8,
    pub breakout_probability: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub volume_percentile: Option<f64>,
    #[serde(default)]
    pub has_volume_confirmation: bool,
    #[serde(default)]
    pub projected_valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub projected_validity_probability: Option<f64>,
    #[serde(default)]
    pub projected_strength: Option<f64>,
}

impl PriceLevel {
    /// `"$P | Strength: S/100 | SUPPORT|RESISTANCE | Breakout: B%"` summary key (§4.14 step 12).
    pub fn summary_key(&self) -> String {
        format!(
            "${:.2} | Strength: {}/100 | {} | Breakout: {:.0}%",
            self.price,
            self.strength,
            self.level_type.as_str().to_uppercase(),
            self.breakout_probability
        )
    }
}

/// A forward-looking candidate level, never merged into validated PriceLevels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictedLevel {
    pub price: f64,
    pub level_type: LevelType,
    pub source: PredictionSource,
    pub confidence: f64,
    pub projected_timeframe: i64,
}

/// Where a given fetch/load result's data actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Api,
    Mock,
    Unknown,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Mock => "mock",
            Self::Unknown => "unknown",
        }
    }
}

/// Process-wide success/error status, carried on every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}
