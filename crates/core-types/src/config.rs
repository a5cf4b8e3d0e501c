use std::env;

/// Process-wide configuration (§6), loaded once at startup from the environment.
///
/// Grounded in `ml-client`'s `MLConfig::default()` idiom: explicit
/// `env::var(...).unwrap_or_else(...)` per field rather than a generic env-deserialization
/// crate, since the teacher workspace never depends on one.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub use_mock_data: bool,
    pub enable_cache: bool,
    pub similarity_threshold: f64,
    pub cache_ttl_sec: Option<u64>,
    pub finnhub_api_key: Option<String>,
    pub newsapi_key: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub min_relevance_score: f64,
    pub max_articles: usize,
    pub min_strength: u8,
    pub max_levels: usize,
    pub use_time_weighting: bool,
    pub calculate_impact: bool,
    pub use_ml_predictions: bool,
    pub ml_model_path: Option<String>,
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            use_mock_data: env_bool("USE_MOCK_DATA", true),
            enable_cache: env_bool("ENABLE_CACHE", true),
            similarity_threshold: env_f64("SIMILARITY_THRESHOLD", 0.85),
            cache_ttl_sec: env::var("CACHE_TTL_SEC").ok().and_then(|v| v.parse().ok()),
            finnhub_api_key: env::var("FINNHUB_API_KEY").ok(),
            newsapi_key: env::var("NEWSAPI_KEY").ok(),
            alpha_vantage_api_key: env::var("ALPHA_VANTAGE_API_KEY").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            min_relevance_score: env_f64("MIN_RELEVANCE_SCORE", 0.5),
            max_articles: env_usize("MAX_ARTICLES", 50),
            min_strength: env_usize("MIN_STRENGTH", 50) as u8,
            max_levels: env_usize("MAX_LEVELS", 5),
            use_time_weighting: env_bool("USE_TIME_WEIGHTING", true),
            calculate_impact: env_bool("CALCULATE_IMPACT", true),
            use_ml_predictions: env_bool("USE_ML_PREDICTIONS", false),
            ml_model_path: env::var("ML_MODEL_PATH").ok(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if present) then reads the environment, matching the teacher's
    /// `dotenvy::dotenv().ok()`-before-`env::var` bootstrap order.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::default()
    }
}
