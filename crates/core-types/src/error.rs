use thiserror::Error;

/// Error kinds shared by every agent and collector in the pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("collector connection error: {0}")]
    CollectorConnectionError(String),

    #[error("collector protocol error: {0}")]
    CollectorProtocolError(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("LLM unavailable: {0}")]
    LLMUnavailable(String),

    #[error("LLM response parse error: {0}")]
    LLMParseError(String),

    #[error("cache backend unavailable: {0}")]
    CacheBackendUnavailable(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl AnalysisError {
    /// Matches the HTTP mapping in the error-handling design: everything except
    /// `UnsupportedTimeframe` (and client-shape errors surfaced by the facade) is a 500.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::UnsupportedTimeframe(_))
    }
}
