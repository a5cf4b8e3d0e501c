use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("model error: {0}")]
    Model(String),
}

pub type ScorerResult<T> = Result<T, ScorerError>;
