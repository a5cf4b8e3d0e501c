pub use core_types::AnalysisError as MLError;
pub type MLResult<T> = Result<T, MLError>;
