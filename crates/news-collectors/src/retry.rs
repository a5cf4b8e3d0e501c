use std::time::Duration;

use core_types::AnalysisError;

/// Retries `op` with exponential backoff (initial 1s, factor 2, max 60s, capped at 3
/// retries), matching the original `retry_with_backoff` decorator. Only connection
/// errors are worth retrying here — protocol errors (bad JSON shape) are not.
pub async fn with_backoff<F, Fut, T>(mut op: F) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AnalysisError>>,
{
    const MAX_RETRIES: u32 = 3;
    const INITIAL_DELAY: Duration = Duration::from_secs(1);
    const FACTOR: u32 = 2;
    const MAX_DELAY: Duration = Duration::from_secs(60);

    let mut delay = INITIAL_DELAY;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(AnalysisError::CollectorConnectionError(msg)) if attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::warn!(attempt, %msg, "collector connection error, retrying");
                tokio::time::sleep(delay).await;
                delay = (delay * FACTOR).min(MAX_DELAY);
            }
            Err(other) => return Err(other),
        }
    }
}
