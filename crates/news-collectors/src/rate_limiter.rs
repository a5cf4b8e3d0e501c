use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use core_types::AnalysisError;

/// Local sliding-window budget tracker for a single provider limit.
///
/// Unlike the teacher's `polygon-client::RateLimiter`, which blocks the caller and
/// sleeps out a live 429, this tracks a locally-known budget (calls per window) and
/// returns `RateLimitExceeded` the instant the budget is exhausted. A collector that
/// hits this is treated as unavailable for this cycle (§7), not something worth
/// waiting on.
pub struct WindowLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl WindowLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            calls: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    fn prune(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(front) = calls.front() {
            if now.duration_since(*front) > self.window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Returns `Ok(remaining)` and records the call, or `Err` if the budget is spent.
    pub fn try_acquire(&self, provider: &str) -> Result<usize, AnalysisError> {
        let now = Instant::now();
        let mut calls = self.calls.lock().expect("rate limiter mutex poisoned");
        self.prune(&mut calls, now);
        if calls.len() >= self.max_calls {
            return Err(AnalysisError::RateLimitExceeded(format!(
                "{provider}: {}/{} calls used in the current window",
                calls.len(),
                self.max_calls
            )));
        }
        calls.push_back(now);
        Ok(self.max_calls - calls.len())
    }

    pub fn remaining(&self) -> usize {
        let now = Instant::now();
        let mut calls = self.calls.lock().expect("rate limiter mutex poisoned");
        self.prune(&mut calls, now);
        self.max_calls.saturating_sub(calls.len())
    }
}

/// Combines two independent windows (e.g. AlphaVantage's 5/min + 500/day) behind one
/// limiter. `remaining()` and `try_acquire()` both report the more restrictive window.
pub struct CompositeLimiter {
    windows: Vec<WindowLimiter>,
}

impl CompositeLimiter {
    pub fn new(windows: Vec<WindowLimiter>) -> Self {
        Self { windows }
    }

    pub fn try_acquire(&self, provider: &str) -> Result<usize, AnalysisError> {
        // Acquire against every window; if any rejects, none of the prior acquisitions
        // are rolled back (timestamps already pushed are harmless — they just make the
        // next call slightly more conservative, never less).
        let mut min_remaining = usize::MAX;
        for w in &self.windows {
            let remaining = w.try_acquire(provider)?;
            min_remaining = min_remaining.min(remaining);
        }
        Ok(min_remaining)
    }

    pub fn remaining(&self) -> usize {
        self.windows.iter().map(|w| w.remaining()).min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_limiter_exhausts_and_reports() {
        let limiter = WindowLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.try_acquire("test").is_ok());
        assert!(limiter.try_acquire("test").is_ok());
        assert!(limiter.try_acquire("test").is_err());
    }

    #[test]
    fn composite_limiter_uses_tightest_window() {
        let limiter = CompositeLimiter::new(vec![
            WindowLimiter::new(5, Duration::from_secs(60)),
            WindowLimiter::new(1, Duration::from_secs(86_400)),
        ]);
        assert!(limiter.try_acquire("av").is_ok());
        assert!(limiter.try_acquire("av").is_err());
    }
}
