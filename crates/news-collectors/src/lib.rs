pub mod alpha_vantage;
pub mod collector;
pub mod date_range;
pub mod duplicate_filter;
pub mod finnhub;
pub mod mock;
pub mod newsapi;
pub mod rate_limiter;
pub mod relevance_filter;
pub mod retry;

pub use alpha_vantage::AlphaVantageCollector;
pub use collector::{ApiUsage, Collector};
pub use date_range::DateRangeCalculator;
pub use duplicate_filter::DuplicateFilter;
pub use finnhub::FinnhubCollector;
pub use mock::MockCollector;
pub use newsapi::NewsApiCollector;
pub use relevance_filter::RelevanceFilter;
