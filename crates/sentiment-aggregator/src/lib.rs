use async_trait::async_trait;
use chrono::Utc;
use core_types::{
    Agent, AggregatedSentiment, AnalysisError, HealthStatus, ImpactLabel, SentimentLabel,
    SentimentScore, Status, TimeHorizon,
};

/// Per-horizon exponential-decay weighting of sentiment scores by article age (§4.6).
pub struct TimeWeightedAggregator;

#[derive(Debug, Clone)]
pub struct AggregateOutcome {
    pub aggregated_score: f64,
    pub confidence: f64,
    pub label: SentimentLabel,
    pub weights_applied: Vec<f64>,
    pub total_weight: f64,
}

impl TimeWeightedAggregator {
    /// `w = 0.5^(age_hours / half_life)` if `age_hours <= max_age` else 0.
    pub fn aggregate(scores: &[SentimentScore], horizon: TimeHorizon, now: chrono::DateTime<Utc>) -> AggregateOutcome {
        let (half_life, max_age) = horizon.decay_params();

        let weights: Vec<f64> = scores
            .iter()
            .map(|s| {
                let age_hours = (now - s.processed_at).num_seconds() as f64 / 3600.0;
                if age_hours <= max_age {
                    0.5f64.powf(age_hours / half_life)
                } else {
                    0.0
                }
            })
            .collect();

        let total_weight: f64 = weights.iter().sum();

        let (aggregated_score, confidence) = if total_weight > 0.0 {
            let weighted_score: f64 = scores.iter().zip(&weights).map(|(s, w)| s.score * w).sum();
            let weighted_conf: f64 = scores.iter().zip(&weights).map(|(s, w)| s.confidence * w).sum();
            (weighted_score / total_weight, weighted_conf / total_weight)
        } else if !scores.is_empty() {
            // Fallback to plain mean when every score has aged out of the window.
            let mean_score = scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64;
            let mean_conf = scores.iter().map(|s| s.confidence).sum::<f64>() / scores.len() as f64;
            (mean_score, mean_conf)
        } else {
            (0.0, 0.0)
        };

        AggregateOutcome {
            label: SentimentLabel::from_score(aggregated_score),
            aggregated_score,
            confidence,
            weights_applied: weights,
            total_weight,
        }
    }
}

/// Derives a High/Medium/Low impact classification from an aggregated signal (§4.6).
pub struct ImpactScorer;

impl ImpactScorer {
    pub fn calculate_impact(
        aggregated: f64,
        count: usize,
        recency: Option<f64>,
        confidence: Option<f64>,
    ) -> (f64, ImpactLabel) {
        let score = 0.4 * aggregated.abs()
            + 0.3 * (count as f64 / 20.0).min(1.0)
            + 0.2 * recency.unwrap_or(0.15)
            + 0.1 * confidence.unwrap_or(0.05);

        let label = if score >= 0.7 && count >= 10 {
            ImpactLabel::High
        } else if score >= 0.4 && count >= 5 {
            ImpactLabel::Medium
        } else {
            ImpactLabel::Low
        };

        (score, label)
    }

    /// Mean of the weights the aggregator applied, used as the recency input above.
    pub fn calculate_recency_score(weights: &[f64]) -> f64 {
        core_types::stats::mean(weights)
    }
}

pub struct AggregatorParams {
    pub sentiment_scores: Vec<SentimentScore>,
    pub time_weighted: bool,
    pub time_horizon: TimeHorizon,
}

#[derive(Debug, Clone)]
pub struct AggregatorResult {
    pub aggregated: AggregatedSentiment,
    pub aggregated_at: chrono::DateTime<Utc>,
    pub status: Status,
}

/// Combines TimeWeightedAggregator + ImpactScorer into the per-request sentiment
/// signal for a symbol (§4.6).
pub struct SentimentAggregator;

impl SentimentAggregator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SentimentAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for SentimentAggregator {
    type Params = AggregatorParams;
    type Output = AggregatorResult;

    async fn init(&self) -> Result<(), AnalysisError> {
        Ok(())
    }

    async fn process(&self, symbol: &str, params: AggregatorParams) -> Result<AggregatorResult, AnalysisError> {
        let now = Utc::now();
        let horizon = params.time_horizon;
        let confidence_floor = horizon.confidence_threshold();
        let min_article_floor = horizon.min_article_floor();

        let filtered: Vec<SentimentScore> = params
            .sentiment_scores
            .into_iter()
            .filter(|s| s.confidence >= confidence_floor)
            .collect();

        if filtered.len() < min_article_floor {
            tracing::warn!(
                symbol,
                count = filtered.len(),
                floor = min_article_floor,
                "article count below recommended floor for this horizon"
            );
        }

        if filtered.is_empty() {
            return Ok(AggregatorResult {
                aggregated: AggregatedSentiment {
                    symbol: symbol.to_string(),
                    aggregated_score: 0.0,
                    label: SentimentLabel::Neutral,
                    confidence: 0.0,
                    impact: ImpactLabel::Low,
                    news_count: 0,
                    time_weighted: params.time_weighted,
                    time_horizon: horizon,
                },
                aggregated_at: now,
                status: Status::Success,
            });
        }

        let outcome = if params.time_weighted {
            TimeWeightedAggregator::aggregate(&filtered, horizon, now)
        } else {
            let mean_score = core_types::stats::mean(&filtered.iter().map(|s| s.score).collect::<Vec<_>>());
            let mean_conf = core_types::stats::mean(&filtered.iter().map(|s| s.confidence).collect::<Vec<_>>());
            AggregateOutcome {
                aggregated_score: mean_score,
                confidence: mean_conf,
                label: SentimentLabel::from_score(mean_score),
                weights_applied: vec![1.0; filtered.len()],
                total_weight: filtered.len() as f64,
            }
        };

        let recency = ImpactScorer::calculate_recency_score(&outcome.weights_applied);
        let (_, impact_label) = ImpactScorer::calculate_impact(
            outcome.aggregated_score,
            filtered.len(),
            Some(recency),
            Some(outcome.confidence),
        );

        Ok(AggregatorResult {
            aggregated: AggregatedSentiment {
                symbol: symbol.to_string(),
                aggregated_score: outcome.aggregated_score,
                label: outcome.label,
                confidence: outcome.confidence,
                impact: impact_label,
                news_count: filtered.len(),
                time_weighted: params.time_weighted,
                time_horizon: horizon,
            },
            aggregated_at: now,
            status: Status::Success,
        })
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus::ok("sentiment_aggregator", serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn score(value: f64, confidence: f64, age_hours: i64, now: chrono::DateTime<Utc>) -> SentimentScore {
        SentimentScore {
            article_id: "1".into(),
            symbol: "AAPL".into(),
            score: value,
            label: SentimentLabel::from_score(value),
            confidence,
            reasoning: "test".into(),
            cached: false,
            processed_at: now - Duration::hours(age_hours),
        }
    }

    #[test]
    fn time_weighted_favors_recent_articles() {
        let now = Utc::now();
        let scores = vec![score(0.8, 0.9, 1, now), score(-0.8, 0.9, 71, now)];
        let outcome = TimeWeightedAggregator::aggregate(&scores, TimeHorizon::Days1, now);
        assert!(outcome.aggregated_score > 0.0);
    }

    #[test]
    fn all_aged_out_falls_back_to_mean() {
        let now = Utc::now();
        let scores = vec![score(0.5, 0.9, 1000, now), score(-0.5, 0.9, 1000, now)];
        let outcome = TimeWeightedAggregator::aggregate(&scores, TimeHorizon::Days1, now);
        assert_eq!(outcome.total_weight, 0.0);
        assert_eq!(outcome.aggregated_score, 0.0);
    }

    #[test]
    fn impact_high_requires_both_score_and_count() {
        let (_, label) = ImpactScorer::calculate_impact(0.9, 3, Some(0.9), Some(0.9));
        assert_ne!(label, ImpactLabel::High);
        let (_, label) = ImpactScorer::calculate_impact(0.9, 15, Some(0.9), Some(0.9));
        assert_eq!(label, ImpactLabel::High);
    }

    #[tokio::test]
    async fn empty_input_is_success_with_neutral_defaults() {
        let aggregator = SentimentAggregator::new();
        let result = aggregator
            .process(
                "AAPL",
                AggregatorParams { sentiment_scores: vec![], time_weighted: true, time_horizon: TimeHorizon::Days1 },
            )
            .await
            .unwrap();
        assert_eq!(result.aggregated.news_count, 0);
        assert_eq!(result.aggregated.label, SentimentLabel::Neutral);
        assert_eq!(result.status, Status::Success);
    }
}
