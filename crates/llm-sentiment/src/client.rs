use async_trait::async_trait;
use core_types::{AnalysisError, Article, SentimentLabel};
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

use crate::prompt::PromptTemplates;

/// Raw model output before it is stamped with `cached`/`processed_at` (§3).
#[derive(Debug, Clone)]
pub struct SentimentResult {
    pub score: f64,
    pub label: SentimentLabel,
    pub confidence: f64,
    pub reasoning: String,
}

/// Backend-agnostic sentiment inference (§4.5). Implemented by the deterministic
/// Mock variant and the HTTP-backed real variant.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn analyze_sentiment(
        &self,
        article: &Article,
        symbol: &str,
    ) -> Result<SentimentResult, AnalysisError>;

    fn backend_name(&self) -> &'static str;
}

const STRONG_POSITIVE: &[&str] = &[
    "surge", "soar", "record", "beat", "breakthrough", "rally", "outperform", "upgrade",
];
const MODERATE_POSITIVE: &[&str] = &["gain", "rise", "growth", "positive", "improve", "strong"];
const STRONG_NEGATIVE: &[&str] = &[
    "plunge", "crash", "collapse", "fraud", "lawsuit", "downgrade", "miss", "bankruptcy",
];
const MODERATE_NEGATIVE: &[&str] = &["decline", "fall", "weak", "concern", "loss", "drop"];

/// Deterministic pseudo-sentiment generator driven purely by keyword counts, so
/// the pipeline is fully exercisable with no external API keys.
pub struct MockLLMClient;

impl MockLLMClient {
    pub fn new() -> Self {
        Self
    }

    fn count_matches(haystack: &str, words: &[&str]) -> usize {
        words.iter().filter(|w| haystack.contains(*w)).count()
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn analyze_sentiment(
        &self,
        article: &Article,
        _symbol: &str,
    ) -> Result<SentimentResult, AnalysisError> {
        let haystack = format!(
            "{} {}",
            article.title,
            article.content.as_deref().unwrap_or_else(|| article.summary.as_deref().unwrap_or(""))
        )
        .to_lowercase();

        let strong_pos = Self::count_matches(&haystack, STRONG_POSITIVE);
        let mod_pos = Self::count_matches(&haystack, MODERATE_POSITIVE);
        let strong_neg = Self::count_matches(&haystack, STRONG_NEGATIVE);
        let mod_neg = Self::count_matches(&haystack, MODERATE_NEGATIVE);

        let raw_score = (0.15 * strong_pos as f64 + 0.08 * mod_pos as f64)
            - (0.15 * strong_neg as f64 + 0.08 * mod_neg as f64);
        let score = raw_score.clamp(-0.9, 0.9);
        let label = SentimentLabel::from_score(score);

        let total_matches = strong_pos + mod_pos + strong_neg + mod_neg;
        let confidence = (0.4 + 0.1 * total_matches as f64).min(0.95);

        let reasoning = format!(
            "Mock analysis found {total_matches} sentiment-bearing keyword(s), yielding a {} reading.",
            label.as_str()
        );

        Ok(SentimentResult { score, label, confidence, reasoning })
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Debug, Deserialize)]
struct RawLLMJson {
    sentiment_score: f64,
    sentiment_label: Option<String>,
    confidence: f64,
    reasoning: Option<String>,
}

/// Posts the formatted prompt to an HTTP chat/completion endpoint and parses a JSON
/// object out of the free-form reply, falling back to regex extraction.
pub struct HttpLLMClient {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
    company_name: String,
}

impl HttpLLMClient {
    pub fn new(endpoint: String, api_key: String, company_name: String) -> Self {
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build LLM HTTP client"),
            company_name,
        }
    }

    fn extract_json_block(text: &str) -> Option<&str> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end > start {
            Some(&text[start..=end])
        } else {
            None
        }
    }

    fn regex_fallback(text: &str) -> Option<RawLLMJson> {
        let score_re = Regex::new(r#"sentiment_score["\s:]+(-?\d+\.?\d*)"#).ok()?;
        let conf_re = Regex::new(r#"confidence["\s:]+(-?\d+\.?\d*)"#).ok()?;
        let label_re = Regex::new(r#"sentiment_label["\s:]+"(\w+)"#).ok()?;

        let score = score_re.captures(text)?.get(1)?.as_str().parse().ok()?;
        let confidence = conf_re.captures(text)?.get(1)?.as_str().parse().ok()?;
        let label = label_re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());

        Some(RawLLMJson { sentiment_score: score, sentiment_label: label, confidence, reasoning: None })
    }
}

#[async_trait]
impl LLMClient for HttpLLMClient {
    async fn analyze_sentiment(
        &self,
        article: &Article,
        symbol: &str,
    ) -> Result<SentimentResult, AnalysisError> {
        let prompt = PromptTemplates::get_sentiment_prompt(article, symbol, &self.company_name);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| AnalysisError::LLMUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalysisError::LLMUnavailable(format!(
                "LLM endpoint returned HTTP {}",
                response.status()
            )));
        }

        let raw_text = response
            .text()
            .await
            .map_err(|e| AnalysisError::LLMUnavailable(e.to_string()))?;

        let parsed: RawLLMJson = Self::extract_json_block(&raw_text)
            .and_then(|block| serde_json::from_str(block).ok())
            .or_else(|| Self::regex_fallback(&raw_text))
            .ok_or_else(|| AnalysisError::LLMParseError(format!("could not parse LLM reply: {raw_text}")))?;

        let score = parsed.sentiment_score.clamp(-1.0, 1.0);
        let label = parsed
            .sentiment_label
            .as_deref()
            .and_then(|s| match s {
                "positive" => Some(SentimentLabel::Positive),
                "negative" => Some(SentimentLabel::Negative),
                "neutral" => Some(SentimentLabel::Neutral),
                _ => None,
            })
            .unwrap_or_else(|| SentimentLabel::from_score(score));

        Ok(SentimentResult {
            score,
            label,
            confidence: parsed.confidence.clamp(0.0, 1.0),
            reasoning: parsed.reasoning.unwrap_or_else(|| "No reasoning provided by model.".to_string()),
        })
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(title: &str, content: &str) -> Article {
        Article {
            id: "1".into(),
            title: title.into(),
            source: "wire".into(),
            published_at: Utc::now(),
            url: None,
            summary: None,
            content: Some(content.into()),
            relevance_score: 0.0,
        }
    }

    #[tokio::test]
    async fn mock_client_scores_strong_positive_language() {
        let client = MockLLMClient::new();
        let result = client
            .analyze_sentiment(&article("Stock surges to record high", "rally continues"), "AAPL")
            .await
            .unwrap();
        assert!(result.score > 0.3);
        assert_eq!(result.label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn mock_client_scores_strong_negative_language() {
        let client = MockLLMClient::new();
        let result = client
            .analyze_sentiment(&article("Company faces fraud lawsuit after crash", ""), "AAPL")
            .await
            .unwrap();
        assert!(result.score < -0.3);
        assert_eq!(result.label, SentimentLabel::Negative);
    }

    #[test]
    fn extracts_json_block_from_chatty_reply() {
        let text = "Sure, here is the analysis:\n{\"sentiment_score\": 0.5, \"sentiment_label\": \"positive\", \"confidence\": 0.8, \"reasoning\": \"ok\"}\nLet me know if you need more.";
        let block = HttpLLMClient::extract_json_block(text).unwrap();
        assert!(block.starts_with('{'));
        assert!(block.ends_with('}'));
    }
}
