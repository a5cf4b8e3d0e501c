use core_types::Article;

/// Builds the financial-sentiment prompt sent to a real LLM backend (§4.5).
pub struct PromptTemplates;

impl PromptTemplates {
    const MAX_CONTENT_CHARS: usize = 2000;

    pub fn get_sentiment_prompt(article: &Article, symbol: &str, company_name: &str) -> String {
        let body = article
            .content
            .as_deref()
            .or(article.summary.as_deref())
            .unwrap_or("");
        let truncated: String = body.chars().take(Self::MAX_CONTENT_CHARS).collect();

        format!(
            "You are a financial sentiment analyst. Analyze the following news article \
             about {company_name} ({symbol}) and respond with a single JSON object with keys \
             sentiment_score (float, -1 to 1), sentiment_label (\"positive\"|\"neutral\"|\"negative\"), \
             confidence (float, 0 to 1), and reasoning (one sentence).\n\n\
             Title: {title}\n\nContent: {truncated}\n\nRespond with JSON only.",
            title = article.title,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn truncates_long_content() {
        let article = Article {
            id: "1".into(),
            title: "Title".into(),
            source: "wire".into(),
            published_at: Utc::now(),
            url: None,
            summary: None,
            content: Some("x".repeat(3000)),
            relevance_score: 0.0,
        };
        let prompt = PromptTemplates::get_sentiment_prompt(&article, "AAPL", "Apple");
        let content_section = prompt.split("Content: ").nth(1).unwrap();
        let content_only = content_section.split("\n\n").next().unwrap();
        assert!(content_only.len() <= 2000);
    }
}
