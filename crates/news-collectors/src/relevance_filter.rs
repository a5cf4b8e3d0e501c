use core_types::Article;

/// Symbol → [symbol, primary company name, product/subsidiary aliases].
///
/// A small static table covering the fixtures shipped with the Mock collector;
/// unknown symbols fall back to scoring against the bare ticker only.
fn keyword_table(symbol: &str) -> Vec<String> {
    let sym = symbol.to_uppercase();
    let mut keywords = vec![sym.clone()];
    match sym.as_str() {
        "AAPL" => keywords.extend(["Apple".to_string(), "iPhone".to_string(), "Apple Inc".to_string()]),
        "MSFT" => keywords.extend(["Microsoft".to_string(), "Azure".to_string(), "Windows".to_string()]),
        "GOOGL" | "GOOG" => keywords.extend(["Google".to_string(), "Alphabet".to_string()]),
        "AMZN" => keywords.extend(["Amazon".to_string(), "AWS".to_string()]),
        "TSLA" => keywords.extend(["Tesla".to_string()]),
        "META" => keywords.extend(["Meta".to_string(), "Facebook".to_string(), "Instagram".to_string()]),
        _ => {}
    }
    keywords
}

/// Scores and filters articles for relevance to a symbol (§4.2).
pub struct RelevanceFilter;

impl RelevanceFilter {
    /// Scores every article in place, setting `relevanceScore` per the weighted
    /// keyword-overlap formula: primary keywords (symbol + first company name)
    /// weigh 0.7, secondary keywords weigh 0.3, with title/content boosts and a
    /// 0.35 floor once any keyword matches anywhere.
    pub fn score_articles(articles: &mut [Article], symbol: &str) {
        let keywords = keyword_table(symbol);
        if keywords.is_empty() {
            return;
        }
        let primary = &keywords[..keywords.len().min(2)];
        let secondary = if keywords.len() > 2 { &keywords[2..] } else { &[] };

        for article in articles.iter_mut() {
            article.relevance_score = Self::score_one(article, &keywords, primary, secondary, symbol);
        }
    }

    fn score_one(
        article: &Article,
        all_keywords: &[String],
        primary: &[String],
        secondary: &[String],
        symbol: &str,
    ) -> f64 {
        let title = article.title.to_lowercase();
        let body = format!(
            "{} {}",
            article.summary.as_deref().unwrap_or(""),
            article.content.as_deref().unwrap_or("")
        )
        .to_lowercase();
        let haystack = format!("{title} {body}");

        let any_match = |kw: &str| haystack.contains(&kw.to_lowercase());

        let mut score = 0.0;
        if primary.iter().any(|k| any_match(k)) {
            score += 0.7;
        }
        if secondary.iter().any(|k| any_match(k)) {
            score += 0.3;
        }

        if title.contains(&symbol.to_lowercase()) {
            score *= 1.8;
        } else if all_keywords.iter().take(3).any(|k| title.contains(&k.to_lowercase())) {
            score *= 1.5;
        } else if primary.iter().any(|k| body.contains(&k.to_lowercase())) {
            score *= 1.2;
        }

        if all_keywords.iter().any(|k| any_match(k)) && score < 0.35 {
            score = 0.35;
        }

        score.clamp(0.0, 1.0)
    }

    pub fn filter_by_threshold(articles: Vec<Article>, min: f64) -> Vec<Article> {
        articles.into_iter().filter(|a| a.relevance_score >= min).collect()
    }

    pub fn sort_by_relevance(mut articles: Vec<Article>, desc: bool) -> Vec<Article> {
        if desc {
            articles.sort_by(|a, b| {
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.published_at.cmp(&b.published_at))
            });
        } else {
            articles.sort_by(|a, b| {
                a.relevance_score
                    .partial_cmp(&b.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        articles
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
            source: "test".into(),
            published_at: Utc::now(),
            url: None,
            summary: None,
            content: Some(content.into()),
            relevance_score: 0.0,
        }
    }

    #[test]
    fn title_match_gets_strong_boost() {
        let mut articles = vec![article("Apple AAPL surges on earnings", "")];
        RelevanceFilter::score_articles(&mut articles, "AAPL");
        assert!(articles[0].relevance_score > 0.9);
    }

    #[test]
    fn no_keyword_match_scores_zero() {
        let mut articles = vec![article("Completely unrelated headline", "nothing here")];
        RelevanceFilter::score_articles(&mut articles, "AAPL");
        assert_eq!(articles[0].relevance_score, 0.0);
    }

    #[test]
    fn any_match_floors_at_035() {
        let mut articles = vec![article("Market roundup", "Apple mentioned briefly in passing")];
        RelevanceFilter::score_articles(&mut articles, "AAPL");
        assert!(articles[0].relevance_score >= 0.35);
    }

    #[test]
    fn threshold_filter_drops_low_scores() {
        let articles = vec![
            Article { relevance_score: 0.2, ..article("a", "") },
            Article { relevance_score: 0.6, ..article("b", "") },
        ];
        let filtered = RelevanceFilter::filter_by_threshold(articles, 0.3);
        assert_eq!(filtered.len(), 1);
    }
}
