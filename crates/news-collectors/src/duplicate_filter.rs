use core_types::Article;

/// Length of the longest common subsequence between two strings.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return 0;
    }
    let mut prev = vec![0usize; m + 1];
    let mut curr = vec![0usize; m + 1];
    for i in 1..=n {
        for j in 1..=m {
            curr[j] = if a[i - 1] == b[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}

/// Normalised LCS ratio on lowercased strings: `2 * lcs_len / (len_a + len_b)`.
fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(&a_chars, &b_chars);
    (2 * lcs) as f64 / (a_chars.len() + b_chars.len()) as f64
}

fn body_of(article: &Article) -> String {
    format!(
        "{} {}",
        article.summary.as_deref().unwrap_or(""),
        article.content.as_deref().unwrap_or("")
    )
}

fn are_duplicates(a: &Article, b: &Article) -> bool {
    if let (Some(ua), Some(ub)) = (&a.url, &b.url) {
        if ua == ub {
            return true;
        }
    }
    if similarity(&a.title, &b.title) >= 0.9 {
        return true;
    }
    similarity(&body_of(a), &body_of(b)) >= 0.85
}

/// Removes near-duplicate articles from a merged set (§4.3).
pub struct DuplicateFilter;

impl DuplicateFilter {
    /// Traversal is stable (first-seen wins) unless `prefer_source` is set, in which
    /// case a duplicate from the preferred source replaces the kept entry.
    pub fn remove_duplicates(articles: Vec<Article>, prefer_source: Option<&str>) -> Vec<Article> {
        let mut kept: Vec<Article> = Vec::with_capacity(articles.len());
        for article in articles {
            if let Some(existing_idx) = kept.iter().position(|k| are_duplicates(k, &article)) {
                if let Some(preferred) = prefer_source {
                    if article.source == preferred && kept[existing_idx].source != preferred {
                        kept[existing_idx] = article;
                    }
                }
                continue;
            }
            kept.push(article);
        }
        kept
    }

    /// Returns index groups of mutually-duplicate articles for diagnostics, relative
    /// to the input slice's own indices.
    pub fn find_duplicates(articles: &[Article]) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut assigned = vec![false; articles.len()];
        for i in 0..articles.len() {
            if assigned[i] {
                continue;
            }
            let mut group = vec![i];
            for j in (i + 1)..articles.len() {
                if !assigned[j] && are_duplicates(&articles[i], &articles[j]) {
                    group.push(j);
                    assigned[j] = true;
                }
            }
            if group.len() > 1 {
                assigned[i] = true;
                groups.push(group);
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(id: &str, title: &str, source: &str, url: Option<&str>) -> Article {
        Article {
            id: id.into(),
            title: title.into(),
            source: source.into(),
            published_at: Utc::now(),
            url: url.map(|s| s.to_string()),
            summary: None,
            content: None,
            relevance_score: 0.0,
        }
    }

    #[test]
    fn identical_url_is_duplicate() {
        let a = article("1", "Headline A", "wire1", Some("http://x/a"));
        let b = article("2", "Totally different headline", "wire2", Some("http://x/a"));
        let kept = DuplicateFilter::remove_duplicates(vec![a, b], None);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn near_identical_title_is_duplicate() {
        let a = article("1", "Apple reports record revenue this quarter", "wire1", None);
        let b = article("2", "Apple reports record revenue this quarter.", "wire2", None);
        let kept = DuplicateFilter::remove_duplicates(vec![a, b], None);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn prefer_source_replaces_kept_entry() {
        let a = article("1", "Apple reports record revenue this quarter", "wire1", None);
        let b = article("2", "Apple reports record revenue this quarter.", "preferred", None);
        let kept = DuplicateFilter::remove_duplicates(vec![a, b], Some("preferred"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source, "preferred");
    }

    #[test]
    fn distinct_articles_are_kept() {
        let a = article("1", "Apple earnings beat expectations", "wire1", None);
        let b = article("2", "Tesla unveils new factory plans", "wire2", None);
        let kept = DuplicateFilter::remove_duplicates(vec![a, b], None);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn idempotent_on_already_deduped_set() {
        let a = article("1", "Apple earnings beat expectations", "wire1", None);
        let b = article("2", "Tesla unveils new factory plans", "wire2", None);
        let once = DuplicateFilter::remove_duplicates(vec![a, b], None);
        let twice = DuplicateFilter::remove_duplicates(once.clone(), None);
        assert_eq!(once.len(), twice.len());
    }
}
