use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::{PipelineError, PipelineResult};
use crate::models::Article;
use crate::scoring::RelevanceScorer;

/// In-memory collection of the articles gathered for one run.
///
/// Scores are written exactly once through [`ArticleStore::score_all`];
/// after that the store only hands articles out.
#[derive(Debug, Default)]
pub struct ArticleStore {
    articles: Vec<Article>,
    scored: bool,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut article: Article) -> PipelineResult<()> {
        if self.scored {
            return Err(PipelineError::AlreadyScored);
        }

        article.title = article.title.trim().to_string();
        if article.title.is_empty() {
            return Err(PipelineError::InvalidArticle(format!(
                "article from '{}' has an empty title",
                article.source
            )));
        }

        self.articles.push(article);
        Ok(())
    }

    /// Insert every valid article, skipping the rest. Returns how many were kept.
    pub fn extend(&mut self, articles: impl IntoIterator<Item = Article>) -> usize {
        let mut accepted = 0;
        for article in articles {
            match self.insert(article) {
                Ok(()) => accepted += 1,
                Err(e) => tracing::warn!(error = %e, "skipping article"),
            }
        }
        accepted
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn is_scored(&self) -> bool {
        self.scored
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn score_all(&mut self, scorer: &RelevanceScorer, now: DateTime<Utc>) -> PipelineResult<()> {
        if self.scored {
            return Err(PipelineError::AlreadyScored);
        }

        for article in &mut self.articles {
            let assessment = scorer.assess(article, now);
            article.relevance_score = assessment.score;
            article.matched_keywords = assessment.matched_keywords;
        }
        self.scored = true;
        Ok(())
    }

    pub fn into_articles(self) -> Vec<Article> {
        self.articles
    }

    pub fn source_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for article in &self.articles {
            let source = if article.source.is_empty() {
                "unknown"
            } else {
                article.source.as_str()
            };
            *counts.entry(source.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriorityRule;
    use chrono::Duration;

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(
            vec![PriorityRule::new("Deals", &["acquires"], 2.0)],
            Duration::days(7),
            0.5,
        )
    }

    #[test]
    fn blank_titles_are_rejected() {
        let mut store = ArticleStore::new();
        let err = store.insert(Article::new("   ", "Billboard", "body")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArticle(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn extend_skips_invalid_articles() {
        let mut store = ArticleStore::new();
        let accepted = store.extend(vec![
            Article::new("Hal Leonard acquires XYZ", "Billboard", ""),
            Article::new("", "Billboard", ""),
            Article::new("Yousician raises funds", "", ""),
        ]);
        assert_eq!(accepted, 2);
        assert_eq!(store.len(), 2);

        let counts = store.source_counts();
        assert_eq!(counts.get("Billboard"), Some(&1));
        assert_eq!(counts.get("unknown"), Some(&1));
    }

    #[test]
    fn scores_are_assigned_exactly_once() {
        let now = Utc::now();
        let mut store = ArticleStore::new();
        store
            .insert(Article::new("Hal Leonard acquires XYZ", "Billboard", "").published(now))
            .unwrap();

        store.score_all(&scorer(), now).unwrap();
        assert!(store.is_scored());
        assert_eq!(store.articles()[0].relevance_score, 2.0);
        assert!(store.articles()[0].matched_keywords.contains("acquires"));

        assert!(matches!(store.score_all(&scorer(), now), Err(PipelineError::AlreadyScored)));
        assert!(matches!(
            store.insert(Article::new("Late arrival", "Wire", "")),
            Err(PipelineError::AlreadyScored)
        ));
    }
}
