use std::cmp::Ordering;

use crate::error::{PipelineError, PipelineResult};
use crate::models::Article;

/// Ranks scored articles and trims them to the per-episode maximum.
pub struct ArticleSelector {
    min_score: f64,
}

impl ArticleSelector {
    pub fn new(min_score: f64) -> Self {
        Self { min_score }
    }

    /// Highest score first, newer publish date on ties (undated last).
    /// Articles scoring zero or below the minimum are dropped.
    pub fn select(&self, articles: Vec<Article>, max_count: usize) -> PipelineResult<Vec<Article>> {
        let considered = articles.len();
        let mut selected: Vec<Article> = articles
            .into_iter()
            .filter(|a| a.relevance_score > 0.0 && a.relevance_score >= self.min_score)
            .collect();

        if selected.is_empty() {
            return Err(PipelineError::InsufficientArticles {
                reason: format!(
                    "none of {} articles reached the minimum relevance score of {}",
                    considered, self.min_score
                ),
            });
        }

        // sort_by is stable, so full ties keep their input order
        selected.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.published_at.cmp(&a.published_at))
        });
        selected.truncate(max_count);

        tracing::debug!(considered, selected = selected.len(), "articles selected");
        Ok(selected)
    }
}
