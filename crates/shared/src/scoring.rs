//! Weighted keyword relevance scoring with linear recency decay.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::config::PodcastConfig;
use crate::models::{Article, PriorityRule};

/// Per-rule match counts stop contributing past this many hits.
pub const MATCH_CAP: usize = 3;
pub const MAX_SCORE: f64 = 10.0;

/// Score plus the keywords that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub score: f64,
    pub matched_keywords: BTreeSet<String>,
}

pub struct RelevanceScorer {
    rules: Vec<PriorityRule>,
    max_age: Duration,
    recency_floor: f64,
}

impl RelevanceScorer {
    pub fn new(rules: Vec<PriorityRule>, max_age: Duration, recency_floor: f64) -> Self {
        Self {
            rules,
            max_age,
            recency_floor: recency_floor.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &PodcastConfig) -> Self {
        Self::new(
            config.priority_rules(),
            Duration::days(config.content.max_article_age_days),
            config.content.recency_floor,
        )
    }

    pub fn score(&self, article: &Article, now: DateTime<Utc>) -> f64 {
        self.assess(article, now).score
    }

    pub fn assess(&self, article: &Article, now: DateTime<Utc>) -> Assessment {
        let recency = self.recency_multiplier(article.published_at, now);
        let text = format!("{}\n{}", article.title, article.body_text).to_lowercase();

        let mut matched_keywords = BTreeSet::new();
        let mut raw = 0.0;

        for rule in &self.rules {
            let mut hits = 0;
            for keyword in &rule.keywords {
                let count = count_occurrences(&text, &keyword.to_lowercase());
                if count > 0 {
                    matched_keywords.insert(keyword.clone());
                    hits += count;
                }
            }
            raw += hits.min(MATCH_CAP) as f64 * rule.weight;
        }

        let score = if recency == 0.0 {
            0.0
        } else {
            (raw * recency).clamp(0.0, MAX_SCORE)
        };

        Assessment {
            score,
            matched_keywords,
        }
    }

    /// 1.0 when fresh, falling linearly to the floor at the maximum age, 0 beyond it.
    /// Undated articles get the floor.
    fn recency_multiplier(&self, published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(published_at) = published_at else {
            return self.recency_floor;
        };

        let age = (now - published_at).max(Duration::zero());
        if age > self.max_age {
            return 0.0;
        }

        let max_secs = self.max_age.num_seconds().max(1) as f64;
        let fraction = age.num_seconds() as f64 / max_secs;
        1.0 - (1.0 - self.recency_floor) * fraction
    }
}

/// Non-overlapping occurrences of `needle` in `haystack` that sit on word boundaries.
fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }

    haystack
        .match_indices(needle)
        .filter(|(start, matched)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + matched.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(
            vec![
                PriorityRule::new("Deals", &["acquisition", "acquires", "merger"], 2.0),
                PriorityRule::new("Companies", &["Hal Leonard", "Schott Music"], 1.0),
            ],
            Duration::days(7),
            0.5,
        )
    }

    #[test]
    fn fresh_article_gets_full_weight() {
        let article = Article::new("Hal Leonard acquires XYZ", "Billboard", "The acquisition closed today.")
            .published(now());

        let assessment = scorer().assess(&article, now());
        // deals: 2 hits * 2.0, companies: 1 hit * 1.0
        assert_eq!(assessment.score, 5.0);
        assert!(assessment.matched_keywords.contains("acquires"));
        assert!(assessment.matched_keywords.contains("Hal Leonard"));
    }

    #[test]
    fn matching_is_case_insensitive_and_word_bounded() {
        let scorer = RelevanceScorer::new(
            vec![PriorityRule::new("Tech", &["AI"], 1.0)],
            Duration::days(7),
            0.5,
        );
        let article = Article::new("AI tools", "Wire", "Publishers said ai again").published(now());
        // "said" and "again" must not count
        assert_eq!(scorer.score(&article, now()), 2.0);
    }

    #[test]
    fn keyword_stuffing_is_capped() {
        let body = "merger ".repeat(20);
        let article = Article::new("Deal news", "Wire", body).published(now());
        assert_eq!(scorer().score(&article, now()), MATCH_CAP as f64 * 2.0);
    }

    #[test]
    fn score_is_clamped_to_ten() {
        let scorer = RelevanceScorer::new(
            vec![PriorityRule::new("Heavy", &["deal"], 5.0)],
            Duration::days(7),
            0.5,
        );
        let article = Article::new("deal deal deal", "Wire", "").published(now());
        assert_eq!(scorer.score(&article, now()), MAX_SCORE);
    }

    #[test]
    fn recency_decays_linearly_to_the_floor() {
        let article = Article::new("Hal Leonard acquires XYZ", "Billboard", "The acquisition closed.");

        let half_way = article.clone().published(now() - Duration::hours(84));
        assert!((scorer().score(&half_way, now()) - 5.0 * 0.75).abs() < 1e-9);

        let at_limit = article.published(now() - Duration::days(7));
        assert!((scorer().score(&at_limit, now()) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn articles_older_than_max_age_score_zero() {
        for days in [8, 30, 365] {
            let article = Article::new("Hal Leonard acquires XYZ", "Billboard", "merger merger")
                .published(now() - Duration::days(days));
            assert_eq!(scorer().score(&article, now()), 0.0, "age {} days", days);
        }
    }

    #[test]
    fn undated_articles_use_the_floor_and_future_dates_count_as_fresh() {
        let article = Article::new("Schott Music merger", "Wire", "");
        assert_eq!(scorer().score(&article, now()), 1.5);

        let future = article.published(now() + Duration::days(2));
        assert_eq!(scorer().score(&future, now()), 3.0);
    }

    #[test]
    fn scoring_is_deterministic() {
        let article = Article::new("Hal Leonard acquires XYZ", "Billboard", "merger talk")
            .published(now() - Duration::days(3));
        let first = scorer().assess(&article, now());
        let second = scorer().assess(&article, now());
        assert_eq!(first, second);
    }

    #[test]
    fn count_occurrences_handles_phrases_and_unicode() {
        assert_eq!(count_occurrences("bärenreiter and bärenreiter", "bärenreiter"), 2);
        assert_eq!(count_occurrences("the hal leonard catalog", "hal leonard"), 1);
        assert_eq!(count_occurrences("mergers", "merger"), 0);
        assert_eq!(count_occurrences("anything", ""), 0);
    }
}
