use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One collected news item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub body_text: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub matched_keywords: BTreeSet<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, source: impl Into<String>, body_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            url: None,
            body_text: body_text.into(),
            published_at: None,
            relevance_score: 0.0,
            matched_keywords: BTreeSet::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn published(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.relevance_score = score;
        self
    }
}

/// A named keyword set and the weight its matches carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub name: String,
    pub keywords: Vec<String>,
    pub weight: f64,
}

impl PriorityRule {
    pub fn new(name: impl Into<String>, keywords: &[&str], weight: f64) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            weight,
        }
    }
}

/// Generated script text as returned by the script generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDraft {
    pub text: String,
}

impl ScriptDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Quality metrics computed over a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub word_count: usize,
    pub estimated_duration_minutes: f64,
    pub segment_completeness: f64,
    pub missing_segments: Vec<String>,
    pub overall_quality: f64,
    pub warnings: Vec<String>,
}

/// A published episode, as appended to the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub number: u32,
    pub title: String,
    pub description: String,
    pub audio_path: String,
    pub script_path: String,
    pub published_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub articles: Vec<Article>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_json_only_needs_a_title() {
        let article: Article = serde_json::from_str(r#"{"title": "Schott Music names new CEO"}"#)
            .expect("minimal article should parse");
        assert_eq!(article.title, "Schott Music names new CEO");
        assert!(article.published_at.is_none());
        assert_eq!(article.relevance_score, 0.0);
        assert!(article.matched_keywords.is_empty());
    }
}
