//! Seams between the episode pipeline and the services it depends on.
//!
//! Each call either returns a usable artifact or an error; the orchestrator
//! treats every error as fatal for the run.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::PodcastConfig;
use crate::models::{Article, EpisodeRecord, ScriptDraft};

#[async_trait]
pub trait ArticleCollector: Send + Sync {
    async fn collect(&self, search_terms: &[String], max_age_days: i64) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, articles: &[Article], config: &PodcastConfig) -> Result<ScriptDraft>;
}

#[async_trait]
pub trait AudioSynthesizer: Send + Sync {
    /// Render `script` to an audio file named after `episode_slug`
    async fn synthesize(&self, script: &str, episode_slug: &str) -> Result<PathBuf>;
}

#[async_trait]
pub trait FeedPublisher: Send + Sync {
    fn next_episode_number(&self) -> Result<u32>;

    /// Append the episode to the feed; returns where the feed entry lives
    async fn publish(&self, episode: &EpisodeRecord) -> Result<String>;
}
