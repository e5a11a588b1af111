//! Single-episode run: collect, score, deduplicate, select, generate,
//! validate, synthesize, publish.
//!
//! Stages run strictly in order. The first error moves the run to
//! [`Stage::Failed`], removes any script or audio already written and
//! leaves the feed untouched, so an episode is either fully published or
//! not at all.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::collaborators::{ArticleCollector, AudioSynthesizer, FeedPublisher, ScriptGenerator};
use crate::config::PodcastConfig;
use crate::dedup::Deduplicator;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Article, EpisodeRecord, ValidationResult};
use crate::scoring::RelevanceScorer;
use crate::selector::ArticleSelector;
use crate::store::ArticleStore;
use crate::validator::ScriptValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Collecting,
    Scoring,
    Deduplicating,
    Selecting,
    AwaitingScript,
    Validating,
    AwaitingAudio,
    Publishing,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Collecting => "collecting",
            Stage::Scoring => "scoring",
            Stage::Deduplicating => "deduplicating",
            Stage::Selecting => "selecting",
            Stage::AwaitingScript => "awaiting script",
            Stage::Validating => "validating",
            Stage::AwaitingAudio => "awaiting audio",
            Stage::Publishing => "publishing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArticleCounts {
    pub collected: usize,
    pub scored: usize,
    pub deduplicated: usize,
    pub selected: usize,
}

/// Structured summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub failed_stage: Option<Stage>,
    pub reason: Option<String>,
    pub stages: Vec<Stage>,
    pub counts: ArticleCounts,
    pub validation: Option<ValidationResult>,
    pub quality_warning: Option<String>,
    pub episode_number: Option<u32>,
    pub script_path: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub feed_location: Option<String>,
}

impl RunReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            status: RunStatus::Failed,
            failed_stage: None,
            reason: None,
            stages: vec![Stage::Idle],
            counts: ArticleCounts::default(),
            validation: None,
            quality_warning: None,
            episode_number: None,
            script_path: None,
            audio_path: None,
            feed_location: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Success
    }
}

pub struct EpisodeOrchestrator {
    config: PodcastConfig,
    collector: Arc<dyn ArticleCollector>,
    generator: Arc<dyn ScriptGenerator>,
    synthesizer: Arc<dyn AudioSynthesizer>,
    publisher: Arc<dyn FeedPublisher>,
    stage: Stage,
}

impl EpisodeOrchestrator {
    pub fn new(
        config: PodcastConfig,
        collector: Arc<dyn ArticleCollector>,
        generator: Arc<dyn ScriptGenerator>,
        synthesizer: Arc<dyn AudioSynthesizer>,
        publisher: Arc<dyn FeedPublisher>,
    ) -> Self {
        Self {
            config,
            collector,
            generator,
            synthesizer,
            publisher,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run one episode to completion. Never publishes partially.
    pub async fn run(&mut self, now: DateTime<Utc>) -> RunReport {
        let mut report = RunReport::new(now);

        if self.stage.is_terminal() {
            report.reason = Some(format!("orchestrator already ran (stage: {})", self.stage));
            report.failed_stage = Some(self.stage);
            return report;
        }

        match self.execute(now, &mut report).await {
            Ok(()) => {
                self.advance(Stage::Done, &mut report);
                report.status = RunStatus::Success;
                info!(
                    episode = ?report.episode_number,
                    feed = ?report.feed_location,
                    "episode published"
                );
            }
            Err(e) => {
                let failed_at = self.stage;
                error!(stage = %failed_at, error = %e, "episode run failed");
                self.discard_artifacts(&mut report);
                self.advance(Stage::Failed, &mut report);
                report.status = RunStatus::Failed;
                report.failed_stage = Some(failed_at);
                report.reason = Some(e.to_string());
            }
        }

        report
    }

    async fn execute(&mut self, now: DateTime<Utc>, report: &mut RunReport) -> PipelineResult<()> {
        let config = self.config.clone();

        self.advance(Stage::Collecting, report);
        let collected = self
            .collector
            .collect(&config.search_terms(), config.content.max_article_age_days)
            .await
            .map_err(|e| PipelineError::external("article collector", e))?;
        report.counts.collected = collected.len();

        let mut store = ArticleStore::new();
        store.extend(collected);
        if store.is_empty() {
            return Err(PipelineError::InsufficientArticles {
                reason: "the collector returned no usable articles".to_string(),
            });
        }
        info!(articles = store.len(), sources = ?store.source_counts(), "articles collected");

        self.advance(Stage::Scoring, report);
        store.score_all(&RelevanceScorer::from_config(&config), now)?;
        report.counts.scored = store.len();

        self.advance(Stage::Deduplicating, report);
        let unique = Deduplicator::new(config.content.duplicate_threshold).deduplicate(store.into_articles());
        report.counts.deduplicated = unique.len();

        self.advance(Stage::Selecting, report);
        let selected = ArticleSelector::new(config.content.min_relevance_score)
            .select(unique, config.content.max_articles_per_episode)?;
        report.counts.selected = selected.len();
        info!(selected = selected.len(), "articles selected for the episode");

        self.advance(Stage::AwaitingScript, report);
        let draft = self
            .generator
            .generate(&selected, &config)
            .await
            .map_err(|e| PipelineError::external("script generator", e))?;
        if draft.text.trim().is_empty() {
            return Err(PipelineError::external(
                "script generator",
                anyhow::anyhow!("returned an empty script"),
            ));
        }

        self.advance(Stage::Validating, report);
        let validation = ScriptValidator::from_config(&config).validate(&draft.text, &config.episode.segments);
        for warning in &validation.warnings {
            warn!(warning = %warning, "script validation");
        }
        let quality = validation.overall_quality;
        report.validation = Some(validation.clone());

        if quality < config.episode.min_quality_score {
            let breach = PipelineError::ScriptQualityBelowThreshold {
                score: quality,
                minimum: config.episode.min_quality_score,
            };
            if config.episode.fail_on_low_quality || !breach.is_warning() {
                return Err(breach);
            }
            warn!(error = %breach, "continuing with a below-threshold script");
            report.quality_warning = Some(breach.to_string());
        }

        let episode_slug = format!("{}_episode_{}", config.podcast.slug(), now.format("%Y%m%d_%H%M%S"));
        fs::create_dir_all(&config.output.output_dir)?;
        let script_path = config.output.output_dir.join(format!("{}_script.md", episode_slug));
        // Recorded first so a partial write is cleaned up with the other artifacts
        report.script_path = Some(script_path.clone());
        fs::write(&script_path, &draft.text)?;
        info!(path = %script_path.display(), "script saved");

        self.advance(Stage::AwaitingAudio, report);
        let audio_path = self
            .synthesizer
            .synthesize(&draft.text, &episode_slug)
            .await
            .map_err(|e| PipelineError::external("audio synthesizer", e))?;
        report.audio_path = Some(audio_path.clone());
        info!(path = %audio_path.display(), "audio rendered");

        self.advance(Stage::Publishing, report);
        let number = self
            .publisher
            .next_episode_number()
            .map_err(|e| PipelineError::external("feed publisher", e))?;
        let record = build_record(&config, number, now, &selected, &validation, script_path, audio_path);
        let feed_location = self
            .publisher
            .publish(&record)
            .await
            .map_err(|e| PipelineError::external("feed publisher", e))?;

        report.episode_number = Some(number);
        report.feed_location = Some(feed_location);
        Ok(())
    }

    fn advance(&mut self, next: Stage, report: &mut RunReport) {
        info!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
        report.stages.push(next);
    }

    fn discard_artifacts(&self, report: &mut RunReport) {
        for path in [report.script_path.take(), report.audio_path.take()].into_iter().flatten() {
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed artifact from failed run"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "could not remove artifact"),
            }
        }
    }
}

fn build_record(
    config: &PodcastConfig,
    number: u32,
    now: DateTime<Utc>,
    articles: &[Article],
    validation: &ValidationResult,
    script_path: PathBuf,
    audio_path: PathBuf,
) -> EpisodeRecord {
    let headlines = articles
        .iter()
        .take(3)
        .map(|a| a.title.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    EpisodeRecord {
        number,
        title: format!("Episode {}: {}", number, now.format("%B %-d, %Y")),
        description: format!("{} This episode: {}.", config.podcast.description, headlines),
        audio_path: audio_path.display().to_string(),
        script_path: script_path.display().to_string(),
        published_at: now,
        duration_seconds: (validation.estimated_duration_minutes * 60.0).round() as u64,
        articles: articles.to_vec(),
    }
}
