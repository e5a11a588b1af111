use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::models::PriorityRule;

const CONFIG_DIR_NAME: &str = "podcast-generator";
const CONFIG_FILE_NAME: &str = "podcast.toml";

/// API credentials, read from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub eleven_labs_api_key: String,
    pub raindrop_api_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        let anthropic_api_key = env::var("ANTHROPIC_API_KEY").context(
            "ANTHROPIC_API_KEY not found.\n\n\
            To fix this, create ~/.config/podcast-generator/.env with:\n  \
            ANTHROPIC_API_KEY=your_key_here\n  \
            ELEVEN_LABS_API_KEY=your_key_here\n\n\
            Get your Anthropic API key from: https://console.anthropic.com/settings/keys",
        )?;

        let eleven_labs_api_key = env::var("ELEVEN_LABS_API_KEY").context(
            "ELEVEN_LABS_API_KEY not found.\n\n\
            To fix this, add ELEVEN_LABS_API_KEY=your_key_here to ~/.config/podcast-generator/.env\n\n\
            Get your ElevenLabs API key from: https://elevenlabs.io",
        )?;

        // Only needed when articles are collected from Raindrop.io
        let raindrop_api_token = env::var("RAINDROP_API_TOKEN").ok();

        Ok(Self {
            anthropic_api_key,
            eleven_labs_api_key,
            raindrop_api_token,
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/podcast-generator/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(CONFIG_DIR_NAME).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

/// Everything that shapes an episode. Loaded once per run and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodcastConfig {
    #[serde(default)]
    pub podcast: PodcastInfo,
    #[serde(default)]
    pub industry: IndustryConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub episode: EpisodeConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Metadata about the show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcastInfo {
    pub name: String,
    pub description: String,
    pub host_name: String,
    pub host_email: String,
    pub website_url: String,
}

impl Default for PodcastInfo {
    fn default() -> Self {
        Self {
            name: "The Music Publishing Beat".to_string(),
            description: "A weekly roundup of major news in music publishing, relevant for executives in the music publishing industry".to_string(),
            host_name: "Podcast Host".to_string(),
            host_email: "host@example.com".to_string(),
            website_url: "https://example.com".to_string(),
        }
    }
}

impl PodcastInfo {
    /// File-name friendly form of the show name, e.g. `the_music_publishing_beat`
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replace(' ', "_")
    }
}

/// One search priority tier. The first tier is the most important.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPriority {
    pub name: String,
    /// Queries handed to the collector
    #[serde(default)]
    pub terms: Vec<String>,
    /// Words and phrases the relevance scorer looks for in article text
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SearchPriority {
    fn new(name: &str, terms: &[&str], keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            terms: terms.iter().map(|s| s.to_string()).collect(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustryConfig {
    pub name: String,
    pub target_audience: String,
    pub companies: Vec<String>,
    pub company_weight: f64,
    pub priorities: Vec<SearchPriority>,
}

impl Default for IndustryConfig {
    fn default() -> Self {
        let companies = [
            "Hal Leonard",
            "Alfred Music",
            "Faber Music",
            "Carl Fischer Music",
            "Theodore Presser Company",
            "Schott Music",
            "Breitkopf & Härtel",
            "Wise Music Group",
            "Music Sales Group",
            "Bärenreiter",
            "Edition Peters",
            "JW Pepper",
            "G. Schirmer",
            "Kjos Music",
            "Belwin-Mills",
            "Boosey & Hawkes",
            "Oxford University Press",
            "Warner Chappell Music",
            "Universal Music Publishing",
            "Sheet Music Plus",
            "Yousician",
        ];

        Self {
            name: "Music Publishing".to_string(),
            target_audience: "Music publishing executives and decision-makers".to_string(),
            companies: companies.iter().map(|s| s.to_string()).collect(),
            company_weight: 2.0,
            priorities: vec![
                SearchPriority::new(
                    "Breaking industry news and major deals",
                    &[
                        "music publishing acquisition",
                        "music publishing merger",
                        "music publishing deal",
                    ],
                    &["acquisition", "acquires", "acquired", "merger", "deal"],
                ),
                SearchPriority::new(
                    "Publishing company updates and executive moves",
                    &[
                        "music publishing executive",
                        "music publishing CEO",
                        "music publishing appointment",
                        "music publishing promotion",
                    ],
                    &["CEO", "executive", "appointed", "appointment", "promoted"],
                ),
                SearchPriority::new(
                    "Technology/AI developments affecting publishing",
                    &[
                        "AI music publishing",
                        "music publishing technology",
                        "digital music publishing",
                    ],
                    &["AI", "artificial intelligence", "technology", "digital", "streaming"],
                ),
                SearchPriority::new(
                    "Market trends and financial reports",
                    &[
                        "music publishing market",
                        "music publishing revenue",
                        "music publishing trends",
                        "music publishing industry report",
                    ],
                    &["market", "revenue", "royalties", "trends", "report"],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub max_article_age_days: i64,
    pub min_relevance_score: f64,
    pub max_articles_per_episode: usize,
    pub duplicate_threshold: f64,
    pub recency_floor: f64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_article_age_days: 7,
            min_relevance_score: 3.0,
            max_articles_per_episode: 15,
            duplicate_threshold: 0.7,
            recency_floor: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    pub target_length_minutes: f64,
    pub segments: Vec<String>,
    pub words_per_minute: f64,
    pub min_word_count: usize,
    pub min_quality_score: f64,
    /// Abort the run instead of warning when quality is below the minimum
    pub fail_on_low_quality: bool,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            target_length_minutes: 8.0,
            segments: vec![
                "Breaking News & Major Deals".to_string(),
                "Executive Moves & Strategic Updates".to_string(),
                "Technology & Innovation".to_string(),
                "Market Intelligence & Trends".to_string(),
                "Executive Takeaways".to_string(),
            ],
            words_per_minute: 150.0,
            min_word_count: 600,
            min_quality_score: 0.6,
            fail_on_low_quality: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub voice_id: String,
    pub model_id: String,
    pub stability: f64,
    pub clarity: f64,
    pub format: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.75,
            clarity: 0.75,
            format: "mp3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub language: String,
    pub category_primary: String,
    pub category_secondary: String,
    pub copyright: String,
    pub feed_file: PathBuf,
    pub state_file: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            language: "en-us".to_string(),
            category_primary: "Business".to_string(),
            category_secondary: "News".to_string(),
            copyright: "All rights reserved".to_string(),
            feed_file: PathBuf::from("static/feed.xml"),
            state_file: PathBuf::from("static/episodes.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub audio_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            audio_dir: PathBuf::from("static/audio"),
        }
    }
}

impl PodcastConfig {
    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PodcastConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or the first `podcast.toml` found in the
    /// current directory or `~/.config/podcast-generator/`, or fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let candidates = [
            Some(PathBuf::from(CONFIG_FILE_NAME)),
            dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)),
        ];

        for candidate in candidates.into_iter().flatten() {
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "loading podcast config");
                return Self::load(&candidate);
            }
        }

        tracing::debug!("no podcast config found, using defaults");
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::Config(msg));

        if self.podcast.name.trim().is_empty() {
            return invalid("podcast.name must not be empty".to_string());
        }
        if self.content.max_article_age_days <= 0 {
            return invalid(format!(
                "content.max_article_age_days must be positive, got {}",
                self.content.max_article_age_days
            ));
        }
        if self.content.max_articles_per_episode == 0 {
            return invalid("content.max_articles_per_episode must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.content.duplicate_threshold) {
            return invalid(format!(
                "content.duplicate_threshold must be within [0, 1], got {}",
                self.content.duplicate_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.content.recency_floor) {
            return invalid(format!(
                "content.recency_floor must be within [0, 1], got {}",
                self.content.recency_floor
            ));
        }
        if self.episode.words_per_minute <= 0.0 {
            return invalid("episode.words_per_minute must be positive".to_string());
        }
        if self.episode.target_length_minutes <= 0.0 {
            return invalid("episode.target_length_minutes must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.episode.min_quality_score) {
            return invalid(format!(
                "episode.min_quality_score must be within [0, 1], got {}",
                self.episode.min_quality_score
            ));
        }
        if self.industry.priorities.iter().any(|p| p.keywords.iter().any(|k| k.trim().is_empty())) {
            return invalid("industry.priorities keywords must not be blank".to_string());
        }

        Ok(())
    }

    /// Scoring rules derived from the priority tiers. With N tiers, tier n
    /// weighs N - n + 1; the company list is one more rule.
    pub fn priority_rules(&self) -> Vec<PriorityRule> {
        let tiers = self.industry.priorities.len();
        let mut rules: Vec<PriorityRule> = self
            .industry
            .priorities
            .iter()
            .enumerate()
            .map(|(idx, priority)| PriorityRule {
                name: priority.name.clone(),
                keywords: priority.keywords.clone(),
                weight: (tiers - idx) as f64,
            })
            .collect();

        if !self.industry.companies.is_empty() {
            rules.push(PriorityRule {
                name: "Key companies".to_string(),
                keywords: self.industry.companies.clone(),
                weight: self.industry.company_weight,
            });
        }

        rules
    }

    /// All collector queries, highest priority first
    pub fn search_terms(&self) -> Vec<String> {
        self.industry
            .priorities
            .iter()
            .flat_map(|p| p.terms.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        PodcastConfig::default().validate().expect("defaults must be valid");
    }

    #[test]
    fn first_priority_tier_weighs_the_most() {
        let config = PodcastConfig::default();
        let rules = config.priority_rules();

        assert_eq!(rules.len(), 5);
        assert_eq!(rules[0].weight, 4.0);
        assert_eq!(rules[3].weight, 1.0);
        assert_eq!(rules[4].name, "Key companies");
        assert_eq!(rules[4].weight, 2.0);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_fields() {
        let config: PodcastConfig = toml::from_str(
            r#"
            [podcast]
            name = "Construction Weekly"

            [content]
            max_articles_per_episode = 5
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.podcast.name, "Construction Weekly");
        assert_eq!(config.podcast.slug(), "construction_weekly");
        assert_eq!(config.content.max_articles_per_episode, 5);
        assert_eq!(config.content.max_article_age_days, 7);
        assert_eq!(config.episode.words_per_minute, 150.0);
        assert_eq!(config.episode.segments.len(), 5);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = PodcastConfig::default();
        config.content.duplicate_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate_threshold"));
    }

    #[test]
    fn load_reads_a_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podcast.toml");
        fs::write(&path, "[episode]\ntarget_length_minutes = 10.0\n").unwrap();

        let config = PodcastConfig::load(&path).unwrap();
        assert_eq!(config.episode.target_length_minutes, 10.0);
    }

    #[test]
    fn search_terms_follow_priority_order() {
        let terms = PodcastConfig::default().search_terms();
        assert_eq!(terms.first().map(String::as_str), Some("music publishing acquisition"));
        assert!(terms.contains(&"music publishing industry report".to_string()));
    }
}
