// Public modules
pub mod collaborators;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod feed;
pub mod generator;
pub mod io;
pub mod models;
pub mod orchestrator;
pub mod raindrop;
pub mod scoring;
pub mod selector;
pub mod store;
pub mod telemetry;
pub mod tts;
pub mod validator;

// Re-export commonly used types
pub use collaborators::{ArticleCollector, AudioSynthesizer, FeedPublisher, ScriptGenerator};
pub use config::{Config, PodcastConfig};
pub use dedup::Deduplicator;
pub use error::{PipelineError, PipelineResult};
pub use extractor::{ArticleContent, ContentExtractor};
pub use feed::{FeedState, RssFeedPublisher};
pub use generator::ClaudeScriptGenerator;
pub use io::{list_scripts, load_articles, save_report, FileCollector};
pub use models::{Article, EpisodeRecord, PriorityRule, ScriptDraft, ValidationResult};
pub use orchestrator::{EpisodeOrchestrator, RunReport, RunStatus, Stage};
pub use raindrop::RaindropCollector;
pub use scoring::RelevanceScorer;
pub use selector::ArticleSelector;
pub use store::ArticleStore;
pub use tts::ElevenLabsSynthesizer;
pub use validator::ScriptValidator;
