use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use shared::telemetry::init_telemetry;
use shared::{
    save_report, ArticleCollector, ClaudeScriptGenerator, Config, ElevenLabsSynthesizer,
    EpisodeOrchestrator, FileCollector, PodcastConfig, RaindropCollector, RssFeedPublisher,
    RunReport,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "generate-episode")]
#[command(about = "Collect industry news and publish one podcast episode")]
struct Args {
    /// Path to podcast.toml (defaults to ./podcast.toml, then ~/.config/podcast-generator/)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read articles from a JSON file instead of Raindrop.io
    #[arg(short, long)]
    articles: Option<PathBuf>,

    /// Raindrop.io tag to restrict collection to
    #[arg(short, long)]
    tag: Option<String>,

    /// Number of days to look back for articles (overrides the config)
    #[arg(short, long)]
    days: Option<i64>,

    /// Abort instead of warning when the script scores below the quality minimum
    #[arg(long)]
    strict: bool,

    /// Claude model used to draft the script
    #[arg(long)]
    model: Option<String>,

    /// Log level for the pipeline (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_telemetry(&args.log_level);

    let mut podcast = PodcastConfig::load_or_default(args.config.as_deref())?;
    if let Some(days) = args.days {
        podcast.content.max_article_age_days = days;
    }
    if args.strict {
        podcast.episode.fail_on_low_quality = true;
    }
    podcast.validate()?;

    let config = Config::from_env()?;

    println!("\n🎙  {}", podcast.podcast.name);
    println!(
        "  Looking back {} days, up to {} articles, target {} minutes",
        podcast.content.max_article_age_days,
        podcast.content.max_articles_per_episode,
        podcast.episode.target_length_minutes
    );

    let collector: Arc<dyn ArticleCollector> = match args.articles {
        Some(path) => {
            println!("\n📂 Reading articles from {}", path.display());
            Arc::new(FileCollector::new(path))
        }
        None => {
            let token = config.raindrop_api_token.clone().context(
                "RAINDROP_API_TOKEN not found.\n\n\
                Either add RAINDROP_API_TOKEN=your_token_here to ~/.config/podcast-generator/.env\n\
                or pass --articles <file.json> to use a local article file.",
            )?;
            println!("\n📚 Collecting articles from Raindrop.io...");
            Arc::new(RaindropCollector::new(token, args.tag)?)
        }
    };

    let mut generator = ClaudeScriptGenerator::new(config.anthropic_api_key.clone())?;
    if let Some(model) = args.model {
        generator = generator.with_model(model);
    }
    let synthesizer = ElevenLabsSynthesizer::new(
        config.eleven_labs_api_key.clone(),
        podcast.audio.clone(),
        podcast.output.audio_dir.clone(),
    )?;
    let publisher = RssFeedPublisher::new(podcast.podcast.clone(), podcast.feed.clone());
    let output_dir = podcast.output.output_dir.clone();

    let mut orchestrator = EpisodeOrchestrator::new(
        podcast,
        collector,
        Arc::new(generator),
        Arc::new(synthesizer),
        Arc::new(publisher),
    );

    println!("\n🤖 Running the episode pipeline...");
    println!("  (Script generation and audio rendering may take several minutes...)");
    let report = orchestrator.run(Utc::now()).await;

    print_summary(&report);

    match save_report(&report, &output_dir) {
        Ok(path) => println!("\n📝 Run report saved to: {}", path.display()),
        Err(e) => tracing::warn!(error = %e, "could not save run report"),
    }

    if !report.succeeded() {
        anyhow::bail!(
            "Episode run failed at {}: {}",
            report
                .failed_stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "startup".to_string()),
            report.reason.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    let counts = &report.counts;
    println!(
        "\n✓ Articles: {} collected, {} scored, {} after deduplication, {} selected",
        counts.collected, counts.scored, counts.deduplicated, counts.selected
    );

    if let Some(validation) = &report.validation {
        println!(
            "✓ Script: {} words, ~{:.1} minutes, quality {:.2}",
            validation.word_count,
            validation.estimated_duration_minutes,
            validation.overall_quality
        );
        for warning in &validation.warnings {
            println!("  ⚠ {}", warning);
        }
    }

    if let Some(warning) = &report.quality_warning {
        println!("\n⚠ {}", warning);
    }

    if report.succeeded() {
        if let Some(number) = report.episode_number {
            println!("\n✅ Episode {} published", number);
        }
        if let Some(path) = &report.script_path {
            println!("  Script: {}", path.display());
        }
        if let Some(path) = &report.audio_path {
            println!("  Audio:  {}", path.display());
        }
        if let Some(location) = &report.feed_location {
            println!("  Feed:   {}", location);
        }
    } else {
        println!("\n✗ No episode was published. Script and audio from this run were discarded.");
    }
}
