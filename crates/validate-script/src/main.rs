use anyhow::{Context, Result};
use clap::Parser;
use shared::telemetry::init_telemetry;
use shared::{list_scripts, PodcastConfig, ScriptValidator, ValidationResult};
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "validate-script")]
#[command(about = "Check a generated podcast script for length, segments and readability")]
struct Args {
    /// Path to the script (if not provided, will list scripts in the output directory)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to podcast.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the validation result as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_telemetry("warn");

    let config = PodcastConfig::load_or_default(args.config.as_deref())?;

    let script_file = match args.file {
        Some(path) => path,
        None => select_script_file(&config.output.output_dir)?,
    };

    let script = fs::read_to_string(&script_file)
        .with_context(|| format!("Failed to read script: {}", script_file.display()))?;

    let result = ScriptValidator::from_config(&config).validate(&script, &config.episode.segments);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("📖 Script: {}", script_file.display());
        print_result(&result, &config);
    }

    Ok(())
}

fn print_result(result: &ValidationResult, config: &PodcastConfig) {
    let episode = &config.episode;

    println!("\n📊 Metrics");
    println!("  Words:     {}", result.word_count);
    println!(
        "  Duration:  ~{:.1} minutes (target {:.1})",
        result.estimated_duration_minutes, episode.target_length_minutes
    );
    println!(
        "  Segments:  {:.0}% present",
        result.segment_completeness * 100.0
    );
    for segment in &result.missing_segments {
        println!("    ✗ {}", segment);
    }

    if result.warnings.is_empty() {
        println!("\n✓ No warnings");
    } else {
        println!("\n⚠ {} warnings:", result.warnings.len());
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }

    if result.overall_quality >= episode.min_quality_score {
        println!(
            "\n✅ Quality {:.2} (minimum {:.2})",
            result.overall_quality, episode.min_quality_score
        );
    } else {
        println!(
            "\n✗ Quality {:.2} is below the minimum of {:.2}",
            result.overall_quality, episode.min_quality_score
        );
    }
}

fn select_script_file(output_dir: &Path) -> Result<PathBuf> {
    let scripts = list_scripts(output_dir)?;

    if scripts.is_empty() {
        anyhow::bail!("No scripts found in {}", output_dir.display());
    }

    println!("Available scripts:\n");
    for (i, file) in scripts.iter().enumerate() {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let modified = fs::metadata(file)
            .and_then(|m| m.modified())
            .ok()
            .map(|t| {
                let datetime: chrono::DateTime<chrono::Local> = t.into();
                datetime.format("%Y-%m-%d %H:%M").to_string()
            })
            .unwrap_or_else(|| "unknown".to_string());

        println!("  {}) {} (modified: {})", i + 1, filename, modified);
    }

    print!("\nSelect script (1-{}): ", scripts.len());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let selection: usize = input
        .trim()
        .parse()
        .context("Invalid selection. Please enter a number.")?;

    if selection == 0 || selection > scripts.len() {
        anyhow::bail!("Selection out of range. Choose 1-{}.", scripts.len());
    }

    Ok(scripts[selection - 1].clone())
}
