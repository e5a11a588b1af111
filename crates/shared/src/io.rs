use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::collaborators::ArticleCollector;
use crate::models::Article;
use crate::orchestrator::RunReport;

/// Collector backed by a JSON array of articles on disk
pub struct FileCollector {
    path: PathBuf,
}

impl FileCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ArticleCollector for FileCollector {
    async fn collect(&self, _search_terms: &[String], max_age_days: i64) -> Result<Vec<Article>> {
        let articles = load_articles(&self.path)?;
        let cutoff = Utc::now() - Duration::days(max_age_days);

        let total = articles.len();
        let fresh: Vec<Article> = articles
            .into_iter()
            .filter(|a| a.published_at.map_or(true, |published| published >= cutoff))
            .collect();

        if fresh.len() < total {
            tracing::info!(dropped = total - fresh.len(), max_age_days, "dropped stale articles");
        }
        Ok(fresh)
    }
}

/// Load articles from a JSON file
pub fn load_articles(filepath: &Path) -> Result<Vec<Article>> {
    if !filepath.exists() {
        anyhow::bail!("Article file not found: {}", filepath.display());
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read article file: {}", filepath.display()))?;

    serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse articles from {}. Expected a JSON array of articles.",
            filepath.display()
        )
    })
}

/// Save the run report next to the episode artifacts
pub fn save_report(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let filename = format!("run_report_{}.json", report.started_at.format("%Y%m%d_%H%M%S"));
    let filepath = output_dir.join(filename);

    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    fs::write(&filepath, json).context("Failed to write run report")?;

    Ok(filepath)
}

/// All `*_script.md` files in `dir`, newest first
pub fn list_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut scripts: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with("_script.md"))
        })
        .collect();

    // Sort by modification time (newest first)
    scripts.sort_by_key(|path| {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(std::cmp::Reverse)
    });

    Ok(scripts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_collector_drops_stale_articles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        let articles = vec![
            Article::new("Fresh story", "Wire", "").published(Utc::now() - Duration::days(1)),
            Article::new("Stale story", "Wire", "").published(Utc::now() - Duration::days(30)),
            Article::new("Undated story", "Wire", ""),
        ];
        fs::write(&path, serde_json::to_string(&articles).unwrap()).unwrap();

        let collected = FileCollector::new(&path).collect(&[], 7).await.unwrap();
        let titles: Vec<_> = collected.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Fresh story", "Undated story"]);
    }

    #[test]
    fn missing_article_file_is_an_error() {
        let err = load_articles(Path::new("/nonexistent/articles.json")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn list_scripts_only_returns_scripts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("beat_episode_1_script.md"), "## Intro").unwrap();
        fs::write(dir.path().join("run_report_1.json"), "{}").unwrap();

        let scripts = list_scripts(dir.path()).unwrap();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].ends_with("beat_episode_1_script.md"));
        assert!(list_scripts(&dir.path().join("missing")).unwrap().is_empty());
    }
}
