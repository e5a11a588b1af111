use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::collaborators::ScriptGenerator;
use crate::config::PodcastConfig;
use crate::models::{Article, ScriptDraft};

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const MAX_EXCERPT_BYTES: usize = 1500;

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    content: Vec<Content>,
}

#[derive(Deserialize)]
struct Content {
    text: String,
}

/// Drafts the episode script with the Anthropic Messages API
pub struct ClaudeScriptGenerator {
    client: Client,
    api_key: String,
    model: String,
}

impl ClaudeScriptGenerator {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn request_script(&self, prompt: String) -> Result<String> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        // Rate limits and overload are retried here; anything else is the caller's problem
        for attempt in 0..3u64 {
            let response = self
                .client
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&request)
                .send()
                .await
                .context("Failed to send request to Claude API")?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() == 529 {
                let backoff = std::time::Duration::from_secs(15 * (attempt + 1));
                tracing::warn!(status = %status, ?backoff, "Claude API busy, retrying");
                tokio::time::sleep(backoff).await;
                continue;
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| String::from("unknown error"));
                anyhow::bail!("Claude API error ({}): {}", status, error_text);
            }

            let claude_response = response
                .json::<ClaudeResponse>()
                .await
                .context("Failed to parse Claude API response")?;

            let text = claude_response
                .content
                .first()
                .map(|c| c.text.as_str())
                .unwrap_or("");

            return Ok(strip_code_fence(text).to_string());
        }

        anyhow::bail!("Claude API still rate limited after 3 attempts")
    }
}

#[async_trait]
impl ScriptGenerator for ClaudeScriptGenerator {
    async fn generate(&self, articles: &[Article], config: &PodcastConfig) -> Result<ScriptDraft> {
        tracing::info!(articles = articles.len(), model = %self.model, "requesting script");
        let text = self.request_script(build_prompt(articles, config)).await?;
        Ok(ScriptDraft::new(text))
    }
}

pub fn build_prompt(articles: &[Article], config: &PodcastConfig) -> String {
    let articles_text = articles
        .iter()
        .enumerate()
        .map(|(idx, article)| {
            let date = article
                .published_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "undated".to_string());
            format!(
                "{}. {} ({}, {})\n{}",
                idx + 1,
                article.title,
                if article.source.is_empty() { "unknown source" } else { article.source.as_str() },
                date,
                truncate(&article.body_text, MAX_EXCERPT_BYTES)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let segments = config
        .episode
        .segments
        .iter()
        .map(|s| format!("## {}", s))
        .collect::<Vec<_>>()
        .join("\n");

    let target_words = (config.episode.target_length_minutes * config.episode.words_per_minute).round();

    format!(
        r#"You are writing the script for "{name}", a podcast for {audience} in the {industry} industry, hosted by {host}.

Write a spoken-word script of about {words} words ({minutes} minutes read aloud) covering the articles below.

STRUCTURE (use these exact headers, in this order):
{segments}

RULES:
1. The script will be read by a text-to-speech voice: no URLs, no markdown links, no bullet lists, no tables
2. Spell out abbreviations the first time they appear and write numbers the way they are spoken
3. Keep sentences short and conversational
4. Use ONLY facts from the articles - no external knowledge
5. Open with a one-sentence welcome from the host and close the final segment with a sign-off
6. Output only the script, starting with the first header

Articles:
{articles}"#,
        name = config.podcast.name,
        audience = config.industry.target_audience.to_lowercase(),
        industry = config.industry.name,
        host = config.podcast.host_name,
        words = target_words,
        minutes = config.episode.target_length_minutes,
        segments = segments,
        articles = articles_text,
    )
}

/// Truncate to at most `max` bytes, respecting UTF-8 boundaries
fn truncate(content: &str, max: usize) -> &str {
    if content.len() <= max {
        return content;
    }
    let mut end = max;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. ```markdown) and the closing fence
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_segments_and_articles() {
        let config = PodcastConfig::default();
        let articles = vec![
            Article::new("Hal Leonard acquires XYZ", "Billboard", "The deal closed on Monday."),
            Article::new("Yousician launches AI tutor", "", ""),
        ];

        let prompt = build_prompt(&articles, &config);
        assert!(prompt.contains("## Breaking News & Major Deals"));
        assert!(prompt.contains("## Executive Takeaways"));
        assert!(prompt.contains("1. Hal Leonard acquires XYZ (Billboard, undated)"));
        assert!(prompt.contains("2. Yousician launches AI tutor (unknown source, undated)"));
        assert!(prompt.contains("about 1200 words"));
    }

    #[test]
    fn model_can_be_overridden() {
        let generator = ClaudeScriptGenerator::new("test-key".to_string()).unwrap();
        assert_eq!(generator.model, DEFAULT_MODEL);
        assert_eq!(generator.with_model("claude-sonnet-4-5").model, "claude-sonnet-4-5");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "Bärenreiter";
        assert_eq!(truncate(text, 2), "B");
        assert_eq!(truncate(text, 3), "Bä");
        assert_eq!(truncate(text, 100), text);
    }

    #[test]
    fn code_fences_are_removed() {
        assert_eq!(strip_code_fence("```markdown\n## Intro\nHello\n```"), "## Intro\nHello");
        assert_eq!(strip_code_fence("  ## Intro\nHello \n"), "## Intro\nHello");
    }
}
