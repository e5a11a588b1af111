use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::collaborators::AudioSynthesizer;
use crate::config::AudioConfig;

/// ElevenLabs rejects longer requests, so scripts are sent in pieces
const MAX_CHUNK_CHARS: usize = 4500;

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

/// Renders scripts to MP3 with the ElevenLabs text-to-speech API
pub struct ElevenLabsSynthesizer {
    client: Client,
    api_key: String,
    audio: AudioConfig,
    audio_dir: PathBuf,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: String, audio: AudioConfig, audio_dir: PathBuf) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            audio,
            audio_dir,
        })
    }

    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
            urlencoding::encode(&self.audio.voice_id)
        );

        let request = SpeechRequest {
            text,
            model_id: &self.audio.model_id,
            voice_settings: VoiceSettings {
                stability: self.audio.stability,
                similarity_boost: self.audio.clarity,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to ElevenLabs API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("ElevenLabs API error ({}): {}", status, error_text);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read audio from ElevenLabs response")?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AudioSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, script: &str, episode_slug: &str) -> Result<PathBuf> {
        let spoken = prepare_for_speech(script);
        let chunks = split_into_chunks(&spoken, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            anyhow::bail!("Nothing to synthesize: script has no speakable text");
        }

        tracing::info!(chunks = chunks.len(), voice = %self.audio.voice_id, "synthesizing audio");

        // MP3 frames concatenate cleanly, so chunks are appended back to back
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let bytes = self
                .synthesize_chunk(chunk)
                .await
                .with_context(|| format!("Failed to synthesize chunk {}/{}", idx + 1, chunks.len()))?;
            audio.extend_from_slice(&bytes);
        }

        fs::create_dir_all(&self.audio_dir).context("Failed to create audio directory")?;
        let path = self
            .audio_dir
            .join(format!("{}.{}", episode_slug, self.audio.format));
        fs::write(&path, &audio).context("Failed to write audio file")?;

        Ok(path)
    }
}

/// Strip markdown so the voice doesn't read markup. Headers become
/// sentences of their own.
pub fn prepare_for_speech(script: &str) -> String {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.chars().all(|c| matches!(c, '-' | '*' | '_' | '=')))
        .map(|line| {
            if let Some(header) = line.strip_prefix('#') {
                let header = header.trim_start_matches('#').trim();
                format!("{}.", header.trim_end_matches(['.', ':']))
            } else {
                line.replace("**", "").replace('*', "")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Greedy paragraph packing; paragraphs longer than `max_chars` are split on sentence ends.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    let pieces = text.split("\n\n").flat_map(|paragraph| {
        if paragraph.chars().count() <= max_chars {
            vec![paragraph.to_string()]
        } else {
            split_sentences(paragraph)
        }
    });

    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if !current.is_empty() && current.chars().count() + piece.chars().count() + 2 > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(piece);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in paragraph.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_is_stripped_for_the_voice() {
        let script = "## Breaking News & Major Deals\n\nHal Leonard **acquired** XYZ.\n\n---\n\n## Executive Takeaways:\nThanks for listening.";
        let spoken = prepare_for_speech(script);

        assert_eq!(
            spoken,
            "Breaking News & Major Deals.\n\nHal Leonard acquired XYZ.\n\nExecutive Takeaways.\n\nThanks for listening."
        );
    }

    #[test]
    fn chunks_respect_the_limit_and_keep_all_text() {
        let paragraph = "Publishers signed a new deal this week. ".repeat(10);
        let text = vec![paragraph.trim(); 6].join("\n\n");

        let chunks = split_into_chunks(&text, 900);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 900));

        let rejoined: String = chunks.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
        let original: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(rejoined, original);
    }

    #[test]
    fn oversized_paragraphs_split_on_sentences() {
        let paragraph = "One short sentence here. ".repeat(100);
        let chunks = split_into_chunks(paragraph.trim(), 200);
        assert!(chunks.iter().all(|c| c.chars().count() <= 200));
        assert!(chunks.iter().all(|c| c.ends_with('.')));
    }

    #[test]
    fn empty_script_has_no_chunks() {
        assert!(split_into_chunks(&prepare_for_speech("---\n\n"), 100).is_empty());
    }
}
