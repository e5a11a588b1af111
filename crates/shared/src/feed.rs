//! Podcast feed state and RSS rendering.
//!
//! Published episodes are kept in a JSON state file; the RSS document is
//! regenerated from it on every publish with the `rss` crate. Both files are
//! staged as temporary siblings; the feed is swapped in first and the state
//! last, with the previous feed restored if the state cannot be committed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rss::extension::itunes::{
    ITunesCategoryBuilder, ITunesChannelExtensionBuilder, ITunesItemExtensionBuilder, ITunesOwnerBuilder,
};
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::collaborators::FeedPublisher;
use crate::config::{FeedConfig, PodcastInfo};
use crate::models::EpisodeRecord;

const STATE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedState {
    pub version: String,
    pub episodes: Vec<EpisodeRecord>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            episodes: Vec::new(),
        }
    }
}

impl FeedState {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read feed state: {}", path.display()))?;

        let state: FeedState = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse feed state from {}. The file may be corrupted.",
                path.display()
            )
        })?;

        if state.version != STATE_VERSION {
            anyhow::bail!(
                "Unsupported feed state version: {}. Expected {}.",
                state.version,
                STATE_VERSION
            );
        }

        Ok(state)
    }

    pub fn next_episode_number(&self) -> u32 {
        self.episodes.iter().map(|e| e.number).max().unwrap_or(0) + 1
    }
}

pub struct RssFeedPublisher {
    podcast: PodcastInfo,
    feed: FeedConfig,
}

impl RssFeedPublisher {
    pub fn new(podcast: PodcastInfo, feed: FeedConfig) -> Self {
        Self { podcast, feed }
    }

    pub fn state_path(&self) -> &Path {
        &self.feed.state_file
    }

    pub fn feed_path(&self) -> &Path {
        &self.feed.feed_file
    }
}

#[async_trait]
impl FeedPublisher for RssFeedPublisher {
    fn next_episode_number(&self) -> Result<u32> {
        Ok(FeedState::load(&self.feed.state_file)?.next_episode_number())
    }

    async fn publish(&self, episode: &EpisodeRecord) -> Result<String> {
        let mut state = FeedState::load(&self.feed.state_file)?;
        if state.episodes.iter().any(|e| e.number == episode.number) {
            anyhow::bail!("Episode {} is already in the feed", episode.number);
        }
        state.episodes.push(episode.clone());

        let rss = render_rss(&self.podcast, &self.feed, &state.episodes);
        let json = serde_json::to_string_pretty(&state).context("Failed to serialize feed state")?;

        let feed_tmp = stage_file(&self.feed.feed_file, &rss)?;
        let state_tmp = match stage_file(&self.feed.state_file, &json) {
            Ok(path) => path,
            Err(e) => {
                let _ = fs::remove_file(&feed_tmp);
                return Err(e);
            }
        };

        commit(&self.feed.feed_file, feed_tmp, &self.feed.state_file, state_tmp)?;

        Ok(format!("{}#episode-{}", self.feed.feed_file.display(), episode.number))
    }
}

/// Move the staged files into place: feed first, state last. A failed state
/// rename puts the previous feed back.
fn commit(feed_file: &Path, feed_tmp: PathBuf, state_file: &Path, state_tmp: PathBuf) -> Result<()> {
    let backup = sibling(feed_file, ".bak");
    let had_feed = feed_file.is_file();
    if had_feed {
        if let Err(e) = fs::copy(feed_file, &backup) {
            let _ = fs::remove_file(&feed_tmp);
            let _ = fs::remove_file(&state_tmp);
            return Err(e).context("Failed to back up RSS feed");
        }
    }

    if let Err(e) = fs::rename(&feed_tmp, feed_file) {
        let _ = fs::remove_file(&feed_tmp);
        let _ = fs::remove_file(&state_tmp);
        let _ = fs::remove_file(&backup);
        return Err(e).context("Failed to update RSS feed");
    }

    if let Err(e) = fs::rename(&state_tmp, state_file) {
        let _ = fs::remove_file(&state_tmp);
        let restored = if had_feed {
            fs::rename(&backup, feed_file)
        } else {
            fs::remove_file(feed_file)
        };
        if let Err(restore) = restored {
            tracing::error!(path = %feed_file.display(), error = %restore, "could not restore previous RSS feed");
        }
        return Err(e).context("Failed to update feed state");
    }

    if had_feed {
        let _ = fs::remove_file(&backup);
    }
    Ok(())
}

fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn stage_file(target: &Path, content: &str) -> Result<PathBuf> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let tmp = sibling(target, ".tmp");
    fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    Ok(tmp)
}

/// RSS 2.0 with iTunes tags, newest episode first
pub fn render_rss(podcast: &PodcastInfo, feed: &FeedConfig, episodes: &[EpisodeRecord]) -> String {
    let base_url = podcast.website_url.trim_end_matches('/');
    let mut sorted: Vec<&EpisodeRecord> = episodes.iter().collect();
    sorted.sort_by(|a, b| b.number.cmp(&a.number));

    let items: Vec<Item> = sorted
        .into_iter()
        .map(|episode| episode_item(podcast, base_url, episode))
        .collect();

    let category = ITunesCategoryBuilder::default()
        .text(feed.category_primary.clone())
        .subcategory(Box::new(
            ITunesCategoryBuilder::default()
                .text(feed.category_secondary.clone())
                .build(),
        ))
        .build();

    let itunes = ITunesChannelExtensionBuilder::default()
        .author(podcast.host_name.clone())
        .owner(
            ITunesOwnerBuilder::default()
                .name(podcast.host_name.clone())
                .email(podcast.host_email.clone())
                .build(),
        )
        .categories(vec![category])
        .explicit("false".to_string())
        .build();

    ChannelBuilder::default()
        .title(podcast.name.clone())
        .link(base_url.to_string())
        .description(podcast.description.clone())
        .language(feed.language.clone())
        .copyright(feed.copyright.clone())
        .itunes_ext(itunes)
        .items(items)
        .build()
        .to_string()
}

fn episode_item(podcast: &PodcastInfo, base_url: &str, episode: &EpisodeRecord) -> Item {
    let file_name = Path::new(&episode.audio_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let length = fs::metadata(&episode.audio_path).map(|m| m.len()).unwrap_or(0);

    let enclosure = EnclosureBuilder::default()
        .url(format!("{}/audio/{}", base_url, file_name))
        .length(length.to_string())
        .mime_type("audio/mpeg".to_string())
        .build();

    let guid = GuidBuilder::default()
        .value(format!("{}-episode-{}", podcast.slug(), episode.number))
        .permalink(false)
        .build();

    let itunes = ITunesItemExtensionBuilder::default()
        .duration(format_duration(episode.duration_seconds))
        .episode(episode.number.to_string())
        .build();

    ItemBuilder::default()
        .title(episode.title.clone())
        .description(show_notes(episode))
        .enclosure(enclosure)
        .guid(guid)
        .pub_date(episode.published_at.to_rfc2822())
        .itunes_ext(itunes)
        .build()
}

fn show_notes(episode: &EpisodeRecord) -> String {
    let mut notes = episode.description.clone();
    if !episode.articles.is_empty() {
        notes.push_str("\n\nStories covered:");
        for article in &episode.articles {
            notes.push_str(&format!("\n- {}", article.title));
            if let Some(url) = &article.url {
                notes.push_str(&format!(" ({})", url));
            }
        }
    }
    notes
}

fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Article;
    use chrono::{TimeZone, Utc};

    fn record(number: u32) -> EpisodeRecord {
        EpisodeRecord {
            number,
            title: format!("Episode {}: June 10, 2025", number),
            description: "Deals & moves".to_string(),
            audio_path: format!("static/audio/beat_episode_{}.mp3", number),
            script_path: format!("output/beat_episode_{}_script.md", number),
            published_at: Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap(),
            duration_seconds: 485,
            articles: vec![Article::new("Hal Leonard acquires <XYZ>", "Billboard", "")
                .with_url("https://example.com/a")],
        }
    }

    fn publisher(dir: &Path) -> RssFeedPublisher {
        let feed = FeedConfig {
            feed_file: dir.join("static/feed.xml"),
            state_file: dir.join("static/episodes.json"),
            ..FeedConfig::default()
        };
        RssFeedPublisher::new(PodcastInfo::default(), feed)
    }

    fn parse(xml: &str) -> rss::Channel {
        rss::Channel::read_from(xml.as_bytes()).expect("rendered feed parses as RSS")
    }

    #[test]
    fn rss_carries_episode_metadata() {
        let xml = render_rss(&PodcastInfo::default(), &FeedConfig::default(), &[record(1)]);
        let channel = parse(&xml);

        assert_eq!(channel.title(), "The Music Publishing Beat");
        let owner = channel.itunes_ext().and_then(|ext| ext.owner()).expect("itunes owner");
        assert_eq!(owner.name(), Some(PodcastInfo::default().host_name.as_str()));

        let item = &channel.items()[0];
        assert_eq!(item.title(), Some("Episode 1: June 10, 2025"));
        assert_eq!(item.pub_date(), Some("Tue, 10 Jun 2025 12:00:00 +0000"));
        assert_eq!(
            item.enclosure().map(|e| e.url()),
            Some("https://example.com/audio/beat_episode_1.mp3")
        );
        assert_eq!(item.guid().map(|g| g.is_permalink()), Some(false));
        assert_eq!(item.itunes_ext().and_then(|ext| ext.duration()), Some("00:08:05"));
    }

    #[test]
    fn markup_in_text_survives_the_round_trip() {
        let xml = render_rss(&PodcastInfo::default(), &FeedConfig::default(), &[record(1)]);
        assert!(!xml.contains("<XYZ>"));

        let description = parse(&xml).items()[0].description().unwrap_or_default().to_string();
        assert!(description.starts_with("Deals & moves"));
        assert!(description.contains("- Hal Leonard acquires <XYZ> (https://example.com/a)"));
    }

    #[test]
    fn newest_episode_comes_first() {
        let xml = render_rss(&PodcastInfo::default(), &FeedConfig::default(), &[record(1), record(2)]);
        let episodes: Vec<_> = parse(&xml)
            .items()
            .iter()
            .filter_map(|item| item.itunes_ext().and_then(|ext| ext.episode()).map(str::to_string))
            .collect();
        assert_eq!(episodes, vec!["2", "1"]);
    }

    #[test]
    fn duration_is_hours_minutes_seconds() {
        assert_eq!(format_duration(485), "00:08:05");
        assert_eq!(format_duration(3725), "01:02:05");
    }

    #[tokio::test]
    async fn publish_appends_and_numbers_episodes() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path());

        assert_eq!(publisher.next_episode_number().unwrap(), 1);
        let location = publisher.publish(&record(1)).await.unwrap();
        assert!(location.ends_with("feed.xml#episode-1"));
        assert_eq!(publisher.next_episode_number().unwrap(), 2);

        let state = FeedState::load(publisher.state_path()).unwrap();
        assert_eq!(state.episodes.len(), 1);
        assert!(fs::read_to_string(publisher.feed_path()).unwrap().contains("<item>"));
        assert!(!dir.path().join("static/feed.xml.tmp").exists());
    }

    #[tokio::test]
    async fn duplicate_episode_numbers_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path());

        publisher.publish(&record(1)).await.unwrap();
        let err = publisher.publish(&record(1)).await.unwrap_err();
        assert!(err.to_string().contains("already in the feed"));
        assert_eq!(FeedState::load(publisher.state_path()).unwrap().episodes.len(), 1);
    }

    #[tokio::test]
    async fn failed_feed_swap_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path());
        // A directory where the feed should go makes the rename fail
        fs::create_dir_all(publisher.feed_path()).unwrap();

        assert!(publisher.publish(&record(1)).await.is_err());

        assert!(FeedState::load(publisher.state_path()).unwrap().episodes.is_empty());
        assert!(!publisher.state_path().exists());
        assert!(!dir.path().join("static/episodes.json.tmp").exists());
        assert!(!dir.path().join("static/feed.xml.tmp").exists());
    }

    #[tokio::test]
    async fn failed_state_commit_restores_previous_feed() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path());
        publisher.publish(&record(1)).await.unwrap();
        let published_feed = fs::read_to_string(publisher.feed_path()).unwrap();
        let published_state = fs::read_to_string(publisher.state_path()).unwrap();

        let feed_tmp = stage_file(publisher.feed_path(), "<rss>replacement</rss>").unwrap();
        // The staged state has gone missing, so its rename fails after the feed swap
        let state_tmp = dir.path().join("static/missing.json.tmp");

        let result = commit(publisher.feed_path(), feed_tmp, publisher.state_path(), state_tmp);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(publisher.feed_path()).unwrap(), published_feed);
        assert_eq!(fs::read_to_string(publisher.state_path()).unwrap(), published_state);
        assert!(!dir.path().join("static/feed.xml.bak").exists());
        assert!(!dir.path().join("static/feed.xml.tmp").exists());
    }

    #[test]
    fn failed_commit_without_previous_feed_removes_the_new_one() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = publisher(dir.path());

        let feed_tmp = stage_file(publisher.feed_path(), "<rss/>").unwrap();
        let state_tmp = dir.path().join("static/missing.json.tmp");

        assert!(commit(publisher.feed_path(), feed_tmp, publisher.state_path(), state_tmp).is_err());
        assert!(!publisher.feed_path().exists());
        assert!(!publisher.state_path().exists());
    }

    #[test]
    fn unknown_state_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.json");
        fs::write(&path, r#"{"version": "2.0", "episodes": []}"#).unwrap();
        assert!(FeedState::load(&path).is_err());
    }
}
