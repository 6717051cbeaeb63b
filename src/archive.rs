//! Channel archival: resolve, fetch, download media, persist
//!
//! One archival cycle walks the configured channel list in order. Each
//! channel gets a dated JSON dump plus a directory of downloaded media.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use grammers_client::types::peer::Peer;
use grammers_client::types::{Media, Message};
use grammers_client::Client;
use regex::Regex;
use tracing::{error, info};

use crate::config::{Config, IterationOrder, MediaPolicy};
use crate::error::{Error, Result};
use crate::record::{is_image, media_extension, media_kind, MediaRef, MessageRecord};

static TME_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://t\.me/([A-Za-z0-9_]+)").unwrap());
static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").unwrap());

/// Derive a filesystem-safe slug from a channel reference.
///
/// t.me URLs yield the username; anything else has unsafe characters
/// replaced with underscores.
pub fn safe_name(channel_ref: &str) -> String {
    if let Some(caps) = TME_URL.captures(channel_ref) {
        return caps[1].to_string();
    }
    let cleaned = UNSAFE_CHARS.replace_all(channel_ref, "_").into_owned();
    if cleaned.is_empty() {
        "unknown_channel".to_string()
    } else {
        cleaned
    }
}

/// Strip URL and @ decoration down to the bare username.
fn bare_username(channel_ref: &str) -> &str {
    let trimmed = channel_ref.trim();
    let trimmed = trimmed
        .strip_prefix("https://t.me/")
        .or_else(|| trimmed.strip_prefix("http://t.me/"))
        .unwrap_or(trimmed);
    trimmed.trim_start_matches('@').trim_end_matches('/')
}

/// Output directories for one (channel, date) pair.
#[derive(Debug, Clone)]
pub struct ArchivePaths {
    pub messages_dir: PathBuf,
    pub images_dir: PathBuf,
}

impl ArchivePaths {
    pub fn new(messages_root: &Path, images_root: &Path, date: NaiveDate, safe_name: &str) -> Self {
        let date_str = date.format("%Y-%m-%d").to_string();
        Self {
            messages_dir: messages_root.join(&date_str).join(safe_name),
            images_dir: images_root.join(&date_str).join(safe_name),
        }
    }

    /// Create both directories. Idempotent.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.messages_dir)?;
        fs::create_dir_all(&self.images_dir)?;
        Ok(())
    }

    pub fn messages_file(&self) -> PathBuf {
        self.messages_dir.join("messages.json")
    }
}

/// Per-channel counts, logged at the end of each channel's processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub channel: String,
    pub messages: usize,
    pub media_downloaded: usize,
    pub media_failed: usize,
}

/// Serialize the collected records as one JSON document, replacing any
/// previous archive at the same path.
pub fn write_archive(path: &Path, records: &[MessageRecord]) -> Result<()> {
    let payload = serde_json::to_string_pretty(records)?;
    fs::write(path, payload)?;
    Ok(())
}

fn qualifies(media: &Media, policy: MediaPolicy) -> bool {
    match policy {
        MediaPolicy::All => true,
        MediaPolicy::ImagesOnly => is_image(media),
    }
}

fn apply_order(records: &mut [MessageRecord], order: IterationOrder) {
    // The client delivers newest first
    if order == IterationOrder::OldestFirst {
        records.reverse();
    }
}

/// Walks the configured channels and writes their archives.
pub struct Archiver {
    client: Client,
    config: Config,
}

impl Archiver {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    /// Resolve a channel reference to a peer the session can see.
    pub async fn resolve(&self, channel_ref: &str) -> Result<Peer> {
        let username = bare_username(channel_ref);
        self.client
            .resolve_username(username)
            .await?
            .ok_or_else(|| Error::ChannelNotFound(channel_ref.to_string()))
    }

    /// Fetch a channel's full history and persist it under the given date.
    pub async fn archive_channel(
        &self,
        peer: &Peer,
        channel_ref: &str,
        date: NaiveDate,
    ) -> Result<ChannelSummary> {
        let name = safe_name(channel_ref);
        let paths = ArchivePaths::new(
            &self.config.messages_dir,
            &self.config.images_dir,
            date,
            &name,
        );
        paths.ensure()?;

        info!("Fetching messages from {}", channel_ref);

        let mut records: Vec<MessageRecord> = Vec::new();
        let mut downloaded = 0usize;
        let mut failed = 0usize;

        let mut iter = self.client.iter_messages(peer);
        while let Some(msg) = iter.next().await? {
            let mut record = MessageRecord::from_message(&msg);

            if let Some(media) = msg.media() {
                if qualifies(&media, self.config.media_policy) {
                    match self.download(&msg, &media, &paths.images_dir).await {
                        Ok(file_path) => {
                            record = record.with_media(MediaRef {
                                kind: media_kind(&media).to_string(),
                                file_path,
                            });
                            downloaded += 1;
                        }
                        Err(err) => {
                            // Keep the record, drop the attachment
                            failed += 1;
                            error!(
                                "Failed media download in {} msg {}: {}",
                                channel_ref,
                                msg.id(),
                                err
                            );
                        }
                    }
                }
            }

            records.push(record);
        }

        apply_order(&mut records, self.config.iteration_order);
        write_archive(&paths.messages_file(), &records)?;

        let summary = ChannelSummary {
            channel: channel_ref.to_string(),
            messages: records.len(),
            media_downloaded: downloaded,
            media_failed: failed,
        };
        info!(
            "Archived {} messages ({} media downloaded, {} failed) from {}",
            summary.messages, summary.media_downloaded, summary.media_failed, summary.channel
        );
        Ok(summary)
    }

    async fn download(&self, msg: &Message, media: &Media, dir: &Path) -> Result<String> {
        let path = dir.join(format!("{}{}", msg.id(), media_extension(media)));
        msg.download_media(&path)
            .await
            .map_err(|e| Error::MediaDownloadFailed(e.to_string()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// Process every configured channel in list order. A channel that fails
    /// to resolve is logged and skipped; anything else aborts the run.
    pub async fn run(&self) -> Result<Vec<ChannelSummary>> {
        if self.config.channels.is_empty() {
            return Err(Error::InvalidArgument(
                "no channels configured".to_string(),
            ));
        }

        let date = Local::now().date_naive();
        let mut summaries = Vec::new();

        for channel_ref in &self.config.channels {
            let peer = match self.resolve(channel_ref).await {
                Ok(peer) => peer,
                Err(Error::ChannelNotFound(_)) => {
                    error!("Channel not found: {}", channel_ref);
                    continue;
                }
                Err(err) => return Err(err),
            };

            summaries.push(self.archive_channel(&peer, channel_ref, date).await?);
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn sample_record(id: i32) -> MessageRecord {
        MessageRecord {
            id,
            date: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, id as u32 % 60).unwrap(),
            text: Some(format!("message {}", id)),
            sender_id: Some(1),
            media: None,
        }
    }

    #[test]
    fn safe_name_extracts_tme_username() {
        assert_eq!(safe_name("https://t.me/CheMed123"), "CheMed123");
        assert_eq!(safe_name("http://t.me/tikvahpharma"), "tikvahpharma");
    }

    #[test]
    fn safe_name_replaces_unsafe_characters() {
        assert_eq!(safe_name("@chemed"), "_chemed");
        assert_eq!(safe_name("some channel!"), "some_channel_");
        assert_eq!(safe_name("канал"), "_____");
    }

    #[test]
    fn safe_name_empty_input_falls_back() {
        assert_eq!(safe_name(""), "unknown_channel");
    }

    #[test]
    fn safe_name_output_is_always_filesystem_safe() {
        let inputs = [
            "https://t.me/CheMed123",
            "@lobelia4cosmetics",
            "plain_handle",
            "weird/../path",
            "spaces and émojis 😀",
            "",
        ];

        for input in inputs {
            let name = safe_name(input);
            assert!(!name.is_empty());
            assert!(
                name.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
                "unsafe char in {:?} -> {:?}",
                input,
                name
            );
        }
    }

    #[test]
    fn bare_username_strips_decoration() {
        assert_eq!(bare_username("https://t.me/CheMed123"), "CheMed123");
        assert_eq!(bare_username("http://t.me/chemed/"), "chemed");
        assert_eq!(bare_username("@chemed"), "chemed");
        assert_eq!(bare_username("  chemed  "), "chemed");
    }

    #[test]
    fn archive_paths_follow_dated_layout() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let paths = ArchivePaths::new(
            Path::new("data/raw/telegram_messages"),
            Path::new("data/raw/telegram_images"),
            date,
            "CheMed123",
        );

        assert_eq!(
            paths.messages_file(),
            PathBuf::from("data/raw/telegram_messages/2024-06-01/CheMed123/messages.json")
        );
        assert_eq!(
            paths.images_dir,
            PathBuf::from("data/raw/telegram_images/2024-06-01/CheMed123")
        );
    }

    #[test]
    fn ensure_is_idempotent() {
        let temp = tempdir().expect("tempdir");
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let paths = ArchivePaths::new(
            &temp.path().join("messages"),
            &temp.path().join("images"),
            date,
            "chan",
        );

        paths.ensure().expect("first ensure");
        paths.ensure().expect("second ensure");
        assert!(paths.messages_dir.is_dir());
        assert!(paths.images_dir.is_dir());
    }

    #[test]
    fn write_archive_produces_parseable_json() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("messages.json");
        let records: Vec<MessageRecord> = (1..=3).map(sample_record).collect();

        write_archive(&path, &records).expect("write");

        let content = fs::read_to_string(&path).expect("read back");
        let parsed: Vec<MessageRecord> = serde_json::from_str(&content).expect("parse");
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].id, 1);
    }

    #[test]
    fn write_archive_overwrites_previous_run() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("messages.json");

        let first: Vec<MessageRecord> = (1..=5).map(sample_record).collect();
        write_archive(&path, &first).expect("first write");

        let second: Vec<MessageRecord> = (1..=2).map(sample_record).collect();
        write_archive(&path, &second).expect("second write");

        let content = fs::read_to_string(&path).expect("read back");
        let parsed: Vec<MessageRecord> = serde_json::from_str(&content).expect("parse");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn write_archive_empty_channel_is_valid_json() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("messages.json");

        write_archive(&path, &[]).expect("write");

        let content = fs::read_to_string(&path).expect("read back");
        assert_eq!(content.trim(), "[]");
    }

    #[test]
    fn apply_order_newest_first_keeps_delivery_order() {
        let mut records: Vec<MessageRecord> = vec![sample_record(3), sample_record(2), sample_record(1)];
        apply_order(&mut records, IterationOrder::NewestFirst);
        let ids: Vec<i32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn apply_order_oldest_first_reverses() {
        let mut records: Vec<MessageRecord> = vec![sample_record(3), sample_record(2), sample_record(1)];
        apply_order(&mut records, IterationOrder::OldestFirst);
        let ids: Vec<i32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
