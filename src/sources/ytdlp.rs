use std::{io::ErrorKind, process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{ResolveError, TrackResolver};
use crate::{
    configs::SearchConfig,
    protocol::{TrackHandle, TrackInfo},
    routeplanner::{AddressRotator, SENTINEL_ADDRESS},
};

const COMMON_ARGS: &[&str] = &[
    "--dump-single-json",
    "--no-warnings",
    "--ignore-errors",
    "--no-check-certificates",
];

/// Free text is searched; anything else must be a url or id yt-dlp knows.
const SEARCH_ARGS: &[&str] = &["--default-search", "auto", "--flat-playlist"];

/// Playback targets are never searched, so an id yt-dlp cannot extract fails
/// instead of resolving to an unrelated search hit.
const PLAYBACK_ARGS: &[&str] = &[
    "--no-playlist",
    "-f",
    "bestaudio[ext=webm][acodec=opus]/bestaudio[ext=mp4][acodec=aac]/bestvideo[ext=mp4][acodec=aac]/best",
];

/// Full yt-dlp argument list for one invocation.
fn command_args<'a>(extra: &[&'a str], address: &'a str, target: &'a str) -> Vec<&'a str> {
    let mut args = Vec::with_capacity(COMMON_ARGS.len() + extra.len() + 4);
    args.extend_from_slice(COMMON_ARGS);
    args.extend_from_slice(extra);
    if address != SENTINEL_ADDRESS {
        args.extend(["--source-address", address]);
    }
    args.extend(["--", target]);
    args
}

/// Marker yt-dlp prints when the source address got rate limited.
const RATE_LIMITED: &str = "HTTP Error 429";

/// [`TrackResolver`] backed by the `yt-dlp` executable. Every invocation is
/// bound to the next address of the rotator.
pub struct YtDlpResolver {
    program: String,
    timeout: Duration,
    rotator: Arc<dyn AddressRotator>,
}

impl YtDlpResolver {
    pub fn new(config: &SearchConfig, rotator: Arc<dyn AddressRotator>) -> Self {
        Self {
            program: config.ytdlp_path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            rotator,
        }
    }

    async fn invoke(&self, extra: &[&str], target: &str) -> Result<Value, ResolveError> {
        let address = self.rotator.rotate();

        let mut command = Command::new(&self.program);
        command
            .args(command_args(extra, &address, target))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Running {} for '{}' from {}", self.program, target, address);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    ResolveError::Backend(format!(
                        "could not find executable '{}' on path",
                        self.program
                    ))
                } else {
                    ResolveError::Io(e)
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains(RATE_LIMITED) {
            warn!("Source address {} was rate limited, banning it", address);
            self.rotator.mark_failed(&address);
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no output")
                .trim()
                .to_string();
            return Err(ResolveError::Backend(reason));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn search(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        let output = self.invoke(SEARCH_ARGS, query).await?;
        parse_search_output(output)
    }

    async fn playback_url(&self, track: &TrackHandle) -> Result<String, ResolveError> {
        let target = track.lookup_target();
        let output = self.invoke(PLAYBACK_ARGS, target).await?;

        output
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ResolveError::NoPlaybackUrl(target.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entry {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel_id: Option<String>,
    thumbnail: Option<String>,
    thumbnails: Option<Vec<Thumbnail>>,
    live_status: Option<String>,
    is_live: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnail {
    url: Option<String>,
}

impl Entry {
    fn into_info(self) -> Option<TrackInfo> {
        let identifier = self.id?;
        let is_live = self.live_status.as_deref() == Some("is_live") || self.is_live == Some(true);

        Some(TrackInfo {
            title: self.title.unwrap_or_else(|| identifier.clone()),
            url: self
                .url
                .or(self.webpage_url)
                .unwrap_or_else(|| identifier.clone()),
            length_ms: self
                .duration
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map_or(0, |secs| (secs * 1000.0) as u64),
            author: self.uploader.unwrap_or_else(|| "Unknown".to_string()),
            author_id: self.channel_id,
            thumbnail: self
                .thumbnails
                .into_iter()
                .flatten()
                .find_map(|thumbnail| thumbnail.url)
                .or(self.thumbnail),
            is_live,
            identifier,
        })
    }
}

/// Turns `--dump-single-json` output into track infos. Playlists and search
/// results yield their entries; a single video yields itself. Entries yt-dlp
/// could not extract are skipped.
pub fn parse_search_output(output: Value) -> Result<Vec<TrackInfo>, ResolveError> {
    let entries = match output {
        Value::Object(mut object) => match object.remove("entries") {
            Some(Value::Array(entries)) => entries,
            Some(_) | None => vec![Value::Object(object)],
        },
        other => {
            return Err(ResolveError::Backend(format!(
                "unexpected output type: {}",
                other
            )));
        },
    };

    let mut tracks = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.is_null() {
            continue;
        }
        let entry: Entry = serde_json::from_value(entry)?;
        if let Some(info) = entry.into_info() {
            tracks.push(info);
        }
    }
    Ok(tracks)
}
