//! Boundary to the metadata/search backend.

use async_trait::async_trait;

use crate::protocol::{SearchSource, SearchTrack, TrackHandle, TrackInfo};

pub mod ytdlp;

#[cfg(test)]
pub(crate) mod testing;

pub use ytdlp::YtDlpResolver;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to run resolver: {0}")]
    Io(#[from] std::io::Error),
    #[error("resolver timed out after {0}s")]
    Timeout(u64),
    #[error("resolver failed: {0}")]
    Backend(String),
    #[error("resolver returned malformed output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no playable url for '{0}'")]
    NoPlaybackUrl(String),
}

#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Resolves a (possibly prefixed) query to track metadata.
    async fn search(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError>;

    /// Resolves a track to a directly streamable url.
    async fn playback_url(&self, track: &TrackHandle) -> Result<String, ResolveError>;
}

/// Runs a search for `query` on `source` and wraps each result with its
/// public track handle.
pub async fn search_tracks(
    resolver: &dyn TrackResolver,
    query: &str,
    source: SearchSource,
    max_results: u16,
) -> Result<Vec<SearchTrack>, ResolveError> {
    let query = format!("{}{}", source.prefix(max_results), query);
    let tracks = resolver.search(&query).await?;

    Ok(tracks
        .into_iter()
        .map(|info| SearchTrack {
            id: TrackHandle::from_info(&info, false).encode(),
            info,
        })
        .collect())
}
