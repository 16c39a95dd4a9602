use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ResolveError, TrackResolver};
use crate::protocol::{TrackHandle, TrackInfo};

/// Resolver double that records every lookup.
#[derive(Default)]
pub(crate) struct MockResolver {
    pub queries: Mutex<Vec<String>>,
    pub lookups: Mutex<Vec<TrackHandle>>,
    fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let resolver = Self::default();
        resolver.fail.store(true, Ordering::SeqCst);
        resolver
    }

    /// Playback lookups take `delay` before answering.
    pub fn delayed(delay: Duration) -> Self {
        let resolver = Self::default();
        *resolver.delay.lock() = Some(delay);
        resolver
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().len()
    }
}

pub(crate) fn sample_info(identifier: &str) -> TrackInfo {
    TrackInfo {
        title: format!("Track {}", identifier),
        identifier: identifier.to_string(),
        url: format!("https://www.youtube.com/watch?v={}", identifier),
        length_ms: 180_000,
        author: "Someone".to_string(),
        author_id: None,
        thumbnail: None,
        is_live: false,
    }
}

#[async_trait]
impl TrackResolver for MockResolver {
    async fn search(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        self.queries.lock().push(query.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResolveError::Backend("search backend down".to_string()));
        }
        Ok(vec![sample_info("dQw4w9WgXcQ")])
    }

    async fn playback_url(&self, track: &TrackHandle) -> Result<String, ResolveError> {
        self.lookups.lock().push(track.clone());
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResolveError::NoPlaybackUrl(track.id.clone()));
        }
        Ok(format!("https://media.example.com/{}.webm", track.id))
    }
}
