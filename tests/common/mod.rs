#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use swish::{
    configs::Config,
    protocol::{TrackHandle, TrackInfo},
    routeplanner::DisabledRotator,
    server::AppState,
    sources::{ResolveError, TrackResolver},
    transport::http_server,
    voice::{ConnectRequest, RunOutcome, TransportError, VoiceConnection, VoiceTransport},
};

pub const PASSWORD: &str = "test-password";

/// Transport that records connect requests and hands out idle connections.
#[derive(Default)]
pub struct RecordingTransport {
    pub requests: Mutex<Vec<ConnectRequest>>,
}

impl RecordingTransport {
    pub fn connect_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl VoiceTransport for RecordingTransport {
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        self.requests.lock().push(request.clone());
        Ok(Arc::new(IdleConnection::default()))
    }
}

#[derive(Default)]
pub struct IdleConnection {
    playing: Mutex<bool>,
    paused: Mutex<bool>,
}

#[async_trait]
impl VoiceConnection for IdleConnection {
    async fn run(&self) -> RunOutcome {
        futures::future::pending().await
    }

    fn play(&self, _url: &str) -> Result<(), TransportError> {
        *self.playing.lock() = true;
        Ok(())
    }

    fn stop(&self) {
        *self.playing.lock() = false;
    }

    fn pause(&self) {
        *self.paused.lock() = true;
    }

    fn resume(&self) {
        *self.paused.lock() = false;
    }

    fn is_playing(&self) -> bool {
        *self.playing.lock()
    }

    fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    fn state(&self) -> Value {
        json!({ "playing": self.is_playing() })
    }

    fn disconnect(&self) {
        *self.playing.lock() = false;
    }
}

/// Resolver returning one canned track per query.
#[derive(Default)]
pub struct StaticResolver {
    pub queries: Mutex<Vec<String>>,
}

pub fn track_info(identifier: &str) -> TrackInfo {
    TrackInfo {
        title: format!("Song {}", identifier),
        identifier: identifier.to_string(),
        url: format!("https://www.youtube.com/watch?v={}", identifier),
        length_ms: 200_000,
        author: "Artist".to_string(),
        author_id: Some("UC123".to_string()),
        thumbnail: None,
        is_live: false,
    }
}

#[async_trait]
impl TrackResolver for StaticResolver {
    async fn search(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        self.queries.lock().push(query.to_string());
        Ok(vec![track_info("abc123")])
    }

    async fn playback_url(&self, track: &TrackHandle) -> Result<String, ResolveError> {
        Ok(format!("https://media.example.com/{}", track.id))
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub transport: Arc<RecordingTransport>,
    pub resolver: Arc<StaticResolver>,
    pub state: Arc<AppState>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.password = PASSWORD.to_string();
    config.search.max_results = 5;
    config
}

pub async fn spawn_server(config: Config) -> TestServer {
    let transport = Arc::new(RecordingTransport::default());
    let resolver = Arc::new(StaticResolver::default());
    let state = Arc::new(AppState::new(
        config,
        Arc::new(DisabledRotator),
        resolver.clone(),
        transport.clone(),
    ));

    let app = http_server::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        addr,
        transport,
        resolver,
        state,
    }
}

pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
