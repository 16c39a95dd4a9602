//! Scriptable transport doubles for unit tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;

use super::{ConnectRequest, RunOutcome, TransportError, VoiceConnection, VoiceTransport};

/// What the next `connect()` call does.
pub(crate) enum ConnectStep {
    Fail(TransportError),
    /// Succeeds; the connection's `run()` yields these outcomes in order and
    /// then blocks forever.
    Succeed(Vec<RunOutcome>),
    /// Never completes.
    Hang,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    steps: Mutex<VecDeque<ConnectStep>>,
    pub requests: Mutex<Vec<ConnectRequest>>,
    pub connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, step: ConnectStep) {
        self.steps.lock().push_back(step);
    }

    pub fn connect_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn connection(&self, index: usize) -> Arc<MockConnection> {
        self.connections.lock()[index].clone()
    }

    pub async fn wait_for_connects(&self, count: usize) {
        wait_until(|| self.connect_count() >= count).await;
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        self.requests.lock().push(request.clone());
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or(ConnectStep::Succeed(Vec::new()));

        match step {
            ConnectStep::Fail(err) => Err(err),
            ConnectStep::Hang => futures::future::pending().await,
            ConnectStep::Succeed(outcomes) => {
                let connection = Arc::new(MockConnection::new(outcomes));
                self.connections.lock().push(connection.clone());
                Ok(connection as Arc<dyn VoiceConnection>)
            }
        }
    }
}

pub(crate) struct MockConnection {
    outcomes: Mutex<VecDeque<RunOutcome>>,
    wakeup: Notify,
    pub played: Mutex<Vec<String>>,
    pub seeks: Mutex<Vec<u64>>,
    pub seek_supported: AtomicBool,
    playing: AtomicBool,
    paused: AtomicBool,
    pub pause_calls: AtomicUsize,
    pub resume_calls: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl MockConnection {
    fn new(outcomes: Vec<RunOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            wakeup: Notify::new(),
            played: Mutex::new(Vec::new()),
            seeks: Mutex::new(Vec::new()),
            seek_supported: AtomicBool::new(true),
            playing: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            pause_calls: AtomicUsize::new(0),
            resume_calls: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnects.load(Ordering::SeqCst) > 0
    }

    /// The track ends on its own, as if it played to completion.
    pub fn finish_track(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Makes a pending `run()` return `outcome`.
    pub fn end_with(&self, outcome: RunOutcome) {
        self.outcomes.lock().push_back(outcome);
        self.wakeup.notify_one();
    }
}

#[async_trait]
impl VoiceConnection for MockConnection {
    async fn run(&self) -> RunOutcome {
        loop {
            let next = self.outcomes.lock().pop_front();
            if let Some(outcome) = next {
                return outcome;
            }
            self.wakeup.notified().await;
        }
    }

    fn play(&self, url: &str) -> Result<(), TransportError> {
        self.played.lock().push(url.to_string());
        self.playing.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn seek(&self, position_ms: u64) -> Result<(), TransportError> {
        if !self.seek_supported.load(Ordering::SeqCst) {
            return Err(TransportError::Unsupported("seeking"));
        }
        self.seeks.lock().push(position_ms);
        Ok(())
    }

    fn state(&self) -> Value {
        json!({
            "playing": self.is_playing(),
            "paused": self.is_paused(),
        })
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
    }
}

/// Polls `condition` until it holds, panicking after a generous deadline.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
