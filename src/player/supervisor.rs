use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{PlayerSignal, backoff::Backoff, state::PlayerShared};
use crate::{
    configs::PlayerConfig,
    voice::{ConnectRequest, RunOutcome, TransportError, VoiceConnection, VoiceTransport},
};

/// Owner's handle to a running supervisor task.
pub struct SupervisorHandle {
    epoch: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the task wherever it is suspended.
    pub fn cancel(self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// Keeps one voice connection alive: connects, drives it, and reconnects with
/// backoff until the session ends or the supervisor is cancelled.
pub struct ReconnectSupervisor {
    request: ConnectRequest,
    epoch: u64,
    shared: Arc<PlayerShared>,
    transport: Arc<dyn VoiceTransport>,
    config: PlayerConfig,
    signals: flume::Sender<PlayerSignal>,
    log_prefix: String,
}

impl ReconnectSupervisor {
    pub fn new(
        request: ConnectRequest,
        epoch: u64,
        shared: Arc<PlayerShared>,
        transport: Arc<dyn VoiceTransport>,
        config: PlayerConfig,
        signals: flume::Sender<PlayerSignal>,
        log_prefix: String,
    ) -> Self {
        Self {
            request,
            epoch,
            shared,
            transport,
            config,
            signals,
            log_prefix,
        }
    }

    pub fn spawn(self) -> SupervisorHandle {
        let epoch = self.epoch;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("{} supervisor (epoch {}) cancelled", self.log_prefix, self.epoch);
                }
                _ = self.run() => {}
            }
        });

        SupervisorHandle {
            epoch,
            cancel,
            task,
        }
    }

    async fn connect(&self) -> Result<Arc<dyn VoiceConnection>, TransportError> {
        match tokio::time::timeout(
            self.config.connect_timeout(),
            self.transport.connect(&self.request),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn run(&self) {
        let mut backoff = Backoff::new(&self.config);

        loop {
            match self.connect().await {
                Ok(connection) => {
                    if !self.shared.install(self.epoch, connection.clone()) {
                        debug!(
                            "{} dropping connection from superseded supervisor (epoch {})",
                            self.log_prefix, self.epoch
                        );
                        return;
                    }
                    backoff.reset();
                    info!(
                        "{} connected to voice server '{}'",
                        self.log_prefix, self.request.endpoint
                    );

                    match connection.run().await {
                        RunOutcome::Reconnect(reason) => {
                            warn!("{} voice connection dropped: {}", self.log_prefix, reason);
                            if !self.shared.begin_reconnect(self.epoch) {
                                return;
                            }
                        },
                        RunOutcome::Closed => {
                            info!("{} voice server closed the session", self.log_prefix);
                            break;
                        },
                        RunOutcome::Failed(reason) => {
                            error!("{} voice connection failed: {}", self.log_prefix, reason);
                            break;
                        },
                        RunOutcome::Finished => {
                            debug!("{} voice connection finished", self.log_prefix);
                            break;
                        },
                    }
                },
                Err(err) if err.is_transient() => {
                    warn!(
                        "{} connect attempt {} failed: {}",
                        self.log_prefix,
                        backoff.attempt() + 1,
                        err
                    );
                },
                Err(err) => {
                    error!("{} could not connect: {}", self.log_prefix, err);
                    break;
                },
            }

            let Some(delay) = backoff.next() else {
                error!(
                    "{} giving up after {} reconnect attempts",
                    self.log_prefix,
                    backoff.attempt()
                );
                break;
            };
            debug!("{} retrying in {:?}", self.log_prefix, delay);
            tokio::time::sleep(delay).await;
        }

        self.teardown();
    }

    fn teardown(&self) {
        if !self.shared.finish(self.epoch) {
            return;
        }

        let signal = PlayerSignal::Closed {
            guild_id: self.request.guild_id.clone(),
            epoch: self.epoch,
        };
        if self.signals.send(signal).is_err() {
            debug!("{} owner already gone", self.log_prefix);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        player::state::PlayerStatus,
        voice::testing::{ConnectStep, MockTransport, wait_until},
    };

    fn request() -> ConnectRequest {
        ConnectRequest {
            guild_id: "7".into(),
            user_id: "9".to_string().into(),
            session_id: "s".into(),
            token: "t".into(),
            endpoint: "region.example.com".into(),
        }
    }

    fn config() -> PlayerConfig {
        PlayerConfig {
            connect_timeout_ms: 1_000,
            reconnect_min_ms: 10,
            reconnect_max_ms: 40,
            reconnect_jitter: 0.0,
            max_reconnect_attempts: Some(3),
        }
    }

    fn start(
        transport: &Arc<MockTransport>,
        shared: &Arc<PlayerShared>,
    ) -> (SupervisorHandle, flume::Receiver<PlayerSignal>) {
        start_with(transport, shared, config())
    }

    fn start_with(
        transport: &Arc<MockTransport>,
        shared: &Arc<PlayerShared>,
        config: PlayerConfig,
    ) -> (SupervisorHandle, flume::Receiver<PlayerSignal>) {
        let (tx, rx) = flume::unbounded();
        let epoch = shared.begin_epoch().unwrap();
        let handle = ReconnectSupervisor::new(
            request(),
            epoch,
            shared.clone(),
            transport.clone(),
            config,
            tx,
            "test".into(),
        )
        .spawn();
        (handle, rx)
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let transport = MockTransport::new();
        transport.push(ConnectStep::Fail(TransportError::Reconnect("busy".into())));
        transport.push(ConnectStep::Fail(TransportError::Timeout));
        let shared = PlayerShared::new();

        let (handle, rx) = start(&transport, &shared);
        wait_until(|| shared.status() == PlayerStatus::Connected).await;

        assert_eq!(transport.connect_count(), 3);
        assert!(!handle.is_finished());
        assert!(rx.try_recv().is_err());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_reconnect_outcome_opens_new_connection() {
        let transport = MockTransport::new();
        transport.push(ConnectStep::Succeed(vec![RunOutcome::Reconnect("4015".into())]));
        let shared = PlayerShared::new();

        let (handle, _rx) = start(&transport, &shared);
        transport.wait_for_connects(2).await;
        wait_until(|| shared.status() == PlayerStatus::Connected).await;

        assert!(transport.connection(0).is_disconnected());
        assert!(!transport.connection(1).is_disconnected());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_fatal_connect_error_tears_down() {
        let transport = MockTransport::new();
        transport.push(ConnectStep::Fail(TransportError::Fatal("bad token".into())));
        let shared = PlayerShared::new();

        let (handle, rx) = start(&transport, &shared);
        let signal = rx.recv_async().await.unwrap();

        let PlayerSignal::Closed { guild_id, epoch } = signal;
        assert_eq!(guild_id.0, "7");
        assert_eq!(epoch, handle.epoch());
        assert_eq!(shared.status(), PlayerStatus::Destroyed);
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_clean_close_tears_down_and_disconnects() {
        let transport = MockTransport::new();
        transport.push(ConnectStep::Succeed(vec![RunOutcome::Closed]));
        let shared = PlayerShared::new();

        let (_handle, rx) = start(&transport, &shared);
        rx.recv_async().await.unwrap();

        assert!(transport.connection(0).is_disconnected());
        assert_eq!(shared.status(), PlayerStatus::Destroyed);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_tears_down() {
        let transport = MockTransport::new();
        for _ in 0..4 {
            transport.push(ConnectStep::Fail(TransportError::Timeout));
        }
        let shared = PlayerShared::new();

        let (_handle, rx) = start(&transport, &shared);
        rx.recv_async().await.unwrap();

        // One initial attempt plus three retries.
        assert_eq!(transport.connect_count(), 4);
        assert_eq!(shared.status(), PlayerStatus::Destroyed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_connect_times_out_and_retries() {
        let transport = MockTransport::new();
        transport.push(ConnectStep::Hang);
        let shared = PlayerShared::new();

        let (handle, _rx) = start(&transport, &shared);
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        wait_until(|| shared.status() == PlayerStatus::Connected).await;

        assert_eq!(transport.connect_count(), 2);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_second_supervisor_cancels_first() {
        let transport = MockTransport::new();
        transport.push(ConnectStep::Hang);
        let shared = PlayerShared::new();

        let (first, first_rx) = start(&transport, &shared);
        transport.wait_for_connects(1).await;
        first.cancel();

        let (second, _rx) = start(&transport, &shared);
        wait_until(|| shared.status() == PlayerStatus::Connected).await;

        assert_eq!(transport.connect_count(), 2);
        assert!(first_rx.try_recv().is_err());
        assert!(!second.is_finished());
        second.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_leaks_nothing() {
        let transport = MockTransport::new();
        transport.push(ConnectStep::Succeed(vec![RunOutcome::Reconnect("4006".into())]));
        let shared = PlayerShared::new();
        let slow_retry = PlayerConfig {
            reconnect_min_ms: 5_000,
            reconnect_max_ms: 5_000,
            ..config()
        };

        let (first, first_rx) = start_with(&transport, &shared, slow_retry);
        wait_until(|| shared.status() == PlayerStatus::Reconnecting).await;
        first.cancel();

        // Well past the backoff delay the cancelled supervisor stays silent.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.connect_count(), 1);
        assert!(first_rx.try_recv().is_err());

        let (second, _rx) = start(&transport, &shared);
        wait_until(|| shared.status() == PlayerStatus::Connected).await;

        assert_eq!(transport.connect_count(), 2);
        assert!(transport.connection(0).is_disconnected());
        assert!(!transport.connection(1).is_disconnected());
        assert!(first_rx.try_recv().is_err());
        second.cancel();
    }
}
