use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::{
    PlayerServices, PlayerSignal,
    credentials::VoiceSessionCredentials,
    state::{PlayerShared, PlayerStatus},
    supervisor::{ReconnectSupervisor, SupervisorHandle},
};
use crate::{
    common::types::{GuildId, UserId},
    protocol::{
        EventKind, OutgoingMessage, TrackEndReason, TrackHandle,
        opcodes::{PlayData, PlayerCommand, SetPauseStateData, SetPositionData, VoiceUpdateData},
    },
    voice::{TransportError, VoiceConnection},
};

/// Track the player last started.
#[derive(Debug, Clone)]
struct CurrentTrack {
    encoded: String,
    title: String,
}

/// Playback session for one guild on one control connection.
pub struct Player {
    guild_id: GuildId,
    user_id: UserId,
    log_prefix: String,
    shared: Arc<PlayerShared>,
    credentials: VoiceSessionCredentials,
    supervisor: Option<SupervisorHandle>,
    current: Option<CurrentTrack>,
    services: PlayerServices,
    events: flume::Sender<OutgoingMessage>,
    signals: flume::Sender<PlayerSignal>,
    destroyed: bool,
}

impl Player {
    pub fn new(
        guild_id: GuildId,
        user_id: UserId,
        client_name: &str,
        services: PlayerServices,
        events: flume::Sender<OutgoingMessage>,
        signals: flume::Sender<PlayerSignal>,
    ) -> Self {
        let log_prefix = format!("{} - Player '{}'", client_name, guild_id);
        debug!("{} created", log_prefix);

        Self {
            guild_id,
            user_id,
            log_prefix,
            shared: PlayerShared::new(),
            credentials: VoiceSessionCredentials::new(),
            supervisor: None,
            current: None,
            services,
            events,
            signals,
            destroyed: false,
        }
    }

    pub fn guild_id(&self) -> &GuildId {
        &self.guild_id
    }

    pub fn status(&self) -> PlayerStatus {
        self.shared.status()
    }

    pub fn epoch(&self) -> u64 {
        self.shared.epoch()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed || self.shared.status() == PlayerStatus::Destroyed
    }

    pub async fn handle(&mut self, command: PlayerCommand) {
        if self.is_destroyed() {
            debug!(
                "{} ignoring '{}': player is destroyed",
                self.log_prefix,
                command.op()
            );
            return;
        }

        match command {
            PlayerCommand::VoiceUpdate(data) => self.voice_update(data),
            PlayerCommand::Destroy => self.destroy(),
            PlayerCommand::Play(data) => self.play(data).await,
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::SetPauseState(data) => self.set_pause_state(data),
            PlayerCommand::SetPosition(data) => self.set_position(data),
            PlayerCommand::SetFilter(data) => self.set_filter(data),
            PlayerCommand::Debug => self.debug(),
        }
    }

    fn voice_update(&mut self, data: VoiceUpdateData) {
        let VoiceUpdateData {
            session_id,
            token,
            endpoint,
        } = data;

        let server = match (token, endpoint) {
            (Some(token), Some(endpoint)) => Some((token, endpoint)),
            (None, None) => None,
            (Some(_), None) => {
                error!("{} 'voice_update' has a token but no 'endpoint'", self.log_prefix);
                return;
            },
            (None, Some(_)) => {
                error!("{} 'voice_update' has an endpoint but no 'token'", self.log_prefix);
                return;
            },
        };
        if session_id.is_none() && server.is_none() {
            error!(
                "{} 'voice_update' carries neither 'session_id' nor 'token'",
                self.log_prefix
            );
            return;
        }

        let mut changed = false;
        if let Some(session_id) = session_id {
            changed |= self.credentials.apply_session_update(session_id);
        }
        if let Some((token, endpoint)) = server {
            changed |= self.credentials.apply_server_update(token, &endpoint);
        }

        let Some(request) = self
            .credentials
            .connect_request(&self.guild_id, &self.user_id)
        else {
            debug!("{} waiting for the rest of the voice session", self.log_prefix);
            self.shared.await_credentials();
            return;
        };

        let live = self
            .supervisor
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        if live && !changed {
            debug!("{} voice session unchanged", self.log_prefix);
            return;
        }

        self.cancel_supervisor();
        let Some(epoch) = self.shared.begin_epoch() else {
            return;
        };

        info!(
            "{} connecting to voice server '{}' (epoch {})",
            self.log_prefix, request.endpoint, epoch
        );
        let supervisor = ReconnectSupervisor::new(
            request,
            epoch,
            self.shared.clone(),
            self.services.transport.clone(),
            self.services.config.clone(),
            self.signals.clone(),
            self.log_prefix.clone(),
        );
        self.supervisor = Some(supervisor.spawn());
    }

    /// Cancels the supervisor, drops the connection and marks the player
    /// destroyed. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        // A connection the transport already released cannot report the
        // track, so the last started one counts as playing.
        let still_playing = self
            .shared
            .connection()
            .is_none_or(|connection| connection.is_playing());
        self.cancel_supervisor();
        self.shared.destroy();

        if let Some(track) = self.current.take().filter(|_| still_playing) {
            self.emit(EventKind::TrackEnd {
                track_id: track.encoded,
                reason: TrackEndReason::Cleanup,
            });
        }
        info!("{} destroyed", self.log_prefix);
    }

    async fn play(&mut self, data: PlayData) {
        let Some(connection) = self.connected("play") else {
            return;
        };
        let Some(track_id) = data.track_id else {
            error!("{} 'play' is missing 'track_id'", self.log_prefix);
            return;
        };

        let replace = data.replace.unwrap_or(true);
        if !replace && connection.is_playing() {
            debug!(
                "{} ignoring 'play': a track is playing and replace is false",
                self.log_prefix
            );
            return;
        }

        let handle = match TrackHandle::decode(&track_id) {
            Ok(handle) => handle,
            Err(err) => {
                error!("{} could not decode track '{}': {}", self.log_prefix, track_id, err);
                self.track_error(Some(track_id), err.to_string());
                return;
            },
        };

        let url = match self.services.resolver.playback_url(&handle).await {
            Ok(url) => url,
            Err(err) => {
                error!(
                    "{} could not resolve '{}': {}",
                    self.log_prefix,
                    handle.lookup_target(),
                    err
                );
                self.track_error(Some(track_id), err.to_string());
                return;
            },
        };

        // The session may have been replaced while the url was resolving.
        let Some(connection) = self.shared.connection() else {
            error!(
                "{} voice connection lost while resolving '{}'",
                self.log_prefix, handle.title
            );
            self.track_error(
                Some(track_id),
                "voice connection lost while resolving the track".to_string(),
            );
            return;
        };

        let previous = self
            .current
            .clone()
            .filter(|_| connection.is_playing());

        if let Err(err) = connection.play(&url) {
            error!("{} could not start '{}': {}", self.log_prefix, handle.title, err);
            self.track_error(Some(track_id), err.to_string());
            return;
        }

        if let Some(previous) = previous {
            self.emit(EventKind::TrackEnd {
                track_id: previous.encoded,
                reason: TrackEndReason::Replaced,
            });
        }
        info!("{} started playing '{}'", self.log_prefix, handle.title);
        self.emit(EventKind::TrackStart {
            track_id: track_id.clone(),
            title: handle.title.clone(),
        });
        self.current = Some(CurrentTrack {
            encoded: track_id,
            title: handle.title,
        });

        if let Some(start_time) = data.start_time.filter(|&ms| ms > 0) {
            match connection.seek(start_time) {
                Ok(()) => debug!("{} started at {}ms", self.log_prefix, start_time),
                Err(err) => warn!("{} could not apply 'start_time': {}", self.log_prefix, err),
            }
        }
    }

    fn stop(&mut self) {
        let Some(connection) = self.connected("stop") else {
            return;
        };
        if !connection.is_playing() {
            debug!("{} 'stop' ignored: nothing is playing", self.log_prefix);
            return;
        }

        connection.stop();
        match self.current.take() {
            Some(track) => {
                info!("{} stopped '{}'", self.log_prefix, track.title);
                self.emit(EventKind::TrackEnd {
                    track_id: track.encoded,
                    reason: TrackEndReason::Stopped,
                });
            },
            None => debug!("{} stopped a track it did not start", self.log_prefix),
        }
    }

    fn set_pause_state(&mut self, data: SetPauseStateData) {
        let Some(connection) = self.connected("set_pause_state") else {
            return;
        };
        let Some(paused) = data.state else {
            error!("{} 'set_pause_state' is missing 'state'", self.log_prefix);
            return;
        };

        if paused == connection.is_paused() {
            debug!(
                "{} already {}",
                self.log_prefix,
                if paused { "paused" } else { "playing" }
            );
            return;
        }

        if paused {
            connection.pause();
            info!("{} paused", self.log_prefix);
        } else {
            connection.resume();
            info!("{} resumed", self.log_prefix);
        }
    }

    fn set_position(&mut self, data: SetPositionData) {
        let Some(connection) = self.connected("set_position") else {
            return;
        };
        let Some(position) = data.position else {
            error!("{} 'set_position' is missing 'position'", self.log_prefix);
            return;
        };
        if !connection.is_playing() {
            debug!("{} 'set_position' ignored: nothing is playing", self.log_prefix);
            return;
        }

        match connection.seek(position) {
            Ok(()) => {
                debug!("{} seeked to {}ms", self.log_prefix, position);
                self.emit(EventKind::TrackUpdate { position });
            },
            Err(err @ TransportError::Unsupported(_)) => {
                warn!("{} {}", self.log_prefix, err);
            },
            Err(err) => {
                error!("{} seek failed: {}", self.log_prefix, err);
            },
        }
    }

    fn set_filter(&mut self, data: Map<String, Value>) {
        warn!(
            "{} 'set_filter' is not yet implemented ({} keys ignored)",
            self.log_prefix,
            data.len()
        );
    }

    fn debug(&mut self) {
        let Some(connection) = self.connected("debug") else {
            return;
        };
        let state = connection.state();
        info!("{} debug state: {}", self.log_prefix, state);
        self.emit(EventKind::PlayerDebug { state });
    }

    /// The live connection, or `None` with a diagnostic for `op`.
    fn connected(&self, op: &str) -> Option<Arc<dyn VoiceConnection>> {
        let connection = self.shared.connection();
        if connection.is_none() {
            warn!(
                "{} '{}' ignored: not connected ({:?})",
                self.log_prefix,
                op,
                self.shared.status()
            );
        }
        connection
    }

    fn cancel_supervisor(&mut self) {
        if let Some(handle) = self.supervisor.take() {
            debug!(
                "{} cancelling supervisor (epoch {})",
                self.log_prefix,
                handle.epoch()
            );
            handle.cancel();
        }
    }

    fn track_error(&self, track_id: Option<String>, message: String) {
        self.emit(EventKind::TrackError { track_id, message });
    }

    fn emit(&self, kind: EventKind) {
        let message = OutgoingMessage::event(self.guild_id.clone(), kind);
        if self.events.send(message).is_err() {
            debug!("{} event dropped: connection closed", self.log_prefix);
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.destroy();
    }
}
