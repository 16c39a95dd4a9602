use std::{collections::HashMap, sync::Arc};

use futures::{Stream, StreamExt};
use tracing::{debug, error, info};

use super::{
    app_state::{AppState, ConnectionInfo},
    auth::Identity,
};
use crate::{
    common::types::{ConnectionId, GuildId, now_ms},
    player::{Player, PlayerServices, PlayerSignal},
    protocol::{Frame, OutgoingMessage, PlayerCommand},
};

/// One authenticated control socket and the players it owns.
///
/// Inbound payloads are handled strictly one after another; a payload is
/// fully processed before the next one is read.
pub struct ControlConnection {
    id: ConnectionId,
    identity: Identity,
    state: Arc<AppState>,
    services: PlayerServices,
    players: HashMap<GuildId, Player>,
    events: flume::Sender<OutgoingMessage>,
    signal_tx: flume::Sender<PlayerSignal>,
    signal_rx: flume::Receiver<PlayerSignal>,
}

impl ControlConnection {
    /// Registers the connection in the process-wide registry.
    pub fn register(
        state: Arc<AppState>,
        identity: Identity,
        events: flume::Sender<OutgoingMessage>,
    ) -> Self {
        let id = ConnectionId::generate();
        state.connections.insert(
            id,
            ConnectionInfo {
                client_name: identity.client_name.clone(),
                user_id: identity.user_id.clone(),
                connected_at: now_ms(),
            },
        );
        info!(
            "Websocket connection from <{}> established ({})",
            identity.client_name, id
        );

        let (signal_tx, signal_rx) = flume::unbounded();
        Self {
            id,
            services: state.player_services(),
            identity,
            state,
            players: HashMap::new(),
            events,
            signal_tx,
            signal_rx,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Processes `inbound` until it ends, then tears everything down.
    pub async fn run<S>(mut self, mut inbound: S)
    where
        S: Stream<Item = String> + Unpin,
    {
        let signals = self.signal_rx.clone();

        loop {
            tokio::select! {
                text = inbound.next() => match text {
                    Some(text) => self.handle_text(&text).await,
                    None => break,
                },
                Ok(signal) = signals.recv_async() => self.handle_signal(signal),
            }
        }

        self.shutdown();
    }

    pub async fn handle_text(&mut self, text: &str) {
        let client_name = &self.identity.client_name;

        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(err) => {
                error!("Discarding payload from <{}>: {}", client_name, err);
                debug!("Payload: {}", text);
                return;
            },
        };
        debug!(
            "Received '{}' for guild '{}' from <{}>",
            frame.op, frame.guild_id, client_name
        );

        let guild_id = frame.guild_id.clone();
        let op = frame.op;
        let command = match PlayerCommand::from_frame(frame) {
            Ok(command) => command,
            Err(err) => {
                error!(
                    "Discarding '{}' for guild '{}' from <{}>: invalid data: {}",
                    op, guild_id, client_name, err
                );
                return;
            },
        };

        if matches!(command, PlayerCommand::Destroy) {
            match self.players.remove(&guild_id) {
                Some(mut player) => player.destroy(),
                None => debug!(
                    "Ignoring 'destroy' for unknown guild '{}' from <{}>",
                    guild_id, client_name
                ),
            }
            return;
        }

        // A player torn down by its transport is replaced on the next payload.
        if self
            .players
            .get(&guild_id)
            .is_some_and(Player::is_destroyed)
        {
            self.players.remove(&guild_id);
        }

        let player = self.players.entry(guild_id).or_insert_with_key(|guild_id| {
            Player::new(
                guild_id.clone(),
                self.identity.user_id.clone(),
                &self.identity.client_name,
                self.services.clone(),
                self.events.clone(),
                self.signal_tx.clone(),
            )
        });
        player.handle(command).await;
    }

    pub fn handle_signal(&mut self, signal: PlayerSignal) {
        match signal {
            PlayerSignal::Closed { guild_id, epoch } => {
                let current = self
                    .players
                    .get(&guild_id)
                    .is_some_and(|player| player.epoch() == epoch);
                if !current {
                    debug!(
                        "Ignoring stale close of guild '{}' (epoch {}) on <{}>",
                        guild_id, epoch, self.identity.client_name
                    );
                    return;
                }

                if let Some(mut player) = self.players.remove(&guild_id) {
                    player.destroy();
                }
            },
        }
    }

    /// Destroys every owned player and deregisters the connection.
    pub fn shutdown(mut self) {
        for (_, mut player) in self.players.drain() {
            player.destroy();
        }
        self.state.connections.remove(&self.id);
        info!(
            "Websocket connection from <{}> closed",
            self.identity.client_name
        );
    }
}
