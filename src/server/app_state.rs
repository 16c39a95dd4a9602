use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use crate::{
    common::types::{ConnectionId, UserId},
    configs::Config,
    player::PlayerServices,
    routeplanner::AddressRotator,
    sources::TrackResolver,
    voice::VoiceTransport,
};

/// Registry entry for one live control connection.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub client_name: String,
    pub user_id: UserId,
    pub connected_at: u64,
}

/// Top-level application state.
pub struct AppState {
    pub config: Config,
    pub connections: DashMap<ConnectionId, ConnectionInfo>,
    pub rotator: Arc<dyn AddressRotator>,
    pub resolver: Arc<dyn TrackResolver>,
    pub transport: Arc<dyn VoiceTransport>,
}

impl AppState {
    pub fn new(
        config: Config,
        rotator: Arc<dyn AddressRotator>,
        resolver: Arc<dyn TrackResolver>,
        transport: Arc<dyn VoiceTransport>,
    ) -> Self {
        Self {
            config,
            connections: DashMap::new(),
            rotator,
            resolver,
            transport,
        }
    }

    pub fn player_services(&self) -> PlayerServices {
        PlayerServices {
            transport: self.transport.clone(),
            resolver: self.resolver.clone(),
            config: self.config.player.clone(),
        }
    }
}
