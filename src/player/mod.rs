pub mod backoff;
pub mod context;
pub mod credentials;
pub mod state;
pub mod supervisor;

use std::sync::Arc;

pub use context::Player;
pub use credentials::{VoiceSessionCredentials, normalize_endpoint};
pub use state::{PlayerShared, PlayerStatus};
pub use supervisor::{ReconnectSupervisor, SupervisorHandle};

use crate::{
    common::types::GuildId, configs::PlayerConfig, sources::TrackResolver, voice::VoiceTransport,
};

/// Reported by supervisors to the connection that owns the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSignal {
    /// The session of `epoch` ended; the player should be removed if it has
    /// not moved on to a newer epoch.
    Closed { guild_id: GuildId, epoch: u64 },
}

/// Collaborators every player needs.
#[derive(Clone)]
pub struct PlayerServices {
    pub transport: Arc<dyn VoiceTransport>,
    pub resolver: Arc<dyn TrackResolver>,
    pub config: PlayerConfig,
}
