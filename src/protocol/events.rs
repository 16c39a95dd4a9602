use serde::Serialize;
use serde_json::Value;

use crate::common::types::GuildId;

/// Frames sent from server to client: `{"op": ..., "d": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum OutgoingMessage {
    Event(PlayerEvent),
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerEvent {
    pub guild_id: GuildId,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    TrackStart {
        track_id: String,
        title: String,
    },
    TrackEnd {
        track_id: String,
        reason: TrackEndReason,
    },
    TrackError {
        track_id: Option<String>,
        message: String,
    },
    TrackUpdate {
        position: u64,
    },
    PlayerDebug {
        state: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackEndReason {
    Stopped,
    Replaced,
    Cleanup,
}

impl OutgoingMessage {
    pub fn event(guild_id: GuildId, kind: EventKind) -> Self {
        Self::Event(PlayerEvent { guild_id, kind })
    }
}
