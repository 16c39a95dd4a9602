//! Boundary to the real-time audio transport.
//!
//! The control plane never speaks the voice wire protocol itself; it drives a
//! [`VoiceTransport`] and reacts to what its connections report.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::common::types::{GuildId, UserId};

pub mod unavailable;

#[cfg(test)]
pub(crate) mod testing;

pub use unavailable::UnavailableTransport;

/// Everything needed to open a voice connection for one guild.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub session_id: String,
    pub token: String,
    /// Host only: no scheme, no port.
    pub endpoint: String,
}

impl fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("guild_id", &self.guild_id)
            .field("user_id", &self.user_id)
            .field("session_id", &self.session_id)
            .field("token", &"<secret>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// How a connection's run loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The loop returned without reporting anything.
    Finished,
    /// The voice server closed the session cleanly.
    Closed,
    /// Unrecoverable connection error.
    Failed(String),
    /// Transient failure; a fresh connect should be attempted.
    Reconnect(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect attempt timed out")]
    Timeout,
    #[error("voice server requested a reconnect: {0}")]
    Reconnect(String),
    #[error("fatal voice connection error: {0}")]
    Fatal(String),
    #[error("{0} is not supported by the voice transport")]
    Unsupported(&'static str),
}

impl TransportError {
    /// Errors the supervisor retries instead of tearing the player down.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Reconnect(_))
    }
}

#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(
        &self,
        request: &ConnectRequest,
    ) -> Result<Arc<dyn VoiceConnection>, TransportError>;
}

/// A live voice connection for one guild.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Drives the connection until it ends. Must be cancel-safe.
    async fn run(&self) -> RunOutcome;

    fn play(&self, url: &str) -> Result<(), TransportError>;
    fn stop(&self);
    fn pause(&self);
    fn resume(&self);
    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;

    fn seek(&self, _position_ms: u64) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("seeking"))
    }

    /// Transport-defined diagnostic snapshot.
    fn state(&self) -> Value;

    fn disconnect(&self);
}
