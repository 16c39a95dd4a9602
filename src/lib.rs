//! Swish: control-plane server for remote audio players.
//!
//! Bot clients hold one WebSocket per process, drive per-guild players over an
//! op-coded JSON protocol and search tracks over `GET /search`. The audio
//! itself flows through an external [`voice::VoiceTransport`].

pub mod common;
pub mod configs;
pub mod player;
pub mod protocol;
pub mod routeplanner;
pub mod server;
pub mod sources;
pub mod transport;
pub mod voice;
