use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use serde::Serialize;

use crate::voice::VoiceConnection;

/// Player lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Idle,
    AwaitingCredentials,
    Connecting,
    Connected,
    Reconnecting,
    Destroyed,
}

/// Epochs are unique across all players, so a signal from a torn down player
/// can never match a newer player for the same guild.
static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

fn next_epoch() -> u64 {
    NEXT_EPOCH.fetch_add(1, Ordering::Relaxed)
}

struct SessionSlot {
    status: PlayerStatus,
    /// Identifies the supervisor allowed to touch `connection`.
    epoch: u64,
    connection: Option<Arc<dyn VoiceConnection>>,
}

/// State shared between a player and its reconnect supervisor.
///
/// Every mutation made on behalf of a supervisor carries that supervisor's
/// epoch and is rejected once a newer one has started. Connections removed
/// from the slot are disconnected after the lock is released.
pub struct PlayerShared {
    slot: Mutex<SessionSlot>,
}

impl PlayerShared {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(SessionSlot {
                status: PlayerStatus::Idle,
                epoch: 0,
                connection: None,
            }),
        })
    }

    pub fn status(&self) -> PlayerStatus {
        self.slot.lock().status
    }

    pub fn epoch(&self) -> u64 {
        self.slot.lock().epoch
    }

    /// The live connection, only while `Connected`.
    pub fn connection(&self) -> Option<Arc<dyn VoiceConnection>> {
        let slot = self.slot.lock();
        match slot.status {
            PlayerStatus::Connected => slot.connection.clone(),
            _ => None,
        }
    }

    pub(crate) fn await_credentials(&self) {
        let mut slot = self.slot.lock();
        if slot.status == PlayerStatus::Idle {
            slot.status = PlayerStatus::AwaitingCredentials;
        }
    }

    /// Starts a new supervisor generation and drops the previous connection.
    /// Returns `None` if the player is already destroyed.
    pub(crate) fn begin_epoch(&self) -> Option<u64> {
        let (epoch, previous) = {
            let mut slot = self.slot.lock();
            if slot.status == PlayerStatus::Destroyed {
                return None;
            }
            slot.epoch = next_epoch();
            slot.status = PlayerStatus::Connecting;
            (slot.epoch, slot.connection.take())
        };

        if let Some(previous) = previous {
            previous.disconnect();
        }
        Some(epoch)
    }

    /// Stores a freshly opened connection. A stale epoch gets its connection
    /// disconnected and `false` back.
    pub(crate) fn install(&self, epoch: u64, connection: Arc<dyn VoiceConnection>) -> bool {
        let rejected = {
            let mut slot = self.slot.lock();
            if slot.epoch == epoch && slot.status != PlayerStatus::Destroyed {
                slot.status = PlayerStatus::Connected;
                slot.connection = Some(connection);
                None
            } else {
                Some(connection)
            }
        };

        match rejected {
            Some(connection) => {
                connection.disconnect();
                false
            },
            None => true,
        }
    }

    /// Moves to `Reconnecting`, releasing the current connection.
    pub(crate) fn begin_reconnect(&self, epoch: u64) -> bool {
        self.release(epoch, PlayerStatus::Reconnecting)
    }

    /// Ends the session of `epoch` for good.
    pub(crate) fn finish(&self, epoch: u64) -> bool {
        self.release(epoch, PlayerStatus::Destroyed)
    }

    /// Destroys the player regardless of epoch. Later supervisor calls are
    /// all rejected.
    pub(crate) fn destroy(&self) {
        let previous = {
            let mut slot = self.slot.lock();
            slot.epoch = next_epoch();
            slot.status = PlayerStatus::Destroyed;
            slot.connection.take()
        };

        if let Some(previous) = previous {
            previous.disconnect();
        }
    }

    fn release(&self, epoch: u64, status: PlayerStatus) -> bool {
        let previous = {
            let mut slot = self.slot.lock();
            if slot.epoch != epoch || slot.status == PlayerStatus::Destroyed {
                return false;
            }
            slot.status = status;
            slot.connection.take()
        };

        if let Some(previous) = previous {
            previous.disconnect();
        }
        true
    }
}
