use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PlayerConfig {
    pub connect_timeout_ms: u64,
    pub reconnect_min_ms: u64,
    pub reconnect_max_ms: u64,
    /// Uniform jitter applied to each backoff delay, within +/-100%.
    pub reconnect_jitter: f32,
    /// `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            reconnect_min_ms: 250,
            reconnect_max_ms: 10_000,
            reconnect_jitter: 0.1,
            max_reconnect_attempts: None,
        }
    }
}

impl PlayerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
