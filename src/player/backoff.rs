use std::time::Duration;

use rand::random;

use crate::configs::PlayerConfig;

/// Exponential reconnect delay with uniform jitter.
///
/// Each attempt waits roughly twice as long as the last one, perturbed by
/// +/-`jitter` and clamped into `[min, max]`.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    min: Duration,
    max: Duration,
    jitter: f32,
    max_attempts: Option<u32>,
    attempt: u32,
    last: Option<Duration>,
}

impl Backoff {
    pub(crate) fn new(config: &PlayerConfig) -> Self {
        Self {
            min: Duration::from_millis(config.reconnect_min_ms),
            max: Duration::from_millis(config.reconnect_max_ms),
            jitter: config.reconnect_jitter.clamp(0.0, 1.0),
            max_attempts: config.max_reconnect_attempts,
            attempt: 0,
            last: None,
        }
    }

    /// Delay before the next attempt, or `None` once the attempt budget is
    /// spent.
    pub(crate) fn next(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempt += 1;

        let base = self.last.map_or(self.min, |last| last.saturating_mul(2));
        let perturb = (1.0 + f64::from(self.jitter) * (2.0 * random::<f64>() - 1.0)).clamp(0.0, 2.0);
        let jittered = Duration::from_nanos((base.as_nanos() as f64 * perturb).round() as u64);
        let safe_max = self.max.max(self.min);
        let delay = jittered.clamp(self.min, safe_max);

        self.last = Some(delay);
        Some(delay)
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.max_attempts.is_some_and(|limit| self.attempt >= limit)
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
        self.last = None;
    }
}
