use std::net::IpAddr;

use parking_lot::Mutex;
use tracing::debug;

use super::{AddressRotator, NetworkBlock, RotatorStatus, SENTINEL_ADDRESS, total_space};

/// Smallest address space the time-derived rotation is allowed to run on.
pub const MIN_ADDRESS_SPACE: u128 = 1 << 64;

struct Anchor {
    nanos: u128,
    current: Option<IpAddr>,
}

/// Derives the address from the nanoseconds elapsed since an anchor,
/// treating every configured block as one concatenated range.
pub struct NanoIpRotator {
    blocks: Vec<NetworkBlock>,
    total: u128,
    anchor: Mutex<Anchor>,
}

fn now_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

impl NanoIpRotator {
    pub fn new(blocks: Vec<NetworkBlock>) -> Self {
        Self::with_anchor(blocks, now_nanos())
    }

    pub fn with_anchor(blocks: Vec<NetworkBlock>, anchor: u128) -> Self {
        let total = total_space(&blocks);
        Self {
            blocks,
            total,
            anchor: Mutex::new(Anchor {
                nanos: anchor,
                current: None,
            }),
        }
    }

    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn is_usable(&self) -> bool {
        self.total >= MIN_ADDRESS_SPACE
    }

    /// Address for the wall-clock instant `now` (nanoseconds since the Unix
    /// epoch). Elapsed time past the whole space re-anchors at `now`.
    pub fn rotate_at(&self, now: u128) -> Option<IpAddr> {
        if !self.is_usable() {
            return None;
        }

        let mut anchor = self.anchor.lock();
        let mut elapsed = now.saturating_sub(anchor.nanos);
        if elapsed >= self.total {
            debug!("Nanosecond rotator exhausted its address space; re-anchoring");
            anchor.nanos = now;
            elapsed = 0;
        }

        let address = self.address_at(elapsed)?;
        anchor.current = Some(address);
        Some(address)
    }

    fn address_at(&self, mut offset: u128) -> Option<IpAddr> {
        for block in &self.blocks {
            if offset < block.size() {
                return Some(block.nth(offset));
            }
            offset -= block.size();
        }
        None
    }
}

impl AddressRotator for NanoIpRotator {
    fn rotate(&self) -> String {
        match self.rotate_at(now_nanos()) {
            Some(address) => address.to_string(),
            None => SENTINEL_ADDRESS.to_string(),
        }
    }

    fn status(&self) -> RotatorStatus {
        RotatorStatus {
            method: "nanosecond",
            blocks: self.blocks.iter().map(|b| b.to_string()).collect(),
            total_addresses: self.total.to_string(),
            current_address: self.anchor.lock().current.map(|a| a.to_string()),
            banned_addresses: 0,
        }
    }
}
