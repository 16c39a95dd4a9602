use std::{collections::HashSet, net::IpAddr};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{AddressRotator, NetworkBlock, RotatorStatus, SENTINEL_ADDRESS, total_space};

/// Upper bound on banned addresses skipped by a single `rotate()` call.
const MAX_BANNED_SKIPS: u128 = 1024;

struct Cursor {
    block: usize,
    offset: u128,
    current: Option<IpAddr>,
    banned: HashSet<IpAddr>,
}

/// Walks the configured blocks in a fixed cycle, exhausting each block
/// address by address before moving to the next. Banned addresses are
/// skipped.
pub struct BannedIpRotator {
    blocks: Vec<NetworkBlock>,
    total: u128,
    cursor: Mutex<Cursor>,
}

impl BannedIpRotator {
    pub fn new(blocks: Vec<NetworkBlock>, banned: impl IntoIterator<Item = IpAddr>) -> Self {
        let total = total_space(&blocks);
        Self {
            blocks,
            total,
            cursor: Mutex::new(Cursor {
                block: 0,
                offset: 0,
                current: None,
                banned: banned.into_iter().collect(),
            }),
        }
    }

    pub fn ban(&self, address: IpAddr) {
        debug!("Banned IP: {}", address);
        self.cursor.lock().banned.insert(address);
    }

    pub fn unban(&self, address: &IpAddr) -> bool {
        self.cursor.lock().banned.remove(address)
    }

    pub fn unban_all(&self) {
        self.cursor.lock().banned.clear();
    }

    fn next_address(&self) -> Option<IpAddr> {
        if self.blocks.is_empty() {
            return None;
        }

        let mut cursor = self.cursor.lock();
        for _ in 0..self.total.min(MAX_BANNED_SKIPS) {
            let block = &self.blocks[cursor.block];
            let address = block.nth(cursor.offset);

            cursor.offset += 1;
            if cursor.offset >= block.size() {
                cursor.block = (cursor.block + 1) % self.blocks.len();
                cursor.offset = 0;
            }

            if cursor.banned.contains(&address) {
                continue;
            }

            cursor.current = Some(address);
            return Some(address);
        }

        None
    }
}

impl AddressRotator for BannedIpRotator {
    fn rotate(&self) -> String {
        match self.next_address() {
            Some(address) => {
                debug!("Rotated to new IP: {}", address);
                address.to_string()
            }
            None => {
                warn!("Every candidate address is banned; using {}", SENTINEL_ADDRESS);
                SENTINEL_ADDRESS.to_string()
            }
        }
    }

    fn status(&self) -> RotatorStatus {
        let cursor = self.cursor.lock();
        RotatorStatus {
            method: "banned",
            blocks: self.blocks.iter().map(|b| b.to_string()).collect(),
            total_addresses: self.total.to_string(),
            current_address: cursor.current.map(|a| a.to_string()),
            banned_addresses: cursor.banned.len(),
        }
    }

    fn mark_failed(&self, address: &str) {
        match address.parse() {
            Ok(address) => self.ban(address),
            Err(_) => warn!("Ignoring ban for unparseable address '{}'", address),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;

    fn rotator(blocks: &[&str]) -> BannedIpRotator {
        let blocks = blocks
            .iter()
            .map(|b| NetworkBlock::parse(b).unwrap())
            .collect();
        BannedIpRotator::new(blocks, Vec::new())
    }

    #[test]
    fn test_consecutive_calls_never_repeat_within_total() {
        let rotator = rotator(&["10.0.0.0/29", "192.168.0.0/30", "172.16.5.1"]);
        let total = 8 + 4 + 1;

        let seen: HashSet<String> = (0..total).map(|_| rotator.rotate()).collect();
        assert_eq!(seen.len(), total);
    }

    #[test]
    fn test_exhausted_block_advances_in_cycle_order() {
        let rotator = rotator(&["10.0.0.0/31", "10.1.0.0/31"]);

        let order: Vec<String> = (0..6).map(|_| rotator.rotate()).collect();
        assert_eq!(
            order,
            vec![
                "10.0.0.0", "10.0.0.1", "10.1.0.0", "10.1.0.1", "10.0.0.0", "10.0.0.1"
            ]
        );
    }

    #[test]
    fn test_banned_addresses_are_skipped() {
        let rotator = rotator(&["10.0.0.0/30"]);
        rotator.mark_failed("10.0.0.1");
        rotator.ban("10.0.0.2".parse().unwrap());

        assert_eq!(rotator.rotate(), "10.0.0.0");
        assert_eq!(rotator.rotate(), "10.0.0.3");
        assert_eq!(rotator.rotate(), "10.0.0.0");
        assert_eq!(rotator.status().banned_addresses, 2);

        assert!(rotator.unban(&"10.0.0.1".parse().unwrap()));
        assert_eq!(rotator.rotate(), "10.0.0.1");
    }

    #[test]
    fn test_fully_banned_block_returns_sentinel() {
        let rotator = rotator(&["10.0.0.0/31"]);
        rotator.mark_failed("10.0.0.0");
        rotator.mark_failed("10.0.0.1");
        assert_eq!(rotator.rotate(), SENTINEL_ADDRESS);

        rotator.unban_all();
        assert_ne!(rotator.rotate(), SENTINEL_ADDRESS);
    }

    #[test]
    fn test_status_reports_current_address() {
        let rotator = rotator(&["2001:db8::/126"]);
        assert_eq!(rotator.status().current_address, None);
        rotator.rotate();
        let status = rotator.status();
        assert_eq!(status.current_address.as_deref(), Some("2001:db8::"));
        assert_eq!(status.total_addresses, "4");
    }

    #[test]
    fn test_concurrent_rotation_hands_out_unique_addresses() {
        let rotator = Arc::new(rotator(&["10.0.0.0/24"]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rotator = rotator.clone();
                std::thread::spawn(move || (0..32).map(|_| rotator.rotate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for address in handle.join().unwrap() {
                assert!(seen.insert(address), "address handed out twice");
            }
        }
        assert_eq!(seen.len(), 256);
    }
}
