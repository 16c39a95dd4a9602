//! Outbound source-address rotation for search and lookup traffic.
//!
//! One rotator instance is shared by every request in the process; each
//! implementation serialises its read-modify-write behind a lock.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::configs::{RotationConfig, RotationMethod};

pub mod banned;
pub mod block;
pub mod nano;

pub use banned::BannedIpRotator;
pub use block::NetworkBlock;
pub use nano::NanoIpRotator;

/// Address returned when rotation is disabled or cannot produce an address.
pub const SENTINEL_ADDRESS: &str = "0.0.0.0";

#[derive(Debug, thiserror::Error)]
pub enum RoutePlannerError {
    #[error("invalid CIDR or IP '{cidr}' for route planner: {source}")]
    InvalidBlock {
        cidr: String,
        source: ipnet::AddrParseError,
    },
    #[error("invalid excluded address '{address}': {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },
}

/// Snapshot of a rotator's configuration and cursor.
#[derive(Debug, Clone, Serialize)]
pub struct RotatorStatus {
    pub method: &'static str,
    pub blocks: Vec<String>,
    /// Decimal string; the address space can exceed `u64`.
    pub total_addresses: String,
    pub current_address: Option<String>,
    pub banned_addresses: usize,
}

pub trait AddressRotator: Send + Sync {
    /// Next source address to bind outbound lookups to.
    fn rotate(&self) -> String;

    fn status(&self) -> RotatorStatus;

    /// Reports an address as rate-limited. Only rotators that track bans act
    /// on it.
    fn mark_failed(&self, _address: &str) {}
}

/// Rotator used when rotation is off or no blocks are configured.
pub struct DisabledRotator;

impl AddressRotator for DisabledRotator {
    fn rotate(&self) -> String {
        SENTINEL_ADDRESS.to_string()
    }

    fn status(&self) -> RotatorStatus {
        RotatorStatus {
            method: "disabled",
            blocks: Vec::new(),
            total_addresses: "0".to_string(),
            current_address: None,
            banned_addresses: 0,
        }
    }
}

pub(crate) fn total_space(blocks: &[NetworkBlock]) -> u128 {
    blocks
        .iter()
        .fold(0u128, |acc, block| acc.saturating_add(block.size()))
}

/// Builds the process-wide rotator from configuration.
pub fn from_config(config: &RotationConfig) -> Result<Arc<dyn AddressRotator>, RoutePlannerError> {
    if !config.enabled || config.blocks.is_empty() {
        warn!("No IP blocks configured. Increased risk of rate-limiting.");
        return Ok(Arc::new(DisabledRotator));
    }

    let blocks = config
        .blocks
        .iter()
        .map(|cidr| NetworkBlock::parse(cidr))
        .collect::<Result<Vec<_>, _>>()?;

    let rotator: Arc<dyn AddressRotator> = match config.method {
        RotationMethod::Banned => {
            let excluded = config
                .excluded_ips
                .iter()
                .map(|address| {
                    address
                        .trim()
                        .parse()
                        .map_err(|source| RoutePlannerError::InvalidAddress {
                            address: address.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(BannedIpRotator::new(blocks, excluded))
        }
        RotationMethod::Nanosecond => {
            let rotator = NanoIpRotator::new(blocks);
            if !rotator.is_usable() {
                warn!(
                    "Nanosecond rotation needs at least 2^64 addresses; only {} configured. Falling back to {}.",
                    rotator.total(),
                    SENTINEL_ADDRESS
                );
            }
            Arc::new(rotator)
        }
    };

    let status = rotator.status();
    info!(
        "IP rotation enabled ({}) using {} total addresses across {:?}.",
        status.method, status.total_addresses, status.blocks
    );

    Ok(rotator)
}
