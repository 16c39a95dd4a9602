use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

use ipnet::IpNet;

use super::RoutePlannerError;

/// An immutable CIDR range handed out address by address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkBlock {
    net: IpNet,
    size: u128,
}

impl NetworkBlock {
    /// Parses a CIDR; a bare address is treated as a single-address block.
    pub fn parse(cidr: &str) -> Result<Self, RoutePlannerError> {
        let cidr = cidr.trim();
        let net = IpNet::from_str(cidr)
            .or_else(|_| {
                if cidr.contains(':') {
                    IpNet::from_str(&format!("{}/128", cidr))
                } else {
                    IpNet::from_str(&format!("{}/32", cidr))
                }
            })
            .map_err(|source| RoutePlannerError::InvalidBlock {
                cidr: cidr.to_string(),
                source,
            })?;

        Ok(Self::from(net))
    }

    pub fn net(&self) -> IpNet {
        self.net
    }

    /// Number of addresses in the block. A full IPv6 `::/0` saturates at
    /// `u128::MAX`.
    pub fn size(&self) -> u128 {
        self.size
    }

    /// Address at `offset` from the start of the network, wrapping inside the
    /// block.
    pub fn nth(&self, offset: u128) -> IpAddr {
        match self.net {
            IpNet::V4(net) => {
                let base = u32::from(net.network());
                let mask = u32::MAX.checked_shr(u32::from(net.prefix_len())).unwrap_or(0);
                IpAddr::V4(Ipv4Addr::from(base | (offset as u32 & mask)))
            }
            IpNet::V6(net) => {
                let base = u128::from(net.network());
                let mask = u128::MAX.checked_shr(u32::from(net.prefix_len())).unwrap_or(0);
                IpAddr::V6(Ipv6Addr::from(base | (offset & mask)))
            }
        }
    }
}

impl From<IpNet> for NetworkBlock {
    fn from(net: IpNet) -> Self {
        let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
        let size = if host_bits >= 128 {
            u128::MAX
        } else {
            1u128 << host_bits
        };
        Self {
            net: net.trunc(),
            size,
        }
    }
}

impl fmt::Display for NetworkBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}
