//! Outbound route description
//!
//! The kernel routing table itself is outside this crate; callers either
//! fill a [`Route`] from their own lookup or derive one from an interface
//! with an optional gateway.

use std::net::Ipv4Addr;

use strata_capture::interface;
use strata_core::{Error, MacAddress, Result};

/// What the engine needs to know about the outbound path
#[derive(Debug, Clone)]
pub struct Route {
    /// Outbound interface name
    pub iface: String,
    /// Interface hardware address
    pub hw_addr: MacAddress,
    /// Interface IPv4 address
    pub iface_addr: Ipv4Addr,
    /// On-link prefix length
    pub prefix: u8,
    /// Gateway for off-link destinations, if any
    pub gateway: Option<Ipv4Addr>,
}

impl Route {
    /// Build a route from a named interface and an optional gateway
    pub fn from_interface(name: &str, gateway: Option<Ipv4Addr>) -> Result<Self> {
        let info = interface::get_interface(name)?;

        let hw_addr = info
            .mac
            .ok_or_else(|| Error::capture(format!("interface '{}' has no MAC address", name)))?;
        let (iface_addr, prefix) = info
            .ipv4
            .ok_or_else(|| Error::capture(format!("interface '{}' has no IPv4 address", name)))?;

        Ok(Route {
            iface: name.to_string(),
            hw_addr,
            iface_addr,
            prefix,
            gateway,
        })
    }

    /// Whether `ip` is on the interface's own network
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let prefix = self.prefix.min(32) as u32;
        let mask: u32 = if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - prefix)
        };
        (u32::from(ip) & mask) == (u32::from(self.iface_addr) & mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Route {
        Route {
            iface: "eth0".to_string(),
            hw_addr: MacAddress([0x4C, 0x72, 0xB9, 0x54, 0xE5, 0x3D]),
            iface_addr: Ipv4Addr::new(192, 168, 1, 135),
            prefix: 24,
            gateway: Some(Ipv4Addr::new(192, 168, 1, 1)),
        }
    }

    #[test]
    fn test_contains_on_link() {
        let route = sample();
        assert!(route.contains(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(route.contains(Ipv4Addr::new(192, 168, 1, 254)));
        assert!(!route.contains(Ipv4Addr::new(192, 168, 2, 1)));
        assert!(!route.contains(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[test]
    fn test_zero_prefix_matches_everything() {
        let mut route = sample();
        route.prefix = 0;
        assert!(route.contains(Ipv4Addr::new(8, 8, 8, 8)));
    }
}
