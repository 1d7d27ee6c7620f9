//! Network interface enumeration and information

use std::net::{IpAddr, Ipv4Addr};

use pnet_datalink::NetworkInterface;

use strata_core::{Error, MacAddress, Result};

/// Information about a network interface
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    /// Interface name (e.g., "eth0", "wlan0")
    pub name: String,
    /// MAC address if available
    pub mac: Option<MacAddress>,
    /// Primary IPv4 address and prefix length, if assigned
    pub ipv4: Option<(Ipv4Addr, u8)>,
    /// Whether the interface is up
    pub is_up: bool,
    /// Whether the interface is a loopback
    pub is_loopback: bool,
}

impl From<&NetworkInterface> for InterfaceInfo {
    fn from(iface: &NetworkInterface) -> Self {
        let mac = iface
            .mac
            .map(|m| MacAddress([m.0, m.1, m.2, m.3, m.4, m.5]));

        let mut ipv4 = None;
        for network in &iface.ips {
            if let IpAddr::V4(addr) = network.ip() {
                ipv4 = Some((addr, network.prefix()));
                break;
            }
        }

        InterfaceInfo {
            name: iface.name.clone(),
            mac,
            ipv4,
            is_up: iface.is_up(),
            is_loopback: iface.is_loopback(),
        }
    }
}

impl InterfaceInfo {
    /// Whether the interface can carry probes
    pub fn is_usable(&self) -> bool {
        self.is_up && !self.is_loopback
    }
}

/// List all available network interfaces
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>> {
    let interfaces = pnet_datalink::interfaces();

    if interfaces.is_empty() {
        return Err(Error::capture(
            "no network interfaces found; are you running with sufficient privileges?",
        ));
    }

    Ok(interfaces.iter().map(InterfaceInfo::from).collect())
}

/// Get information about a specific interface by name
pub fn get_interface(name: &str) -> Result<InterfaceInfo> {
    pnet_datalink::interfaces()
        .iter()
        .find(|iface| iface.name == name)
        .map(InterfaceInfo::from)
        .ok_or_else(|| Error::capture(format!("interface '{}' not found", name)))
}

/// Find the first up, non-loopback interface
pub fn default_interface() -> Result<InterfaceInfo> {
    list_interfaces()?
        .into_iter()
        .find(InterfaceInfo::is_usable)
        .ok_or_else(|| Error::capture("no usable interface found"))
}
