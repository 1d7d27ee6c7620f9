//! Next-hop link address resolution
//!
//! Decides which IP actually needs resolving (the target itself when it is
//! on the interface's network, the gateway otherwise), broadcasts an ARP
//! who-has for it, and reads the hardware address out of the reply.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tracing::debug;

use strata_capture::CaptureHandle;
use strata_core::{Error, Kind, MacAddress, Packet, Result};
use strata_packet::arp::ArpPacket;
use strata_packet::ethernet::EthernetFrame;
use strata_packet::layers;

use crate::route::Route;
use crate::sendrecv::send_recv;

/// Resolve the MAC address the probe's Ethernet frames should go to.
///
/// An off-link target with no gateway on the route fails with
/// `Error::NoRoute`; an unanswered request runs into `Error::Timeout`.
pub fn next_hop_mac<C: CaptureHandle + ?Sized>(
    handle: &mut C,
    timeout: Duration,
    route: &Route,
    target: Ipv4Addr,
) -> Result<MacAddress> {
    let next_hop = if route.contains(target) {
        target
    } else {
        route
            .gateway
            .ok_or(Error::NoRoute(IpAddr::V4(target)))?
    };
    debug!(%target, %next_hop, "resolving next hop");

    let mut eth = EthernetFrame::new();
    eth.source = route.hw_addr;
    eth.destination = MacAddress::BROADCAST;

    let arp = ArpPacket::request(route.hw_addr, route.iface_addr, next_hop);

    let response = send_recv(handle, timeout, vec![Box::new(eth), Box::new(arp)])?;

    let reply = layers::find_layer(response.as_ref(), Kind::Arp)
        .and_then(|layer| layer.as_any().downcast_ref::<ArpPacket>())
        .ok_or_else(|| Error::invalid_chain("matched frame carries no ARP layer"))?;

    reply
        .sender_mac()
        .ok_or_else(|| Error::invalid_field("hw_addr_len", "reply does not carry a 6-byte MAC"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sendrecv::tests::{ScriptedHandle, PEER_IP, PEER_MAC, PROBE_IP, PROBE_MAC};

    fn sample_route() -> Route {
        Route {
            iface: "eth0".to_string(),
            hw_addr: PROBE_MAC,
            iface_addr: PROBE_IP,
            prefix: 24,
            gateway: Some(Ipv4Addr::new(192, 168, 1, 1)),
        }
    }

    fn arp_reply_frame(sender_mac: MacAddress, sender_ip: Ipv4Addr) -> Vec<u8> {
        let mut eth = EthernetFrame::new();
        eth.source = sender_mac;
        eth.destination = PROBE_MAC;

        let arp = ArpPacket::reply(sender_mac, sender_ip, PROBE_MAC, PROBE_IP);

        let mut head = layers::link(vec![Box::new(eth), Box::new(arp)]).unwrap();
        layers::pack(head.as_mut()).unwrap()
    }

    #[test]
    fn test_resolves_on_link_target() {
        let mut handle = ScriptedHandle::new(vec![arp_reply_frame(PEER_MAC, PEER_IP)]);
        let mac = next_hop_mac(
            &mut handle,
            Duration::from_millis(200),
            &sample_route(),
            PEER_IP,
        )
        .unwrap();
        assert_eq!(mac, PEER_MAC);
        assert_eq!(handle.filter.as_deref(), Some("arp"));

        // The request went out as Ethernet broadcast
        let probe = layers::unpack(&handle.injected[0], Kind::Eth).unwrap();
        let eth = layers::find_layer(probe.as_ref(), Kind::Eth).unwrap();
        let eth = eth.as_any().downcast_ref::<EthernetFrame>().unwrap();
        assert!(eth.destination.is_broadcast());
    }

    #[test]
    fn test_off_link_target_resolves_gateway() {
        let gateway_mac = MacAddress([0x02, 0x42, 0xC0, 0xA8, 0x01, 0x01]);
        let gateway_ip = Ipv4Addr::new(192, 168, 1, 1);

        let mut handle = ScriptedHandle::new(vec![arp_reply_frame(gateway_mac, gateway_ip)]);
        let mac = next_hop_mac(
            &mut handle,
            Duration::from_millis(200),
            &sample_route(),
            Ipv4Addr::new(8, 8, 8, 8),
        )
        .unwrap();
        assert_eq!(mac, gateway_mac);

        // The ARP request asks for the gateway, not the far target
        let probe = layers::unpack(&handle.injected[0], Kind::Eth).unwrap();
        let arp = layers::find_layer(probe.as_ref(), Kind::Arp).unwrap();
        let arp = arp.as_any().downcast_ref::<ArpPacket>().unwrap();
        assert_eq!(arp.target_ipv4(), Some(gateway_ip));
    }

    #[test]
    fn test_no_gateway_is_no_route() {
        let mut route = sample_route();
        route.gateway = None;

        let mut handle = ScriptedHandle::new(vec![]);
        let err = next_hop_mac(
            &mut handle,
            Duration::from_millis(10),
            &route,
            Ipv4Addr::new(8, 8, 8, 8),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoRoute(_)));
        assert!(handle.injected.is_empty());
    }

    #[test]
    fn test_empty_stream_times_out() {
        let mut handle = ScriptedHandle::new(vec![]);
        let err = next_hop_mac(
            &mut handle,
            Duration::from_millis(10),
            &sample_route(),
            PEER_IP,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }

    #[test]
    fn test_foreign_reply_ignored() {
        // A reply about some other IP does not answer our request
        let stranger = arp_reply_frame(
            MacAddress([0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01]),
            Ipv4Addr::new(192, 168, 1, 77),
        );
        let wanted = arp_reply_frame(PEER_MAC, PEER_IP);

        let mut handle = ScriptedHandle::new(vec![stranger, wanted]);
        let mac = next_hop_mac(
            &mut handle,
            Duration::from_millis(200),
            &sample_route(),
            PEER_IP,
        )
        .unwrap();
        assert_eq!(mac, PEER_MAC);
    }
}
