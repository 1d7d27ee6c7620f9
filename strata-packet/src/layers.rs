//! Layer composer
//!
//! Chains packet values into a head-to-tail sequence, packs a chain
//! bottom-up into one buffer, and unpacks a raw frame by guess-and-parse.
//! Linking runs tail-first so parent length fields, next-protocol fields
//! and checksum seeds are authoritative by the time the head packs.

use strata_core::{Buffer, Error, Kind, Packet, Result};

use crate::arp::ArpPacket;
use crate::dot11::Dot11Frame;
use crate::ethernet::EthernetFrame;
use crate::icmpv4::Icmpv4Packet;
use crate::icmpv6::Icmpv6Packet;
use crate::ipv4::Ipv4Packet;
use crate::ipv6::Ipv6Packet;
use crate::llc::LlcFrame;
use crate::radiotap::RadiotapHeader;
use crate::raw::RawPayload;
use crate::sctp::SctpPacket;
use crate::snap::SnapFrame;
use crate::tcp::TcpSegment;
use crate::udp::UdpDatagram;
use crate::vlan::VlanTag;

/// Instantiate an empty packet for a decodable kind
pub fn make(kind: Kind) -> Option<Box<dyn Packet>> {
    match kind {
        Kind::Raw => Some(Box::new(RawPayload::new())),
        Kind::Eth => Some(Box::new(EthernetFrame::new())),
        Kind::Arp => Some(Box::new(ArpPacket::new())),
        Kind::Llc => Some(Box::new(LlcFrame::new())),
        Kind::Snap => Some(Box::new(SnapFrame::new())),
        Kind::Vlan => Some(Box::new(VlanTag::new(0))),
        Kind::Ipv4 => Some(Box::new(Ipv4Packet::new())),
        Kind::Ipv6 => Some(Box::new(Ipv6Packet::new())),
        Kind::Tcp => Some(Box::new(TcpSegment::new())),
        Kind::Udp => Some(Box::new(UdpDatagram::new())),
        Kind::Sctp => Some(Box::new(SctpPacket::new())),
        Kind::Icmpv4 => Some(Box::new(Icmpv4Packet::new())),
        Kind::Icmpv6 => Some(Box::new(Icmpv6Packet::new())),
        Kind::RadioTap => Some(Box::new(RadiotapHeader::new())),
        Kind::Dot11 => Some(Box::new(Dot11Frame::new())),
        Kind::None | Kind::Wol | Kind::Lldp => None,
    }
}

/// Link a list of packets into a chain, returning the head.
///
/// Links run tail to head, failing fast when a layer rejects its payload
/// kind.
pub fn link(mut packets: Vec<Box<dyn Packet>>) -> Result<Box<dyn Packet>> {
    let Some(mut chain) = packets.pop() else {
        return Err(Error::invalid_chain("no layers given"));
    };
    while let Some(mut parent) = packets.pop() {
        parent.set_payload(chain)?;
        chain = parent;
    }
    Ok(chain)
}

/// Pack a linked chain into a fresh buffer sized from its total length
pub fn pack(head: &mut dyn Packet) -> Result<Vec<u8>> {
    let mut buf = Buffer::with_capacity(head.total_len() as usize);
    head.pack(&mut buf)?;
    Ok(buf.written().to_vec())
}

/// Decode a frame into a chain, starting from `first`.
///
/// Each decoded layer guesses the kind of the next one; the loop stops when
/// the guess is `None` or the input runs out. Trailing bytes, a guess with
/// no decoder, and a mid-chain parse failure (truncated ICMP quotes are the
/// common case) all coalesce into a raw tail. A head that fails to parse is
/// a hard error.
pub fn unpack(frame: &[u8], first: Kind) -> Result<Box<dyn Packet>> {
    let mut buf = Buffer::from_bytes(frame);
    let mut stack: Vec<Box<dyn Packet>> = Vec::new();
    let mut kind = first;

    loop {
        if buf.remaining() == 0 {
            break;
        }
        let rest = buf.peek(buf.remaining())?.to_vec();

        if kind == Kind::None {
            stack.push(Box::new(RawPayload::from_bytes(rest)));
            break;
        }
        let Some(mut pkt) = make(kind) else {
            stack.push(Box::new(RawPayload::from_bytes(rest)));
            break;
        };

        match pkt.unpack(&mut buf) {
            Ok(()) => {
                kind = pkt.guess_payload_kind();
                stack.push(pkt);
            }
            Err(err) => {
                if stack.is_empty() {
                    return Err(err);
                }
                stack.push(Box::new(RawPayload::from_bytes(rest)));
                break;
            }
        }
    }

    if stack.is_empty() {
        return Err(Error::invalid_chain("empty frame"));
    }
    link(stack)
}

/// Walk the payload links and return the first layer of the given kind
pub fn find_layer(head: &dyn Packet, kind: Kind) -> Option<&dyn Packet> {
    let mut current = Some(head);
    while let Some(layer) = current {
        if layer.kind() == kind {
            return Some(layer);
        }
        current = layer.payload();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ethernet::EtherType;
    use crate::icmpv4::Icmpv4Type;
    use crate::tcp::TcpFlags;
    use std::net::Ipv4Addr;
    use strata_core::MacAddress;

    fn syn_chain() -> Vec<Box<dyn Packet>> {
        let mut eth = EthernetFrame::new();
        eth.source = MacAddress([0x4C, 0x72, 0xB9, 0x54, 0xE5, 0x3D]);
        eth.destination = MacAddress([0x1F, 0x92, 0x2B, 0x56, 0xED, 0x77]);

        let mut ip = Ipv4Packet::new();
        ip.source = Ipv4Addr::new(192, 168, 1, 135);
        ip.destination = Ipv4Addr::new(8, 8, 8, 8);

        let mut tcp = TcpSegment::new();
        tcp.source_port = 20;
        tcp.destination_port = 80;
        tcp.sequence = 5400;
        tcp.acknowledgment = 432;
        tcp.flags = TcpFlags::SYN;
        tcp.window_size = 8192;
        tcp.urgent_pointer = 40;

        vec![Box::new(eth), Box::new(ip), Box::new(tcp)]
    }

    #[test]
    fn test_pack_chain_wires_transport_checksum() {
        let mut head = link(syn_chain()).unwrap();
        let frame = pack(head.as_mut()).unwrap();

        assert_eq!(frame.len(), 54);
        assert_eq!(frame.len(), head.total_len() as usize);
        // EtherType derived from the IPv4 payload
        assert_eq!(&frame[12..14], &[0x08, 0x00]);
        // IPv4 total length covers its own header plus the TCP header
        assert_eq!(&frame[16..18], &[0x00, 0x28]);
        // TCP checksum over the IPv4 pseudo-header
        assert_eq!(&frame[50..52], &[0xA6, 0x4F]);
    }

    #[test]
    fn test_chain_roundtrip() {
        let mut head = link(syn_chain()).unwrap();
        let frame = pack(head.as_mut()).unwrap();

        let decoded = unpack(&frame, Kind::Eth).unwrap();

        for kind in [Kind::Eth, Kind::Ipv4, Kind::Tcp] {
            let original = find_layer(head.as_ref(), kind).unwrap();
            let roundtripped = find_layer(decoded.as_ref(), kind).unwrap();
            assert!(roundtripped.equals(original), "{} mismatch", kind);
        }
        assert_eq!(decoded.total_len(), head.total_len());
    }

    #[test]
    fn test_unpack_trailing_bytes_become_raw() {
        let mut head = link(syn_chain()).unwrap();
        let mut frame = pack(head.as_mut()).unwrap();
        frame.extend_from_slice(&[0xDE, 0xAD]);

        let decoded = unpack(&frame, Kind::Eth).unwrap();
        let tail = find_layer(decoded.as_ref(), Kind::Raw).unwrap();
        let tail = tail.as_any().downcast_ref::<RawPayload>().unwrap();
        assert_eq!(tail.data, vec![0xDE, 0xAD]);
    }

    #[test]
    fn test_unpack_truncated_icmp_quote() {
        // Router-style time-exceeded: quoted IPv4 header plus only 8 bytes
        // of the original TCP segment
        let mut quoted_tcp = TcpSegment::new();
        quoted_tcp.source_port = 49152;
        quoted_tcp.destination_port = 80;
        quoted_tcp.sequence = 0xAABBCCDD;

        let mut quoted_bytes = Buffer::with_capacity(20);
        quoted_tcp.pack(&mut quoted_bytes).unwrap();

        let mut quoted_ip = Ipv4Packet::new();
        quoted_ip.protocol = crate::ipv4::IpProtocol::Tcp;
        quoted_ip.source = Ipv4Addr::new(192, 168, 1, 135);
        quoted_ip.destination = Ipv4Addr::new(8, 8, 8, 8);
        let mut quoted_ip_bytes = Buffer::with_capacity(20);
        quoted_ip.pack(&mut quoted_ip_bytes).unwrap();

        let mut icmp = Icmpv4Packet::new();
        icmp.icmp_type = Icmpv4Type::TimeExceeded;
        let mut quote = quoted_ip_bytes.written().to_vec();
        quote.extend_from_slice(&quoted_bytes.written()[..8]);
        icmp.set_payload(Box::new(RawPayload::from_bytes(quote)))
            .unwrap();

        let mut ip = Ipv4Packet::new();
        ip.source = Ipv4Addr::new(10, 0, 0, 1);
        ip.destination = Ipv4Addr::new(192, 168, 1, 135);
        ip.set_payload(Box::new(icmp)).unwrap();

        let frame = pack(&mut ip).unwrap();
        let decoded = unpack(&frame, Kind::Ipv4).unwrap();

        // The quoted TCP is too short to parse, so it lands as a raw tail
        // below the quoted IPv4 header
        let inner_ip = find_layer(
            find_layer(decoded.as_ref(), Kind::Icmpv4).unwrap(),
            Kind::Ipv4,
        )
        .unwrap();
        let tail = inner_ip.payload().unwrap();
        assert_eq!(tail.kind(), Kind::Raw);
        let tail = tail.as_any().downcast_ref::<RawPayload>().unwrap();
        assert_eq!(&tail.data[0..2], &49152u16.to_be_bytes());
    }

    #[test]
    fn test_link_rejects_bad_adjacency() {
        let tcp: Box<dyn Packet> = Box::new(TcpSegment::new());
        let ip: Box<dyn Packet> = Box::new(Ipv4Packet::new());
        let err = link(vec![tcp, ip]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLayer { .. }));
    }

    #[test]
    fn test_unpack_bad_head_is_fatal() {
        assert!(unpack(&[0x45], Kind::Ipv4).is_err());
        assert!(unpack(&[], Kind::Eth).is_err());
    }

    #[test]
    fn test_find_layer_absent() {
        let mut head = link(syn_chain()).unwrap();
        let frame = pack(head.as_mut()).unwrap();
        let decoded = unpack(&frame, Kind::Eth).unwrap();
        assert!(find_layer(decoded.as_ref(), Kind::Udp).is_none());
    }

    #[test]
    fn test_make_covers_decodable_kinds() {
        assert!(make(Kind::None).is_none());
        assert!(make(Kind::Lldp).is_none());
        for kind in [
            Kind::Raw,
            Kind::Eth,
            Kind::Arp,
            Kind::Llc,
            Kind::Snap,
            Kind::Vlan,
            Kind::Ipv4,
            Kind::Ipv6,
            Kind::Tcp,
            Kind::Udp,
            Kind::Sctp,
            Kind::Icmpv4,
            Kind::Icmpv6,
            Kind::RadioTap,
            Kind::Dot11,
        ] {
            assert_eq!(make(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_vlan_chain() {
        let mut eth = EthernetFrame::new();
        eth.source = MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        eth.destination = MacAddress::BROADCAST;

        let mut tag = VlanTag::new(100);
        tag.ethertype = EtherType::IPv4;

        let mut ip = Ipv4Packet::new();
        ip.source = Ipv4Addr::new(10, 0, 0, 1);
        ip.destination = Ipv4Addr::new(10, 0, 0, 2);

        let mut head = link(vec![Box::new(eth), Box::new(tag), Box::new(ip)]).unwrap();
        let frame = pack(head.as_mut()).unwrap();
        assert_eq!(&frame[12..14], &[0x81, 0x00]);

        let decoded = unpack(&frame, Kind::Eth).unwrap();
        assert!(find_layer(decoded.as_ref(), Kind::Vlan).is_some());
        assert!(find_layer(decoded.as_ref(), Kind::Ipv4).is_some());
    }

    #[test]
    fn test_radiotap_chain_decodes_dot11() {
        let mut rt = RadiotapHeader::new();
        rt.present = 0;

        let mut dot11 = Dot11Frame::new();
        dot11.addr1 = MacAddress::BROADCAST;

        let llc = LlcFrame::snap();
        let mut snap = SnapFrame::new();
        snap.ethertype = EtherType::IPv4;

        let mut ip = Ipv4Packet::new();
        ip.source = Ipv4Addr::new(172, 16, 0, 1);
        ip.destination = Ipv4Addr::new(172, 16, 0, 2);

        let mut head = link(vec![
            Box::new(rt),
            Box::new(dot11),
            Box::new(llc),
            Box::new(snap),
            Box::new(ip),
        ])
        .unwrap();
        let frame = pack(head.as_mut()).unwrap();

        let decoded = unpack(&frame, Kind::RadioTap).unwrap();
        for kind in [Kind::RadioTap, Kind::Dot11, Kind::Llc, Kind::Snap, Kind::Ipv4] {
            assert!(find_layer(decoded.as_ref(), kind).is_some(), "{} missing", kind);
        }
    }
}
