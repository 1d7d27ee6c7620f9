//! Strata packet codecs
//!
//! One module per protocol, each implementing the
//! [`Packet`](strata_core::Packet) contract from `strata-core`, plus the
//! [`layers`] composer that chains, packs and unpacks them as a unit.
//!
//! # Building a chain
//!
//! ```
//! use std::net::Ipv4Addr;
//! use strata_core::{Kind, MacAddress};
//! use strata_packet::ethernet::EthernetFrame;
//! use strata_packet::ipv4::Ipv4Packet;
//! use strata_packet::tcp::{TcpFlags, TcpSegment};
//! use strata_packet::layers;
//!
//! let mut eth = EthernetFrame::new();
//! eth.source = MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
//! eth.destination = MacAddress::BROADCAST;
//!
//! let mut ip = Ipv4Packet::new();
//! ip.source = Ipv4Addr::new(192, 168, 1, 135);
//! ip.destination = Ipv4Addr::new(8, 8, 8, 8);
//!
//! let mut tcp = TcpSegment::new();
//! tcp.source_port = 49152;
//! tcp.destination_port = 80;
//! tcp.flags = TcpFlags::SYN;
//!
//! let mut head = layers::link(vec![Box::new(eth), Box::new(ip), Box::new(tcp)]).unwrap();
//! let frame = layers::pack(head.as_mut()).unwrap();
//!
//! let decoded = layers::unpack(&frame, Kind::Eth).unwrap();
//! assert!(layers::find_layer(decoded.as_ref(), Kind::Tcp).is_some());
//! ```

pub mod arp;
pub mod checksum;
pub mod dot11;
pub mod ethernet;
pub mod icmpv4;
pub mod icmpv6;
pub mod ipv4;
pub mod ipv6;
pub mod layers;
pub mod llc;
pub mod radiotap;
pub mod raw;
pub mod sctp;
pub mod snap;
pub mod tcp;
pub mod udp;
pub mod vlan;

// Re-export commonly used types
pub use arp::{ArpOperation, ArpPacket};
pub use checksum::internet_checksum;
pub use dot11::Dot11Frame;
pub use ethernet::{EtherType, EthernetFrame};
pub use icmpv4::{Icmpv4Packet, Icmpv4Type};
pub use icmpv6::{Icmpv6Packet, Icmpv6Type};
pub use ipv4::{IpProtocol, Ipv4Packet};
pub use ipv6::Ipv6Packet;
pub use llc::LlcFrame;
pub use radiotap::RadiotapHeader;
pub use raw::RawPayload;
pub use sctp::SctpPacket;
pub use snap::SnapFrame;
pub use tcp::{TcpFlags, TcpOption, TcpSegment};
pub use udp::UdpDatagram;
pub use vlan::VlanTag;
