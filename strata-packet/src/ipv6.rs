//! IPv6 packet construction and parsing
//!
//! The 40-byte fixed header only; extension header chains are not walked.
//! The next-header field drives payload guessing with the same transport
//! mapping as IPv4, and checksum-bearing transports are seeded with the
//! IPv6 pseudo-header on link.

use std::any::Any;
use std::net::Ipv6Addr;

use strata_core::{Buffer, Error, Kind, Packet, Result};

use crate::checksum;
use crate::ipv4::IpProtocol;

/// IPv6 packet header
#[derive(Debug)]
pub struct Ipv6Packet {
    /// Version (always 6)
    pub version: u8,
    /// Traffic class
    pub class: u8,
    /// Flow label (20 bits)
    pub label: u32,
    /// Payload length in bytes; derived from the chain on pack
    pub length: u16,
    /// Next header; derived from the payload kind when one is linked
    pub next_hdr: IpProtocol,
    /// Hop limit
    pub hop_limit: u8,
    /// Source address
    pub source: Ipv6Addr,
    /// Destination address
    pub destination: Ipv6Addr,

    payload: Option<Box<dyn Packet>>,
}

impl Ipv6Packet {
    /// Fixed header size in bytes
    pub const HEADER_SIZE: u16 = 40;

    /// Create a packet with protocol-sensible defaults
    pub fn new() -> Self {
        Ipv6Packet {
            version: 6,
            class: 0,
            label: 0,
            length: 0,
            next_hdr: IpProtocol::Custom(0),
            hop_limit: 64,
            source: Ipv6Addr::UNSPECIFIED,
            destination: Ipv6Addr::UNSPECIFIED,
            payload: None,
        }
    }
}

impl Default for Ipv6Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for Ipv6Packet {
    fn kind(&self) -> Kind {
        Kind::Ipv6
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        if self.label > 0xFFFFF {
            return Err(Error::invalid_field(
                "label",
                format!("{} does not fit in 20 bits", self.label),
            ));
        }
        if let Some(payload) = self.payload.as_ref() {
            self.length = payload.total_len();
        }

        buf.write_bits(4, self.version as u64)?;
        buf.write_bits(8, self.class as u64)?;
        buf.write_bits(20, self.label as u64)?;
        buf.write_u16(self.length)?;
        buf.write_u8(self.next_hdr.to_u8())?;
        buf.write_u8(self.hop_limit)?;
        buf.write_slice(&self.source.octets())?;
        buf.write_slice(&self.destination.octets())?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.version = buf.read_bits(4)? as u8;
        if self.version != 6 {
            return Err(Error::invalid_field(
                "version",
                format!("expected 6, got {}", self.version),
            ));
        }
        self.class = buf.read_bits(8)? as u8;
        self.label = buf.read_bits(20)? as u32;
        self.length = buf.read_u16()?;
        self.next_hdr = IpProtocol::from_u8(buf.read_u8()?);
        self.hop_limit = buf.read_u8()?;

        self.source = Ipv6Addr::from(buf.read_array::<16>()?);
        self.destination = Ipv6Addr::from(buf.read_array::<16>()?);
        Ok(())
    }

    fn guess_payload_kind(&self) -> Kind {
        Kind::from_ip_protocol(self.next_hdr.to_u8())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, mut payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Tcp | Kind::Udp | Kind::Sctp | Kind::Icmpv6 | Kind::Raw => {}
            kind => {
                return Err(Error::UnsupportedLayer {
                    parent: Kind::Ipv6,
                    child: kind,
                })
            }
        }

        if let Some(proto) = payload.kind().ip_protocol() {
            self.next_hdr = IpProtocol::from_u8(proto);
        }
        self.length = payload.total_len();

        // ICMPv6 includes the pseudo-header in its checksum, unlike ICMPv4
        if matches!(payload.kind(), Kind::Tcp | Kind::Udp | Kind::Icmpv6) {
            payload.init_checksum(checksum::pseudo_header_v6(
                self.source,
                self.destination,
                self.next_hdr.to_u8(),
                payload.total_len() as u32,
            ));
        }

        self.payload = Some(payload);
        Ok(())
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.version == o.version
                && self.class == o.class
                && self.label == o.label
                && self.length == o.length
                && self.next_hdr == o.next_hdr
                && self.hop_limit == o.hop_limit
                && self.source == o.source
                && self.destination == o.destination
        })
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        match (self.payload.as_deref(), other.payload.as_deref()) {
            (Some(mine), Some(theirs)) => mine.answers(theirs),
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
