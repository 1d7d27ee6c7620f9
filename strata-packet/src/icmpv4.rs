//! ICMPv4 construction and parsing
//!
//! One 8-byte header shape covers the echo family (id/seq meaningful) and
//! the error family (the four trailing bytes pack as given, the quoted
//! datagram rides below as an IPv4 payload). The checksum spans the whole
//! ICMP message and needs no pseudo-header.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

use crate::checksum;
use crate::icmpv6::Icmpv6Packet;
use crate::raw::RawPayload;
use crate::sctp::SctpPacket;
use crate::tcp::TcpSegment;
use crate::udp::UdpDatagram;

/// ICMPv4 message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icmpv4Type {
    /// Echo reply (0)
    EchoReply,
    /// Destination unreachable (3)
    DestUnreachable,
    /// Source quench (4)
    SourceQuench,
    /// Redirect (5)
    Redirect,
    /// Echo request (8)
    EchoRequest,
    /// Time exceeded (11)
    TimeExceeded,
    /// Parameter problem (12)
    ParamProblem,
    /// Timestamp request (13)
    Timestamp,
    /// Timestamp reply (14)
    TimestampReply,
    /// Information request (15)
    InfoRequest,
    /// Information reply (16)
    InfoReply,
    /// Any other type
    Custom(u8),
}

impl Icmpv4Type {
    pub fn to_u8(self) -> u8 {
        match self {
            Icmpv4Type::EchoReply => 0,
            Icmpv4Type::DestUnreachable => 3,
            Icmpv4Type::SourceQuench => 4,
            Icmpv4Type::Redirect => 5,
            Icmpv4Type::EchoRequest => 8,
            Icmpv4Type::TimeExceeded => 11,
            Icmpv4Type::ParamProblem => 12,
            Icmpv4Type::Timestamp => 13,
            Icmpv4Type::TimestampReply => 14,
            Icmpv4Type::InfoRequest => 15,
            Icmpv4Type::InfoReply => 16,
            Icmpv4Type::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Icmpv4Type::EchoReply,
            3 => Icmpv4Type::DestUnreachable,
            4 => Icmpv4Type::SourceQuench,
            5 => Icmpv4Type::Redirect,
            8 => Icmpv4Type::EchoRequest,
            11 => Icmpv4Type::TimeExceeded,
            12 => Icmpv4Type::ParamProblem,
            13 => Icmpv4Type::Timestamp,
            14 => Icmpv4Type::TimestampReply,
            15 => Icmpv4Type::InfoRequest,
            16 => Icmpv4Type::InfoReply,
            val => Icmpv4Type::Custom(val),
        }
    }

    /// Whether this type quotes the offending datagram
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Icmpv4Type::DestUnreachable
                | Icmpv4Type::SourceQuench
                | Icmpv4Type::Redirect
                | Icmpv4Type::TimeExceeded
                | Icmpv4Type::ParamProblem
        )
    }

    /// The reply type that answers this request type, if any
    pub fn reply(self) -> Option<Icmpv4Type> {
        match self {
            Icmpv4Type::EchoRequest => Some(Icmpv4Type::EchoReply),
            Icmpv4Type::Timestamp => Some(Icmpv4Type::TimestampReply),
            Icmpv4Type::InfoRequest => Some(Icmpv4Type::InfoReply),
            _ => None,
        }
    }
}

/// Compare an ICMP error's quoted datagram against the probe's transport
/// layer, same-direction.
///
/// Error quotes carry the inner IP header plus at least 8 bytes of
/// transport. Eight bytes satisfy a full UDP parse but not a TCP one, so a
/// quote that fell back to a raw tail is compared on its leading bytes.
pub(crate) fn quoted_probe_matches(quoted_ip: &dyn Packet, probe: &dyn Packet) -> bool {
    let Some(quoted) = quoted_ip.payload() else {
        return false;
    };

    if quoted.kind() == probe.kind() {
        return match probe.kind() {
            Kind::Tcp => {
                let (Some(q), Some(p)) = (
                    quoted.as_any().downcast_ref::<TcpSegment>(),
                    probe.as_any().downcast_ref::<TcpSegment>(),
                ) else {
                    return false;
                };
                q.source_port == p.source_port
                    && q.destination_port == p.destination_port
                    && q.sequence == p.sequence
            }
            Kind::Udp => {
                let (Some(q), Some(p)) = (
                    quoted.as_any().downcast_ref::<UdpDatagram>(),
                    probe.as_any().downcast_ref::<UdpDatagram>(),
                ) else {
                    return false;
                };
                q.source_port == p.source_port && q.destination_port == p.destination_port
            }
            Kind::Sctp => {
                let (Some(q), Some(p)) = (
                    quoted.as_any().downcast_ref::<SctpPacket>(),
                    probe.as_any().downcast_ref::<SctpPacket>(),
                ) else {
                    return false;
                };
                q.source_port == p.source_port && q.destination_port == p.destination_port
            }
            Kind::Icmpv4 => {
                let (Some(q), Some(p)) = (
                    quoted.as_any().downcast_ref::<Icmpv4Packet>(),
                    probe.as_any().downcast_ref::<Icmpv4Packet>(),
                ) else {
                    return false;
                };
                q.id == p.id && q.seq == p.seq
            }
            Kind::Icmpv6 => {
                let (Some(q), Some(p)) = (
                    quoted.as_any().downcast_ref::<Icmpv6Packet>(),
                    probe.as_any().downcast_ref::<Icmpv6Packet>(),
                ) else {
                    return false;
                };
                q.id == p.id && q.seq == p.seq
            }
            _ => false,
        };
    }

    if quoted.kind() == Kind::Raw {
        let Some(raw) = quoted.as_any().downcast_ref::<RawPayload>() else {
            return false;
        };
        let bytes = &raw.data;
        return match probe.kind() {
            Kind::Tcp => {
                let Some(p) = probe.as_any().downcast_ref::<TcpSegment>() else {
                    return false;
                };
                bytes.len() >= 4
                    && bytes[0..2] == p.source_port.to_be_bytes()
                    && bytes[2..4] == p.destination_port.to_be_bytes()
            }
            Kind::Udp => {
                let Some(p) = probe.as_any().downcast_ref::<UdpDatagram>() else {
                    return false;
                };
                bytes.len() >= 4
                    && bytes[0..2] == p.source_port.to_be_bytes()
                    && bytes[2..4] == p.destination_port.to_be_bytes()
            }
            Kind::Sctp => {
                let Some(p) = probe.as_any().downcast_ref::<SctpPacket>() else {
                    return false;
                };
                bytes.len() >= 4
                    && bytes[0..2] == p.source_port.to_be_bytes()
                    && bytes[2..4] == p.destination_port.to_be_bytes()
            }
            Kind::Icmpv4 => {
                let Some(p) = probe.as_any().downcast_ref::<Icmpv4Packet>() else {
                    return false;
                };
                bytes.len() >= 8
                    && bytes[4..6] == p.id.to_be_bytes()
                    && bytes[6..8] == p.seq.to_be_bytes()
            }
            _ => false,
        };
    }

    false
}

/// ICMPv4 message header
#[derive(Debug)]
pub struct Icmpv4Packet {
    /// Message type
    pub icmp_type: Icmpv4Type,
    /// Code within the type
    pub code: u8,
    /// Checksum over the whole message; computed on pack
    pub checksum: u16,
    /// Identifier (echo family)
    pub id: u16,
    /// Sequence number (echo family)
    pub seq: u16,
    /// Whether the message checksum verified on decode
    pub checksum_ok: bool,

    payload: Option<Box<dyn Packet>>,
}

impl Icmpv4Packet {
    /// Header size in bytes
    pub const HEADER_SIZE: u16 = 8;

    /// Create an echo request with zero id/seq
    pub fn new() -> Self {
        Icmpv4Packet {
            icmp_type: Icmpv4Type::EchoRequest,
            code: 0,
            checksum: 0,
            id: 0,
            seq: 0,
            checksum_ok: true,
            payload: None,
        }
    }
}

impl Default for Icmpv4Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for Icmpv4Packet {
    fn kind(&self) -> Kind {
        Kind::Icmpv4
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        let start = buf.position();

        buf.write_u8(self.icmp_type.to_u8())?;
        buf.write_u8(self.code)?;
        buf.write_u16(0)?;
        buf.write_u16(self.id)?;
        buf.write_u16(self.seq)?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }

        self.checksum = checksum::internet_checksum(&buf.written()[start..]);
        buf.patch_u16(start + 2, self.checksum)?;
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        // The checksum covers everything that follows too, so validate over
        // the rest of the input before consuming the header.
        self.checksum_ok = buf
            .peek(buf.remaining())
            .map(checksum::validate)
            .unwrap_or(false);

        self.icmp_type = Icmpv4Type::from_u8(buf.read_u8()?);
        self.code = buf.read_u8()?;
        self.checksum = buf.read_u16()?;
        self.id = buf.read_u16()?;
        self.seq = buf.read_u16()?;
        Ok(())
    }

    fn guess_payload_kind(&self) -> Kind {
        if self.icmp_type.is_error() {
            Kind::Ipv4
        } else {
            Kind::None
        }
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Ipv4 | Kind::Raw => {
                self.payload = Some(payload);
                Ok(())
            }
            kind => Err(Error::UnsupportedLayer {
                parent: Kind::Icmpv4,
                child: kind,
            }),
        }
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.icmp_type == o.icmp_type
                && self.code == o.code
                && self.checksum == o.checksum
                && self.id == o.id
                && self.seq == o.seq
        })
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        if self.icmp_type.is_error() {
            if let Some(quoted_ip) = self.payload.as_deref() {
                if quoted_ip.kind() == Kind::Ipv4 {
                    return quoted_probe_matches(quoted_ip, other);
                }
            }
            return false;
        }

        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        other.icmp_type.reply() == Some(self.icmp_type)
            && self.id == other.id
            && self.seq == other.seq
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
