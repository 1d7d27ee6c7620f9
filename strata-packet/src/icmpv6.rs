//! ICMPv6 construction and parsing
//!
//! Same 8-byte shape as ICMPv4, but the checksum includes the IPv6
//! pseudo-header, so the enclosing IPv6 layer seeds it like a transport.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

use crate::checksum;

/// ICMPv6 message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icmpv6Type {
    /// Destination unreachable (1)
    DestUnreachable,
    /// Packet too big (2)
    PacketTooBig,
    /// Time exceeded (3)
    TimeExceeded,
    /// Parameter problem (4)
    ParamProblem,
    /// Echo request (128)
    EchoRequest,
    /// Echo reply (129)
    EchoReply,
    /// Any other type
    Custom(u8),
}

impl Icmpv6Type {
    pub fn to_u8(self) -> u8 {
        match self {
            Icmpv6Type::DestUnreachable => 1,
            Icmpv6Type::PacketTooBig => 2,
            Icmpv6Type::TimeExceeded => 3,
            Icmpv6Type::ParamProblem => 4,
            Icmpv6Type::EchoRequest => 128,
            Icmpv6Type::EchoReply => 129,
            Icmpv6Type::Custom(val) => val,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Icmpv6Type::DestUnreachable,
            2 => Icmpv6Type::PacketTooBig,
            3 => Icmpv6Type::TimeExceeded,
            4 => Icmpv6Type::ParamProblem,
            128 => Icmpv6Type::EchoRequest,
            129 => Icmpv6Type::EchoReply,
            val => Icmpv6Type::Custom(val),
        }
    }

    /// Whether this type quotes the offending datagram
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Icmpv6Type::DestUnreachable
                | Icmpv6Type::PacketTooBig
                | Icmpv6Type::TimeExceeded
                | Icmpv6Type::ParamProblem
        )
    }
}

/// ICMPv6 message header
#[derive(Debug)]
pub struct Icmpv6Packet {
    /// Message type
    pub icmp_type: Icmpv6Type,
    /// Code within the type
    pub code: u8,
    /// Checksum; finalized on pack when a pseudo-header seed is present
    pub checksum: u16,
    /// Identifier (echo family)
    pub id: u16,
    /// Sequence number (echo family)
    pub seq: u16,

    csum_seed: u32,
    payload: Option<Box<dyn Packet>>,
}

impl Icmpv6Packet {
    /// Header size in bytes
    pub const HEADER_SIZE: u16 = 8;

    /// Create an echo request with zero id/seq
    pub fn new() -> Self {
        Icmpv6Packet {
            icmp_type: Icmpv6Type::EchoRequest,
            code: 0,
            checksum: 0,
            id: 0,
            seq: 0,
            csum_seed: 0,
            payload: None,
        }
    }
}

impl Default for Icmpv6Packet {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for Icmpv6Packet {
    fn kind(&self) -> Kind {
        Kind::Icmpv6
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        let start = buf.position();

        buf.write_u8(self.icmp_type.to_u8())?;
        buf.write_u8(self.code)?;
        if self.csum_seed != 0 {
            buf.write_u16(0)?;
        } else {
            buf.write_u16(self.checksum)?;
        }
        buf.write_u16(self.id)?;
        buf.write_u16(self.seq)?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }

        if self.csum_seed != 0 {
            let covered = checksum::sum(&buf.written()[start..]);
            self.checksum = checksum::fold(self.csum_seed + covered);
            buf.patch_u16(start + 2, self.checksum)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.icmp_type = Icmpv6Type::from_u8(buf.read_u8()?);
        self.code = buf.read_u8()?;
        self.checksum = buf.read_u16()?;
        self.id = buf.read_u16()?;
        self.seq = buf.read_u16()?;
        Ok(())
    }

    fn guess_payload_kind(&self) -> Kind {
        if self.icmp_type.is_error() {
            Kind::Ipv6
        } else {
            Kind::None
        }
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Ipv6 | Kind::Raw => {
                self.payload = Some(payload);
                Ok(())
            }
            kind => Err(Error::UnsupportedLayer {
                parent: Kind::Icmpv6,
                child: kind,
            }),
        }
    }

    fn init_checksum(&mut self, seed: u32) {
        self.csum_seed = seed;
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
                if quoted_ip.kind() == Kind::Ipv6 {
                    return crate::icmpv4::quoted_probe_matches(quoted_ip, other);
                }
            }
            return false;
        }

        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.icmp_type == Icmpv6Type::EchoReply
            && other.icmp_type == Icmpv6Type::EchoRequest
            && self.id == other.id
            && self.seq == other.seq
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
