//! ARP packet construction and parsing
//!
//! The fixed 8-byte prefix is followed by four address fields whose sizes
//! come from the hardware and protocol address length fields, so the codec
//! keeps them as raw bytes and offers typed accessors for the
//! Ethernet-over-IPv4 case.

use std::any::Any;
use std::net::Ipv4Addr;

use strata_core::{Buffer, Error, Kind, MacAddress, Packet, Result};

/// Hardware type for Ethernet
pub const HTYPE_ETHERNET: u16 = 1;

/// Protocol type for IPv4
pub const PTYPE_IPV4: u16 = 0x0800;

/// ARP operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOperation {
    /// ARP request
    Request,
    /// ARP reply
    Reply,
    /// RARP request
    RarpRequest,
    /// RARP reply
    RarpReply,
}

impl ArpOperation {
    pub fn to_u16(self) -> u16 {
        match self {
            ArpOperation::Request => 1,
            ArpOperation::Reply => 2,
            ArpOperation::RarpRequest => 3,
            ArpOperation::RarpReply => 4,
        }
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(ArpOperation::Request),
            2 => Some(ArpOperation::Reply),
            3 => Some(ArpOperation::RarpRequest),
            4 => Some(ArpOperation::RarpReply),
            _ => None,
        }
    }
}

/// ARP packet
#[derive(Debug, Clone)]
pub struct ArpPacket {
    /// Hardware type (1 for Ethernet)
    pub hw_type: u16,
    /// Protocol type (0x0800 for IPv4)
    pub proto_type: u16,
    /// Hardware address length
    pub hw_addr_len: u8,
    /// Protocol address length
    pub proto_addr_len: u8,
    /// Operation
    pub operation: ArpOperation,
    /// Sender hardware address (`hw_addr_len` bytes)
    pub sender_hw_addr: Vec<u8>,
    /// Sender protocol address (`proto_addr_len` bytes)
    pub sender_proto_addr: Vec<u8>,
    /// Target hardware address (`hw_addr_len` bytes)
    pub target_hw_addr: Vec<u8>,
    /// Target protocol address (`proto_addr_len` bytes)
    pub target_proto_addr: Vec<u8>,
}

impl ArpPacket {
    /// Create an empty Ethernet/IPv4 ARP packet
    pub fn new() -> Self {
        ArpPacket {
            hw_type: HTYPE_ETHERNET,
            proto_type: PTYPE_IPV4,
            hw_addr_len: 6,
            proto_addr_len: 4,
            operation: ArpOperation::Request,
            sender_hw_addr: vec![0; 6],
            sender_proto_addr: vec![0; 4],
            target_hw_addr: vec![0; 6],
            target_proto_addr: vec![0; 4],
        }
    }

    /// Create a who-has request for `target_ip`
    pub fn request(sender_mac: MacAddress, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        let mut pkt = Self::new();
        pkt.operation = ArpOperation::Request;
        pkt.sender_hw_addr = sender_mac.as_bytes().to_vec();
        pkt.sender_proto_addr = sender_ip.octets().to_vec();
        pkt.target_proto_addr = target_ip.octets().to_vec();
        pkt
    }

    /// Create a reply announcing `sender_mac` for `sender_ip`
    pub fn reply(
        sender_mac: MacAddress,
        sender_ip: Ipv4Addr,
        target_mac: MacAddress,
        target_ip: Ipv4Addr,
    ) -> Self {
        let mut pkt = Self::new();
        pkt.operation = ArpOperation::Reply;
        pkt.sender_hw_addr = sender_mac.as_bytes().to_vec();
        pkt.sender_proto_addr = sender_ip.octets().to_vec();
        pkt.target_hw_addr = target_mac.as_bytes().to_vec();
        pkt.target_proto_addr = target_ip.octets().to_vec();
        pkt
    }

    /// Sender hardware address as a MAC, when it is 6 bytes
    pub fn sender_mac(&self) -> Option<MacAddress> {
        MacAddress::from_slice(&self.sender_hw_addr)
    }

    /// Sender protocol address as IPv4, when it is 4 bytes
    pub fn sender_ipv4(&self) -> Option<Ipv4Addr> {
        <[u8; 4]>::try_from(self.sender_proto_addr.as_slice())
            .ok()
            .map(Ipv4Addr::from)
    }

    /// Target protocol address as IPv4, when it is 4 bytes
    pub fn target_ipv4(&self) -> Option<Ipv4Addr> {
        <[u8; 4]>::try_from(self.target_proto_addr.as_slice())
            .ok()
            .map(Ipv4Addr::from)
    }
}

impl Default for ArpPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for ArpPacket {
    fn kind(&self) -> Kind {
        Kind::Arp
    }

    fn header_len(&self) -> u16 {
        8 + 2 * (self.hw_addr_len as u16 + self.proto_addr_len as u16)
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        if self.sender_hw_addr.len() != self.hw_addr_len as usize
            || self.target_hw_addr.len() != self.hw_addr_len as usize
        {
            return Err(Error::invalid_field(
                "hw_addr_len",
                "hardware addresses do not match the declared length",
            ));
        }
        if self.sender_proto_addr.len() != self.proto_addr_len as usize
            || self.target_proto_addr.len() != self.proto_addr_len as usize
        {
            return Err(Error::invalid_field(
                "proto_addr_len",
                "protocol addresses do not match the declared length",
            ));
        }

        buf.write_u16(self.hw_type)?;
        buf.write_u16(self.proto_type)?;
        buf.write_u8(self.hw_addr_len)?;
        buf.write_u8(self.proto_addr_len)?;
        buf.write_u16(self.operation.to_u16())?;
        buf.write_slice(&self.sender_hw_addr)?;
        buf.write_slice(&self.sender_proto_addr)?;
        buf.write_slice(&self.target_hw_addr)?;
        buf.write_slice(&self.target_proto_addr)?;
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.hw_type = buf.read_u16()?;
        self.proto_type = buf.read_u16()?;
        self.hw_addr_len = buf.read_u8()?;
        self.proto_addr_len = buf.read_u8()?;

        let op = buf.read_u16()?;
        self.operation = ArpOperation::from_u16(op)
            .ok_or_else(|| Error::invalid_field("operation", format!("unknown opcode {}", op)))?;

        self.sender_hw_addr = buf.read_slice(self.hw_addr_len as usize)?;
        self.sender_proto_addr = buf.read_slice(self.proto_addr_len as usize)?;
        self.target_hw_addr = buf.read_slice(self.hw_addr_len as usize)?;
        self.target_proto_addr = buf.read_slice(self.proto_addr_len as usize)?;
        Ok(())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        None
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        Err(Error::UnsupportedLayer {
            parent: Kind::Arp,
            child: payload.kind(),
        })
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.hw_type == o.hw_type
                && self.proto_type == o.proto_type
                && self.hw_addr_len == o.hw_addr_len
                && self.proto_addr_len == o.proto_addr_len
                && self.operation == o.operation
                && self.sender_hw_addr == o.sender_hw_addr
                && self.sender_proto_addr == o.sender_proto_addr
                && self.target_hw_addr == o.target_hw_addr
                && self.target_proto_addr == o.target_proto_addr
        })
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        other.operation == ArpOperation::Request
            && self.operation == ArpOperation::Reply
            && self.sender_proto_addr == other.target_proto_addr
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE: [u8; 28] = [
        0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01, 0x4C, 0x72, 0xB9, 0x54, 0xE5, 0x3D, 0xC0,
        0xA8, 0x01, 0x87, 0x1F, 0x92, 0x2B, 0x56, 0xED, 0x77, 0x1C, 0x3C, 0x09, 0xBF,
    ];

    fn sample() -> ArpPacket {
        let mut pkt = ArpPacket::request(
            MacAddress([0x4C, 0x72, 0xB9, 0x54, 0xE5, 0x3D]),
            Ipv4Addr::new(192, 168, 1, 135),
            Ipv4Addr::new(28, 60, 9, 191),
        );
        pkt.target_hw_addr = vec![0x1F, 0x92, 0x2B, 0x56, 0xED, 0x77];
        pkt
    }

    #[test]
    fn test_pack() {
        let mut pkt = sample();
        let mut buf = Buffer::with_capacity(WIRE.len());
        pkt.pack(&mut buf).unwrap();
        assert_eq!(buf.written(), &WIRE);
        assert_eq!(pkt.total_len() as usize, WIRE.len());
    }

    #[test]
    fn test_unpack() {
        let mut pkt = ArpPacket::new();
        let mut buf = Buffer::from_bytes(&WIRE);
        pkt.unpack(&mut buf).unwrap();
        assert!(pkt.equals(&sample()));
        assert_eq!(pkt.sender_ipv4(), Some(Ipv4Addr::new(192, 168, 1, 135)));
        assert_eq!(pkt.target_ipv4(), Some(Ipv4Addr::new(28, 60, 9, 191)));
    }

    #[test]
    fn test_unpack_truncated_addresses() {
        // Declares 6-byte hardware addresses but the input stops short
        let mut pkt = ArpPacket::new();
        let mut buf = Buffer::from_bytes(&WIRE[..12]);
        assert!(matches!(
            pkt.unpack(&mut buf),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_answers() {
        let request = sample();
        let reply = ArpPacket::reply(
            MacAddress([0x1F, 0x92, 0x2B, 0x56, 0xED, 0x77]),
            Ipv4Addr::new(28, 60, 9, 191),
            MacAddress([0x4C, 0x72, 0xB9, 0x54, 0xE5, 0x3D]),
            Ipv4Addr::new(192, 168, 1, 135),
        );
        assert!(reply.answers(&request));
        assert!(!request.answers(&reply));

        let other_reply = ArpPacket::reply(
            MacAddress([0x1F, 0x92, 0x2B, 0x56, 0xED, 0x77]),
            Ipv4Addr::new(10, 0, 0, 1),
            MacAddress([0x4C, 0x72, 0xB9, 0x54, 0xE5, 0x3D]),
            Ipv4Addr::new(192, 168, 1, 135),
        );
        assert!(!other_reply.answers(&request));
    }
}
