//! Ethernet II frame construction and parsing
//!
//! The 14-byte Ethernet header is the usual head of a chain. Values of the
//! type field at or below 1500 are an 802.3 length field, which announces an
//! LLC payload instead of an EtherType.

use std::any::Any;
use std::fmt;

use strata_core::{Buffer, Error, Kind, MacAddress, Packet, Result};

/// Common EtherType values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    /// IPv4 (0x0800)
    IPv4,
    /// ARP (0x0806)
    ARP,
    /// Wake-on-LAN (0x0842)
    WakeOnLan,
    /// VLAN-tagged frame (0x8100)
    VLAN,
    /// IPv6 (0x86DD)
    IPv6,
    /// LLDP (0x88CC)
    LLDP,
    /// Any other value, including 802.3 length fields
    Custom(u16),
}

impl EtherType {
    /// Convert EtherType to its wire value
    pub fn to_u16(self) -> u16 {
        match self {
            EtherType::IPv4 => 0x0800,
            EtherType::ARP => 0x0806,
            EtherType::WakeOnLan => 0x0842,
            EtherType::VLAN => 0x8100,
            EtherType::IPv6 => 0x86DD,
            EtherType::LLDP => 0x88CC,
            EtherType::Custom(val) => val,
        }
    }

    /// Create EtherType from its wire value
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0800 => EtherType::IPv4,
            0x0806 => EtherType::ARP,
            0x0842 => EtherType::WakeOnLan,
            0x8100 => EtherType::VLAN,
            0x86DD => EtherType::IPv6,
            0x88CC => EtherType::LLDP,
            val => EtherType::Custom(val),
        }
    }
}

impl fmt::Display for EtherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtherType::IPv4 => write!(f, "IPv4"),
            EtherType::ARP => write!(f, "ARP"),
            EtherType::WakeOnLan => write!(f, "WoL"),
            EtherType::VLAN => write!(f, "VLAN"),
            EtherType::IPv6 => write!(f, "IPv6"),
            EtherType::LLDP => write!(f, "LLDP"),
            EtherType::Custom(val) => write!(f, "0x{:04X}", val),
        }
    }
}

/// Ethernet II frame header
#[derive(Debug)]
pub struct EthernetFrame {
    /// Destination MAC address
    pub destination: MacAddress,
    /// Source MAC address
    pub source: MacAddress,
    /// EtherType, or length field for 802.3 frames
    pub ethertype: EtherType,

    payload: Option<Box<dyn Packet>>,
}

impl EthernetFrame {
    /// Ethernet header size in bytes
    pub const HEADER_SIZE: u16 = 14;

    /// Create an empty frame with zero addresses
    pub fn new() -> Self {
        EthernetFrame {
            destination: MacAddress::ZERO,
            source: MacAddress::ZERO,
            ethertype: EtherType::Custom(0),
            payload: None,
        }
    }
}

impl Default for EthernetFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for EthernetFrame {
    fn kind(&self) -> Kind {
        Kind::Eth
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_slice(self.destination.as_bytes())?;
        buf.write_slice(self.source.as_bytes())?;
        buf.write_u16(self.ethertype.to_u16())?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.destination = MacAddress(buf.read_array()?);
        self.source = MacAddress(buf.read_array()?);
        self.ethertype = EtherType::from_u16(buf.read_u16()?);
        Ok(())
    }

    fn guess_payload_kind(&self) -> Kind {
        Kind::from_ethertype(self.ethertype.to_u16())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            // 802.3 frames carry the payload length where the type goes
            Kind::Llc => self.ethertype = EtherType::Custom(payload.total_len()),
            Kind::Raw => {}
            kind => match kind.ethertype() {
                Some(et) => self.ethertype = EtherType::from_u16(et),
                None => {
                    return Err(Error::UnsupportedLayer {
                        parent: Kind::Eth,
                        child: kind,
                    })
                }
            },
        }
        self.payload = Some(payload);
        Ok(())
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.destination == o.destination
                && self.source == o.source
                && self.ethertype == o.ethertype
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
