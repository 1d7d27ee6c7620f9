//! 802.1Q VLAN tag
//!
//! Sits between an Ethernet header whose type field is the 0x8100 TPID and
//! the real payload. The tag is priority(3) / DEI(1) / VLAN id(12) followed
//! by the inner EtherType, which behaves exactly like Ethernet's.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

use crate::ethernet::EtherType;

/// Minimum valid VLAN ID
pub const MIN_VLAN_ID: u16 = 1;

/// Maximum valid VLAN ID
pub const MAX_VLAN_ID: u16 = 4094;

/// 802.1Q tag
#[derive(Debug)]
pub struct VlanTag {
    /// Priority Code Point (0-7)
    pub priority: u8,
    /// Drop Eligible Indicator
    pub dei: bool,
    /// VLAN identifier (1-4094)
    pub vlan_id: u16,
    /// Inner EtherType
    pub ethertype: EtherType,

    payload: Option<Box<dyn Packet>>,
}

impl VlanTag {
    /// Tag size in bytes (TCI + inner EtherType)
    pub const HEADER_SIZE: u16 = 4;

    /// Create a tag for the given VLAN with priority 0
    pub fn new(vlan_id: u16) -> Self {
        VlanTag {
            priority: 0,
            dei: false,
            vlan_id,
            ethertype: EtherType::Custom(0),
            payload: None,
        }
    }
}

impl Packet for VlanTag {
    fn kind(&self) -> Kind {
        Kind::Vlan
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        if self.vlan_id > MAX_VLAN_ID {
            return Err(Error::invalid_field(
                "vlan_id",
                format!("{} exceeds {}", self.vlan_id, MAX_VLAN_ID),
            ));
        }

        buf.write_bits(3, self.priority as u64)?;
        buf.write_bits(1, self.dei as u64)?;
        buf.write_bits(12, self.vlan_id as u64)?;
        buf.write_u16(self.ethertype.to_u16())?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.priority = buf.read_bits(3)? as u8;
        self.dei = buf.read_bits(1)? != 0;
        self.vlan_id = buf.read_bits(12)? as u16;
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
            Kind::Llc => self.ethertype = EtherType::Custom(payload.total_len()),
            Kind::Raw => {}
            kind => match kind.ethertype() {
                Some(et) => self.ethertype = EtherType::from_u16(et),
                None => {
                    return Err(Error::UnsupportedLayer {
                        parent: Kind::Vlan,
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
            self.priority == o.priority
                && self.dei == o.dei
                && self.vlan_id == o.vlan_id
                && self.ethertype == o.ethertype
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
