//! RFC 1042 SNAP extension header
//!
//! Rides below an LLC header with DSAP=SSAP=0xAA and re-introduces an
//! EtherType, so payload guessing mirrors Ethernet's mapping.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

use crate::ethernet::EtherType;

/// RFC 1042 OUI (encapsulated Ethernet)
pub const OUI_RFC1042: [u8; 3] = [0x00, 0x00, 0x00];

/// SNAP header
#[derive(Debug)]
pub struct SnapFrame {
    /// Organizationally Unique Identifier
    pub oui: [u8; 3],
    /// Encapsulated EtherType
    pub ethertype: EtherType,

    payload: Option<Box<dyn Packet>>,
}

impl SnapFrame {
    /// SNAP header size in bytes
    pub const HEADER_SIZE: u16 = 5;

    /// Create an RFC 1042 header with a zero EtherType
    pub fn new() -> Self {
        SnapFrame {
            oui: OUI_RFC1042,
            ethertype: EtherType::Custom(0),
            payload: None,
        }
    }
}

impl Default for SnapFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for SnapFrame {
    fn kind(&self) -> Kind {
        Kind::Snap
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_slice(&self.oui)?;
        buf.write_u16(self.ethertype.to_u16())?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        let oui = buf.read_slice(3)?;
        self.oui = [oui[0], oui[1], oui[2]];
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
            Kind::Raw => {}
            kind => match kind.ethertype() {
                Some(et) => self.ethertype = EtherType::from_u16(et),
                None => {
                    return Err(Error::UnsupportedLayer {
                        parent: Kind::Snap,
                        child: kind,
                    })
                }
            },
        }
        self.payload = Some(payload);
        Ok(())
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| self.oui == o.oui && self.ethertype == o.ethertype)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut pkt = SnapFrame::new();
        pkt.ethertype = EtherType::IPv4;

        let mut buf = Buffer::with_capacity(5);
        pkt.pack(&mut buf).unwrap();
        assert_eq!(buf.written(), &[0x00, 0x00, 0x00, 0x08, 0x00]);

        let mut decoded = SnapFrame::new();
        let mut buf = Buffer::from_bytes(&[0x00, 0x00, 0x00, 0x08, 0x00]);
        decoded.unpack(&mut buf).unwrap();
        assert!(decoded.equals(&pkt));
        assert_eq!(decoded.guess_payload_kind(), Kind::Ipv4);
    }
}
