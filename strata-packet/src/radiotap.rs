//! Radiotap capture header
//!
//! The radiotap header prefixes 802.11 frames captured on monitor-mode
//! interfaces. Unlike every protocol header here, its fields are
//! little-endian. The per-field data after the present bitmap is carried
//! opaquely; its size is the declared length minus the 8 fixed bytes.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

/// Radiotap header
#[derive(Debug)]
pub struct RadiotapHeader {
    /// Header revision (always 0)
    pub version: u8,
    /// Padding byte
    pub pad: u8,
    /// Whole header length; derived from the data on pack
    pub length: u16,
    /// Bitmap of the fields present in `data`
    pub present: u32,
    /// The present fields, unparsed
    pub data: Vec<u8>,

    payload: Option<Box<dyn Packet>>,
}

impl RadiotapHeader {
    /// Fixed portion ahead of the field data
    pub const FIXED_SIZE: u16 = 8;

    /// Create an empty header
    pub fn new() -> Self {
        RadiotapHeader {
            version: 0,
            pad: 0,
            length: Self::FIXED_SIZE,
            present: 0,
            data: Vec::new(),
            payload: None,
        }
    }
}

impl Default for RadiotapHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for RadiotapHeader {
    fn kind(&self) -> Kind {
        Kind::RadioTap
    }

    fn header_len(&self) -> u16 {
        Self::FIXED_SIZE + self.data.len() as u16
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.length = Self::FIXED_SIZE + self.data.len() as u16;

        buf.write_u8(self.version)?;
        buf.write_u8(self.pad)?;
        buf.write_u16_le(self.length)?;
        buf.write_u32_le(self.present)?;
        buf.write_slice(&self.data)?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.version = buf.read_u8()?;
        self.pad = buf.read_u8()?;
        self.length = buf.read_u16_le()?;
        self.present = buf.read_u32_le()?;

        if self.length < Self::FIXED_SIZE {
            return Err(Error::invalid_field(
                "length",
                format!("{} is below the 8-byte fixed header", self.length),
            ));
        }
        self.data = buf.read_slice(self.length as usize - Self::FIXED_SIZE as usize)?;
        Ok(())
    }

    fn guess_payload_kind(&self) -> Kind {
        Kind::Dot11
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Dot11 | Kind::Raw => {
                self.payload = Some(payload);
                Ok(())
            }
            kind => Err(Error::UnsupportedLayer {
                parent: Kind::RadioTap,
                child: kind,
            }),
        }
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.version == o.version
                && self.pad == o.pad
                && self.length == o.length
                && self.present == o.present
                && self.data == o.data
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIRE: [u8; 32] = [
        0x00, 0x00, 0x20, 0x00, 0x67, 0x08, 0x04, 0x00, 0x54, 0xC6, 0xB8, 0x24, 0x00, 0x00, 0x00,
        0x00, 0x22, 0x0C, 0xDA, 0xA0, 0x02, 0x00, 0x00, 0x00, 0x40, 0x01, 0x00, 0x00, 0x3C, 0x14,
        0x24, 0x11,
    ];

    fn sample() -> RadiotapHeader {
        let mut pkt = RadiotapHeader::new();
        pkt.length = 32;
        pkt.present = 0x00040867;
        pkt.data = WIRE[8..].to_vec();
        pkt
    }

    #[test]
    fn test_pack() {
        let mut pkt = sample();
        let mut buf = Buffer::with_capacity(32);
        pkt.pack(&mut buf).unwrap();
        assert_eq!(buf.written(), &WIRE);
    }

    #[test]
    fn test_unpack() {
        let mut pkt = RadiotapHeader::new();
        let mut buf = Buffer::from_bytes(&WIRE);
        pkt.unpack(&mut buf).unwrap();
        assert!(pkt.equals(&sample()));
        assert_eq!(pkt.guess_payload_kind(), Kind::Dot11);
    }

    #[test]
    fn test_length_derived_from_data() {
        let mut pkt = RadiotapHeader::new();
        pkt.data = vec![0; 16];
        let mut buf = Buffer::with_capacity(24);
        pkt.pack(&mut buf).unwrap();
        assert_eq!(pkt.length, 24);
        assert_eq!(&buf.written()[2..4], &[0x18, 0x00]);
    }

    #[test]
    fn test_undersized_length_rejected() {
        let wire = [0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut pkt = RadiotapHeader::new();
        let mut buf = Buffer::from_bytes(&wire);
        assert!(matches!(
            pkt.unpack(&mut buf),
            Err(Error::InvalidField { .. })
        ));
    }
}
