//! 802.2 Logical Link Control
//!
//! The control field is 16 bits for I-frames (low bit 0) and S-frames (low
//! bits 01), 8 bits for U-frames (low bits 11). On decode the width is
//! chosen by peeking at the first control byte.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

/// SNAP service access point (0xAA)
pub const SAP_SNAP: u8 = 0xAA;

/// STP/BPDU service access point (0x42)
pub const SAP_STP: u8 = 0x42;

/// Unnumbered Information control value (0x03)
pub const CONTROL_UI: u16 = 0x03;

fn control_is_wide(first_byte: u8) -> bool {
    first_byte & 0x1 == 0 || first_byte & 0x3 == 0x1
}

// The discriminator bits live in the first control byte on the wire, which
// for a stored 16-bit value is its high byte
fn control_first_byte(control: u16) -> u8 {
    if control > 0xFF {
        (control >> 8) as u8
    } else {
        control as u8
    }
}

/// LLC header
#[derive(Debug)]
pub struct LlcFrame {
    /// Destination service access point
    pub dsap: u8,
    /// Source service access point
    pub ssap: u8,
    /// Control field; one or two bytes on the wire depending on frame class
    pub control: u16,

    payload: Option<Box<dyn Packet>>,
}

impl LlcFrame {
    /// Create an empty U-frame header
    pub fn new() -> Self {
        LlcFrame {
            dsap: 0,
            ssap: 0,
            control: CONTROL_UI,
            payload: None,
        }
    }

    /// Create the SNAP encapsulation header (DSAP=SSAP=0xAA, UI control)
    pub fn snap() -> Self {
        LlcFrame {
            dsap: SAP_SNAP,
            ssap: SAP_SNAP,
            control: CONTROL_UI,
            payload: None,
        }
    }

    fn control_len(&self) -> u16 {
        if control_is_wide(control_first_byte(self.control)) {
            2
        } else {
            1
        }
    }
}

impl Default for LlcFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for LlcFrame {
    fn kind(&self) -> Kind {
        Kind::Llc
    }

    fn header_len(&self) -> u16 {
        2 + self.control_len()
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u8(self.dsap)?;
        buf.write_u8(self.ssap)?;

        if control_is_wide(control_first_byte(self.control)) {
            buf.write_u16(self.control)?;
        } else {
            buf.write_u8(self.control as u8)?;
        }

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.dsap = buf.read_u8()?;
        self.ssap = buf.read_u8()?;

        let first = buf.peek(1)?[0];
        self.control = if control_is_wide(first) {
            buf.read_u16()?
        } else {
            buf.read_u8()? as u16
        };
        Ok(())
    }

    fn guess_payload_kind(&self) -> Kind {
        if self.dsap == SAP_SNAP && self.ssap == SAP_SNAP {
            Kind::Snap
        } else {
            Kind::None
        }
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Snap | Kind::Raw => {
                self.payload = Some(payload);
                Ok(())
            }
            kind => Err(Error::UnsupportedLayer {
                parent: Kind::Llc,
                child: kind,
            }),
        }
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.dsap == o.dsap && self.ssap == o.ssap && self.control == o.control
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u_frame_one_byte_control() {
        let mut pkt = LlcFrame::snap();
        let mut buf = Buffer::with_capacity(3);
        pkt.pack(&mut buf).unwrap();
        assert_eq!(buf.written(), &[0xAA, 0xAA, 0x03]);
        assert_eq!(pkt.header_len(), 3);

        let mut decoded = LlcFrame::new();
        let mut buf = Buffer::from_bytes(&[0xAA, 0xAA, 0x03]);
        decoded.unpack(&mut buf).unwrap();
        assert!(decoded.equals(&pkt));
        assert_eq!(decoded.guess_payload_kind(), Kind::Snap);
    }

    #[test]
    fn test_i_frame_two_byte_control() {
        // I-frame: low bit of the first control byte is 0
        let wire = [0x42, 0x42, 0x1A, 0x2B];
        let mut decoded = LlcFrame::new();
        let mut buf = Buffer::from_bytes(&wire);
        decoded.unpack(&mut buf).unwrap();
        assert_eq!(decoded.control, 0x1A2B);
        assert_eq!(decoded.header_len(), 4);
        assert_eq!(decoded.guess_payload_kind(), Kind::None);

        let mut buf = Buffer::with_capacity(4);
        decoded.pack(&mut buf).unwrap();
        assert_eq!(buf.written(), &wire);
    }

    #[test]
    fn test_s_frame_two_byte_control() {
        // S-frame: low bits of the first control byte are 01
        let wire = [0x42, 0x42, 0x05, 0x02];
        let mut decoded = LlcFrame::new();
        let mut buf = Buffer::from_bytes(&wire);
        decoded.unpack(&mut buf).unwrap();
        assert_eq!(decoded.control, 0x0502);
        assert_eq!(decoded.header_len(), 4);
    }
}
