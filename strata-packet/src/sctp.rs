//! SCTP common header
//!
//! Only the 12-byte common header is interpreted; chunk bytes travel as a
//! raw payload below it. The checksum field is carried verbatim.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

/// SCTP common header
#[derive(Debug)]
pub struct SctpPacket {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Verification tag
    pub verification_tag: u32,
    /// CRC32c checksum, carried as given
    pub checksum: u32,

    payload: Option<Box<dyn Packet>>,
}

impl SctpPacket {
    /// Common header size in bytes
    pub const HEADER_SIZE: u16 = 12;

    /// Create an empty packet
    pub fn new() -> Self {
        SctpPacket {
            source_port: 0,
            destination_port: 0,
            verification_tag: 0,
            checksum: 0,
            payload: None,
        }
    }
}

impl Default for SctpPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for SctpPacket {
    fn kind(&self) -> Kind {
        Kind::Sctp
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_u16(self.source_port)?;
        buf.write_u16(self.destination_port)?;
        buf.write_u32(self.verification_tag)?;
        buf.write_u32(self.checksum)?;

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.source_port = buf.read_u16()?;
        self.destination_port = buf.read_u16()?;
        self.verification_tag = buf.read_u32()?;
        self.checksum = buf.read_u32()?;
        Ok(())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Raw => {
                self.payload = Some(payload);
                Ok(())
            }
            kind => Err(Error::UnsupportedLayer {
                parent: Kind::Sctp,
                child: kind,
            }),
        }
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.source_port == o.source_port
                && self.destination_port == o.destination_port
                && self.verification_tag == o.verification_tag
                && self.checksum == o.checksum
        })
    }

    fn answers(&self, other: &dyn Packet) -> bool {
        let Some(other) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        self.source_port == other.destination_port && self.destination_port == other.source_port
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
