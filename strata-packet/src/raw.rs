//! Opaque byte tail
//!
//! Trailing bytes after the last decodable layer end up here, and callers
//! use it to pad probes to a wanted size.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

/// Raw, uninterpreted bytes
#[derive(Debug, Clone, Default)]
pub struct RawPayload {
    /// The bytes themselves
    pub data: Vec<u8>,
}

impl RawPayload {
    /// Create an empty payload
    pub fn new() -> Self {
        RawPayload { data: Vec::new() }
    }

    /// Create a payload over the given bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        RawPayload { data }
    }
}

impl Packet for RawPayload {
    fn kind(&self) -> Kind {
        Kind::Raw
    }

    fn header_len(&self) -> u16 {
        self.data.len() as u16
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        buf.write_slice(&self.data)
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.data = buf.read_slice(buf.remaining())?;
        Ok(())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        None
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        Err(Error::UnsupportedLayer {
            parent: Kind::Raw,
            child: payload.kind(),
        })
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other
            .as_any()
            .downcast_ref::<Self>()
            .is_some_and(|o| self.data == o.data)
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
        let mut pkt = RawPayload::from_bytes(vec![0x40, 0x41, 0x42]);
        let mut buf = Buffer::with_capacity(3);
        pkt.pack(&mut buf).unwrap();
        assert_eq!(buf.written(), &[0x40, 0x41, 0x42]);

        let mut decoded = RawPayload::new();
        let mut buf = Buffer::from_bytes(buf.written());
        decoded.unpack(&mut buf).unwrap();
        assert!(decoded.equals(&pkt));
        assert_eq!(decoded.total_len(), 3);
    }

    #[test]
    fn test_consumes_everything() {
        let mut pkt = RawPayload::new();
        let mut buf = Buffer::from_bytes(&[1, 2, 3, 4, 5]);
        buf.read_u8().unwrap();
        pkt.unpack(&mut buf).unwrap();
        assert_eq!(pkt.data, vec![2, 3, 4, 5]);
        assert_eq!(buf.remaining(), 0);
    }
}
