//! UDP datagram construction and parsing

use std::any::Any;

use strata_core::{Buffer, Error, Kind, Packet, Result};

use crate::checksum;

/// UDP datagram header
#[derive(Debug)]
pub struct UdpDatagram {
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub destination_port: u16,
    /// Length of header plus payload; derived from the chain on pack
    pub length: u16,
    /// Checksum; finalized on pack when a pseudo-header seed is present
    pub checksum: u16,

    csum_seed: u32,
    payload: Option<Box<dyn Packet>>,
}

impl UdpDatagram {
    /// UDP header size in bytes
    pub const HEADER_SIZE: u16 = 8;

    /// Create an empty datagram
    pub fn new() -> Self {
        UdpDatagram {
            source_port: 0,
            destination_port: 0,
            length: Self::HEADER_SIZE,
            checksum: 0,
            csum_seed: 0,
            payload: None,
        }
    }
}

impl Default for UdpDatagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for UdpDatagram {
    fn kind(&self) -> Kind {
        Kind::Udp
    }

    fn header_len(&self) -> u16 {
        Self::HEADER_SIZE
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        if let Some(payload) = self.payload.as_ref() {
            self.length = Self::HEADER_SIZE + payload.total_len();
        }

        let start = buf.position();

        buf.write_u16(self.source_port)?;
        buf.write_u16(self.destination_port)?;
        buf.write_u16(self.length)?;
        if self.csum_seed != 0 {
            buf.write_u16(0)?;
        } else {
            buf.write_u16(self.checksum)?;
        }

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }

        if self.csum_seed != 0 {
            let covered = checksum::sum(&buf.written()[start..]);
            self.checksum = checksum::fold(self.csum_seed + covered);
            buf.patch_u16(start + 6, self.checksum)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.source_port = buf.read_u16()?;
        self.destination_port = buf.read_u16()?;
        self.length = buf.read_u16()?;
        self.checksum = buf.read_u16()?;

        if self.length < Self::HEADER_SIZE {
            return Err(Error::invalid_field(
                "length",
                format!("{} is below the 8-byte header", self.length),
            ));
        }
        Ok(())
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Raw => {
                self.length = Self::HEADER_SIZE + payload.total_len();
                self.payload = Some(payload);
                Ok(())
            }
            kind => Err(Error::UnsupportedLayer {
                parent: Kind::Udp,
                child: kind,
            }),
        }
    }

    fn init_checksum(&mut self, seed: u32) {
        self.csum_seed = seed;
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.source_port == o.source_port
                && self.destination_port == o.destination_port
                && self.length == o.length
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawPayload;
    use std::net::Ipv4Addr;

    #[test]
    fn test_roundtrip() {
        let mut udp = UdpDatagram::new();
        udp.source_port = 49152;
        udp.destination_port = 33434;

        let mut buf = Buffer::with_capacity(8);
        udp.pack(&mut buf).unwrap();
        assert_eq!(
            buf.written(),
            &[0xC0, 0x00, 0x82, 0x9A, 0x00, 0x08, 0x00, 0x00]
        );

        let mut decoded = UdpDatagram::new();
        let mut rbuf = Buffer::from_bytes(buf.written());
        decoded.unpack(&mut rbuf).unwrap();
        assert!(decoded.equals(&udp));
    }

    #[test]
    fn test_length_derived_from_payload() {
        let mut udp = UdpDatagram::new();
        udp.source_port = 53;
        udp.destination_port = 53;
        udp.set_payload(Box::new(RawPayload::from_bytes(vec![0xAB; 12])))
            .unwrap();
        assert_eq!(udp.length, 20);
        assert_eq!(udp.total_len(), 20);

        let mut buf = Buffer::with_capacity(20);
        udp.pack(&mut buf).unwrap();
        assert_eq!(&buf.written()[4..6], &[0x00, 0x14]);
    }

    #[test]
    fn test_checksum_with_seed() {
        let src = Ipv4Addr::new(192, 168, 1, 1);
        let dst = Ipv4Addr::new(192, 168, 1, 2);

        let mut udp = UdpDatagram::new();
        udp.source_port = 53;
        udp.destination_port = 1024;
        udp.init_checksum(checksum::pseudo_header_v4(src, dst, 17, udp.total_len()));

        let mut buf = Buffer::with_capacity(8);
        udp.pack(&mut buf).unwrap();
        assert_ne!(udp.checksum, 0);

        // Re-summing the datagram with the pseudo-header yields the
        // complement identity
        let total = checksum::pseudo_header_v4(src, dst, 17, 8) + checksum::sum(buf.written());
        assert_eq!(checksum::fold(total), 0);
    }

    #[test]
    fn test_answers_on_swapped_ports() {
        let mut probe = UdpDatagram::new();
        probe.source_port = 49152;
        probe.destination_port = 33434;

        let mut reply = UdpDatagram::new();
        reply.source_port = 33434;
        reply.destination_port = 49152;
        assert!(reply.answers(&probe));
        assert!(!probe.answers(&probe));
    }

    #[test]
    fn test_bad_length_rejected() {
        let mut decoded = UdpDatagram::new();
        let mut buf = Buffer::from_bytes(&[0x00, 0x35, 0x00, 0x35, 0x00, 0x04, 0x00, 0x00]);
        assert!(matches!(
            decoded.unpack(&mut buf),
            Err(Error::InvalidField { .. })
        ));
    }
}
