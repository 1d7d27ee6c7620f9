//! 802.11 frame header
//!
//! Frame control plus the address block. The first frame-control byte packs
//! subtype/type/version MSB-first; the flag byte decides whether a fourth
//! address is present (to-DS and from-DS both set, the wireless bridge
//! case). Data frames carry LLC; QoS and HT fields stay in the byte tail.

use std::any::Any;

use strata_core::{Buffer, Error, Kind, MacAddress, Packet, Result};

/// 802.11 frame classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dot11FrameType {
    /// Management frame (0)
    Management,
    /// Control frame (1)
    Control,
    /// Data frame (2)
    Data,
    /// Reserved (3)
    Reserved,
}

impl Dot11FrameType {
    pub fn to_u8(self) -> u8 {
        match self {
            Dot11FrameType::Management => 0,
            Dot11FrameType::Control => 1,
            Dot11FrameType::Data => 2,
            Dot11FrameType::Reserved => 3,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value & 0x3 {
            0 => Dot11FrameType::Management,
            1 => Dot11FrameType::Control,
            2 => Dot11FrameType::Data,
            _ => Dot11FrameType::Reserved,
        }
    }
}

/// 802.11 frame header
#[derive(Debug)]
pub struct Dot11Frame {
    /// Protocol version (always 0)
    pub version: u8,
    /// Frame class
    pub frame_type: Dot11FrameType,
    /// Subtype within the class
    pub subtype: u8,
    /// To the distribution system
    pub to_ds: bool,
    /// From the distribution system
    pub from_ds: bool,
    /// More fragments follow
    pub more_frag: bool,
    /// Retransmission
    pub retry: bool,
    /// Power management state
    pub power_mgmt: bool,
    /// More buffered data
    pub more_data: bool,
    /// Frame body is protected
    pub protected: bool,
    /// Strictly ordered service class
    pub order: bool,
    /// Duration / association id
    pub duration: u16,
    /// Receiver address
    pub addr1: MacAddress,
    /// Transmitter address
    pub addr2: MacAddress,
    /// Filtering address
    pub addr3: MacAddress,
    /// Fragment and sequence numbers
    pub seq_ctrl: u16,
    /// Fourth address, present iff to_ds and from_ds are both set
    pub addr4: Option<MacAddress>,

    payload: Option<Box<dyn Packet>>,
}

impl Dot11Frame {
    /// Create an empty data frame
    pub fn new() -> Self {
        Dot11Frame {
            version: 0,
            frame_type: Dot11FrameType::Data,
            subtype: 0,
            to_ds: false,
            from_ds: false,
            more_frag: false,
            retry: false,
            power_mgmt: false,
            more_data: false,
            protected: false,
            order: false,
            duration: 0,
            addr1: MacAddress::ZERO,
            addr2: MacAddress::ZERO,
            addr3: MacAddress::ZERO,
            seq_ctrl: 0,
            addr4: None,
            payload: None,
        }
    }
}

impl Default for Dot11Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Packet for Dot11Frame {
    fn kind(&self) -> Kind {
        Kind::Dot11
    }

    fn header_len(&self) -> u16 {
        if self.to_ds && self.from_ds {
            30
        } else {
            24
        }
    }

    fn pack(&mut self, buf: &mut Buffer) -> Result<()> {
        if self.subtype > 0xF {
            return Err(Error::invalid_field(
                "subtype",
                format!("{} does not fit in 4 bits", self.subtype),
            ));
        }

        buf.write_bits(4, self.subtype as u64)?;
        buf.write_bits(2, self.frame_type.to_u8() as u64)?;
        buf.write_bits(2, self.version as u64)?;
        buf.write_bits(1, self.order as u64)?;
        buf.write_bits(1, self.protected as u64)?;
        buf.write_bits(1, self.more_data as u64)?;
        buf.write_bits(1, self.power_mgmt as u64)?;
        buf.write_bits(1, self.retry as u64)?;
        buf.write_bits(1, self.more_frag as u64)?;
        buf.write_bits(1, self.from_ds as u64)?;
        buf.write_bits(1, self.to_ds as u64)?;
        buf.write_u16(self.duration)?;
        buf.write_slice(self.addr1.as_bytes())?;
        buf.write_slice(self.addr2.as_bytes())?;
        buf.write_slice(self.addr3.as_bytes())?;
        buf.write_u16(self.seq_ctrl)?;

        if self.to_ds && self.from_ds {
            let addr4 = self.addr4.unwrap_or(MacAddress::ZERO);
            buf.write_slice(addr4.as_bytes())?;
        }

        if let Some(payload) = self.payload.as_mut() {
            payload.pack(buf)?;
        }
        Ok(())
    }

    fn unpack(&mut self, buf: &mut Buffer) -> Result<()> {
        self.subtype = buf.read_bits(4)? as u8;
        self.frame_type = Dot11FrameType::from_u8(buf.read_bits(2)? as u8);
        self.version = buf.read_bits(2)? as u8;
        self.order = buf.read_bits(1)? != 0;
        self.protected = buf.read_bits(1)? != 0;
        self.more_data = buf.read_bits(1)? != 0;
        self.power_mgmt = buf.read_bits(1)? != 0;
        self.retry = buf.read_bits(1)? != 0;
        self.more_frag = buf.read_bits(1)? != 0;
        self.from_ds = buf.read_bits(1)? != 0;
        self.to_ds = buf.read_bits(1)? != 0;
        self.duration = buf.read_u16()?;
        self.addr1 = MacAddress(buf.read_array()?);
        self.addr2 = MacAddress(buf.read_array()?);
        self.addr3 = MacAddress(buf.read_array()?);
        self.seq_ctrl = buf.read_u16()?;

        self.addr4 = if self.to_ds && self.from_ds {
            Some(MacAddress(buf.read_array()?))
        } else {
            None
        };
        Ok(())
    }

    fn guess_payload_kind(&self) -> Kind {
        match self.frame_type {
            Dot11FrameType::Data => Kind::Llc,
            _ => Kind::None,
        }
    }

    fn payload(&self) -> Option<&dyn Packet> {
        self.payload.as_deref()
    }

    fn set_payload(&mut self, payload: Box<dyn Packet>) -> Result<()> {
        match payload.kind() {
            Kind::Llc | Kind::Raw => {
                self.payload = Some(payload);
                Ok(())
            }
            kind => Err(Error::UnsupportedLayer {
                parent: Kind::Dot11,
                child: kind,
            }),
        }
    }

    fn equals(&self, other: &dyn Packet) -> bool {
        other.as_any().downcast_ref::<Self>().is_some_and(|o| {
            self.version == o.version
                && self.frame_type == o.frame_type
                && self.subtype == o.subtype
                && self.to_ds == o.to_ds
                && self.from_ds == o.from_ds
                && self.more_frag == o.more_frag
                && self.retry == o.retry
                && self.power_mgmt == o.power_mgmt
                && self.more_data == o.more_data
                && self.protected == o.protected
                && self.order == o.order
                && self.duration == o.duration
                && self.addr1 == o.addr1
                && self.addr2 == o.addr2
                && self.addr3 == o.addr3
                && self.seq_ctrl == o.seq_ctrl
                && self.addr4 == o.addr4
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dot11Frame {
        let mut frame = Dot11Frame::new();
        frame.subtype = 0;
        frame.to_ds = true;
        frame.duration = 0x013C;
        frame.addr1 = MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        frame.addr2 = MacAddress([0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]);
        frame.addr3 = MacAddress([0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11]);
        frame.seq_ctrl = 0x01A0;
        frame
    }

    #[test]
    fn test_frame_control_encoding() {
        let mut frame = sample();
        let mut buf = Buffer::with_capacity(24);
        frame.pack(&mut buf).unwrap();

        // Data frame, version 0: subtype 0, type 2 -> 0b0000_10_00
        assert_eq!(buf.written()[0], 0x08);
        // to_ds only -> flag byte 0b0000_0001
        assert_eq!(buf.written()[1], 0x01);
        assert_eq!(buf.written().len(), 24);
    }

    #[test]
    fn test_roundtrip() {
        let mut frame = sample();
        let mut buf = Buffer::with_capacity(24);
        frame.pack(&mut buf).unwrap();

        let mut decoded = Dot11Frame::new();
        let mut rbuf = Buffer::from_bytes(buf.written());
        decoded.unpack(&mut rbuf).unwrap();
        assert!(decoded.equals(&frame));
        assert_eq!(decoded.guess_payload_kind(), Kind::Llc);
    }

    #[test]
    fn test_four_address_layout() {
        let mut frame = sample();
        frame.from_ds = true;
        frame.addr4 = Some(MacAddress([0x22, 0x33, 0x44, 0x55, 0x66, 0x77]));
        assert_eq!(frame.header_len(), 30);

        let mut buf = Buffer::with_capacity(30);
        frame.pack(&mut buf).unwrap();
        assert_eq!(
            &buf.written()[24..30],
            &[0x22, 0x33, 0x44, 0x55, 0x66, 0x77]
        );

        let mut decoded = Dot11Frame::new();
        let mut rbuf = Buffer::from_bytes(buf.written());
        decoded.unpack(&mut rbuf).unwrap();
        assert!(decoded.equals(&frame));
    }

    #[test]
    fn test_management_frame_has_no_llc() {
        let mut frame = sample();
        frame.frame_type = Dot11FrameType::Management;
        assert_eq!(frame.guess_payload_kind(), Kind::None);
    }
}
