//! Positional serialization buffer
//!
//! [`Buffer`] is the single byte region every codec packs into and unpacks
//! from. It keeps separate read and write cursors measured in bits, so
//! headers that mix sub-byte fields with byte-aligned ones (IPv4 first word,
//! TCP offset+flags, 802.11 frame control) read and write through one
//! interface. Multi-byte integers use network byte order; the `_le` variants
//! exist for radiotap, which is little-endian on the wire.
//!
//! Bitfields pack MSB-first within each byte. A bit run that does not end on
//! a byte boundary carries its cursor into the next access.

use bytes::BytesMut;

use crate::error::{Error, Result};

/// Byte buffer with bit-granular read and write cursors
#[derive(Debug)]
pub struct Buffer {
    data: BytesMut,
    rpos: usize,
    wpos: usize,
}

impl Buffer {
    /// Create a write-mode buffer with a fixed capacity of `capacity` bytes.
    ///
    /// Writing past the capacity fails with [`Error::Overflow`].
    pub fn with_capacity(capacity: usize) -> Self {
        let mut data = BytesMut::with_capacity(capacity);
        data.resize(capacity, 0);
        Buffer {
            data,
            rpos: 0,
            wpos: 0,
        }
    }

    /// Create a read-mode buffer over a copy of `bytes`.
    ///
    /// Reading past the end fails with [`Error::Truncated`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Buffer {
            data: BytesMut::from(bytes),
            rpos: 0,
            wpos: bytes.len() * 8,
        }
    }

    /// Bytes not yet consumed by the read cursor
    pub fn remaining(&self) -> usize {
        (self.data.len() * 8 - self.rpos) / 8
    }

    /// Bytes written so far
    pub fn written(&self) -> &[u8] {
        &self.data[..(self.wpos + 7) / 8]
    }

    /// Byte offset of the write cursor
    pub fn position(&self) -> usize {
        self.wpos / 8
    }

    /// Byte offset of the read cursor
    pub fn read_position(&self) -> usize {
        self.rpos / 8
    }

    fn check_read(&self, bits: usize) -> Result<()> {
        if self.rpos + bits > self.data.len() * 8 {
            return Err(Error::Truncated {
                needed: (self.rpos + bits - self.data.len() * 8 + 7) / 8,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn check_write(&self, bits: usize) -> Result<()> {
        if self.wpos + bits > self.data.len() * 8 {
            return Err(Error::Overflow {
                requested: (bits + 7) / 8,
                capacity: self.data.len(),
            });
        }
        Ok(())
    }

    /// Write an `n`-bit value (n <= 64), MSB-first
    pub fn write_bits(&mut self, n: usize, value: u64) -> Result<()> {
        debug_assert!(n <= 64);
        self.check_write(n)?;
        for i in (0..n).rev() {
            let byte = self.wpos / 8;
            let shift = 7 - (self.wpos % 8);
            if (value >> i) & 1 != 0 {
                self.data[byte] |= 1 << shift;
            } else {
                self.data[byte] &= !(1 << shift);
            }
            self.wpos += 1;
        }
        Ok(())
    }

    /// Read an `n`-bit value (n <= 64), MSB-first
    pub fn read_bits(&mut self, n: usize) -> Result<u64> {
        debug_assert!(n <= 64);
        self.check_read(n)?;
        let mut value = 0u64;
        for _ in 0..n {
            let byte = self.rpos / 8;
            let shift = 7 - (self.rpos % 8);
            value = (value << 1) | ((self.data[byte] >> shift) & 1) as u64;
            self.rpos += 1;
        }
        Ok(value)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bits(8, value as u64)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bits(16, value as u64)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bits(32, value as u64)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_bits(32)? as u32)
    }

    /// Write a little-endian u16 (byte-aligned only)
    pub fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    /// Write a little-endian u32 (byte-aligned only)
    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write_slice(&value.to_le_bytes())
    }

    /// Read a little-endian u16 (byte-aligned only)
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian u32 (byte-aligned only)
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Write raw bytes at the (byte-aligned) write cursor
    pub fn write_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if self.wpos % 8 != 0 {
            return Err(Error::invalid_field(
                "buffer",
                "slice write on an unaligned bit cursor",
            ));
        }
        self.check_write(bytes.len() * 8)?;
        let start = self.wpos / 8;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.wpos += bytes.len() * 8;
        Ok(())
    }

    /// Read `n` raw bytes from the (byte-aligned) read cursor
    pub fn read_slice(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.rpos % 8 != 0 {
            return Err(Error::invalid_field(
                "buffer",
                "slice read on an unaligned bit cursor",
            ));
        }
        self.check_read(n * 8)?;
        let start = self.rpos / 8;
        let out = self.data[start..start + n].to_vec();
        self.rpos += n * 8;
        Ok(out)
    }

    /// Read a fixed-size byte array from the (byte-aligned) read cursor
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    /// Look at the next `n` bytes without consuming them
    pub fn peek(&self, n: usize) -> Result<&[u8]> {
        if self.rpos % 8 != 0 {
            return Err(Error::invalid_field(
                "buffer",
                "peek on an unaligned bit cursor",
            ));
        }
        self.check_read(n * 8)?;
        let start = self.rpos / 8;
        Ok(&self.data[start..start + n])
    }

    /// Overwrite two bytes at `offset` with a big-endian u16.
    ///
    /// Used to back-patch checksum fields after the covered bytes are known.
    pub fn patch_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        if offset + 2 > (self.wpos + 7) / 8 {
            return Err(Error::Overflow {
                requested: 2,
                capacity: self.data.len(),
            });
        }
        self.data[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_order_integers() {
        let mut buf = Buffer::with_capacity(7);
        buf.write_u8(0xAB).unwrap();
        buf.write_u16(0x1234).unwrap();
        buf.write_u32(0xDEADBEEF).unwrap();
        assert_eq!(buf.written(), &[0xAB, 0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF]);

        let mut buf = Buffer::from_bytes(&[0xAB, 0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(buf.read_u8().unwrap(), 0xAB);
        assert_eq!(buf.read_u16().unwrap(), 0x1234);
        assert_eq!(buf.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_bits_msb_first() {
        // IPv4-style first byte: version=4 (high nibble), ihl=5 (low nibble)
        let mut buf = Buffer::with_capacity(1);
        buf.write_bits(4, 4).unwrap();
        buf.write_bits(4, 5).unwrap();
        assert_eq!(buf.written(), &[0x45]);

        let mut buf = Buffer::from_bytes(&[0x45]);
        assert_eq!(buf.read_bits(4).unwrap(), 4);
        assert_eq!(buf.read_bits(4).unwrap(), 5);
    }

    #[test]
    fn test_bits_spanning_bytes() {
        // IPv6 first word: version(4) class(8) label(20)
        let mut buf = Buffer::with_capacity(4);
        buf.write_bits(4, 6).unwrap();
        buf.write_bits(8, 48).unwrap();
        buf.write_bits(20, 875274).unwrap();
        assert_eq!(buf.written(), &[0x63, 0x0D, 0x5B, 0x0A]);

        let mut buf = Buffer::from_bytes(&[0x63, 0x0D, 0x5B, 0x0A]);
        assert_eq!(buf.read_bits(4).unwrap(), 6);
        assert_eq!(buf.read_bits(8).unwrap(), 48);
        assert_eq!(buf.read_bits(20).unwrap(), 875274);
    }

    #[test]
    fn test_little_endian() {
        let mut buf = Buffer::with_capacity(6);
        buf.write_u16_le(0x0020).unwrap();
        buf.write_u32_le(0x00040867).unwrap();
        assert_eq!(buf.written(), &[0x20, 0x00, 0x67, 0x08, 0x04, 0x00]);

        let mut buf = Buffer::from_bytes(&[0x20, 0x00, 0x67, 0x08, 0x04, 0x00]);
        assert_eq!(buf.read_u16_le().unwrap(), 0x0020);
        assert_eq!(buf.read_u32_le().unwrap(), 0x00040867);
    }

    #[test]
    fn test_truncated_read() {
        let mut buf = Buffer::from_bytes(&[0x01, 0x02]);
        assert!(matches!(buf.read_u32(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_write_overflow() {
        let mut buf = Buffer::with_capacity(2);
        buf.write_u16(1).unwrap();
        assert!(matches!(buf.write_u8(1), Err(Error::Overflow { .. })));
    }

    #[test]
    fn test_patch_u16() {
        let mut buf = Buffer::with_capacity(4);
        buf.write_u32(0).unwrap();
        buf.patch_u16(2, 0xA64F).unwrap();
        assert_eq!(buf.written(), &[0x00, 0x00, 0xA6, 0x4F]);
    }

    #[test]
    fn test_unaligned_slice_rejected() {
        let mut buf = Buffer::with_capacity(4);
        buf.write_bits(3, 1).unwrap();
        assert!(buf.write_slice(&[0xFF]).is_err());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut buf = Buffer::from_bytes(&[0x03, 0x04]);
        assert_eq!(buf.peek(1).unwrap(), &[0x03]);
        assert_eq!(buf.read_u8().unwrap(), 0x03);
    }
}
