//! Bit-level packet reader.
//!
//! Theora packs header fields most-significant-bit first, Vorbis packs
//! them least-significant-bit first. Both are read from the same cursor;
//! a read past the end of the packet is a [`FilterError::Malformed`].

use contentsieve_core::{FilterError, Result};

/// Cursor over the bits of a packet payload.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Start reading at the first bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bits not yet consumed.
    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    /// Whether every bit has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.remaining_bits() == 0
    }

    /// Whether the cursor sits on a byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    fn ensure(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            return Err(FilterError::malformed(format!(
                "unexpected end of packet: wanted {} bits, {} left",
                bits,
                self.remaining_bits()
            )));
        }
        Ok(())
    }

    fn check_width(bits: u32) -> Result<()> {
        if bits > 32 {
            return Err(FilterError::malformed(format!(
                "cannot read {} bits into a 32-bit field",
                bits
            )));
        }
        Ok(())
    }

    /// Read `bits` (at most 32) most-significant-bit first.
    pub fn read_msb(&mut self, bits: u32) -> Result<u32> {
        Self::check_width(bits)?;
        self.ensure(bits as usize)?;
        let mut value: u64 = 0;
        for _ in 0..bits {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - (self.pos % 8))) & 1;
            value = (value << 1) | u64::from(bit);
            self.pos += 1;
        }
        Ok(value as u32)
    }

    /// Read `bits` (at most 32) least-significant-bit first.
    pub fn read_lsb(&mut self, bits: u32) -> Result<u32> {
        Self::check_width(bits)?;
        self.ensure(bits as usize)?;
        let mut value: u64 = 0;
        for i in 0..bits {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (self.pos % 8)) & 1;
            value |= u64::from(bit) << i;
            self.pos += 1;
        }
        Ok(value as u32)
    }

    /// Read a single bit in MSB-first order.
    pub fn read_bit_msb(&mut self) -> Result<bool> {
        Ok(self.read_msb(1)? == 1)
    }

    /// Read a single bit in LSB-first order.
    pub fn read_bit_lsb(&mut self) -> Result<bool> {
        Ok(self.read_lsb(1)? == 1)
    }

    /// Skip `bits` bits.
    pub fn skip(&mut self, bits: u64) -> Result<()> {
        let bits = usize::try_from(bits)
            .map_err(|_| FilterError::malformed("skip length overflows"))?;
        self.ensure(bits)?;
        self.pos += bits;
        Ok(())
    }

    /// Read `len` whole bytes. The cursor must be byte aligned.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if !self.is_aligned() {
            return Err(FilterError::malformed("byte read at unaligned bit position"));
        }
        let bits = len
            .checked_mul(8)
            .ok_or_else(|| FilterError::malformed("byte length overflows"))?;
        self.ensure(bits)?;
        let start = self.pos / 8;
        self.pos += bits;
        Ok(&self.data[start..start + len])
    }

    /// Read a byte-aligned little-endian 32-bit integer.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// The number of bits needed to store a positive integer `a` in two's
/// complement notation, or 0 for a non-positive integer.
pub fn ilog(a: i64) -> u32 {
    if a <= 0 {
        0
    } else {
        64 - (a as u64).leading_zeros()
    }
}
