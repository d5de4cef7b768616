//! LSB-first bit stream reader.
//!
//! Every bit-packed strip format of the room decoders shifts whole bytes into
//! an accumulator from the top and consumes bits from the bottom. The reader
//! refills lazily: a byte is only loaded when the bits already buffered cannot
//! satisfy a request, so a decoder never touches data past what it actually
//! consumes.

use thiserror::Error;

/// Largest bit count accepted by a single read.
pub const MAX_READ_BITS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BitReaderError {
    #[error("bit stream exhausted after {consumed} bytes ({needed} bits requested)")]
    Exhausted { consumed: usize, needed: u32 },
    #[error("cannot read {0} bits at once")]
    TooWide(u32),
}

/// Bit reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    acc: u64,
    avail: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            acc: 0,
            avail: 0,
        }
    }

    /// Make at least `n` bits available in the accumulator.
    fn fill(&mut self, n: u32) -> Result<(), BitReaderError> {
        if n > MAX_READ_BITS {
            return Err(BitReaderError::TooWide(n));
        }
        while self.avail < n {
            let byte = *self.data.get(self.pos).ok_or(BitReaderError::Exhausted {
                consumed: self.pos,
                needed: n,
            })?;
            self.acc |= (byte as u64) << self.avail;
            self.avail += 8;
            self.pos += 1;
        }
        Ok(())
    }

    /// Return the next `n` bits without consuming them.
    pub fn peek_bits(&mut self, n: u32) -> Result<u32, BitReaderError> {
        self.fill(n)?;
        Ok((self.acc & mask(n)) as u32)
    }

    /// Drop `n` bits from the stream.
    pub fn advance(&mut self, n: u32) -> Result<(), BitReaderError> {
        self.fill(n)?;
        self.acc >>= n;
        self.avail -= n;
        Ok(())
    }

    /// Consume `n` bits, least significant first.
    pub fn read_bits(&mut self, n: u32) -> Result<u32, BitReaderError> {
        let value = self.peek_bits(n)?;
        self.acc >>= n;
        self.avail -= n;
        Ok(value)
    }

    pub fn read_bit(&mut self) -> Result<bool, BitReaderError> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Next 8 bits as a byte. On a byte boundary this is the next input byte.
    pub fn read_byte(&mut self) -> Result<u8, BitReaderError> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Number of consecutive set bits, stopping at the first clear bit or
    /// after `limit` set bits. The terminating clear bit is consumed.
    pub fn read_unary(&mut self, limit: u32) -> Result<u32, BitReaderError> {
        let mut count = 0;
        while count < limit {
            if !self.read_bit()? {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Bytes pulled from the underlying slice so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bits buffered but not yet consumed.
    pub fn buffered_bits(&self) -> u32 {
        self.avail
    }
}

fn mask(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}
