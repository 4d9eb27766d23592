//! Bit-level I/O — least-significant-bit-first packing over any byte stream.
//!
//! [`BitWriter`] accumulates individual bits into a pending byte and emits it
//! once eight bits have arrived; [`BitReader`] does the inverse, refilling its
//! pending byte from the underlying stream one byte at a time. Both sides
//! agree on a single convention: within a byte, the first bit produced or
//! consumed is the byte's least-significant bit.

use std::io::{self, Read, Write};

/// Bit sink. The first bit pushed becomes bit 0 of the first emitted byte.
pub struct BitWriter<W: Write> {
    inner: W,
    pending_byte: u8,
    pending_bits: u8,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, pending_byte: 0, pending_bits: 0 }
    }

    /// Append one bit (0 or 1) to the stream.
    pub fn push_bit(&mut self, bit: u8) -> io::Result<()> {
        if bit & 1 != 0 {
            self.pending_byte |= 1 << self.pending_bits;
        }
        self.pending_bits += 1;
        if self.pending_bits == 8 {
            self.inner.write_all(&[self.pending_byte])?;
            self.pending_byte = 0;
            self.pending_bits = 0;
        }
        Ok(())
    }

    /// Emit any partial byte, left-padded with zero bits in the upper positions.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.pending_bits > 0 {
            self.inner.write_all(&[self.pending_byte])?;
            self.pending_byte = 0;
            self.pending_bits = 0;
        }
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Bit source. Refills one byte at a time from the underlying stream.
pub struct BitReader<R: Read> {
    inner: R,
    pending_byte: u8,
    pending_bits: u8,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pending_byte: 0, pending_bits: 0 }
    }

    /// Pull the next bit. Returns `Err(UnexpectedEof)` once the underlying
    /// stream is exhausted and no pending bits remain.
    pub fn pull_bit(&mut self) -> io::Result<u8> {
        if self.pending_bits == 0 {
            let mut byte = [0u8; 1];
            self.inner.read_exact(&mut byte)?;
            self.pending_byte = byte[0];
            self.pending_bits = 8;
        }
        let bit = self.pending_byte & 1;
        self.pending_byte >>= 1;
        self.pending_bits -= 1;
        Ok(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_bits() {
        let bits = [1u8, 0, 1, 1, 0, 0, 1, 0, 1, 1];
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            for &b in &bits {
                w.push_bit(b).unwrap();
            }
            w.flush().unwrap();
        }
        assert_eq!(buf.len(), 2);

        let mut r = BitReader::new(&buf[..]);
        let mut out = Vec::new();
        for _ in 0..bits.len() {
            out.push(r.pull_bit().unwrap());
        }
        assert_eq!(out, bits);
    }

    #[test]
    fn lsb_first_byte_layout() {
        // Pushing 1,0,0,0,0,0,0,0 should produce byte 0x01, not 0x80.
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            w.push_bit(1).unwrap();
            for _ in 0..7 {
                w.push_bit(0).unwrap();
            }
            w.flush().unwrap();
        }
        assert_eq!(buf, vec![0x01]);
    }

    #[test]
    fn eof_mid_byte_is_error() {
        let mut r = BitReader::new(&b""[..]);
        assert!(r.pull_bit().is_err());
    }

    #[test]
    fn partial_flush_zero_pads_upper_bits() {
        let mut buf = Vec::new();
        {
            let mut w = BitWriter::new(&mut buf);
            w.push_bit(1).unwrap();
            w.push_bit(1).unwrap();
            w.push_bit(1).unwrap();
            w.flush().unwrap();
        }
        assert_eq!(buf, vec![0b0000_0111]);
    }
}
