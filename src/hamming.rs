//! Parametric Hamming single-error-correcting codec.
//!
//! # Codeword layout
//! Positions are 1-indexed within an `n = k + r` bit codeword. Positions
//! that are powers of two are parity bits; the rest carry data bits in
//! order. Parity bit at position `2^j` covers every position `q` with
//! `q & 2^j != 0`, via XOR.
//!
//! # Streaming
//! [`HammingCodec::encode_stream`] and [`HammingCodec::decode_stream`] drive
//! [`crate::bitstream::BitWriter`]/[`BitReader`] to pack/unpack whole byte
//! streams into sequences of codewords. The final data block is zero-padded
//! on encode and trimmed back to the exact original bit count on decode.

use std::io::{self, Read, Write};
use thiserror::Error;

use crate::bitstream::{BitReader, BitWriter};

#[derive(Error, Debug)]
pub enum HammingError {
    #[error("invalid Hamming parameters: data_bits={data_bits} parity_bits={parity_bits} \
             (need 1..=16 data bits and 1..=8 parity bits)")]
    InvalidParameters { data_bits: u8, parity_bits: u8 },
    #[error("uncorrectable codeword at block index {block_index}")]
    Uncorrectable { block_index: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// `(k, r)` — data bits and parity bits per codeword. Does not itself verify
/// `2^r >= k + r + 1`; see [`HammingOptions::is_well_formed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HammingOptions {
    pub data_bits: u8,
    pub parity_bits: u8,
}

impl Default for HammingOptions {
    fn default() -> Self {
        Self { data_bits: 8, parity_bits: 4 }
    }
}

impl HammingOptions {
    pub fn new(data_bits: u8, parity_bits: u8) -> Result<Self, HammingError> {
        if !(1..=16).contains(&data_bits) || !(1..=8).contains(&parity_bits) {
            return Err(HammingError::InvalidParameters { data_bits, parity_bits });
        }
        Ok(Self { data_bits, parity_bits })
    }

    /// Whether `2^r >= k + r + 1` — the condition for a mathematically valid
    /// Hamming code over this many data bits. Not enforced by [`Self::new`];
    /// callers who want a stricter guarantee can check this themselves.
    pub fn is_well_formed(&self) -> bool {
        let n = self.data_bits as u32 + self.parity_bits as u32;
        (1u32 << self.parity_bits) >= n + 1
    }
}

#[inline]
fn is_power_of_two(p: u32) -> bool {
    p != 0 && (p & (p - 1)) == 0
}

/// A constructed `(k, r, n)` codec. `n <= 24`, so a codeword fits in a `u32`.
pub struct HammingCodec {
    k: u32,
    r: u32,
    n: u32,
}

impl HammingCodec {
    pub fn new(options: HammingOptions) -> Self {
        let k = options.data_bits as u32;
        let r = options.parity_bits as u32;
        Self { k, r, n: k + r }
    }

    pub fn k(&self) -> u32 {
        self.k
    }
    pub fn r(&self) -> u32 {
        self.r
    }
    pub fn n(&self) -> u32 {
        self.n
    }

    /// Total on-disk bytes an `original_size`-byte payload encodes to.
    ///
    /// `codeword_count = ceil(original_size*8 / k)`,
    /// `encoded_size = ceil(codeword_count * n / 8)`.
    pub fn encoded_size(&self, original_size: u64) -> u64 {
        let original_bits = original_size * 8;
        let codeword_count = self.codeword_count(original_bits);
        (codeword_count * self.n as u64 + 7) / 8
    }

    fn codeword_count(&self, original_bits: u64) -> u64 {
        if original_bits == 0 {
            0
        } else {
            (original_bits + self.k as u64 - 1) / self.k as u64
        }
    }

    /// Compute parity over positions `q` with `q & mask_pos != 0`.
    fn parity_at(codeword: u32, n: u32, mask_pos: u32) -> u32 {
        let mut parity = 0u32;
        for q in 1..=n {
            if q & mask_pos != 0 {
                parity ^= (codeword >> (q - 1)) & 1;
            }
        }
        parity
    }

    /// Encode a `k`-bit value (bit 0 = first data bit) into an `n`-bit codeword.
    pub fn encode_block(&self, data: u32) -> u32 {
        let mut codeword = 0u32;
        let mut data_bit_idx = 0u32;
        for pos in 1..=self.n {
            if !is_power_of_two(pos) {
                let bit = (data >> data_bit_idx) & 1;
                data_bit_idx += 1;
                if bit != 0 {
                    codeword |= 1 << (pos - 1);
                }
            }
        }

        let mut pos = 1u32;
        while pos <= self.n {
            if Self::parity_at(codeword, self.n, pos) != 0 {
                codeword |= 1 << (pos - 1);
            }
            pos <<= 1;
        }
        codeword
    }

    fn extract_data(&self, codeword: u32) -> u32 {
        let mut data = 0u32;
        let mut idx = 0u32;
        for pos in 1..=self.n {
            if !is_power_of_two(pos) {
                let bit = (codeword >> (pos - 1)) & 1;
                data |= bit << idx;
                idx += 1;
            }
        }
        data
    }

    /// Decode an `n`-bit codeword, returning `(data, error_flag)`.
    ///
    /// `error_flag` is `true` when the codeword could not be trusted: the
    /// syndrome named a position beyond `n`, or a single-bit correction
    /// failed its post-correction re-check.
    pub fn decode_block(&self, codeword: u32) -> (u32, bool) {
        let mut syndrome = 0u32;
        let mut pos = 1u32;
        while pos <= self.n {
            if Self::parity_at(codeword, self.n, pos) != 0 {
                syndrome |= pos;
            }
            pos <<= 1;
        }

        if syndrome == 0 {
            return (self.extract_data(codeword), false);
        }
        if syndrome > self.n {
            return (0, true);
        }

        let corrected = codeword ^ (1 << (syndrome - 1));

        let mut verify = 0u32;
        let mut pos = 1u32;
        while pos <= self.n {
            if Self::parity_at(corrected, self.n, pos) != 0 {
                verify |= pos;
            }
            pos <<= 1;
        }
        if verify != 0 {
            return (0, true);
        }

        (self.extract_data(corrected), false)
    }

    /// Encode a byte stream into a sequence of codewords packed LSB-first.
    pub fn encode_stream<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<(), HammingError> {
        let mut bits = BitReader::new(reader);
        let mut out = BitWriter::new(writer);

        loop {
            let mut block = 0u32;
            let mut count = 0u32;
            for i in 0..self.k {
                match bits.pull_bit() {
                    Ok(bit) => {
                        block |= (bit as u32) << i;
                        count += 1;
                    }
                    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                    Err(e) => return Err(e.into()),
                }
            }
            if count == 0 {
                break;
            }

            let codeword = self.encode_block(block);
            for i in 0..self.n {
                out.push_bit(((codeword >> i) & 1) as u8)?;
            }

            if count < self.k {
                break;
            }
        }

        out.flush()?;
        Ok(())
    }

    /// Decode exactly the codewords implied by `original_size` bytes,
    /// trimming the final block's zero padding back off.
    pub fn decode_stream<R: Read, W: Write>(
        &self,
        reader: R,
        writer: W,
        original_size: u64,
    ) -> Result<(), HammingError> {
        let original_bits = original_size * 8;
        let codeword_count = self.codeword_count(original_bits);

        let mut bits = BitReader::new(reader);
        let mut out = BitWriter::new(writer);

        for block_idx in 0..codeword_count {
            let mut codeword = 0u32;
            for i in 0..self.n {
                let bit = bits.pull_bit()?;
                codeword |= (bit as u32) << i;
            }

            let (data, errored) = self.decode_block(codeword);
            if errored {
                return Err(HammingError::Uncorrectable { block_index: block_idx });
            }

            let is_last = block_idx == codeword_count - 1;
            let bits_to_emit = if is_last {
                let already = self.k as u64 * (codeword_count - 1);
                (original_bits - already) as u32
            } else {
                self.k
            };
            for i in 0..bits_to_emit {
                out.push_bit(((data >> i) & 1) as u8)?;
            }
        }

        out.flush()?;
        Ok(())
    }
}
