//! Canonical prefix-code decoding tables.
//!
//! The encoder writes each code's canonical bits reversed, LSB-first, so a
//! decoder that shifts bits into an accumulator MSB-first sees canonical
//! codes in canonical order and can decode against per-length first-code
//! offsets.  Codes here are small (≤ 704 symbols, depth ≤ 15), and the
//! symbol-at-a-time loop is bounded by the maximum depth.

use crate::decode::bit_reader::BitReader;
use crate::decode::types::BrotliDecoderError;

/// Depth bound shared with the encoder.
const MAX_LENGTH: usize = 15;

/// A canonical prefix code ready for symbol-by-symbol decoding.
pub struct PrefixCode {
    /// Number of codes of each length 0..=15.
    counts: [u16; MAX_LENGTH + 1],
    /// Symbols sorted by (code length, symbol value).
    symbols: Vec<u16>,
    /// Set when the code has exactly one symbol, which is then read with
    /// zero bits.
    single: Option<u16>,
}

impl PrefixCode {
    /// Builds a table from per-symbol code lengths.
    ///
    /// Exactly one non-zero length makes a zero-bit code; otherwise the
    /// lengths must describe a complete prefix code.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self, BrotliDecoderError> {
        let mut counts = [0u16; MAX_LENGTH + 1];
        let mut used = 0usize;
        let mut single_sym = 0u16;
        for (sym, &len) in lengths.iter().enumerate() {
            if len as usize > MAX_LENGTH {
                return Err(BrotliDecoderError::InvalidPrefixCode);
            }
            if len > 0 {
                counts[len as usize] += 1;
                used += 1;
                single_sym = sym as u16;
            }
        }
        if used == 0 {
            return Err(BrotliDecoderError::InvalidPrefixCode);
        }
        if used == 1 {
            return Ok(PrefixCode {
                counts,
                symbols: vec![single_sym],
                single: Some(single_sym),
            });
        }
        // Kraft check: a readable code must be exactly full.
        let mut space = 0u64;
        for len in 1..=MAX_LENGTH {
            space += (counts[len] as u64) << (MAX_LENGTH - len);
        }
        if space != 1 << MAX_LENGTH {
            return Err(BrotliDecoderError::InvalidPrefixCode);
        }
        let mut offsets = [0usize; MAX_LENGTH + 2];
        for len in 1..=MAX_LENGTH {
            offsets[len + 1] = offsets[len] + counts[len] as usize;
        }
        let mut symbols = vec![0u16; used];
        let mut next = offsets;
        for (sym, &len) in lengths.iter().enumerate() {
            if len > 0 {
                symbols[next[len as usize]] = sym as u16;
                next[len as usize] += 1;
            }
        }
        Ok(PrefixCode {
            counts,
            symbols,
            single: None,
        })
    }

    /// Builds the degenerate one-symbol code used by the simple form.
    pub fn single_symbol(sym: u16) -> Self {
        PrefixCode {
            counts: [0u16; MAX_LENGTH + 1],
            symbols: vec![sym],
            single: Some(sym),
        }
    }

    /// True when every read consumes zero bits.
    pub fn is_single(&self) -> bool {
        self.single.is_some()
    }

    /// Decodes one symbol.  `None` means input starved (cursor untouched);
    /// a code-space miss cannot happen on a complete code.
    pub fn read_symbol(
        &self,
        br: &mut BitReader,
    ) -> Option<Result<u16, BrotliDecoderError>> {
        if let Some(sym) = self.single {
            return Some(Ok(sym));
        }
        let cp = br.checkpoint();
        let mut code = 0u32;
        let mut first = 0u32;
        let mut index = 0usize;
        for len in 1..=MAX_LENGTH {
            match br.take_bit() {
                Some(bit) => {
                    code = (code << 1) | bit;
                    let count = self.counts[len] as u32;
                    if code < first + count {
                        return Some(Ok(self.symbols[index + (code - first) as usize]));
                    }
                    index += count as usize;
                    first = (first + count) << 1;
                }
                None => {
                    br.restore(cp);
                    return None;
                }
            }
        }
        Some(Err(BrotliDecoderError::InvalidPrefixCode))
    }
}

/// The fixed code that protects the code-length code itself: lengths
/// {2,4,3,2,2,4} over the six possible values.
pub fn code_length_code_for_lengths() -> PrefixCode {
    // Canonical layout of the constant lengths: three codes of width 2
    // (values 0, 3, 4), one of width 3 (value 2), two of width 4 (1, 5).
    let mut counts = [0u16; MAX_LENGTH + 1];
    counts[2] = 3;
    counts[3] = 1;
    counts[4] = 2;
    PrefixCode {
        counts,
        symbols: vec![0, 3, 4, 2, 1, 5],
        single: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::bit_writer::BitWriter;
    use crate::encode::huffman::{convert_bit_depths_to_symbols, create_huffman_tree};

    /// Encoding with the encoder-side canonical bits and decoding here must
    /// agree symbol for symbol.
    #[test]
    fn agrees_with_encoder_canonical_codes() {
        let histo: Vec<u32> = (0..64u32).map(|i| (i * 7) % 50 + 1).collect();
        let mut depth = vec![0u8; 64];
        create_huffman_tree(&histo, 15, &mut depth);
        let mut bits = vec![0u16; 64];
        convert_bit_depths_to_symbols(&depth, &mut bits);
        let code = PrefixCode::from_lengths(&depth).expect("complete code");

        let symbols: Vec<u16> = (0..64).cycle().take(500).collect();
        let mut w = BitWriter::new(0, 0);
        for &s in &symbols {
            w.write_bits(depth[s as usize] as u32, bits[s as usize] as u64);
        }
        w.jump_to_byte_boundary();
        let mut r = BitReader::new();
        r.append(w.full_bytes());
        for &expected in &symbols {
            let got = code.read_symbol(&mut r).expect("enough input").expect("valid");
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn incomplete_code_is_rejected() {
        // Two symbols of length 2: half the code space is missing.
        assert!(PrefixCode::from_lengths(&[2, 2, 0, 0]).is_err());
        // Oversubscribed space.
        assert!(PrefixCode::from_lengths(&[1, 1, 1]).is_err());
        // Complete: {1, 2, 2}.
        assert!(PrefixCode::from_lengths(&[1, 2, 2]).is_ok());
    }

    #[test]
    fn single_symbol_reads_no_bits() {
        let code = PrefixCode::from_lengths(&[0, 0, 0, 3, 0]).expect("one symbol");
        assert!(code.is_single());
        let mut r = BitReader::new();
        assert_eq!(code.read_symbol(&mut r).unwrap().unwrap(), 3);
        assert_eq!(r.available_bits(), 0);
    }

    #[test]
    fn starved_read_restores_cursor() {
        let code = PrefixCode::from_lengths(&[1, 2, 2]).expect("complete");
        let mut r = BitReader::new();
        assert!(code.read_symbol(&mut r).is_none());
        assert_eq!(r.checkpoint(), 0);
    }

    #[test]
    fn static_code_length_code_matches_its_lengths() {
        let built = PrefixCode::from_lengths(&[2, 4, 3, 2, 2, 4]).expect("complete");
        let constant = code_length_code_for_lengths();
        assert_eq!(built.counts, constant.counts);
        assert_eq!(built.symbols, constant.symbols);
    }
}
