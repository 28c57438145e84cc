// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BCH(26,16) as used by the CIR rail protocol: 16 information bits followed by 10 parity
//! bits, generator polynomial 0x05B9.
//!
//! The single-error check matrix is derived at construction from the generator polynomial
//! (the syndrome left by each single-bit flip) rather than copied from a reference table;
//! the round-trip and error-correction laws in the tests pin it down.

/// Generator polynomial, aligned so its top term sits at bit 25.
const GEN_ALIGNED: u32 = 0x05b9 << 15;

const CODE_LEN: usize = 26;
const DATA_BITS: usize = 16;

/// Outcome of a BCH(26,16) decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decoded {
    /// The data bits, plus how many bit errors were repaired (0..=2).
    Ok { value: u16, corrected: u8 },
    /// Three or more errors; the raw (unrepaired) data bits are supplied for callers that
    /// continue on a best-effort basis.
    Uncorrectable { raw: u16 },
}

pub struct Bch2616 {
    /// Row i: (syndrome of a flip of bit 25-i, mask of bit 25-i).
    check: [(u16, u32); CODE_LEN],
}

impl Bch2616 {
    pub fn new() -> Bch2616 {
        let mut check = [(0u16, 0u32); CODE_LEN];
        for (i, row) in check.iter_mut().enumerate() {
            let mask = 1u32 << (CODE_LEN - 1 - i);
            *row = (remainder(mask) as u16, mask);
        }
        Bch2616 { check }
    }

    /// Systematically encode 16 data bits into a 26-bit codeword.
    pub fn encode(&self, data: u16) -> u32 {
        let shifted = u32::from(data) << (CODE_LEN - DATA_BITS);
        shifted | remainder(shifted)
    }

    /// Decode a 26-bit codeword, correcting up to two bit errors.
    pub fn decode(&self, code: u32) -> Decoded {
        let res = remainder(code) as u16;
        if res == 0 {
            return Decoded::Ok { value: (code >> 10) as u16, corrected: 0 };
        }

        for &(syn, mask) in &self.check {
            if res == syn {
                return Decoded::Ok { value: ((code ^ mask) >> 10) as u16, corrected: 1 };
            }
        }

        for i in 0..CODE_LEN {
            for j in i + 1..CODE_LEN {
                if res == self.check[i].0 ^ self.check[j].0 {
                    let fixed = code ^ self.check[i].1 ^ self.check[j].1;
                    return Decoded::Ok { value: (fixed >> 10) as u16, corrected: 2 };
                }
            }
        }

        Decoded::Uncorrectable { raw: (code >> 10) as u16 }
    }
}

impl Default for Bch2616 {
    fn default() -> Self {
        Self::new()
    }
}

/// 10-bit polynomial remainder of a 26-bit word.
fn remainder(code: u32) -> u32 {
    let mut c = code;
    for _ in 0..DATA_BITS {
        if c & 0x200_0000 != 0 {
            c ^= GEN_ALIGNED;
        }
        c <<= 1;
    }
    (c >> DATA_BITS) & 0x3ff
}

#[cfg(test)]
mod tests {
    use super::{Bch2616, Decoded};

    #[test]
    fn verify_check_matrix_is_well_formed() {
        let bch = Bch2616::new();

        // All single-bit syndromes must be non-zero and distinct, or single-error
        // correction would be ambiguous.
        for i in 0..26 {
            assert_ne!(bch.check[i].0, 0);
            for j in i + 1..26 {
                assert_ne!(bch.check[i].0, bch.check[j].0);
            }
        }
    }

    #[test]
    fn verify_round_trip() {
        let bch = Bch2616::new();
        for data in (0..=0xffffu32).step_by(257) {
            let cw = bch.encode(data as u16);
            assert_eq!(bch.decode(cw), Decoded::Ok { value: data as u16, corrected: 0 });
        }
    }

    #[test]
    fn verify_single_error_correction() {
        let bch = Bch2616::new();
        let clean = bch.encode(0xbeef);
        for i in 0..26 {
            let decoded = bch.decode(clean ^ (1 << i));
            assert_eq!(decoded, Decoded::Ok { value: 0xbeef, corrected: 1 }, "bit {}", i);
        }
    }

    #[test]
    fn verify_double_error_correction() {
        let bch = Bch2616::new();
        for data in [0x0000u16, 0xa5c3, 0xffff] {
            let clean = bch.encode(data);
            for i in 0..26 {
                for j in i + 1..26 {
                    let decoded = bch.decode(clean ^ (1 << i) ^ (1 << j));
                    assert_eq!(
                        decoded,
                        Decoded::Ok { value: data, corrected: 2 },
                        "data {:#x} bits {} {}",
                        data,
                        i,
                        j
                    );
                }
            }
        }
    }
}
