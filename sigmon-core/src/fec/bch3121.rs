// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BCH(31,21,2) in the FLEX codeword layout: data in bits 0..=20, parity in bits 21..=30.
//!
//! Two decode representations are provided. The table decoder maps the syndrome pair
//! (S₁‖S₃) straight to a 31-bit error pattern and is O(1) per word. The algebraic decoder
//! solves the error locator polynomial with a Chien search; it is the per-codeword path the
//! FLEX phase decoder runs, and the pair is cross-checked in the tests below.

use super::gf32::{Gf32, CODE_LEN, PARITY_BITS};

/// The number of data bits in a codeword.
pub const DATA_BITS: usize = 21;

/// Mask selecting the data bits of a codeword.
pub const DATA_MASK: u32 = 0x1f_ffff;

pub struct Bch3121 {
    field: Gf32,
    /// α^i keyed by the transmitted bit index (bit 30 of the word first).
    s1_tbl: [u8; CODE_LEN],
    /// α^3i, same keying.
    s3_tbl: [u8; CODE_LEN],
    /// 10-bit parity of a codeword with only data bit i set.
    parity_tbl: [u16; DATA_BITS],
    /// (S₁ << 5) | S₃ → error pattern; zero entries are uncorrectable.
    err_tbl: Vec<u32>,
}

impl Bch3121 {
    pub fn new() -> Bch3121 {
        let field = Gf32::new();

        let mut s1_tbl = [0u8; CODE_LEN];
        let mut s3_tbl = [0u8; CODE_LEN];
        for i in 0..CODE_LEN {
            s1_tbl[i] = field.exp(i);
            s3_tbl[i] = field.exp((3 * i) % CODE_LEN);
        }

        let mut code =
            Bch3121 { field, s1_tbl, s3_tbl, parity_tbl: [0; DATA_BITS], err_tbl: vec![0; 1024] };
        code.build_parity_table();
        code.build_error_table();
        code
    }

    /// LFSR-encode a codeword with a single data bit set, for every data bit. Encoding a full
    /// word is then the XOR of the entries for its set bits.
    fn build_parity_table(&mut self) {
        for databit in 0..DATA_BITS {
            let mut bb = [0u8; PARITY_BITS];

            // Process data bits from the MSB down; the input index is reversed to match the
            // codeword packing of `encode`.
            for i in (0..DATA_BITS).rev() {
                let input = u8::from(i == DATA_BITS - 1 - databit);
                let feedback = input ^ bb[PARITY_BITS - 1];
                if feedback != 0 {
                    for j in (1..PARITY_BITS).rev() {
                        bb[j] = if self.field.gen_coeff(j) != 0 { bb[j - 1] ^ feedback } else { bb[j - 1] };
                    }
                    bb[0] = u8::from(self.field.gen_coeff(0) != 0) & feedback;
                } else {
                    for j in (1..PARITY_BITS).rev() {
                        bb[j] = bb[j - 1];
                    }
                    bb[0] = 0;
                }
            }

            let mut parity = 0u16;
            for (i, &b) in bb.iter().enumerate() {
                if b != 0 {
                    parity |= 1 << (PARITY_BITS - 1 - i);
                }
            }
            self.parity_tbl[databit] = parity;
        }
    }

    fn build_error_table(&mut self) {
        let mut bit_key = [0u32; CODE_LEN];

        for bit in 0..CODE_LEN {
            let recv_idx = 30 - bit;
            let key = (u32::from(self.s1_tbl[recv_idx]) << 5) | u32::from(self.s3_tbl[recv_idx]);
            bit_key[bit] = key;
            self.err_tbl[key as usize] = 1 << bit;
        }
        for i in 0..CODE_LEN {
            for j in i + 1..CODE_LEN {
                let key = (bit_key[i] ^ bit_key[j]) as usize;
                if self.err_tbl[key] == 0 {
                    self.err_tbl[key] = (1 << i) | (1 << j);
                }
            }
        }
    }

    /// Systematically encode 21 data bits into a 31-bit codeword.
    pub fn encode(&self, data: u32) -> u32 {
        let mut parity = 0u16;
        let mut d = data & DATA_MASK;
        while d != 0 {
            let bit = d.trailing_zeros() as usize;
            parity ^= self.parity_tbl[bit];
            d &= d - 1;
        }
        (data & DATA_MASK) | (u32::from(parity) << DATA_BITS)
    }

    /// Syndrome key (S₁ << 5) | S₃ of a received word.
    fn syndrome_key(&self, codeword: u32) -> u32 {
        let mut s1 = 0u8;
        let mut s3 = 0u8;
        let mut w = codeword & 0x7fff_ffff;
        while w != 0 {
            let bit = w.trailing_zeros() as usize;
            let recv_idx = 30 - bit;
            s1 ^= self.s1_tbl[recv_idx];
            s3 ^= self.s3_tbl[recv_idx];
            w &= w - 1;
        }
        (u32::from(s1) << 5) | u32::from(s3)
    }

    /// Correct up to two bit errors via the syndrome lookup table. Returns the number of
    /// corrected bits, or `None` if the word is uncorrectable.
    pub fn correct(&self, codeword: &mut u32) -> Option<u32> {
        let key = self.syndrome_key(*codeword);
        if key == 0 {
            return Some(0);
        }
        let error = self.err_tbl[key as usize];
        if error == 0 {
            return None;
        }
        *codeword ^= error;
        Some(error.count_ones())
    }

    /// Correct up to two bit errors algebraically: compute the syndromes, test the
    /// single-error condition S₃ = S₁³ in log form, otherwise solve the two-error locator
    /// with a Chien search over GF(2⁵)\{0}. Returns the corrected bit count, or `None`.
    pub fn correct_algebraic(&self, codeword: &mut u32) -> Option<u32> {
        let n = CODE_LEN as i32;

        // Syndromes S1..S4; the received coefficient j is bit (30 - j) of the word.
        let mut s = [0u8; 4];
        let mut w = *codeword & 0x7fff_ffff;
        while w != 0 {
            let bit = w.trailing_zeros() as usize;
            let j = 30 - bit;
            for (k, sk) in s.iter_mut().enumerate() {
                *sk ^= self.field.exp(((k + 1) * j) % CODE_LEN);
            }
            w &= w - 1;
        }

        if s == [0; 4] {
            return Some(0);
        }

        let l0 = i32::from(self.field.log(s[0]));
        let l1 = i32::from(self.field.log(s[1]));
        let l2 = i32::from(self.field.log(s[2]));

        // S1 = 0 with a non-zero S2 cannot be produced by <= 2 errors.
        if l0 == -1 {
            return if l1 != -1 { None } else { Some(0) };
        }

        // Single error at coefficient log(S1): S3 must equal S1^3, compared as exponents
        // modulo 31.
        let mut triple = l0 * 3;
        while triple >= n {
            triple -= n;
        }
        if l2 == triple {
            *codeword ^= 1 << (30 - l0 as usize);
            return Some(1);
        }

        // Two errors: reduce the locator sigma(x) to 1 + c1*x + c2*x^2.
        let denom = if l2 != -1 {
            self.field.exp(triple as usize) ^ self.field.exp(l2 as usize)
        } else {
            self.field.exp(triple as usize)
        };
        let denom_log = i32::from(self.field.log(denom));

        let mut c1 = l1 - denom_log;
        let mut c2 = l0 - denom_log;
        if c1 < 0 {
            c1 += n;
        }
        if c2 < 0 {
            c2 += n;
        }

        // Chien search for the two roots.
        let mut pos: [i32; 2] = [-1, -1];
        let mut a1 = c1;
        let mut a2 = c2;
        for i in 1..=n {
            a1 += 1;
            if a1 >= n {
                a1 -= n;
            }
            a2 += 2;
            while a2 >= n {
                a2 -= n;
            }
            if 1 ^ self.field.exp(a1 as usize) ^ self.field.exp(a2 as usize) == 0 {
                let root = if i < n { i } else { 0 };
                if pos[0] < 0 {
                    pos[0] = root;
                } else {
                    pos[1] = root;
                    break;
                }
            }
        }

        if pos[0] >= 0 && pos[1] >= 0 {
            *codeword ^= 1 << (30 - pos[0] as usize);
            *codeword ^= 1 << (30 - pos[1] as usize);
            return Some(2);
        }

        None
    }
}

impl Default for Bch3121 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Bch3121, DATA_MASK};

    /// A spread of payloads covering both all-zero and all-one data plus a stride across the
    /// 21-bit space.
    fn payloads() -> Vec<u32> {
        let mut v = vec![0, 1, DATA_MASK, 0x15_5555, 0x0a_aaaa];
        v.extend((0..DATA_MASK).step_by(0x18_7bd).map(|d| d & DATA_MASK));
        v
    }

    #[test]
    fn verify_round_trip() {
        let bch = Bch3121::new();
        for d in payloads() {
            let mut cw = bch.encode(d);
            assert_eq!(bch.correct(&mut cw), Some(0));
            assert_eq!(cw & DATA_MASK, d);

            let mut cw = bch.encode(d);
            assert_eq!(bch.correct_algebraic(&mut cw), Some(0));
            assert_eq!(cw & DATA_MASK, d);
        }
    }

    #[test]
    fn verify_single_error_correction() {
        let bch = Bch3121::new();
        let clean = bch.encode(0x12_3456);
        for i in 0..31 {
            let mut cw = clean ^ (1 << i);
            assert_eq!(bch.correct(&mut cw), Some(1));
            assert_eq!(cw, clean);

            let mut cw = clean ^ (1 << i);
            assert_eq!(bch.correct_algebraic(&mut cw), Some(1));
            assert_eq!(cw, clean);
        }
    }

    #[test]
    fn verify_double_error_correction() {
        let bch = Bch3121::new();
        for d in [0u32, 0x12_3456, DATA_MASK] {
            let clean = bch.encode(d);
            for i in 0..31 {
                for j in i + 1..31 {
                    let corrupted = clean ^ (1 << i) ^ (1 << j);

                    let mut cw = corrupted;
                    assert_eq!(bch.correct(&mut cw), Some(2), "table d={:#x} i={} j={}", d, i, j);
                    assert_eq!(cw, clean);

                    let mut cw = corrupted;
                    assert_eq!(
                        bch.correct_algebraic(&mut cw),
                        Some(2),
                        "algebraic d={:#x} i={} j={}",
                        d,
                        i,
                        j
                    );
                    assert_eq!(cw, clean);
                }
            }
        }
    }

    #[test]
    fn verify_three_errors_never_silently_pass() {
        // Three errors exceed the design capacity: the decoder may reject or miscorrect,
        // but it can never return the transmitted word, and both representations must
        // agree on the outcome.
        let bch = Bch3121::new();
        let clean = bch.encode(0x0f_0f0f);
        for i in 0..29 {
            let corrupted = clean ^ (1 << i) ^ (1 << (i + 1)) ^ (1 << (i + 2));

            let mut table = corrupted;
            let table_result = bch.correct(&mut table);
            assert!(table_result.is_none() || table != clean, "bit {}", i);

            let mut algebraic = corrupted;
            let algebraic_result = bch.correct_algebraic(&mut algebraic);
            assert_eq!(table_result.is_some(), algebraic_result.is_some(), "bit {}", i);
        }
    }
}
