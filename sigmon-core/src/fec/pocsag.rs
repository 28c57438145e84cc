// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! BCH(31,21,2) in the POCSAG codeword layout: data in bits 31..=11, BCH parity in bits
//! 10..=1, and an overall even-parity bit in bit 0. Generator polynomial
//! g(x) = x¹⁰+x⁹+x⁸+x⁶+x⁵+x³+1 (0x769).
//!
//! The fast path is a 2048-entry syndrome table covering every one- and two-bit error of the
//! 31 coded bits. Two-bit patterns that involve the overall parity bit fall outside the
//! table and are swept by a 32-lane bit-sliced syndrome update, 32 trial patterns per pass.

use crate::util::bits::even_parity;

/// POCSAG generator polynomial (octal 03551).
const GEN_POLY: u32 = 0x769;

const DATA_BITS: usize = 21;
const PARITY_BITS: usize = 10;

/// The syndrome bit set when the overall even parity of the word fails.
const PARITY_SYNDROME: u32 = 0x400;

/// How hard to try repairing a damaged codeword.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorCorrection {
    /// Accept only words with a zero syndrome.
    None,
    /// Attempt single-bit repair.
    Single,
    /// Also attempt exhaustive two-bit repair.
    #[default]
    Two,
}

impl ErrorCorrection {
    pub fn from_level(level: u32) -> ErrorCorrection {
        match level {
            0 => ErrorCorrection::None,
            1 => ErrorCorrection::Single,
            _ => ErrorCorrection::Two,
        }
    }
}

/// Polynomial remainder of the 31 coded bits (the word with the parity bit stripped).
fn bch_syndrome(codeword: u32) -> u32 {
    let mut shreg = codeword >> 1;
    let mut mask = 1u32 << 30;
    let mut coeff = GEN_POLY << (DATA_BITS - 1);
    for _ in 0..DATA_BITS {
        if shreg & mask != 0 {
            shreg ^= coeff;
        }
        mask >>= 1;
        coeff >>= 1;
    }
    shreg
}

pub struct PocsagCode {
    /// 10-bit BCH parity of a codeword with only data bit i set.
    parity_tbl: [u16; DATA_BITS],
    /// 10-bit BCH syndrome of a single error in coded bit i (bit i+1 of the word).
    syn_tbl: [u16; 31],
    /// 11-bit syndrome (BCH ‖ parity) → error pattern.
    err_tbl: Vec<u32>,
}

impl PocsagCode {
    pub fn new() -> PocsagCode {
        // The BCH parity of data bit i is the remainder its codeword position leaves; the
        // syndrome of an error in coded bit i likewise. Both come from the same division.
        let mut parity_tbl = [0u16; DATA_BITS];
        for (databit, entry) in parity_tbl.iter_mut().enumerate() {
            *entry = bch_syndrome(1u32 << (databit + PARITY_BITS + 1)) as u16;
        }

        let mut syn_tbl = [0u16; 31];
        for (bit, entry) in syn_tbl.iter_mut().enumerate() {
            *entry = bch_syndrome(1u32 << (bit + 1)) as u16;
        }

        let mut err_tbl = vec![0u32; 2048];
        // A single error in any coded bit also flips the overall parity.
        for i in 1..32 {
            let syn = u32::from(syn_tbl[i - 1]) | PARITY_SYNDROME;
            err_tbl[syn as usize] = 1 << i;
        }
        // In a two-bit error the parity flips cancel out.
        for i in 1..32usize {
            for j in i + 1..32 {
                let syn = u32::from(syn_tbl[i - 1] ^ syn_tbl[j - 1]);
                if err_tbl[syn as usize] == 0 {
                    err_tbl[syn as usize] = (1 << i) | (1 << j);
                }
            }
        }

        PocsagCode { parity_tbl, syn_tbl, err_tbl }
    }

    /// Systematically encode 21 data bits (message flag + 20 payload bits) into a 32-bit
    /// codeword with BCH and even parity.
    pub fn encode(&self, data: u32) -> u32 {
        let mut parity = 0u16;
        let mut d = data & 0x1f_ffff;
        while d != 0 {
            let bit = d.trailing_zeros() as usize;
            parity ^= self.parity_tbl[bit];
            d &= d - 1;
        }
        let mut codeword = ((data & 0x1f_ffff) << (PARITY_BITS + 1)) | (u32::from(parity) << 1);
        codeword |= even_parity(codeword);
        codeword
    }

    /// 11-bit syndrome of a received word: the BCH remainder plus the overall parity in
    /// bit 10.
    pub fn syndrome(&self, codeword: u32) -> u32 {
        let mut syn = 0u32;
        let mut bits = codeword >> 1;
        while bits != 0 {
            let bit = bits.trailing_zeros() as usize;
            syn ^= u32::from(self.syn_tbl[bit]);
            bits &= bits - 1;
        }
        if even_parity(codeword) != 0 {
            syn |= PARITY_SYNDROME;
        }
        syn
    }

    /// Try to repair a received word. Returns the number of corrected bits on success.
    pub fn correct(&self, codeword: &mut u32, level: ErrorCorrection) -> Option<u32> {
        let syn = self.syndrome(*codeword);
        if syn == 0 {
            return Some(0);
        }
        if level == ErrorCorrection::None {
            return None;
        }

        // A bare parity-bit error leaves the BCH remainder clean.
        if syn == PARITY_SYNDROME {
            *codeword ^= 1;
            return Some(1);
        }

        let pattern = self.err_tbl[syn as usize];
        if pattern.count_ones() == 1 {
            *codeword ^= pattern;
            return Some(1);
        }
        if level == ErrorCorrection::Single {
            return None;
        }
        if pattern != 0 {
            *codeword ^= pattern;
            return Some(pattern.count_ones());
        }

        // Two-bit patterns touching the parity bit are not in the table.
        self.bitslice_repair(codeword)
    }

    /// Exhaustive two-bit repair: load 32 trial words (one per lane) as bit-slices, update
    /// all 32 syndromes in parallel with word-wide XORs, and pick any lane that lands on a
    /// zero syndrome.
    fn bitslice_repair(&self, codeword: &mut u32) -> Option<u32> {
        let original = *codeword;
        let mut xpose = transpose_clone(original);
        let mut input = xpose;
        let mut lane = 0usize;

        let check = |xpose: &mut [u32; 32], input: &mut [u32; 32], codeword: &mut u32| -> bool {
            *input = *xpose;
            bitslice_syndrome(xpose);
            let mut res = 0u32;
            for slice in xpose.iter() {
                res |= *slice;
            }
            res = !res;
            if res != 0 {
                let hit = 31 - res.leading_zeros();
                *codeword = transpose_n(hit, input);
                return true;
            }
            false
        };

        for b1 in 0..32u32 {
            for b2 in b1..32u32 {
                xpose[b1 as usize] ^= 1 << lane;
                xpose[b2 as usize] ^= 1 << lane;
                lane += 1;
                if lane == 32 {
                    if check(&mut xpose, &mut input, codeword) {
                        return Some((original ^ *codeword).count_ones());
                    }
                    xpose = transpose_clone(original);
                    lane = 0;
                }
            }
        }
        if lane > 0 && check(&mut xpose, &mut input, codeword) {
            return Some((original ^ *codeword).count_ones());
        }

        None
    }
}

impl Default for PocsagCode {
    fn default() -> Self {
        Self::new()
    }
}

/// Spread a word across 32 bit-slices: slice i holds bit i of the word in every lane.
fn transpose_clone(src: u32) -> [u32; 32] {
    let mut out = [0u32; 32];
    for (i, slice) in out.iter_mut().enumerate() {
        if src & (1 << i) != 0 {
            *slice = u32::MAX;
        }
    }
    out
}

/// Collapse lane n of a bit-sliced matrix back into a word.
fn transpose_n(n: u32, matrix: &[u32; 32]) -> u32 {
    let mut out = 0u32;
    for (j, slice) in matrix.iter().enumerate() {
        if slice & (1 << n) != 0 {
            out |= 1 << j;
        }
    }
    out
}

/// Bit-sliced equivalent of `syndrome()`: computes the 11-bit syndrome of all 32 lanes at
/// once. On return a lane is all-zero across the slices iff its trial word was clean.
fn bitslice_syndrome(slices: &mut [u32; 32]) {
    // Fold the parity and strip the parity bit in one pass.
    let mut paritymask = slices[0];
    for i in 1..32 {
        paritymask ^= slices[i];
        slices[i - 1] = slices[i];
    }
    slices[31] = 0;

    // Long division, one step per data bit. Lanes whose current top plane is set get the
    // generator coefficients (GEN_POLY << (20 - n), sans the top term) XORed in; the top
    // plane itself is cleared, exactly as the aligned XOR would.
    for n in 0..DATA_BITS {
        let top = slices[30 - n];
        slices[20 - n] ^= top;
        slices[23 - n] ^= top;
        slices[25 - n] ^= top;
        slices[26 - n] ^= top;
        slices[28 - n] ^= top;
        slices[29 - n] ^= top;
        slices[30 - n] = 0;
    }

    // The overall parity lands in syndrome bit 10.
    slices[10] |= paritymask;
}

#[cfg(test)]
mod tests {
    use super::{bch_syndrome, ErrorCorrection, PocsagCode};

    const POCSAG_SYNC: u32 = 0x7cd2_15d8;
    const POCSAG_IDLE: u32 = 0x7a89_c197;

    #[test]
    fn verify_well_known_codewords() {
        let code = PocsagCode::new();
        assert_eq!(code.syndrome(POCSAG_SYNC), 0);
        assert_eq!(code.syndrome(POCSAG_IDLE), 0);
        assert_eq!(bch_syndrome(POCSAG_SYNC), 0);

        // Encoding the data bits of SYNC must reproduce SYNC exactly.
        assert_eq!(code.encode(POCSAG_SYNC >> 11), POCSAG_SYNC);
        assert_eq!(code.encode(POCSAG_IDLE >> 11), POCSAG_IDLE);
    }

    #[test]
    fn verify_round_trip() {
        let code = PocsagCode::new();
        for d in (0..0x1f_ffff).step_by(0x1_86a1) {
            let mut cw = code.encode(d);
            assert_eq!(code.correct(&mut cw, ErrorCorrection::None), Some(0));
            assert_eq!(cw >> 11, d);
        }
    }

    #[test]
    fn verify_single_error_correction() {
        let code = PocsagCode::new();
        let clean = code.encode(0x0a_1234);
        for i in 0..32 {
            let mut cw = clean ^ (1 << i);
            assert_eq!(code.correct(&mut cw, ErrorCorrection::Single), Some(1), "bit {}", i);
            assert_eq!(cw, clean);
        }
    }

    #[test]
    fn verify_double_error_correction() {
        let code = PocsagCode::new();
        let clean = code.encode(0x15_0f33);
        for i in 0..32 {
            for j in i + 1..32 {
                let mut cw = clean ^ (1 << i) ^ (1 << j);
                let fixed = code.correct(&mut cw, ErrorCorrection::Two);
                assert_eq!(fixed, Some(2), "bits {} {}", i, j);
                assert_eq!(cw, clean, "bits {} {}", i, j);
            }
        }
    }

    #[test]
    fn verify_correction_levels_gate_repairs() {
        let code = PocsagCode::new();
        let clean = code.encode(0x12_3456);

        let mut cw = clean ^ 0x10;
        assert_eq!(code.correct(&mut cw, ErrorCorrection::None), None);

        let mut cw = clean ^ 0x10 ^ 0x4000;
        assert_eq!(code.correct(&mut cw, ErrorCorrection::Single), None);
        assert_eq!(code.correct(&mut cw, ErrorCorrection::Two), Some(2));
    }
}
