// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GF(2⁵) field arithmetic for the BCH(31,21,2) codecs.

/// Primitive polynomial for GF(2⁵): x⁵ + x² + 1.
const PRIM_POLY: u32 = 0x25;

/// The number of non-zero field elements, and the codeword length of BCH(31,21,2).
pub const CODE_LEN: usize = 31;

/// The number of parity bits of BCH(31,21,2).
pub const PARITY_BITS: usize = 10;

/// GF(2⁵) exponent and logarithm tables, plus the degree-10 generator polynomial of
/// BCH(31,21,2) built from the cyclotomic cosets of {1,2,3,4} mod 31.
pub struct Gf32 {
    exp: [u8; CODE_LEN + 1],
    log: [i8; 32],
    gen_poly: [u8; PARITY_BITS + 1],
}

impl Gf32 {
    pub fn new() -> Gf32 {
        let mut exp = [0u8; CODE_LEN + 1];
        let mut log = [-1i8; 32];

        let mut elem: u32 = 1;
        for i in 0..CODE_LEN {
            exp[i] = elem as u8;
            log[elem as usize] = i as i8;
            elem <<= 1;
            if elem & 0x20 != 0 {
                elem ^= PRIM_POLY;
            }
        }
        exp[CODE_LEN] = exp[0];

        let mut field = Gf32 { exp, log, gen_poly: [0; PARITY_BITS + 1] };
        field.build_generator();
        field
    }

    /// α^i for i in 0..=31.
    #[inline(always)]
    pub fn exp(&self, i: usize) -> u8 {
        self.exp[i]
    }

    /// log_α(p) for p in 1..32, or -1 for the (undefined) log of zero.
    #[inline(always)]
    pub fn log(&self, p: u8) -> i8 {
        self.log[p as usize]
    }

    /// Multiply two field elements.
    pub fn mul(&self, a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        let i = (self.log[a as usize] as usize + self.log[b as usize] as usize) % CODE_LEN;
        self.exp[i]
    }

    /// Coefficient j of the generator polynomial, a GF(2⁵) element.
    #[inline(always)]
    pub fn gen_coeff(&self, j: usize) -> u8 {
        self.gen_poly[j]
    }

    /// Build g(x) = Π (x + α^r) over the cyclotomic cosets of {1,2,3,4} mod 31. In a field of
    /// characteristic 2, subtraction equals addition.
    fn build_generator(&mut self) {
        let mut seen = [false; 32];
        let mut roots = [0usize; PARITY_BITS];
        let mut num_roots = 0;

        for r in 1..=4usize {
            let mut val = r;
            while !seen[val] {
                seen[val] = true;
                roots[num_roots] = val;
                num_roots += 1;
                val = (val * 2) % CODE_LEN;
            }
        }
        debug_assert_eq!(num_roots, PARITY_BITS);

        self.gen_poly[0] = 1;
        let mut degree = 0;
        for &root in &roots[..num_roots] {
            let alpha_root = self.exp[root];
            for j in (1..=degree + 1).rev() {
                self.gen_poly[j] = self.gen_poly[j - 1] ^ self.mul(self.gen_poly[j], alpha_root);
            }
            self.gen_poly[0] = self.mul(self.gen_poly[0], alpha_root);
            degree += 1;
        }
    }
}

impl Default for Gf32 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Gf32, CODE_LEN};

    #[test]
    fn verify_field_tables() {
        let gf = Gf32::new();

        // alpha^0 = 1, and the exponent table wraps.
        assert_eq!(gf.exp(0), 1);
        assert_eq!(gf.exp(CODE_LEN), 1);

        // Every non-zero element appears exactly once.
        let mut seen = [false; 32];
        for i in 0..CODE_LEN {
            let e = gf.exp(i);
            assert!(e > 0 && !seen[e as usize]);
            seen[e as usize] = true;
        }

        // log is the inverse of exp.
        for i in 0..CODE_LEN {
            assert_eq!(gf.log(gf.exp(i)) as usize, i);
        }
        assert_eq!(gf.log(0), -1);
    }

    #[test]
    fn verify_generator_roots() {
        let gf = Gf32::new();

        // Every power alpha^1..alpha^4 (and by conjugacy the full coset set) must be a root
        // of the generator polynomial.
        for r in 1..=4usize {
            let mut acc = 0u8;
            for j in 0..=10 {
                let coeff = gf.gen_coeff(j);
                if coeff != 0 {
                    // coeff * (alpha^r)^j
                    let e = gf.exp((r * j) % CODE_LEN);
                    acc ^= gf.mul(coeff, e);
                }
            }
            assert_eq!(acc, 0, "alpha^{} is not a root", r);
        }
    }
}
