// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLEX transmission synthesis, 1600 baud 2-FSK single phase.
//!
//! Frame structure: dotting, SYNC1 (64 bits), 16 dotting bits, FIW (32 bits LSB first),
//! SYNC2 (25 ms of idle bits), then 1760 ms of DATA: 88 codewords in 11 interleave blocks of
//! 8, transmitted bit 0 of all eight words first.

use sigmon_core::fec::Bch3121;

use crate::{inject_errors, Lcg, SAMPLE_RATE};

const SYNC_MARKER: u64 = 0xa6c6_aaaa;
const SYNC_1600_2FSK: u16 = 0x870c;
const BAUD: u32 = 1600;
const PHASE_WORDS: usize = 88;
const PAGETYPE_ALPHANUMERIC: u32 = 5;

#[derive(Clone, Debug)]
pub struct FlexParams {
    pub cycle: u32,
    pub frame: u32,
    pub capcode: u32,
    pub message: String,
    /// Bit errors to inject into the FIW and leading data codewords (0..=2 correctable).
    pub errors: u32,
    pub amplitude: i16,
}

impl Default for FlexParams {
    fn default() -> FlexParams {
        FlexParams { cycle: 0, frame: 0, capcode: 0, message: String::new(), errors: 0, amplitude: 16384 }
    }
}

/// SYNC1: mode code, marker, complement of the mode code.
fn build_sync1() -> u64 {
    let code = u64::from(SYNC_1600_2FSK);
    (code << 48) | (SYNC_MARKER << 16) | (code ^ 0xffff)
}

/// FIW with the checksum nibble chosen so the nibble sum lands on 0xF.
fn build_fiw(bch: &Bch3121, cycle: u32, frame: u32) -> u32 {
    let mut fiw = 0u32;
    fiw |= (cycle & 0xf) << 4;
    fiw |= (frame & 0x7f) << 8;

    let mut sum = 0u32;
    sum += (fiw >> 4) & 0xf;
    sum += (fiw >> 8) & 0xf;
    sum += (fiw >> 12) & 0xf;
    sum += (fiw >> 16) & 0xf;
    sum += (fiw >> 20) & 0x1;
    fiw |= (0xf_u32.wrapping_sub(sum)) & 0xf;

    bch.encode(fiw)
}

fn build_biw(bch: &Bch3121, voffset: u32, aoffset: u32) -> u32 {
    bch.encode(((aoffset & 0x3) << 8) | ((voffset & 0x3f) << 10))
}

fn build_address(bch: &Bch3121, capcode: u32) -> u32 {
    bch.encode((capcode + 0x8000) & 0x1f_ffff)
}

fn build_vector(bch: &Bch3121, page_type: u32, msg_start: u32, msg_len: u32) -> u32 {
    bch.encode(((page_type & 0x7) << 4) | ((msg_start & 0x7f) << 7) | ((msg_len & 0x7f) << 14))
}

/// Pack 7-bit ASCII into 21-bit message words, three characters per word. For a complete
/// (frag = 3) message the decoder skips the first character slot of the first word, so the
/// packing starts one character in.
fn encode_message(msg: &[u8], skip_first_char: bool) -> Vec<u32> {
    let mut words = Vec::new();
    let mut current = 0u32;
    let mut bit_pos = if skip_first_char { 7 } else { 0 };

    for &c in msg {
        let ch = u32::from(c & 0x7f);
        current |= ch << bit_pos;
        bit_pos += 7;
        if bit_pos >= 21 {
            words.push(current & 0x1f_ffff);
            bit_pos -= 21;
            current = ch >> (7 - bit_pos);
        }
    }
    if bit_pos > 0 {
        words.push(current & 0x1f_ffff);
    }

    words
}

/// Synthesize a complete FLEX frame as signed 16-bit baseband samples at 22,050 Hz.
pub fn generate_flex(params: &FlexParams) -> Vec<i16> {
    let bch = Bch3121::new();
    let mut lcg = Lcg::new(12345);

    // Idle codewords with alternating payloads so timing recovery keeps seeing transitions.
    let mut codewords = [0u32; PHASE_WORDS];
    for (i, cw) in codewords.iter_mut().enumerate() {
        *cw = if i % 2 == 0 { bch.encode(0x0a_aaaa) } else { bch.encode(0x15_5555) };
    }

    let msg_words = encode_message(params.message.as_bytes(), true);

    // Word 0 BIW, word 1 address, word 2 vector, word 3 the message header (frag/cont),
    // content from word 4 on.
    let msg_start = 3u32;
    codewords[0] = build_biw(&bch, 2, 0);
    codewords[1] = build_address(&bch, params.capcode);
    codewords[2] =
        build_vector(&bch, PAGETYPE_ALPHANUMERIC, msg_start, msg_words.len() as u32 + 1);
    codewords[3] = bch.encode(3 << 11); // frag = 3 (complete), cont = 0

    for (i, &w) in msg_words.iter().enumerate() {
        let idx = msg_start as usize + 1 + i;
        if idx < PHASE_WORDS {
            codewords[idx] = bch.encode(w);
        }
    }

    if params.errors > 0 {
        for cw in codewords.iter_mut().take(10) {
            let mut positions = std::iter::from_fn(|| Some(lcg.next() % 31));
            *cw = inject_errors(*cw, params.errors, &mut positions);
        }
    }

    let mut bits: Vec<u8> = Vec::with_capacity(4096);

    // Dotting. The SYNC1 search counts a *negative* symbol as a 1 bit, so sync-phase bits
    // are emitted inverted.
    for i in 0..960 {
        bits.push(u8::from(i & 1 == 1));
    }

    let sync1 = build_sync1();
    for i in (0..64).rev() {
        bits.push(u8::from((sync1 >> i) & 1 == 0));
    }

    // 16 dotting bits before the FIW.
    for i in 0..16 {
        bits.push(u8::from(i & 1 == 1));
    }

    // FIW, LSB first, positive polarity.
    let mut fiw = build_fiw(&bch, params.cycle, params.frame);
    if params.errors > 0 && params.errors <= 2 {
        let mut positions = std::iter::from_fn(|| Some(lcg.next() % 31));
        fiw = inject_errors(fiw, params.errors, &mut positions);
    }
    for i in 0..32 {
        bits.push(((fiw >> i) & 1) as u8);
    }

    // SYNC2: 25 ms of idle bits at 1600 baud.
    for i in 0..40 {
        bits.push(u8::from(i & 1 == 1));
    }

    // DATA: block interleave, bit b of all eight words of a block before bit b+1.
    for block in 0..11 {
        for bit in 0..32 {
            for cw_in_block in 0..8 {
                let cw = codewords[block * 8 + cw_in_block];
                bits.push(((cw >> bit) & 1) as u8);
            }
        }
    }

    // Trailing idle so the decoder finishes the frame promptly.
    for i in 0..64 {
        bits.push(u8::from(i & 1 == 1));
    }

    // 2-FSK baseband: bit 1 is positive.
    let inc = 0x10000u32 * BAUD / SAMPLE_RATE;
    let mut samples = Vec::with_capacity(bits.len() * (SAMPLE_RATE / BAUD + 1) as usize);
    let mut bitph = 0u32;
    let mut bit_idx = 0usize;
    while bit_idx < bits.len() {
        samples.push(if bits[bit_idx] != 0 { params.amplitude } else { -params.amplitude });
        bitph += inc;
        if bitph >= 0x10000 {
            bitph &= 0xffff;
            bit_idx += 1;
        }
    }

    samples
}
