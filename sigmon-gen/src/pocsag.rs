// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! POCSAG transmission synthesis.
//!
//! Frame structure: a 576-bit alternating preamble, then sync + 16-codeword batches (8
//! frames of 2 codewords). The pager address selects its frame by its low 3 bits; the
//! address codeword carries address bits 20..3 plus the 2 function bits, message codewords
//! follow with the message-indicator flag set.

use sigmon_core::fec::PocsagCode;

use crate::{inject_errors, Lcg, SAMPLE_RATE};

const POCSAG_SYNC: u32 = 0x7cd2_15d8;
const POCSAG_IDLE: u32 = 0x7a89_c197;
const PREAMBLE_BITS: usize = 576;

#[derive(Clone, Debug)]
pub struct PocsagParams {
    pub baud: u32,
    pub address: u32,
    pub function: u8,
    pub message: String,
    /// Flip the output polarity.
    pub invert: bool,
    /// Bit errors to inject per codeword (0..=2 are correctable).
    pub errors: u32,
    pub amplitude: i16,
}

impl Default for PocsagParams {
    fn default() -> PocsagParams {
        PocsagParams {
            baud: 512,
            address: 0,
            function: 0,
            message: String::new(),
            invert: false,
            errors: 0,
            amplitude: 16384,
        }
    }
}

/// BCD digits, inverse of the decoder's bit-reversed "084 2.6]195-3U7[" table.
fn char_to_bcd(c: u8) -> u32 {
    match c {
        b'0' => 0,
        b'1' => 8,
        b'2' => 4,
        b'3' => 12,
        b'4' => 2,
        b'5' => 10,
        b'6' => 6,
        b'7' => 14,
        b'8' => 1,
        b'9' => 9,
        b'U' | b'u' => 13,
        b'-' => 11,
        b'.' => 5,
        b'[' => 15,
        b']' => 7,
        _ => 3, // space
    }
}

/// Reverse the low 7 bits of a value.
fn rev7(b: u8) -> u8 {
    ((b << 6) & 64)
        | ((b >> 6) & 1)
        | ((b << 4) & 32)
        | ((b >> 4) & 2)
        | ((b << 2) & 16)
        | ((b >> 2) & 4)
        | (b & 8)
}

fn build_address_codeword(bch: &PocsagCode, address: u32, function: u8) -> u32 {
    let data = ((address >> 3) << 2) | u32::from(function & 3);
    bch.encode(data)
}

fn build_message_codeword(bch: &PocsagCode, data20: u32) -> u32 {
    bch.encode((1 << 20) | (data20 & 0xf_ffff))
}

/// Encode a message as codeword payloads: numeric BCD for function 0, packed 7-bit
/// characters otherwise.
fn encode_message(msg: &[u8], function: u8, bch: &PocsagCode) -> Vec<u32> {
    let mut codewords = Vec::new();

    if function == 0 {
        for chunk in msg.chunks(5) {
            let mut data = 0u32;
            for i in 0..5 {
                let digit = chunk.get(i).map_or(3, |&c| char_to_bcd(c));
                data = (data << 4) | digit;
            }
            codewords.push(build_message_codeword(bch, data));
        }
    } else {
        // Pack bit-reversed 7-bit characters MSB first, then cut 20-bit payloads.
        let mut bits: Vec<u8> = Vec::with_capacity(msg.len() * 7);
        for &c in msg {
            let r = rev7(c & 0x7f);
            for b in 0..7 {
                bits.push((r >> (6 - b)) & 1);
            }
        }
        // Round up to whole nibbles.
        while bits.len() % 4 != 0 {
            bits.push(0);
        }
        for chunk in bits.chunks(20) {
            let mut data = 0u32;
            for i in 0..20 {
                data = (data << 1) | u32::from(chunk.get(i).copied().unwrap_or(0));
            }
            codewords.push(build_message_codeword(bch, data));
        }
    }

    codewords
}

/// Synthesize a complete POCSAG transmission as signed 16-bit baseband samples at 22,050 Hz.
pub fn generate_pocsag(params: &PocsagParams) -> Vec<i16> {
    let bch = PocsagCode::new();
    let mut lcg = Lcg::new(12345);

    let frame_position = (params.address & 7) as usize;
    let msg_codewords = encode_message(params.message.as_bytes(), params.function, &bch);

    // Address + message + one idle codeword so the decoder sees end-of-message.
    let slots_needed = 1 + msg_codewords.len() + 1;
    let slots_in_first_batch = 16 - frame_position * 2;
    let batch_count =
        if slots_needed <= slots_in_first_batch { 1 } else { 1 + (slots_needed - slots_in_first_batch + 15) / 16 };

    let mut bits: Vec<u8> = Vec::with_capacity(PREAMBLE_BITS + batch_count * (32 + 16 * 32));

    let push_word = |bits: &mut Vec<u8>, word: u32| {
        for i in (0..32).rev() {
            bits.push(((word >> i) & 1) as u8);
        }
    };

    let mut maybe_corrupt = |word: u32| {
        if params.errors > 0 {
            // Bits 1..=31; the overall parity bit is left alone.
            let mut positions = std::iter::from_fn(|| Some(lcg.next() % 31 + 1));
            inject_errors(word, params.errors, &mut positions)
        } else {
            word
        }
    };

    for i in 0..PREAMBLE_BITS {
        bits.push(u8::from(i & 1 == 0));
    }

    let mut msg_idx = 0;
    let mut address_sent = false;
    for _ in 0..batch_count {
        push_word(&mut bits, maybe_corrupt(POCSAG_SYNC));
        for frame in 0..8 {
            for cw in 0..2 {
                let codeword = if !address_sent && frame == frame_position && cw == 0 {
                    address_sent = true;
                    build_address_codeword(&bch, params.address, params.function)
                } else if address_sent && msg_idx < msg_codewords.len() {
                    msg_idx += 1;
                    msg_codewords[msg_idx - 1]
                } else {
                    POCSAG_IDLE
                };
                push_word(&mut bits, maybe_corrupt(codeword));
            }
        }
    }

    // NRZ baseband: a 1 bit is negative-going unless the polarity is inverted.
    let samples_per_bit = f64::from(SAMPLE_RATE) / f64::from(params.baud);
    let mut samples = Vec::with_capacity((bits.len() as f64 * samples_per_bit) as usize + 1);
    let mut bitph = 0.0f64;
    let mut bit_idx = 0usize;
    while bit_idx < bits.len() {
        let one = bits[bit_idx] != 0;
        let level = if one != params.invert { -params.amplitude } else { params.amplitude };
        samples.push(level);
        bitph += 1.0;
        if bitph >= samples_per_bit {
            bitph -= samples_per_bit;
            bit_idx += 1;
        }
    }

    samples
}
