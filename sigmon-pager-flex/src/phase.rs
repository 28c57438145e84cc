// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLEX data-section phase buffers and deinterleaving.
//!
//! The data section carries up to four interleaved phases. Phase A (and B at four-level)
//! arrives on even symbols, C (and D) on odd symbols at 3200 baud. Within a phase, bits are
//! spread over blocks of eight 32-bit codewords: the deinterleave index walks words 0..=7
//! thirty-two times before moving to words 8..=15, so consecutive transmitted bits land in
//! consecutive words.

use bitflags::bitflags;

/// Codewords per phase buffer.
pub const PHASE_WORDS: usize = 88;

/// Idle codewords tolerated in the data section before a phase is considered finished.
pub const IDLE_THRESHOLD: i32 = 0;

bitflags! {
    /// The set of phases populated by a transmission mode.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PhaseSet: u8 {
        const A = 1;
        const B = 2;
        const C = 4;
        const D = 8;
    }
}

/// The phases active for a given baud rate and level count.
pub fn active_phases(baud: u32, levels: u32) -> PhaseSet {
    match (baud, levels) {
        (1600, 2) => PhaseSet::A,
        (1600, _) => PhaseSet::A | PhaseSet::B,
        (_, 2) => PhaseSet::A | PhaseSet::C,
        _ => PhaseSet::A | PhaseSet::B | PhaseSet::C | PhaseSet::D,
    }
}

/// One phase's worth of interleaved codewords.
#[derive(Clone)]
pub struct PhaseBuffer {
    pub buf: [u32; PHASE_WORDS],
    pub idle_count: i32,
}

impl PhaseBuffer {
    pub fn new() -> PhaseBuffer {
        PhaseBuffer { buf: [0; PHASE_WORDS], idle_count: 0 }
    }

    pub fn clear(&mut self) {
        self.buf = [0; PHASE_WORDS];
        self.idle_count = 0;
    }

    /// Shift one bit into the word at the deinterleave index. Bits enter at the MSB, so the
    /// first bit of a word ends up in bit 0 after all 32 arrive.
    #[inline]
    fn shift_in(&mut self, idx: usize, bit: bool) {
        self.buf[idx] = (self.buf[idx] >> 1) | if bit { 0x8000_0000 } else { 0 };
    }

    /// Count a finished word as idle if it is all-zero or all-one.
    #[inline]
    fn tally_idle(&mut self, idx: usize) {
        if self.buf[idx] == 0 || self.buf[idx] == 0xffff_ffff {
            self.idle_count += 1;
        }
    }
}

impl Default for PhaseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the data section of one frame across all four phases.
pub struct DataCollector {
    pub phase_a: PhaseBuffer,
    pub phase_b: PhaseBuffer,
    pub phase_c: PhaseBuffer,
    pub phase_d: PhaseBuffer,
    phase_toggle: bool,
    data_bit_counter: u32,
}

impl DataCollector {
    pub fn new() -> DataCollector {
        DataCollector {
            phase_a: PhaseBuffer::new(),
            phase_b: PhaseBuffer::new(),
            phase_c: PhaseBuffer::new(),
            phase_d: PhaseBuffer::new(),
            phase_toggle: false,
            data_bit_counter: 0,
        }
    }

    pub fn clear(&mut self) {
        self.phase_a.clear();
        self.phase_b.clear();
        self.phase_c.clear();
        self.phase_d.clear();
        self.phase_toggle = false;
        self.data_bit_counter = 0;
    }

    /// The deinterleave index for a data-bit counter value: bits 0..=2 select the word
    /// within the block, the counter's upper bits select the block after 256 ticks.
    #[inline]
    pub fn deinterleave_index(counter: u32) -> usize {
        (((counter >> 5) & 0xfff8) | (counter & 0x7)) as usize
    }

    /// Route one symbol's bits into the phase buffers. `baud`/`levels` select the active
    /// phases; at 3200 baud the symbol stream alternates between A/B and C/D. Returns true
    /// once every active phase has gone idle past the threshold.
    pub fn read_symbol(&mut self, sym: u8, baud: u32, levels: u32) -> bool {
        let bit_a = sym > 1;
        let bit_b = levels == 4 && (sym == 1 || sym == 2);

        if baud == 1600 {
            self.phase_toggle = false;
        }

        let idx = Self::deinterleave_index(self.data_bit_counter);
        let word_done = self.data_bit_counter & 0xff == 0xff;

        if !self.phase_toggle {
            self.phase_a.shift_in(idx, bit_a);
            self.phase_b.shift_in(idx, bit_b);
            self.phase_toggle = true;
            if word_done {
                self.phase_a.tally_idle(idx);
                self.phase_b.tally_idle(idx);
            }
        } else {
            self.phase_c.shift_in(idx, bit_a);
            self.phase_d.shift_in(idx, bit_b);
            self.phase_toggle = false;
            if word_done {
                self.phase_c.tally_idle(idx);
                self.phase_d.tally_idle(idx);
            }
        }

        if baud == 1600 || !self.phase_toggle {
            self.data_bit_counter += 1;
        }

        let idle = |p: &PhaseBuffer| p.idle_count > IDLE_THRESHOLD;
        let set = active_phases(baud, levels);
        let mut all_idle = true;
        if set.contains(PhaseSet::A) {
            all_idle &= idle(&self.phase_a);
        }
        if set.contains(PhaseSet::B) {
            all_idle &= idle(&self.phase_b);
        }
        if set.contains(PhaseSet::C) {
            all_idle &= idle(&self.phase_c);
        }
        if set.contains(PhaseSet::D) {
            all_idle &= idle(&self.phase_d);
        }
        all_idle
    }
}

impl Default for DataCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{DataCollector, PHASE_WORDS};

    #[test]
    fn verify_deinterleave_identity() {
        // Shifting the same codeword into every position via the interleave rule and
        // reading the buffer back must yield the codeword in every slot.
        let codeword: u32 = 0x1a2b_3c4d;
        let mut collector = DataCollector::new();

        // 88 words = 11 blocks x 8 words x 32 bits.
        for counter in 0..(PHASE_WORDS as u32 * 32) {
            let idx = DataCollector::deinterleave_index(counter);
            assert!(idx < PHASE_WORDS);
            // Transmit bit (counter / 8) % 32 of the target word, LSB first.
            let bit = (codeword >> ((counter >> 3) & 0x1f)) & 1 != 0;
            let sym = if bit { 3 } else { 0 };
            collector.read_symbol(sym, 1600, 2);
        }

        for (i, &word) in collector.phase_a.buf.iter().enumerate() {
            assert_eq!(word, codeword, "slot {}", i);
        }
    }

    #[test]
    fn verify_index_block_structure() {
        // The first 256 counter values must cycle through words 0..=7; the next 256 through
        // words 8..=15.
        for counter in 0..256u32 {
            assert_eq!(DataCollector::deinterleave_index(counter), (counter & 7) as usize);
        }
        for counter in 256..512u32 {
            assert_eq!(DataCollector::deinterleave_index(counter), 8 + (counter & 7) as usize);
        }
    }

    #[test]
    fn verify_3200_phase_routing() {
        // At 3200 baud even symbols go to A, odd symbols to C; the counter advances every
        // second symbol.
        let mut collector = DataCollector::new();
        for _ in 0..32 {
            collector.read_symbol(3, 3200, 2); // A bit = 1
            collector.read_symbol(0, 3200, 2); // C bit = 0
        }
        assert_eq!(collector.phase_a.buf[0], 0xffff_ffff);
        assert_eq!(collector.phase_c.buf[0], 0);
    }
}
