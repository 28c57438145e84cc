// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The layer-1 front-end shared by the telemetry decoders: matched-filter slicer plus the
//! transition-locked symbol clock, with optional subsampling.

use sigmon_core::dsp::correlator::FskCorrelator;
use sigmon_core::dsp::symclock::{SubSampler, SymbolClock};
use sigmon_core::sample::BlockView;

pub(crate) struct FskFrontEnd {
    corr: FskCorrelator,
    sub: SubSampler,
    clock: SymbolClock,
    dcd_shreg: u32,
}

impl FskFrontEnd {
    pub(crate) fn new(
        sample_rate: u32,
        one_hz: f64,
        zero_hz: f64,
        baud: u32,
        subsamp: u32,
        corrlen: usize,
    ) -> FskFrontEnd {
        FskFrontEnd {
            corr: FskCorrelator::new(sample_rate, one_hz, zero_hz, corrlen),
            sub: SubSampler::new(subsamp),
            clock: SymbolClock::new(baud, subsamp, sample_rate),
            dcd_shreg: 0,
        }
    }

    /// Run the front end over a block, invoking `on_bit` for each recovered bit.
    pub(crate) fn run(&mut self, block: &BlockView<'_>, mut on_bit: impl FnMut(u32)) {
        for i in 0..block.valid {
            if !self.sub.tick() {
                continue;
            }
            let window = &block.floats[i..i + self.corr.corrlen()];
            self.dcd_shreg = (self.dcd_shreg << 1) | u32::from(self.corr.slice(window));
            let transition = (self.dcd_shreg ^ (self.dcd_shreg >> 1)) & 1 != 0;
            if self.clock.advance(transition) {
                on_bit(self.dcd_shreg & 1);
            }
        }
    }
}
