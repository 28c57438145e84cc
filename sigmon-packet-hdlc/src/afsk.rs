// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AFSK front-ends feeding the HDLC framer.
//!
//! Each variant correlates the input against its mark/space tone pair, slices the
//! statistic, runs the transition-locked symbol clock, NRZ-I decodes the line, and hands
//! the bits to HDLC. EAS shares the exact same shape at 520.83 baud.

use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator};
use sigmon_core::dsp::correlator::FskCorrelator;
use sigmon_core::dsp::symclock::{NrzI, SubSampler, SymbolClock};
use sigmon_core::record::{Record, RecordSink};
use sigmon_core::sample::BlockView;

use crate::ax25::render_ax25;
use crate::hdlc::HdlcFramer;

const SAMPLE_RATE: u32 = 22050;

/// Tone and rate parameters of one AFSK variant.
pub(crate) struct AfskParams {
    pub mark_hz: f64,
    pub space_hz: f64,
    pub baud: f64,
    pub subsamp: u32,
    /// Correlation window in samples.
    pub corrlen: usize,
}

/// The classic 1200 baud Bell 202 pair used by APRS.
pub(crate) const AFSK1200: AfskParams = AfskParams {
    mark_hz: 1200.0,
    space_hz: 2200.0,
    baud: 1200.0,
    subsamp: 1,
    corrlen: (SAMPLE_RATE / 1200) as usize,
};

/// 2400 baud with a TCM3105 at 8 MHz: mark 3970 Hz, space 2165 Hz. The high rate gets a
/// double-length window.
pub(crate) const AFSK2400: AfskParams = AfskParams {
    mark_hz: 3970.0,
    space_hz: 2165.0,
    baud: 2400.0,
    subsamp: 1,
    corrlen: 2 * (SAMPLE_RATE / 2400) as usize,
};

/// EAS/SAME: 520.83 bits per second, logic one 1083.3 Hz over the 1562.5 Hz zero.
pub(crate) const EAS: AfskParams = AfskParams {
    mark_hz: 1083.3,
    space_hz: 1562.5,
    baud: 520.83,
    subsamp: 2,
    corrlen: (SAMPLE_RATE as f64 / 520.83) as usize,
};

pub struct AfskDemodulator {
    desc: DemodDescriptor,
    corr: FskCorrelator,
    sub: SubSampler,
    clock: SymbolClock,
    nrzi: NrzI,
    dcd_shreg: u32,
    framer: HdlcFramer,
    aprs: bool,
}

impl AfskDemodulator {
    pub(crate) fn new(info: DemodInfo, params: &AfskParams, aprs: bool) -> AfskDemodulator {
        AfskDemodulator {
            desc: DemodDescriptor {
                info,
                sample_rate: SAMPLE_RATE,
                overlap: params.corrlen,
                wants_ints: false,
            },
            corr: FskCorrelator::new(SAMPLE_RATE, params.mark_hz, params.space_hz, params.corrlen),
            sub: SubSampler::new(params.subsamp),
            clock: SymbolClock::new_fractional(params.baud, params.subsamp, SAMPLE_RATE),
            nrzi: NrzI::new(),
            dcd_shreg: 0,
            framer: HdlcFramer::new(),
            aprs,
        }
    }
}

impl Demodulator for AfskDemodulator {
    fn descriptor(&self) -> &DemodDescriptor {
        &self.desc
    }

    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink) {
        for i in 0..block.valid {
            if !self.sub.tick() {
                continue;
            }
            let window = &block.floats[i..i + self.corr.corrlen()];
            self.dcd_shreg = (self.dcd_shreg << 1) | u32::from(self.corr.slice(window));
            let transition = (self.dcd_shreg ^ (self.dcd_shreg >> 1)) & 1 != 0;
            if self.clock.advance(transition) {
                let bit = self.nrzi.decode(self.dcd_shreg & 1);
                if let Some(frame) = self.framer.rx_bit(bit) {
                    if let Some(text) = render_ax25(self.desc.info.name, frame, self.aprs) {
                        let mut record = Record::new(self.desc.info.name);
                        record.text = text;
                        sink.submit(record);
                    }
                }
            }
        }
    }
}
