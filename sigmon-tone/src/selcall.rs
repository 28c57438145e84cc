// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Selective-call tone decoding.
//!
//! Every variant assigns 16 tones to the hex digits 0..=F. The input is integrated over
//! 10 ms blocks against quadrature oscillators for all 16 tones; a sliding window of four
//! blocks picks the dominant tone, which must carry at least 40% of the total energy with
//! no runner-up above a tenth of it. A digit is emitted on change; a run of empty blocks
//! ends the call.

use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator};
use sigmon_core::dsp::osc::{cos_phase, sin_phase};
use sigmon_core::record::{Record, RecordSink};
use sigmon_core::sample::BlockView;

const SAMPLE_RATE: u32 = 22050;
/// 10 ms integration blocks.
const BLOCKLEN: i32 = (SAMPLE_RATE / 100) as i32;
/// Sliding window length in blocks.
const BLOCKNUM: usize = 4;
/// Empty blocks after the last digit before the call ends.
const TIMEOUT_LIMIT: i32 = 5;

const fn phinc(freq: u32) -> u32 {
    freq * 0x10000 / SAMPLE_RATE
}

/// Tone table of one selective-call variant, as per-sample phase increments.
pub(crate) struct ToneTable {
    pub freqs: [u32; 16],
}

pub(crate) const CCIR: ToneTable = ToneTable {
    freqs: [
        phinc(1981), phinc(1124), phinc(1197), phinc(1275),
        phinc(1358), phinc(1446), phinc(1540), phinc(1640),
        phinc(1747), phinc(1860), phinc(2400), phinc(930),
        phinc(2247), phinc(991), phinc(2110), phinc(1055),
    ],
};

pub(crate) const EEA: ToneTable = ToneTable {
    freqs: [
        phinc(1981), phinc(1124), phinc(1197), phinc(1275),
        phinc(1358), phinc(1446), phinc(1540), phinc(1640),
        phinc(1747), phinc(1860), phinc(1055), phinc(930),
        phinc(2400), phinc(991), phinc(2110), phinc(2247),
    ],
};

pub(crate) const EIA: ToneTable = ToneTable {
    freqs: [
        phinc(600), phinc(741), phinc(882), phinc(1023),
        phinc(1164), phinc(1305), phinc(1446), phinc(1587),
        phinc(1728), phinc(1869), phinc(2151), phinc(2433),
        phinc(2010), phinc(2292), phinc(459), phinc(1091),
    ],
};

pub(crate) const ZVEI1: ToneTable = ToneTable {
    freqs: [
        phinc(2400), phinc(1060), phinc(1160), phinc(1270),
        phinc(1400), phinc(1530), phinc(1670), phinc(1830),
        phinc(2000), phinc(2200), phinc(2800), phinc(810),
        phinc(970), phinc(885), phinc(2600), phinc(680),
    ],
};

pub(crate) const ZVEI3: ToneTable = ToneTable {
    freqs: [
        phinc(2400), phinc(1060), phinc(1160), phinc(1270),
        phinc(1400), phinc(1530), phinc(1670), phinc(1830),
        phinc(2000), phinc(2200), phinc(885), phinc(810),
        phinc(2800), phinc(680), phinc(970), phinc(2600),
    ],
};

pub struct SelcallDemodulator {
    desc: DemodDescriptor,
    freqs: [u32; 16],
    ph: [u32; 16],
    energy: [f32; BLOCKNUM],
    tenergy: [[f32; 32]; BLOCKNUM],
    blkcount: i32,
    lastch: i32,
    timeout: i32,
    digits: String,
}

impl SelcallDemodulator {
    pub(crate) fn new(info: DemodInfo, table: &ToneTable) -> SelcallDemodulator {
        SelcallDemodulator {
            desc: DemodDescriptor { info, sample_rate: SAMPLE_RATE, overlap: 0, wants_ints: false },
            freqs: table.freqs,
            ph: [0; 16],
            energy: [0.0; BLOCKNUM],
            tenergy: [[0.0; 32]; BLOCKNUM],
            blkcount: 0,
            lastch: -1,
            timeout: 0,
            digits: String::new(),
        }
    }

    /// Fold the sliding window and pick the dominant tone, or -1.
    fn process_block(&mut self) -> i32 {
        let mut tote = 0.0f32;
        for e in &self.energy {
            tote += e;
        }
        let mut totte = [0.0f32; 32];
        for block in &self.tenergy {
            for (acc, v) in totte.iter_mut().zip(block.iter()) {
                *acc += v;
            }
        }
        for i in 0..16 {
            totte[i] = totte[i] * totte[i] + totte[i + 16] * totte[i + 16];
        }

        // Slide the window.
        for i in (1..BLOCKNUM).rev() {
            self.energy[i] = self.energy[i - 1];
            self.tenergy[i] = self.tenergy[i - 1];
        }
        self.energy[0] = 0.0;
        self.tenergy[0] = [0.0; 32];

        // Normalise total energy against the correlator gain.
        tote *= BLOCKNUM as f32 * BLOCKLEN as f32 * 0.5;

        let mut idx = -1i32;
        let mut max = 0.0f32;
        for (i, &e) in totte.iter().take(16).enumerate() {
            if e > max {
                max = e;
                idx = i as i32;
            }
        }
        if idx < 0 {
            return -1;
        }
        // Reject when another tone carries more than a tenth of the winner's energy.
        for (i, &e) in totte.iter().take(16).enumerate() {
            if i as i32 != idx && e > max * 0.1 {
                return -1;
            }
        }
        if tote * 0.4 > max {
            return -1;
        }
        idx
    }

    fn end_call(&mut self, sink: &mut dyn RecordSink) {
        if self.digits.is_empty() {
            return;
        }
        let mut record = Record::new(self.desc.info.name);
        record.text = format!("{}: {}", self.desc.info.name, self.digits);
        record.push_field("digits", self.digits.clone());
        sink.submit(record);
        self.digits.clear();
    }
}

impl Demodulator for SelcallDemodulator {
    fn descriptor(&self) -> &DemodDescriptor {
        &self.desc
    }

    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink) {
        for &sample in &block.floats[..block.valid] {
            self.energy[0] += sample * sample;
            for i in 0..16 {
                self.tenergy[0][i] += cos_phase(self.ph[i]) * sample;
                self.tenergy[0][i + 16] += sin_phase(self.ph[i]) * sample;
                self.ph[i] = self.ph[i].wrapping_add(self.freqs[i]);
            }

            self.blkcount -= 1;
            if self.blkcount > 0 {
                continue;
            }
            self.blkcount = BLOCKLEN;

            let ch = self.process_block();
            if ch != self.lastch && ch >= 0 {
                self.digits.push(b"0123456789ABCDEF"[ch as usize] as char);
                self.timeout = 1;
            }
            if ch == -1 && self.timeout != 0 {
                self.timeout += 1;
            }
            if self.timeout > TIMEOUT_LIMIT + 1 {
                self.end_call(sink);
                self.timeout = 0;
            }
            self.lastch = ch;
        }
    }

    fn flush(&mut self, sink: &mut dyn RecordSink) {
        self.end_call(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::{SelcallDemodulator, ZVEI1};
    use sigmon_core::demod::{Demodulator, DemodInfo};
    use sigmon_core::record::VecSink;
    use sigmon_core::sample::BlockView;
    use std::f64::consts::PI;

    fn demod() -> SelcallDemodulator {
        SelcallDemodulator::new(
            DemodInfo { name: "ZVEI1", description: "test" },
            &ZVEI1,
        )
    }

    fn tone(freq: f64, ms: u32) -> Vec<f32> {
        let n = 22050 * ms / 1000;
        (0..n).map(|i| (2.0 * PI * freq * f64::from(i) / 22050.0).sin() as f32 * 0.5).collect()
    }

    #[test]
    fn verify_digit_sequence() {
        // ZVEI1 digits 1 (1060 Hz), 2 (1160 Hz), 5 (1530 Hz), 70 ms each.
        let mut samples = Vec::new();
        samples.extend(tone(1060.0, 70));
        samples.extend(tone(1160.0, 70));
        samples.extend(tone(1530.0, 70));
        // Silence long enough to time the call out.
        samples.extend(std::iter::repeat(0.0f32).take(22050 / 5));

        let mut d = demod();
        let mut sink = VecSink::new();
        let ints: Vec<i16> = samples.iter().map(|&f| (f * 32767.0) as i16).collect();
        let block = BlockView { ints: &ints, floats: &samples, valid: samples.len() };
        d.process(&block, &mut sink);
        d.flush(&mut sink);

        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].text, "ZVEI1: 125");
    }

    #[test]
    fn verify_silence_is_quiet() {
        let samples = vec![0.0f32; 22050];
        let ints = vec![0i16; 22050];
        let mut d = demod();
        let mut sink = VecSink::new();
        let block = BlockView { ints: &ints, floats: &samples, valid: samples.len() };
        d.process(&block, &mut sink);
        d.flush(&mut sink);
        assert!(sink.records.is_empty());
    }
}
