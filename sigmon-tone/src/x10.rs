// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! X10 RF remote decoder.
//!
//! An X10 transmission is pulse-period keyed on the raw envelope: a 9 ms high preamble and
//! a 4.5 ms low gap, then 32 data bits where the period between consecutive rising edges
//! selects the bit value. The four payload bytes carry the housecode and key/unit bits.

use log::debug;

use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator};
use sigmon_core::record::{Record, RecordSink};
use sigmon_core::sample::BlockView;

const SAMPLE_RATE: u32 = 22050;

/// Rising-edge detection level on the raw samples.
const THRESHOLD_HIGH: i16 = 13000;
/// Falling-edge detection level; the band between the two is hysteresis.
const THRESHOLD_LOW: i16 = 9000;
/// Rise-to-rise periods longer than this many samples are a 1 bit.
const PULSE_WIDTH: u64 = 40;
/// A low period longer than this (about 10 ms) ends the data stage.
const TIMEOUT: u64 = 220;

/// Housecode letters indexed by the low nibble of the first payload byte.
const HOUSECODE: &[u8; 16] = b"MECKOGAINFDLPHBJ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    /// Waiting for the 9 ms high preamble to start.
    Idle,
    /// Inside the high preamble, waiting for the drop.
    PreambleHigh,
    /// Inside the 4.5 ms low gap, waiting for the first data rise.
    PreambleLow,
    Data,
}

pub struct X10Demodulator {
    desc: DemodDescriptor,
    stage: Stage,
    /// Whether the last sample was above the detection band.
    high: bool,
    /// Absolute sample position, running across blocks.
    position: u64,
    last_rise: u64,
    bytes: [u8; 4],
    bit_count: usize,
}

impl X10Demodulator {
    pub fn new(info: DemodInfo) -> X10Demodulator {
        X10Demodulator {
            desc: DemodDescriptor {
                info,
                sample_rate: SAMPLE_RATE,
                overlap: 0,
                wants_ints: true,
            },
            stage: Stage::Idle,
            high: false,
            position: 0,
            last_rise: 0,
            bytes: [0; 4],
            bit_count: 0,
        }
    }

    fn reset_frame(&mut self) {
        self.bytes = [0; 4];
        self.bit_count = 0;
    }

    /// Emit the completed 32-bit frame as a record.
    fn report(&mut self, sink: &mut dyn RecordSink) {
        let b = self.bytes;
        debug!(
            "{}: bytes {:02X} {:02X} {:02X} {:02X}",
            self.desc.info.name, b[0], b[1], b[2], b[3]
        );

        let housecode = HOUSECODE[(b[0] & 0x0f) as usize] as char;
        let mut unit = 0u8;
        if b[2] & 0x08 != 0 {
            unit |= 0x01;
        }
        if b[2] & 0x10 != 0 {
            unit |= 0x02;
        }
        if b[2] & 0x02 != 0 {
            unit |= 0x04;
        }
        if b[0] & 0x20 != 0 {
            unit |= 0x08;
        }
        unit += 1;

        let mut record = Record::new(self.desc.info.name);
        record.text = format!(
            "{}: housecode = {} {} ({:02X} {:02X} {:02X} {:02X})",
            self.desc.info.name, housecode, unit, b[0], b[1], b[2], b[3]
        );
        record.push_field("housecode", housecode.to_string());
        record.push_field("unit", unit.to_string());
        record.push_field("raw", format!("{:02X} {:02X} {:02X} {:02X}", b[0], b[1], b[2], b[3]));
        sink.submit(record);

        self.reset_frame();
    }

    fn step(&mut self, sample: i16, sink: &mut dyn RecordSink) {
        match self.stage {
            Stage::Idle => {
                if sample >= THRESHOLD_HIGH {
                    self.last_rise = self.position;
                    self.high = true;
                    self.stage = Stage::PreambleHigh;
                }
            }
            Stage::PreambleHigh => {
                if sample <= THRESHOLD_LOW {
                    self.high = false;
                    // The high preamble must run close to 9 ms.
                    let j = self.position - self.last_rise;
                    if (176..=210).contains(&j) {
                        self.stage = Stage::PreambleLow;
                        self.last_rise = self.position;
                    } else {
                        debug!("{}: preamble high of {} samples rejected", self.desc.info.name, j);
                        self.stage = Stage::Idle;
                    }
                }
            }
            Stage::PreambleLow => {
                if sample >= THRESHOLD_HIGH {
                    self.high = true;
                    // The low gap must run close to 4.5 ms.
                    let j = self.position - self.last_rise;
                    if (90..=104).contains(&j) {
                        self.stage = Stage::Data;
                        self.last_rise = self.position;
                        self.reset_frame();
                    } else {
                        debug!("{}: preamble gap of {} samples rejected", self.desc.info.name, j);
                        self.stage = Stage::Idle;
                    }
                }
            }
            Stage::Data => {
                if self.high {
                    if sample < THRESHOLD_LOW {
                        self.high = false;
                    }
                    return;
                }
                let j = self.position - self.last_rise;
                if sample >= THRESHOLD_HIGH {
                    self.high = true;
                    self.last_rise = self.position;
                    // The rise-to-rise period carries the bit, low byte bits first.
                    if j > PULSE_WIDTH {
                        self.bytes[self.bit_count / 8] |= 1 << (self.bit_count % 8);
                    }
                    self.bit_count += 1;
                    if self.bit_count == 32 {
                        self.report(sink);
                        self.stage = Stage::Idle;
                    }
                } else if j > TIMEOUT {
                    debug!(
                        "{}: data stage timed out after {} bits",
                        self.desc.info.name, self.bit_count
                    );
                    self.reset_frame();
                    self.stage = Stage::Idle;
                }
            }
        }
    }
}

impl Demodulator for X10Demodulator {
    fn descriptor(&self) -> &DemodDescriptor {
        &self.desc
    }

    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink) {
        for i in 0..block.valid {
            self.step(block.ints[i], sink);
            self.position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::X10Demodulator;
    use sigmon_core::demod::{DemodInfo, Demodulator};
    use sigmon_core::record::VecSink;
    use sigmon_core::sample::BlockView;

    /// Pulse-period encode a 32-bit frame: 9 ms high, 4.5 ms low, then one rise per bit
    /// with a short period for 0 and a long one for 1.
    fn keyed_frame(bytes: [u8; 4]) -> Vec<i16> {
        let mut samples: Vec<i16> = vec![0; 100];

        let high = |samples: &mut Vec<i16>, n: usize| {
            samples.extend(std::iter::repeat(16000i16).take(n));
        };
        let low = |samples: &mut Vec<i16>, n: usize| {
            samples.extend(std::iter::repeat(0i16).take(n));
        };

        high(&mut samples, 190);
        low(&mut samples, 97);

        for bit_index in 0..32 {
            // The rise at the head of each period closes out the previous bit.
            high(&mut samples, 12);
            let one = bytes[bit_index / 8] >> (bit_index % 8) & 1 != 0;
            low(&mut samples, if one { 38 } else { 13 });
        }
        // Final rise to clock in bit 31, then silence.
        high(&mut samples, 12);
        low(&mut samples, 400);

        samples
    }

    fn run(samples: &[i16]) -> VecSink {
        let mut demod =
            X10Demodulator::new(DemodInfo { name: "X10", description: "test" });
        let mut sink = VecSink::new();
        let floats: Vec<f32> = samples.iter().map(|&s| f32::from(s) / 32768.0).collect();
        let block = BlockView { ints: samples, floats: &floats, valid: samples.len() };
        demod.process(&block, &mut sink);
        sink
    }

    #[test]
    fn verify_housecode_and_unit() {
        // Housecode nibble 6 is 'A'; all unit bits clear decode as unit 1.
        let sink = run(&keyed_frame([0x06, 0xf9, 0x00, 0xff]));
        assert_eq!(sink.records.len(), 1);
        assert!(
            sink.records[0].text.starts_with("X10: housecode = A 1"),
            "{}",
            sink.records[0].text
        );
    }

    #[test]
    fn verify_unit_bits() {
        // b[2] bit 3 and b[0] bit 5 set: unit = 0b1001 + 1 = 10.
        let sink = run(&keyed_frame([0x26, 0xd9, 0x08, 0xf7]));
        assert_eq!(sink.records.len(), 1);
        assert!(
            sink.records[0].text.starts_with("X10: housecode = A 10"),
            "{}",
            sink.records[0].text
        );
    }

    #[test]
    fn verify_bad_preamble_rejected() {
        // A 5 ms preamble is outside the accepted 8-9.5 ms window.
        let mut samples: Vec<i16> = vec![0; 100];
        samples.extend(std::iter::repeat(16000i16).take(110));
        samples.extend(std::iter::repeat(0i16).take(500));
        let sink = run(&samples);
        assert!(sink.records.is_empty());
    }
}
