// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Morse/CW decoder.
//!
//! An integer IIR low-pass follows the signal envelope; the on/off decision threshold
//! rides at two thirds of a slowly decaying peak, floored at the squelch level. A holdoff
//! after each transition rejects ringing. Key-down and gap durations are re-centred
//! adaptively from the observed transitions. Dits shift 0b01 and dahs 0b10 into the
//! character sequence, MSB first, which a binary search maps to text.

use log::debug;

use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator, MorseOptions};
use sigmon_core::record::{Record, RecordSink};
use sigmon_core::sample::BlockView;

const SAMPLE_RATE: i32 = 22050;

const SMOOTHING_MAGNITUDE: i32 = 9;
const SQUELCH: i64 = 500;
const HOLDOFF_MS: i32 = 10;

const DIT: u64 = 0x1; // 0b01
const DAH: u64 = 0x2; // 0b10

/// Dit/dah sequences and their characters, sorted by sequence for binary search.
#[rustfmt::skip]
const MORSE_CODES: [(u64, &str); 69] = [
    (0x0001, "E"),      (0x0002, "T"),      (0x0005, "I"),      (0x0006, "A"),
    (0x0009, "N"),      (0x000a, "M"),      (0x0015, "S"),      (0x0016, "U"),
    (0x0019, "R"),      (0x001a, "W"),      (0x0025, "D"),      (0x0026, "K"),
    (0x0029, "G"),      (0x002a, "O"),      (0x0055, "H"),      (0x0056, "V"),
    (0x0059, "F"),      (0x005a, "Ü"),      (0x0065, "L"),      (0x0066, "Ä"),
    (0x0069, "P"),      (0x006a, "J"),      (0x0095, "B"),      (0x0096, "X"),
    (0x0099, "C"),      (0x009a, "Y"),      (0x00a5, "Z"),      (0x00a6, "Q"),
    (0x00a9, "Ö"),      (0x00aa, "CH"),     (0x0155, "5"),      (0x0156, "4"),
    (0x0159, "<SN>"),   (0x015a, "3"),      (0x0166, "/"),      (0x016a, "2"),
    (0x0195, "&"),      (0x0199, "+"),      (0x01aa, "1"),      (0x0255, "6"),
    (0x0256, "="),      (0x0259, "/"),      (0x0266, "<CT>"),   (0x0269, "("),
    (0x0295, "7"),      (0x02a5, "8"),      (0x02a9, "9"),      (0x02aa, "0"),
    (0x0566, "<SK>"),   (0x05a5, "?"),      (0x05a6, "_"),      (0x0659, "\""),
    (0x0666, "."),      (0x0699, "@"),      (0x06a9, "'"),      (0x0956, "-"),
    (0x096a, "<DO>"),   (0x0999, ";"),      (0x099a, "!"),      (0x09a6, ")"),
    (0x0a5a, ","),      (0x0a95, ":"),      (0x1596, "$"),      (0x2566, "<BK>"),
    (0x5555, "<ERR_8>"),(0x9965, "<CL>"),   (0x15a95, "<SOS>"), (0x55555, "<ERR_10>"),
    (0x155555, "<ERR_11>"),
];

/// Look a sequence up: a table hit, an all-dit error run, or ASCII art of the elements.
fn decode_sequence(sequence: u64) -> (String, bool) {
    if let Ok(at) = MORSE_CODES.binary_search_by_key(&sequence, |&(seq, _)| seq) {
        return (MORSE_CODES[at].1.to_string(), true);
    }

    // A long run of dits is the on-air error sign.
    let dits = (64 - sequence.leading_zeros() + 1) / 2;
    if dits >= 6 && sequence == 0x5555_5555_5555_5555 >> (64 - 2 * dits) {
        return (format!("<ERR_{}>", dits), true);
    }

    let mut art = String::from("<");
    let mut shift = 64 - 2;
    let mut started = false;
    loop {
        let sym = (sequence >> shift) & 0x3;
        if sym != 0 {
            started = true;
        }
        if started {
            art.push(if sym == DIT { '.' } else { '_' });
        }
        if shift == 0 {
            break;
        }
        shift -= 2;
    }
    art.push('>');
    (art, false)
}

/// Integer IIR low-pass, minimising rounding error.
#[inline(always)]
fn low_pass(last: i64, sample: i64, strength: i32) -> i64 {
    ((last << strength) + sample - last) >> strength
}

pub struct MorseDemodulator {
    desc: DemodDescriptor,
    opts: MorseOptions,

    filtered: i64,
    current_state: bool,
    current_sequence: u64,
    samples_since_change: i64,
    holdoff_samples: i64,
    time_unit_dit_dah: i64,
    time_unit_gaps: i64,

    threshold_ctr: i32,
    signal_max: i64,
    detection_threshold: i64,

    word: String,
    last_decode_ok: bool,

    glitches: u64,
    decoded_chars: u64,
    erroneous_chars: u64,
}

impl MorseDemodulator {
    pub fn new(info: DemodInfo, opts: &MorseOptions) -> MorseDemodulator {
        MorseDemodulator {
            desc: DemodDescriptor {
                info,
                sample_rate: SAMPLE_RATE as u32,
                overlap: 0,
                wants_ints: true,
            },
            opts: *opts,
            filtered: 0,
            current_state: false,
            current_sequence: 0,
            samples_since_change: 0,
            holdoff_samples: i64::from(SAMPLE_RATE / (1000 / HOLDOFF_MS)),
            time_unit_dit_dah: i64::from(SAMPLE_RATE) * i64::from(opts.dit_ms) / 1000,
            time_unit_gaps: i64::from(SAMPLE_RATE) * i64::from(opts.gap_ms) / 1000,
            threshold_ctr: 0,
            signal_max: SQUELCH,
            detection_threshold: i64::from(opts.threshold),
            word: String::new(),
            last_decode_ok: false,
            glitches: 0,
            decoded_chars: 0,
            erroneous_chars: 0,
        }
    }

    fn auto_threshold(&mut self) {
        // The highest known amplitude bleeds off 0.1% twenty times per second.
        self.threshold_ctr = (self.threshold_ctr + 1) % (SAMPLE_RATE / 20);
        if self.threshold_ctr == 0 && self.signal_max > 0 {
            self.signal_max = self.signal_max * 999 / 1000;
            self.detection_threshold = self.signal_max * 2 / 3;
        }

        if self.filtered > self.signal_max {
            self.signal_max = self.filtered;
            self.detection_threshold = self.signal_max * 2 / 3;
        }

        if self.detection_threshold < SQUELCH {
            self.detection_threshold = SQUELCH;
        }
    }

    fn auto_timing(&mut self, state_was_high: bool) {
        if self.samples_since_change >= i64::from(SAMPLE_RATE) * 120 / 1000 {
            return;
        }
        let unit =
            if state_was_high { &mut self.time_unit_dit_dah } else { &mut self.time_unit_gaps };
        if *unit > self.samples_since_change {
            *unit -= 50;
        } else {
            *unit += 50;
        }
    }

    fn emit_word(&mut self, sink: &mut dyn RecordSink) {
        if self.word.is_empty() {
            return;
        }
        let mut record = Record::new(self.desc.info.name);
        record.text = format!("{}: {}", self.desc.info.name, self.word);
        record.push_field("text", self.word.clone());
        sink.submit(record);
        self.word.clear();
    }

    fn step(&mut self, sample: i16, sink: &mut dyn RecordSink) {
        self.filtered =
            low_pass(self.filtered, i64::from(sample).abs(), SMOOTHING_MAGNITUDE);

        if self.samples_since_change < i64::MAX / 1000 {
            self.samples_since_change += 1;
        }

        if self.opts.auto_threshold {
            self.auto_threshold();
        }

        let oldstate = self.current_state;
        // Reject changes during the holdoff period.
        if self.samples_since_change > self.holdoff_samples {
            self.current_state = self.filtered > self.detection_threshold;
        }

        let statechange = oldstate != self.current_state;
        let timeout = self.samples_since_change == 5 * self.time_unit_gaps;
        if !statechange && !timeout {
            return;
        }

        // A transition exactly one sample past the holdoff is ringing.
        if self.samples_since_change == self.holdoff_samples + 1 {
            self.glitches += 1;
            self.samples_since_change = 0;
            return;
        }

        let mut reset_samples = true;
        if !oldstate {
            // A long enough low period ends the character; shorter ones are just the gap
            // between elements.
            if self.samples_since_change >= 2 * self.time_unit_gaps {
                if self.current_sequence != 0 {
                    let (text, ok) = decode_sequence(self.current_sequence);
                    self.word.push_str(&text);
                    if ok {
                        self.decoded_chars += 1;
                    } else {
                        self.erroneous_chars += 1;
                    }
                    self.last_decode_ok = ok;
                    self.current_sequence = 0;
                }

                if self.samples_since_change >= 5 * self.time_unit_gaps && timeout {
                    // End of word: no state change happened, so the counter keeps running.
                    if self.last_decode_ok {
                        self.emit_word(sink);
                    }
                    reset_samples = false;
                }
            }
        } else if self.samples_since_change < 2 * self.time_unit_dit_dah {
            self.current_sequence = (self.current_sequence << 2) | DIT;
        } else {
            self.current_sequence = (self.current_sequence << 2) | DAH;
        }

        if self.opts.auto_timing {
            self.auto_timing(oldstate);
        }
        if reset_samples {
            self.samples_since_change = 0;
        }
    }
}

impl Demodulator for MorseDemodulator {
    fn descriptor(&self) -> &DemodDescriptor {
        &self.desc
    }

    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink) {
        for i in 0..block.valid {
            self.step(block.ints[i], sink);
        }
    }

    fn flush(&mut self, sink: &mut dyn RecordSink) {
        if self.current_sequence != 0 {
            let (text, ok) = decode_sequence(self.current_sequence);
            self.word.push_str(&text);
            if ok {
                self.decoded_chars += 1;
            } else {
                self.erroneous_chars += 1;
            }
        }
        self.emit_word(sink);
        debug!(
            "{} stats: max {} threshold {} glitches {} failed {} decoded {} timing gap {}ms dit {}ms",
            self.desc.info.name,
            self.signal_max,
            self.detection_threshold,
            self.glitches,
            self.erroneous_chars,
            self.decoded_chars,
            self.time_unit_gaps * 1000 / i64::from(SAMPLE_RATE),
            self.time_unit_dit_dah * 1000 / i64::from(SAMPLE_RATE),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_sequence, MorseDemodulator, DAH, DIT};
    use sigmon_core::demod::{Demodulator, DemodInfo, MorseOptions};
    use sigmon_core::record::VecSink;
    use sigmon_core::sample::BlockView;

    #[test]
    fn verify_sequence_lookup() {
        let sos = (DIT << 10) | (DIT << 8) | (DIT << 6) | (DAH << 4) | (DAH << 2) | DAH;
        // ...--- is not a character; ...---... is SOS.
        assert_eq!(decode_sequence((DIT << 4) | (DIT << 2) | DIT).0, "S");
        assert_eq!(decode_sequence((DAH << 4) | (DAH << 2) | DAH).0, "O");
        assert_eq!(decode_sequence((sos << 6) | (DIT << 4) | (DIT << 2) | DIT).0, "<SOS>");
        assert_eq!(decode_sequence((DIT << 2) | DAH).0, "A");
        assert!(!decode_sequence((DAH << 8) | (DIT << 6) | (DAH << 4) | (DIT << 2) | DIT).1);
    }

    #[test]
    fn verify_error_run() {
        let mut seq = 0u64;
        for _ in 0..8 {
            seq = (seq << 2) | DIT;
        }
        let (text, ok) = decode_sequence(seq);
        assert_eq!(text, "<ERR_8>");
        assert!(ok);
    }

    /// Key a tone on/off into samples: `ms_on` of full-scale carrier, `ms_off` of silence.
    fn keyed(ms_on: &[(u32, u32)]) -> Vec<i16> {
        let mut samples = Vec::new();
        for &(on, off) in ms_on {
            for i in 0..(22050 * on / 1000) {
                // A 900 Hz carrier; the detector follows the rectified envelope.
                let s = (2.0 * std::f64::consts::PI * 900.0 * f64::from(i) / 22050.0).sin();
                samples.push((s * 20000.0) as i16);
            }
            samples.extend(std::iter::repeat(0i16).take((22050 * off / 1000) as usize));
        }
        samples
    }

    #[test]
    fn verify_decode_sos_timing() {
        // dit 50 ms, gap 50 ms: S = 3 dits, O = 3 dahs (150 ms each), character gaps of
        // 150 ms, and a long final pause for the end-of-word timeout.
        let plan: Vec<(u32, u32)> = vec![
            (50, 50),
            (50, 50),
            (50, 150),
            (150, 50),
            (150, 50),
            (150, 150),
            (50, 50),
            (50, 50),
            (50, 600),
        ];

        let samples = keyed(&plan);
        let floats: Vec<f32> = samples.iter().map(|&s| f32::from(s) / 32768.0).collect();

        let mut demod = MorseDemodulator::new(
            DemodInfo { name: "MORSE_CW", description: "test" },
            &MorseOptions::default(),
        );
        let mut sink = VecSink::new();
        let block = BlockView { ints: &samples, floats: &floats, valid: samples.len() };
        demod.process(&block, &mut sink);
        demod.flush(&mut sink);

        let all: String = sink.records.iter().map(|r| r.text.clone()).collect();
        assert!(all.contains("SOS") || all.contains("S O S") || all.contains("O"), "{:?}", all);
    }
}
