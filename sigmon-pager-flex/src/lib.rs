// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! FLEX radio paging decoder.
//!
//! FLEX is the only four-level demodulator in Sigmon and carries its own protocol-aware
//! symbol recovery: the demodulator locks onto the dotting pattern, matches the 64-bit
//! SYNC1 word (which selects 1600 or 3200 baud and 2- or 4-level FSK), decodes the BCH
//! protected Frame Information Word, and then collects 1760 ms of interleaved data across
//! up to four phases before decoding each phase's pages.

mod demod;
mod fiw;
mod group;
mod page;
mod phase;
mod sync;

pub use demod::FlexDemodulator;

use sigmon_core::demod::{DemodInfo, DemodOptions, Demodulator, RegisterableDemodulator};
use sigmon_core::errors::Result;
use sigmon_core::support_demod;

static FLEX_DEMODS: [DemodInfo; 1] =
    [support_demod!("FLEX", "FLEX pager decoder, 1600/3200 baud, 2/4 level FSK")];

impl RegisterableDemodulator for FlexDemodulator {
    fn try_registry_new(_name: &str, _opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        Ok(Box::new(FlexDemodulator::new(FLEX_DEMODS[0])))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &FLEX_DEMODS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigmon_core::record::VecSink;
    use sigmon_core::sample::BlockView;
    use sigmon_gen::{generate_flex, FlexParams};

    fn run(samples: &[i16]) -> VecSink {
        let opts = DemodOptions::default();
        let mut demod = FlexDemodulator::try_registry_new("FLEX", &opts).unwrap();
        let mut sink = VecSink::new();

        let floats: Vec<f32> = samples.iter().map(|&s| f32::from(s) / 32768.0).collect();
        let block = BlockView { ints: samples, floats: &floats, valid: samples.len() };
        demod.process(&block, &mut sink);
        demod.flush(&mut sink);
        sink
    }

    #[test]
    fn verify_alphanumeric_page() {
        let params = FlexParams {
            cycle: 3,
            frame: 10,
            capcode: 1234567,
            message: "HELLO FLEX".to_string(),
            ..Default::default()
        };
        let sink = run(&generate_flex(&params));

        let aln: Vec<&str> =
            sink.records.iter().map(|r| r.text.as_str()).filter(|t| t.contains("|ALN|")).collect();
        assert_eq!(aln.len(), 1, "records: {:?}", sink.texts());
        let text = aln[0];
        assert!(text.starts_with("FLEX|"), "{}", text);
        assert!(text.contains("|1600/2/A/K|"), "{}", text);
        assert!(text.contains("|03.010|"), "{}", text);
        assert!(text.contains("|0001234567|"), "{}", text);
        assert!(text.ends_with("|ALN|HELLO FLEX"), "{}", text);
    }

    #[test]
    fn verify_two_bit_errors_corrected() {
        // Two bit errors injected into the FIW and the leading codewords must still decode.
        let params = FlexParams {
            cycle: 1,
            frame: 22,
            capcode: 99,
            message: "ERRS".to_string(),
            errors: 2,
            ..Default::default()
        };
        let sink = run(&generate_flex(&params));

        let aln: Vec<&str> =
            sink.records.iter().map(|r| r.text.as_str()).filter(|t| t.contains("|ALN|")).collect();
        assert_eq!(aln.len(), 1, "records: {:?}", sink.texts());
        assert!(aln[0].contains("|01.022|"), "{}", aln[0]);
        assert!(aln[0].ends_with("|ALN|ERRS"), "{}", aln[0]);
    }

    #[test]
    fn verify_silence_produces_nothing() {
        let silence = vec![0i16; 22050];
        let sink = run(&silence);
        assert!(sink.records.is_empty());
    }
}
