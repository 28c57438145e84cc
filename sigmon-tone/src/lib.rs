// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Tone-keyed decoders: the selective-call bank (CCIR-1, EEA, EIA, ZVEI-1, ZVEI-3), Morse
//! CW, and the pulse-period X10 RF remote protocol.

mod morse;
mod selcall;
mod x10;

pub use morse::MorseDemodulator;
pub use selcall::SelcallDemodulator;
pub use x10::X10Demodulator;

use sigmon_core::demod::{DemodInfo, DemodOptions, Demodulator, RegisterableDemodulator};
use sigmon_core::errors::{unsupported_error, Result};
use sigmon_core::support_demod;

static SELCALL_DEMODS: [DemodInfo; 5] = [
    support_demod!("CCIR", "CCIR-1 selective call decoder"),
    support_demod!("EEA", "EEA selective call decoder"),
    support_demod!("EIA", "EIA selective call decoder"),
    support_demod!("ZVEI1", "ZVEI-1 selective call decoder"),
    support_demod!("ZVEI3", "ZVEI-3 selective call decoder"),
];

impl RegisterableDemodulator for SelcallDemodulator {
    fn try_registry_new(name: &str, _opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        let (info, table) = match name {
            "CCIR" => (SELCALL_DEMODS[0], &selcall::CCIR),
            "EEA" => (SELCALL_DEMODS[1], &selcall::EEA),
            "EIA" => (SELCALL_DEMODS[2], &selcall::EIA),
            "ZVEI1" => (SELCALL_DEMODS[3], &selcall::ZVEI1),
            "ZVEI3" => (SELCALL_DEMODS[4], &selcall::ZVEI3),
            _ => return unsupported_error("selcall: unknown variant"),
        };
        Ok(Box::new(SelcallDemodulator::new(info, table)))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &SELCALL_DEMODS
    }
}

static MORSE_DEMODS: [DemodInfo; 1] =
    [support_demod!("MORSE_CW", "Morse code decoder with adaptive timing")];

impl RegisterableDemodulator for MorseDemodulator {
    fn try_registry_new(_name: &str, opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        Ok(Box::new(MorseDemodulator::new(MORSE_DEMODS[0], &opts.morse)))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &MORSE_DEMODS
    }
}

static X10_DEMODS: [DemodInfo; 1] =
    [support_demod!("X10", "X10 RF remote decoder, pulse-period keyed")];

impl RegisterableDemodulator for X10Demodulator {
    fn try_registry_new(_name: &str, _opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        Ok(Box::new(X10Demodulator::new(X10_DEMODS[0])))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &X10_DEMODS
    }
}
