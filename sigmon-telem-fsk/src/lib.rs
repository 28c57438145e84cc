// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Voice-band telemetry FSK decoders: CLIP caller-ID delivery (ETSI EN 300 659-3 over
//! V.23), FMS vehicle status telegrams (TR-BOS), and CIR rail telemetry (TB/T 3052-2002).
//! All three share the matched-filter front end; CLIP additionally uses the asynchronous
//! start/stop byte framer.

mod cir;
mod clip;
mod fms;
mod frontend;
mod uart;

pub use cir::{CirDemodulator, CirProtocol};
pub use clip::{render_clip, ClipDemodulator};
pub use fms::{FmsDemodulator, FmsProtocol};
pub use uart::{render_bytes, UartFramer};

use sigmon_core::demod::{DemodInfo, DemodOptions, Demodulator, RegisterableDemodulator};
use sigmon_core::errors::Result;
use sigmon_core::support_demod;

static CLIP_DEMODS: [DemodInfo; 1] =
    [support_demod!("CLIPFSK", "Calling line identity (ETSI EN 300 659-3) over V.23 FSK")];

static FMS_DEMODS: [DemodInfo; 1] =
    [support_demod!("FMSFSK", "FMS (TR-BOS) vehicle status decoder, 1200 baud FSK")];

static CIR_DEMODS: [DemodInfo; 1] =
    [support_demod!("CIRFSK", "CIR rail telemetry (TB/T 3052-2002) decoder, 600 baud FFSK")];

impl RegisterableDemodulator for ClipDemodulator {
    fn try_registry_new(_name: &str, _opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        Ok(Box::new(ClipDemodulator::new(CLIP_DEMODS[0])))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &CLIP_DEMODS
    }
}

impl RegisterableDemodulator for FmsDemodulator {
    fn try_registry_new(_name: &str, _opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        Ok(Box::new(FmsDemodulator::new(FMS_DEMODS[0])))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &FMS_DEMODS
    }
}

impl RegisterableDemodulator for CirDemodulator {
    fn try_registry_new(_name: &str, _opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        Ok(Box::new(CirDemodulator::new(CIR_DEMODS[0])))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &CIR_DEMODS
    }
}
