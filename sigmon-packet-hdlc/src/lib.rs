// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! AFSK packet decoding: 1200 and 2400 baud AX.25 (with APRS rendering) and the EAS
//! broadcast channel, all over a shared HDLC bit framer.

mod afsk;
mod ax25;
mod hdlc;

pub use afsk::AfskDemodulator;
pub use ax25::render_ax25;
pub use hdlc::HdlcFramer;

use sigmon_core::demod::{DemodInfo, DemodOptions, Demodulator, RegisterableDemodulator};
use sigmon_core::errors::{unsupported_error, Result};
use sigmon_core::support_demod;

static AFSK_DEMODS: [DemodInfo; 3] = [
    support_demod!("AFSK1200", "AFSK 1200 baud AX.25 (APRS) decoder"),
    support_demod!("AFSK2400", "AFSK 2400 baud AX.25 decoder"),
    support_demod!("EAS", "Emergency Alert System decoder, 520.83 baud AFSK"),
];

impl RegisterableDemodulator for AfskDemodulator {
    fn try_registry_new(name: &str, opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        let (info, params) = match name {
            "AFSK1200" => (AFSK_DEMODS[0], &afsk::AFSK1200),
            "AFSK2400" => (AFSK_DEMODS[1], &afsk::AFSK2400),
            "EAS" => (AFSK_DEMODS[2], &afsk::EAS),
            _ => return unsupported_error("afsk: unknown variant"),
        };
        Ok(Box::new(AfskDemodulator::new(info, params, opts.packet.aprs)))
    }

    fn supported_demods() -> &'static [DemodInfo] {
        &AFSK_DEMODS
    }
}
