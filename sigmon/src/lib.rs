// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! # Project Sigmon
//!
//! Sigmon is a multi-protocol monitor for the digital transmission modes that coexist on
//! voice-band radio audio. It consumes a mono PCM sample stream and emits one decoded text
//! record per verified frame.
//!
//! ## Demodulators
//!
//! | Name        | Protocol                                    |
//! |-------------|---------------------------------------------|
//! | `FLEX`      | FLEX paging, 1600/3200 baud, 2/4-level FSK  |
//! | `POCSAG512` | POCSAG paging, 512 baud                     |
//! | `POCSAG1200`| POCSAG paging, 1200 baud                    |
//! | `POCSAG2400`| POCSAG paging, 2400 baud                    |
//! | `AFSK1200`  | AX.25 packet / APRS, Bell 202               |
//! | `AFSK2400`  | AX.25 packet, TCM3105                       |
//! | `EAS`       | Emergency Alert System                      |
//! | `CLIPFSK`   | Caller-ID (ETSI EN 300 659-3) over V.23     |
//! | `FMSFSK`    | FMS vehicle status (TR-BOS)                 |
//! | `CIRFSK`    | CIR rail telemetry (TB/T 3052-2002)         |
//! | `CCIR`, `EEA`, `EIA`, `ZVEI1`, `ZVEI3` | selective calling |
//! | `MORSE_CW`  | Morse code                                  |
//! | `X10`       | X10 RF remotes, pulse-period keyed          |
//!
//! ## Usage
//!
//! 1. Get the default registry with [`default::get_demods`], or build a
//!    [`DemodRegistry`][core::demod::DemodRegistry] and register the demodulator types of
//!    interest.
//! 2. Instantiate demodulators by name via
//!    [`make`][core::demod::DemodRegistry::make] and hand them to a
//!    [`Pipeline`][core::pipeline::Pipeline].
//! 3. Feed blocks of signed 16-bit samples to
//!    [`Pipeline::process`][core::pipeline::Pipeline::process] together with a
//!    [`RecordSink`][core::record::RecordSink]; call
//!    [`finalize`][core::pipeline::Pipeline::finalize] at end of input.

pub use sigmon_core as core;

pub mod demods {
    //! Re-exports of all Sigmon demodulator types.

    pub use sigmon_packet_hdlc::AfskDemodulator;
    pub use sigmon_pager_flex::FlexDemodulator;
    pub use sigmon_pager_pocsag::PocsagDemodulator;
    pub use sigmon_telem_fsk::{CirDemodulator, ClipDemodulator, FmsDemodulator};
    pub use sigmon_tone::{MorseDemodulator, SelcallDemodulator, X10Demodulator};
}

pub mod default {
    //! Convenience registry with every Sigmon demodulator pre-registered.

    use lazy_static::lazy_static;

    use sigmon_core::demod::DemodRegistry;

    lazy_static! {
        static ref DEMOD_REGISTRY: DemodRegistry = {
            let mut registry = DemodRegistry::new();
            register_enabled_demods(&mut registry);
            registry
        };
    }

    /// Register all demodulators into the provided registry.
    pub fn register_enabled_demods(registry: &mut DemodRegistry) {
        registry.register::<crate::demods::FlexDemodulator>();
        registry.register::<crate::demods::PocsagDemodulator>();
        registry.register::<crate::demods::AfskDemodulator>();
        registry.register::<crate::demods::ClipDemodulator>();
        registry.register::<crate::demods::FmsDemodulator>();
        registry.register::<crate::demods::CirDemodulator>();
        registry.register::<crate::demods::SelcallDemodulator>();
        registry.register::<crate::demods::MorseDemodulator>();
        registry.register::<crate::demods::X10Demodulator>();
    }

    /// Get the default demodulator registry.
    pub fn get_demods() -> &'static DemodRegistry {
        &DEMOD_REGISTRY
    }
}
