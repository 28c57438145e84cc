// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Demodulator traits, options, and the registry used to look demodulators up by name and
//! instantiate them at runtime.

use std::collections::HashMap;

use crate::errors::{unsupported_error, Result};
use crate::fec::ErrorCorrection;
use crate::record::RecordSink;
use crate::sample::BlockView;

/// Identifying details of a demodulator.
#[derive(Copy, Clone, Debug)]
pub struct DemodInfo {
    /// Short name, e.g. "POCSAG512". Also the record prefix.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
}

/// Immutable per-demodulator parameters.
#[derive(Copy, Clone, Debug)]
pub struct DemodDescriptor {
    pub info: DemodInfo,
    /// Input sample rate in Hz. All demodulators in one pipeline must agree.
    pub sample_rate: u32,
    /// How many trailing samples of each block must be replayed at the start of the next
    /// block; at least the demodulator's correlation window length.
    pub overlap: usize,
    /// Whether the demodulator reads the integer view of the sample block.
    pub wants_ints: bool,
}

/// POCSAG message rendering mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PocsagMessageMode {
    /// Render every candidate that passes the plausibility heuristic.
    Auto,
    /// Choose numeric or alphanumeric by the function bits.
    #[default]
    Standard,
    Numeric,
    Alpha,
    /// Alphanumeric with every character shifted down by one, as the Skyper network
    /// transmits it.
    Skyper,
}

/// ISO 646 national variant used for POCSAG alphanumeric text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PocsagCharset {
    #[default]
    Us,
    De,
    Se,
    Fr,
    Si,
}

#[derive(Clone, Debug)]
pub struct PocsagOptions {
    pub mode: PocsagMessageMode,
    pub error_correction: ErrorCorrection,
    /// Complement every input bit before it enters the protocol machine.
    pub invert: bool,
    /// Emit records for frames whose address or sync was lost.
    pub show_partial: bool,
    /// Drop pages with an empty message body.
    pub prune_empty: bool,
    /// In auto mode, drop pages that no candidate rendering scores as plausible.
    pub heuristic_prune: bool,
    pub charset: PocsagCharset,
}

impl Default for PocsagOptions {
    fn default() -> PocsagOptions {
        PocsagOptions {
            mode: PocsagMessageMode::default(),
            error_correction: ErrorCorrection::Two,
            invert: false,
            show_partial: false,
            prune_empty: false,
            heuristic_prune: false,
            charset: PocsagCharset::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MorseOptions {
    /// Nominal dit duration in milliseconds.
    pub dit_ms: u32,
    /// Nominal inter-element gap duration in milliseconds.
    pub gap_ms: u32,
    /// Initial detection threshold on the filtered envelope.
    pub threshold: i32,
    pub auto_threshold: bool,
    pub auto_timing: bool,
}

impl Default for MorseOptions {
    fn default() -> MorseOptions {
        MorseOptions { dit_ms: 50, gap_ms: 50, threshold: 500, auto_threshold: true, auto_timing: true }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PacketOptions {
    /// Render AX.25 UI frames in APRS form.
    pub aprs: bool,
}

/// Options shared by all demodulator factories.
#[derive(Clone, Debug, Default)]
pub struct DemodOptions {
    pub pocsag: PocsagOptions,
    pub morse: MorseOptions,
    pub packet: PacketOptions,
}

/// A demodulator instance: layer-1 symbol recovery plus its layer-2 framer, owning all of
/// its state exclusively.
pub trait Demodulator {
    fn descriptor(&self) -> &DemodDescriptor;

    /// Consume one sample block. Never blocks, never yields; decoded frames are handed to
    /// `sink` in the order their completing symbols arrived.
    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink);

    /// Called exactly once at shutdown for final flush and statistics emission.
    fn flush(&mut self, _sink: &mut dyn RecordSink) {}
}

/// To support registration in a [`DemodRegistry`], a demodulator must implement this trait.
pub trait RegisterableDemodulator: Demodulator {
    /// Instantiate the demodulator registered under `name`.
    fn try_registry_new(name: &str, opts: &DemodOptions) -> Result<Box<dyn Demodulator>>
    where
        Self: Sized;

    /// The demodulators this type provides.
    fn supported_demods() -> &'static [DemodInfo];
}

/// Demodulator factory function.
pub type DemodFactoryFn = fn(&str, &DemodOptions) -> Result<Box<dyn Demodulator>>;

/// Registration details for one named demodulator.
pub struct RegisteredDemod {
    pub info: DemodInfo,
    pub factory: DemodFactoryFn,
}

/// A `DemodRegistry` allows registration of demodulators and instantiates them by name.
#[derive(Default)]
pub struct DemodRegistry {
    demods: HashMap<&'static str, RegisteredDemod>,
}

impl DemodRegistry {
    pub fn new() -> DemodRegistry {
        DemodRegistry { demods: HashMap::new() }
    }

    /// Register every demodulator the type provides. A demodulator previously registered
    /// under the same name is replaced.
    pub fn register<D: RegisterableDemodulator>(&mut self) {
        for info in D::supported_demods() {
            let reg = RegisteredDemod { info: *info, factory: |name, opts| D::try_registry_new(name, opts) };
            self.demods.insert(info.name, reg);
        }
    }

    /// Look a demodulator up by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&RegisteredDemod> {
        self.demods
            .get(name)
            .or_else(|| self.demods.values().find(|reg| reg.info.name.eq_ignore_ascii_case(name)))
    }

    /// Instantiate the demodulator registered under `name`.
    pub fn make(&self, name: &str, opts: &DemodOptions) -> Result<Box<dyn Demodulator>> {
        if let Some(reg) = self.get(name) {
            (reg.factory)(reg.info.name, opts)
        } else {
            unsupported_error("core (demod): unknown demodulator")
        }
    }

    /// All registered demodulators, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &DemodInfo> {
        let mut infos: Vec<&DemodInfo> = self.demods.values().map(|reg| &reg.info).collect();
        infos.sort_by_key(|info| info.name);
        infos.into_iter()
    }
}

/// Convenience macro for declaring a [`DemodInfo`].
#[macro_export]
macro_rules! support_demod {
    ($name:expr, $description:expr) => {
        $crate::demod::DemodInfo { name: $name, description: $description }
    };
}
