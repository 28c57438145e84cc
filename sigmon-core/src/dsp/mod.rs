// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `dsp` module provides the layer-1 symbol-recovery kernels shared by every two-level
//! FSK/AFSK demodulator: the quadrature matched filter, the transition-locked symbol clock,
//! input subsampling, NRZ-I decoding, and the quantised oscillator used by the tone bank.

pub mod correlator;
pub mod osc;
pub mod symclock;
