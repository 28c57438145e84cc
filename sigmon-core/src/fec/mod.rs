// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `fec` module provides the forward error correction codecs used by the paging and rail
//! protocols: BCH(31,21,2) over GF(2⁵) in the FLEX and POCSAG codeword layouts, and the
//! BCH(26,16) code used by CIR.
//!
//! All lookup tables are computed at construction. Decoders return the number of corrected
//! bits on success; callers propagate that count as confidence into their frame logic.

mod bch2616;
mod bch3121;
mod gf32;
mod pocsag;

pub use bch2616::{Bch2616, Decoded};
pub use bch3121::Bch3121;
pub use gf32::Gf32;
pub use pocsag::{ErrorCorrection, PocsagCode};
