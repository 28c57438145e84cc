// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `checksum` module provides the CRC and checksum primitives shared by the layer-2 framers.

mod crc16;

pub use crc16::{crc16_xmodem, Crc16Ccitt, CRC_CCITT_GOOD_RESIDUE};

/// Modulo-256 sum of a byte sequence. A CLIP presentation-layer frame is valid iff the sum over
/// the whole frame, including the trailing checksum byte, is 0.
pub fn sum256(buf: &[u8]) -> u8 {
    buf.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}
