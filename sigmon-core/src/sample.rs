// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sample-block types shared between the pipeline driver and the demodulators.

/// One block of mono samples, visible both as raw 16-bit integers and as normalised floats.
/// The conversion is done once per block by the pipeline and shared by every demodulator.
///
/// `valid` is the number of samples a demodulator must consume this block. The slices extend
/// past `valid` by the pipeline's overlap length, so a matched filter at position
/// `valid - 1` can still correlate over its full window without seeing a block boundary.
pub struct BlockView<'a> {
    pub ints: &'a [i16],
    pub floats: &'a [f32],
    pub valid: usize,
}

/// Convert one signed 16-bit sample to a normalised float in [-1, 1).
#[inline(always)]
pub fn normalize(sample: i16) -> f32 {
    f32::from(sample) * (1.0 / 32768.0)
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn verify_normalize() {
        assert_eq!(normalize(0), 0.0);
        assert_eq!(normalize(-32768), -1.0);
        assert!((normalize(16384) - 0.5).abs() < 1e-6);
    }
}
