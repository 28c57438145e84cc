// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Quadrature matched filter for two-tone FSK.

use std::f64::consts::PI;

/// Multiply-accumulate of a sample window against one coefficient template.
#[inline]
fn mac(samples: &[f32], coeffs: &[f32]) -> f32 {
    samples.iter().zip(coeffs).map(|(s, c)| s * c).sum()
}

#[inline(always)]
fn sqr(x: f32) -> f32 {
    x * x
}

/// A pair of quadrature correlation templates, one per tone, evaluated over a window of
/// `corrlen` samples and weighted by a Hamming envelope.
pub struct FskCorrelator {
    mark_i: Vec<f32>,
    mark_q: Vec<f32>,
    space_i: Vec<f32>,
    space_q: Vec<f32>,
}

impl FskCorrelator {
    /// Build the templates. `corrlen` is `sample_rate / baud` for most demodulators, doubled
    /// for the high-rate AFSK variants.
    pub fn new(sample_rate: u32, mark_hz: f64, space_hz: f64, corrlen: usize) -> FskCorrelator {
        let mut c = FskCorrelator {
            mark_i: Vec::with_capacity(corrlen),
            mark_q: Vec::with_capacity(corrlen),
            space_i: Vec::with_capacity(corrlen),
            space_q: Vec::with_capacity(corrlen),
        };

        let mut f = 0.0f64;
        for _ in 0..corrlen {
            c.mark_i.push(f.cos() as f32);
            c.mark_q.push(f.sin() as f32);
            f += 2.0 * PI * mark_hz / f64::from(sample_rate);
        }
        let mut f = 0.0f64;
        for _ in 0..corrlen {
            c.space_i.push(f.cos() as f32);
            c.space_q.push(f.sin() as f32);
            f += 2.0 * PI * space_hz / f64::from(sample_rate);
        }
        for i in 0..corrlen {
            let w = (0.54 - 0.46 * (2.0 * PI * i as f64 / (corrlen - 1) as f64).cos()) as f32;
            c.mark_i[i] *= w;
            c.mark_q[i] *= w;
            c.space_i[i] *= w;
            c.space_q[i] *= w;
        }
        c
    }

    /// The correlation window length in samples.
    pub fn corrlen(&self) -> usize {
        self.mark_i.len()
    }

    /// The slicer statistic over a window starting at `samples[0]`:
    /// (‖I_mark‖² + ‖Q_mark‖²) − (‖I_space‖² + ‖Q_space‖²). Positive means mark.
    pub fn statistic(&self, samples: &[f32]) -> f32 {
        sqr(mac(samples, &self.mark_i)) + sqr(mac(samples, &self.mark_q))
            - sqr(mac(samples, &self.space_i))
            - sqr(mac(samples, &self.space_q))
    }

    /// Slice one bit: a statistic of exactly zero counts as space.
    #[inline]
    pub fn slice(&self, samples: &[f32]) -> bool {
        self.statistic(samples) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::FskCorrelator;
    use std::f64::consts::PI;

    fn tone(sample_rate: u32, hz: f64, len: usize) -> Vec<f32> {
        (0..len).map(|i| (2.0 * PI * hz * i as f64 / f64::from(sample_rate)).sin() as f32).collect()
    }

    #[test]
    fn verify_tone_discrimination() {
        let corr = FskCorrelator::new(22050, 1200.0, 2200.0, 18);

        let mark = tone(22050, 1200.0, 64);
        let space = tone(22050, 2200.0, 64);

        assert!(corr.slice(&mark));
        assert!(!corr.slice(&space));
    }

    #[test]
    fn verify_silence_is_space() {
        let corr = FskCorrelator::new(22050, 1200.0, 2200.0, 18);
        let silence = vec![0.0f32; 32];
        assert!(!corr.slice(&silence));
    }
}
