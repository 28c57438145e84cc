// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The pipeline driver: broadcasts each sample block to every enabled demodulator,
//! synchronously and in configuration order, preserving an overlap tail between blocks so
//! matched filters never see a block boundary.

use log::debug;

use crate::demod::Demodulator;
use crate::errors::{unsupported_error, Result};
use crate::record::RecordSink;
use crate::sample::{normalize, BlockView};

pub struct Pipeline {
    demods: Vec<Box<dyn Demodulator>>,
    sample_rate: u32,
    overlap: usize,
    ibuf: Vec<i16>,
    fbuf: Vec<f32>,
    finalized: bool,
}

impl Pipeline {
    /// Build a pipeline over the given demodulators. Fails if any two demodulators disagree
    /// on the input sample rate.
    pub fn new(demods: Vec<Box<dyn Demodulator>>) -> Result<Pipeline> {
        if demods.is_empty() {
            return unsupported_error("pipeline: no demodulators selected");
        }

        let sample_rate = demods[0].descriptor().sample_rate;
        let mut overlap = 0;
        for demod in &demods {
            let desc = demod.descriptor();
            if desc.sample_rate != sample_rate {
                return unsupported_error("pipeline: sample rate mismatch between demodulators");
            }
            overlap = overlap.max(desc.overlap);
            debug!("pipeline: enabled {} (overlap {})", desc.info.name, desc.overlap);
        }

        Ok(Pipeline {
            demods,
            sample_rate,
            overlap,
            ibuf: Vec::new(),
            fbuf: Vec::new(),
            finalized: false,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Feed one batch of input samples. The batch is converted to floats once and the same
    /// block is handed to every demodulator in configuration order. The final `overlap`
    /// samples are retained and replayed as the head of the next block.
    pub fn process(&mut self, samples: &[i16], sink: &mut dyn RecordSink) {
        assert!(!self.finalized);

        self.ibuf.extend_from_slice(samples);
        self.fbuf.extend(samples.iter().map(|&s| normalize(s)));

        if self.fbuf.len() <= self.overlap {
            return;
        }
        let valid = self.fbuf.len() - self.overlap;

        let block = BlockView { ints: &self.ibuf, floats: &self.fbuf, valid };
        for demod in &mut self.demods {
            demod.process(&block, sink);
        }

        self.ibuf.copy_within(valid.., 0);
        self.ibuf.truncate(self.overlap);
        self.fbuf.copy_within(valid.., 0);
        self.fbuf.truncate(self.overlap);
    }

    /// Shut the pipeline down: each demodulator's `flush` runs exactly once, in reverse
    /// configuration order. The retained overlap tail is discarded, as a correlation window
    /// can no longer be completed for it.
    pub fn finalize(&mut self, sink: &mut dyn RecordSink) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.ibuf.clear();
        self.fbuf.clear();
        for demod in self.demods.iter_mut().rev() {
            demod.flush(sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Pipeline;
    use crate::demod::{DemodDescriptor, DemodInfo, Demodulator};
    use crate::record::{Record, RecordSink, VecSink};
    use crate::sample::BlockView;

    struct CountingDemod {
        desc: DemodDescriptor,
        seen: usize,
    }

    impl CountingDemod {
        fn new(sample_rate: u32, overlap: usize) -> CountingDemod {
            CountingDemod {
                desc: DemodDescriptor {
                    info: DemodInfo { name: "COUNT", description: "counts samples" },
                    sample_rate,
                    overlap,
                    wants_ints: false,
                },
                seen: 0,
            }
        }
    }

    impl Demodulator for CountingDemod {
        fn descriptor(&self) -> &DemodDescriptor {
            &self.desc
        }

        fn process(&mut self, block: &BlockView<'_>, _sink: &mut dyn RecordSink) {
            // The lookahead promised by the overlap contract must be there.
            assert!(block.floats.len() >= block.valid + self.desc.overlap);
            assert_eq!(block.floats.len(), block.ints.len());
            self.seen += block.valid;
        }

        fn flush(&mut self, sink: &mut dyn RecordSink) {
            let mut record = Record::new("COUNT");
            record.text = format!("{}", self.seen);
            sink.submit(record);
        }
    }

    #[test]
    fn verify_rate_mismatch_rejected() {
        let demods: Vec<Box<dyn Demodulator>> =
            vec![Box::new(CountingDemod::new(22050, 8)), Box::new(CountingDemod::new(8000, 8))];
        assert!(Pipeline::new(demods).is_err());
    }

    #[test]
    fn verify_block_size_independence() {
        // Processing one large batch and many small batches must consume the same number of
        // samples in total.
        let samples: Vec<i16> = (0..4096).map(|i| (i % 251) as i16).collect();

        let run = |chunk: usize| -> String {
            let demods: Vec<Box<dyn Demodulator>> = vec![Box::new(CountingDemod::new(22050, 36))];
            let mut pipeline = Pipeline::new(demods).unwrap();
            let mut sink = VecSink::new();
            for chunk in samples.chunks(chunk) {
                pipeline.process(chunk, &mut sink);
            }
            pipeline.finalize(&mut sink);
            sink.records[0].text.clone()
        };

        let whole = run(4096);
        assert_eq!(whole, run(2048));
        assert_eq!(whole, run(100));
        assert_eq!(whole, run(7));
    }
}
