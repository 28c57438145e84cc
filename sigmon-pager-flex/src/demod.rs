// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLEX symbol recovery and frame state machine.
//!
//! Timing recovery tracks the four-level baseband directly: a DC-offset estimator and an
//! envelope estimator run while searching for sync, each symbol period tallies the
//! quantised level over its middle 80%, and a phase accumulator locked to the zero
//! crossings decides when a symbol is complete. The frame machine walks
//! SYNC1 → FIW → SYNC2 → DATA and back.

use log::debug;

use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator};
use sigmon_core::fec::Bch3121;
use sigmon_core::record::RecordSink;
use sigmon_core::sample::BlockView;

use crate::fiw::Fiw;
use crate::group::GroupHandler;
use crate::phase::DataCollector;
use crate::sync::{decode_mode, sync_check, SyncInfo};

/// For four-level FSK the outer levels have three times the amplitude of the inner ones, so
/// quantisation splits at two thirds of the envelope.
const SLICE_THRESHOLD: f64 = 0.667;
/// DC offset IIR response, in seconds.
const DC_OFFSET_FILTER: f64 = 0.010;
const PHASE_LOCKED_RATE: f64 = 0.045;
const PHASE_UNLOCKED_RATE: f64 = 0.050;
/// Symbols checked for the lock pattern (max 32).
const LOCK_LEN: u32 = 24;
/// Symbol periods without a zero crossing before timing lock is abandoned.
const DEMOD_TIMEOUT: i32 = 100;

const SAMPLE_RATE: u32 = 22050;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FrameState {
    Sync1,
    Fiw,
    Sync2,
    Data,
}

pub struct FlexDemodulator {
    desc: DemodDescriptor,

    // Timing recovery.
    sample_last: f64,
    locked: bool,
    phase: i64,
    sample_count: u64,
    symbol_count: u64,
    envelope_sum: f64,
    envelope_count: u64,
    lock_buf: u64,
    symcount: [i32; 4],
    timeout: i32,
    nonconsec: i32,
    /// Current demodulation baud rate: 1600 for SYNC1 and FIW, the frame's rate after.
    demod_baud: u32,

    // Modulation estimates.
    envelope: f64,
    zero: f64,

    // Frame state machine.
    state: FrameState,
    prev_state: FrameState,
    syncbuf: u64,
    fiw_count: u32,
    fiw_raw: u32,
    sync2_count: u32,
    data_count: u32,

    pub(crate) sync: SyncInfo,
    pub(crate) fiw: Fiw,
    pub(crate) data: DataCollector,
    pub(crate) groups: GroupHandler,
    pub(crate) bch: Bch3121,

    // Statistics.
    pub(crate) bits_corrected: u64,
    pub(crate) words_uncorrectable: u64,
}

impl FlexDemodulator {
    pub fn new(info: DemodInfo) -> FlexDemodulator {
        FlexDemodulator {
            desc: DemodDescriptor { info, sample_rate: SAMPLE_RATE, overlap: 1, wants_ints: false },
            sample_last: 0.0,
            locked: false,
            phase: 0,
            sample_count: 0,
            symbol_count: 0,
            envelope_sum: 0.0,
            envelope_count: 0,
            lock_buf: 0,
            symcount: [0; 4],
            timeout: 0,
            nonconsec: 0,
            demod_baud: 1600,
            envelope: 0.0,
            zero: 0.0,
            state: FrameState::Sync1,
            prev_state: FrameState::Sync1,
            syncbuf: 0,
            fiw_count: 0,
            fiw_raw: 0,
            sync2_count: 0,
            data_count: 0,
            sync: SyncInfo::default(),
            fiw: Fiw::default(),
            data: DataCollector::new(),
            groups: GroupHandler::new(),
            bch: Bch3121::new(),
            bits_corrected: 0,
            words_uncorrectable: 0,
        }
    }

    /// Advance the timing recovery by one sample. Returns true when a symbol period ended.
    fn build_symbol(&mut self, mut sample: f64) -> bool {
        let phase_max = 100 * i64::from(SAMPLE_RATE);
        let phase_rate = phase_max * i64::from(self.demod_baud) / i64::from(SAMPLE_RATE);
        let phasepercent = 100.0 * self.phase as f64 / phase_max as f64;

        self.sample_count += 1;

        // The DC offset estimator only runs while hunting for sync; it is frozen once a
        // frame starts.
        if self.state == FrameState::Sync1 {
            let w = f64::from(SAMPLE_RATE) * DC_OFFSET_FILTER;
            self.zero = (self.zero * w + sample) / (w + 1.0);
        }
        sample -= self.zero;

        if self.locked {
            if self.state == FrameState::Sync1 {
                self.envelope_sum += sample.abs();
                self.envelope_count += 1;
                self.envelope = self.envelope_sum / self.envelope_count as f64;
            }
        } else {
            // Reset and hold in the initial state.
            self.envelope = 0.0;
            self.envelope_sum = 0.0;
            self.envelope_count = 0;
            self.demod_baud = 1600;
            self.timeout = 0;
            self.nonconsec = 0;
            self.state = FrameState::Sync1;
        }

        // Tally the quantised level over the middle 80% of the symbol period.
        if phasepercent > 10.0 && phasepercent < 90.0 {
            if sample > 0.0 {
                if sample > self.envelope * SLICE_THRESHOLD {
                    self.symcount[3] += 1;
                } else {
                    self.symcount[2] += 1;
                }
            } else if sample < -self.envelope * SLICE_THRESHOLD {
                self.symcount[0] += 1;
            } else {
                self.symcount[1] += 1;
            }
        }

        // Zero crossing: drag the phase toward the nearest symbol boundary.
        if (self.sample_last < 0.0 && sample >= 0.0) || (self.sample_last >= 0.0 && sample < 0.0) {
            let phase_error =
                if phasepercent < 50.0 { self.phase as f64 } else { (self.phase - phase_max) as f64 };

            let rate = if self.locked { PHASE_LOCKED_RATE } else { PHASE_UNLOCKED_RATE };
            self.phase -= (phase_error * rate) as i64;

            // Crossings inside the middle of the symbol mean the signal is not keeping time
            // with us.
            if phasepercent > 10.0 && phasepercent < 90.0 {
                self.nonconsec += 1;
                if self.nonconsec > 20 && self.locked {
                    debug!("FLEX: synchronisation lost");
                    self.locked = false;
                }
            } else {
                self.nonconsec = 0;
            }

            self.timeout = 0;
        }
        self.sample_last = sample;

        self.phase += phase_rate;
        if self.phase > phase_max {
            self.phase -= phase_max;
            true
        } else {
            false
        }
    }

    /// Process one input sample.
    pub(crate) fn demodulate(&mut self, sample: f64, sink: &mut dyn RecordSink) {
        if self.build_symbol(sample) {
            self.nonconsec = 0;
            self.symbol_count += 1;

            // Modal symbol over the period.
            let mut modal = 0usize;
            let mut max = 0;
            for (sym, &count) in self.symcount.iter().enumerate() {
                if count > max {
                    modal = sym;
                    max = count;
                }
            }
            self.symcount = [0; 4];

            if self.locked {
                self.feed_symbol(modal as u8, sink);
            } else {
                // Map the extreme symbols to 01 and 10 so dotting becomes 0b0110 0110 ...
                self.lock_buf = (self.lock_buf << 2) | u64::from(modal as u8 ^ 0x1);
                let pattern = self.lock_buf ^ 0x6666_6666_6666_6666;
                let mask = (1u64 << (2 * LOCK_LEN)) - 1;
                if pattern & mask == 0 || !pattern & mask == 0 {
                    debug!("FLEX: locked");
                    self.locked = true;
                    self.lock_buf = 0;
                    self.symbol_count = 0;
                    self.sample_count = 0;
                }
            }

            self.timeout += 1;
            if self.timeout > DEMOD_TIMEOUT {
                debug!("FLEX: timeout");
                self.locked = false;
            }
        }

        if self.state != self.prev_state {
            self.prev_state = self.state;
            debug!("FLEX: state: {:?}", self.state);
        }
    }

    /// Frame state machine, one symbol at a time.
    fn feed_symbol(&mut self, sym: u8, sink: &mut dyn RecordSink) {
        // Polarity was determined while matching the sync word; rectify afterwards.
        let sym_rectified = if self.sync.polarity { 3 - sym } else { sym };

        match self.state {
            FrameState::Sync1 => {
                // The sync pattern search must see the unrectified symbol.
                self.syncbuf = (self.syncbuf << 1) | u64::from(sym < 2);

                let (code, polarity) = {
                    let code = sync_check(self.syncbuf);
                    if code != 0 {
                        (code, false)
                    } else {
                        (sync_check(!self.syncbuf), true)
                    }
                };

                if code != 0 {
                    if let Some(mut info) = decode_mode(code) {
                        info.polarity = polarity;
                        self.sync = info;
                        self.state = FrameState::Fiw;
                        debug!(
                            "FLEX: SyncInfoWord: sync_code={:#06x} baud={} levels={} polarity={} \
                             zero={:.4} envelope={:.4} symrate={:.1}",
                            code,
                            info.baud,
                            info.levels,
                            if info.polarity { "NEG" } else { "POS" },
                            self.zero,
                            self.envelope,
                            self.symbol_count as f64 * f64::from(SAMPLE_RATE)
                                / self.sample_count.max(1) as f64,
                        );
                    }
                }

                self.fiw_count = 0;
                self.fiw_raw = 0;
            }
            FrameState::Fiw => {
                // Skip 16 bits of dotting, then accumulate 32 bits of FIW, LSB first.
                self.fiw_count += 1;
                if self.fiw_count >= 16 {
                    self.fiw_raw =
                        (self.fiw_raw >> 1) | if sym_rectified > 1 { 0x8000_0000 } else { 0 };
                }
                if self.fiw_count == 48 {
                    match Fiw::decode(&self.bch, self.fiw_raw) {
                        Some((fiw, corrected)) => {
                            self.bits_corrected += u64::from(corrected);
                            self.fiw = fiw;
                            self.groups.expire(fiw.cycleno, fiw.frameno);
                            self.sync2_count = 0;
                            self.demod_baud = self.sync.baud;
                            self.state = FrameState::Sync2;
                        }
                        None => {
                            self.words_uncorrectable += 1;
                            self.state = FrameState::Sync1;
                        }
                    }
                }
            }
            FrameState::Sync2 => {
                // 25 ms of idle bits at the frame's baud rate.
                self.sync2_count += 1;
                if self.sync2_count == self.sync.baud * 25 / 1000 {
                    self.data_count = 0;
                    self.data.clear();
                    self.state = FrameState::Data;
                }
            }
            FrameState::Data => {
                // Exactly 1760 ms of symbols, ended early when every active phase idles.
                let idle = self.data.read_symbol(sym_rectified, self.sync.baud, self.sync.levels);
                self.data_count += 1;
                if self.data_count == self.sync.baud * 1760 / 1000 || idle {
                    self.decode_data(sink);
                    self.demod_baud = 1600;
                    self.state = FrameState::Sync1;
                    self.data_count = 0;
                }
            }
        }
    }
}

impl Demodulator for FlexDemodulator {
    fn descriptor(&self) -> &DemodDescriptor {
        &self.desc
    }

    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink) {
        for &sample in &block.floats[..block.valid] {
            self.demodulate(f64::from(sample), sink);
        }
    }

    fn flush(&mut self, _sink: &mut dyn RecordSink) {
        if self.bits_corrected > 0 || self.words_uncorrectable > 0 {
            debug!(
                "FLEX stats: corrected bits {}, uncorrectable words {}",
                self.bits_corrected, self.words_uncorrectable
            );
        }
    }
}
