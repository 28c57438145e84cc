// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The POCSAG layer-2 state machine.
//!
//! Out of sync, every incoming bit shifts into a 32-bit window that is BCH-repaired and
//! compared against the sync codeword; in auto polarity mode the complemented window is
//! tried as well, and the polarity that produced sync sticks until sync is lost. In sync,
//! exactly 16 codewords follow per batch; two consecutive uncorrectable codewords drop the
//! machine back to the sync search.

use log::{debug, warn};

use sigmon_core::demod::{PocsagMessageMode, PocsagOptions};
use sigmon_core::fec::PocsagCode;
use sigmon_core::record::{Record, RecordSink};

use crate::message::{render_alpha, render_numeric, render_skyper, PageBuffer};

const POCSAG_SYNC: u32 = 0x7cd2_15d8;
const POCSAG_IDLE: u32 = 0x7a89_c197;
/// The most significant bit of a codeword distinguishes message from address words.
const MESSAGE_FLAG: u32 = 0x8000_0000;

/// A rendering candidate is considered plausible at or above this score.
const PLAUSIBLE: i32 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    NoSync,
    /// Sync just acquired; the first batch codeword has not completed yet.
    Sync,
    LosingSync,
    LostSync,
    Address,
    Message,
}

/// The addressing state of the page being accumulated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PageAddress {
    /// No page open.
    None,
    /// Message codewords arrived without a decodable address codeword.
    Partial,
    Known { address: u32, function: u8 },
}

#[derive(Default)]
struct Stats {
    total_error_count: u32,
    corrected_error_count: u32,
    corrected_1bit_error_count: u32,
    corrected_2bit_error_count: u32,
    uncorrected_error_count: u32,
    total_bits_received: u64,
    bits_processed_while_synced: u64,
    bits_processed_while_not_synced: u64,
}

pub struct PocsagProtocol {
    name: &'static str,
    opts: PocsagOptions,
    bch: PocsagCode,

    rx_data: u32,
    rx_bit: u32,
    rx_word: u32,
    state: State,
    /// Polarity chosen by the auto-detection during the sync search.
    polarity_inverted: bool,

    address: PageAddress,
    page: PageBuffer,
    stats: Stats,
}

impl PocsagProtocol {
    pub fn new(name: &'static str, opts: &PocsagOptions) -> PocsagProtocol {
        PocsagProtocol {
            name,
            opts: opts.clone(),
            bch: PocsagCode::new(),
            rx_data: 0,
            rx_bit: 0,
            rx_word: 0,
            state: State::NoSync,
            polarity_inverted: false,
            address: PageAddress::None,
            page: PageBuffer::new(),
            stats: Stats::default(),
        }
    }

    /// Feed one demodulated bit. The modem convention maps a positive deviation to 0, so
    /// the slicer output is complemented on the way in.
    pub fn rx_bit(&mut self, bit: u32, sink: &mut dyn RecordSink) {
        self.rx_data = (self.rx_data << 1) | (!bit & 1);
        let word = if self.opts.invert != self.polarity_inverted { !self.rx_data } else { self.rx_data };

        self.stats.total_bits_received += 1;
        match self.state {
            State::NoSync => self.search_sync(word),
            _ => self.in_sync(word, sink),
        }
    }

    /// Repair a codeword at the configured correction level, maintaining statistics.
    fn repair(&mut self, codeword: &mut u32) -> bool {
        let syndrome_clean = self.bch.syndrome(*codeword) == 0;
        if !syndrome_clean {
            self.stats.total_error_count += 1;
        }
        match self.bch.correct(codeword, self.opts.error_correction) {
            Some(0) => true,
            Some(n) => {
                self.stats.corrected_error_count += 1;
                if n == 1 {
                    self.stats.corrected_1bit_error_count += 1;
                } else {
                    self.stats.corrected_2bit_error_count += 1;
                }
                true
            }
            None => {
                self.stats.uncorrected_error_count += 1;
                false
            }
        }
    }

    fn search_sync(&mut self, word: u32) {
        self.stats.bits_processed_while_not_synced += 1;

        let mut candidate = word;
        self.repair(&mut candidate);
        if candidate == POCSAG_SYNC {
            debug!("{}: acquired sync", self.name);
            self.state = State::Sync;
            return;
        }

        // Auto polarity: unless an inversion was forced, also try the complemented window.
        if !self.opts.invert && !self.polarity_inverted {
            let mut candidate = !word;
            self.repair(&mut candidate);
            if candidate == POCSAG_SYNC {
                debug!("{}: acquired sync (inverted polarity)", self.name);
                self.polarity_inverted = true;
                self.state = State::Sync;
            }
        }
    }

    fn in_sync(&mut self, word: u32, sink: &mut dyn RecordSink) {
        self.stats.bits_processed_while_synced += 1;

        // Wait for a full 32-bit codeword.
        self.rx_bit = (self.rx_bit + 1) % 32;
        if self.rx_bit != 0 {
            return;
        }

        // Sync plus 16 batch codewords make 17 words per batch.
        let rxword = self.rx_word;
        self.rx_word = (self.rx_word + 1) % 17;

        if self.state == State::Sync {
            self.state = State::Address;
        }

        let mut codeword = word;
        if !self.repair(&mut codeword) {
            // Arbitration lost.
            if self.state != State::LostSync {
                self.state = State::LosingSync;
            }
        } else if self.state == State::LostSync {
            debug!("{}: recovered sync", self.name);
            self.state = State::Address;
        }

        if codeword == POCSAG_SYNC {
            return;
        }

        loop {
            match self.state {
                State::LosingSync => {
                    debug!("{}: losing sync", self.name);
                    self.emit_page(sink, false);
                    self.reset_page();
                    self.state = State::LostSync;
                    return;
                }
                State::LostSync => {
                    debug!("{}: lost sync", self.name);
                    self.state = State::NoSync;
                    self.rx_word = 0;
                    self.polarity_inverted = false;
                    return;
                }
                State::Address => {
                    if codeword == POCSAG_IDLE {
                        return;
                    }
                    if codeword & MESSAGE_FLAG != 0 {
                        // A message codeword with no preceding address: partial decode.
                        self.address = PageAddress::Partial;
                        self.state = State::Message;
                        continue;
                    }
                    let function = ((codeword >> 11) & 3) as u8;
                    let address = ((codeword >> 10) & 0x1f_fff8) | ((rxword >> 1) & 7);
                    self.address = PageAddress::Known { address, function };
                    self.state = State::Message;
                    return;
                }
                State::Message => {
                    if codeword & MESSAGE_FLAG == 0 {
                        // An address or idle codeword ends the open page.
                        self.emit_page(sink, true);
                        self.reset_page();
                        self.state = State::Address;
                        continue;
                    }
                    if self.page.is_full() {
                        warn!("{}: message too long", self.name);
                        self.emit_page(sink, true);
                        self.reset_page();
                        self.state = State::Address;
                        continue;
                    }
                    self.page.push_codeword(codeword);
                    return;
                }
                State::Sync | State::NoSync => return,
            }
        }
    }

    fn reset_page(&mut self) {
        self.page.clear();
        self.address = PageAddress::None;
    }

    /// Render and submit the open page, if any. `sync` is false when the page is being
    /// flushed because synchronisation was lost.
    fn emit_page(&mut self, sink: &mut dyn RecordSink, sync: bool) {
        let (address, function, partial) = match self.address {
            PageAddress::None => return,
            PageAddress::Partial => (0, 0, true),
            PageAddress::Known { address, function } => (address, function, false),
        };

        if !self.opts.show_partial && (partial || !sync) {
            return;
        }
        if self.opts.prune_empty && self.page.is_empty() {
            return;
        }

        let head = if partial {
            format!("{}: Address:       -  Function: -", self.name)
        } else {
            format!("{}: Address: {:7}  Function: {:1}", self.name, address, function)
        };

        if self.page.is_empty() {
            let mut record = Record::new(self.name);
            record.text = head;
            if !partial {
                record.push_field("address", address.to_string());
                record.push_field("function", function.to_string());
            }
            sink.submit(record);
            return;
        }

        let (num_text, num_score) = render_numeric(&self.page);
        let (alpha_text, alpha_score) = render_alpha(&self.page, self.opts.charset);
        let (skyper_text, skyper_score) = render_skyper(&self.page, self.opts.charset);

        let unsure = num_score < PLAUSIBLE && alpha_score < PLAUSIBLE && skyper_score < PLAUSIBLE;
        if unsure && self.opts.heuristic_prune {
            return;
        }

        let mode = self.opts.mode;
        let mut candidates: Vec<(&str, String, i32)> = Vec::new();

        if mode == PocsagMessageMode::Numeric
            || (mode == PocsagMessageMode::Standard && function == 0)
            || (mode == PocsagMessageMode::Auto && (num_score >= PLAUSIBLE || unsure))
        {
            candidates.push(("Numeric", format!("Numeric: {}", num_text), num_score));
        }
        if mode == PocsagMessageMode::Alpha
            || (mode == PocsagMessageMode::Standard && function != 0)
            || (mode == PocsagMessageMode::Auto && (alpha_score >= skyper_score || unsure))
        {
            candidates.push(("Alpha", format!("Alpha:   {}", alpha_text), alpha_score));
        }
        if mode == PocsagMessageMode::Skyper
            || (mode == PocsagMessageMode::Auto && (skyper_score >= alpha_score || unsure))
        {
            candidates.push(("Skyper", format!("Skyper:  {}", skyper_text), skyper_score));
        }

        for (kind, body, score) in candidates {
            let mut record = Record::new(self.name);
            record.text = format!("{}  {}", head, body);
            if !partial {
                record.push_field("address", address.to_string());
                record.push_field("function", function.to_string());
            }
            record.push_field("mode", kind.to_ascii_lowercase());
            let message = match kind {
                "Numeric" => &num_text,
                "Alpha" => &alpha_text,
                _ => &skyper_text,
            };
            record.push_field("message", message.clone());
            if mode == PocsagMessageMode::Auto {
                record.push_field("certainty", score.to_string());
            }
            if !sync {
                record.push_field("lost_sync", "true");
            }
            sink.submit(record);
        }
    }

    /// Log the accumulated decode statistics.
    pub fn log_stats(&self) {
        if self.stats.total_error_count == 0 {
            return;
        }
        debug!(
            "{} stats: checked errors {}, corrected {} (1bit {}, 2bit {}), uncorrectable {}, \
             bits total {} (synced {}, unsynced {})",
            self.name,
            self.stats.total_error_count,
            self.stats.corrected_error_count,
            self.stats.corrected_1bit_error_count,
            self.stats.corrected_2bit_error_count,
            self.stats.uncorrected_error_count,
            self.stats.total_bits_received,
            self.stats.bits_processed_while_synced,
            self.stats.bits_processed_while_not_synced,
        );
    }
}
