// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-phase page decoding: Block Information Word, address/vector pairs, and the page-type
//! specific payload renderers.

use log::debug;

use sigmon_core::record::{Record, RecordSink};

use crate::demod::FlexDemodulator;
use crate::group::GROUP_CAPCODE_BASE;
use crate::phase::{active_phases, PhaseSet, PHASE_WORDS};

/// Highest valid capcode.
const CAPCODE_MAX: i64 = 4_297_068_542;

/// Variable-length BCD digit alphabet.
const FLEX_BCD: &[u8; 16] = b"0123456789 U -][";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PageType {
    Secure,
    ShortInstruction,
    Tone,
    StandardNumeric,
    SpecialNumeric,
    Alphanumeric,
    Binary,
    NumberedNumeric,
}

impl PageType {
    fn from_bits(bits: u32) -> PageType {
        match bits & 0x7 {
            0 => PageType::Secure,
            1 => PageType::ShortInstruction,
            2 => PageType::Tone,
            3 => PageType::StandardNumeric,
            4 => PageType::SpecialNumeric,
            5 => PageType::Alphanumeric,
            6 => PageType::Binary,
            _ => PageType::NumberedNumeric,
        }
    }

    fn is_alphanumeric(self) -> bool {
        matches!(self, PageType::Alphanumeric | PageType::Secure)
    }

    fn is_numeric(self) -> bool {
        matches!(self, PageType::StandardNumeric | PageType::SpecialNumeric | PageType::NumberedNumeric)
    }

    fn is_tone(self) -> bool {
        self == PageType::Tone
    }
}

/// Escape a 7-bit character into an alphanumeric page body. Tabs, newlines and carriage
/// returns are escaped so a record stays on one line; other non-printable bytes are dropped
/// at the point of storage.
fn push_page_char(out: &mut String, ch: u8) {
    match ch {
        0x09 => out.push_str("\\t"),
        0x0a => out.push_str("\\n"),
        0x0d => out.push_str("\\r"),
        0x20..=0x7e => out.push(ch as char),
        _ => {}
    }
}

impl FlexDemodulator {
    /// Decode the phases populated by the current transmission mode.
    pub(crate) fn decode_data(&mut self, sink: &mut dyn RecordSink) {
        let set = active_phases(self.sync.baud, self.sync.levels);
        let phases: [(PhaseSet, char); 4] =
            [(PhaseSet::A, 'A'), (PhaseSet::B, 'B'), (PhaseSet::C, 'C'), (PhaseSet::D, 'D')];

        for (flag, name) in phases {
            if !set.contains(flag) {
                continue;
            }
            let buf = match name {
                'A' => self.data.phase_a.buf,
                'B' => self.data.phase_b.buf,
                'C' => self.data.phase_c.buf,
                _ => self.data.phase_d.buf,
            };
            self.decode_phase(name, &buf, sink);
        }
    }

    fn decode_phase(&mut self, phase_name: char, buf: &[u32; PHASE_WORDS], sink: &mut dyn RecordSink) {
        debug!("FLEX: decoding phase {}", phase_name);

        let mut words = *buf;
        for (i, word) in words.iter_mut().enumerate() {
            match self.bch.correct_algebraic(word) {
                Some(fixed) => {
                    if fixed > 0 {
                        debug!("FLEX: phase {} fixed {} errors at block {}", phase_name, fixed, i);
                        self.bits_corrected += u64::from(fixed);
                    }
                    *word &= 0x1f_ffff;
                }
                None => {
                    debug!("FLEX: phase {} data corruption at block {}", phase_name, i);
                    self.words_uncorrectable += 1;
                    return;
                }
            }
        }

        // Block Information Word. All-zero or all-one means the phase is idle.
        let biw = words[0];
        if biw == 0 || biw == 0x1f_ffff {
            return;
        }

        let aoffset = ((biw >> 8) & 0x3) as usize + 1;
        let voffset = ((biw >> 10) & 0x3f) as usize;
        if voffset < aoffset {
            debug!("FLEX: invalid BIW");
            return;
        }
        debug!(
            "FLEX: BlockInfoWord: (phase {}) BIW:{:08X} AW {:02} VW {:02} (up to {} pages)",
            phase_name,
            biw,
            aoffset,
            voffset,
            voffset - aoffset
        );

        let mut i = aoffset;
        while i < voffset {
            let aiw = words[i];
            if aiw == 0 || aiw == 0x1f_ffff {
                i += 1;
                continue;
            }

            let aiw = i64::from(aiw);
            let long_address =
                aiw < 0x8001 || (aiw > 0x1e_0000 && aiw < 0x1f_0001) || aiw > 0x1f_7ffe;

            let capcode = if long_address {
                let upper = i64::from(words[i + 1]) ^ 0x1f_ffff;
                (upper << 15) + 2_068_480 + aiw
            } else {
                aiw - 0x8000
            };
            if !(0..=CAPCODE_MAX).contains(&capcode) {
                debug!("FLEX: invalid address, capcode out of range {}", capcode);
                i += 1;
                continue;
            }

            let groupbit = capcode - GROUP_CAPCODE_BASE;
            let groupmessage = (0..16i64).contains(&groupbit);
            if groupmessage && long_address {
                debug!("FLEX: group message with a long address, abandoning phase");
                return;
            }

            // Vector Information Word for the address at offset i.
            let j = voffset + i - aoffset;
            if j >= PHASE_WORDS {
                debug!("FLEX: invalid BIW, vector field past the phase buffer");
                return;
            }
            let viw = words[j];
            let page_type = PageType::from_bits(viw >> 4);
            let mut mw1 = ((viw >> 7) & 0x7f) as usize;
            let mut len = ((viw >> 14) & 0x7f) as usize;

            let hdr;
            if long_address {
                // The header is carried by the second vector word.
                hdr = j + 1;
                len = len.saturating_sub(1);
            } else {
                // The header is the first message word.
                hdr = mw1;
                mw1 += 1;
                if !groupmessage {
                    len = len.saturating_sub(1);
                }
            }
            if hdr >= PHASE_WORDS {
                debug!("FLEX: invalid VIW");
                i += 1;
                continue;
            }
            let frag = (words[hdr] >> 11) & 0x3;
            let cont = (words[hdr] >> 10) & 0x1;
            debug!(
                "FLEX: VIW {}: type:{:?} mw1:{} len:{} frag:{} cont:{}",
                j, page_type, mw1, len, frag, cont
            );

            if page_type == PageType::ShortInstruction {
                let assigned_frame = (viw >> 10) & 0x7f;
                let groupbit = ((viw >> 17) & 0x7f) as usize;
                self.groups.enrol(groupbit, capcode, assigned_frame, self.fiw.cycleno, self.fiw.frameno);
                i += 1;
                continue;
            }

            // A message field that starts inside the address or vector blocks is invalid.
            if len < 1 || mw1 < voffset + (voffset - aoffset) || mw1 >= PHASE_WORDS {
                debug!("FLEX: invalid VIW");
                i += 1;
                continue;
            }
            if mw1 + len > PHASE_WORDS {
                len = PHASE_WORDS - mw1;
            }

            if page_type.is_alphanumeric() {
                self.parse_alphanumeric(
                    &words,
                    phase_name,
                    mw1,
                    len,
                    frag,
                    cont,
                    capcode,
                    groupmessage.then_some(groupbit as usize),
                    sink,
                );
            } else if page_type.is_numeric() {
                self.parse_numeric(&words, phase_name, j, page_type, long_address, capcode, sink);
            } else if page_type.is_tone() {
                self.parse_tone_only(&words, phase_name, j, long_address, capcode, sink);
            } else {
                self.parse_unknown(&words, phase_name, mw1, len, capcode, sink);
            }

            // A long address spans two address and two vector slots.
            if long_address {
                i += 1;
            }
            i += 1;
        }
    }

    /// Start a record with the fields shared by every page type.
    fn page_record(&self, phase_name: char, capcode: i64, kind: &str) -> Record {
        let mut record = Record::new("FLEX");
        record.push_field("baud", self.sync.baud.to_string());
        record.push_field("levels", self.sync.levels.to_string());
        record.push_field("phase", phase_name.to_string());
        record.push_field("cycle", self.fiw.cycleno.to_string());
        record.push_field("frame", self.fiw.frameno.to_string());
        record.push_field("capcode", format!("{:010}", capcode));
        record.push_field("type", kind.to_string());
        record
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_alphanumeric(
        &mut self,
        words: &[u32; PHASE_WORDS],
        phase_name: char,
        mw1: usize,
        len: usize,
        frag: u32,
        cont: u32,
        capcode: i64,
        groupbit: Option<usize>,
        sink: &mut dyn RecordSink,
    ) {
        let frag_flag = match (cont, frag) {
            (0, 3) => 'K', // complete and ready to deliver
            (0, _) => 'C', // continuation of an earlier fragment
            _ => 'F',      // fragment awaiting continuation
        };

        let mut message = String::new();
        for k in 0..len {
            let dw = words[mw1 + k];
            // The first character slot of a complete message's first word is unused.
            if k > 0 || frag != 0x03 {
                push_page_char(&mut message, (dw & 0x7f) as u8);
            }
            push_page_char(&mut message, ((dw >> 7) & 0x7f) as u8);
            push_page_char(&mut message, ((dw >> 14) & 0x7f) as u8);
        }

        // A group page delivers the same body to every capcode queued on the group bit.
        let group_capcodes = match groupbit {
            Some(bit) => self.groups.take(bit),
            None => Vec::new(),
        };

        if message.is_empty() {
            return;
        }

        let mut capcode_field = format!("{:010}", capcode);
        for cap in &group_capcodes {
            capcode_field.push_str(&format!(" {:010}", cap));
        }

        let mut record = self.page_record(phase_name, capcode, "ALN");
        record.text = format!(
            "FLEX|{}|{}/{}/{}/{}|{:02}.{:03}|{}|ALN|{}",
            record.timestamp_str(),
            self.sync.baud,
            self.sync.levels,
            phase_name,
            frag_flag,
            self.fiw.cycleno,
            self.fiw.frameno,
            capcode_field,
            message
        );
        record.push_field("fragment", frag_flag.to_string());
        record.push_field("message", message);
        if !group_capcodes.is_empty() {
            record.push_field(
                "group_capcodes",
                group_capcodes.iter().map(|c| format!("{:010}", c)).collect::<Vec<_>>().join(" "),
            );
        }
        sink.submit(record);
    }

    fn parse_numeric(
        &mut self,
        words: &[u32; PHASE_WORDS],
        phase_name: char,
        j: usize,
        page_type: PageType,
        long_address: bool,
        capcode: i64,
        sink: &mut dyn RecordSink,
    ) {
        let w1_field = words[j] >> 7;
        let mut w1 = (w1_field & 0x7f) as usize;
        // A numeric message is at most 7 words.
        let mut w2 = ((w1_field >> 7) & 0x07) as usize + w1;

        // First dataword: from the message field, or the second vector word for a long
        // address.
        let mut dw;
        if !long_address {
            if w1 >= PHASE_WORDS {
                debug!("FLEX: invalid numeric VIW");
                return;
            }
            dw = words[w1];
            w1 += 1;
            w2 += 1;
        } else {
            if j + 1 >= PHASE_WORDS {
                debug!("FLEX: invalid numeric VIW");
                return;
            }
            dw = words[j + 1];
        }
        w2 = w2.min(PHASE_WORDS - 1);

        let mut message = String::new();
        let mut digit = 0u8;
        // Two header bits precede the digits, ten for numbered numeric pages; plus the
        // 4-bit pipeline fill of the digit register.
        let mut count = if page_type == PageType::NumberedNumeric { 4 + 10 } else { 4 + 2 };
        let mut k = w1;
        while k <= w2 {
            for _ in 0..21 {
                digit = (digit >> 1) & 0x0f;
                if dw & 0x01 != 0 {
                    digit ^= 0x08;
                }
                dw >>= 1;
                count -= 1;
                if count == 0 {
                    if digit != 0x0c {
                        // 0x0C is fill; it is not rendered.
                        message.push(FLEX_BCD[digit as usize] as char);
                    }
                    count = 4;
                }
            }
            dw = words[k];
            k += 1;
        }

        let mut record = self.page_record(phase_name, capcode, "NUM");
        record.text = format!(
            "FLEX|{}|{}/{}/{}  |{:02}.{:03}|{:010}|NUM|{}",
            record.timestamp_str(),
            self.sync.baud,
            self.sync.levels,
            phase_name,
            self.fiw.cycleno,
            self.fiw.frameno,
            capcode,
            message
        );
        record.push_field("message", message);
        sink.submit(record);
    }

    fn parse_tone_only(
        &mut self,
        words: &[u32; PHASE_WORDS],
        phase_name: char,
        j: usize,
        long_address: bool,
        capcode: i64,
        sink: &mut dyn RecordSink,
    ) {
        let mut message = String::new();

        // Subtype 0 carries a short numeric body inside the vector word itself.
        let subtype = (words[j] >> 7) & 0x03;
        if subtype == 0 {
            for shift in [9, 13, 17] {
                let digit = (words[j] >> shift) & 0x0f;
                message.push(FLEX_BCD[digit as usize] as char);
            }
            if long_address && j + 1 < PHASE_WORDS {
                for shift in [0, 4, 8, 12, 16] {
                    let digit = (words[j + 1] >> shift) & 0x0f;
                    message.push(FLEX_BCD[digit as usize] as char);
                }
            }
        }

        let mut record = self.page_record(phase_name, capcode, "TON");
        record.text = format!(
            "FLEX|{}|{}/{}/{}  |{:02}.{:03}|{:010}|TON|{}",
            record.timestamp_str(),
            self.sync.baud,
            self.sync.levels,
            phase_name,
            self.fiw.cycleno,
            self.fiw.frameno,
            capcode,
            message
        );
        record.push_field("message", message);
        sink.submit(record);
    }

    fn parse_unknown(
        &mut self,
        words: &[u32; PHASE_WORDS],
        phase_name: char,
        mw1: usize,
        len: usize,
        capcode: i64,
        sink: &mut dyn RecordSink,
    ) {
        let body: Vec<String> = (0..len).map(|k| format!("{:08x}", words[mw1 + k])).collect();
        let body = body.join(" ");

        let mut record = self.page_record(phase_name, capcode, "UNK");
        record.text = format!(
            "FLEX|{}|{}/{}/{}  |{:02}.{:03}|{:010}|UNK|{}",
            record.timestamp_str(),
            self.sync.baud,
            self.sync.levels,
            phase_name,
            self.fiw.cycleno,
            self.fiw.frameno,
            capcode,
            body
        );
        record.push_field("message", body);
        sink.submit(record);
    }
}
