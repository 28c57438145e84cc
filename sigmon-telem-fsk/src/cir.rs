// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CIR rail telemetry per TB/T 3052-2002, carried as 600 baud FFSK (1300 Hz one, 1700 Hz
//! zero).
//!
//! A frame is a 51-bit alternating preamble, the 31-bit frame sync 0x0DD4259F, then 26-bit
//! groups of 16 data bits plus 10 BCH(26,16) parity bits. The first group's low byte is the
//! payload length; the byte stream ends with a CRC-16 over the payload.

use log::debug;

use sigmon_core::checksum::crc16_xmodem;
use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator};
use sigmon_core::fec::{Bch2616, Decoded};
use sigmon_core::record::{Record, RecordSink};
use sigmon_core::sample::BlockView;

use crate::frontend::FskFrontEnd;

const SAMPLE_RATE: u32 = 22050;
const BAUD: u32 = 600;
const SUBSAMP: u32 = 1;
const CORRLEN: usize = (SAMPLE_RATE / BAUD) as usize;

const PREAMBLE: u32 = 0x5555_5555;
const FRAME_SYNC: u32 = 0x0dd4_259f;

const MAX_PAYLOAD: usize = 260;

/// `length + (length % 2) + 2`: the payload padded to a 16-bit boundary plus the CRC.
fn actual_rx_length(length: usize) -> usize {
    length + (length % 2) + 2
}

pub struct CirProtocol {
    name: &'static str,
    bch: Bch2616,
    sync_buffer: [u32; 2],
    rxbitstream: u32,
    rxbitcount: u32,
    rxbuf: Vec<u8>,
    rx_err: Vec<u8>,
    rxlength: usize,
    fec_errors: u32,
}

impl CirProtocol {
    pub fn new(name: &'static str) -> CirProtocol {
        CirProtocol {
            name,
            bch: Bch2616::new(),
            sync_buffer: [0; 2],
            rxbitstream: 0,
            rxbitcount: 0,
            rxbuf: Vec::with_capacity(MAX_PAYLOAD),
            rx_err: Vec::with_capacity(MAX_PAYLOAD / 2),
            rxlength: 0,
            fec_errors: 0,
        }
    }

    pub fn rx_bit(&mut self, bit: u32, sink: &mut dyn RecordSink) {
        if self.rxbitcount == 0 {
            // Hunting for sync over the last 64 bits.
            self.sync_buffer[1] = (self.sync_buffer[1] << 1) | (self.sync_buffer[0] >> 31);
            self.sync_buffer[0] = (self.sync_buffer[0] << 1) | bit;

            let preamble_errors = (self.sync_buffer[1] ^ PREAMBLE).count_ones();
            let frame_sync_errors = (self.sync_buffer[0] ^ FRAME_SYNC).count_ones();
            if preamble_errors + frame_sync_errors <= 4
                || (preamble_errors <= 6 && frame_sync_errors <= 2)
            {
                debug!(
                    "{}: sync ok, errors {} {}",
                    self.name, preamble_errors, frame_sync_errors
                );
                self.sync_buffer = [0; 2];
                self.rxbitstream = 0;
                self.rxbitcount = 1;
                self.rxbuf.clear();
                self.rx_err.clear();
                self.fec_errors = 0;
            } else if preamble_errors + frame_sync_errors <= 10 {
                debug!(
                    "{}: near sync, errors {} {}",
                    self.name, preamble_errors, frame_sync_errors
                );
            }
            return;
        }

        self.rxbitstream = (self.rxbitstream << 1) | bit;
        if self.rxbitcount % 26 == 0 {
            let (decoded, errors) = match self.bch.decode(self.rxbitstream & 0x3ff_ffff) {
                Decoded::Ok { value, corrected } => (value, corrected),
                Decoded::Uncorrectable { raw } => (raw, 3),
            };
            // A group the FEC cannot repair is taken raw; three of them abort the frame.
            if errors >= 3 {
                self.fec_errors += 1;
                if self.fec_errors >= 3 {
                    debug!("{}: too many FEC errors", self.name);
                    self.rxbitcount = 0;
                    return;
                }
            }
            self.rxbitstream = 0;

            self.rxbuf.push((decoded >> 8) as u8);
            self.rxbuf.push(decoded as u8);
            self.rx_err.push(errors);

            if self.rxbitcount == 26 {
                // First group: mode word and payload length.
                let length = (decoded & 0xff) as usize;
                if length == 0 {
                    debug!("{}: zero length", self.name);
                    self.rxbitcount = 0;
                    return;
                }
                self.rxlength = length;
                debug!("{}: length {}", self.name, length);
            } else if self.rxbuf.len() == actual_rx_length(self.rxlength) {
                let crc = crc16_xmodem(&self.rxbuf[..self.rxlength]);
                let hi = self.rxbuf[self.rxlength];
                let lo = self.rxbuf[self.rxlength + 1];
                if (crc >> 8) as u8 == hi && crc as u8 == lo {
                    self.emit(sink);
                } else {
                    let per_group: Vec<String> = self
                        .rxbuf
                        .chunks(2)
                        .zip(&self.rx_err)
                        .map(|(b, e)| format!("{:02x}{:02x}-{}", b[0], b[1], e))
                        .collect();
                    debug!("{}: bad crc, groups {}", self.name, per_group.join(" "));
                }
                self.rxbitcount = 0;
                return;
            }
        }
        self.rxbitcount += 1;
    }

    /// Submit the payload plus its CRC as a hex dump record.
    fn emit(&self, sink: &mut dyn RecordSink) {
        let shown = &self.rxbuf[..self.rxlength + 2];
        let hex: Vec<String> = shown.iter().map(|b| format!("{:02x}", b)).collect();

        let mut record = Record::new(self.name);
        record.text = format!("{}({}):{}", self.name, shown.len(), hex.join(" "));
        record.push_field("mode", format!("{:02x}", self.rxbuf[0]));
        record.push_field("length", self.rxlength.to_string());
        record.push_field("payload", hex.join(" "));
        sink.submit(record);
    }
}

pub struct CirDemodulator {
    desc: DemodDescriptor,
    frontend: FskFrontEnd,
    protocol: CirProtocol,
}

impl CirDemodulator {
    pub fn new(info: DemodInfo) -> CirDemodulator {
        CirDemodulator {
            desc: DemodDescriptor {
                info,
                sample_rate: SAMPLE_RATE,
                overlap: CORRLEN,
                wants_ints: false,
            },
            frontend: FskFrontEnd::new(SAMPLE_RATE, 1300.0, 1700.0, BAUD, SUBSAMP, CORRLEN),
            protocol: CirProtocol::new(info.name),
        }
    }
}

impl Demodulator for CirDemodulator {
    fn descriptor(&self) -> &DemodDescriptor {
        &self.desc
    }

    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink) {
        let protocol = &mut self.protocol;
        self.frontend.run(block, |bit| protocol.rx_bit(bit, sink));
    }
}

#[cfg(test)]
mod tests {
    use super::{CirProtocol, FRAME_SYNC};
    use sigmon_core::checksum::crc16_xmodem;
    use sigmon_core::fec::Bch2616;
    use sigmon_core::record::VecSink;

    /// Build the bit stream of one frame. The length field counts the mode, length, and
    /// data bytes; the CRC covers exactly those bytes and follows them on the wire.
    fn frame_bits(mode: u8, data: &[u8]) -> Vec<u32> {
        let bch = Bch2616::new();

        let length = 2 + data.len();
        let mut bytes: Vec<u8> = vec![mode, length as u8];
        bytes.extend_from_slice(data);
        let crc = crc16_xmodem(&bytes);
        if bytes.len() % 2 != 0 {
            // The CRC spans a group boundary for odd lengths; the final group is padded.
            bytes.push((crc >> 8) as u8);
            bytes.push(crc as u8);
            bytes.push(0);
        } else {
            bytes.push((crc >> 8) as u8);
            bytes.push(crc as u8);
        }

        let mut bits: Vec<u32> = Vec::new();
        // 51-bit alternating preamble phased so the sync window reads 0101...01, then the
        // 31-bit frame sync.
        for i in 0..51 {
            bits.push(((i + 1) & 1) as u32);
        }
        for i in (0..31).rev() {
            bits.push((FRAME_SYNC >> i) & 1);
        }
        for chunk in bytes.chunks(2) {
            let word = (u16::from(chunk[0]) << 8) | u16::from(chunk[1]);
            let coded = bch.encode(word);
            for i in (0..26).rev() {
                bits.push((coded >> i) & 1);
            }
        }
        bits
    }

    #[test]
    fn verify_frame_decode() {
        let data = [0x11u8, 0x22, 0x33, 0x44];
        let mut protocol = CirProtocol::new("CIRFSK");
        let mut sink = VecSink::new();
        for bit in frame_bits(0x2a, &data) {
            protocol.rx_bit(bit, &mut sink);
        }

        assert_eq!(sink.records.len(), 1);
        let text = &sink.records[0].text;
        assert!(text.starts_with("CIRFSK(8):2a 06 "), "{}", text);
        assert!(text.contains("11 22 33 44"), "{}", text);
    }

    #[test]
    fn verify_two_bit_errors_per_group_corrected() {
        let data = [0xde, 0xad, 0xbe, 0xef];
        let mut bits = frame_bits(0x01, &data);
        // Flip two bits inside the first coded group (after 51 + 31 sync bits).
        bits[82] ^= 1;
        bits[100] ^= 1;

        let mut protocol = CirProtocol::new("CIRFSK");
        let mut sink = VecSink::new();
        for bit in bits {
            protocol.rx_bit(bit, &mut sink);
        }
        assert_eq!(sink.records.len(), 1);
        assert!(sink.records[0].text.contains("de ad be ef"), "{}", sink.records[0].text);
    }
}
