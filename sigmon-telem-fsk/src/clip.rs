// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLIP: calling line identity presentation per ETSI EN 300 659-3, carried over V.23 FSK.
//!
//! The presentation layer is a checksummed TLV message: a message type octet, a length
//! octet, then parameters of (type, length, value). Only the parameters relevant to
//! monitoring are rendered; unknown ones are skipped by their length octet.

use log::debug;

use sigmon_core::checksum::sum256;
use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator};
use sigmon_core::record::{Record, RecordSink};
use sigmon_core::sample::BlockView;

use crate::frontend::FskFrontEnd;
use crate::uart::UartFramer;

const SAMPLE_RATE: u32 = 22050;
/// V.23: 1200 baud, mark 1200 Hz, space 2200 Hz.
const BAUD: u32 = 1200;
const SUBSAMP: u32 = 2;
const CORRLEN: usize = (SAMPLE_RATE / BAUD) as usize;

fn push_text(out: &mut String, value: &[u8]) {
    for &b in value {
        if (32..128).contains(&b) {
            out.push(b as char);
        } else {
            out.push('.');
        }
    }
}

fn absence_reason(value: &[u8]) -> &'static str {
    match value.first() {
        Some(b'O') => " Unavailable",
        Some(b'P') => " Private (CLIR involved)",
        _ => " (indicator unknown)",
    }
}

/// Parse and render one presentation-layer message. Returns `None` when the checksum fails
/// or the message type is unknown.
pub fn render_clip(name: &str, packet: &[u8]) -> Option<String> {
    if packet.len() < 5 {
        return None;
    }
    if sum256(packet) != 0 {
        debug!("{}: bad presentation checksum", name);
        return None;
    }

    // Strip the trailing checksum octet.
    let body = &packet[..packet.len() - 1];
    let msg_type = body[0];

    let mut out = format!("{}: ", name);
    match msg_type {
        0x80 => out.push_str("CS"),  // call setup
        0x82 => out.push_str("MWI"), // message waiting indicator
        0x04 | 0x84 | 0x85 => out.push_str(&format!("RVD len={}", body.len() - 1)),
        0x86 => out.push_str(&format!("AOC len={}", body.len() - 1)),
        0x89 => out.push_str(&format!("SMS len={}", body.len() - 1)),
        other => {
            debug!("{}: unknown message type {:#04x}", name, other);
            return None;
        }
    }

    if body.len() < 2 {
        return Some(out);
    }
    let msg_len = body[1] as usize;
    let mut params = &body[2..];
    if msg_len > params.len() {
        out.push_str(" broken packet");
        return Some(out);
    }
    params = &params[..msg_len];

    while params.len() >= 2 {
        let ptype = params[0];
        let plen = (params[1] as usize).min(params.len() - 2);
        let value = &params[2..2 + plen];
        params = &params[2 + plen..];

        match ptype {
            0x01 => {
                out.push_str(" DATE=");
                push_text(&mut out, value);
            }
            0x02 => {
                out.push_str(" CID=");
                push_text(&mut out, value);
            }
            0x03 => {
                out.push_str(" CDN=");
                push_text(&mut out, value);
            }
            0x04 => {
                out.push_str(" RACLI=");
                push_text(&mut out, value);
                out.push_str(absence_reason(value));
            }
            0x07 => {
                out.push_str(" CNT=");
                push_text(&mut out, value);
            }
            0x08 => {
                out.push_str(" RACNT=");
                push_text(&mut out, value);
                out.push_str(absence_reason(value));
            }
            0x0b => {
                out.push_str(" VI=");
                out.push_str(match value.first() {
                    Some(0x00) => "Deactivation (indicator off)",
                    Some(0xff) => "Activation (indicator on)",
                    _ => "(indicator unknown)",
                });
            }
            0x11 => {
                out.push_str(" CT=");
                out.push_str(match value.first() {
                    Some(0x00) => "Voice call",
                    Some(0x02) => "Ring-back-when-free call",
                    Some(0x81) => "Message waiting call",
                    _ => "(indicator unknown)",
                });
            }
            0x13 => {
                if let Some(&n) = value.first() {
                    out.push_str(&format!(" NMSS={} messages waiting", n));
                }
            }
            0x50 => {
                out.push_str(" SMS=");
                push_text(&mut out, value);
            }
            other => {
                debug!("{}: skipping parameter {:#04x} len {}", name, other, plen);
            }
        }
    }

    Some(out)
}

pub struct ClipDemodulator {
    desc: DemodDescriptor,
    frontend: FskFrontEnd,
    uart: UartFramer,
}

impl ClipDemodulator {
    pub fn new(info: DemodInfo) -> ClipDemodulator {
        ClipDemodulator {
            desc: DemodDescriptor {
                info,
                sample_rate: SAMPLE_RATE,
                overlap: CORRLEN,
                wants_ints: false,
            },
            frontend: FskFrontEnd::new(SAMPLE_RATE, 1200.0, 2200.0, BAUD, SUBSAMP, CORRLEN),
            uart: UartFramer::new(),
        }
    }
}

impl Demodulator for ClipDemodulator {
    fn descriptor(&self) -> &DemodDescriptor {
        &self.desc
    }

    fn process(&mut self, block: &BlockView<'_>, sink: &mut dyn RecordSink) {
        let name = self.desc.info.name;
        let uart = &mut self.uart;
        self.frontend.run(block, |bit| {
            if let Some(packet) = uart.rx_bit(bit) {
                if let Some(text) = render_clip(name, packet) {
                    let mut record = Record::new(name);
                    record.text = text;
                    sink.submit(record);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::render_clip;

    /// Build a call-setup message with date and calling-line parameters.
    fn call_setup() -> Vec<u8> {
        let mut msg = vec![0x80u8];
        let date = b"11281430";
        let cid = b"0123456789";
        msg.push((2 + date.len() + 2 + cid.len()) as u8);
        msg.push(0x01);
        msg.push(date.len() as u8);
        msg.extend_from_slice(date);
        msg.push(0x02);
        msg.push(cid.len() as u8);
        msg.extend_from_slice(cid);

        let sum = super::sum256(&msg);
        msg.push(0u8.wrapping_sub(sum));
        msg
    }

    #[test]
    fn verify_call_setup_rendering() {
        let line = render_clip("CLIPFSK", &call_setup()).unwrap();
        assert_eq!(line, "CLIPFSK: CS DATE=11281430 CID=0123456789");
    }

    #[test]
    fn verify_checksum_rejected() {
        let mut msg = call_setup();
        msg[3] ^= 0x01;
        assert!(render_clip("CLIPFSK", &msg).is_none());
    }
}
