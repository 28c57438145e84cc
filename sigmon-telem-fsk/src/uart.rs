// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Asynchronous start/stop framing (8N1). Shared by the CLIP decoder and usable as a plain
//! byte-dump decoder.
//!
//! Outside a byte, a 1→0 edge is a start bit; two idle or two break bits end the current
//! packet. Inside a byte, bits fill a shift register with a marker bit that surfaces after
//! eight data bits; the ninth bit must be a 1 stop bit or the byte is dropped as a framing
//! error.

use log::debug;

const MAX_PACKET: usize = 512;

pub struct UartFramer {
    rxbitstream: u32,
    rxbitbuf: u32,
    in_byte: bool,
    buf: Vec<u8>,
    done: Vec<u8>,
}

impl UartFramer {
    pub fn new() -> UartFramer {
        UartFramer {
            rxbitstream: 0,
            rxbitbuf: 0,
            in_byte: false,
            buf: Vec::with_capacity(MAX_PACKET),
            done: Vec::with_capacity(MAX_PACKET),
        }
    }

    fn take_packet(&mut self) -> Option<&[u8]> {
        if self.buf.is_empty() {
            return None;
        }
        std::mem::swap(&mut self.buf, &mut self.done);
        self.buf.clear();
        Some(&self.done)
    }

    /// Feed one bit. Returns a completed packet when the line goes idle (or breaks) after
    /// one or more bytes.
    pub fn rx_bit(&mut self, bit: u32) -> Option<&[u8]> {
        self.rxbitstream = (self.rxbitstream << 1) | (bit & 1);

        if !self.in_byte {
            return match self.rxbitstream & 0x03 {
                0x02 => {
                    // Start bit.
                    self.in_byte = true;
                    self.rxbitbuf = 0x100;
                    None
                }
                // No start bit, or consecutive stop bits: flush the packet.
                0x00 | 0x03 => self.take_packet(),
                _ => None,
            };
        }

        if self.rxbitstream & 1 != 0 {
            self.rxbitbuf |= 0x200;
        }
        if self.rxbitbuf & 1 != 0 {
            if self.buf.len() >= MAX_PACKET {
                debug!("uart: packet size too large");
                self.in_byte = false;
                return self.take_packet();
            }
            if self.rxbitstream & 1 == 0 {
                debug!("uart: stop bit is 0, bad framing");
                self.in_byte = false;
                return None;
            }
            self.buf.push((self.rxbitbuf >> 1) as u8);
            self.rxbitbuf = 0x100;
            self.in_byte = false;
            return None;
        }
        self.rxbitbuf >>= 1;
        None
    }
}

impl Default for UartFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a byte dump the way the plain UART decoder does: printable characters verbatim,
/// carriage returns as line breaks, everything else as hex.
pub fn render_bytes(packet: &[u8]) -> String {
    let mut out = String::new();
    let mut seen_text = false;
    for &b in packet {
        if (32..128).contains(&b) {
            out.push(b as char);
        } else if b == 13 {
            if seen_text {
                out.push('\n');
            }
            seen_text = false;
            continue;
        } else {
            out.push_str(&format!("[0x{:02X}]", b));
        }
        if b >= 32 {
            seen_text = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::UartFramer;

    /// 8N1-encode bytes with leading and trailing idle.
    pub(crate) fn encode(bytes: &[u8]) -> Vec<u32> {
        let mut bits = vec![1u32; 16];
        for &byte in bytes {
            bits.push(0); // start
            for i in 0..8 {
                bits.push(u32::from(byte >> i) & 1);
            }
            bits.push(1); // stop
        }
        bits.extend_from_slice(&[1; 16]);
        bits
    }

    #[test]
    fn verify_framing_round_trip() {
        let mut uart = UartFramer::new();
        let mut packets: Vec<Vec<u8>> = Vec::new();
        for bit in encode(b"RING") {
            if let Some(p) = uart.rx_bit(bit) {
                packets.push(p.to_vec());
            }
        }
        assert_eq!(packets, vec![b"RING".to_vec()]);
    }

    #[test]
    fn verify_bad_stop_bit_drops_byte() {
        let mut uart = UartFramer::new();
        let mut bits = encode(b"A");
        // Corrupt the stop bit of the byte.
        let stop_at = 16 + 9;
        bits[stop_at] = 0;
        let mut packets = 0;
        for bit in bits {
            if uart.rx_bit(bit).is_some() {
                packets += 1;
            }
        }
        assert_eq!(packets, 0);
    }
}
