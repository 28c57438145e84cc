// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FMS (Funkmeldesystem) vehicle status telegrams per TR-BOS, carried as 1200 baud FSK with
//! 1200 Hz for a 1 and 1800 Hz for a 0.
//!
//! A telegram is a 19-bit sync sequence followed by 48 bits protected by a CRC-7. A failed
//! CRC is retried with every single-bit flip before the telegram is dropped.

use log::debug;

use sigmon_core::demod::{DemodDescriptor, DemodInfo, Demodulator};
use sigmon_core::record::{Record, RecordSink};
use sigmon_core::sample::BlockView;

use crate::frontend::FskFrontEnd;

const SAMPLE_RATE: u32 = 22050;
const BAUD: u32 = 1200;
const SUBSAMP: u32 = 2;
const CORRLEN: usize = (SAMPLE_RATE / BAUD) as usize;

/// 19-bit telegram sync sequence.
const SYNC_PATTERN: u32 = 0x7ff1a;

const SERVICES: [&str; 16] = [
    "UNKNOWN       ",
    "POLIZEI       ",
    "BGS           ",
    "BKA           ",
    "KatS          ",
    "ZOLL          ",
    "Feuerwehr     ",
    "THW           ",
    "ASB           ",
    "Rotkreuz      ",
    "Johanniter    ",
    "Malteser      ",
    "DLRG          ",
    "Rettungsdienst",
    "ZivilSchutz   ",
    "FernWirk      ",
];

const STATES_TO_CONTROL: [&str; 16] = [
    "Notfall       ",
    "Einbuchen     ",
    "Bereit Wache  ",
    "Einsatz Ab    ",
    "Am EinsatzZiel",
    "Sprechwunsch  ",
    "Nicht Bereit  ",
    "Patient aufgen",
    "Am TranspZiel ",
    "Arzt Aufgenomm",
    "Vorbertg Folge",
    "Beendig  Folge",
    "Sonder 1      ",
    "Sonder 2      ",
    "AutomatQuittun",
    "Sprechtaste   ",
];

const STATES_TO_VEHICLE: [&str; 16] = [
    "StatusAbfrage ",
    "SammelRuf     ",
    "Einrucken/Abbr",
    "Ubernahme     ",
    "Kommen Draht  ",
    "Fahre Wache   ",
    "Sprechaufford ",
    "Lagemeldung   ",
    "FernWirk 1    ",
    "FernWirk 2    ",
    "Vorbertg TXT  ",
    "Beendig  TXT  ",
    "KurzTXT C     ",
    "KurzTXT D     ",
    "KurzTXT E     ",
    "AutomatQuittun",
];

const SHORT_INFO: [&str; 4] = [
    "I  (ohneNA,ohneSIGNAL)",
    "II (ohneNA,mit SIGNAL)",
    "III(mit NA,ohneSIGNAL)",
    "IV (mit NA,mit SIGNAL)",
];

fn state_name(state_id: u8, loc_id: u8) -> &'static str {
    match state_id {
        0x0 => "Sachsen         ",
        0x1 => "Bund            ",
        0x2 => "Baden-Wurtemberg",
        0x3 => "Bayern 1        ",
        0x4 => "Berlin          ",
        0x5 => "Bremen          ",
        0x6 => "Hamburg         ",
        0x7 => "Hessen          ",
        0x8 => "Niedersachsen   ",
        0x9 => "Nordrhein-Wesfal",
        0xa => "Rheinland-Pfalz ",
        0xb => "Schleswig-Holste",
        0xc => "Saarland        ",
        0xd => "Bayern 2        ",
        0xe => {
            if loc_id < 50 {
                "Meckl-Vorpommern"
            } else {
                "Sachsen-Anhalt  "
            }
        }
        _ => {
            if loc_id < 50 {
                "Brandenburg     "
            } else {
                "Thuringen       "
            }
        }
    }
}

/// CRC-7 over the 48 telegram bits (x⁷+x⁵+x²+1 LFSR). True when the register ends at zero.
pub fn crc_ok(message: u64) -> bool {
    let mut crc = [0u8; 7];
    for i in 0..48 {
        let doinvert = ((message >> (16 + i)) & 1) as u8 ^ crc[6];
        crc[6] = crc[5] ^ doinvert;
        crc[5] = crc[4];
        crc[4] = crc[3];
        crc[3] = crc[2];
        crc[2] = crc[1] ^ doinvert;
        crc[1] = crc[0];
        crc[0] = doinvert;
    }
    crc.iter().all(|&b| b == 0)
}

/// Render one 48-bit telegram (stored in the top bits of `message`).
fn render_fms(name: &str, message: u64) -> String {
    let service_id = ((message >> 16) & 0xf) as usize;
    let state_id = ((message >> 20) & 0xf) as u8;
    let loc_id = ((message >> 24) & 0xff) as u8;
    let vehicle_id = ((message >> 32) & 0xffff) as u16;
    let state = ((message >> 48) & 0xf) as usize;
    let direction = ((message >> 50) & 0x1) as u8;
    let short_info = ((message >> 51) & 0x3) as usize;
    let crc = ((message >> 54) & 0x3f) as u8;

    // The on-air location identity has its nibbles swapped.
    let loc = (loc_id << 4) | (loc_id >> 4);

    let mut out = format!("{}: {:08x}{:04x} (", name, message >> 32, (message >> 16) & 0xffff);
    out.push_str(&format!("{:x}={}\t", service_id, SERVICES[service_id]));
    out.push_str(&format!("{:x}={}\t", state_id, state_name(state_id, loc_id)));
    out.push_str(&format!("Ort 0x{:2x}={:03}\t", loc, loc));
    out.push_str(&format!(
        "FZG {:x}{:x}{:x}{:x}\t",
        vehicle_id & 0xf,
        (vehicle_id >> 4) & 0xf,
        (vehicle_id >> 8) & 0xf,
        (vehicle_id >> 12) & 0xf
    ));
    let states = if direction == 0 { &STATES_TO_CONTROL } else { &STATES_TO_VEHICLE };
    out.push_str(&format!("Status {:x}={}\t", state, states[state]));
    out.push_str(if direction != 0 { "1=LST->FZG\t" } else { "0=FZG->LST\t" });
    out.push_str(&format!("{:x}={}\t", short_info, SHORT_INFO[short_info]));
    out.push_str(") ");

    if crc_ok(message) {
        out.push_str("CRC correct");
        if message & 1 != 0 {
            out.push_str(" AFTER SWAPPING ONE BIT");
        }
    } else {
        out.push_str(&format!("CRC INCORRECT ({:x})", crc));
    }
    out
}

pub struct FmsProtocol {
    name: &'static str,
    rxstate: u32,
    rxbitstream: u64,
    rxbitcount: u32,
}

impl FmsProtocol {
    pub fn new(name: &'static str) -> FmsProtocol {
        FmsProtocol { name, rxstate: 0, rxbitstream: 0, rxbitcount: 0 }
    }

    pub fn rx_bit(&mut self, bit: u32, sink: &mut dyn RecordSink) {
        self.rxstate = ((self.rxstate << 1) & 0x000f_fffe) | bit;

        if self.rxstate & 0x0007_ffff == SYNC_PATTERN {
            debug!("{}: sync", self.name);
            self.rxbitstream = 0;
            self.rxbitcount = 1;
            return;
        }
        if self.rxbitcount == 0 {
            return;
        }

        // Telegram bits append from the left so the message reads out in field order.
        self.rxbitstream = (self.rxbitstream >> 1) | (u64::from(bit) << 63);
        self.rxbitcount += 1;
        if self.rxbitcount < 49 {
            return;
        }

        let mut message = self.rxbitstream;
        if !crc_ok(message) {
            // Try every single-bit repair.
            let mut fixed = false;
            for i in 0..48 {
                if crc_ok(message ^ (1u64 << (i + 16))) {
                    debug!("{}: corrected a one bit error by swapping bit {}", self.name, i);
                    // The low bit marks a repaired telegram.
                    message = (message ^ (1u64 << (i + 16))) | 1;
                    fixed = true;
                    break;
                }
            }
            if !fixed {
                debug!("{}: unable to correct CRC error", self.name);
            }
        }

        let text = render_fms(self.name, message);
        if text.contains("CRC correct") {
            let mut record = Record::new(self.name);
            record.push_field(
                "telegram",
                format!("{:08x}{:04x}", message >> 32, (message >> 16) & 0xffff),
            );
            record.text = text;
            sink.submit(record);
        } else {
            debug!("{}: {}", self.name, text);
        }

        self.rxbitcount = 0;
        self.rxstate = 0;
    }
}

pub struct FmsDemodulator {
    desc: DemodDescriptor,
    frontend: FskFrontEnd,
    protocol: FmsProtocol,
}

impl FmsDemodulator {
    pub fn new(info: DemodInfo) -> FmsDemodulator {
        FmsDemodulator {
            desc: DemodDescriptor {
                info,
                sample_rate: SAMPLE_RATE,
                overlap: CORRLEN,
                wants_ints: false,
            },
            frontend: FskFrontEnd::new(SAMPLE_RATE, 1200.0, 1800.0, BAUD, SUBSAMP, CORRLEN),
            protocol: FmsProtocol::new(info.name),
        }
    }
}

impl Demodulator for FmsDemodulator {
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
    use super::crc_ok;

    /// Compute the CRC-7 for the low 41 telegram bits and return the full 48-bit telegram.
    fn with_crc(payload: u64) -> u64 {
        for crc in 0..0x80u64 {
            let candidate = (payload & 0x3ff_ffff_ffff) | (crc << 41);
            if crc_ok(candidate << 16) {
                return candidate << 16;
            }
        }
        panic!("no CRC satisfies the telegram");
    }

    #[test]
    fn verify_crc_detects_and_locates_errors() {
        let telegram = with_crc(0x0123_4567_89a);
        assert!(crc_ok(telegram));
        for i in 0..48 {
            assert!(!crc_ok(telegram ^ (1u64 << (16 + i))), "bit {}", i);
        }
    }
}
