// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FLEX outer synchronisation.
//!
//! The 64-bit SYNC1 word has the form `AAAA:BBBBBBBB:CCCC` where `BBBBBBBB` is always the
//! marker 0xA6C6AAAA and `AAAA ^ CCCC` is 0xFFFF. The `AAAA` code selects the baud rate and
//! FSK level count of the rest of the frame.

use log::debug;

/// The fixed 32-bit marker inside SYNC1.
pub const SYNC_MARKER: u32 = 0xa6c6_aaaa;

/// Transmission mode of the frame body, keyed by the SYNC1 code.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyncInfo {
    /// The matched sync code.
    pub sync: u32,
    /// Baud rate of SYNC2 and DATA.
    pub baud: u32,
    /// FSK level count of SYNC2 and DATA (2 or 4).
    pub levels: u32,
    /// True when the signal polarity is inverted; symbols are rectified as 3 − sym.
    pub polarity: bool,
}

/// Known sync codes. Each entry matches with Hamming distance < 4.
const MODES: [(u16, u32, u32); 5] = [
    (0x870c, 1600, 2),
    (0xb068, 1600, 4),
    (0x7b18, 3200, 2),
    (0xdea0, 3200, 4),
    (0x4c7c, 3200, 4),
];

/// Check a 64-bit symbol window against the SYNC1 layout. The marker and the
/// code/complement pair must each match with Hamming distance < 4. Returns the sync code,
/// or 0 when there is no match.
pub fn sync_check(buf: u64) -> u32 {
    let marker = ((buf & 0x0000_ffff_ffff_0000) >> 16) as u32;
    let codehigh = ((buf & 0xffff_0000_0000_0000) >> 48) as u32;
    let codelow = !(buf & 0xffff) as u32 & 0xffff;

    if (marker ^ SYNC_MARKER).count_ones() < 4 && (codelow ^ codehigh).count_ones() < 4 {
        codehigh
    } else {
        0
    }
}

/// Match a sync code against the mode table, again with Hamming distance < 4 per row.
pub fn decode_mode(sync_code: u32) -> Option<SyncInfo> {
    for &(code, baud, levels) in &MODES {
        if (u32::from(code) ^ sync_code).count_ones() < 4 {
            return Some(SyncInfo { sync: sync_code, baud, levels, polarity: false });
        }
    }
    debug!("FLEX: sync code {:#06x} not found in mode table", sync_code);
    None
}

#[cfg(test)]
mod tests {
    use super::{decode_mode, sync_check};

    /// SYNC1 for 1600/2: code, marker, complemented code.
    const SYNC1_1600_2: u64 = 0x870c_a6c6_aaaa_78f3;

    #[test]
    fn verify_exact_sync() {
        assert_eq!(sync_check(SYNC1_1600_2), 0x870c);
        let info = decode_mode(0x870c).unwrap();
        assert_eq!((info.baud, info.levels), (1600, 2));
    }

    #[test]
    fn verify_three_bit_tolerance() {
        // Flipping any 3 bits of the 64-bit word must still sync: at most 3 land in one of
        // the two Hamming-checked fields.
        for i in 0..64u64 {
            for j in (i + 1)..64 {
                for k in (j + 1)..64 {
                    let corrupted = SYNC1_1600_2 ^ (1 << i) ^ (1 << j) ^ (1 << k);
                    let code = sync_check(corrupted);
                    assert_ne!(code, 0, "bits {} {} {}", i, j, k);
                    assert!(decode_mode(code).is_some(), "bits {} {} {}", i, j, k);
                }
            }
        }
    }

    #[test]
    fn verify_nine_bit_rejection_in_marker() {
        // Flipping 9 bits spread across the marker and code fields must never match.
        let corrupted = SYNC1_1600_2
            ^ (0x1ff << 20); // 9 bits inside the marker
        assert_eq!(sync_check(corrupted), 0);

        let corrupted = SYNC1_1600_2 ^ (0xf << 28) ^ (0xf8 << 48) ^ 1;
        assert_eq!(sync_check(corrupted), 0);
    }

    #[test]
    fn verify_random_noise_rejected() {
        // An alternating dotting pattern must not be mistaken for sync.
        assert_eq!(sync_check(0xaaaa_aaaa_aaaa_aaaa), 0);
        assert_eq!(sync_check(0x5555_5555_5555_5555), 0);
        assert_eq!(sync_check(0), 0);
        assert_eq!(sync_check(u64::MAX), 0);
    }
}
