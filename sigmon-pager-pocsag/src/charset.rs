// Sigmon
// Copyright (c) 2024-2025 The Project Sigmon Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ISO 646 character tables for POCSAG alphanumeric text. The national variants differ from
//! the US / IRV base only at the positions 0x23–0x24, 0x40, 0x5B–0x5E, 0x60 and 0x7B–0x7E.

use sigmon_core::demod::PocsagCharset;

/// US / IRV (1991) base table. Control characters render as visible mnemonics.
#[rustfmt::skip]
const US: [&str; 128] = [
    "<NUL>", "<SOH>", "<STX>", "<ETX>", "<EOT>", "<ENQ>", "<ACK>", "<BEL>",
    "<BS>",  "<HT>",  "<LF>",  "<VT>",  "<FF>",  "<CR>",  "<SO>",  "<SI>",
    "<DLE>", "<DC1>", "<DC2>", "<DC3>", "<DC4>", "<NAK>", "<SYN>", "<ETB>",
    "<CAN>", "<EM>",  "<SUB>", "<ESC>", "<FS>",  "<GS>",  "<RS>",  "<US>",
    " ", "!", "\"", "#", "$", "%", "&", "'",
    "(", ")", "*",  "+", ",", "-", ".", "/",
    "0", "1", "2",  "3", "4", "5", "6", "7",
    "8", "9", ":",  ";", "<", "=", ">", "?",
    "@", "A", "B",  "C", "D", "E", "F", "G",
    "H", "I", "J",  "K", "L", "M", "N", "O",
    "P", "Q", "R",  "S", "T", "U", "V", "W",
    "X", "Y", "Z",  "[", "\\", "]", "^", "_",
    "`", "a", "b",  "c", "d", "e", "f", "g",
    "h", "i", "j",  "k", "l", "m", "n", "o",
    "p", "q", "r",  "s", "t", "u", "v", "w",
    "x", "y", "z",  "{", "|", "}", "~", "<DEL>",
];

/// The table for a national variant.
pub fn table(charset: PocsagCharset) -> [&'static str; 128] {
    let mut tab = US;
    match charset {
        PocsagCharset::Us => {}
        PocsagCharset::De => {
            tab[0x5b] = "AE";
            tab[0x5c] = "OE";
            tab[0x5d] = "UE";
            tab[0x7b] = "ae";
            tab[0x7c] = "oe";
            tab[0x7d] = "ue";
            tab[0x7e] = "ss";
        }
        PocsagCharset::Se => {
            tab[0x5b] = "AE";
            tab[0x5c] = "OE";
            tab[0x5d] = "AO";
            tab[0x7b] = "ae";
            tab[0x7c] = "oe";
            tab[0x7d] = "ao";
        }
        PocsagCharset::Fr => {
            tab[0x24] = "£";
            tab[0x40] = "à";
            tab[0x5b] = "°";
            tab[0x5c] = "ç";
            tab[0x5d] = "§";
            tab[0x60] = "µ";
            tab[0x7b] = "é";
            tab[0x7c] = "ù";
            tab[0x7d] = "è";
            tab[0x7e] = "¨";
        }
        PocsagCharset::Si => {
            tab[0x40] = "Ž";
            tab[0x5b] = "Š";
            tab[0x5e] = "Č";
            tab[0x60] = "ž";
            tab[0x7b] = "š";
            tab[0x7e] = "č";
        }
    }
    tab
}

#[cfg(test)]
mod tests {
    use super::table;
    use sigmon_core::demod::PocsagCharset;

    #[test]
    fn verify_variants_only_touch_national_positions() {
        let us = table(PocsagCharset::Us);
        for variant in [PocsagCharset::De, PocsagCharset::Se, PocsagCharset::Fr, PocsagCharset::Si] {
            let tab = table(variant);
            for (i, (a, b)) in us.iter().zip(tab.iter()).enumerate() {
                let national = matches!(i, 0x23 | 0x24 | 0x40 | 0x5b..=0x5e | 0x60 | 0x7b..=0x7e);
                if !national {
                    assert_eq!(a, b, "variant {:?} differs at {:#x}", variant, i);
                }
            }
        }
    }
}
