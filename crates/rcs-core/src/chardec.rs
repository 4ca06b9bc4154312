//! Character decoders for the memory dump gutter.
//!
//! A decoder maps a byte to a character and a printable flag. Machines
//! register their own decoders with the machine's registry; `ascii` is
//! always available.

/// Decode a byte into a character and whether it is printable.
pub type CharDecoder = fn(u8) -> (char, bool);

/// Printable 7-bit ASCII.
#[must_use]
pub fn ascii_decoder(code: u8) -> (char, bool) {
    if (0x20..=0x7e).contains(&code) {
        (code as char, true)
    } else {
        ('\0', false)
    }
}

/// Bytes 1–26 decode to A–Z. Handy for tests and text adventures that
/// store letters as ordinals.
#[must_use]
pub fn az26_decoder(code: u8) -> (char, bool) {
    if (1..=26).contains(&code) {
        ((64 + code) as char, true)
    } else {
        ('\0', false)
    }
}

/// Commodore character sets.
///
/// PETSCII has two modes. Unshifted shows only uppercase; shifted swaps
/// the letter ranges so lowercase appears where uppercase was. Screen
/// codes are the VIC's internal encoding with letters starting at 1.
/// Graphics characters are reported as unprintable.
pub mod petscii {
    /// Unshifted PETSCII: digits, punctuation, and uppercase letters.
    #[must_use]
    pub fn petscii_decoder(code: u8) -> (char, bool) {
        match code {
            0x20..=0x3f => (code as char, true),
            // Both letter banks show uppercase in unshifted mode
            0x41..=0x5a | 0xc1..=0xda => ((code as char).to_ascii_uppercase(), true),
            _ => ('\0', false),
        }
    }

    /// Shifted PETSCII: $41–$5A is lowercase, $C1–$DA is uppercase.
    #[must_use]
    pub fn petscii_shifted_decoder(code: u8) -> (char, bool) {
        match code {
            0x20..=0x3f => (code as char, true),
            0x41..=0x5a => ((code as char).to_ascii_lowercase(), true),
            0xc1..=0xda => (((code - 0x80) as char).to_ascii_uppercase(), true),
            _ => ('\0', false),
        }
    }

    /// Unshifted screen codes: 0 is '@', 1–26 are A–Z, $20–$3F as ASCII.
    #[must_use]
    pub fn screen_decoder(code: u8) -> (char, bool) {
        match code {
            0x00 => ('@', true),
            0x01..=0x1a => ((0x40 + code) as char, true),
            0x1b => ('[', true),
            0x1d => (']', true),
            0x20..=0x3f => (code as char, true),
            _ => ('\0', false),
        }
    }

    /// Shifted screen codes: 1–26 are a–z, $41–$5A are A–Z.
    #[must_use]
    pub fn screen_shifted_decoder(code: u8) -> (char, bool) {
        match code {
            0x00 => ('@', true),
            0x01..=0x1a => ((0x60 + code) as char, true),
            0x1b => ('[', true),
            0x1d => (']', true),
            0x20..=0x3f => (code as char, true),
            0x41..=0x5a => (code as char, true),
            _ => ('\0', false),
        }
    }
}
