//! Flag register bits and common flag computations.

/// Carry flag.
pub const CF: u8 = 1 << 0;

/// Add/subtract flag, set after a subtraction.
pub const NF: u8 = 1 << 1;

/// Parity/overflow flag.
pub const PF: u8 = 1 << 2;

/// Undocumented bit 3, usually a copy of result bit 3.
pub const XF: u8 = 1 << 3;

/// Half-carry flag.
pub const HF: u8 = 1 << 4;

/// Undocumented bit 5, usually a copy of result bit 5.
pub const YF: u8 = 1 << 5;

/// Zero flag.
pub const ZF: u8 = 1 << 6;

/// Sign flag.
pub const SF: u8 = 1 << 7;

/// True if the value has an even number of set bits.
#[must_use]
pub const fn parity(v: u8) -> bool {
    v.count_ones() % 2 == 0
}

/// Sign, zero, and the undocumented bits 5 and 3, taken from a value.
#[must_use]
pub const fn sz53(v: u8) -> u8 {
    let mut f = v & (SF | YF | XF);
    if v == 0 {
        f |= ZF;
    }
    f
}

/// Like [`sz53`], with parity included.
#[must_use]
pub const fn sz53p(v: u8) -> u8 {
    let mut f = sz53(v);
    if parity(v) {
        f |= PF;
    }
    f
}
