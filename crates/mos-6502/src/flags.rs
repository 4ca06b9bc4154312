//! Status register flag bits.

/// Carry flag.
pub const C: u8 = 1 << 0;

/// Zero flag.
pub const Z: u8 = 1 << 1;

/// Interrupt disable flag.
pub const I: u8 = 1 << 2;

/// Decimal mode flag.
pub const D: u8 = 1 << 3;

/// Break flag, only meaningful on the stack copy of the status.
pub const B: u8 = 1 << 4;

/// Bit 5, hard wired on.
pub const U: u8 = 1 << 5;

/// Overflow flag.
pub const V: u8 = 1 << 6;

/// Negative flag.
pub const N: u8 = 1 << 7;
