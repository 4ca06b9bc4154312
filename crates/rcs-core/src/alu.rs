//! Shared 8-bit arithmetic logic unit.
//!
//! The 6502 and Z80 place their flags in different bits of the status
//! register, so the ALU is configured with the bit masks to use for
//! carry, overflow, parity, half-carry, zero, and sign. Operations do
//! not own any registers; callers pass the status byte by reference and
//! the same helper serves both CPUs.

/// Convert from a binary-coded decimal value.
#[must_use]
pub const fn from_bcd(v: u8) -> u8 {
    (v >> 4) * 10 + (v & 0x0f)
}

/// Convert to a binary-coded decimal value.
#[must_use]
pub const fn to_bcd(v: u8) -> u8 {
    let v = v % 100;
    (v / 10) << 4 | (v % 10)
}

/// Add `in1` and a carry to `in0`. Returns the sum along with the
/// carry, half-carry, and signed overflow outs.
#[must_use]
pub const fn add8(in0: u8, in1: u8, carry: bool) -> (u8, bool, bool, bool) {
    let sum = in0 as u16 + in1 as u16 + carry as u16;
    let out = sum as u8;
    let carry_out = sum > 0xff;
    let carry_ins = out ^ in0 ^ in1;
    let half = carry_ins & 0x10 != 0;
    let overflow = ((carry_ins >> 7) ^ carry_out as u8) & 1 != 0;
    (out, carry_out, half, overflow)
}

/// Subtract `in1` and a borrow from `in0`. Returns the difference along
/// with the borrow, half-borrow, and signed overflow outs.
#[must_use]
pub const fn sub8(in0: u8, in1: u8, borrow: bool) -> (u8, bool, bool, bool) {
    let (out, carry, half, overflow) = add8(in0, !in1, !borrow);
    (out, !carry, !half, overflow)
}

/// 8-bit ALU with configurable flag positions.
#[derive(Debug, Clone, Copy)]
pub struct Alu {
    /// Carry flag mask.
    pub c: u8,
    /// Overflow flag mask.
    pub v: u8,
    /// Parity flag mask.
    pub p: u8,
    /// Half-carry flag mask.
    pub h: u8,
    /// Zero flag mask.
    pub z: u8,
    /// Sign flag mask.
    pub s: u8,
    /// If false, a borrow is used during subtraction when the carry is
    /// set. If true, a borrow is used when the carry is clear.
    pub clear_borrow: bool,
    /// Mask of flags left untouched by operations.
    pub ignore: u8,
}

impl Alu {
    /// Add `in1` to `in0`, plus one if the carry flag is set. Updates
    /// C, H, V, P, Z, and S.
    pub fn add(&self, flags: &mut u8, in0: u8, in1: u8) -> u8 {
        let carry_in = u8::from(*flags & self.c != 0);
        let sum = u16::from(in0) + u16::from(in1) + u16::from(carry_in);
        let out = sum as u8;
        let carry_out = sum > 0xff;
        // Carry into each bit position; bit 4 is the half carry, and the
        // carry into bit 7 xor the carry out of bit 7 is the overflow.
        let carry_ins = out ^ in0 ^ in1;
        let half_carry = carry_ins & 0x10 != 0;
        let overflow = ((carry_ins >> 7) ^ u8::from(carry_out)) & 1 != 0;

        self.set(flags, self.c, carry_out);
        self.set(flags, self.h, half_carry);
        self.set(flags, self.v, overflow);
        self.set(flags, self.p, out.count_ones() % 2 == 0);
        self.set(flags, self.z, out == 0);
        self.set(flags, self.s, out & 0x80 != 0);
        out
    }

    /// Subtract `in1` from `in0`, honoring the borrow convention.
    pub fn sub(&self, flags: &mut u8, in0: u8, in1: u8) -> u8 {
        if !self.clear_borrow {
            *flags ^= self.c;
        }
        let out = self.add(flags, in0, !in1);
        if !self.clear_borrow {
            *flags ^= self.c;
        }
        // The half carry of the complement addition is the inverse of
        // the half borrow.
        if self.h & self.ignore == 0 {
            *flags ^= self.h;
        }
        out
    }

    /// Binary-coded decimal addition. Results are undefined unless both
    /// inputs are valid BCD. Updates C, Z, and S.
    pub fn add_bcd(&self, flags: &mut u8, in0: u8, in1: u8) -> u8 {
        let carry = u8::from(*flags & self.c != 0);
        let r = u16::from(from_bcd(in0)) + u16::from(from_bcd(in1)) + u16::from(carry);
        let out = to_bcd(r as u8);
        self.set(flags, self.c, r > 99);
        self.set(flags, self.z, out == 0);
        self.set(flags, self.s, out & 0x80 != 0);
        out
    }

    /// Binary-coded decimal subtraction; borrows when the carry is
    /// clear. Updates C (clear on borrow), Z, and S.
    pub fn sub_bcd(&self, flags: &mut u8, in0: u8, in1: u8) -> u8 {
        let borrow = i16::from(*flags & self.c == 0);
        let mut r = i16::from(from_bcd(in0)) - i16::from(from_bcd(in1)) - borrow;
        let no_borrow = r >= 0;
        if r < 0 {
            r += 100;
        }
        let out = to_bcd(r as u8);
        self.set(flags, self.c, no_borrow);
        self.set(flags, self.z, out == 0);
        self.set(flags, self.s, out & 0x80 != 0);
        out
    }

    /// Logical AND. Updates P, Z, and S.
    pub fn and(&self, flags: &mut u8, in0: u8, in1: u8) -> u8 {
        let r = in0 & in1;
        self.szp(flags, r);
        r
    }

    /// Logical OR. Updates P, Z, and S.
    pub fn or(&self, flags: &mut u8, in0: u8, in1: u8) -> u8 {
        let r = in0 | in1;
        self.szp(flags, r);
        r
    }

    /// Logical exclusive OR. Updates P, Z, and S.
    pub fn xor(&self, flags: &mut u8, in0: u8, in1: u8) -> u8 {
        let r = in0 ^ in1;
        self.szp(flags, r);
        r
    }

    /// Add one. Updates P, Z, and S only.
    pub fn inc(&self, flags: &mut u8, in0: u8) -> u8 {
        let r = in0.wrapping_add(1);
        self.szp(flags, r);
        r
    }

    /// Subtract one. Updates P, Z, and S only.
    pub fn dec(&self, flags: &mut u8, in0: u8) -> u8 {
        let r = in0.wrapping_sub(1);
        self.szp(flags, r);
        r
    }

    /// Pass a value through, updating P, Z, and S from it.
    pub fn pass(&self, flags: &mut u8, in0: u8) {
        self.szp(flags, in0);
    }

    /// Shift left one bit. Bit 0 becomes the carry in; bit 7 shifts out
    /// into the carry. Updates C, P, Z, and S.
    pub fn shift_left(&self, flags: &mut u8, in0: u8) -> u8 {
        let carry_out = in0 & 0x80 != 0;
        let mut r = in0 << 1;
        if *flags & self.c != 0 {
            r |= 1;
        }
        self.szp(flags, r);
        self.set(flags, self.c, carry_out);
        r
    }

    /// Shift right one bit. Bit 7 becomes the carry in; bit 0 shifts out
    /// into the carry. Updates C, P, Z, and S.
    pub fn shift_right(&self, flags: &mut u8, in0: u8) -> u8 {
        let carry_out = in0 & 0x01 != 0;
        let mut r = in0 >> 1;
        if *flags & self.c != 0 {
            r |= 0x80;
        }
        self.szp(flags, r);
        self.set(flags, self.c, carry_out);
        r
    }

    fn szp(&self, flags: &mut u8, v: u8) {
        self.set(flags, self.p, v.count_ones() % 2 == 0);
        self.set(flags, self.z, v == 0);
        self.set(flags, self.s, v & 0x80 != 0);
    }

    fn set(&self, flags: &mut u8, flag: u8, value: bool) {
        if flag & self.ignore != 0 {
            return;
        }
        if value {
            *flags |= flag;
        } else {
            *flags &= !flag;
        }
    }
}
