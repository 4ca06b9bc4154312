//! Opcode dispatch and instruction implementations.

use rcs_core::{add8, from_bcd, sub8, to_bcd, Memory};

use crate::cpu::{Mos6502, VEC_IRQ};
use crate::dasm::Mode;
use crate::flags::{B, C, D, I, N, U, V, Z};

impl Mos6502 {
    /// Execute a fetched opcode. Returns false if the opcode is not a
    /// legal instruction.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn execute(&mut self, mem: &mut Memory, opcode: u8) -> bool {
        use Mode::{
            Absolute, AbsoluteX, AbsoluteY, Accumulator, Immediate, IndirectX, IndirectY,
            ZeroPage, ZeroPageX, ZeroPageY,
        };

        match opcode {
            // ADC - add memory to accumulator with carry
            0x69 => self.read_op(mem, Immediate, Self::adc),
            0x65 => self.read_op(mem, ZeroPage, Self::adc),
            0x75 => self.read_op(mem, ZeroPageX, Self::adc),
            0x6d => self.read_op(mem, Absolute, Self::adc),
            0x7d => self.read_op(mem, AbsoluteX, Self::adc),
            0x79 => self.read_op(mem, AbsoluteY, Self::adc),
            0x61 => self.read_op(mem, IndirectX, Self::adc),
            0x71 => self.read_op(mem, IndirectY, Self::adc),

            // AND - and memory with accumulator
            0x29 => self.read_op(mem, Immediate, Self::and),
            0x25 => self.read_op(mem, ZeroPage, Self::and),
            0x35 => self.read_op(mem, ZeroPageX, Self::and),
            0x2d => self.read_op(mem, Absolute, Self::and),
            0x3d => self.read_op(mem, AbsoluteX, Self::and),
            0x39 => self.read_op(mem, AbsoluteY, Self::and),
            0x21 => self.read_op(mem, IndirectX, Self::and),
            0x31 => self.read_op(mem, IndirectY, Self::and),

            // ASL - arithmetic shift left
            0x0a => self.modify_op(mem, Accumulator, Self::asl),
            0x06 => self.modify_op(mem, ZeroPage, Self::asl),
            0x16 => self.modify_op(mem, ZeroPageX, Self::asl),
            0x0e => self.modify_op(mem, Absolute, Self::asl),
            0x1e => self.modify_op(mem, AbsoluteX, Self::asl),

            // Branches
            0x90 => self.branch(mem, self.sr & C == 0), // BCC
            0xb0 => self.branch(mem, self.sr & C != 0), // BCS
            0xf0 => self.branch(mem, self.sr & Z != 0), // BEQ
            0x30 => self.branch(mem, self.sr & N != 0), // BMI
            0xd0 => self.branch(mem, self.sr & Z == 0), // BNE
            0x10 => self.branch(mem, self.sr & N == 0), // BPL
            0x50 => self.branch(mem, self.sr & V == 0), // BVC
            0x70 => self.branch(mem, self.sr & V != 0), // BVS

            // BIT - test bits in memory with accumulator
            0x24 => self.read_op(mem, ZeroPage, Self::bit),
            0x2c => self.read_op(mem, Absolute, Self::bit),

            // BRK - force interrupt. The byte after the opcode is
            // padding; the pushed return address skips it.
            0x00 => {
                self.fetch(mem);
                self.interrupt(mem, VEC_IRQ, true);
            }

            // Flag operations
            0x18 => self.sr &= !C, // CLC
            0xd8 => self.sr &= !D, // CLD
            0x58 => self.sr &= !I, // CLI
            0xb8 => self.sr &= !V, // CLV
            0x38 => self.sr |= C,  // SEC
            0xf8 => self.sr |= D,  // SED
            0x78 => self.sr |= I,  // SEI

            // CMP - compare memory with accumulator
            0xc9 => self.compare_op(mem, Immediate, |c| c.a),
            0xc5 => self.compare_op(mem, ZeroPage, |c| c.a),
            0xd5 => self.compare_op(mem, ZeroPageX, |c| c.a),
            0xcd => self.compare_op(mem, Absolute, |c| c.a),
            0xdd => self.compare_op(mem, AbsoluteX, |c| c.a),
            0xd9 => self.compare_op(mem, AbsoluteY, |c| c.a),
            0xc1 => self.compare_op(mem, IndirectX, |c| c.a),
            0xd1 => self.compare_op(mem, IndirectY, |c| c.a),

            // CPX - compare memory with X
            0xe0 => self.compare_op(mem, Immediate, |c| c.x),
            0xe4 => self.compare_op(mem, ZeroPage, |c| c.x),
            0xec => self.compare_op(mem, Absolute, |c| c.x),

            // CPY - compare memory with Y
            0xc0 => self.compare_op(mem, Immediate, |c| c.y),
            0xc4 => self.compare_op(mem, ZeroPage, |c| c.y),
            0xcc => self.compare_op(mem, Absolute, |c| c.y),

            // DEC - decrement memory
            0xc6 => self.modify_op(mem, ZeroPage, Self::dec),
            0xd6 => self.modify_op(mem, ZeroPageX, Self::dec),
            0xce => self.modify_op(mem, Absolute, Self::dec),
            0xde => self.modify_op(mem, AbsoluteX, Self::dec),

            // DEX, DEY
            0xca => {
                self.x = self.x.wrapping_sub(1);
                self.update_nz(self.x);
            }
            0x88 => {
                self.y = self.y.wrapping_sub(1);
                self.update_nz(self.y);
            }

            // EOR - exclusive or memory with accumulator
            0x49 => self.read_op(mem, Immediate, Self::eor),
            0x45 => self.read_op(mem, ZeroPage, Self::eor),
            0x55 => self.read_op(mem, ZeroPageX, Self::eor),
            0x4d => self.read_op(mem, Absolute, Self::eor),
            0x5d => self.read_op(mem, AbsoluteX, Self::eor),
            0x59 => self.read_op(mem, AbsoluteY, Self::eor),
            0x41 => self.read_op(mem, IndirectX, Self::eor),
            0x51 => self.read_op(mem, IndirectY, Self::eor),

            // INC - increment memory
            0xe6 => self.modify_op(mem, ZeroPage, Self::inc),
            0xf6 => self.modify_op(mem, ZeroPageX, Self::inc),
            0xee => self.modify_op(mem, Absolute, Self::inc),
            0xfe => self.modify_op(mem, AbsoluteX, Self::inc),

            // INX, INY
            0xe8 => {
                self.x = self.x.wrapping_add(1);
                self.update_nz(self.x);
            }
            0xc8 => {
                self.y = self.y.wrapping_add(1);
                self.update_nz(self.y);
            }

            // JMP
            0x4c => self.pc = self.fetch2(mem),
            0x6c => {
                let addr = self.fetch2(mem);
                self.pc = mem.read_le(usize::from(addr));
            }

            // JSR - the address pushed is the last byte of this
            // instruction, RTS adds one.
            0x20 => {
                let addr = self.fetch2(mem);
                self.push2(mem, self.pc.wrapping_sub(1));
                self.pc = addr;
            }

            // LDA - load accumulator
            0xa9 => self.load_op(mem, Immediate, |c, v| c.a = v),
            0xa5 => self.load_op(mem, ZeroPage, |c, v| c.a = v),
            0xb5 => self.load_op(mem, ZeroPageX, |c, v| c.a = v),
            0xad => self.load_op(mem, Absolute, |c, v| c.a = v),
            0xbd => self.load_op(mem, AbsoluteX, |c, v| c.a = v),
            0xb9 => self.load_op(mem, AbsoluteY, |c, v| c.a = v),
            0xa1 => self.load_op(mem, IndirectX, |c, v| c.a = v),
            0xb1 => self.load_op(mem, IndirectY, |c, v| c.a = v),

            // LDX - load X
            0xa2 => self.load_op(mem, Immediate, |c, v| c.x = v),
            0xa6 => self.load_op(mem, ZeroPage, |c, v| c.x = v),
            0xb6 => self.load_op(mem, ZeroPageY, |c, v| c.x = v),
            0xae => self.load_op(mem, Absolute, |c, v| c.x = v),
            0xbe => self.load_op(mem, AbsoluteY, |c, v| c.x = v),

            // LDY - load Y
            0xa0 => self.load_op(mem, Immediate, |c, v| c.y = v),
            0xa4 => self.load_op(mem, ZeroPage, |c, v| c.y = v),
            0xb4 => self.load_op(mem, ZeroPageX, |c, v| c.y = v),
            0xac => self.load_op(mem, Absolute, |c, v| c.y = v),
            0xbc => self.load_op(mem, AbsoluteX, |c, v| c.y = v),

            // LSR - logical shift right
            0x4a => self.modify_op(mem, Accumulator, Self::lsr),
            0x46 => self.modify_op(mem, ZeroPage, Self::lsr),
            0x56 => self.modify_op(mem, ZeroPageX, Self::lsr),
            0x4e => self.modify_op(mem, Absolute, Self::lsr),
            0x5e => self.modify_op(mem, AbsoluteX, Self::lsr),

            // NOP
            0xea => {}

            // ORA - or memory with accumulator
            0x09 => self.read_op(mem, Immediate, Self::ora),
            0x05 => self.read_op(mem, ZeroPage, Self::ora),
            0x15 => self.read_op(mem, ZeroPageX, Self::ora),
            0x0d => self.read_op(mem, Absolute, Self::ora),
            0x1d => self.read_op(mem, AbsoluteX, Self::ora),
            0x19 => self.read_op(mem, AbsoluteY, Self::ora),
            0x01 => self.read_op(mem, IndirectX, Self::ora),
            0x11 => self.read_op(mem, IndirectY, Self::ora),

            // Stack operations. PHP pushes with the break and unused
            // bits set.
            0x48 => self.push(mem, self.a), // PHA
            0x08 => self.push(mem, self.sr | B | U), // PHP
            0x68 => {
                // PLA
                let v = self.pull(mem);
                self.update_nz(v);
                self.a = v;
            }
            0x28 => self.sr = self.pull(mem), // PLP

            // ROL - rotate left through carry
            0x2a => self.modify_op(mem, Accumulator, Self::rol),
            0x26 => self.modify_op(mem, ZeroPage, Self::rol),
            0x36 => self.modify_op(mem, ZeroPageX, Self::rol),
            0x2e => self.modify_op(mem, Absolute, Self::rol),
            0x3e => self.modify_op(mem, AbsoluteX, Self::rol),

            // ROR - rotate right through carry
            0x6a => self.modify_op(mem, Accumulator, Self::ror),
            0x66 => self.modify_op(mem, ZeroPage, Self::ror),
            0x76 => self.modify_op(mem, ZeroPageX, Self::ror),
            0x6e => self.modify_op(mem, Absolute, Self::ror),
            0x7e => self.modify_op(mem, AbsoluteX, Self::ror),

            // RTI - the address on the stack is the actual resume
            // address, unlike RTS.
            0x40 => {
                self.sr = self.pull(mem);
                self.pc = self.pull2(mem);
            }

            // RTS
            0x60 => self.pc = self.pull2(mem).wrapping_add(1),

            // SBC - subtract memory from accumulator with borrow
            0xe9 => self.read_op(mem, Immediate, Self::sbc),
            0xe5 => self.read_op(mem, ZeroPage, Self::sbc),
            0xf5 => self.read_op(mem, ZeroPageX, Self::sbc),
            0xed => self.read_op(mem, Absolute, Self::sbc),
            0xfd => self.read_op(mem, AbsoluteX, Self::sbc),
            0xf9 => self.read_op(mem, AbsoluteY, Self::sbc),
            0xe1 => self.read_op(mem, IndirectX, Self::sbc),
            0xf1 => self.read_op(mem, IndirectY, Self::sbc),

            // STA - store accumulator
            0x85 => self.store_op(mem, ZeroPage, |c| c.a),
            0x95 => self.store_op(mem, ZeroPageX, |c| c.a),
            0x8d => self.store_op(mem, Absolute, |c| c.a),
            0x9d => self.store_op(mem, AbsoluteX, |c| c.a),
            0x99 => self.store_op(mem, AbsoluteY, |c| c.a),
            0x81 => self.store_op(mem, IndirectX, |c| c.a),
            0x91 => self.store_op(mem, IndirectY, |c| c.a),

            // STX - store X
            0x86 => self.store_op(mem, ZeroPage, |c| c.x),
            0x96 => self.store_op(mem, ZeroPageY, |c| c.x),
            0x8e => self.store_op(mem, Absolute, |c| c.x),

            // STY - store Y
            0x84 => self.store_op(mem, ZeroPage, |c| c.y),
            0x94 => self.store_op(mem, ZeroPageX, |c| c.y),
            0x8c => self.store_op(mem, Absolute, |c| c.y),

            // Transfers. TXS does not touch the flags.
            0xaa => {
                self.x = self.a;
                self.update_nz(self.x);
            } // TAX
            0xa8 => {
                self.y = self.a;
                self.update_nz(self.y);
            } // TAY
            0xba => {
                self.x = self.sp;
                self.update_nz(self.x);
            } // TSX
            0x8a => {
                self.a = self.x;
                self.update_nz(self.a);
            } // TXA
            0x9a => self.sp = self.x, // TXS
            0x98 => {
                self.a = self.y;
                self.update_nz(self.a);
            } // TYA

            _ => return false,
        }
        true
    }

    // ========================================================================
    // Addressing
    // ========================================================================

    /// Resolve the effective address for a memory addressing mode,
    /// fetching the operand bytes. Indexed modes note when indexing
    /// carried into the high byte.
    fn ea(&mut self, mem: &mut Memory, mode: Mode) -> usize {
        match mode {
            Mode::Absolute => usize::from(self.fetch2(mem)),
            Mode::AbsoluteX => {
                let base = self.fetch2(mem);
                usize::from(self.index(base, self.x))
            }
            Mode::AbsoluteY => {
                let base = self.fetch2(mem);
                usize::from(self.index(base, self.y))
            }
            Mode::ZeroPage => usize::from(self.fetch(mem)),
            Mode::ZeroPageX => usize::from(self.fetch(mem).wrapping_add(self.x)),
            Mode::ZeroPageY => usize::from(self.fetch(mem).wrapping_add(self.y)),
            Mode::IndirectX => {
                let zp = self.fetch(mem).wrapping_add(self.x);
                usize::from(mem.read_le(usize::from(zp)))
            }
            Mode::IndirectY => {
                let base = {
                    let zp = self.fetch(mem);
                    mem.read_le(usize::from(zp))
                };
                usize::from(self.index(base, self.y))
            }
            Mode::Accumulator | Mode::Immediate | Mode::Implied | Mode::Indirect
            | Mode::Relative => {
                unreachable!("not a memory addressing mode")
            }
        }
    }

    /// Fetch the operand value for a read-only instruction.
    fn operand(&mut self, mem: &mut Memory, mode: Mode) -> u8 {
        match mode {
            Mode::Immediate => self.fetch(mem),
            Mode::Accumulator => self.a,
            _ => {
                let addr = self.ea(mem, mode);
                mem.read(addr)
            }
        }
    }

    fn read_op(&mut self, mem: &mut Memory, mode: Mode, op: fn(&mut Self, u8)) {
        let v = self.operand(mem, mode);
        op(self, v);
    }

    fn load_op(&mut self, mem: &mut Memory, mode: Mode, set: fn(&mut Self, u8)) {
        let v = self.operand(mem, mode);
        self.update_nz(v);
        set(self, v);
    }

    fn store_op(&mut self, mem: &mut Memory, mode: Mode, get: fn(&Self) -> u8) {
        let addr = self.ea(mem, mode);
        mem.write(addr, get(self));
    }

    fn compare_op(&mut self, mem: &mut Memory, mode: Mode, get: fn(&Self) -> u8) {
        let v = self.operand(mem, mode);
        let out = i16::from(get(self)) - i16::from(v);
        self.set_flag_if(C, out >= 0);
        self.set_flag_if(N, out as u8 & 0x80 != 0);
        self.set_flag_if(Z, out == 0);
    }

    /// Read-modify-write, either on the accumulator or in place in
    /// memory.
    fn modify_op(&mut self, mem: &mut Memory, mode: Mode, op: fn(&mut Self, u8) -> u8) {
        if mode == Mode::Accumulator {
            self.a = op(self, self.a);
        } else {
            let addr = self.ea(mem, mode);
            let v = mem.read(addr);
            let out = op(self, v);
            mem.write(addr, out);
        }
    }

    /// Add an index register to a base address, flagging the page
    /// cross for the cycle penalty.
    fn index(&mut self, base: u16, index: u8) -> u16 {
        let addr = base.wrapping_add(u16::from(index));
        if addr & 0xff00 != base & 0xff00 {
            self.page_cross = true;
        }
        addr
    }

    fn branch(&mut self, mem: &mut Memory, cond: bool) {
        let disp = self.fetch(mem) as i8;
        if cond {
            let target = self.pc.wrapping_add(disp as u16);
            if target & 0xff00 != self.pc & 0xff00 {
                self.page_cross = true;
            }
            self.pc = target;
        }
    }

    // ========================================================================
    // Instructions
    // ========================================================================

    fn adc(&mut self, v: u8) {
        if self.sr & D != 0 {
            return self.adc_bcd(v);
        }
        let (out, carry, _, overflow) = add8(self.a, v, self.sr & C != 0);
        self.set_flag_if(C, carry);
        self.set_flag_if(V, overflow);
        self.update_nz(out);
        self.a = out;
    }

    fn adc_bcd(&mut self, v: u8) {
        let carry = u16::from(self.sr & C != 0);
        let r = u16::from(from_bcd(self.a)) + u16::from(from_bcd(v)) + carry;
        let out = to_bcd(r as u8);
        self.set_flag_if(C, r > 99);
        self.update_nz(out);
        self.a = out;
    }

    fn sbc(&mut self, v: u8) {
        if self.sr & D != 0 {
            return self.sbc_bcd(v);
        }
        // Borrow when the carry is clear; carry clear on borrow out.
        let (out, borrow, _, overflow) = sub8(self.a, v, self.sr & C == 0);
        self.set_flag_if(C, !borrow);
        self.set_flag_if(V, overflow);
        self.update_nz(out);
        self.a = out;
    }

    fn sbc_bcd(&mut self, v: u8) {
        let borrow = i16::from(self.sr & C == 0);
        let mut r = i16::from(from_bcd(self.a)) - i16::from(from_bcd(v)) - borrow;
        let no_borrow = r >= 0;
        if r < 0 {
            r += 100;
        }
        let out = to_bcd(r as u8);
        self.set_flag_if(C, no_borrow);
        self.update_nz(out);
        self.a = out;
    }

    fn and(&mut self, v: u8) {
        self.a &= v;
        self.update_nz(self.a);
    }

    fn eor(&mut self, v: u8) {
        self.a ^= v;
        self.update_nz(self.a);
    }

    fn ora(&mut self, v: u8) {
        self.a |= v;
        self.update_nz(self.a);
    }

    fn bit(&mut self, v: u8) {
        self.set_flag_if(Z, self.a & v == 0);
        self.set_flag_if(N, v & 0x80 != 0);
        self.set_flag_if(V, v & 0x40 != 0);
    }

    fn asl(&mut self, v: u8) -> u8 {
        let out = v << 1;
        self.set_flag_if(C, v & 0x80 != 0);
        self.update_nz(out);
        out
    }

    fn lsr(&mut self, v: u8) -> u8 {
        let out = v >> 1;
        self.set_flag_if(C, v & 0x01 != 0);
        self.update_nz(out);
        out
    }

    fn rol(&mut self, v: u8) -> u8 {
        let mut out = v << 1;
        if self.sr & C != 0 {
            out |= 0x01;
        }
        self.set_flag_if(C, v & 0x80 != 0);
        self.update_nz(out);
        out
    }

    fn ror(&mut self, v: u8) -> u8 {
        let mut out = v >> 1;
        if self.sr & C != 0 {
            out |= 0x80;
        }
        self.set_flag_if(C, v & 0x01 != 0);
        self.update_nz(out);
        out
    }

    fn inc(&mut self, v: u8) -> u8 {
        let out = v.wrapping_add(1);
        self.update_nz(out);
        out
    }

    fn dec(&mut self, v: u8) -> u8 {
        let out = v.wrapping_sub(1);
        self.update_nz(out);
        out
    }
}
