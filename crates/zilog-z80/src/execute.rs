//! Instruction decode and execution.
//!
//! Opcodes are decoded structurally from their bit fields rather than
//! through a table: x selects the group, y and z the operands. The DD
//! and FD prefixes remap the HL slot to IX or IY; an opcode that never
//! touches HL simply executes in its unprefixed form.

use rcs_core::{add8, sub8, Alu, Memory};

use crate::cpu::{Index, Z80};
use crate::flags::{sz53, sz53p, CF, HF, NF, PF, SF, XF, YF, ZF};

/// Shared ALU configured with the Z80 flag layout. Parity is computed
/// separately since it shares a bit with overflow.
const ALU: Alu = Alu {
    c: CF,
    v: PF,
    p: 0,
    h: HF,
    z: ZF,
    s: SF,
    clear_borrow: false,
    ignore: 0,
};

const fn fl(mask: u8, cond: bool) -> u8 {
    if cond {
        mask
    } else {
        0
    }
}

impl Z80 {
    pub(crate) fn execute(&mut self, mem: &mut Memory) {
        let here = self.pc;
        let mut idx = Index::Hl;
        loop {
            let opcode = self.fetch(mem);
            self.refresh_r();
            match opcode {
                // Prefixes stack; only the last one wins.
                0xdd => idx = Index::Ix,
                0xfd => idx = Index::Iy,
                0xcb => {
                    // For DDCB/FDCB the displacement comes before the
                    // final opcode and does not bump the refresh
                    // counter.
                    let d = if idx == Index::Hl {
                        None
                    } else {
                        Some(self.fetch(mem) as i8)
                    };
                    let op = self.fetch(mem);
                    if d.is_none() {
                        self.refresh_r();
                    }
                    self.execute_cb(mem, op, idx, d);
                    return;
                }
                0xed => {
                    let op = self.fetch(mem);
                    self.refresh_r();
                    self.execute_ed(mem, op, here);
                    return;
                }
                _ => {
                    self.execute_main(mem, opcode, idx);
                    return;
                }
            }
        }
    }

    // ========================================================================
    // Operand access
    // ========================================================================

    /// Address of the (HL) operand, or (IX+d)/(IY+d) with the
    /// displacement fetched from the instruction stream.
    fn mem_addr(&mut self, mem: &mut Memory, idx: Index) -> usize {
        match idx {
            Index::Hl => usize::from(self.hl()),
            _ => {
                let d = self.fetch(mem) as i8;
                usize::from(self.hl_slot(idx).wrapping_add(d as u16))
            }
        }
    }

    /// 8-bit register by field value. The (HL) slot is handled by the
    /// callers since it needs memory access.
    fn reg8(&self, idx: Index, r: u8) -> u8 {
        match r {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => match idx {
                Index::Hl => self.h,
                Index::Ix => self.ixh,
                Index::Iy => self.iyh,
            },
            5 => match idx {
                Index::Hl => self.l,
                Index::Ix => self.ixl,
                Index::Iy => self.iyl,
            },
            7 => self.a,
            _ => unreachable!("(hl) operand handled by caller"),
        }
    }

    fn set_reg8(&mut self, idx: Index, r: u8, v: u8) {
        match r {
            0 => self.b = v,
            1 => self.c = v,
            2 => self.d = v,
            3 => self.e = v,
            4 => match idx {
                Index::Hl => self.h = v,
                Index::Ix => self.ixh = v,
                Index::Iy => self.iyh = v,
            },
            5 => match idx {
                Index::Hl => self.l = v,
                Index::Ix => self.ixl = v,
                Index::Iy => self.iyl = v,
            },
            7 => self.a = v,
            _ => unreachable!("(hl) operand handled by caller"),
        }
    }

    /// 16-bit register pair by field value: BC, DE, HL slot, SP.
    fn rp(&self, idx: Index, p: u8) -> u16 {
        match p {
            0 => self.bc(),
            1 => self.de(),
            2 => self.hl_slot(idx),
            _ => self.sp,
        }
    }

    fn set_rp(&mut self, idx: Index, p: u8, v: u16) {
        match p {
            0 => self.set_bc(v),
            1 => self.set_de(v),
            2 => self.set_hl_slot(idx, v),
            _ => self.sp = v,
        }
    }

    fn condition(&self, cc: u8) -> bool {
        match cc {
            0 => self.f & ZF == 0,
            1 => self.f & ZF != 0,
            2 => self.f & CF == 0,
            3 => self.f & CF != 0,
            4 => self.f & PF == 0,
            5 => self.f & PF != 0,
            6 => self.f & SF == 0,
            _ => self.f & SF != 0,
        }
    }

    // ========================================================================
    // Unprefixed (and DD/FD remapped) instructions
    // ========================================================================

    #[allow(clippy::too_many_lines)]
    fn execute_main(&mut self, mem: &mut Memory, op: u8, idx: Index) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;

        match x {
            0 => match z {
                0 => match y {
                    // NOP
                    0 => {}
                    // EX AF, AF'
                    1 => {
                        let af = self.af();
                        let a1 = self.a1;
                        let f1 = self.f1;
                        self.a1 = (af >> 8) as u8;
                        self.f1 = af as u8;
                        self.a = a1;
                        self.f = f1;
                    }
                    // DJNZ e
                    2 => {
                        let d = self.fetch(mem) as i8;
                        self.b = self.b.wrapping_sub(1);
                        if self.b != 0 {
                            self.pc = self.pc.wrapping_add(d as u16);
                        }
                    }
                    // JR e
                    3 => {
                        let d = self.fetch(mem) as i8;
                        self.pc = self.pc.wrapping_add(d as u16);
                    }
                    // JR cc, e
                    _ => {
                        let d = self.fetch(mem) as i8;
                        if self.condition(y - 4) {
                            self.pc = self.pc.wrapping_add(d as u16);
                        }
                    }
                },
                1 => {
                    if q == 0 {
                        // LD rr, nn
                        let v = self.fetch2(mem);
                        self.set_rp(idx, p, v);
                    } else {
                        // ADD HL, rr
                        let hl = self.hl_slot(idx);
                        let rr = self.rp(idx, p);
                        let out = self.add16(hl, rr);
                        self.set_hl_slot(idx, out);
                    }
                }
                2 => match (q, p) {
                    // LD (BC), A / LD (DE), A
                    (0, 0) => mem.write(usize::from(self.bc()), self.a),
                    (0, 1) => mem.write(usize::from(self.de()), self.a),
                    // LD (nn), HL
                    (0, 2) => {
                        let addr = usize::from(self.fetch2(mem));
                        mem.write_le(addr, self.hl_slot(idx));
                    }
                    // LD (nn), A
                    (0, _) => {
                        let addr = usize::from(self.fetch2(mem));
                        mem.write(addr, self.a);
                    }
                    // LD A, (BC) / LD A, (DE)
                    (_, 0) => self.a = mem.read(usize::from(self.bc())),
                    (_, 1) => self.a = mem.read(usize::from(self.de())),
                    // LD HL, (nn)
                    (_, 2) => {
                        let addr = usize::from(self.fetch2(mem));
                        let v = mem.read_le(addr);
                        self.set_hl_slot(idx, v);
                    }
                    // LD A, (nn)
                    (_, _) => {
                        let addr = usize::from(self.fetch2(mem));
                        self.a = mem.read(addr);
                    }
                },
                3 => {
                    // INC rr / DEC rr, no flags altered
                    let v = self.rp(idx, p);
                    let v = if q == 0 {
                        v.wrapping_add(1)
                    } else {
                        v.wrapping_sub(1)
                    };
                    self.set_rp(idx, p, v);
                }
                // INC r
                4 => self.rmw_r(mem, idx, y, Self::inc8),
                // DEC r
                5 => self.rmw_r(mem, idx, y, Self::dec8),
                6 => {
                    // LD r, n - for (IX+d) the displacement comes
                    // before the immediate
                    if y == 6 {
                        let addr = self.mem_addr(mem, idx);
                        let v = self.fetch(mem);
                        mem.write(addr, v);
                    } else {
                        let v = self.fetch(mem);
                        self.set_reg8(idx, y, v);
                    }
                }
                _ => match y {
                    // RLCA
                    0 => {
                        let c = self.a >> 7;
                        self.a = self.a << 1 | c;
                        self.rot_a_flags(c != 0);
                    }
                    // RRCA
                    1 => {
                        let c = self.a & 1;
                        self.a = self.a >> 1 | c << 7;
                        self.rot_a_flags(c != 0);
                    }
                    // RLA
                    2 => {
                        let c = self.a >> 7;
                        self.a = self.a << 1 | u8::from(self.f & CF != 0);
                        self.rot_a_flags(c != 0);
                    }
                    // RRA
                    3 => {
                        let c = self.a & 1;
                        self.a = self.a >> 1 | u8::from(self.f & CF != 0) << 7;
                        self.rot_a_flags(c != 0);
                    }
                    4 => self.daa(),
                    // CPL
                    5 => {
                        self.a = !self.a;
                        self.f =
                            (self.f & (SF | ZF | PF | CF)) | HF | NF | (self.a & (YF | XF));
                    }
                    // SCF
                    6 => {
                        self.f = (self.f & (SF | ZF | PF)) | (self.a & (YF | XF)) | CF;
                    }
                    // CCF
                    _ => {
                        let c = self.f & CF != 0;
                        self.f = (self.f & (SF | ZF | PF))
                            | (self.a & (YF | XF))
                            | fl(HF, c)
                            | fl(CF, !c);
                    }
                },
            },
            1 => {
                // LD r, r' with 0x76 in the hole as HALT. When one
                // side is (HL)/(IX+d), the other side always uses the
                // unprefixed H and L.
                if op == 0x76 {
                    self.halt = true;
                } else if y == 6 {
                    let addr = self.mem_addr(mem, idx);
                    let v = self.reg8(Index::Hl, z);
                    mem.write(addr, v);
                } else if z == 6 {
                    let addr = self.mem_addr(mem, idx);
                    let v = mem.read(addr);
                    self.set_reg8(Index::Hl, y, v);
                } else {
                    let v = self.reg8(idx, z);
                    self.set_reg8(idx, y, v);
                }
            }
            2 => {
                // ALU operation between A and r
                let v = if z == 6 {
                    let addr = self.mem_addr(mem, idx);
                    mem.read(addr)
                } else {
                    self.reg8(idx, z)
                };
                self.alu_a(y, v);
            }
            _ => match z {
                // RET cc
                0 => {
                    if self.condition(y) {
                        self.pc = self.pull2(mem);
                    }
                }
                1 => {
                    if q == 0 {
                        // POP rr (AF in the SP slot)
                        let v = self.pull2(mem);
                        match p {
                            0 => self.set_bc(v),
                            1 => self.set_de(v),
                            2 => self.set_hl_slot(idx, v),
                            _ => self.set_af(v),
                        }
                    } else {
                        match p {
                            // RET
                            0 => self.pc = self.pull2(mem),
                            // EXX
                            1 => self.exx(),
                            // JP (HL)
                            2 => self.pc = self.hl_slot(idx),
                            // LD SP, HL
                            _ => self.sp = self.hl_slot(idx),
                        }
                    }
                }
                // JP cc, nn
                2 => {
                    let addr = self.fetch2(mem);
                    if self.condition(y) {
                        self.pc = addr;
                    }
                }
                3 => match y {
                    // JP nn
                    0 => self.pc = self.fetch2(mem),
                    // CB prefix, handled before dispatch
                    1 => {}
                    // OUT (n), A
                    2 => {
                        let port = self.fetch(mem);
                        self.ports.write(usize::from(port), self.a);
                    }
                    // IN A, (n) - no flags altered
                    3 => {
                        let port = self.fetch(mem);
                        self.a = self.ports.read(usize::from(port));
                    }
                    // EX (SP), HL
                    4 => {
                        let sp = usize::from(self.sp);
                        let v = mem.read_le(sp);
                        mem.write_le(sp, self.hl_slot(idx));
                        self.set_hl_slot(idx, v);
                    }
                    // EX DE, HL - never remapped by a prefix
                    5 => {
                        let de = self.de();
                        let hl = self.hl();
                        self.set_de(hl);
                        self.set_hl(de);
                    }
                    // DI
                    6 => {
                        self.iff1 = false;
                        self.iff2 = false;
                    }
                    // EI
                    _ => {
                        self.iff1 = true;
                        self.iff2 = true;
                    }
                },
                // CALL cc, nn
                4 => {
                    let addr = self.fetch2(mem);
                    if self.condition(y) {
                        self.push2(mem, self.pc);
                        self.pc = addr;
                    }
                }
                5 => {
                    if q == 0 {
                        // PUSH rr (AF in the SP slot)
                        let v = match p {
                            0 => self.bc(),
                            1 => self.de(),
                            2 => self.hl_slot(idx),
                            _ => self.af(),
                        };
                        self.push2(mem, v);
                    } else {
                        // CALL nn; the other q=1 slots are the DD, ED,
                        // and FD prefixes, handled before dispatch
                        if p == 0 {
                            let addr = self.fetch2(mem);
                            self.push2(mem, self.pc);
                            self.pc = addr;
                        }
                    }
                }
                // ALU operation between A and n
                6 => {
                    let v = self.fetch(mem);
                    self.alu_a(y, v);
                }
                // RST p
                _ => {
                    self.push2(mem, self.pc);
                    self.pc = u16::from(y) * 8;
                }
            },
        }
    }

    // ========================================================================
    // CB prefix: rotates, shifts, and bit operations
    // ========================================================================

    fn execute_cb(&mut self, mem: &mut Memory, op: u8, idx: Index, d: Option<i8>) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;

        let (v, addr) = if let Some(d) = d {
            let addr = usize::from(self.hl_slot(idx).wrapping_add(d as u16));
            (mem.read(addr), Some(addr))
        } else if z == 6 {
            let addr = usize::from(self.hl());
            (mem.read(addr), Some(addr))
        } else {
            (self.reg8(Index::Hl, z), None)
        };

        match x {
            0 => {
                let out = self.rotate(y, v);
                self.store_cb(mem, z, addr, out, d.is_some());
            }
            // BIT y, r
            1 => {
                let bit = v & (1 << y);
                self.f = (self.f & CF)
                    | HF
                    | (v & (YF | XF))
                    | fl(ZF | PF, bit == 0)
                    | fl(SF, y == 7 && bit != 0);
            }
            // RES y, r
            2 => self.store_cb(mem, z, addr, v & !(1 << y), d.is_some()),
            // SET y, r
            _ => self.store_cb(mem, z, addr, v | 1 << y, d.is_some()),
        }
    }

    /// Store a CB result. The indexed forms also copy the result into
    /// the named register.
    fn store_cb(&mut self, mem: &mut Memory, z: u8, addr: Option<usize>, out: u8, indexed: bool) {
        if let Some(addr) = addr {
            mem.write(addr, out);
            if indexed && z != 6 {
                self.set_reg8(Index::Hl, z, out);
            }
        } else {
            self.set_reg8(Index::Hl, z, out);
        }
    }

    fn rotate(&mut self, y: u8, v: u8) -> u8 {
        let carry_in = self.f & CF != 0;
        let (out, carry) = match y {
            // RLC
            0 => (v << 1 | v >> 7, v & 0x80 != 0),
            // RRC
            1 => (v >> 1 | v << 7, v & 0x01 != 0),
            // RL
            2 => (v << 1 | u8::from(carry_in), v & 0x80 != 0),
            // RR
            3 => (v >> 1 | u8::from(carry_in) << 7, v & 0x01 != 0),
            // SLA
            4 => (v << 1, v & 0x80 != 0),
            // SRA
            5 => (v >> 1 | v & 0x80, v & 0x01 != 0),
            // SLL, undocumented: like SLA but shifts in a one
            6 => (v << 1 | 1, v & 0x80 != 0),
            // SRL
            _ => (v >> 1, v & 0x01 != 0),
        };
        self.f = sz53p(out) | fl(CF, carry);
        out
    }

    // ========================================================================
    // ED prefix
    // ========================================================================

    #[allow(clippy::too_many_lines)]
    fn execute_ed(&mut self, mem: &mut Memory, op: u8, here: u16) {
        let x = op >> 6;
        let y = (op >> 3) & 7;
        let z = op & 7;
        let p = y >> 1;
        let q = y & 1;

        match (x, z) {
            // IN r, (C) - with y=6, only the flags are updated
            (1, 0) => {
                let v = self.ports.read(usize::from(self.c));
                if y != 6 {
                    self.set_reg8(Index::Hl, y, v);
                }
                self.f = (self.f & CF) | sz53p(v);
            }
            // OUT (C), r - with y=6, outputs zero
            (1, 1) => {
                let v = if y == 6 { 0 } else { self.reg8(Index::Hl, y) };
                self.ports.write(usize::from(self.c), v);
            }
            // SBC HL, rr / ADC HL, rr
            (1, 2) => {
                let hl = self.hl();
                let rr = self.rp(Index::Hl, p);
                let out = if q == 0 {
                    self.sbc16(hl, rr)
                } else {
                    self.adc16(hl, rr)
                };
                self.set_hl(out);
            }
            // LD (nn), rr / LD rr, (nn)
            (1, 3) => {
                let addr = usize::from(self.fetch2(mem));
                if q == 0 {
                    mem.write_le(addr, self.rp(Index::Hl, p));
                } else {
                    let v = mem.read_le(addr);
                    self.set_rp(Index::Hl, p, v);
                }
            }
            // NEG
            (1, 4) => {
                let a = self.a;
                self.a = 0;
                self.sub_a(a, false);
            }
            // RETN and RETI both restore IFF1 from IFF2
            (1, 5) => {
                self.pc = self.pull2(mem);
                self.iff1 = self.iff2;
            }
            // IM 0/1/2
            (1, 6) => {
                self.im = match y {
                    2 | 6 => 1,
                    3 | 7 => 2,
                    _ => 0,
                };
            }
            (1, 7) => match y {
                // LD I, A / LD R, A
                0 => self.i = self.a,
                1 => self.r = self.a,
                // LD A, I / LD A, R set parity from IFF2
                2 => {
                    self.a = self.i;
                    self.f = (self.f & CF) | sz53(self.a) | fl(PF, self.iff2);
                }
                3 => {
                    self.a = self.r;
                    self.f = (self.f & CF) | sz53(self.a) | fl(PF, self.iff2);
                }
                4 => self.rrd(mem),
                5 => self.rld(mem),
                _ => tracing::warn!("{here:04x}: illegal instruction: ed{op:02x}"),
            },
            // Block transfer, compare, and I/O operations
            (2, 0..=3) if y >= 4 => {
                let dec = y & 1 == 1;
                let repeat = y >= 6;
                match z {
                    0 => self.block_ld(mem, dec, repeat),
                    1 => self.block_cp(mem, dec, repeat),
                    2 => self.block_in(mem, dec, repeat),
                    _ => self.block_out(mem, dec, repeat),
                }
            }
            _ => tracing::warn!("{here:04x}: illegal instruction: ed{op:02x}"),
        }
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    fn alu_a(&mut self, op_i: u8, v: u8) {
        match op_i {
            0 => self.add_a(v, false),
            1 => self.add_a(v, self.f & CF != 0),
            2 => self.sub_a(v, false),
            3 => self.sub_a(v, self.f & CF != 0),
            // AND
            4 => {
                self.a &= v;
                self.f = sz53p(self.a) | HF;
            }
            // XOR
            5 => {
                self.a ^= v;
                self.f = sz53p(self.a);
            }
            // OR
            6 => {
                self.a |= v;
                self.f = sz53p(self.a);
            }
            // CP - bits 5 and 3 come from the operand
            _ => self.cp_a(v),
        }
    }

    fn add_a(&mut self, v: u8, use_carry: bool) {
        let mut f = if use_carry { self.f & CF } else { 0 };
        let out = ALU.add(&mut f, self.a, v);
        self.f = f | (out & (YF | XF));
        self.a = out;
    }

    fn sub_a(&mut self, v: u8, use_borrow: bool) {
        let mut f = if use_borrow { self.f & CF } else { 0 };
        let out = ALU.sub(&mut f, self.a, v);
        self.f = f | NF | (out & (YF | XF));
        self.a = out;
    }

    fn cp_a(&mut self, v: u8) {
        let mut f = 0;
        ALU.sub(&mut f, self.a, v);
        self.f = f | NF | (v & (YF | XF));
    }

    fn inc8(&mut self, v: u8) -> u8 {
        let mut f = 0;
        let out = ALU.add(&mut f, v, 1);
        self.f = (self.f & CF) | (f & !CF) | (out & (YF | XF));
        out
    }

    fn dec8(&mut self, v: u8) -> u8 {
        let mut f = 0;
        let out = ALU.sub(&mut f, v, 1);
        self.f = (self.f & CF) | (f & !CF) | NF | (out & (YF | XF));
        out
    }

    /// Read-modify-write on a register or the (HL)/(IX+d) operand.
    fn rmw_r(&mut self, mem: &mut Memory, idx: Index, r: u8, f: fn(&mut Self, u8) -> u8) {
        if r == 6 {
            let addr = self.mem_addr(mem, idx);
            let v = mem.read(addr);
            let out = f(self, v);
            mem.write(addr, out);
        } else {
            let v = self.reg8(idx, r);
            let out = f(self, v);
            self.set_reg8(idx, r, out);
        }
    }

    /// ADD HL, rr: only H, C, and the undocumented bits change.
    fn add16(&mut self, in0: u16, in1: u16) -> u16 {
        let (lo, c0, _, _) = add8(in0 as u8, in1 as u8, false);
        let (hi, c1, h, _) = add8((in0 >> 8) as u8, (in1 >> 8) as u8, c0);
        self.f = (self.f & (SF | ZF | PF)) | (hi & (YF | XF)) | fl(HF, h) | fl(CF, c1);
        u16::from(hi) << 8 | u16::from(lo)
    }

    fn adc16(&mut self, in0: u16, in1: u16) -> u16 {
        let carry = self.f & CF != 0;
        let (lo, c0, _, _) = add8(in0 as u8, in1 as u8, carry);
        let (hi, c1, h, v) = add8((in0 >> 8) as u8, (in1 >> 8) as u8, c0);
        self.f = (hi & (SF | YF | XF))
            | fl(ZF, lo == 0 && hi == 0)
            | fl(HF, h)
            | fl(PF, v)
            | fl(CF, c1);
        u16::from(hi) << 8 | u16::from(lo)
    }

    fn sbc16(&mut self, in0: u16, in1: u16) -> u16 {
        let borrow = self.f & CF != 0;
        let (lo, b0, _, _) = sub8(in0 as u8, in1 as u8, borrow);
        let (hi, b1, h, v) = sub8((in0 >> 8) as u8, (in1 >> 8) as u8, b0);
        self.f = (hi & (SF | YF | XF))
            | fl(ZF, lo == 0 && hi == 0)
            | NF
            | fl(HF, h)
            | fl(PF, v)
            | fl(CF, b1);
        u16::from(hi) << 8 | u16::from(lo)
    }

    fn daa(&mut self) {
        let a = self.a;
        let nf = self.f & NF != 0;
        let cf = self.f & CF != 0;
        let hf = self.f & HF != 0;

        let mut correction = 0u8;
        let mut carry = cf;
        if hf || a & 0x0f > 9 {
            correction |= 0x06;
        }
        if cf || a > 0x99 {
            correction |= 0x60;
            carry = true;
        }

        let out = if nf {
            a.wrapping_sub(correction)
        } else {
            a.wrapping_add(correction)
        };
        let half = if nf {
            hf && a & 0x0f < 6
        } else {
            a & 0x0f > 9
        };

        self.a = out;
        self.f = sz53p(out) | fl(NF, nf) | fl(CF, carry) | fl(HF, half);
    }

    /// Flags common to RLCA, RRCA, RLA, and RRA: S, Z, and P survive,
    /// bits 5 and 3 come from the result.
    fn rot_a_flags(&mut self, carry: bool) {
        self.f = (self.f & (SF | ZF | PF)) | (self.a & (YF | XF)) | fl(CF, carry);
    }

    fn exx(&mut self) {
        std::mem::swap(&mut self.b, &mut self.b1);
        std::mem::swap(&mut self.c, &mut self.c1);
        std::mem::swap(&mut self.d, &mut self.d1);
        std::mem::swap(&mut self.e, &mut self.e1);
        std::mem::swap(&mut self.h, &mut self.h1);
        std::mem::swap(&mut self.l, &mut self.l1);
    }

    fn rrd(&mut self, mem: &mut Memory) {
        let addr = usize::from(self.hl());
        let v = mem.read(addr);
        let out = (self.a & 0x0f) << 4 | v >> 4;
        self.a = (self.a & 0xf0) | (v & 0x0f);
        mem.write(addr, out);
        self.f = (self.f & CF) | sz53p(self.a);
    }

    fn rld(&mut self, mem: &mut Memory) {
        let addr = usize::from(self.hl());
        let v = mem.read(addr);
        let out = v << 4 | (self.a & 0x0f);
        self.a = (self.a & 0xf0) | v >> 4;
        mem.write(addr, out);
        self.f = (self.f & CF) | sz53p(self.a);
    }

    // ========================================================================
    // Block operations
    // ========================================================================

    fn block_ld(&mut self, mem: &mut Memory, dec: bool, repeat: bool) {
        let delta: u16 = if dec { 0xffff } else { 1 };
        let hl = self.hl();
        let de = self.de();
        let v = mem.read(usize::from(hl));
        mem.write(usize::from(de), v);
        self.set_hl(hl.wrapping_add(delta));
        self.set_de(de.wrapping_add(delta));
        let bc = self.bc().wrapping_sub(1);
        self.set_bc(bc);
        // Bits 5 and 3 come from A plus the transferred byte.
        let n = self.a.wrapping_add(v);
        self.f = (self.f & (SF | ZF | CF))
            | fl(PF, bc != 0)
            | (n & XF)
            | fl(YF, n & 0x02 != 0);
        if repeat && bc != 0 {
            self.pc = self.pc.wrapping_sub(2);
        }
    }

    fn block_cp(&mut self, mem: &mut Memory, dec: bool, repeat: bool) {
        let delta: u16 = if dec { 0xffff } else { 1 };
        let hl = self.hl();
        let v = mem.read(usize::from(hl));
        let (out, _, half, _) = sub8(self.a, v, false);
        self.set_hl(hl.wrapping_add(delta));
        let bc = self.bc().wrapping_sub(1);
        self.set_bc(bc);
        let n = out.wrapping_sub(u8::from(half));
        self.f = (self.f & CF)
            | NF
            | fl(SF, out & 0x80 != 0)
            | fl(ZF, out == 0)
            | fl(HF, half)
            | fl(PF, bc != 0)
            | (n & XF)
            | fl(YF, n & 0x02 != 0);
        if repeat && bc != 0 && out != 0 {
            self.pc = self.pc.wrapping_sub(2);
        }
    }

    fn block_in(&mut self, mem: &mut Memory, dec: bool, repeat: bool) {
        let delta: u16 = if dec { 0xffff } else { 1 };
        let v = self.ports.read(usize::from(self.c));
        let hl = self.hl();
        mem.write(usize::from(hl), v);
        self.set_hl(hl.wrapping_add(delta));
        self.b = self.b.wrapping_sub(1);
        self.f = sz53(self.b) | NF;
        if repeat && self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
        }
    }

    fn block_out(&mut self, mem: &mut Memory, dec: bool, repeat: bool) {
        let delta: u16 = if dec { 0xffff } else { 1 };
        let hl = self.hl();
        let v = mem.read(usize::from(hl));
        self.b = self.b.wrapping_sub(1);
        self.ports.write(usize::from(self.c), v);
        self.set_hl(hl.wrapping_add(delta));
        self.f = sz53(self.b) | NF;
        if repeat && self.b != 0 {
            self.pc = self.pc.wrapping_sub(2);
        }
    }
}
