//! CPU state, stack, and interrupt handling.

use std::fmt;

use rcs_core::{Cpu, Memory, Pointer, StateError, Stmt, Value, ValueError};
use serde::{Deserialize, Serialize};

use crate::flags::{B, C, D, I, N, U, V, Z};

/// Starting address of the stack page.
pub(crate) const ADDR_STACK: usize = 0x0100;

/// Reset vector.
pub(crate) const VEC_RESET: usize = 0xfffc;

/// Interrupt request vector, also used by BRK.
pub(crate) const VEC_IRQ: usize = 0xfffe;

/// Non-maskable interrupt vector.
pub(crate) const VEC_NMI: usize = 0xfffa;

/// The MOS Technology 6502 series processor.
#[derive(Debug, Default)]
pub struct Mos6502 {
    /// Program counter, always the address of the next instruction.
    pub(crate) pc: u16,
    /// Accumulator.
    pub a: u8,
    /// X index register.
    pub x: u8,
    /// Y index register.
    pub y: u8,
    /// Stack pointer, offset into the stack page.
    pub sp: u8,
    /// Status register.
    pub sr: u8,

    /// Set to request a maskable interrupt. Cleared once serviced.
    pub irq: bool,
    /// Set to request a non-maskable interrupt. Cleared once serviced.
    pub nmi: bool,

    /// Set when the last instruction crossed a page boundary on an
    /// indexed address or a taken branch. Timing-aware callers add a
    /// penalty cycle when this is set.
    pub page_cross: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct State {
    pc: u16,
    a: u8,
    x: u8,
    y: u8,
    sp: u8,
    sr: u8,
    irq: bool,
    nmi: bool,
    page_cross: bool,
}

impl Mos6502 {
    /// Create a new CPU with the program counter loaded from the reset
    /// vector.
    #[must_use]
    pub fn new(mem: &mut Memory) -> Self {
        Self {
            pc: mem.read_le(VEC_RESET),
            ..Self::default()
        }
    }

    /// Fetch the byte at the program counter and advance past it.
    pub(crate) fn fetch(&mut self, mem: &mut Memory) -> u8 {
        let v = mem.read(usize::from(self.pc));
        self.pc = self.pc.wrapping_add(1);
        v
    }

    /// Like fetch, but for the next 16-bit value.
    pub(crate) fn fetch2(&mut self, mem: &mut Memory) -> u16 {
        let lo = u16::from(self.fetch(mem));
        let hi = u16::from(self.fetch(mem));
        hi << 8 | lo
    }

    pub(crate) fn push(&mut self, mem: &mut Memory, v: u8) {
        mem.write(ADDR_STACK + usize::from(self.sp), v);
        self.sp = self.sp.wrapping_sub(1);
    }

    pub(crate) fn push2(&mut self, mem: &mut Memory, v: u16) {
        self.push(mem, (v >> 8) as u8);
        self.push(mem, v as u8);
    }

    pub(crate) fn pull(&mut self, mem: &mut Memory) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        mem.read(ADDR_STACK + usize::from(self.sp))
    }

    pub(crate) fn pull2(&mut self, mem: &mut Memory) -> u16 {
        let lo = u16::from(self.pull(mem));
        let hi = u16::from(self.pull(mem));
        hi << 8 | lo
    }

    pub(crate) fn set_flag_if(&mut self, flag: u8, cond: bool) {
        if cond {
            self.sr |= flag;
        } else {
            self.sr &= !flag;
        }
    }

    pub(crate) fn update_nz(&mut self, v: u8) {
        self.set_flag_if(N, v & 0x80 != 0);
        self.set_flag_if(Z, v == 0);
    }

    /// Interrupt sequence shared by IRQ, NMI, and BRK. The return
    /// address pushed is the actual resume address, unlike JSR.
    pub(crate) fn interrupt(&mut self, mem: &mut Memory, vector: usize, brk: bool) {
        self.push2(mem, self.pc);
        let mut sr = self.sr | U;
        if brk {
            sr |= B;
        }
        self.push(mem, sr);
        self.sr |= I;
        self.pc = mem.read_le(vector);
    }
}

/// Status in the form of:
/// ```text
///  pc  sr ac xr yr sp  n v - b d i z c
/// 1234 20 00 00 00 ff  . . * . . . . .
/// ```
impl fmt::Display for Mos6502 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = |v: bool| if v { "*" } else { "." };
        write!(
            f,
            " pc  sr ac xr yr sp  n v - b d i z c\n\
             {:04x} {:02x} {:02x} {:02x} {:02x} {:02x}  {} {} {} {} {} {} {} {}",
            self.pc,
            self.sr | U,
            self.a,
            self.x,
            self.y,
            self.sp,
            b(self.sr & N != 0),
            b(self.sr & V != 0),
            b(true),
            b(self.sr & B != 0),
            b(self.sr & D != 0),
            b(self.sr & I != 0),
            b(self.sr & Z != 0),
            b(self.sr & C != 0),
        )
    }
}

impl Cpu for Mos6502 {
    fn next(&mut self, mem: &mut Memory) {
        let here = self.pc;
        self.page_cross = false;
        let opcode = self.fetch(mem);
        if !self.execute(mem, opcode) {
            tracing::warn!("6502: illegal instruction {opcode:#04x}, pc {here:#06x}");
            return;
        }
        self.sr |= U;

        if self.nmi {
            self.nmi = false;
            self.interrupt(mem, VEC_NMI, false);
        } else if self.irq {
            self.irq = false;
            if self.sr & I == 0 {
                self.interrupt(mem, VEC_IRQ, false);
            }
        }
    }

    fn pc(&self) -> usize {
        usize::from(self.pc)
    }

    fn set_pc(&mut self, addr: usize) {
        self.pc = addr as u16;
    }

    fn disassemble(&self, mem: &mut Memory, ptr: &mut Pointer) -> Stmt {
        crate::dasm::disassemble(mem, ptr)
    }

    fn register_names(&self) -> &'static [&'static str] {
        &["pc", "a", "x", "y", "sp", "sr"]
    }

    fn flag_names(&self) -> &'static [&'static str] {
        &["c", "z", "i", "d", "b", "v", "n"]
    }

    fn register(&self, name: &str) -> Result<Value, ValueError> {
        match name {
            "pc" => Ok(Value::U16(self.pc)),
            "a" => Ok(Value::U8(self.a)),
            "x" => Ok(Value::U8(self.x)),
            "y" => Ok(Value::U8(self.y)),
            "sp" => Ok(Value::U8(self.sp)),
            "sr" => Ok(Value::U8(self.sr)),
            _ => Err(ValueError::NoSuchRegister(name.to_string())),
        }
    }

    fn set_register(&mut self, name: &str, value: usize) -> Result<(), ValueError> {
        match name {
            "pc" => self.pc = rcs_core::narrow16(value)?,
            "a" => self.a = rcs_core::narrow8(value)?,
            "x" => self.x = rcs_core::narrow8(value)?,
            "y" => self.y = rcs_core::narrow8(value)?,
            "sp" => self.sp = rcs_core::narrow8(value)?,
            "sr" => self.sr = rcs_core::narrow8(value)?,
            _ => return Err(ValueError::NoSuchRegister(name.to_string())),
        }
        Ok(())
    }

    fn flag(&self, name: &str) -> Result<bool, ValueError> {
        let mask = flag_mask(name)?;
        Ok(self.sr & mask != 0)
    }

    fn set_flag(&mut self, name: &str, value: bool) -> Result<(), ValueError> {
        let mask = flag_mask(name)?;
        self.set_flag_if(mask, value);
        Ok(())
    }

    fn save(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::to_value(State {
            pc: self.pc,
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            sr: self.sr,
            irq: self.irq,
            nmi: self.nmi,
            page_cross: self.page_cross,
        })?)
    }

    fn load(&mut self, state: &serde_json::Value) -> Result<(), StateError> {
        let state: State = serde_json::from_value(state.clone())?;
        self.pc = state.pc;
        self.a = state.a;
        self.x = state.x;
        self.y = state.y;
        self.sp = state.sp;
        self.sr = state.sr;
        self.irq = state.irq;
        self.nmi = state.nmi;
        self.page_cross = state.page_cross;
        Ok(())
    }
}

fn flag_mask(name: &str) -> Result<u8, ValueError> {
    match name {
        "c" => Ok(C),
        "z" => Ok(Z),
        "i" => Ok(I),
        "d" => Ok(D),
        "b" => Ok(B),
        "v" => Ok(V),
        "n" => Ok(N),
        _ => Err(ValueError::NoSuchFlag(name.to_string())),
    }
}
