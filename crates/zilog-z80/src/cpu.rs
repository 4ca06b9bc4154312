//! CPU state, register pairs, and interrupt handling.

use std::fmt;

use rcs_core::{Cpu, Memory, Pointer, StateError, Stmt, Value, ValueError};
use serde::{Deserialize, Serialize};

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

/// Which register pair the HL slot refers to. The DD and FD prefixes
/// swap HL for one of the index registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Hl,
    Ix,
    Iy,
}

/// The Zilog Z80 processor.
#[derive(Debug)]
pub struct Z80 {
    /// Program counter, always the address of the next instruction.
    pub pc: u16,
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    /// Shadow registers.
    pub a1: u8,
    pub f1: u8,
    pub b1: u8,
    pub c1: u8,
    pub d1: u8,
    pub e1: u8,
    pub h1: u8,
    pub l1: u8,

    /// Interrupt vector base.
    pub i: u8,
    /// DRAM refresh counter.
    pub r: u8,
    pub ixh: u8,
    pub ixl: u8,
    pub iyh: u8,
    pub iyl: u8,
    pub sp: u16,

    /// Interrupt flip flops.
    pub iff1: bool,
    pub iff2: bool,
    /// Interrupt mode.
    pub im: u8,
    /// Halted by instruction.
    pub halt: bool,

    /// I/O port space, one bank of 256 addresses.
    pub ports: Memory,
    /// Set to request a maskable interrupt. Cleared once seen.
    pub irq: bool,
    /// Data placed on the bus for interrupt mode 2.
    pub irq_data: u8,
    /// Set to request a non-maskable interrupt.
    pub nmi: bool,
    /// Set to request a reset.
    pub reset: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct State {
    pc: u16,
    a: u8,
    f: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    h: u8,
    l: u8,
    a1: u8,
    f1: u8,
    b1: u8,
    c1: u8,
    d1: u8,
    e1: u8,
    h1: u8,
    l1: u8,
    i: u8,
    r: u8,
    ixh: u8,
    ixl: u8,
    iyh: u8,
    iyl: u8,
    sp: u16,
    iff1: bool,
    iff2: bool,
    im: u8,
    halt: bool,
    ports: Vec<Vec<u8>>,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        let mut ports = Memory::new(1, 0x100);
        let ram = ports.ram(vec![0; 0x100]);
        ports.map_ram(0, ram);
        Self {
            pc: 0,
            a: 0,
            f: 0,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            a1: 0,
            f1: 0,
            b1: 0,
            c1: 0,
            d1: 0,
            e1: 0,
            h1: 0,
            l1: 0,
            i: 0,
            r: 0,
            ixh: 0,
            ixl: 0,
            iyh: 0,
            iyl: 0,
            sp: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halt: false,
            ports,
            irq: false,
            irq_data: 0,
            nmi: false,
            reset: false,
        }
    }

    // ========================================================================
    // Register pairs
    // ========================================================================

    pub(crate) fn af(&self) -> u16 {
        u16::from(self.a) << 8 | u16::from(self.f)
    }

    pub(crate) fn set_af(&mut self, v: u16) {
        self.a = (v >> 8) as u8;
        self.f = v as u8;
    }

    pub(crate) fn bc(&self) -> u16 {
        u16::from(self.b) << 8 | u16::from(self.c)
    }

    pub(crate) fn set_bc(&mut self, v: u16) {
        self.b = (v >> 8) as u8;
        self.c = v as u8;
    }

    pub(crate) fn de(&self) -> u16 {
        u16::from(self.d) << 8 | u16::from(self.e)
    }

    pub(crate) fn set_de(&mut self, v: u16) {
        self.d = (v >> 8) as u8;
        self.e = v as u8;
    }

    pub(crate) fn hl(&self) -> u16 {
        u16::from(self.h) << 8 | u16::from(self.l)
    }

    pub(crate) fn set_hl(&mut self, v: u16) {
        self.h = (v >> 8) as u8;
        self.l = v as u8;
    }

    pub(crate) fn ix(&self) -> u16 {
        u16::from(self.ixh) << 8 | u16::from(self.ixl)
    }

    pub(crate) fn set_ix(&mut self, v: u16) {
        self.ixh = (v >> 8) as u8;
        self.ixl = v as u8;
    }

    pub(crate) fn iy(&self) -> u16 {
        u16::from(self.iyh) << 8 | u16::from(self.iyl)
    }

    pub(crate) fn set_iy(&mut self, v: u16) {
        self.iyh = (v >> 8) as u8;
        self.iyl = v as u8;
    }

    /// The HL slot, remapped by the active prefix.
    pub(crate) fn hl_slot(&self, idx: Index) -> u16 {
        match idx {
            Index::Hl => self.hl(),
            Index::Ix => self.ix(),
            Index::Iy => self.iy(),
        }
    }

    pub(crate) fn set_hl_slot(&mut self, idx: Index, v: u16) {
        match idx {
            Index::Hl => self.set_hl(v),
            Index::Ix => self.set_ix(v),
            Index::Iy => self.set_iy(v),
        }
    }

    // ========================================================================
    // Fetch and stack
    // ========================================================================

    pub(crate) fn fetch(&mut self, mem: &mut Memory) -> u8 {
        let v = mem.read(usize::from(self.pc));
        self.pc = self.pc.wrapping_add(1);
        v
    }

    pub(crate) fn fetch2(&mut self, mem: &mut Memory) -> u16 {
        let lo = u16::from(self.fetch(mem));
        let hi = u16::from(self.fetch(mem));
        hi << 8 | lo
    }

    pub(crate) fn push2(&mut self, mem: &mut Memory, v: u16) {
        self.sp = self.sp.wrapping_sub(2);
        mem.write_le(usize::from(self.sp), v);
    }

    pub(crate) fn pull2(&mut self, mem: &mut Memory) -> u16 {
        let v = mem.read_le(usize::from(self.sp));
        self.sp = self.sp.wrapping_add(2);
        v
    }

    /// The lower 7 bits of the refresh register are incremented on
    /// each instruction fetch.
    pub(crate) fn refresh_r(&mut self) {
        let bit7 = self.r & 0x80;
        self.r = self.r.wrapping_add(1) & 0x7f | bit7;
    }

    // ========================================================================
    // Interrupts
    // ========================================================================

    fn irq_ack(&mut self, mem: &mut Memory) {
        if self.im == 0 {
            tracing::warn!("z80: unsupported interrupt mode 0");
            return;
        }
        let ret = self.pc;
        self.halt = false;
        self.iff1 = false;
        self.iff2 = false;
        self.push2(mem, ret);
        if self.im == 2 {
            let vector = usize::from(self.i) << 8 | usize::from(self.irq_data);
            self.pc = mem.read_le(vector);
        } else {
            self.pc = 0x0038;
        }
    }

    // IFF2 is left alone so RETN can restore the pre-interrupt state.
    fn nmi_ack(&mut self, mem: &mut Memory) {
        let ret = self.pc;
        self.halt = false;
        self.iff1 = false;
        self.push2(mem, ret);
        self.pc = 0x0066;
    }

    fn reset_ack(&mut self) {
        self.iff1 = false;
        self.iff2 = false;
        self.halt = false;
        self.pc = 0;
        self.i = 0;
        self.r = 0;
        self.im = 0;
    }
}

/// Status in the form of:
/// ```text
///  pc   af   bc   de   hl   ix   iy   sp   i  r
/// 0000 0aff 0b0c 0d0e f00f 1234 5678 abcd  ee ff iff1
/// im 0 a088 b0c0 d0e0 0ff0      S Z 5 H 3 V N C  iff2
/// ```
impl fmt::Display for Z80 {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = |mask: u8, ch: &'static str| if self.f & mask != 0 { ch } else { "." };
        let iff1 = if self.iff1 { "iff1" } else { "" };
        let iff2 = if self.iff2 { "iff2" } else { "" };
        write!(
            out,
            " pc   af   bc   de   hl   ix   iy   sp   i  r\n\
             {:04x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:04x}  {:02x} {:02x} {}\n\
             im {} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x} {:02x}{:02x}      {} {} {} {} {} {} {} {}  {}",
            self.pc,
            self.a, self.f,
            self.b, self.c,
            self.d, self.e,
            self.h, self.l,
            self.ixh, self.ixl,
            self.iyh, self.iyl,
            self.sp,
            self.i,
            self.r,
            iff1,
            self.im,
            self.a1, self.f1,
            self.b1, self.c1,
            self.d1, self.e1,
            self.h1, self.l1,
            b(SF, "S"),
            b(ZF, "Z"),
            b(YF, "5"),
            b(HF, "H"),
            b(XF, "3"),
            b(PF, "V"),
            b(NF, "N"),
            b(CF, "C"),
            iff2,
        )
    }
}

impl Cpu for Z80 {
    fn next(&mut self, mem: &mut Memory) {
        if !self.halt {
            self.execute(mem);
        }
        if self.irq {
            self.irq = false;
            if self.iff1 {
                self.irq_ack(mem);
            }
        }
        if self.nmi {
            self.nmi = false;
            self.nmi_ack(mem);
        }
        if self.reset {
            self.reset = false;
            self.reset_ack();
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

    fn dasm_bytes_width(&self) -> usize {
        11
    }

    fn register_names(&self) -> &'static [&'static str] {
        &[
            "pc", "af", "bc", "de", "hl", "ix", "iy", "sp", "a", "f", "b", "c", "d", "e", "h",
            "l", "ixh", "ixl", "iyh", "iyl", "i", "r", "af1", "bc1", "de1", "hl1", "a1", "f1",
            "b1", "c1", "d1", "e1", "h1", "l1", "im", "iff1", "iff2", "halt",
        ]
    }

    fn flag_names(&self) -> &'static [&'static str] {
        &["c", "n", "v", "p", "3", "h", "5", "z", "s"]
    }

    fn register(&self, name: &str) -> Result<Value, ValueError> {
        let v = match name {
            "pc" => Value::U16(self.pc),
            "af" => Value::U16(self.af()),
            "bc" => Value::U16(self.bc()),
            "de" => Value::U16(self.de()),
            "hl" => Value::U16(self.hl()),
            "ix" => Value::U16(self.ix()),
            "iy" => Value::U16(self.iy()),
            "sp" => Value::U16(self.sp),
            "a" => Value::U8(self.a),
            "f" => Value::U8(self.f),
            "b" => Value::U8(self.b),
            "c" => Value::U8(self.c),
            "d" => Value::U8(self.d),
            "e" => Value::U8(self.e),
            "h" => Value::U8(self.h),
            "l" => Value::U8(self.l),
            "ixh" => Value::U8(self.ixh),
            "ixl" => Value::U8(self.ixl),
            "iyh" => Value::U8(self.iyh),
            "iyl" => Value::U8(self.iyl),
            "i" => Value::U8(self.i),
            "r" => Value::U8(self.r),
            "af1" => Value::U16(u16::from(self.a1) << 8 | u16::from(self.f1)),
            "bc1" => Value::U16(u16::from(self.b1) << 8 | u16::from(self.c1)),
            "de1" => Value::U16(u16::from(self.d1) << 8 | u16::from(self.e1)),
            "hl1" => Value::U16(u16::from(self.h1) << 8 | u16::from(self.l1)),
            "a1" => Value::U8(self.a1),
            "f1" => Value::U8(self.f1),
            "b1" => Value::U8(self.b1),
            "c1" => Value::U8(self.c1),
            "d1" => Value::U8(self.d1),
            "e1" => Value::U8(self.e1),
            "h1" => Value::U8(self.h1),
            "l1" => Value::U8(self.l1),
            "im" => Value::U8(self.im),
            "iff1" => Value::Bool(self.iff1),
            "iff2" => Value::Bool(self.iff2),
            "halt" => Value::Bool(self.halt),
            _ => return Err(ValueError::NoSuchRegister(name.to_string())),
        };
        Ok(v)
    }

    #[allow(clippy::too_many_lines)]
    fn set_register(&mut self, name: &str, value: usize) -> Result<(), ValueError> {
        use rcs_core::{narrow16, narrow8};
        match name {
            "pc" => self.pc = narrow16(value)?,
            "af" => self.set_af(narrow16(value)?),
            "bc" => self.set_bc(narrow16(value)?),
            "de" => self.set_de(narrow16(value)?),
            "hl" => self.set_hl(narrow16(value)?),
            "ix" => self.set_ix(narrow16(value)?),
            "iy" => self.set_iy(narrow16(value)?),
            "sp" => self.sp = narrow16(value)?,
            "a" => self.a = narrow8(value)?,
            "f" => self.f = narrow8(value)?,
            "b" => self.b = narrow8(value)?,
            "c" => self.c = narrow8(value)?,
            "d" => self.d = narrow8(value)?,
            "e" => self.e = narrow8(value)?,
            "h" => self.h = narrow8(value)?,
            "l" => self.l = narrow8(value)?,
            "ixh" => self.ixh = narrow8(value)?,
            "ixl" => self.ixl = narrow8(value)?,
            "iyh" => self.iyh = narrow8(value)?,
            "iyl" => self.iyl = narrow8(value)?,
            "i" => self.i = narrow8(value)?,
            "r" => self.r = narrow8(value)?,
            "af1" => {
                let v = narrow16(value)?;
                self.a1 = (v >> 8) as u8;
                self.f1 = v as u8;
            }
            "bc1" => {
                let v = narrow16(value)?;
                self.b1 = (v >> 8) as u8;
                self.c1 = v as u8;
            }
            "de1" => {
                let v = narrow16(value)?;
                self.d1 = (v >> 8) as u8;
                self.e1 = v as u8;
            }
            "hl1" => {
                let v = narrow16(value)?;
                self.h1 = (v >> 8) as u8;
                self.l1 = v as u8;
            }
            "a1" => self.a1 = narrow8(value)?,
            "f1" => self.f1 = narrow8(value)?,
            "b1" => self.b1 = narrow8(value)?,
            "c1" => self.c1 = narrow8(value)?,
            "d1" => self.d1 = narrow8(value)?,
            "e1" => self.e1 = narrow8(value)?,
            "h1" => self.h1 = narrow8(value)?,
            "l1" => self.l1 = narrow8(value)?,
            "im" => self.im = narrow8(value)?,
            "iff1" => self.iff1 = value != 0,
            "iff2" => self.iff2 = value != 0,
            "halt" => self.halt = value != 0,
            _ => return Err(ValueError::NoSuchRegister(name.to_string())),
        }
        Ok(())
    }

    fn flag(&self, name: &str) -> Result<bool, ValueError> {
        let mask = flag_mask(name)?;
        Ok(self.f & mask != 0)
    }

    fn set_flag(&mut self, name: &str, value: bool) -> Result<(), ValueError> {
        let mask = flag_mask(name)?;
        if value {
            self.f |= mask;
        } else {
            self.f &= !mask;
        }
        Ok(())
    }

    fn save(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::to_value(State {
            pc: self.pc,
            a: self.a,
            f: self.f,
            b: self.b,
            c: self.c,
            d: self.d,
            e: self.e,
            h: self.h,
            l: self.l,
            a1: self.a1,
            f1: self.f1,
            b1: self.b1,
            c1: self.c1,
            d1: self.d1,
            e1: self.e1,
            h1: self.h1,
            l1: self.l1,
            i: self.i,
            r: self.r,
            ixh: self.ixh,
            ixl: self.ixl,
            iyh: self.iyh,
            iyl: self.iyl,
            sp: self.sp,
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halt: self.halt,
            ports: self.ports.ram_contents(),
        })?)
    }

    fn load(&mut self, state: &serde_json::Value) -> Result<(), StateError> {
        let state: State = serde_json::from_value(state.clone())?;
        self.pc = state.pc;
        self.a = state.a;
        self.f = state.f;
        self.b = state.b;
        self.c = state.c;
        self.d = state.d;
        self.e = state.e;
        self.h = state.h;
        self.l = state.l;
        self.a1 = state.a1;
        self.f1 = state.f1;
        self.b1 = state.b1;
        self.c1 = state.c1;
        self.d1 = state.d1;
        self.e1 = state.e1;
        self.h1 = state.h1;
        self.l1 = state.l1;
        self.i = state.i;
        self.r = state.r;
        self.ixh = state.ixh;
        self.ixl = state.ixl;
        self.iyh = state.iyh;
        self.iyl = state.iyl;
        self.sp = state.sp;
        self.iff1 = state.iff1;
        self.iff2 = state.iff2;
        self.im = state.im;
        self.halt = state.halt;
        self.ports
            .restore_ram(&state.ports)
            .map_err(StateError::Mismatch)?;
        Ok(())
    }
}

fn flag_mask(name: &str) -> Result<u8, ValueError> {
    match name {
        "c" => Ok(CF),
        "n" => Ok(NF),
        "v" | "p" => Ok(PF),
        "3" => Ok(XF),
        "h" => Ok(HF),
        "5" => Ok(YF),
        "z" => Ok(ZF),
        "s" => Ok(SF),
        _ => Err(ValueError::NoSuchFlag(name.to_string())),
    }
}
