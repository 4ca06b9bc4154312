//! Test doubles shared by the core and monitor test suites.
//!
//! `MockCpu` is a tiny synthetic processor: the high nibble of each
//! opcode is the number of operand bytes it consumes (capped at two).
//! That is enough to exercise stepping, breakpoints, disassembly, and
//! register editing without a real core.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::StateError;
use crate::value::{narrow16, narrow8, Value, ValueError};
use crate::{Cpu, Memory, Pointer, Stmt};

/// Build a 64K memory with RAM everywhere.
#[must_use]
pub fn test_memory() -> Memory {
    let mut mem = Memory::new(1, 0x10000);
    let ram = mem.ram(vec![0; 0x10000]);
    mem.map_ram(0, ram);
    mem
}

/// Synthetic CPU for tests.
#[derive(Debug, Default)]
pub struct MockCpu {
    pub pc: u16,
    pub a: u8,
    pub b: u8,
    pub q: bool,
    pub z: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MockState {
    pc: u16,
    a: u8,
    b: u8,
    q: bool,
    z: bool,
}

impl MockCpu {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Display for MockCpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pc:{:04x} a:{:02x} b:{:02x} q:{} z:{}",
            self.pc, self.a, self.b, self.q, self.z
        )
    }
}

impl Cpu for MockCpu {
    fn next(&mut self, mem: &mut Memory) {
        let opcode = mem.read(usize::from(self.pc));
        self.pc = self.pc.wrapping_add(1);
        let narg = u16::from((opcode >> 4).min(2));
        self.pc = self.pc.wrapping_add(narg);
    }

    fn pc(&self) -> usize {
        usize::from(self.pc)
    }

    fn set_pc(&mut self, addr: usize) {
        self.pc = addr as u16;
    }

    fn disassemble(&self, mem: &mut Memory, ptr: &mut Pointer) -> Stmt {
        let mut stmt = Stmt {
            addr: ptr.addr(),
            ..Stmt::default()
        };
        let opcode = ptr.fetch(mem);
        stmt.bytes.push(opcode);
        match opcode >> 4 {
            0 => stmt.op = format!("i{opcode:02x}"),
            1 => {
                let value = ptr.fetch(mem);
                stmt.bytes.push(value);
                stmt.op = format!("i{opcode:02x} ${value:02x}");
            }
            _ => {
                let value = ptr.fetch_le(mem);
                stmt.bytes.push((value & 0xff) as u8);
                stmt.bytes.push((value >> 8) as u8);
                stmt.op = format!("i{opcode:02x} ${value:04x}");
            }
        }
        stmt
    }

    fn register_names(&self) -> &'static [&'static str] {
        &["pc", "a", "b"]
    }

    fn flag_names(&self) -> &'static [&'static str] {
        &["q", "z"]
    }

    fn register(&self, name: &str) -> Result<Value, ValueError> {
        match name {
            "pc" => Ok(Value::U16(self.pc)),
            "a" => Ok(Value::U8(self.a)),
            "b" => Ok(Value::U8(self.b)),
            _ => Err(ValueError::NoSuchRegister(name.to_string())),
        }
    }

    fn set_register(&mut self, name: &str, value: usize) -> Result<(), ValueError> {
        match name {
            "pc" => self.pc = narrow16(value)?,
            "a" => self.a = narrow8(value)?,
            "b" => self.b = narrow8(value)?,
            _ => return Err(ValueError::NoSuchRegister(name.to_string())),
        }
        Ok(())
    }

    fn flag(&self, name: &str) -> Result<bool, ValueError> {
        match name {
            "q" => Ok(self.q),
            "z" => Ok(self.z),
            _ => Err(ValueError::NoSuchFlag(name.to_string())),
        }
    }

    fn set_flag(&mut self, name: &str, value: bool) -> Result<(), ValueError> {
        match name {
            "q" => self.q = value,
            "z" => self.z = value,
            _ => return Err(ValueError::NoSuchFlag(name.to_string())),
        }
        Ok(())
    }

    fn save(&self) -> Result<serde_json::Value, StateError> {
        Ok(serde_json::to_value(MockState {
            pc: self.pc,
            a: self.a,
            b: self.b,
            q: self.q,
            z: self.z,
        })?)
    }

    fn load(&mut self, state: &serde_json::Value) -> Result<(), StateError> {
        let state: MockState = serde_json::from_value(state.clone())?;
        self.pc = state.pc;
        self.a = state.a;
        self.b = state.b;
        self.q = state.q;
        self.z = state.z;
        Ok(())
    }
}
