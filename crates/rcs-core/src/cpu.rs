//! The interface every CPU core presents to the machine and monitor.

use std::fmt;

use crate::state::StateError;
use crate::value::{Value, ValueError};
use crate::{Memory, Pointer, Stmt};

/// A CPU core driven by the machine.
///
/// The `Display` implementation renders the register status block shown
/// by the monitor. `pc()` always reports the address of the next
/// instruction to execute; breakpoints and traces compare against it
/// directly.
pub trait Cpu: fmt::Display + Send {
    /// Execute the next instruction, then service any pending
    /// interrupts.
    fn next(&mut self, mem: &mut Memory);

    /// Address of the next instruction to execute.
    fn pc(&self) -> usize;

    /// Move execution to `addr`.
    fn set_pc(&mut self, addr: usize);

    /// Decode one statement at the pointer, advancing it past the
    /// instruction.
    fn disassemble(&self, mem: &mut Memory, ptr: &mut Pointer) -> Stmt;

    /// Width of the bytes column in disassembly listings.
    fn dasm_bytes_width(&self) -> usize {
        8
    }

    /// Register names accepted by [`Cpu::register`], in display order.
    fn register_names(&self) -> &'static [&'static str];

    /// Flag names accepted by [`Cpu::flag`], in display order.
    fn flag_names(&self) -> &'static [&'static str];

    /// Read a register by name.
    fn register(&self, name: &str) -> Result<Value, ValueError>;

    /// Write a register by name. The value is narrowed to the
    /// register's width.
    fn set_register(&mut self, name: &str, value: usize) -> Result<(), ValueError>;

    /// Read a flag by name.
    fn flag(&self, name: &str) -> Result<bool, ValueError>;

    /// Write a flag by name.
    fn set_flag(&mut self, name: &str, value: bool) -> Result<(), ValueError>;

    /// Capture the full architectural state for a snapshot.
    fn save(&self) -> Result<serde_json::Value, StateError>;

    /// Restore state captured by [`Cpu::save`]. Unknown fields fail.
    fn load(&mut self, state: &serde_json::Value) -> Result<(), StateError>;
}
