//! Core building blocks for retro computer systems.
//!
//! Everything a machine needs besides the CPUs themselves: the banked
//! memory fabric with per-address dispatch, the shared flag-exact ALU,
//! the disassembly framework, the machine driver, character decoders,
//! ROM loading, and state snapshots.

mod alu;
mod chardec;
mod cpu;
mod dasm;
pub mod mach;
mod mem;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
mod pointer;
mod rom;
mod state;
mod value;

pub use alu::{add8, from_bcd, sub8, to_bcd, Alu};
pub use chardec::{ascii_decoder, az26_decoder, petscii, CharDecoder};
pub use cpu::Cpu;
pub use dasm::{format_stmt, FormatOptions, Stmt};
pub use mach::{EventCallback, Mach, MachCmd, MachEvent, Status, VBlankFn};
pub use mem::{BlockId, EventFn, LoadFn, Memory, MemoryEvent, StoreFn};
pub use pointer::Pointer;
pub use rom::{load_roms, RomDef, RomError};
pub use state::{Snapshot, StateError, SNAPSHOT_VERSION};
pub use value::{narrow16, narrow8, Value, ValueError};
