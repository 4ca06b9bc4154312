//! MOS Technology 6502 CPU core.
//!
//! Instruction-level interpreter covering the legal opcode set,
//! including binary-coded decimal arithmetic and the IRQ/NMI/BRK
//! interrupt sequences. Illegal opcodes are logged and skipped.

mod cpu;
mod dasm;
mod execute;
pub mod flags;

pub use cpu::Mos6502;
