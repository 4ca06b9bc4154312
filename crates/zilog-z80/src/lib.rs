//! Zilog Z80 CPU core.
//!
//! Instruction-level interpreter covering the full documented set plus
//! the common undocumented instructions: IXH/IXL/IYH/IYL register
//! halves, the SLL shift, and the DDCB/FDCB register-copy forms. The
//! DD and FD prefixes are decoded structurally, so a prefixed opcode
//! with no indexed meaning executes as its unprefixed form.

mod cpu;
mod dasm;
mod execute;
pub mod flags;

pub use cpu::Z80;
