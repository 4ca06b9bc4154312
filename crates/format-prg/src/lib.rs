//! CBM PRG program file loader.
//!
//! A PRG file starts with a two byte little-endian load address followed
//! by the raw program contents. BASIC programs also need the zero page
//! end-of-program pointers moved past the loaded data.

use rcs_core::Memory;
use thiserror::Error;

/// Start of BASIC variable storage.
const BASIC_VARS: usize = 0x002d;
/// Start of BASIC array storage.
const BASIC_ARRAYS: usize = 0x002f;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrgError {
    #[error("invalid prg file: {0} byte(s)")]
    TooShort(usize),
}

/// Load a PRG image into memory at the address named in its header.
/// Returns the load address. With `basic`, the variable and array
/// storage pointers are set to just past the program.
pub fn load(mem: &mut Memory, data: &[u8], basic: bool) -> Result<u16, PrgError> {
    if data.len() < 2 {
        return Err(PrgError::TooShort(data.len()));
    }
    let addr = u16::from(data[0]) | u16::from(data[1]) << 8;
    let contents = &data[2..];
    mem.write_n(usize::from(addr), contents);
    if basic {
        let vstart = usize::from(addr) + contents.len() + 1;
        mem.write_le(BASIC_VARS, vstart as u16);
        mem.write_le(BASIC_ARRAYS, vstart as u16);
    }
    Ok(addr)
}
