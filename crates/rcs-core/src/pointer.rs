//! Advancing cursor over a memory.

use crate::Memory;

/// A cursor with an address mask, used to decode instructions linearly
/// and to fill RAM during loads. The address is always kept within the
/// mask.
#[derive(Debug, Clone, Copy)]
pub struct Pointer {
    addr: usize,
    mask: usize,
}

impl Default for Pointer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pointer {
    /// Create a pointer at address zero with the default 16-bit mask.
    #[must_use]
    pub fn new() -> Self {
        Self {
            addr: 0,
            mask: 0xffff,
        }
    }

    /// Create a pointer with a custom mask.
    #[must_use]
    pub fn with_mask(mask: usize) -> Self {
        Self { addr: 0, mask }
    }

    /// Current address.
    #[must_use]
    pub fn addr(&self) -> usize {
        self.addr
    }

    /// Move to `addr`, masked.
    pub fn set_addr(&mut self, addr: usize) {
        self.addr = addr & self.mask;
    }

    /// Read the current byte without advancing.
    pub fn peek(&self, mem: &mut Memory) -> u8 {
        mem.read(self.addr)
    }

    /// Read the current byte and advance by one.
    pub fn fetch(&mut self, mem: &mut Memory) -> u8 {
        let value = mem.read(self.addr);
        self.addr = (self.addr + 1) & self.mask;
        value
    }

    /// Read two bytes little-endian and advance by two.
    pub fn fetch_le(&mut self, mem: &mut Memory) -> u16 {
        let lo = u16::from(self.fetch(mem));
        let hi = u16::from(self.fetch(mem));
        hi << 8 | lo
    }

    /// Write the current byte and advance by one.
    pub fn put(&mut self, mem: &mut Memory, value: u8) {
        mem.write(self.addr, value);
        self.addr = (self.addr + 1) & self.mask;
    }

    /// Write a sequence of bytes, advancing past them.
    pub fn put_n(&mut self, mem: &mut Memory, values: &[u8]) {
        for v in values {
            self.put(mem, *v);
        }
    }
}
