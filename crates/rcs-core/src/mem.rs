//! Banked memory with per-address load/store dispatch.
//!
//! A `Memory` holds `banks × size` parallel dispatch tables. Each
//! (bank, address) has one read entry and one write entry. Entries are
//! compact tags into arenas owned by the memory: byte blocks for RAM and
//! ROM, boxed handlers for memory-mapped I/O. Selecting a bank re-points
//! the active tables and never copies entries.
//!
//! Every address starts out unmapped: reads return zero and writes are
//! discarded, each logging a warning. ROM mappings replace only the read
//! entry, so a ROM can overlay RAM — reads see the ROM while writes still
//! land in the RAM underneath.

use tracing::warn;

/// Read handler for memory-mapped I/O.
pub type LoadFn = Box<dyn FnMut() -> u8 + Send>;

/// Write handler for memory-mapped I/O.
pub type StoreFn = Box<dyn FnMut(u8) + Send>;

/// Callback invoked when a watched address is accessed.
pub type EventFn = Box<dyn FnMut(MemoryEvent) + Send>;

/// Handle to a byte block registered with [`Memory::ram`] or
/// [`Memory::rom`]. The same block may be mapped at any number of
/// addresses and banks without copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockId(usize);

/// Notification of an access to a watched address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryEvent {
    /// Bank that was active during the access.
    pub bank: usize,
    /// Address accessed.
    pub addr: usize,
    /// Value read or written.
    pub value: u8,
    /// True for a read, false for a write.
    pub read: bool,
}

#[derive(Debug, Clone, Copy)]
enum ReadEntry {
    Unmapped,
    Nil,
    Block { block: usize, offset: usize },
    Load(usize),
}

#[derive(Debug, Clone, Copy)]
enum WriteEntry {
    Unmapped,
    Nil,
    Block { block: usize, offset: usize },
    Store(usize),
}

const WATCH_R: u8 = 1 << 0;
const WATCH_W: u8 = 1 << 1;

struct Block {
    data: Vec<u8>,
    writable: bool,
}

/// Bank-selectable address space.
pub struct Memory {
    reads: Vec<Vec<ReadEntry>>,
    writes: Vec<Vec<WriteEntry>>,
    watches: Vec<Vec<u8>>,
    bank: usize,
    size: usize,
    blocks: Vec<Block>,
    loads: Vec<LoadFn>,
    stores: Vec<StoreFn>,
    callback: Option<EventFn>,
}

impl Memory {
    /// Create a memory with the given number of banks and addresses per
    /// bank. All addresses start unmapped.
    ///
    /// # Panics
    ///
    /// Panics if `banks` or `size` is zero.
    #[must_use]
    pub fn new(banks: usize, size: usize) -> Self {
        assert!(banks > 0, "memory must have at least one bank");
        assert!(size > 0, "memory must have a non-zero size");
        Self {
            reads: vec![vec![ReadEntry::Unmapped; size]; banks],
            writes: vec![vec![WriteEntry::Unmapped; size]; banks],
            watches: vec![vec![0; size]; banks],
            bank: 0,
            size,
            blocks: Vec::new(),
            loads: Vec::new(),
            stores: Vec::new(),
            callback: None,
        }
    }

    /// Inclusive highest valid address.
    #[must_use]
    pub fn max_addr(&self) -> usize {
        self.size - 1
    }

    /// Number of banks.
    #[must_use]
    pub fn banks(&self) -> usize {
        self.reads.len()
    }

    /// Currently selected bank.
    #[must_use]
    pub fn bank(&self) -> usize {
        self.bank
    }

    /// Select the active bank. O(1): re-points the dispatch tables.
    ///
    /// # Panics
    ///
    /// Panics if `bank` is out of range.
    pub fn set_bank(&mut self, bank: usize) {
        assert!(bank < self.reads.len(), "bank {bank} out of range");
        self.bank = bank;
    }

    /// Install the callback that receives [`MemoryEvent`]s for watched
    /// addresses.
    pub fn set_callback(&mut self, callback: EventFn) {
        self.callback = Some(callback);
    }

    // ========================================================================
    // Reads and writes
    // ========================================================================

    /// Read one byte through the active bank's dispatch table.
    ///
    /// Unmapped addresses return zero and log a warning. Never allocates.
    pub fn read(&mut self, addr: usize) -> u8 {
        let value = match self.reads[self.bank][addr] {
            ReadEntry::Unmapped => {
                warn!("unmapped memory read, bank {}, addr {:#x}", self.bank, addr);
                0
            }
            ReadEntry::Nil => 0,
            ReadEntry::Block { block, offset } => self.blocks[block].data[offset],
            ReadEntry::Load(h) => (self.loads[h])(),
        };
        if self.watches[self.bank][addr] & WATCH_R != 0 {
            self.emit(addr, value, true);
        }
        value
    }

    /// Write one byte through the active bank's dispatch table.
    ///
    /// Unmapped addresses discard the value and log a warning.
    pub fn write(&mut self, addr: usize, value: u8) {
        match self.writes[self.bank][addr] {
            WriteEntry::Unmapped => {
                warn!(
                    "unmapped memory write, bank {}, addr {:#x}, value {:#04x}",
                    self.bank, addr, value
                );
            }
            WriteEntry::Nil => {}
            WriteEntry::Block { block, offset } => self.blocks[block].data[offset] = value,
            WriteEntry::Store(h) => (self.stores[h])(value),
        }
        if self.watches[self.bank][addr] & WATCH_W != 0 {
            self.emit(addr, value, false);
        }
    }

    /// Read a 16-bit value, little-endian.
    pub fn read_le(&mut self, addr: usize) -> u16 {
        let lo = u16::from(self.read(addr));
        let hi = u16::from(self.read(addr + 1));
        hi << 8 | lo
    }

    /// Write a 16-bit value, little-endian.
    pub fn write_le(&mut self, addr: usize, value: u16) {
        self.write(addr, (value & 0xff) as u8);
        self.write(addr + 1, (value >> 8) as u8);
    }

    /// Write a sequence of bytes starting at `addr`.
    pub fn write_n(&mut self, addr: usize, values: &[u8]) {
        for (i, v) in values.iter().enumerate() {
            self.write(addr + i, *v);
        }
    }

    fn emit(&mut self, addr: usize, value: u8, read: bool) {
        if let Some(callback) = self.callback.as_mut() {
            callback(MemoryEvent {
                bank: self.bank,
                addr,
                value,
                read,
            });
        }
    }

    // ========================================================================
    // Mapping
    // ========================================================================

    /// Register a writable block. Nothing is mapped until
    /// [`Memory::map_ram`] or [`Memory::map_rom`] is called.
    pub fn ram(&mut self, data: Vec<u8>) -> BlockId {
        self.blocks.push(Block {
            data,
            writable: true,
        });
        BlockId(self.blocks.len() - 1)
    }

    /// Register a read-only block.
    pub fn rom(&mut self, data: Vec<u8>) -> BlockId {
        self.blocks.push(Block {
            data,
            writable: false,
        });
        BlockId(self.blocks.len() - 1)
    }

    /// Register a single writable cell, for device registers.
    pub fn cell(&mut self, value: u8) -> BlockId {
        self.ram(vec![value])
    }

    /// Map a block into the active bank at `addr` for both reads and
    /// writes.
    pub fn map_ram(&mut self, addr: usize, block: BlockId) {
        let len = self.blocks[block.0].data.len();
        for i in 0..len {
            self.reads[self.bank][addr + i] = ReadEntry::Block {
                block: block.0,
                offset: i,
            };
            self.writes[self.bank][addr + i] = WriteEntry::Block {
                block: block.0,
                offset: i,
            };
        }
    }

    /// Map a block into the active bank at `addr` for reads only. Any
    /// existing write entries are preserved, so a ROM can overlay RAM.
    pub fn map_rom(&mut self, addr: usize, block: BlockId) {
        let len = self.blocks[block.0].data.len();
        for i in 0..len {
            self.reads[self.bank][addr + i] = ReadEntry::Block {
                block: block.0,
                offset: i,
            };
        }
    }

    /// Map a single cell for reads and writes.
    pub fn map_rw(&mut self, addr: usize, cell: BlockId) {
        self.map_ram(addr, cell);
    }

    /// Map a single cell for reads only.
    pub fn map_ro(&mut self, addr: usize, cell: BlockId) {
        self.reads[self.bank][addr] = ReadEntry::Block {
            block: cell.0,
            offset: 0,
        };
    }

    /// Map a single cell for writes only.
    pub fn map_wo(&mut self, addr: usize, cell: BlockId) {
        self.writes[self.bank][addr] = WriteEntry::Block {
            block: cell.0,
            offset: 0,
        };
    }

    /// Install a read handler at `addr` in the active bank.
    pub fn map_load(&mut self, addr: usize, load: LoadFn) {
        self.loads.push(load);
        self.reads[self.bank][addr] = ReadEntry::Load(self.loads.len() - 1);
    }

    /// Install a write handler at `addr` in the active bank.
    pub fn map_store(&mut self, addr: usize, store: StoreFn) {
        self.stores.push(store);
        self.writes[self.bank][addr] = WriteEntry::Store(self.stores.len() - 1);
    }

    /// Absorb `sub` and paste its active-bank dispatch into the active
    /// bank at `base`. The sub-memory's blocks and handlers become part
    /// of this memory. To alias the pasted range at further addresses,
    /// use [`Memory::mirror`].
    pub fn map(&mut self, base: usize, sub: Memory) {
        let block_base = self.blocks.len();
        let load_base = self.loads.len();
        let store_base = self.stores.len();
        self.blocks.extend(sub.blocks);
        self.loads.extend(sub.loads);
        self.stores.extend(sub.stores);
        for (i, entry) in sub.reads[sub.bank].iter().enumerate() {
            let entry = match *entry {
                ReadEntry::Unmapped => continue,
                ReadEntry::Nil => ReadEntry::Nil,
                ReadEntry::Block { block, offset } => ReadEntry::Block {
                    block: block + block_base,
                    offset,
                },
                ReadEntry::Load(h) => ReadEntry::Load(h + load_base),
            };
            self.reads[self.bank][base + i] = entry;
        }
        for (i, entry) in sub.writes[sub.bank].iter().enumerate() {
            let entry = match *entry {
                WriteEntry::Unmapped => continue,
                WriteEntry::Nil => WriteEntry::Nil,
                WriteEntry::Block { block, offset } => WriteEntry::Block {
                    block: block + block_base,
                    offset,
                },
                WriteEntry::Store(h) => WriteEntry::Store(h + store_base),
            };
            self.writes[self.bank][base + i] = entry;
        }
    }

    /// Alias `len` addresses starting at `from` to also appear at
    /// `base`, sharing the same storage and handlers.
    pub fn mirror(&mut self, base: usize, from: usize, len: usize) {
        for i in 0..len {
            self.reads[self.bank][base + i] = self.reads[self.bank][from + i];
            self.writes[self.bank][base + i] = self.writes[self.bank][from + i];
        }
    }

    /// Restore unmapped-warning behavior at `addr` in the active bank.
    pub fn unmap(&mut self, addr: usize) {
        self.reads[self.bank][addr] = ReadEntry::Unmapped;
        self.writes[self.bank][addr] = WriteEntry::Unmapped;
    }

    /// Silently discard accesses at `addr`: reads return zero, writes
    /// are dropped, nothing is logged.
    pub fn map_nil(&mut self, addr: usize) {
        self.reads[self.bank][addr] = ReadEntry::Nil;
        self.writes[self.bank][addr] = WriteEntry::Nil;
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Contents of a registered block.
    #[must_use]
    pub fn block(&self, block: BlockId) -> &[u8] {
        &self.blocks[block.0].data
    }

    /// Mutable contents of a registered block.
    pub fn block_mut(&mut self, block: BlockId) -> &mut [u8] {
        &mut self.blocks[block.0].data
    }

    /// Current value of a cell registered with [`Memory::cell`].
    #[must_use]
    pub fn cell_value(&self, cell: BlockId) -> u8 {
        self.blocks[cell.0].data[0]
    }

    /// Set the value of a cell registered with [`Memory::cell`].
    pub fn set_cell(&mut self, cell: BlockId, value: u8) {
        self.blocks[cell.0].data[0] = value;
    }

    /// Contents of every writable block, in registration order. Used by
    /// state snapshots; ROM blocks are never included.
    #[must_use]
    pub fn ram_contents(&self) -> Vec<Vec<u8>> {
        self.blocks
            .iter()
            .filter(|b| b.writable)
            .map(|b| b.data.clone())
            .collect()
    }

    /// Restore writable block contents captured by
    /// [`Memory::ram_contents`]. Fails if the region count or any
    /// region length differs.
    pub fn restore_ram(&mut self, regions: &[Vec<u8>]) -> Result<(), String> {
        let targets: Vec<usize> = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.writable)
            .map(|(i, _)| i)
            .collect();
        if targets.len() != regions.len() {
            return Err(format!(
                "expected {} RAM regions, found {}",
                targets.len(),
                regions.len()
            ));
        }
        for (i, region) in targets.into_iter().zip(regions) {
            if self.blocks[i].data.len() != region.len() {
                return Err(format!(
                    "RAM region length mismatch: expected {}, found {}",
                    self.blocks[i].data.len(),
                    region.len()
                ));
            }
            self.blocks[i].data.copy_from_slice(region);
        }
        Ok(())
    }

    // ========================================================================
    // Watches
    // ========================================================================

    /// Watch reads at `addr` in the active bank.
    pub fn watch_ro(&mut self, addr: usize) {
        self.watches[self.bank][addr] = WATCH_R;
    }

    /// Watch writes at `addr` in the active bank.
    pub fn watch_wo(&mut self, addr: usize) {
        self.watches[self.bank][addr] = WATCH_W;
    }

    /// Watch reads and writes at `addr` in the active bank.
    pub fn watch_rw(&mut self, addr: usize) {
        self.watches[self.bank][addr] = WATCH_R | WATCH_W;
    }

    /// Remove any watch at `addr` in the active bank.
    pub fn unwatch(&mut self, addr: usize) {
        self.watches[self.bank][addr] = 0;
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("banks", &self.reads.len())
            .field("size", &self.size)
            .field("bank", &self.bank)
            .finish_non_exhaustive()
    }
}
