//! Versioned state snapshots for export and import.
//!
//! A snapshot carries the full architectural state of every CPU and the
//! contents of every writable RAM block, in declaration order. ROM is
//! never serialized. The format is self-describing JSON with a version
//! field; unknown fields and version mismatches fail the load.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current snapshot format version. Bumped on every
/// backward-incompatible change.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot errors.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid snapshot: {0}")]
    Format(#[from] serde_json::Error),
    #[error("snapshot version {found} not supported (current is {SNAPSHOT_VERSION})")]
    Version { found: u32 },
    #[error("snapshot does not match machine: {0}")]
    Mismatch(String),
}

/// Serialized machine state.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub version: u32,
    /// One entry per CPU, in machine order.
    pub cpus: Vec<serde_json::Value>,
    /// Writable RAM regions per memory, in declaration order.
    pub ram: Vec<Vec<Vec<u8>>>,
}

impl Snapshot {
    /// Create an empty snapshot at the current version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            cpus: Vec::new(),
            ram: Vec::new(),
        }
    }

    /// Serialize to a writer.
    pub fn write_to<W: Write>(&self, w: W) -> Result<(), StateError> {
        serde_json::to_writer(w, self)?;
        Ok(())
    }

    /// Deserialize from a reader, verifying the version.
    pub fn read_from<R: Read>(r: R) -> Result<Self, StateError> {
        let snapshot: Snapshot = serde_json::from_reader(r)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StateError::Version {
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}
