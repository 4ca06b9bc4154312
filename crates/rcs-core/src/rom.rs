//! ROM loading with SHA-1 verification.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use sha1::{Digest, Sha1};
use thiserror::Error;

/// One ROM image to load. Multiple entries with the same `name`
/// concatenate in declaration order.
#[derive(Debug, Clone)]
pub struct RomDef {
    /// Key in the returned map.
    pub name: &'static str,
    /// File name relative to the load directory.
    pub file: &'static str,
    /// Expected SHA-1 digest, lowercase hex. Empty skips verification.
    pub sha1: &'static str,
}

impl RomDef {
    #[must_use]
    pub fn new(name: &'static str, file: &'static str, sha1: &'static str) -> Self {
        Self { name, file, sha1 }
    }
}

/// ROM loading failure. All problems found during a load are reported
/// together; a load never partially succeeds.
#[derive(Debug, Error)]
pub enum RomError {
    #[error("unable to load ROMs:\n{}", .0.join("\n"))]
    Load(Vec<String>),
}

/// Read and verify every ROM in `defs` from `dir`.
///
/// # Errors
///
/// Returns [`RomError::Load`] carrying one message per missing file or
/// checksum mismatch.
pub fn load_roms(dir: &Path, defs: &[RomDef]) -> Result<HashMap<String, Vec<u8>>, RomError> {
    let mut roms: HashMap<String, Vec<u8>> = HashMap::new();
    let mut errs: Vec<String> = Vec::new();

    for def in defs {
        let path = dir.join(def.file);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                errs.push(format!("{}: {err}", path.display()));
                continue;
            }
        };
        if !def.sha1.is_empty() {
            let digest = Sha1::digest(&data);
            let have: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            if have != def.sha1 {
                errs.push(format!(
                    "{}: checksum mismatch, have {have}, want {}",
                    path.display(),
                    def.sha1
                ));
                continue;
            }
        }
        roms.entry(def.name.to_string()).or_default().extend(data);
    }

    if errs.is_empty() {
        Ok(roms)
    } else {
        Err(RomError::Load(errs))
    }
}
