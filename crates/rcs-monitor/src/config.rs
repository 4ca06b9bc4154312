//! Resource directories.
//!
//! The monitor keeps its files under a single root: `data/` for ROM
//! images and other inputs, `var/` for exported machine state. The
//! root comes from `$RCS_HOME` when set, otherwise `~/rcs`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        let root = match env::var("RCS_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(env::var("HOME").unwrap_or_default()).join("rcs"),
        };
        Self { root }
    }

    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    #[must_use]
    pub fn var_dir(&self) -> PathBuf {
        self.root.join("var")
    }

    /// Create the state directory if needed and return it.
    pub fn ensure_var_dir(&self) -> io::Result<PathBuf> {
        let dir = self.var_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
