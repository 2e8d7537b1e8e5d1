//! Engine configuration and durability levels
//!
//! Controls where table files live and how hard a save works to reach the disk.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default directory for table files, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Durability level for table saves
///
/// Every save is atomic (temp file + rename) regardless of the level; the level only
/// decides whether the bytes are forced to stable storage before and after the rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DurabilityLevel {
    /// fsync the temp file before rename and the directory after it.
    ///
    /// Survives power loss: after `execute` returns, the new file is on disk.
    #[default]
    Synchronous,

    /// Leave flushing to the OS page cache.
    ///
    /// Still never exposes a half-written file, but a power loss may roll the
    /// table back to an older save. Tests and benchmarks only.
    NoSync,
}

impl DurabilityLevel {
    pub fn synchronous() -> Self {
        Self::Synchronous
    }

    pub fn no_sync() -> Self {
        Self::NoSync
    }

    /// Whether a save must fsync before returning
    pub fn requires_sync(&self) -> bool {
        matches!(self, Self::Synchronous)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous (fsync file and directory)",
            Self::NoSync => "no sync (testing only)",
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding one `<table>.json` file per table
    pub data_dir: PathBuf,

    /// How saves reach the disk
    pub durability: DurabilityLevel,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            durability: DurabilityLevel::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Preset for tests: given directory, no fsync
    pub fn for_testing(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            durability: DurabilityLevel::NoSync,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_durability(mut self, durability: DurabilityLevel) -> Self {
        self.durability = durability;
        self
    }

    /// Path of the file backing `table_name`
    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", table_name))
    }
}
