use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::vault::FileRecord;
use crate::vfs::FileSystem;

/// Persisted snapshot of the vault's derived tag index.
#[derive(Serialize, Deserialize)]
pub(crate) struct IndexCache {
    pub version: u32,
    pub files: HashMap<String, FileRecord>,
}

impl IndexCache {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn from_records(files: HashMap<String, FileRecord>) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            files,
        }
    }

    pub fn load(path: &Path, fs: &dyn FileSystem) -> Result<Self, Box<dyn std::error::Error>> {
        let buffer = fs.read_all(path)?;
        let cache: IndexCache = bincode::deserialize(&buffer)?;

        if cache.version != Self::CURRENT_VERSION {
            return Err("Incompatible cache version".into());
        }

        Ok(cache)
    }

    pub fn save(&self, path: &Path, fs: &dyn FileSystem) -> Result<(), Box<dyn std::error::Error>> {
        let buffer = bincode::serialize(self)?;
        fs.write_all(path, &buffer)?;
        Ok(())
    }
}
