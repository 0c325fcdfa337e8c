use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{Result, TesseraError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Rows per block. A block is sealed once it holds this many rows.
    pub block_capacity: usize,
    /// Growth increment for columns whose definition does not set one.
    pub default_increment: usize,
    /// Decode column payloads on the rayon pool when loading.
    pub parallel_load: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            block_capacity: 65536,
            default_increment: 65536,
            parallel_load: true,
        }
    }
}

impl StoreConfig {
    pub fn with_block_capacity(block_capacity: usize) -> Self {
        Self {
            block_capacity,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_capacity == 0 {
            return Err(TesseraError::Other(
                "block_capacity must be greater than zero".into(),
            ));
        }
        if self.default_increment == 0 {
            return Err(TesseraError::Other(
                "default_increment must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: StoreConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
