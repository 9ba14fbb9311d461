//! Atomic JSON files backing the on-disk state of the command-line tool.

use crate::core::{Result, UpgradeError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct JsonSnapshot {
    path: PathBuf,
}

impl JsonSnapshot {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write `value` next to the target and rename it into place, so readers
    /// never observe a half-written file.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| {
            UpgradeError::Io(format!("Failed to create directory '{}': {}", parent.display(), e))
        })?;

        let temp_file = NamedTempFile::new_in(&parent)
            .map_err(|e| UpgradeError::Io(format!("Failed to create temp file: {}", e)))?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush().map_err(|e| {
                UpgradeError::Io(format!("Failed to flush '{}': {}", self.path.display(), e))
            })?;
        }
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| {
                UpgradeError::Io(format!("Failed to sync '{}': {}", self.path.display(), e))
            })?;
        temp_file.persist(&self.path).map_err(|e| {
            UpgradeError::Io(format!("Failed to rename into '{}': {}", self.path.display(), e))
        })?;
        Ok(())
    }

    /// `Ok(None)` when the file does not exist yet.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if !self.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path).map_err(|e| {
            UpgradeError::Io(format!("Failed to open '{}': {}", self.path.display(), e))
        })?;
        let value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            UpgradeError::Serialization(format!("Failed to parse '{}': {}", self.path.display(), e))
        })?;
        Ok(Some(value))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}
