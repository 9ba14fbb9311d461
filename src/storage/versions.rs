use super::persistence::JsonSnapshot;
use crate::core::{BuildVersion, Result};
use crate::interface::VersionStore;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

/// Setting key holding the data revision of the web application.
pub const POOTLE_BUILDVERSION: &str = "POOTLE_BUILDVERSION";

pub fn pootle_version(store: &dyn VersionStore) -> Result<Option<BuildVersion>> {
    store.load(POOTLE_BUILDVERSION)
}

pub fn save_pootle_version(store: &dyn VersionStore, version: BuildVersion) -> Result<()> {
    log::debug!("Saving {} = {}", POOTLE_BUILDVERSION, version);
    store.save(POOTLE_BUILDVERSION, version)
}

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    versions: RwLock<BTreeMap<String, BuildVersion>>,
    history: RwLock<Vec<(String, BuildVersion)>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(key: &str, version: BuildVersion) -> Self {
        let store = Self::new();
        if let Ok(mut versions) = store.versions.write() {
            versions.insert(key.to_string(), version);
        }
        store
    }

    /// Every write performed, oldest first.
    pub fn history(&self) -> Result<Vec<(String, BuildVersion)>> {
        Ok(self.history.read()?.clone())
    }
}

impl VersionStore for InMemoryVersionStore {
    fn load(&self, key: &str) -> Result<Option<BuildVersion>> {
        Ok(self.versions.read()?.get(key).copied())
    }

    fn save(&self, key: &str, version: BuildVersion) -> Result<()> {
        self.versions.write()?.insert(key.to_string(), version);
        self.history.write()?.push((key.to_string(), version));
        Ok(())
    }
}

// ============================================================================
// File-backed
// ============================================================================

/// Version settings kept as a JSON object of `key -> version` in one file.
pub struct FileVersionStore {
    file: JsonSnapshot,
}

impl FileVersionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: JsonSnapshot::new(path),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, BuildVersion>> {
        Ok(self.file.load()?.unwrap_or_default())
    }
}

impl VersionStore for FileVersionStore {
    fn load(&self, key: &str) -> Result<Option<BuildVersion>> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn save(&self, key: &str, version: BuildVersion) -> Result<()> {
        let mut versions = self.read_all()?;
        versions.insert(key.to_string(), version);
        self.file.save(&versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_keeps_other_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileVersionStore::new(temp_dir.path().join("versions.json"));
        assert_eq!(pootle_version(&store).unwrap(), None);

        store.save("TT_BUILDVERSION", BuildVersion(12008)).unwrap();
        save_pootle_version(&store, BuildVersion(21060)).unwrap();
        save_pootle_version(&store, BuildVersion(22000)).unwrap();

        let reopened = FileVersionStore::new(temp_dir.path().join("versions.json"));
        assert_eq!(pootle_version(&reopened).unwrap(), Some(BuildVersion(22000)));
        assert_eq!(reopened.load("TT_BUILDVERSION").unwrap(), Some(BuildVersion(12008)));
    }

    #[test]
    fn test_memory_store_records_history() {
        let store = InMemoryVersionStore::with_version(POOTLE_BUILDVERSION, BuildVersion(20000));
        save_pootle_version(&store, BuildVersion(20030)).unwrap();

        assert_eq!(pootle_version(&store).unwrap(), Some(BuildVersion(20030)));
        assert_eq!(
            store.history().unwrap(),
            vec![(POOTLE_BUILDVERSION.to_string(), BuildVersion(20030))]
        );
    }
}
