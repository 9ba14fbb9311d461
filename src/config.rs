use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::core::{BuildVersion, CURRENT_BUILD_VERSION, Result, UpgradeError};
use std::path::PathBuf;

/// Upgrade run configuration
///
/// Built with the setters below, from the environment with [`UpgradeConfig::from_env`],
/// or both (environment first, then overrides).
#[derive(Debug, Clone)]
pub struct UpgradeConfig {
    /// Record data file (JSON snapshot of the repository)
    pub data_path: PathBuf,

    /// Build-version settings file
    pub versions_path: PathBuf,

    /// Optional cache dump to seed the cache from and write back to
    pub cache_path: Option<PathBuf>,

    /// Maximum number of cache entries kept in memory
    pub cache_capacity: usize,

    /// Build version to upgrade to
    pub target_version: BuildVersion,

    /// Stop the run when an action reports failed items
    pub abort_on_item_failure: bool,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("pootle-data.json"),
            versions_path: PathBuf::from("pootle-versions.json"),
            cache_path: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            target_version: CURRENT_BUILD_VERSION,
            abort_on_item_failure: false,
        }
    }
}

impl UpgradeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `POOTLE_UPGRADE_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`UpgradeConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup("POOTLE_UPGRADE_DATA") {
            config.data_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("POOTLE_UPGRADE_VERSIONS") {
            config.versions_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("POOTLE_UPGRADE_CACHE") {
            config.cache_path = Some(PathBuf::from(path));
        }
        if let Some(capacity) = lookup("POOTLE_UPGRADE_CACHE_CAPACITY") {
            config.cache_capacity = capacity.trim().parse().map_err(|e| {
                UpgradeError::Config(format!(
                    "POOTLE_UPGRADE_CACHE_CAPACITY '{}': {}",
                    capacity, e
                ))
            })?;
        }
        if let Some(version) = lookup("POOTLE_UPGRADE_TARGET") {
            config.target_version = version.parse()?;
        }
        if let Some(strict) = lookup("POOTLE_UPGRADE_STRICT") {
            config.abort_on_item_failure =
                matches!(strict.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(config)
    }

    /// Set the record data file
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set the build-version settings file
    pub fn versions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.versions_path = path.into();
        self
    }

    /// Set the cache dump file
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Set the in-memory cache capacity
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the build version to upgrade to
    pub fn target_version(mut self, version: BuildVersion) -> Self {
        self.target_version = version;
        self
    }

    /// Abort when an action reports failed items
    pub fn abort_on_item_failure(mut self, abort: bool) -> Self {
        self.abort_on_item_failure = abort;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_target_current_build() {
        let config = UpgradeConfig::new();
        assert_eq!(config.target_version, CURRENT_BUILD_VERSION);
        assert!(!config.abort_on_item_failure);
        assert!(config.cache_path.is_none());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("POOTLE_UPGRADE_DATA", "/srv/pootle/data.json"),
            ("POOTLE_UPGRADE_CACHE", "/srv/pootle/cache.json"),
            ("POOTLE_UPGRADE_CACHE_CAPACITY", "64"),
            ("POOTLE_UPGRADE_TARGET", "21060"),
            ("POOTLE_UPGRADE_STRICT", "yes"),
        ]
        .into_iter()
        .collect();

        let config =
            UpgradeConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.data_path, PathBuf::from("/srv/pootle/data.json"));
        assert_eq!(config.cache_path, Some(PathBuf::from("/srv/pootle/cache.json")));
        assert_eq!(config.cache_capacity, 64);
        assert_eq!(config.target_version, BuildVersion(21060));
        assert!(config.abort_on_item_failure);
        assert_eq!(config.versions_path, PathBuf::from("pootle-versions.json"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_capacity() {
        let result = UpgradeConfig::from_lookup(|name| {
            (name == "POOTLE_UPGRADE_CACHE_CAPACITY").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = UpgradeConfig::new()
            .data_path("data.json")
            .cache_capacity(16)
            .abort_on_item_failure(true);
        assert_eq!(config.data_path, PathBuf::from("data.json"));
        assert_eq!(config.cache_capacity, 16);
        assert!(config.abort_on_item_failure);
    }
}
