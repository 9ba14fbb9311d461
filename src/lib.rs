// ============================================================================
// Pootle post-upgrade actions
// ============================================================================

pub mod cache;
pub mod config;
pub mod core;
pub mod interface;
pub mod storage;
pub mod upgrade;

// Re-export main types for convenience
pub use cache::{MemoryCache, cache_key, iri_to_uri};
pub use config::UpgradeConfig;
pub use crate::core::{BuildVersion, CURRENT_BUILD_VERSION, Result, UpgradeError};
pub use interface::{Cache, Repository, StoreFiles, VersionStore};
pub use storage::{
    FileVersionStore, InMemoryRepository, InMemoryVersionStore, POOTLE_BUILDVERSION,
    pootle_version, save_pootle_version,
};
pub use upgrade::{
    ActionReport, ItemOutcome, ItemStatus, UPGRADE_ACTIONS, UpgradeAction, UpgradeContext,
    UpgradeReport, upgrade, upgrade_functions,
};
