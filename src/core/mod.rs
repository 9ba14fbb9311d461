pub mod error;
pub mod types;
pub mod version;

pub use error::{Result, UpgradeError};
pub use types::{
    ContentType, Directory, FileUnit, PendingSuggestion, Permission, Project, QuickStats,
    RecordId, Store, StoreFileContent, Suggestion, TranslationProject, Unit, UnitState,
};
pub use version::{BuildVersion, CURRENT_BUILD_VERSION};
