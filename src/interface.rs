use crate::core::{
    BuildVersion, ContentType, Directory, Permission, Project, QuickStats, RecordId, Result, Store,
    TranslationProject,
};
use serde_json::Value;

/// Record access needed by the upgrade actions.
///
/// This is the slice of the web application's ORM the actions touch. An
/// implementation may wrap a real database; `InMemoryRepository` backs tests
/// and the command-line tool.
pub trait Repository: Send + Sync {
    /// Fetch the content type identified by `(app_label, model)`, creating it
    /// when it does not exist. The flag is `true` when a row was created.
    fn get_or_create_content_type(&self, app_label: &str, model: &str)
    -> Result<(ContentType, bool)>;

    fn save_content_type(&self, content_type: &ContentType) -> Result<()>;

    /// All permissions whose content type carries the display name `name`.
    fn permissions_by_content_type_name(&self, name: &str) -> Result<Vec<Permission>>;

    fn save_permission(&self, permission: &Permission) -> Result<()>;

    /// Fetch the direct child `name` of the root directory, creating it when
    /// missing.
    fn root_get_or_make_subdir(&self, name: &str) -> Result<Directory>;

    fn projects(&self) -> Result<Vec<Project>>;

    /// Persist a project. Saving re-derives the project's directory.
    fn save_project(&self, project: &mut Project) -> Result<()>;

    fn stores(&self) -> Result<Vec<Store>>;

    fn save_store(&self, store: &Store) -> Result<()>;

    /// The translation project owning `directory_id`, looking through the
    /// directory's ancestors.
    fn directory_translation_project(&self, directory_id: RecordId) -> Result<TranslationProject>;

    /// Distinct translation projects with at least one obsolete unit.
    fn translation_projects_with_obsolete_units(&self) -> Result<Vec<TranslationProject>>;
}

/// Operations on the translation file behind a store.
pub trait StoreFiles: Send + Sync {
    /// Make sure the store's units are parsed into the database.
    fn require_units(&self, store: &Store) -> Result<()>;

    fn quick_stats(&self, store: &Store) -> Result<QuickStats>;

    fn has_suggestions(&self, store: &Store) -> Result<bool>;

    fn suggestion_count(&self, store: &Store) -> Result<usize>;

    /// Import suggestions waiting in the store's pending file.
    fn import_pending(&self, store: &Store) -> Result<()>;
}

/// Key/value cache shared with the web application.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn delete_many(&self, keys: &[String]) -> Result<()>;
}

/// Persisted build-version settings, one entry per product key.
pub trait VersionStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<BuildVersion>>;

    fn save(&self, key: &str, version: BuildVersion) -> Result<()>;
}
