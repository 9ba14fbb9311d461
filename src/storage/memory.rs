use super::persistence::JsonSnapshot;
use crate::core::{
    ContentType, Directory, Permission, Project, QuickStats, RecordId, Result, Store,
    StoreFileContent, Suggestion, TranslationProject, Unit, UnitState, UpgradeError,
};
use crate::interface::{Repository, StoreFiles};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, RwLock};

// ============================================================================
// Snapshot
// ============================================================================

/// Serialized form of every table, as stored in the tool's data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    #[serde(default)]
    pub content_types: Vec<ContentType>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub directories: Vec<Directory>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub translation_projects: Vec<TranslationProject>,
    #[serde(default)]
    pub stores: Vec<Store>,
    #[serde(default)]
    pub units: Vec<Unit>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    /// Translation file contents keyed by store id.
    #[serde(default)]
    pub store_files: BTreeMap<RecordId, StoreFileContent>,
}

// ============================================================================
// Tables
// ============================================================================

#[derive(Debug)]
struct Tables {
    content_types: BTreeMap<RecordId, ContentType>,
    permissions: BTreeMap<RecordId, Permission>,
    directories: BTreeMap<RecordId, Directory>,
    projects: BTreeMap<RecordId, Project>,
    translation_projects: BTreeMap<RecordId, TranslationProject>,
    stores: BTreeMap<RecordId, Store>,
    units: BTreeMap<RecordId, Unit>,
    suggestions: BTreeMap<RecordId, Suggestion>,
    store_files: BTreeMap<RecordId, StoreFileContent>,
    next_id: RecordId,
}

fn by_id<T, F: Fn(&T) -> RecordId>(rows: Vec<T>, id: F) -> BTreeMap<RecordId, T> {
    rows.into_iter().map(|row| (id(&row), row)).collect()
}

impl Tables {
    fn from_snapshot(snapshot: RepositorySnapshot) -> Self {
        let mut tables = Tables {
            content_types: by_id(snapshot.content_types, |r| r.id),
            permissions: by_id(snapshot.permissions, |r| r.id),
            directories: by_id(snapshot.directories, |r| r.id),
            projects: by_id(snapshot.projects, |r| r.id),
            translation_projects: by_id(snapshot.translation_projects, |r| r.id),
            stores: by_id(snapshot.stores, |r| r.id),
            units: by_id(snapshot.units, |r| r.id),
            suggestions: by_id(snapshot.suggestions, |r| r.id),
            store_files: snapshot.store_files,
            next_id: 1,
        };
        let max_id = [
            tables.content_types.keys().next_back(),
            tables.permissions.keys().next_back(),
            tables.directories.keys().next_back(),
            tables.projects.keys().next_back(),
            tables.translation_projects.keys().next_back(),
            tables.stores.keys().next_back(),
            tables.units.keys().next_back(),
            tables.suggestions.keys().next_back(),
        ]
        .into_iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0);
        tables.next_id = max_id + 1;
        tables
    }

    fn to_snapshot(&self) -> RepositorySnapshot {
        RepositorySnapshot {
            content_types: self.content_types.values().cloned().collect(),
            permissions: self.permissions.values().cloned().collect(),
            directories: self.directories.values().cloned().collect(),
            projects: self.projects.values().cloned().collect(),
            translation_projects: self.translation_projects.values().cloned().collect(),
            stores: self.stores.values().cloned().collect(),
            units: self.units.values().cloned().collect(),
            suggestions: self.suggestions.values().cloned().collect(),
            store_files: self.store_files.clone(),
        }
    }

    fn allocate_id(&mut self) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn root(&mut self) -> Directory {
        if let Some(root) = self.directories.values().find(|d| d.is_root()) {
            return root.clone();
        }
        let root = Directory {
            id: self.allocate_id(),
            name: String::new(),
            parent_id: None,
            pootle_path: "/".to_string(),
        };
        self.directories.insert(root.id, root.clone());
        root
    }

    fn get_or_make_subdir(&mut self, parent: &Directory, name: &str) -> Directory {
        if let Some(existing) = self
            .directories
            .values()
            .find(|d| d.parent_id == Some(parent.id) && d.name == name)
        {
            return existing.clone();
        }
        let directory = Directory {
            id: self.allocate_id(),
            name: name.to_string(),
            parent_id: Some(parent.id),
            pootle_path: parent.child_path(name),
        };
        self.directories.insert(directory.id, directory.clone());
        directory
    }

    fn directory(&self, id: RecordId) -> Result<&Directory> {
        self.directories
            .get(&id)
            .ok_or_else(|| UpgradeError::NotFound(format!("Directory {}", id)))
    }

    fn translation_project_for(&self, directory_id: RecordId) -> Result<TranslationProject> {
        let mut visited = BTreeSet::new();
        let mut cursor = Some(directory_id);
        while let Some(id) = cursor {
            if !visited.insert(id) {
                return Err(UpgradeError::InvalidRecord(format!(
                    "Directory {} is its own ancestor",
                    id
                )));
            }
            if let Some(tp) = self
                .translation_projects
                .values()
                .find(|tp| tp.directory_id == id)
            {
                return Ok(tp.clone());
            }
            cursor = self.directory(id)?.parent_id;
        }
        let path = &self.directory(directory_id)?.pootle_path;
        Err(UpgradeError::NotFound(format!(
            "Translation project for directory '{}'",
            path
        )))
    }

    fn store_units(&self, store_id: RecordId) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.store_id == store_id)
    }

    fn store_suggestions(&self, store_id: RecordId) -> usize {
        let unit_ids: BTreeSet<RecordId> = self.store_units(store_id).map(|u| u.id).collect();
        self.suggestions
            .values()
            .filter(|s| unit_ids.contains(&s.unit_id))
            .count()
    }

    fn store(&self, store_id: RecordId) -> Result<&Store> {
        self.stores
            .get(&store_id)
            .ok_or_else(|| UpgradeError::NotFound(format!("Store {}", store_id)))
    }
}

// ============================================================================
// Repository
// ============================================================================

/// Record tables held in memory.
///
/// Clones share the same tables, so one handle can serve as both the
/// [`Repository`] and the [`StoreFiles`] of an upgrade run.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::from_snapshot(RepositorySnapshot::default())
    }

    pub fn from_snapshot(snapshot: RepositorySnapshot) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::from_snapshot(snapshot))),
        }
    }

    pub fn snapshot(&self) -> Result<RepositorySnapshot> {
        Ok(self.tables.read()?.to_snapshot())
    }

    /// Load a data file; a missing file yields an empty repository.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let snapshot = JsonSnapshot::new(path)
            .load::<RepositorySnapshot>()?
            .unwrap_or_default();
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        JsonSnapshot::new(path).save(&self.snapshot()?)
    }

    // ------------------------------------------------------------------------
    // Seeding and lookups
    // ------------------------------------------------------------------------

    pub fn root_directory(&self) -> Result<Directory> {
        Ok(self.tables.write()?.root())
    }

    pub fn add_directory(&self, parent_id: RecordId, name: &str) -> Result<Directory> {
        let mut tables = self.tables.write()?;
        let parent = tables.directory(parent_id)?.clone();
        Ok(tables.get_or_make_subdir(&parent, name))
    }

    pub fn add_content_type(
        &self,
        app_label: &str,
        model: &str,
        name: &str,
    ) -> Result<ContentType> {
        let mut tables = self.tables.write()?;
        let content_type = ContentType {
            id: tables.allocate_id(),
            app_label: app_label.to_string(),
            model: model.to_string(),
            name: name.to_string(),
        };
        tables.content_types.insert(content_type.id, content_type.clone());
        Ok(content_type)
    }

    pub fn add_permission(
        &self,
        codename: &str,
        name: &str,
        content_type_id: RecordId,
    ) -> Result<Permission> {
        let mut tables = self.tables.write()?;
        let permission = Permission {
            id: tables.allocate_id(),
            codename: codename.to_string(),
            name: name.to_string(),
            content_type_id,
        };
        tables.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    /// Insert a project row as an older schema would have left it: without
    /// a directory.
    pub fn add_project(&self, code: &str, fullname: &str) -> Result<Project> {
        let mut tables = self.tables.write()?;
        let project = Project {
            id: tables.allocate_id(),
            code: code.to_string(),
            fullname: fullname.to_string(),
            directory_id: None,
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    /// Create a translation project together with its `/<language>/<project>/`
    /// directory.
    pub fn add_translation_project(
        &self,
        project_id: RecordId,
        language_code: &str,
    ) -> Result<TranslationProject> {
        let mut tables = self.tables.write()?;
        let code = tables
            .projects
            .get(&project_id)
            .map(|p| p.code.clone())
            .ok_or_else(|| UpgradeError::NotFound(format!("Project {}", project_id)))?;
        let root = tables.root();
        let language_dir = tables.get_or_make_subdir(&root, language_code);
        let directory = tables.get_or_make_subdir(&language_dir, &code);
        let tp = TranslationProject {
            id: tables.allocate_id(),
            project_id,
            language_code: language_code.to_string(),
            pootle_path: directory.pootle_path.clone(),
            directory_id: directory.id,
        };
        tables.translation_projects.insert(tp.id, tp.clone());
        Ok(tp)
    }

    /// Insert a store under `parent_id` with no translation project assigned.
    pub fn add_store(&self, parent_id: RecordId, name: &str, real_path: &str) -> Result<Store> {
        let mut tables = self.tables.write()?;
        let parent_path = tables.directory(parent_id)?.pootle_path.clone();
        let store = Store {
            id: tables.allocate_id(),
            name: name.to_string(),
            pootle_path: format!("{}{}", parent_path, name),
            real_path: real_path.to_string(),
            parent_id,
            translation_project_id: None,
            sync_time: None,
        };
        tables.stores.insert(store.id, store.clone());
        Ok(store)
    }

    pub fn add_unit(
        &self,
        store_id: RecordId,
        source: &str,
        target: &str,
        state: UnitState,
    ) -> Result<Unit> {
        let mut tables = self.tables.write()?;
        tables.store(store_id)?;
        let index = tables.store_units(store_id).count();
        let unit = Unit {
            id: tables.allocate_id(),
            store_id,
            index,
            source: source.to_string(),
            target: target.to_string(),
            state,
        };
        tables.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    pub fn set_store_file(&self, store_id: RecordId, content: StoreFileContent) -> Result<()> {
        let mut tables = self.tables.write()?;
        tables.store(store_id)?;
        tables.store_files.insert(store_id, content);
        Ok(())
    }

    pub fn directory(&self, id: RecordId) -> Result<Option<Directory>> {
        Ok(self.tables.read()?.directories.get(&id).cloned())
    }

    pub fn store(&self, id: RecordId) -> Result<Option<Store>> {
        Ok(self.tables.read()?.stores.get(&id).cloned())
    }

    pub fn units_for_store(&self, store_id: RecordId) -> Result<Vec<Unit>> {
        Ok(self.tables.read()?.store_units(store_id).cloned().collect())
    }

    pub fn suggestions_for_store(&self, store_id: RecordId) -> Result<Vec<Suggestion>> {
        let tables = self.tables.read()?;
        let unit_ids: BTreeSet<RecordId> = tables.store_units(store_id).map(|u| u.id).collect();
        Ok(tables
            .suggestions
            .values()
            .filter(|s| unit_ids.contains(&s.unit_id))
            .cloned()
            .collect())
    }
}

impl Repository for InMemoryRepository {
    fn get_or_create_content_type(
        &self,
        app_label: &str,
        model: &str,
    ) -> Result<(ContentType, bool)> {
        let mut tables = self.tables.write()?;
        if let Some(existing) = tables
            .content_types
            .values()
            .find(|ct| ct.app_label == app_label && ct.model == model)
        {
            return Ok((existing.clone(), false));
        }
        let content_type = ContentType {
            id: tables.allocate_id(),
            app_label: app_label.to_string(),
            model: model.to_string(),
            name: model.to_string(),
        };
        tables.content_types.insert(content_type.id, content_type.clone());
        Ok((content_type, true))
    }

    fn save_content_type(&self, content_type: &ContentType) -> Result<()> {
        let mut tables = self.tables.write()?;
        tables.content_types.insert(content_type.id, content_type.clone());
        Ok(())
    }

    fn permissions_by_content_type_name(&self, name: &str) -> Result<Vec<Permission>> {
        let tables = self.tables.read()?;
        let content_type_ids: BTreeSet<RecordId> = tables
            .content_types
            .values()
            .filter(|ct| ct.name == name)
            .map(|ct| ct.id)
            .collect();
        Ok(tables
            .permissions
            .values()
            .filter(|p| content_type_ids.contains(&p.content_type_id))
            .cloned()
            .collect())
    }

    fn save_permission(&self, permission: &Permission) -> Result<()> {
        let mut tables = self.tables.write()?;
        if !tables.content_types.contains_key(&permission.content_type_id) {
            return Err(UpgradeError::InvalidRecord(format!(
                "Permission '{}' references missing content type {}",
                permission.codename, permission.content_type_id
            )));
        }
        tables.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    fn root_get_or_make_subdir(&self, name: &str) -> Result<Directory> {
        let mut tables = self.tables.write()?;
        let root = tables.root();
        Ok(tables.get_or_make_subdir(&root, name))
    }

    fn projects(&self) -> Result<Vec<Project>> {
        Ok(self.tables.read()?.projects.values().cloned().collect())
    }

    fn save_project(&self, project: &mut Project) -> Result<()> {
        if project.code.is_empty() || project.code.contains('/') {
            return Err(UpgradeError::InvalidRecord(format!(
                "Invalid project code '{}'",
                project.code
            )));
        }
        let mut tables = self.tables.write()?;
        let root = tables.root();
        let projects_dir = tables.get_or_make_subdir(&root, "projects");
        let directory = tables.get_or_make_subdir(&projects_dir, &project.code);
        project.directory_id = Some(directory.id);
        tables.projects.insert(project.id, project.clone());
        Ok(())
    }

    fn stores(&self) -> Result<Vec<Store>> {
        Ok(self.tables.read()?.stores.values().cloned().collect())
    }

    fn save_store(&self, store: &Store) -> Result<()> {
        let mut tables = self.tables.write()?;
        if !tables.directories.contains_key(&store.parent_id) {
            return Err(UpgradeError::InvalidRecord(format!(
                "Store '{}' references missing directory {}",
                store.pootle_path, store.parent_id
            )));
        }
        if let Some(tp_id) = store.translation_project_id {
            if !tables.translation_projects.contains_key(&tp_id) {
                return Err(UpgradeError::InvalidRecord(format!(
                    "Store '{}' references missing translation project {}",
                    store.pootle_path, tp_id
                )));
            }
        }
        tables.stores.insert(store.id, store.clone());
        Ok(())
    }

    fn directory_translation_project(&self, directory_id: RecordId) -> Result<TranslationProject> {
        self.tables.read()?.translation_project_for(directory_id)
    }

    fn translation_projects_with_obsolete_units(&self) -> Result<Vec<TranslationProject>> {
        let tables = self.tables.read()?;
        let tp_ids: BTreeSet<RecordId> = tables
            .units
            .values()
            .filter(|u| u.state == UnitState::Obsolete)
            .filter_map(|u| tables.stores.get(&u.store_id))
            .filter_map(|s| s.translation_project_id)
            .collect();
        Ok(tp_ids
            .iter()
            .filter_map(|id| tables.translation_projects.get(id))
            .cloned()
            .collect())
    }
}

impl StoreFiles for InMemoryRepository {
    fn require_units(&self, store: &Store) -> Result<()> {
        let mut tables = self.tables.write()?;
        if tables.store_units(store.id).next().is_some() {
            return Ok(());
        }
        let file_units = tables
            .store_files
            .get(&store.id)
            .map(|file| file.units.clone())
            .ok_or_else(|| {
                UpgradeError::StoreFile(format!("{}: no such file", store.real_path))
            })?;
        for (index, file_unit) in file_units.into_iter().enumerate() {
            let unit = Unit {
                id: tables.allocate_id(),
                store_id: store.id,
                index,
                source: file_unit.source,
                target: file_unit.target,
                state: file_unit.state,
            };
            tables.units.insert(unit.id, unit);
        }
        Ok(())
    }

    fn quick_stats(&self, store: &Store) -> Result<QuickStats> {
        let tables = self.tables.read()?;
        let mut stats = QuickStats::default();
        for unit in tables.store_units(store.id) {
            match unit.state {
                UnitState::Obsolete => continue,
                UnitState::Translated => stats.translated += 1,
                UnitState::Fuzzy => stats.fuzzy += 1,
                UnitState::Untranslated => {}
            }
            stats.total += 1;
        }
        stats.suggestions = tables.store_suggestions(store.id);
        Ok(stats)
    }

    fn has_suggestions(&self, store: &Store) -> Result<bool> {
        Ok(self.suggestion_count(store)? > 0)
    }

    fn suggestion_count(&self, store: &Store) -> Result<usize> {
        Ok(self.tables.read()?.store_suggestions(store.id))
    }

    fn import_pending(&self, store: &Store) -> Result<()> {
        let mut tables = self.tables.write()?;
        let pending = match tables.store_files.get_mut(&store.id) {
            Some(file) => std::mem::take(&mut file.pending_suggestions),
            None => return Ok(()),
        };

        for suggestion in pending {
            let unit_id = tables
                .store_units(store.id)
                .find(|u| u.source == suggestion.source)
                .map(|u| u.id);
            let Some(unit_id) = unit_id else {
                debug!(
                    "Dropping pending suggestion for unknown source {:?} in {}",
                    suggestion.source, store.real_path
                );
                continue;
            };
            let duplicate = tables
                .suggestions
                .values()
                .any(|s| s.unit_id == unit_id && s.target == suggestion.target);
            if duplicate {
                continue;
            }
            let id = tables.allocate_id();
            tables.suggestions.insert(
                id,
                Suggestion {
                    id,
                    unit_id,
                    target: suggestion.target,
                    user: suggestion.user,
                },
            );
        }
        Ok(())
    }
}
