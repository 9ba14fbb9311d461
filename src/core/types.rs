use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type RecordId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: RecordId,
    pub app_label: String,
    pub model: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: RecordId,
    pub codename: String,
    pub name: String,
    pub content_type_id: RecordId,
}

/// A node of the `pootle_path` tree.
///
/// The root has no parent and the path `/`; every other directory's path is
/// its parent's path followed by `<name>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub id: RecordId,
    pub name: String,
    pub parent_id: Option<RecordId>,
    pub pootle_path: String,
}

impl Directory {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn child_path(&self, name: &str) -> String {
        format!("{}{}/", self.pootle_path, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub code: String,
    pub fullname: String,
    #[serde(default)]
    pub directory_id: Option<RecordId>,
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fullname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationProject {
    pub id: RecordId,
    pub project_id: RecordId,
    pub language_code: String,
    pub pootle_path: String,
    pub directory_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: RecordId,
    pub name: String,
    pub pootle_path: String,
    /// Location of the backing translation file, relative to the
    /// translation directory.
    pub real_path: String,
    pub parent_id: RecordId,
    #[serde(default)]
    pub translation_project_id: Option<RecordId>,
    #[serde(default)]
    pub sync_time: Option<DateTime<Utc>>,
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pootle_path)
    }
}

/// Translation state of a unit, stored as the web application's numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum UnitState {
    Obsolete,
    Untranslated,
    Fuzzy,
    Translated,
}

impl UnitState {
    /// Numeric state code as stored by the web application.
    pub fn code(self) -> i32 {
        match self {
            UnitState::Obsolete => -100,
            UnitState::Untranslated => 0,
            UnitState::Fuzzy => 50,
            UnitState::Translated => 200,
        }
    }
}

impl From<UnitState> for i32 {
    fn from(state: UnitState) -> Self {
        state.code()
    }
}

impl TryFrom<i32> for UnitState {
    type Error = String;

    fn try_from(code: i32) -> std::result::Result<Self, Self::Error> {
        match code {
            -100 => Ok(UnitState::Obsolete),
            0 => Ok(UnitState::Untranslated),
            50 => Ok(UnitState::Fuzzy),
            200 => Ok(UnitState::Translated),
            other => Err(format!("unknown unit state code {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: RecordId,
    pub store_id: RecordId,
    pub index: usize,
    pub source: String,
    #[serde(default)]
    pub target: String,
    pub state: UnitState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: RecordId,
    pub unit_id: RecordId,
    pub target: String,
    #[serde(default)]
    pub user: Option<String>,
}

/// A unit as it appears in a translation file before it is parsed into the
/// database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUnit {
    pub source: String,
    #[serde(default)]
    pub target: String,
    pub state: UnitState,
}

/// A suggestion left in a pending file, keyed by the source text it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSuggestion {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFileContent {
    #[serde(default)]
    pub units: Vec<FileUnit>,
    #[serde(default)]
    pub pending_suggestions: Vec<PendingSuggestion>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickStats {
    /// Non-obsolete units.
    pub total: usize,
    pub translated: usize,
    pub fuzzy: usize,
    pub suggestions: usize,
}

impl QuickStats {
    pub fn untranslated(&self) -> usize {
        self.total.saturating_sub(self.translated + self.fuzzy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        let root = Directory {
            id: 1,
            name: String::new(),
            parent_id: None,
            pootle_path: "/".to_string(),
        };
        assert!(root.is_root());
        assert_eq!(root.child_path("projects"), "/projects/");
    }

    #[test]
    fn test_unit_state_serializes_as_code() {
        assert_eq!(serde_json::to_value(UnitState::Obsolete).unwrap(), serde_json::json!(-100));
        assert_eq!(serde_json::to_value(UnitState::Fuzzy).unwrap(), serde_json::json!(50));

        let state: UnitState = serde_json::from_str("200").unwrap();
        assert_eq!(state, UnitState::Translated);
        assert!(serde_json::from_str::<UnitState>("100").is_err());
        assert!(serde_json::from_str::<UnitState>("\"translated\"").is_err());
    }

    #[test]
    fn test_quick_stats_untranslated() {
        let stats = QuickStats { total: 10, translated: 6, fuzzy: 1, suggestions: 0 };
        assert_eq!(stats.untranslated(), 3);
    }
}
