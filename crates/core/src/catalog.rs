//! Activity Catalog
//!
//! An immutable lookup of activity definitions by `(learner, activity key)`.
//! A miss is an expected outcome (`None`), never an error.

use crate::activity::{Activity, AuthoredActivity};
use crate::error::{CatalogError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Lessons bundled with the crate.
const BUILTIN_CATALOG: &str = include_str!("../data/lessons.json");

/// Defines the contract for any source of activity definitions.
///
/// Lookups are synchronous and side-effect-free from the session's point of
/// view, so a session can call it in the middle of a turn.
#[cfg_attr(test, mockall::automock)]
pub trait Catalog: Send + Sync {
    /// Returns the activity `activity_key` as seen by `learner_id`, if any.
    fn lookup(&self, learner_id: &str, activity_key: &str) -> Option<Arc<Activity>>;
}

/// On-disk layout of a catalog file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    activities: Vec<AuthoredActivity>,
    /// Activities assigned to a single learner, keyed by learner id.
    learners: BTreeMap<String, Vec<AuthoredActivity>>,
}

/// A `Catalog` held entirely in memory.
///
/// Activities assigned to a specific learner take precedence over shared
/// activities with the same key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    shared: HashMap<String, Arc<Activity>>,
    assigned: HashMap<String, HashMap<String, Arc<Activity>>>,
}

fn validated(position: usize, raw: AuthoredActivity) -> Result<Activity> {
    if raw.key.trim().is_empty() {
        return Err(CatalogError::EmptyKey(position));
    }
    Ok(raw.validate())
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a catalog from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (position, raw) in file.activities.into_iter().enumerate() {
            catalog.insert(validated(position, raw)?)?;
        }
        for (learner, activities) in file.learners {
            for (position, raw) in activities.into_iter().enumerate() {
                catalog.assign(&learner, validated(position, raw)?)?;
            }
        }
        Ok(catalog)
    }

    /// Loads a catalog file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!(path = %path.display(), activities = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    /// The lessons shipped with this crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// Adds an activity available to every learner.
    pub fn insert(&mut self, activity: Activity) -> Result<()> {
        if self.shared.contains_key(&activity.key) {
            return Err(CatalogError::DuplicateKey(activity.key));
        }
        self.shared.insert(activity.key.clone(), Arc::new(activity));
        Ok(())
    }

    /// Adds an activity visible only to `learner_id`.
    pub fn assign(&mut self, learner_id: &str, activity: Activity) -> Result<()> {
        let learner = self.assigned.entry(learner_id.to_string()).or_default();
        if learner.contains_key(&activity.key) {
            return Err(CatalogError::DuplicateKey(activity.key));
        }
        learner.insert(activity.key.clone(), Arc::new(activity));
        Ok(())
    }

    /// Number of shared activities.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.is_empty()
    }

    /// Shared activities sorted by key.
    pub fn activities(&self) -> Vec<Arc<Activity>> {
        let mut all: Vec<_> = self.shared.values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }
}

impl Catalog for InMemoryCatalog {
    fn lookup(&self, learner_id: &str, activity_key: &str) -> Option<Arc<Activity>> {
        self.assigned
            .get(learner_id)
            .and_then(|activities| activities.get(activity_key))
            .or_else(|| self.shared.get(activity_key))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = InMemoryCatalog::builtin().expect("bundled catalog should be valid");
        assert_eq!(catalog.len(), 3);

        let kite = catalog
            .lookup("anyone", "lost_kite_activity")
            .expect("lost kite should be present");
        assert_eq!(kite.sub_tasks.len(), 3);
        assert_eq!(kite.sub_tasks[2].max_attempts, 2);

        let gatsby = catalog.lookup("anyone", "gatsby_character_analysis").unwrap();
        assert!(gatsby.sub_tasks.is_empty());
    }

    #[test]
    fn test_lookup_miss_is_none() {
        let catalog = InMemoryCatalog::builtin().unwrap();
        assert!(catalog.lookup("student", "no_such_activity").is_none());
    }

    #[test]
    fn test_learner_assignment_takes_precedence() {
        let catalog = InMemoryCatalog::from_json_str(
            r#"{
                "activities": [{ "key": "warmup", "name": "Shared Warmup" }],
                "learners": { "student123": [{ "key": "warmup", "name": "Personal Warmup" }] }
            }"#,
        )
        .unwrap();

        assert_eq!(catalog.lookup("student123", "warmup").unwrap().name, "Personal Warmup");
        assert_eq!(catalog.lookup("student456", "warmup").unwrap().name, "Shared Warmup");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = InMemoryCatalog::from_json_str(
            r#"{ "activities": [{ "key": "a" }, { "key": "a" }] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey(key) if key == "a"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = InMemoryCatalog::from_json_str(r#"{ "activities": [{ "key": "ok" }, { "key": "  " }] }"#)
            .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyKey(1)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = InMemoryCatalog::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "activities": [{{ "key": "from_disk", "sub_tasks": [{{}}] }}] }}"#).unwrap();

        let catalog = InMemoryCatalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.activities()[0].key, "from_disk");
    }

    #[test]
    fn test_from_path_missing_file_is_io_error() {
        let err = InMemoryCatalog::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
