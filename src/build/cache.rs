//! Tagged model cache.
//!
//! Keyed either by coordinates or by source identity, with a closed set of
//! tags. Entries are cloned on the way in and on the way out so concurrent
//! consumers never observe each other's in-place mutations; the interior
//! mutex serializes access. The cache is optional everywhere - a missing
//! cache just means repeated work.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::build::result::ModelData;
use crate::core::descriptor::{DependencyManagement, Descriptor};
use crate::sources::Source;

/// Cache tag - what kind of value lives under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Tag {
    /// Parsed and file-validated descriptor, per source.
    FileModel,
    /// Raw model data, per coordinates or per source.
    Raw,
    /// Imported dependency-management section, per coordinates.
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Coordinates {
        group_id: String,
        artifact_id: String,
        version: String,
        tag: Tag,
    },
    Source {
        location: String,
        tag: Tag,
    },
}

enum Value {
    FileModel(Descriptor),
    Raw(ModelData),
    Import(DependencyManagement),
}

/// Tagged keyed store for intermediate build products.
#[derive(Default)]
pub struct ModelCache {
    entries: Mutex<HashMap<Key, Value>>,
}

impl ModelCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        ModelCache::default()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store the parsed file model for a source.
    pub fn put_file_model(&self, source: &dyn Source, model: &Descriptor) {
        self.insert(
            Key::Source {
                location: source.location().to_string(),
                tag: Tag::FileModel,
            },
            Value::FileModel(model.clone()),
        );
    }

    /// The parsed file model for a source, as a caller-owned clone.
    pub fn file_model(&self, source: &dyn Source) -> Option<Descriptor> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(&Key::Source {
            location: source.location().to_string(),
            tag: Tag::FileModel,
        }) {
            Some(Value::FileModel(model)) => Some(model.clone()),
            _ => None,
        }
    }

    /// Store raw model data under its coordinates.
    pub fn put_raw_by_coordinates(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        data: &ModelData,
    ) {
        self.insert(
            Key::Coordinates {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
                version: version.to_string(),
                tag: Tag::Raw,
            },
            Value::Raw(data.clone()),
        );
    }

    /// Raw model data by coordinates, as a caller-owned clone.
    pub fn raw_by_coordinates(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Option<ModelData> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(&Key::Coordinates {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            tag: Tag::Raw,
        }) {
            Some(Value::Raw(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Store raw model data under its source identity.
    pub fn put_raw_by_source(&self, source: &dyn Source, data: &ModelData) {
        self.insert(
            Key::Source {
                location: source.location().to_string(),
                tag: Tag::Raw,
            },
            Value::Raw(data.clone()),
        );
    }

    /// Raw model data by source identity, as a caller-owned clone.
    pub fn raw_by_source(&self, source: &dyn Source) -> Option<ModelData> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(&Key::Source {
            location: source.location().to_string(),
            tag: Tag::Raw,
        }) {
            Some(Value::Raw(data)) => Some(data.clone()),
            _ => None,
        }
    }

    /// Store an imported dependency-management section.
    pub fn put_import(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
        management: &DependencyManagement,
    ) {
        self.insert(
            Key::Coordinates {
                group_id: group_id.to_string(),
                artifact_id: artifact_id.to_string(),
                version: version.to_string(),
                tag: Tag::Import,
            },
            Value::Import(management.clone()),
        );
    }

    /// An imported dependency-management section, as a caller-owned clone.
    pub fn import(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Option<DependencyManagement> {
        let entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(&Key::Coordinates {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            tag: Tag::Import,
        }) {
            Some(Value::Import(management)) => Some(management.clone()),
            _ => None,
        }
    }

    // Write-once per key: the first write wins, later writes for the same
    // key are ignored rather than reconciled.
    fn insert(&self, key: Key, value: Value) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.entry(key).or_insert(value);
    }
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModelCache({} entries)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::StringSource;

    fn model(artifact_id: &str) -> Descriptor {
        Descriptor {
            group_id: Some("g".to_string()),
            artifact_id: Some(artifact_id.to_string()),
            version: Some("1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_model_round_trip() {
        let cache = ModelCache::new();
        let source = StringSource::new("", "mem:a");

        assert!(cache.file_model(&source).is_none());
        cache.put_file_model(&source, &model("a"));

        let cached = cache.file_model(&source).unwrap();
        assert_eq!(cached.artifact_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_get_returns_independent_clone() {
        let cache = ModelCache::new();
        let source = StringSource::new("", "mem:a");
        cache.put_file_model(&source, &model("a"));

        let mut first = cache.file_model(&source).unwrap();
        first.artifact_id = Some("mutated".to_string());

        let second = cache.file_model(&source).unwrap();
        assert_eq!(second.artifact_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_tags_do_not_collide() {
        let cache = ModelCache::new();
        let data = ModelData::new(None, model("a"));

        cache.put_raw_by_coordinates("g", "a", "1", &data);
        assert!(cache.raw_by_coordinates("g", "a", "1").is_some());
        assert!(cache.import("g", "a", "1").is_none());
    }

    #[test]
    fn test_first_write_wins() {
        let cache = ModelCache::new();
        let source = StringSource::new("", "mem:a");

        cache.put_file_model(&source, &model("first"));
        cache.put_file_model(&source, &model("second"));

        let cached = cache.file_model(&source).unwrap();
        assert_eq!(cached.artifact_id.as_deref(), Some("first"));
    }
}
