//! Descriptor identity - WHAT descriptor (group + artifact + version).
//!
//! Coordinates name a descriptor across repositories. Model id strings are
//! the printable form used in diagnostics, cache keys, and cycle chains.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::descriptor::Descriptor;

/// Placeholder for a missing group id in a model id string.
pub const UNKNOWN_GROUP_ID: &str = "[unknown-group-id]";

/// Placeholder for a missing artifact id in a model id string.
pub const UNKNOWN_ARTIFACT_ID: &str = "[unknown-artifact-id]";

/// Placeholder for a missing version in a model id string.
pub const UNKNOWN_VERSION: &str = "[unknown-version]";

/// The `(group, artifact, version)` triple naming a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Coordinates {
    /// Create coordinates from the three identity parts.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Coordinates {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Format a model id from possibly-missing identity parts.
///
/// Missing parts are rendered with stable `[unknown-*]` placeholders so the
/// id remains printable and comparable.
pub fn model_id(group_id: Option<&str>, artifact_id: Option<&str>, version: Option<&str>) -> String {
    format!(
        "{}:{}:{}",
        group_id.filter(|s| !s.is_empty()).unwrap_or(UNKNOWN_GROUP_ID),
        artifact_id
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_ARTIFACT_ID),
        version.filter(|s| !s.is_empty()).unwrap_or(UNKNOWN_VERSION),
    )
}

/// The model id of a descriptor, inheriting group and version from the
/// declared parent when absent on the descriptor itself.
///
/// Artifact id is never inherited.
pub fn descriptor_id(model: &Descriptor) -> String {
    model_id(
        model.effective_group_id(),
        model.artifact_id.as_deref(),
        model.effective_version(),
    )
}

/// A human-oriented hint naming a descriptor in diagnostics: the model id
/// plus the backing file path when one is known.
pub fn source_hint(model: &Descriptor) -> String {
    let id = descriptor_id(model);
    match &model.descriptor_file {
        Some(path) => format!("{} ({})", id, path.display()),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_complete() {
        assert_eq!(model_id(Some("g"), Some("a"), Some("1")), "g:a:1");
    }

    #[test]
    fn test_model_id_placeholders() {
        assert_eq!(
            model_id(None, Some("a"), None),
            "[unknown-group-id]:a:[unknown-version]"
        );
        assert_eq!(
            model_id(Some(""), None, Some("1")),
            "[unknown-group-id]:[unknown-artifact-id]:1"
        );
    }

    #[test]
    fn test_descriptor_id_inherits_from_parent() {
        let mut model = Descriptor::default();
        model.artifact_id = Some("child".to_string());
        model.parent = Some(crate::core::descriptor::Parent {
            group_id: Some("pg".to_string()),
            artifact_id: Some("parent".to_string()),
            version: Some("2".to_string()),
            ..Default::default()
        });

        assert_eq!(descriptor_id(&model), "pg:child:2");
    }
}
