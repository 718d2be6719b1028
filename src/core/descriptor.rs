//! The descriptor tree - a project's declaration document.
//!
//! A [`Descriptor`] is the parsed form of a `project.toml` document:
//! identity coordinates, a parent reference, dependencies, build
//! configuration, repositories, and conditionally-applied profiles. The
//! builder pipeline clones descriptors freely; every type here is a plain
//! value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::location::InputLocation;
use crate::core::profile::Profile;

/// Packaging value marking an aggregator descriptor (a valid parent).
pub const AGGREGATOR_PACKAGING: &str = "pom";

/// Default packaging when a descriptor declares none.
pub const DEFAULT_PACKAGING: &str = "archive";

/// Dependency type marking a dependency-management import entry.
pub const IMPORT_TYPE: &str = "pom";

/// Dependency scope marking a dependency-management import entry.
pub const IMPORT_SCOPE: &str = "import";

/// Group id assumed for plugins that declare none.
pub const DEFAULT_PLUGIN_GROUP_ID: &str = "dev.capstan.plugins";

/// A parsed descriptor document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Descriptor {
    /// Document schema version (currently always `4.0.0`).
    pub model_version: Option<String>,

    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,

    /// Packaging kind; `pom` marks an aggregator usable as a parent.
    pub packaging: Option<String>,

    /// Project homepage.
    pub url: Option<String>,

    /// Reference to the parent descriptor, if any.
    pub parent: Option<Parent>,

    /// Free-form key/value properties, referenced via `${key}`.
    pub properties: BTreeMap<String, String>,

    pub dependencies: Vec<Dependency>,
    pub dependency_management: Option<DependencyManagement>,

    pub build: Option<BuildSection>,
    pub reporting: Option<Reporting>,

    pub repositories: Vec<Repository>,
    pub plugin_repositories: Vec<Repository>,

    pub profiles: Vec<Profile>,

    /// Backing file, when the descriptor was read from disk.
    #[serde(skip)]
    pub descriptor_file: Option<PathBuf>,

    /// Field-level source positions, keyed by field name. The empty key
    /// holds the location of the document root.
    #[serde(skip)]
    pub locations: BTreeMap<String, InputLocation>,
}

impl Descriptor {
    /// The directory containing the backing file, if any.
    pub fn project_directory(&self) -> Option<&Path> {
        self.descriptor_file.as_deref().and_then(Path::parent)
    }

    /// Group id of this descriptor, falling back to the declared parent.
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.group_id.as_deref()))
    }

    /// Version of this descriptor, falling back to the declared parent.
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or_else(|| self.parent.as_ref().and_then(|p| p.version.as_deref()))
    }

    /// Packaging, defaulting when the document declares none.
    pub fn packaging_or_default(&self) -> &str {
        self.packaging.as_deref().unwrap_or(DEFAULT_PACKAGING)
    }

    /// Source position of a named field, if tracked.
    pub fn location(&self, field: &str) -> Option<&InputLocation> {
        self.locations.get(field)
    }

    /// Record the source position of a named field.
    pub fn set_location(&mut self, field: impl Into<String>, location: InputLocation) {
        self.locations.insert(field.into(), location);
    }
}

/// Reference to a parent descriptor.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Parent {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,

    /// Literal version or a bracket range like `[1.0,2.0)`.
    pub version: Option<String>,

    /// Path to the parent document relative to this one.
    pub relative_path: Option<String>,

    #[serde(skip)]
    pub location: Option<InputLocation>,
}

impl Parent {
    /// Default location of the parent document, one directory up.
    pub const DEFAULT_RELATIVE_PATH: &'static str = "../project.toml";

    /// The declared relative path, or the conventional default.
    pub fn relative_path_or_default(&self) -> &str {
        self.relative_path
            .as_deref()
            .unwrap_or(Self::DEFAULT_RELATIVE_PATH)
    }
}

/// A dependency declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dependency {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,

    /// Artifact type; `pom` together with scope `import` marks an import.
    #[serde(rename = "type")]
    pub dep_type: Option<String>,

    pub classifier: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,

    pub exclusions: Vec<Exclusion>,

    #[serde(skip)]
    pub location: Option<InputLocation>,
}

impl Dependency {
    /// The artifact type, defaulting when undeclared.
    pub fn dep_type_or_default(&self) -> &str {
        self.dep_type.as_deref().unwrap_or(DEFAULT_PACKAGING)
    }

    /// Whether this entry is a dependency-management import.
    pub fn is_import(&self) -> bool {
        self.dep_type.as_deref() == Some(IMPORT_TYPE)
            && self.scope.as_deref() == Some(IMPORT_SCOPE)
    }

    /// Conflict key within dependency lists and management sections:
    /// `group:artifact:type[:classifier]`.
    pub fn management_key(&self) -> String {
        let mut key = format!(
            "{}:{}:{}",
            self.group_id.as_deref().unwrap_or(""),
            self.artifact_id.as_deref().unwrap_or(""),
            self.dep_type_or_default(),
        );
        if let Some(classifier) = &self.classifier {
            key.push(':');
            key.push_str(classifier);
        }
        key
    }
}

/// An excluded transitive dependency.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Exclusion {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
}

/// The `[dependency-management]` section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyManagement {
    pub dependencies: Vec<Dependency>,
}

/// The `[build]` section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSection {
    pub directory: Option<String>,
    pub source_directory: Option<String>,
    pub test_source_directory: Option<String>,
    pub output_directory: Option<String>,
    pub final_name: Option<String>,

    pub extensions: Vec<Extension>,
    pub plugins: Vec<Plugin>,
    pub plugin_management: Option<PluginManagement>,
}

/// A build extension.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Extension {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

/// A build plugin declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Plugin {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,

    /// Whether the plugin contributes build extensions.
    pub extensions: Option<bool>,

    /// Free-form plugin configuration.
    pub configuration: Option<toml::Table>,

    pub dependencies: Vec<Dependency>,
    pub executions: Vec<Execution>,

    #[serde(skip)]
    pub location: Option<InputLocation>,
}

impl Plugin {
    /// Conflict key within plugin lists: `group:artifact`, with the
    /// conventional group assumed when undeclared.
    pub fn key(&self) -> String {
        format!(
            "{}:{}",
            self.group_id.as_deref().unwrap_or(DEFAULT_PLUGIN_GROUP_ID),
            self.artifact_id.as_deref().unwrap_or(""),
        )
    }
}

/// A plugin execution binding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Execution {
    pub id: Option<String>,
    pub phase: Option<String>,
    pub goals: Vec<String>,
    pub configuration: Option<toml::Table>,
}

/// The `[build.plugin-management]` section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PluginManagement {
    pub plugins: Vec<Plugin>,
}

/// A repository declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Repository {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,

    #[serde(skip)]
    pub location: Option<InputLocation>,
}

/// The `[reporting]` section.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reporting {
    pub output_directory: Option<String>,
    pub plugins: Vec<ReportPlugin>,
}

/// A report plugin declaration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportPlugin {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub configuration: Option<toml::Table>,
    pub report_sets: Vec<ReportSet>,
}

impl ReportPlugin {
    /// Conflict key within report plugin lists, mirroring [`Plugin::key`].
    pub fn key(&self) -> String {
        format!(
            "{}:{}",
            self.group_id.as_deref().unwrap_or(DEFAULT_PLUGIN_GROUP_ID),
            self.artifact_id.as_deref().unwrap_or(""),
        )
    }
}

/// A set of reports produced by a report plugin.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportSet {
    pub id: Option<String>,
    pub reports: Vec<String>,
    pub configuration: Option<toml::Table>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_identity_falls_back_to_parent() {
        let model = Descriptor {
            artifact_id: Some("child".to_string()),
            parent: Some(Parent {
                group_id: Some("g".to_string()),
                artifact_id: Some("parent".to_string()),
                version: Some("1".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(model.effective_group_id(), Some("g"));
        assert_eq!(model.effective_version(), Some("1"));
        assert_eq!(model.artifact_id.as_deref(), Some("child"));
    }

    #[test]
    fn test_management_key() {
        let dep = Dependency {
            group_id: Some("g".to_string()),
            artifact_id: Some("a".to_string()),
            ..Default::default()
        };
        assert_eq!(dep.management_key(), "g:a:archive");

        let classified = Dependency {
            classifier: Some("sources".to_string()),
            ..dep.clone()
        };
        assert_eq!(classified.management_key(), "g:a:archive:sources");
    }

    #[test]
    fn test_import_detection() {
        let mut dep = Dependency {
            dep_type: Some("pom".to_string()),
            scope: Some("import".to_string()),
            ..Default::default()
        };
        assert!(dep.is_import());

        dep.scope = Some("compile".to_string());
        assert!(!dep.is_import());
    }

    #[test]
    fn test_plugin_key_default_group() {
        let plugin = Plugin {
            artifact_id: Some("site".to_string()),
            ..Default::default()
        };
        assert_eq!(plugin.key(), "dev.capstan.plugins:site");
    }
}
