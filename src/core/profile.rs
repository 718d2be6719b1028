//! Profiles - conditionally-applied descriptor fragments.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::descriptor::{BuildSection, Dependency, DependencyManagement, Reporting, Repository};

/// Where a profile was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSource {
    /// Declared inside a descriptor document.
    #[default]
    Descriptor,

    /// Supplied externally with the build request (e.g. from settings).
    External,
}

/// A conditionally-applied descriptor fragment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Profile {
    pub id: String,

    /// Predicate deciding whether the profile applies.
    pub activation: Option<Activation>,

    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Option<DependencyManagement>,
    pub build: Option<BuildSection>,
    pub reporting: Option<Reporting>,
    pub repositories: Vec<Repository>,
    pub plugin_repositories: Vec<Repository>,

    /// Provenance of the profile declaration.
    pub source: ProfileSource,
}

/// Activation predicate over the build environment.
///
/// When several conditions are declared, all of them must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Activation {
    /// Applies when no sibling profile was activated otherwise.
    pub active_by_default: bool,

    /// Version range the active toolchain must satisfy.
    pub toolchain: Option<String>,

    pub os: Option<OsActivation>,
    pub property: Option<PropertyActivation>,
    pub file: Option<FileActivation>,
}

/// Operating-system condition. A leading `!` on any field negates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OsActivation {
    pub name: Option<String>,
    pub family: Option<String>,
    pub arch: Option<String>,
    pub version: Option<String>,
}

/// Property presence/value condition. A leading `!` on the name requires
/// the property to be absent; on the value, to differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyActivation {
    pub name: String,
    pub value: Option<String>,
}

/// File existence condition. Relative paths are resolved against the
/// project directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileActivation {
    pub exists: Option<String>,
    pub missing: Option<String>,
}

/// Environment a profile activation predicate is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct ActivationContext {
    /// Profile ids explicitly requested active.
    pub active_ids: Vec<String>,

    /// Profile ids explicitly requested inactive. Wins over `active_ids`.
    pub inactive_ids: Vec<String>,

    pub system_properties: BTreeMap<String, String>,

    /// Override system properties; also receives properties contributed by
    /// active external profiles.
    pub user_properties: BTreeMap<String, String>,

    /// Properties of the descriptor currently being evaluated.
    pub project_properties: BTreeMap<String, String>,

    pub project_directory: Option<PathBuf>,
}

impl ActivationContext {
    /// Look up a property: user properties override system properties,
    /// which override project properties.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.user_properties
            .get(name)
            .or_else(|| self.system_properties.get(name))
            .or_else(|| self.project_properties.get(name))
            .map(String::as_str)
    }
}
