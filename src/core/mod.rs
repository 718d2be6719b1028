//! Core data model for descriptor documents.

pub mod coordinates;
pub mod descriptor;
pub mod location;
pub mod profile;
pub mod version;

pub use coordinates::Coordinates;
pub use descriptor::{
    BuildSection, Dependency, DependencyManagement, Descriptor, Exclusion, Execution, Extension,
    Parent, Plugin, PluginManagement, ReportPlugin, ReportSet, Reporting, Repository,
};
pub use location::{InputLocation, InputSource};
pub use profile::{Activation, ActivationContext, Profile};
pub use version::VersionSpec;
