//! Capstan - a project-descriptor build engine.
//!
//! This crate turns a raw `project.toml` descriptor into a fully resolved
//! effective descriptor: parent-inheritance resolution, profile activation
//! and injection, property interpolation, dependency-management import,
//! and validation, combined into a single ordered pipeline with an
//! intermediate cache.

pub mod build;
pub mod core;
pub mod resolver;
pub mod sources;
pub mod steps;

pub use build::{
    BuildError, BuildListener, BuildRequest, BuildResult, DescriptorBuilder, ModelCache, Problem,
    ProblemCollector, Severity, ValidationLevel, VersionGate,
};
pub use core::{
    Coordinates, Dependency, DependencyManagement, Descriptor, Parent, Profile, VersionSpec,
};
pub use resolver::{ModelResolver, WorkspaceResolver};
pub use sources::{ArtifactSource, FileSource, Source, SourceRef, StringSource};
