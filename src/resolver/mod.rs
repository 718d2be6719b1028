//! Resolver interfaces - locating descriptors outside the project tree.
//!
//! The builder never fetches anything itself; a [`ModelResolver`] turns
//! coordinates into sources, and an optional [`WorkspaceResolver`] answers
//! for peer projects checked out on disk.

use thiserror::Error;

use crate::core::descriptor::{Dependency, Descriptor, Parent, Repository};
use crate::sources::SourceRef;

/// A descriptor could not be located.
#[derive(Debug, Error)]
#[error("could not resolve descriptor {group_id}:{artifact_id}:{version}: {message}")]
pub struct UnresolvableError {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub message: String,
}

impl UnresolvableError {
    /// Create an error for the given coordinates.
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        UnresolvableError {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            message: message.into(),
        }
    }
}

/// A repository declaration was rejected by the resolver.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct InvalidRepositoryError {
    pub message: String,
}

impl InvalidRepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        InvalidRepositoryError {
            message: message.into(),
        }
    }
}

/// Locates descriptors by coordinates in configured repositories.
pub trait ModelResolver: Send {
    /// Resolve the parent reference to a source.
    ///
    /// When the declared version is a range, the resolver picks a matching
    /// concrete version and writes it back into `parent.version`.
    fn resolve_parent(&mut self, parent: &mut Parent) -> Result<SourceRef, UnresolvableError>;

    /// Resolve a dependency (used for dependency-management imports).
    fn resolve_dependency(&mut self, dependency: &Dependency)
        -> Result<SourceRef, UnresolvableError>;

    /// Make a repository visible to subsequent resolutions. With `replace`
    /// set, an existing repository with the same id is overridden.
    fn add_repository(
        &mut self,
        repository: &Repository,
        replace: bool,
    ) -> Result<(), InvalidRepositoryError>;

    /// An independent copy with the same configuration, for sub-builds.
    fn new_copy(&self) -> Box<dyn ModelResolver>;
}

/// Locates peer descriptors on disk, ahead of repository resolution.
pub trait WorkspaceResolver: Send {
    /// The raw (uninherited) descriptor for the given coordinates, if the
    /// workspace contains it.
    fn resolve_raw(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<Option<Descriptor>, UnresolvableError>;

    /// The fully built effective descriptor for the given coordinates, if
    /// the workspace can supply it.
    fn resolve_effective(
        &self,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<Option<Descriptor>, UnresolvableError>;
}
