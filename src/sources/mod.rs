//! Descriptor sources - addressable byte producers.
//!
//! A [`Source`] hands the builder the bytes of one descriptor document and
//! identifies itself with a stable location string, which doubles as the
//! cache identity for parsed documents.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::Coordinates;

/// Conventional file name of a descriptor document.
pub const DESCRIPTOR_FILE_NAME: &str = "project.toml";

/// An addressable producer of descriptor bytes.
pub trait Source: fmt::Debug + Send + Sync {
    /// Stable location string (path, URL, or synthetic identity).
    fn location(&self) -> &str;

    /// Read the full document bytes.
    fn open(&self) -> Result<Vec<u8>>;

    /// Backing file path, when the source is file-backed.
    fn file_path(&self) -> Option<&Path> {
        None
    }

    /// Resolve a sibling document by relative path, when the source kind
    /// supports it. Returns `None` when no such document exists.
    fn related(&self, relative_path: &str) -> Option<SourceRef> {
        let _ = relative_path;
        None
    }

    /// Coordinates the source was resolved for, when it came out of a
    /// repository rather than the local project tree.
    fn repository_coordinates(&self) -> Option<&Coordinates> {
        None
    }
}

/// Shared handle to a source.
pub type SourceRef = Arc<dyn Source>;

/// A descriptor document on the local filesystem.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    location: String,
}

impl FileSource {
    /// Create a source for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let location = path.display().to_string();
        FileSource { path, location }
    }
}

impl Source for FileSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn open(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path)
            .with_context(|| format!("failed to read descriptor: {}", self.path.display()))
    }

    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn related(&self, relative_path: &str) -> Option<SourceRef> {
        let base = self.path.parent()?;
        let mut candidate = base.join(relative_path);
        if candidate.is_dir() {
            candidate = candidate.join(DESCRIPTOR_FILE_NAME);
        }
        if !candidate.is_file() {
            return None;
        }
        // normalize away ../ segments so cache identities are stable
        let candidate = candidate.canonicalize().unwrap_or(candidate);
        Some(Arc::new(FileSource::new(candidate)))
    }
}

/// An in-memory descriptor document.
#[derive(Debug)]
pub struct StringSource {
    content: String,
    location: String,
}

impl StringSource {
    /// Create a source from document text and a synthetic location.
    pub fn new(content: impl Into<String>, location: impl Into<String>) -> Self {
        StringSource {
            content: content.into(),
            location: location.into(),
        }
    }
}

impl Source for StringSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn open(&self) -> Result<Vec<u8>> {
        Ok(self.content.as_bytes().to_vec())
    }
}

/// A descriptor document obtained from a repository for known coordinates.
///
/// The builder treats raw models from artifact sources as reusable across
/// requests, since repository content is immutable per coordinates.
#[derive(Debug)]
pub struct ArtifactSource {
    content: Vec<u8>,
    location: String,
    coordinates: Coordinates,
}

impl ArtifactSource {
    /// Create a source for repository content resolved for `coordinates`.
    pub fn new(
        content: impl Into<Vec<u8>>,
        location: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        ArtifactSource {
            content: content.into(),
            location: location.into(),
            coordinates,
        }
    }
}

impl Source for ArtifactSource {
    fn location(&self) -> &str {
        &self.location
    }

    fn open(&self) -> Result<Vec<u8>> {
        Ok(self.content.clone())
    }

    fn repository_coordinates(&self) -> Option<&Coordinates> {
        Some(&self.coordinates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_source_related() {
        let tmp = TempDir::new().unwrap();
        let parent_dir = tmp.path().join("parent");
        let child_dir = parent_dir.join("child");
        std::fs::create_dir_all(&child_dir).unwrap();
        std::fs::write(parent_dir.join(DESCRIPTOR_FILE_NAME), "version = \"1\"").unwrap();
        std::fs::write(child_dir.join(DESCRIPTOR_FILE_NAME), "version = \"2\"").unwrap();

        let child = FileSource::new(child_dir.join(DESCRIPTOR_FILE_NAME));

        // file path and directory path both resolve
        assert!(child.related("../project.toml").is_some());
        assert!(child.related("..").is_some());

        // missing documents yield None
        assert!(child.related("../missing/project.toml").is_none());
    }

    #[test]
    fn test_artifact_source_coordinates() {
        let source = ArtifactSource::new(
            b"version = \"1\"".to_vec(),
            "repo:g:a:1",
            Coordinates::new("g", "a", "1"),
        );
        assert_eq!(source.repository_coordinates().unwrap().artifact_id, "a");
        assert_eq!(source.open().unwrap(), b"version = \"1\"");
    }
}
