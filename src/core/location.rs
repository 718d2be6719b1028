//! Source positions for descriptor elements.
//!
//! When location tracking is enabled, every interesting element of a parsed
//! descriptor carries an [`InputLocation`] pointing back into the document
//! it came from. Locations survive cloning and the file-to-raw merge so
//! that validation output can point at the offending line.

use std::fmt;
use std::sync::{Arc, OnceLock};

/// Identity of one parsed document, shared by all locations within it.
#[derive(Debug, Default)]
pub struct InputSource {
    /// Location string of the originating source (path or URL).
    location: String,

    /// Model id of the descriptor this source produced. Known only after
    /// the document has been parsed, hence set-once.
    model_id: OnceLock<String>,
}

impl InputSource {
    /// Create an input source for the given location string.
    pub fn new(location: impl Into<String>) -> Self {
        InputSource {
            location: location.into(),
            model_id: OnceLock::new(),
        }
    }

    /// The location string of the originating source.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The model id of the parsed descriptor, if already known.
    pub fn model_id(&self) -> Option<&str> {
        self.model_id.get().map(String::as_str)
    }

    /// Record the model id once the descriptor has been parsed.
    pub fn set_model_id(&self, model_id: impl Into<String>) {
        let _ = self.model_id.set(model_id.into());
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.model_id() {
            Some(id) => write!(f, "{} ({})", id, self.location),
            None => write!(f, "{}", self.location),
        }
    }
}

/// A line/column position within a descriptor document.
#[derive(Debug, Clone, Default)]
pub struct InputLocation {
    /// 1-based line number.
    pub line: usize,

    /// 1-based column number.
    pub column: usize,

    /// The document the position refers to.
    pub source: Option<Arc<InputSource>>,
}

impl InputLocation {
    /// Create a location with a backing source.
    pub fn new(line: usize, column: usize, source: Option<Arc<InputSource>>) -> Self {
        InputLocation {
            line,
            column,
            source,
        }
    }
}

impl fmt::Display for InputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}, line {}, column {}", source, self.line, self.column),
            None => write!(f, "line {}, column {}", self.line, self.column),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_id_set_once() {
        let source = InputSource::new("project.toml");
        assert_eq!(source.model_id(), None);

        source.set_model_id("g:a:1");
        source.set_model_id("other:id:2");
        assert_eq!(source.model_id(), Some("g:a:1"));
    }

    #[test]
    fn test_location_display() {
        let source = Arc::new(InputSource::new("project.toml"));
        let loc = InputLocation::new(3, 7, Some(source));
        assert_eq!(loc.to_string(), "project.toml, line 3, column 7");
    }
}
