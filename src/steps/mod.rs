//! Pipeline step interfaces and their default implementations.
//!
//! The builder is wired from a dozen narrow collaborators, each doing one
//! transformation of the model with mutate-in-place-with-problems
//! semantics. Every trait here has a default implementation in a sibling
//! module; callers can swap any of them on the
//! [`DescriptorBuilder`](crate::build::DescriptorBuilder).

pub mod inherit;
pub mod interpolate;
pub mod management;
pub mod normalize;
pub mod parser;
pub mod paths;
pub mod plugins;
pub mod selector;
pub mod superdescriptor;
pub mod transform;
pub mod validate;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::build::problems::ProblemCollector;
use crate::build::request::ValidationLevel;
use crate::core::descriptor::{DependencyManagement, Descriptor};
use crate::core::location::InputSource;
use crate::core::profile::{ActivationContext, Profile};
use crate::steps::transform::DescriptorTransformer;

/// The document could not be parsed.
#[derive(Debug)]
pub struct ParseError {
    pub message: String,

    /// 1-based line/column, when the parser can point at one.
    pub position: Option<(usize, usize)>,
}

impl ParseError {
    /// Create an error without position information.
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            position: None,
        }
    }

    /// Create an error pointing at a document position.
    pub fn at(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            message: message.into(),
            position: Some((line, column)),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some((line, column)) => {
                write!(f, "{} (line {}, column {})", self.message, line, column)
            }
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}

/// Options for one parse.
pub struct ParseOptions<'a> {
    /// Reject unknown keys instead of ignoring them.
    pub strict: bool,

    /// When set, element locations are tracked against this input source.
    pub input_source: Option<Arc<InputSource>>,

    /// Post-parse enrichment hook (build-consumer transform).
    pub transformer: Option<&'a dyn DescriptorTransformer>,
}

impl<'a> ParseOptions<'a> {
    /// Plain options: strict, no tracking, no transformer.
    pub fn strict() -> Self {
        ParseOptions {
            strict: true,
            input_source: None,
            transformer: None,
        }
    }

    /// Plain lenient options.
    pub fn lenient() -> Self {
        ParseOptions {
            strict: false,
            input_source: None,
            transformer: None,
        }
    }
}

/// Produces a descriptor tree from document text.
pub trait DescriptorParser: Send + Sync {
    fn read(&self, text: &str, options: &ParseOptions<'_>) -> Result<Descriptor, ParseError>;
}

/// Selects the active subset of a profile collection.
pub trait ProfileSelector: Send + Sync {
    fn active_profiles(
        &self,
        profiles: &[Profile],
        context: &ActivationContext,
        problems: &mut ProblemCollector,
    ) -> Vec<Profile>;
}

/// Merges one active profile's contribution into a descriptor.
pub trait ProfileInjector: Send + Sync {
    fn inject(&self, model: &mut Descriptor, profile: &Profile, problems: &mut ProblemCollector);
}

/// Merges a parent descriptor into a child, child-wins.
pub trait InheritanceAssembler: Send + Sync {
    fn assemble(&self, child: &mut Descriptor, parent: &Descriptor, problems: &mut ProblemCollector);
}

/// Value sources for expression interpolation, in override order.
pub struct InterpolationConfig<'a> {
    pub user_properties: &'a BTreeMap<String, String>,
    pub system_properties: &'a BTreeMap<String, String>,
}

/// Replaces `${expr}` occurrences across the whole model.
pub trait Interpolator: Send + Sync {
    fn interpolate(
        &self,
        model: Descriptor,
        project_directory: Option<&Path>,
        config: &InterpolationConfig<'_>,
        problems: &mut ProblemCollector,
    ) -> Descriptor;
}

/// Merges duplicate declarations and injects default values.
pub trait Normalizer: Send + Sync {
    fn merge_duplicates(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
    fn inject_defaults(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
}

/// Validates a model at one of the three pipeline stages.
pub trait Validator: Send + Sync {
    fn validate_file_model(
        &self,
        model: &Descriptor,
        level: ValidationLevel,
        problems: &mut ProblemCollector,
    );
    fn validate_raw_model(
        &self,
        model: &Descriptor,
        level: ValidationLevel,
        problems: &mut ProblemCollector,
    );
    fn validate_effective_model(
        &self,
        model: &Descriptor,
        level: ValidationLevel,
        problems: &mut ProblemCollector,
    );
}

/// Aligns file-path fields to the project base directory.
pub trait PathTranslator: Send + Sync {
    fn align_to_base(&self, model: &mut Descriptor, base: Option<&Path>);
}

/// Normalizes URL fields (collapses `..` segments).
pub trait UrlNormalizer: Send + Sync {
    fn normalize(&self, model: &mut Descriptor);
}

/// Supplies the implicit root ancestor of every lineage.
pub trait SuperDescriptorProvider: Send + Sync {
    fn super_descriptor(&self, model_version: &str) -> Descriptor;
}

/// Applies plugin-management defaults to plugin declarations.
pub trait PluginManagementInjector: Send + Sync {
    fn inject_management(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
}

/// Applies dependency-management defaults to dependency declarations.
pub trait DependencyManagementInjector: Send + Sync {
    fn inject_management(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
}

/// Merges imported dependency-management sections into the model.
pub trait DependencyManagementImporter: Send + Sync {
    fn import_management(
        &self,
        model: &mut Descriptor,
        imports: Vec<DependencyManagement>,
        problems: &mut ProblemCollector,
    );
}

/// Injects lifecycle goal bindings during plugin processing. Deliberately
/// has no default implementation; the builder fails plugin processing when
/// none is wired.
pub trait LifecycleBindingsInjector: Send + Sync {
    fn inject_lifecycle_bindings(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
}

/// Pushes plugin-level configuration down into executions.
pub trait PluginConfigurationExpander: Send + Sync {
    fn expand(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
}

/// Completes report plugin declarations from build plugin data.
pub trait ReportConfigurationExpander: Send + Sync {
    fn expand(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
}

/// Converts the reporting section into site plugin configuration.
pub trait ReportingConverter: Send + Sync {
    fn convert(&self, model: &mut Descriptor, problems: &mut ProblemCollector);
}

/// Merge two configuration tables: dominant keys win, nested tables merge
/// recursively.
pub(crate) fn merge_config(
    dominant: Option<&toml::Table>,
    recessive: Option<&toml::Table>,
) -> Option<toml::Table> {
    match (dominant, recessive) {
        (None, None) => None,
        (Some(d), None) => Some(d.clone()),
        (None, Some(r)) => Some(r.clone()),
        (Some(d), Some(r)) => {
            let mut merged = r.clone();
            for (key, value) in d {
                match (merged.get(key), value) {
                    (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                        let nested = merge_config(Some(incoming), Some(existing))
                            .unwrap_or_default();
                        merged.insert(key.clone(), toml::Value::Table(nested));
                    }
                    _ => {
                        merged.insert(key.clone(), value.clone());
                    }
                }
            }
            Some(merged)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_config_dominant_wins() {
        let mut dominant = toml::Table::new();
        dominant.insert("key".to_string(), toml::Value::String("d".to_string()));
        let mut recessive = toml::Table::new();
        recessive.insert("key".to_string(), toml::Value::String("r".to_string()));
        recessive.insert("only".to_string(), toml::Value::String("r".to_string()));

        let merged = merge_config(Some(&dominant), Some(&recessive)).unwrap();
        assert_eq!(merged["key"].as_str(), Some("d"));
        assert_eq!(merged["only"].as_str(), Some("r"));
    }

    #[test]
    fn test_merge_config_nested_tables() {
        let mut inner_d = toml::Table::new();
        inner_d.insert("a".to_string(), toml::Value::Integer(1));
        let mut dominant = toml::Table::new();
        dominant.insert("nested".to_string(), toml::Value::Table(inner_d));

        let mut inner_r = toml::Table::new();
        inner_r.insert("a".to_string(), toml::Value::Integer(2));
        inner_r.insert("b".to_string(), toml::Value::Integer(3));
        let mut recessive = toml::Table::new();
        recessive.insert("nested".to_string(), toml::Value::Table(inner_r));

        let merged = merge_config(Some(&dominant), Some(&recessive)).unwrap();
        let nested = merged["nested"].as_table().unwrap();
        assert_eq!(nested["a"].as_integer(), Some(1));
        assert_eq!(nested["b"].as_integer(), Some(3));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::at("unexpected key `foo`", 3, 9);
        assert_eq!(err.to_string(), "unexpected key `foo` (line 3, column 9)");

        let plain = ParseError::new("boom");
        assert_eq!(plain.to_string(), "boom");
    }
}
