//! Reading a source into a validated file model.

use std::io::ErrorKind;
use std::sync::Arc;

use crate::build::cache::ModelCache;
use crate::build::problems::{ProblemCollector, Severity, VersionGate};
use crate::build::request::{BuildRequest, ValidationLevel};
use crate::build::result::BuildError;
use crate::build::DescriptorBuilder;
use crate::core::coordinates;
use crate::core::descriptor::Descriptor;
use crate::core::location::InputSource;
use crate::sources::SourceRef;
use crate::steps::transform::DescriptorTransformer;
use crate::steps::ParseOptions;

/// The slice of a build request one read needs; parent reads swap in a
/// lenient validation level without touching the request itself.
pub(crate) struct ReadConfig<'a> {
    pub(crate) level: ValidationLevel,
    pub(crate) location_tracking: bool,
    pub(crate) build_consumer: bool,
    pub(crate) cache: Option<&'a Arc<ModelCache>>,
    pub(crate) transformer: Option<&'a dyn DescriptorTransformer>,
}

impl<'a> ReadConfig<'a> {
    pub(crate) fn from_request(request: &'a BuildRequest) -> Self {
        ReadConfig {
            level: request.validation_level,
            location_tracking: request.location_tracking,
            build_consumer: request.build_consumer,
            cache: request.cache.as_ref(),
            transformer: request.transformer.as_deref(),
        }
    }

    /// Clamp validation for descriptors outside the caller's control.
    pub(crate) fn lenient(mut self) -> Self {
        if self.level > ValidationLevel::V20 {
            self.level = ValidationLevel::V20;
        }
        self
    }
}

impl DescriptorBuilder {
    /// Read a source into a descriptor: cache lookup, parse with
    /// strict-to-lenient fallback, file-level validation, cache store.
    pub(crate) fn read_model(
        &self,
        source: &SourceRef,
        config: &ReadConfig<'_>,
        problems: &mut ProblemCollector,
    ) -> Result<Descriptor, BuildError> {
        if let Some(cache) = config.cache {
            if let Some(coordinates) = source.repository_coordinates() {
                if let Some(data) = cache.raw_by_coordinates(
                    &coordinates.group_id,
                    &coordinates.artifact_id,
                    &coordinates.version,
                ) {
                    tracing::debug!("file model cache hit for {}", coordinates);
                    return Ok(data.model);
                }
            } else if let Some(model) = cache.file_model(source.as_ref()) {
                tracing::debug!("file model cache hit for {}", source.location());
                return Ok(model);
            }
        }

        problems.set_source(source.location());

        let text = match source.open() {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    problems.add(
                        Severity::Fatal,
                        VersionGate::Base,
                        format!(
                            "Non-readable descriptor {}: Some input bytes do not match the \
                             file encoding.",
                            source.location()
                        ),
                        None,
                    );
                    return Err(BuildError::new(problems.take()));
                }
            },
            Err(e) => {
                problems.add(
                    Severity::Fatal,
                    VersionGate::Base,
                    format!(
                        "Non-readable descriptor {}: {}",
                        source.location(),
                        describe_io_error(&e)
                    ),
                    None,
                );
                return Err(BuildError::new(problems.take()));
            }
        };

        let strict = config.level >= ValidationLevel::V20;
        let input_source = config
            .location_tracking
            .then(|| Arc::new(InputSource::new(source.location())));

        let options = ParseOptions {
            strict,
            input_source: input_source.clone(),
            transformer: None,
        };
        let mut model = match self.parser.read(&text, &options) {
            Ok(model) => model,
            Err(e) if strict => {
                let lenient = ParseOptions {
                    strict: false,
                    input_source: input_source.clone(),
                    transformer: None,
                };
                match self.parser.read(&text, &lenient) {
                    Ok(model) => {
                        tracing::warn!(
                            "strict parse of {} failed, accepted leniently",
                            source.location()
                        );
                        let severity = if source.file_path().is_some() {
                            Severity::Error
                        } else {
                            Severity::Warning
                        };
                        problems.add(
                            severity,
                            VersionGate::V20,
                            format!("Malformed descriptor {}: {}", source.location(), e),
                            None,
                        );
                        model
                    }
                    Err(_) => {
                        // unreadable even leniently: report the original error
                        problems.add(
                            Severity::Fatal,
                            VersionGate::Base,
                            format!("Non-parseable descriptor {}: {}", source.location(), e),
                            None,
                        );
                        return Err(BuildError::new(problems.take()));
                    }
                }
            }
            Err(e) => {
                problems.add(
                    Severity::Fatal,
                    VersionGate::Base,
                    format!("Non-parseable descriptor {}: {}", source.location(), e),
                    None,
                );
                return Err(BuildError::new(problems.take()));
            }
        };

        if let Some(path) = source.file_path() {
            model.descriptor_file = Some(path.to_path_buf());
        }
        if let Some(input_source) = &input_source {
            input_source.set_model_id(coordinates::descriptor_id(&model));
        }

        problems.set_source_model(&model);
        self.validator
            .validate_file_model(&model, config.level, problems);
        if problems.has_fatal_errors() {
            return Err(BuildError::new(problems.take()));
        }

        if let Some(cache) = config.cache {
            cache.put_file_model(source.as_ref(), &model);
        }
        Ok(model)
    }
}

fn describe_io_error(error: &anyhow::Error) -> String {
    if let Some(io) = error.downcast_ref::<std::io::Error>() {
        if io.kind() == ErrorKind::InvalidData {
            return "Some input bytes do not match the file encoding.".to_string();
        }
    }
    format!("{error:#}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{FileSource, StringSource};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn builder() -> DescriptorBuilder {
        DescriptorBuilder::new()
    }

    fn config(level: ValidationLevel) -> ReadConfig<'static> {
        ReadConfig {
            level,
            location_tracking: false,
            build_consumer: false,
            cache: None,
            transformer: None,
        }
    }

    fn collector() -> ProblemCollector {
        ProblemCollector::new(ValidationLevel::Strict)
    }

    #[test]
    fn test_read_valid_descriptor() {
        let source: SourceRef = Arc::new(StringSource::new(
            "group-id = \"g\"\nartifact-id = \"a\"\nversion = \"1\"\n",
            "mem:a",
        ));
        let mut problems = collector();
        let model = builder()
            .read_model(&source, &config(ValidationLevel::Strict), &mut problems)
            .unwrap();

        assert_eq!(model.artifact_id.as_deref(), Some("a"));
        assert!(!problems.has_errors());
    }

    #[test]
    fn test_strict_fallback_warns_for_memory_source() {
        let source: SourceRef = Arc::new(StringSource::new(
            "artifact-id = \"a\"\nmystery = true\n",
            "mem:a",
        ));
        let mut problems = collector();
        let model = builder()
            .read_model(&source, &config(ValidationLevel::Strict), &mut problems)
            .unwrap();

        assert_eq!(model.artifact_id.as_deref(), Some("a"));
        let malformed: Vec<_> = problems
            .problems()
            .iter()
            .filter(|p| p.message.starts_with("Malformed descriptor"))
            .collect();
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].severity, Severity::Warning);
    }

    #[test]
    fn test_strict_fallback_errors_for_file_source() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.toml");
        std::fs::write(&path, "artifact-id = \"a\"\nmystery = true\n").unwrap();

        let source: SourceRef = Arc::new(FileSource::new(path.clone()));
        let mut problems = collector();
        let model = builder()
            .read_model(&source, &config(ValidationLevel::Strict), &mut problems)
            .unwrap();

        assert_eq!(model.descriptor_file.as_deref(), Some(path.as_path()));
        let malformed: Vec<_> = problems
            .problems()
            .iter()
            .filter(|p| p.message.starts_with("Malformed descriptor"))
            .collect();
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].severity, Severity::Error);
    }

    #[test]
    fn test_lenient_level_skips_strict_parse() {
        let source: SourceRef = Arc::new(StringSource::new(
            "artifact-id = \"a\"\nmystery = true\n",
            "mem:a",
        ));
        let mut problems = ProblemCollector::new(ValidationLevel::Minimal);
        builder()
            .read_model(&source, &config(ValidationLevel::Minimal), &mut problems)
            .unwrap();
        assert!(problems.problems().is_empty());
    }

    #[test]
    fn test_unparseable_is_fatal() {
        let source: SourceRef = Arc::new(StringSource::new("artifact-id = [broken", "mem:a"));
        let mut problems = collector();
        let error = builder()
            .read_model(&source, &config(ValidationLevel::Strict), &mut problems)
            .unwrap_err();

        assert!(error
            .problems()
            .iter()
            .any(|p| p.message.starts_with("Non-parseable descriptor")));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let source: SourceRef = Arc::new(FileSource::new(PathBuf::from(
            "/nonexistent/project.toml",
        )));
        let mut problems = collector();
        let error = builder()
            .read_model(&source, &config(ValidationLevel::Strict), &mut problems)
            .unwrap_err();

        assert!(error
            .problems()
            .iter()
            .any(|p| p.severity == Severity::Fatal
                && p.message.starts_with("Non-readable descriptor")));
    }

    #[test]
    fn test_invalid_encoding_message() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("project.toml");
        std::fs::write(&path, [0xFFu8, 0xFE, 0x00, 0x41]).unwrap();

        let source: SourceRef = Arc::new(FileSource::new(path));
        let mut problems = collector();
        let error = builder()
            .read_model(&source, &config(ValidationLevel::Strict), &mut problems)
            .unwrap_err();

        assert!(error.problems()[0]
            .message
            .contains("Some input bytes do not match the file encoding."));
    }

    #[test]
    fn test_cache_short_circuits_parse() {
        let cache = Arc::new(ModelCache::new());
        let source: SourceRef = Arc::new(StringSource::new(
            "group-id = \"g\"\nartifact-id = \"a\"\nversion = \"1\"\n",
            "mem:a",
        ));
        let read_config = ReadConfig {
            level: ValidationLevel::Strict,
            location_tracking: false,
            build_consumer: false,
            cache: Some(&cache),
            transformer: None,
        };

        let mut problems = collector();
        builder()
            .read_model(&source, &read_config, &mut problems)
            .unwrap();
        assert_eq!(cache.len(), 1);

        // a source that would fail parsing now hits the cache instead
        let same_identity: SourceRef = Arc::new(StringSource::new("!!broken!!", "mem:a"));
        let model = builder()
            .read_model(&same_identity, &read_config, &mut problems)
            .unwrap();
        assert_eq!(model.artifact_id.as_deref(), Some("a"));
    }
}
