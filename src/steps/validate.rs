//! Default model validation at the three pipeline stages.

use url::Url;

use crate::build::problems::{ProblemCollector, Severity, VersionGate};
use crate::build::request::ValidationLevel;
use crate::core::descriptor::{Dependency, Descriptor, IMPORT_SCOPE};
use crate::core::version::VersionSpec;
use crate::steps::Validator;

/// Document schema version this engine understands.
pub const SUPPORTED_MODEL_VERSION: &str = "4.0.0";

/// Default validator.
///
/// File validation checks only document shape; raw validation checks the
/// declaration against its own completeness rules; effective validation
/// checks the fully assembled model.
#[derive(Debug, Default)]
pub struct DefaultValidator;

impl Validator for DefaultValidator {
    fn validate_file_model(
        &self,
        model: &Descriptor,
        _level: ValidationLevel,
        problems: &mut ProblemCollector,
    ) {
        if let Some(model_version) = &model.model_version {
            if model_version != SUPPORTED_MODEL_VERSION {
                problems.add(
                    Severity::Error,
                    VersionGate::V20,
                    format!(
                        "'model-version' must be {SUPPORTED_MODEL_VERSION} but is \
                         '{model_version}'"
                    ),
                    model.location("model-version").cloned(),
                );
            }
        }

        if let Some(parent) = &model.parent {
            if parent.group_id.as_deref().unwrap_or("").is_empty() {
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    "'parent.group-id' is missing.",
                    parent.location.clone(),
                );
            }
            if parent.artifact_id.as_deref().unwrap_or("").is_empty() {
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    "'parent.artifact-id' is missing.",
                    parent.location.clone(),
                );
            }
            if parent.version.as_deref().unwrap_or("").is_empty() {
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    "'parent.version' is missing.",
                    parent.location.clone(),
                );
            } else if let Some(version) = &parent.version {
                if let Err(e) = VersionSpec::parse(version) {
                    problems.add(
                        Severity::Error,
                        VersionGate::V20,
                        format!("'parent.version' is not valid: {e}"),
                        parent.location.clone(),
                    );
                }
            }
            if parent.artifact_id.is_some() && parent.artifact_id == model.artifact_id {
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    "'parent.artifact-id' must not equal the descriptor's own 'artifact-id'",
                    parent.location.clone(),
                );
            }
        }

        let mut seen_profiles = Vec::new();
        for profile in &model.profiles {
            if seen_profiles.contains(&&profile.id) {
                problems.add(
                    Severity::Error,
                    VersionGate::V30,
                    format!("duplicate profile id `{}`", profile.id),
                    None,
                );
            }
            seen_profiles.push(&profile.id);
        }
    }

    fn validate_raw_model(
        &self,
        model: &Descriptor,
        _level: ValidationLevel,
        problems: &mut ProblemCollector,
    ) {
        if model.artifact_id.as_deref().unwrap_or("").is_empty() {
            problems.add(
                Severity::Error,
                VersionGate::V20,
                "'artifact-id' is missing.",
                model.location("").cloned(),
            );
        } else {
            check_id_charset(model.artifact_id.as_deref(), "artifact-id", model, problems);
        }

        if model.group_id.is_none() && model.parent.is_none() {
            problems.add(
                Severity::Error,
                VersionGate::V20,
                "'group-id' is missing.",
                model.location("").cloned(),
            );
        } else {
            check_id_charset(model.group_id.as_deref(), "group-id", model, problems);
        }

        if model.version.is_none() && model.parent.is_none() {
            problems.add(
                Severity::Error,
                VersionGate::V20,
                "'version' is missing.",
                model.location("").cloned(),
            );
        }

        for dependency in &model.dependencies {
            validate_dependency(dependency, "dependencies.dependency", problems);
            if dependency.scope.as_deref() == Some(IMPORT_SCOPE) && !dependency.is_import() {
                problems.add(
                    Severity::Warning,
                    VersionGate::V20,
                    format!(
                        "'dependencies.dependency.scope' for {} declares `import` outside \
                         dependency management",
                        dependency.management_key()
                    ),
                    dependency.location.clone(),
                );
            }
        }
        if let Some(management) = &model.dependency_management {
            for dependency in &management.dependencies {
                validate_dependency(
                    dependency,
                    "dependency-management.dependencies.dependency",
                    problems,
                );
            }
        }

        if let Some(build) = &model.build {
            for plugin in &build.plugins {
                if plugin.artifact_id.as_deref().unwrap_or("").is_empty() {
                    problems.add(
                        Severity::Error,
                        VersionGate::V20,
                        "'build.plugins.plugin.artifact-id' is missing.",
                        plugin.location.clone(),
                    );
                }
            }
        }

        let mut seen_repositories: Vec<&str> = Vec::new();
        for repository in model.repositories.iter().chain(&model.plugin_repositories) {
            let Some(id) = repository.id.as_deref() else {
                problems.add(
                    Severity::Error,
                    VersionGate::V20,
                    "'repositories.repository.id' is missing.",
                    repository.location.clone(),
                );
                continue;
            };
            if seen_repositories.contains(&id) {
                problems.add(
                    Severity::Error,
                    VersionGate::V30,
                    format!("duplicate repository id `{id}`"),
                    repository.location.clone(),
                );
            }
            seen_repositories.push(id);
        }
    }

    fn validate_effective_model(
        &self,
        model: &Descriptor,
        _level: ValidationLevel,
        problems: &mut ProblemCollector,
    ) {
        for (field, value) in [
            ("group-id", &model.group_id),
            ("artifact-id", &model.artifact_id),
            ("version", &model.version),
        ] {
            if value.as_deref().unwrap_or("").is_empty() {
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    format!("'{field}' is missing."),
                    model.location("").cloned(),
                );
            }
        }

        if model.packaging_or_default().is_empty() {
            problems.add(
                Severity::Error,
                VersionGate::Base,
                "'packaging' is missing.",
                model.location("packaging").cloned(),
            );
        }

        for dependency in &model.dependencies {
            if dependency.version.as_deref().unwrap_or("").is_empty() {
                problems.add(
                    Severity::Error,
                    VersionGate::V20,
                    format!(
                        "'dependencies.dependency.version' for {} is missing.",
                        dependency.management_key()
                    ),
                    dependency.location.clone(),
                );
            }
        }

        for repository in model.repositories.iter().chain(&model.plugin_repositories) {
            let Some(url) = repository.url.as_deref() else {
                continue;
            };
            if Url::parse(url).is_err() {
                problems.add(
                    Severity::Error,
                    VersionGate::V30,
                    format!(
                        "'repositories.repository.url' for {} is not a valid URL: {url}",
                        repository.id.as_deref().unwrap_or("(unnamed)")
                    ),
                    repository.location.clone(),
                );
            }
        }
    }
}

fn validate_dependency(dependency: &Dependency, prefix: &str, problems: &mut ProblemCollector) {
    if dependency.group_id.as_deref().unwrap_or("").is_empty() {
        problems.add(
            Severity::Error,
            VersionGate::V20,
            format!(
                "'{prefix}.group-id' for {} is missing.",
                dependency.management_key()
            ),
            dependency.location.clone(),
        );
    }
    if dependency.artifact_id.as_deref().unwrap_or("").is_empty() {
        problems.add(
            Severity::Error,
            VersionGate::V20,
            format!(
                "'{prefix}.artifact-id' for {} is missing.",
                dependency.management_key()
            ),
            dependency.location.clone(),
        );
    }
}

fn check_id_charset(
    value: Option<&str>,
    field: &str,
    model: &Descriptor,
    problems: &mut ProblemCollector,
) {
    let Some(value) = value else { return };
    let valid = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid && !value.contains("${") {
        problems.add(
            Severity::Error,
            VersionGate::V20,
            format!("'{field}' contains an invalid character: `{value}`"),
            model.location(field).cloned(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::Parent;

    fn problems() -> ProblemCollector {
        ProblemCollector::new(ValidationLevel::Strict)
    }

    #[test]
    fn test_raw_requires_artifact_id() {
        let model = Descriptor {
            group_id: Some("g".to_string()),
            version: Some("1".to_string()),
            ..Default::default()
        };
        let mut collector = problems();
        DefaultValidator.validate_raw_model(&model, ValidationLevel::Strict, &mut collector);

        assert!(collector.has_errors());
        assert!(collector.problems()[0].message.contains("'artifact-id'"));
    }

    #[test]
    fn test_raw_group_and_version_may_come_from_parent() {
        let model = Descriptor {
            artifact_id: Some("a".to_string()),
            parent: Some(Parent {
                group_id: Some("pg".to_string()),
                artifact_id: Some("p".to_string()),
                version: Some("1".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut collector = problems();
        DefaultValidator.validate_raw_model(&model, ValidationLevel::Strict, &mut collector);
        assert!(!collector.has_errors());
    }

    #[test]
    fn test_file_rejects_unknown_model_version() {
        let model = Descriptor {
            model_version: Some("9.9.9".to_string()),
            ..Default::default()
        };
        let mut collector = problems();
        DefaultValidator.validate_file_model(&model, ValidationLevel::Strict, &mut collector);
        assert!(collector.has_errors());
    }

    #[test]
    fn test_file_rejects_incomplete_parent() {
        let model = Descriptor {
            artifact_id: Some("a".to_string()),
            parent: Some(Parent::default()),
            ..Default::default()
        };
        let mut collector = problems();
        DefaultValidator.validate_file_model(&model, ValidationLevel::Strict, &mut collector);
        assert_eq!(
            collector
                .problems()
                .iter()
                .filter(|p| p.severity == Severity::Error)
                .count(),
            3
        );
    }

    #[test]
    fn test_effective_requires_identity_and_versions() {
        let model = Descriptor {
            group_id: Some("g".to_string()),
            artifact_id: Some("a".to_string()),
            version: Some("1".to_string()),
            dependencies: vec![Dependency {
                group_id: Some("dg".to_string()),
                artifact_id: Some("da".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut collector = problems();
        DefaultValidator.validate_effective_model(&model, ValidationLevel::Strict, &mut collector);

        assert!(collector.has_errors());
        assert!(collector.problems()[0]
            .message
            .contains("'dependencies.dependency.version'"));
    }

    #[test]
    fn test_effective_validates_repository_urls() {
        let model = Descriptor {
            group_id: Some("g".to_string()),
            artifact_id: Some("a".to_string()),
            version: Some("1".to_string()),
            repositories: vec![crate::core::descriptor::Repository {
                id: Some("bad".to_string()),
                url: Some("not a url".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let mut collector = problems();
        DefaultValidator.validate_effective_model(&model, ValidationLevel::Strict, &mut collector);
        assert!(collector.has_errors());
    }

    #[test]
    fn test_gate_demotion_at_lower_level() {
        let model = Descriptor {
            repositories: vec![
                crate::core::descriptor::Repository {
                    id: Some("dup".to_string()),
                    ..Default::default()
                },
                crate::core::descriptor::Repository {
                    id: Some("dup".to_string()),
                    ..Default::default()
                },
            ],
            artifact_id: Some("a".to_string()),
            group_id: Some("g".to_string()),
            version: Some("1".to_string()),
            ..Default::default()
        };

        // the duplicate-repository check is gated at V30; at V20 it demotes
        let mut collector = ProblemCollector::new(ValidationLevel::V20);
        DefaultValidator.validate_raw_model(&model, ValidationLevel::V20, &mut collector);
        assert!(!collector.has_errors());
        assert!(collector
            .problems()
            .iter()
            .any(|p| p.message.contains("duplicate repository")));
    }
}
