//! Default profile selection and injection.

use std::path::Path;

use crate::build::problems::{ProblemCollector, Severity, VersionGate};
use crate::core::descriptor::{Dependency, DependencyManagement, Descriptor, Repository};
use crate::core::profile::{Activation, ActivationContext, OsActivation, Profile};
use crate::core::version::VersionSpec;
use crate::steps::{merge_config, ProfileInjector, ProfileSelector};

/// Property carrying the active toolchain version in the context.
pub const TOOLCHAIN_VERSION_PROPERTY: &str = "toolchain.version";

/// Evaluates activation predicates against the activation context.
///
/// A profile is active when explicitly requested, or when every condition
/// of its activation holds. `active-by-default` profiles apply only when
/// nothing else in the same collection activated. Explicit deactivation
/// always wins.
#[derive(Debug, Default)]
pub struct DefaultProfileSelector;

impl ProfileSelector for DefaultProfileSelector {
    fn active_profiles(
        &self,
        profiles: &[Profile],
        context: &ActivationContext,
        problems: &mut ProblemCollector,
    ) -> Vec<Profile> {
        let mut active = Vec::new();
        let mut any_activated = false;

        for profile in profiles {
            if context.inactive_ids.iter().any(|id| *id == profile.id) {
                continue;
            }
            if context.active_ids.iter().any(|id| *id == profile.id) {
                active.push(profile.clone());
                any_activated = true;
                continue;
            }
            if let Some(activation) = &profile.activation {
                if has_conditions(activation)
                    && is_active(activation, context, problems, &profile.id)
                {
                    active.push(profile.clone());
                    any_activated = true;
                }
            }
        }

        if !any_activated {
            for profile in profiles {
                if context.inactive_ids.iter().any(|id| *id == profile.id) {
                    continue;
                }
                if profile
                    .activation
                    .as_ref()
                    .is_some_and(|a| a.active_by_default)
                {
                    active.push(profile.clone());
                }
            }
        }

        active
    }
}

fn has_conditions(activation: &Activation) -> bool {
    activation.toolchain.is_some()
        || activation.os.is_some()
        || activation.property.is_some()
        || activation.file.is_some()
}

fn is_active(
    activation: &Activation,
    context: &ActivationContext,
    problems: &mut ProblemCollector,
    profile_id: &str,
) -> bool {
    if let Some(range) = &activation.toolchain {
        match VersionSpec::parse(range) {
            Ok(spec) => {
                let Some(version) = context.property(TOOLCHAIN_VERSION_PROPERTY) else {
                    return false;
                };
                if !spec.contains_str(version) {
                    return false;
                }
            }
            Err(e) => {
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    format!("invalid toolchain range in activation of profile `{profile_id}`: {e}"),
                    None,
                );
                return false;
            }
        }
    }

    if let Some(os) = &activation.os {
        if !os_matches(os, context) {
            return false;
        }
    }

    if let Some(property) = &activation.property {
        let (name, name_negated) = match property.name.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (property.name.as_str(), false),
        };
        let current = context.property(name);
        match &property.value {
            None => {
                let present = current.is_some_and(|v| !v.is_empty());
                if present == name_negated {
                    return false;
                }
            }
            Some(expected) => {
                let (expected, value_negated) = match expected.strip_prefix('!') {
                    Some(rest) => (rest, true),
                    None => (expected.as_str(), false),
                };
                let matches = current == Some(expected);
                if matches == value_negated {
                    return false;
                }
            }
        }
    }

    if let Some(file) = &activation.file {
        if let Some(exists) = &file.exists {
            if !probe(exists, context.project_directory.as_deref()) {
                return false;
            }
        }
        if let Some(missing) = &file.missing {
            if probe(missing, context.project_directory.as_deref()) {
                return false;
            }
        }
    }

    true
}

fn os_matches(os: &OsActivation, context: &ActivationContext) -> bool {
    let check = |expected: &Option<String>, property: &str| -> bool {
        let Some(expected) = expected else {
            return true;
        };
        let actual = context.property(property).unwrap_or("");
        match expected.strip_prefix('!') {
            Some(negated) => !actual.eq_ignore_ascii_case(negated),
            None => actual.eq_ignore_ascii_case(expected),
        }
    };

    check(&os.name, "os.name")
        && check(&os.family, "os.family")
        && check(&os.arch, "os.arch")
        && check(&os.version, "os.version")
}

fn probe(path: &str, project_directory: Option<&Path>) -> bool {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return candidate.exists();
    }
    match project_directory {
        Some(base) => base.join(candidate).exists(),
        None => candidate.exists(),
    }
}

/// Merges an active profile's contribution into the descriptor.
///
/// Profile values dominate: properties overwrite, matching dependencies
/// and plugins are replaced or merged profile-first, repositories are
/// prepended.
#[derive(Debug, Default)]
pub struct DefaultProfileInjector;

impl ProfileInjector for DefaultProfileInjector {
    fn inject(&self, model: &mut Descriptor, profile: &Profile, _problems: &mut ProblemCollector) {
        for (key, value) in &profile.properties {
            model.properties.insert(key.clone(), value.clone());
        }

        merge_dependency_list(&mut model.dependencies, &profile.dependencies);

        if let Some(profile_mgmt) = &profile.dependency_management {
            let management = model
                .dependency_management
                .get_or_insert_with(DependencyManagement::default);
            merge_dependency_list(&mut management.dependencies, &profile_mgmt.dependencies);
        }

        prepend_repositories(&mut model.repositories, &profile.repositories);
        prepend_repositories(&mut model.plugin_repositories, &profile.plugin_repositories);

        if let Some(profile_build) = &profile.build {
            let build = model.build.get_or_insert_with(Default::default);
            if profile_build.directory.is_some() {
                build.directory = profile_build.directory.clone();
            }
            if profile_build.source_directory.is_some() {
                build.source_directory = profile_build.source_directory.clone();
            }
            if profile_build.test_source_directory.is_some() {
                build.test_source_directory = profile_build.test_source_directory.clone();
            }
            if profile_build.output_directory.is_some() {
                build.output_directory = profile_build.output_directory.clone();
            }
            if profile_build.final_name.is_some() {
                build.final_name = profile_build.final_name.clone();
            }
            build.extensions.extend(profile_build.extensions.iter().cloned());

            for plugin in &profile_build.plugins {
                match build.plugins.iter_mut().find(|p| p.key() == plugin.key()) {
                    Some(existing) => {
                        if plugin.version.is_some() {
                            existing.version = plugin.version.clone();
                        }
                        existing.configuration = merge_config(
                            plugin.configuration.as_ref(),
                            existing.configuration.as_ref(),
                        );
                        for execution in &plugin.executions {
                            if !existing.executions.iter().any(|e| e.id == execution.id) {
                                existing.executions.push(execution.clone());
                            }
                        }
                        merge_dependency_list(&mut existing.dependencies, &plugin.dependencies);
                    }
                    None => build.plugins.push(plugin.clone()),
                }
            }

            if let Some(profile_mgmt) = &profile_build.plugin_management {
                let management = build.plugin_management.get_or_insert_with(Default::default);
                for plugin in &profile_mgmt.plugins {
                    match management
                        .plugins
                        .iter_mut()
                        .find(|p| p.key() == plugin.key())
                    {
                        Some(existing) => *existing = plugin.clone(),
                        None => management.plugins.push(plugin.clone()),
                    }
                }
            }
        }

        if let Some(profile_reporting) = &profile.reporting {
            let reporting = model.reporting.get_or_insert_with(Default::default);
            if profile_reporting.output_directory.is_some() {
                reporting.output_directory = profile_reporting.output_directory.clone();
            }
            for plugin in &profile_reporting.plugins {
                match reporting.plugins.iter_mut().find(|p| p.key() == plugin.key()) {
                    Some(existing) => *existing = plugin.clone(),
                    None => reporting.plugins.push(plugin.clone()),
                }
            }
        }
    }
}

fn merge_dependency_list(target: &mut Vec<Dependency>, incoming: &[Dependency]) {
    for dependency in incoming {
        let key = dependency.management_key();
        match target.iter_mut().find(|d| d.management_key() == key) {
            Some(existing) => *existing = dependency.clone(),
            None => target.push(dependency.clone()),
        }
    }
}

fn prepend_repositories(target: &mut Vec<Repository>, incoming: &[Repository]) {
    let mut merged: Vec<Repository> = incoming.to_vec();
    for repository in target.drain(..) {
        if !merged.iter().any(|r| r.id == repository.id) {
            merged.push(repository);
        }
    }
    *target = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::request::ValidationLevel;
    use tempfile::TempDir;

    fn ctx() -> ActivationContext {
        ActivationContext::default()
    }

    fn problems() -> ProblemCollector {
        ProblemCollector::new(ValidationLevel::Strict)
    }

    fn profile(id: &str, activation: Option<Activation>) -> Profile {
        Profile {
            id: id.to_string(),
            activation,
            ..Default::default()
        }
    }

    #[test]
    fn test_explicit_activation() {
        let profiles = vec![profile("a", None), profile("b", None)];
        let mut context = ctx();
        context.active_ids.push("b".to_string());

        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "b");
    }

    #[test]
    fn test_inactive_wins_over_active() {
        let profiles = vec![profile("a", None)];
        let mut context = ctx();
        context.active_ids.push("a".to_string());
        context.inactive_ids.push("a".to_string());

        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert!(active.is_empty());
    }

    #[test]
    fn test_property_activation() {
        let activation = Activation {
            property: Some(crate::core::profile::PropertyActivation {
                name: "env.CI".to_string(),
                value: Some("true".to_string()),
            }),
            ..Default::default()
        };
        let profiles = vec![profile("ci", Some(activation))];

        let mut context = ctx();
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert!(active.is_empty());

        context
            .user_properties
            .insert("env.CI".to_string(), "true".to_string());
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_negated_property_activation() {
        let activation = Activation {
            property: Some(crate::core::profile::PropertyActivation {
                name: "!skip".to_string(),
                value: None,
            }),
            ..Default::default()
        };
        let profiles = vec![profile("p", Some(activation))];

        let context = ctx();
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert_eq!(active.len(), 1);

        let mut context = ctx();
        context
            .user_properties
            .insert("skip".to_string(), "yes".to_string());
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert!(active.is_empty());
    }

    #[test]
    fn test_active_by_default_suppressed() {
        let default = Activation {
            active_by_default: true,
            ..Default::default()
        };
        let profiles = vec![profile("fallback", Some(default)), profile("other", None)];

        // nothing else active: the default applies
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &ctx(), &mut problems());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "fallback");

        // another profile activates: the default is suppressed
        let mut context = ctx();
        context.active_ids.push("other".to_string());
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "other");
    }

    #[test]
    fn test_file_activation() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("flag"), "").unwrap();

        let activation = Activation {
            file: Some(crate::core::profile::FileActivation {
                exists: Some("flag".to_string()),
                missing: None,
            }),
            ..Default::default()
        };
        let profiles = vec![profile("flagged", Some(activation))];

        let mut context = ctx();
        context.project_directory = Some(tmp.path().to_path_buf());
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert_eq!(active.len(), 1);

        context.project_directory = Some(tmp.path().join("elsewhere"));
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert!(active.is_empty());
    }

    #[test]
    fn test_toolchain_activation() {
        let activation = Activation {
            toolchain: Some("[1.80,)".to_string()),
            ..Default::default()
        };
        let profiles = vec![profile("modern", Some(activation))];

        let mut context = ctx();
        context
            .system_properties
            .insert(TOOLCHAIN_VERSION_PROPERTY.to_string(), "1.82".to_string());
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert_eq!(active.len(), 1);

        context
            .system_properties
            .insert(TOOLCHAIN_VERSION_PROPERTY.to_string(), "1.75".to_string());
        let active =
            DefaultProfileSelector.active_profiles(&profiles, &context, &mut problems());
        assert!(active.is_empty());
    }

    #[test]
    fn test_injection_properties_and_dependencies() {
        let mut model = Descriptor::default();
        model
            .properties
            .insert("key".to_string(), "model".to_string());

        let mut injected = Profile {
            id: "p".to_string(),
            ..Default::default()
        };
        injected
            .properties
            .insert("key".to_string(), "profile".to_string());
        injected.dependencies.push(Dependency {
            group_id: Some("g".to_string()),
            artifact_id: Some("extra".to_string()),
            version: Some("1".to_string()),
            ..Default::default()
        });

        DefaultProfileInjector.inject(&mut model, &injected, &mut problems());
        assert_eq!(model.properties["key"], "profile");
        assert_eq!(model.dependencies.len(), 1);
    }

    #[test]
    fn test_injection_prepends_repositories() {
        let mut model = Descriptor::default();
        model.repositories.push(Repository {
            id: Some("existing".to_string()),
            ..Default::default()
        });

        let mut injected = Profile {
            id: "p".to_string(),
            ..Default::default()
        };
        injected.repositories.push(Repository {
            id: Some("profile-repo".to_string()),
            ..Default::default()
        });

        DefaultProfileInjector.inject(&mut model, &injected, &mut problems());
        assert_eq!(model.repositories[0].id.as_deref(), Some("profile-repo"));
        assert_eq!(model.repositories[1].id.as_deref(), Some("existing"));
    }
}
