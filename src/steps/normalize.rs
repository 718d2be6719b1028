//! Default model normalization.

use crate::build::problems::{ProblemCollector, Severity, VersionGate};
use crate::core::descriptor::Descriptor;
use crate::steps::{merge_config, Normalizer};

/// Merges duplicate declarations and fills conventional defaults.
#[derive(Debug, Default)]
pub struct DefaultNormalizer;

impl Normalizer for DefaultNormalizer {
    /// Collapse duplicate dependency and plugin declarations. For
    /// dependencies the last declaration wins; duplicate plugins are merged
    /// into the first declaration.
    fn merge_duplicates(&self, model: &mut Descriptor, problems: &mut ProblemCollector) {
        let mut deduped = Vec::with_capacity(model.dependencies.len());
        for dependency in model.dependencies.drain(..) {
            let key = dependency.management_key();
            if let Some(index) = deduped
                .iter()
                .position(|d: &crate::core::descriptor::Dependency| d.management_key() == key)
            {
                problems.add(
                    Severity::Warning,
                    VersionGate::V20,
                    format!("duplicate declaration of dependency {key}"),
                    dependency.location.clone(),
                );
                deduped[index] = dependency;
            } else {
                deduped.push(dependency);
            }
        }
        model.dependencies = deduped;

        if let Some(build) = &mut model.build {
            let mut merged: Vec<crate::core::descriptor::Plugin> =
                Vec::with_capacity(build.plugins.len());
            for plugin in build.plugins.drain(..) {
                match merged.iter_mut().find(|p| p.key() == plugin.key()) {
                    Some(existing) => {
                        existing.configuration = merge_config(
                            existing.configuration.as_ref(),
                            plugin.configuration.as_ref(),
                        );
                        for execution in plugin.executions {
                            if !existing.executions.iter().any(|e| e.id == execution.id) {
                                existing.executions.push(execution);
                            }
                        }
                        for dependency in plugin.dependencies {
                            let key = dependency.management_key();
                            if !existing
                                .dependencies
                                .iter()
                                .any(|d| d.management_key() == key)
                            {
                                existing.dependencies.push(dependency);
                            }
                        }
                        if existing.version.is_none() {
                            existing.version = plugin.version;
                        }
                    }
                    None => merged.push(plugin),
                }
            }
            build.plugins = merged;
        }
    }

    /// Fill conventional defaults on the effective model: dependency scope
    /// and type, execution ids.
    fn inject_defaults(&self, model: &mut Descriptor, _problems: &mut ProblemCollector) {
        for dependency in &mut model.dependencies {
            if dependency.scope.is_none() {
                dependency.scope = Some("compile".to_string());
            }
            if dependency.dep_type.is_none() {
                dependency.dep_type = Some(dependency.dep_type_or_default().to_string());
            }
        }

        if let Some(build) = &mut model.build {
            for plugin in &mut build.plugins {
                for execution in &mut plugin.executions {
                    if execution.id.is_none() {
                        execution.id = Some("default".to_string());
                    }
                }
            }
        }
    }
}
