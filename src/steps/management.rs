//! Default management injection and import composition.

use crate::build::problems::ProblemCollector;
use crate::core::descriptor::{DependencyManagement, Descriptor};
use crate::steps::{
    merge_config, DependencyManagementImporter, DependencyManagementInjector,
    PluginManagementInjector,
};

/// Fills plugin declarations from `[build.plugin-management]`.
#[derive(Debug, Default)]
pub struct DefaultPluginManagementInjector;

impl PluginManagementInjector for DefaultPluginManagementInjector {
    fn inject_management(&self, model: &mut Descriptor, _problems: &mut ProblemCollector) {
        let Some(build) = &mut model.build else { return };
        let Some(management) = &build.plugin_management else {
            return;
        };
        let managed = management.plugins.clone();

        for plugin in &mut build.plugins {
            let Some(defaults) = managed.iter().find(|m| m.key() == plugin.key()) else {
                continue;
            };
            if plugin.version.is_none() {
                plugin.version = defaults.version.clone();
            }
            if plugin.extensions.is_none() {
                plugin.extensions = defaults.extensions;
            }
            plugin.configuration = merge_config(
                plugin.configuration.as_ref(),
                defaults.configuration.as_ref(),
            );
            for execution in &defaults.executions {
                if !plugin.executions.iter().any(|e| e.id == execution.id) {
                    plugin.executions.push(execution.clone());
                }
            }
            for dependency in &defaults.dependencies {
                let key = dependency.management_key();
                if !plugin
                    .dependencies
                    .iter()
                    .any(|d| d.management_key() == key)
                {
                    plugin.dependencies.push(dependency.clone());
                }
            }
        }
    }
}

/// Fills dependency declarations from `[dependency-management]`.
#[derive(Debug, Default)]
pub struct DefaultDependencyManagementInjector;

impl DependencyManagementInjector for DefaultDependencyManagementInjector {
    fn inject_management(&self, model: &mut Descriptor, _problems: &mut ProblemCollector) {
        let Some(management) = &model.dependency_management else {
            return;
        };
        let managed = management.dependencies.clone();

        for dependency in &mut model.dependencies {
            let key = dependency.management_key();
            let Some(defaults) = managed.iter().find(|m| m.management_key() == key) else {
                continue;
            };
            if dependency.version.is_none() {
                dependency.version = defaults.version.clone();
            }
            if dependency.scope.is_none() {
                dependency.scope = defaults.scope.clone();
            }
            if dependency.optional.is_none() {
                dependency.optional = defaults.optional;
            }
            if dependency.exclusions.is_empty() {
                dependency.exclusions = defaults.exclusions.clone();
            }
        }
    }
}

/// Merges imported dependency-management sections into the model,
/// first-declared-wins: entries already managed by the model itself or by
/// an earlier import are left untouched.
#[derive(Debug, Default)]
pub struct DefaultDependencyManagementImporter;

impl DependencyManagementImporter for DefaultDependencyManagementImporter {
    fn import_management(
        &self,
        model: &mut Descriptor,
        imports: Vec<DependencyManagement>,
        _problems: &mut ProblemCollector,
    ) {
        if imports.is_empty() {
            return;
        }

        let management = model
            .dependency_management
            .get_or_insert_with(DependencyManagement::default);
        let mut seen: Vec<String> = management
            .dependencies
            .iter()
            .map(|d| d.management_key())
            .collect();

        for import in imports {
            for dependency in import.dependencies {
                let key = dependency.management_key();
                if seen.contains(&key) {
                    continue;
                }
                seen.push(key);
                management.dependencies.push(dependency);
            }
        }
    }
}
