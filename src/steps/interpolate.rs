//! Default expression interpolation.
//!
//! Replaces `${expr}` occurrences in every string field of the model.
//! Expressions resolve against user properties, then the model's own
//! properties, then system properties, plus a few `project.*` built-ins.
//! Unresolvable expressions are left literal; unbounded recursion is
//! reported as a problem.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::build::problems::{ProblemCollector, Severity, VersionGate};
use crate::core::descriptor::{
    BuildSection, Dependency, Descriptor, Plugin, ReportPlugin, Reporting, Repository,
};
use crate::core::profile::Profile;
use crate::steps::{InterpolationConfig, Interpolator};

static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^${}]+)\}").expect("expression pattern compiles"));

/// Resolution passes before a still-changing string is declared recursive.
const MAX_DEPTH: usize = 16;

/// Default whole-model interpolator.
#[derive(Debug, Default)]
pub struct DefaultInterpolator;

impl Interpolator for DefaultInterpolator {
    fn interpolate(
        &self,
        mut model: Descriptor,
        project_directory: Option<&Path>,
        config: &InterpolationConfig<'_>,
        problems: &mut ProblemCollector,
    ) -> Descriptor {
        let model_properties = model.properties.clone();
        let builtins = builtins(&model, project_directory);

        let lookup = |name: &str| -> Option<String> {
            config
                .user_properties
                .get(name)
                .or_else(|| model_properties.get(name))
                .or_else(|| config.system_properties.get(name))
                .or_else(|| builtins.get(name))
                .cloned()
        };

        let mut failures: Vec<String> = Vec::new();
        for_each_string_mut(&mut model, &mut |text| {
            match resolve_expressions(text, &lookup) {
                Ok(resolved) => *text = resolved,
                Err(expression) => failures.push(expression),
            }
        });

        for expression in failures {
            problems.add(
                Severity::Error,
                VersionGate::Base,
                format!("recursive expression resolution in `{expression}`"),
                None,
            );
        }

        model
    }
}

fn builtins(model: &Descriptor, project_directory: Option<&Path>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut put = |key: &str, value: Option<&str>| {
        if let Some(value) = value {
            out.insert(key.to_string(), value.to_string());
        }
    };
    put("project.group-id", model.effective_group_id());
    put("project.artifact-id", model.artifact_id.as_deref());
    put("project.version", model.effective_version());
    put("project.packaging", Some(model.packaging_or_default()));
    put("project.url", model.url.as_deref());
    if let Some(dir) = project_directory {
        let dir = dir.display().to_string();
        out.insert("project.basedir".to_string(), dir.clone());
        out.insert("basedir".to_string(), dir);
    }
    out
}

/// Resolve `${expr}` occurrences in one string. Unresolvable expressions
/// stay literal; a string still changing after [`MAX_DEPTH`] passes is
/// reported back as the recursive input.
pub(crate) fn resolve_expressions(
    text: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, String> {
    if !text.contains("${") {
        return Ok(text.to_string());
    }

    let original = text.to_string();
    let mut current = original.clone();
    for _ in 0..MAX_DEPTH {
        let (next, changed) = resolve_once(&current, lookup);
        current = next;
        if !changed {
            return Ok(current);
        }
    }

    let (_, still_changing) = resolve_once(&current, lookup);
    if still_changing {
        return Err(original);
    }
    Ok(current)
}

fn resolve_once(text: &str, lookup: &dyn Fn(&str) -> Option<String>) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut changed = false;

    for captures in EXPRESSION.captures_iter(text) {
        let whole = captures.get(0).expect("capture 0 always present");
        out.push_str(&text[last..whole.start()]);
        match lookup(captures[1].trim()) {
            Some(value) => {
                out.push_str(&value);
                changed = true;
            }
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    (out, changed)
}

/// Apply `f` to every interpolatable string field of the model.
pub(crate) fn for_each_string_mut(model: &mut Descriptor, f: &mut impl FnMut(&mut String)) {
    visit_opt(&mut model.model_version, f);
    visit_opt(&mut model.group_id, f);
    visit_opt(&mut model.artifact_id, f);
    visit_opt(&mut model.version, f);
    visit_opt(&mut model.packaging, f);
    visit_opt(&mut model.url, f);

    if let Some(parent) = &mut model.parent {
        visit_opt(&mut parent.group_id, f);
        visit_opt(&mut parent.artifact_id, f);
        visit_opt(&mut parent.version, f);
        visit_opt(&mut parent.relative_path, f);
    }

    for value in model.properties.values_mut() {
        f(value);
    }

    for dependency in &mut model.dependencies {
        visit_dependency(dependency, f);
    }
    if let Some(management) = &mut model.dependency_management {
        for dependency in &mut management.dependencies {
            visit_dependency(dependency, f);
        }
    }

    if let Some(build) = &mut model.build {
        visit_build(build, f);
    }
    if let Some(reporting) = &mut model.reporting {
        visit_reporting(reporting, f);
    }

    for repository in &mut model.repositories {
        visit_repository(repository, f);
    }
    for repository in &mut model.plugin_repositories {
        visit_repository(repository, f);
    }

    for profile in &mut model.profiles {
        visit_profile(profile, f);
    }
}

fn visit_opt(value: &mut Option<String>, f: &mut impl FnMut(&mut String)) {
    if let Some(value) = value {
        f(value);
    }
}

fn visit_dependency(dependency: &mut Dependency, f: &mut impl FnMut(&mut String)) {
    visit_opt(&mut dependency.group_id, f);
    visit_opt(&mut dependency.artifact_id, f);
    visit_opt(&mut dependency.version, f);
    visit_opt(&mut dependency.dep_type, f);
    visit_opt(&mut dependency.classifier, f);
    visit_opt(&mut dependency.scope, f);
    for exclusion in &mut dependency.exclusions {
        visit_opt(&mut exclusion.group_id, f);
        visit_opt(&mut exclusion.artifact_id, f);
    }
}

fn visit_build(build: &mut BuildSection, f: &mut impl FnMut(&mut String)) {
    visit_opt(&mut build.directory, f);
    visit_opt(&mut build.source_directory, f);
    visit_opt(&mut build.test_source_directory, f);
    visit_opt(&mut build.output_directory, f);
    visit_opt(&mut build.final_name, f);
    for extension in &mut build.extensions {
        visit_opt(&mut extension.group_id, f);
        visit_opt(&mut extension.artifact_id, f);
        visit_opt(&mut extension.version, f);
    }
    for plugin in &mut build.plugins {
        visit_plugin(plugin, f);
    }
    if let Some(management) = &mut build.plugin_management {
        for plugin in &mut management.plugins {
            visit_plugin(plugin, f);
        }
    }
}

fn visit_plugin(plugin: &mut Plugin, f: &mut impl FnMut(&mut String)) {
    visit_opt(&mut plugin.group_id, f);
    visit_opt(&mut plugin.artifact_id, f);
    visit_opt(&mut plugin.version, f);
    if let Some(configuration) = &mut plugin.configuration {
        visit_table(configuration, f);
    }
    for dependency in &mut plugin.dependencies {
        visit_dependency(dependency, f);
    }
    for execution in &mut plugin.executions {
        visit_opt(&mut execution.id, f);
        visit_opt(&mut execution.phase, f);
        for goal in &mut execution.goals {
            f(goal);
        }
        if let Some(configuration) = &mut execution.configuration {
            visit_table(configuration, f);
        }
    }
}

fn visit_repository(repository: &mut Repository, f: &mut impl FnMut(&mut String)) {
    visit_opt(&mut repository.id, f);
    visit_opt(&mut repository.name, f);
    visit_opt(&mut repository.url, f);
}

fn visit_reporting(reporting: &mut Reporting, f: &mut impl FnMut(&mut String)) {
    visit_opt(&mut reporting.output_directory, f);
    for plugin in &mut reporting.plugins {
        visit_report_plugin(plugin, f);
    }
}

fn visit_report_plugin(plugin: &mut ReportPlugin, f: &mut impl FnMut(&mut String)) {
    visit_opt(&mut plugin.group_id, f);
    visit_opt(&mut plugin.artifact_id, f);
    visit_opt(&mut plugin.version, f);
    if let Some(configuration) = &mut plugin.configuration {
        visit_table(configuration, f);
    }
    for set in &mut plugin.report_sets {
        visit_opt(&mut set.id, f);
        for report in &mut set.reports {
            f(report);
        }
        if let Some(configuration) = &mut set.configuration {
            visit_table(configuration, f);
        }
    }
}

fn visit_profile(profile: &mut Profile, f: &mut impl FnMut(&mut String)) {
    for value in profile.properties.values_mut() {
        f(value);
    }
    for dependency in &mut profile.dependencies {
        visit_dependency(dependency, f);
    }
    if let Some(management) = &mut profile.dependency_management {
        for dependency in &mut management.dependencies {
            visit_dependency(dependency, f);
        }
    }
    if let Some(build) = &mut profile.build {
        visit_build(build, f);
    }
    if let Some(reporting) = &mut profile.reporting {
        visit_reporting(reporting, f);
    }
    for repository in &mut profile.repositories {
        visit_repository(repository, f);
    }
    for repository in &mut profile.plugin_repositories {
        visit_repository(repository, f);
    }
    // activation predicates are interpolated too; the builder restores the
    // originals afterwards so later evaluation sees raw expressions
    if let Some(activation) = &mut profile.activation {
        if let Some(file) = &mut activation.file {
            visit_opt(&mut file.exists, f);
            visit_opt(&mut file.missing, f);
        }
    }
}

fn visit_table(table: &mut toml::Table, f: &mut impl FnMut(&mut String)) {
    for (_, value) in table.iter_mut() {
        visit_value(value, f);
    }
}

fn visit_value(value: &mut toml::Value, f: &mut impl FnMut(&mut String)) {
    match value {
        toml::Value::String(s) => f(s),
        toml::Value::Array(array) => {
            for element in array {
                visit_value(element, f);
            }
        }
        toml::Value::Table(table) => visit_table(table, f),
        _ => {}
    }
}
