//! Default inheritance assembly, child-wins.

use crate::build::problems::ProblemCollector;
use crate::core::descriptor::{
    BuildSection, Dependency, DependencyManagement, Descriptor, Plugin, Repository,
};
use crate::steps::{merge_config, InheritanceAssembler};

/// Merges a parent descriptor into its child.
///
/// Scalar fields are inherited only when absent on the child; artifact id
/// is never inherited. Collections keep child entries first and append
/// parent entries without a child-side counterpart. Profiles and the
/// parent reference itself are not inherited.
#[derive(Debug, Default)]
pub struct DefaultInheritanceAssembler;

impl InheritanceAssembler for DefaultInheritanceAssembler {
    fn assemble(
        &self,
        child: &mut Descriptor,
        parent: &Descriptor,
        _problems: &mut ProblemCollector,
    ) {
        inherit(&mut child.model_version, &parent.model_version);
        inherit(&mut child.group_id, &parent.group_id);
        inherit(&mut child.version, &parent.version);
        inherit(&mut child.url, &parent.url);

        for (key, value) in &parent.properties {
            child
                .properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        append_dependencies(&mut child.dependencies, &parent.dependencies);

        if let Some(parent_mgmt) = &parent.dependency_management {
            let management = child
                .dependency_management
                .get_or_insert_with(DependencyManagement::default);
            append_dependencies(&mut management.dependencies, &parent_mgmt.dependencies);
        }

        append_repositories(&mut child.repositories, &parent.repositories);
        append_repositories(&mut child.plugin_repositories, &parent.plugin_repositories);

        if let Some(parent_build) = &parent.build {
            let build = child.build.get_or_insert_with(BuildSection::default);
            inherit(&mut build.directory, &parent_build.directory);
            inherit(&mut build.source_directory, &parent_build.source_directory);
            inherit(
                &mut build.test_source_directory,
                &parent_build.test_source_directory,
            );
            inherit(&mut build.output_directory, &parent_build.output_directory);

            for extension in &parent_build.extensions {
                let exists = build.extensions.iter().any(|e| {
                    e.group_id == extension.group_id && e.artifact_id == extension.artifact_id
                });
                if !exists {
                    build.extensions.push(extension.clone());
                }
            }

            merge_plugin_list(&mut build.plugins, &parent_build.plugins);

            if let Some(parent_mgmt) = &parent_build.plugin_management {
                let management = build.plugin_management.get_or_insert_with(Default::default);
                merge_plugin_list(&mut management.plugins, &parent_mgmt.plugins);
            }
        }

        if let Some(parent_reporting) = &parent.reporting {
            let reporting = child.reporting.get_or_insert_with(Default::default);
            inherit(
                &mut reporting.output_directory,
                &parent_reporting.output_directory,
            );
            for plugin in &parent_reporting.plugins {
                if !reporting.plugins.iter().any(|p| p.key() == plugin.key()) {
                    reporting.plugins.push(plugin.clone());
                }
            }
        }
    }
}

fn inherit(child: &mut Option<String>, parent: &Option<String>) {
    if child.is_none() {
        child.clone_from(parent);
    }
}

fn append_dependencies(child: &mut Vec<Dependency>, parent: &[Dependency]) {
    for dependency in parent {
        let key = dependency.management_key();
        if !child.iter().any(|d| d.management_key() == key) {
            child.push(dependency.clone());
        }
    }
}

fn append_repositories(child: &mut Vec<Repository>, parent: &[Repository]) {
    for repository in parent {
        if !child.iter().any(|r| r.id == repository.id) {
            child.push(repository.clone());
        }
    }
}

fn merge_plugin_list(child: &mut Vec<Plugin>, parent: &[Plugin]) {
    for plugin in parent {
        match child.iter_mut().find(|p| p.key() == plugin.key()) {
            Some(existing) => merge_plugin(existing, plugin),
            None => child.push(plugin.clone()),
        }
    }
}

// child plugin dominates; parent supplies defaults
fn merge_plugin(child: &mut Plugin, parent: &Plugin) {
    inherit(&mut child.version, &parent.version);
    if child.extensions.is_none() {
        child.extensions = parent.extensions;
    }
    child.configuration = merge_config(
        child.configuration.as_ref(),
        parent.configuration.as_ref(),
    );
    for execution in &parent.executions {
        if !child.executions.iter().any(|e| e.id == execution.id) {
            child.executions.push(execution.clone());
        }
    }
    append_dependencies(&mut child.dependencies, &parent.dependencies);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::request::ValidationLevel;

    fn problems() -> ProblemCollector {
        ProblemCollector::new(ValidationLevel::Strict)
    }

    #[test]
    fn test_scalars_inherited_when_absent() {
        let mut child = Descriptor {
            artifact_id: Some("child".to_string()),
            ..Default::default()
        };
        let parent = Descriptor {
            group_id: Some("pg".to_string()),
            artifact_id: Some("parent".to_string()),
            version: Some("1".to_string()),
            ..Default::default()
        };

        DefaultInheritanceAssembler.assemble(&mut child, &parent, &mut problems());

        assert_eq!(child.group_id.as_deref(), Some("pg"));
        assert_eq!(child.version.as_deref(), Some("1"));
        // artifact id is never inherited
        assert_eq!(child.artifact_id.as_deref(), Some("child"));
    }

    #[test]
    fn test_child_wins_scalars() {
        let mut child = Descriptor {
            group_id: Some("cg".to_string()),
            version: Some("2".to_string()),
            ..Default::default()
        };
        let parent = Descriptor {
            group_id: Some("pg".to_string()),
            version: Some("1".to_string()),
            ..Default::default()
        };

        DefaultInheritanceAssembler.assemble(&mut child, &parent, &mut problems());
        assert_eq!(child.group_id.as_deref(), Some("cg"));
        assert_eq!(child.version.as_deref(), Some("2"));
    }

    #[test]
    fn test_properties_child_wins() {
        let mut child = Descriptor::default();
        child
            .properties
            .insert("shared".to_string(), "child".to_string());
        let mut parent = Descriptor::default();
        parent
            .properties
            .insert("shared".to_string(), "parent".to_string());
        parent
            .properties
            .insert("only".to_string(), "parent".to_string());

        DefaultInheritanceAssembler.assemble(&mut child, &parent, &mut problems());
        assert_eq!(child.properties["shared"], "child");
        assert_eq!(child.properties["only"], "parent");
    }

    #[test]
    fn test_dependency_dedup_by_key() {
        let dep = |artifact: &str, version: &str| Dependency {
            group_id: Some("g".to_string()),
            artifact_id: Some(artifact.to_string()),
            version: Some(version.to_string()),
            ..Default::default()
        };

        let mut child = Descriptor {
            dependencies: vec![dep("shared", "2")],
            ..Default::default()
        };
        let parent = Descriptor {
            dependencies: vec![dep("shared", "1"), dep("extra", "1")],
            ..Default::default()
        };

        DefaultInheritanceAssembler.assemble(&mut child, &parent, &mut problems());
        assert_eq!(child.dependencies.len(), 2);
        assert_eq!(child.dependencies[0].version.as_deref(), Some("2"));
    }

    #[test]
    fn test_plugin_merge_fills_version() {
        let mut child = Descriptor {
            build: Some(BuildSection {
                plugins: vec![Plugin {
                    group_id: Some("g".to_string()),
                    artifact_id: Some("plug".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let parent = Descriptor {
            build: Some(BuildSection {
                plugins: vec![Plugin {
                    group_id: Some("g".to_string()),
                    artifact_id: Some("plug".to_string()),
                    version: Some("3".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        DefaultInheritanceAssembler.assemble(&mut child, &parent, &mut problems());
        let plugins = &child.build.as_ref().unwrap().plugins;
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].version.as_deref(), Some("3"));
    }

    #[test]
    fn test_profiles_not_inherited() {
        let mut child = Descriptor::default();
        let parent = Descriptor {
            profiles: vec![crate::core::profile::Profile {
                id: "parent-only".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };

        DefaultInheritanceAssembler.assemble(&mut child, &parent, &mut problems());
        assert!(child.profiles.is_empty());
    }
}
