//! Default plugin processing steps.

use crate::build::problems::ProblemCollector;
use crate::core::descriptor::{Descriptor, Plugin, DEFAULT_PLUGIN_GROUP_ID};
use crate::steps::{
    merge_config, PluginConfigurationExpander, ReportConfigurationExpander, ReportingConverter,
};

/// Artifact id of the site plugin the reporting section converts into.
pub const SITE_PLUGIN_ARTIFACT_ID: &str = "site";

/// Pushes plugin-level configuration down into each execution, execution
/// configuration dominant.
#[derive(Debug, Default)]
pub struct DefaultPluginConfigurationExpander;

impl PluginConfigurationExpander for DefaultPluginConfigurationExpander {
    fn expand(&self, model: &mut Descriptor, _problems: &mut ProblemCollector) {
        let Some(build) = &mut model.build else { return };
        for plugin in &mut build.plugins {
            let Some(plugin_config) = plugin.configuration.clone() else {
                continue;
            };
            for execution in &mut plugin.executions {
                execution.configuration = merge_config(
                    execution.configuration.as_ref(),
                    Some(&plugin_config),
                );
            }
        }
    }
}

/// Completes report plugin declarations with versions from the build
/// plugins and plugin management.
#[derive(Debug, Default)]
pub struct DefaultReportConfigurationExpander;

impl ReportConfigurationExpander for DefaultReportConfigurationExpander {
    fn expand(&self, model: &mut Descriptor, _problems: &mut ProblemCollector) {
        let Some(reporting) = &mut model.reporting else {
            return;
        };
        let Some(build) = &model.build else { return };

        for report_plugin in &mut reporting.plugins {
            if report_plugin.version.is_some() {
                continue;
            }
            let key = report_plugin.key();
            let from_plugins = build
                .plugins
                .iter()
                .find(|p| p.key() == key)
                .and_then(|p| p.version.clone());
            let from_management = build
                .plugin_management
                .as_ref()
                .and_then(|m| m.plugins.iter().find(|p| p.key() == key))
                .and_then(|p| p.version.clone());
            report_plugin.version = from_plugins.or(from_management);
        }
    }
}

/// Converts the reporting section into site plugin configuration, unless a
/// site plugin is already configured.
#[derive(Debug, Default)]
pub struct DefaultReportingConverter;

impl ReportingConverter for DefaultReportingConverter {
    fn convert(&self, model: &mut Descriptor, _problems: &mut ProblemCollector) {
        let Some(reporting) = &model.reporting else {
            return;
        };

        let site_key = format!("{DEFAULT_PLUGIN_GROUP_ID}:{SITE_PLUGIN_ARTIFACT_ID}");
        let mut configuration = toml::Table::new();
        if let Some(output_directory) = &reporting.output_directory {
            configuration.insert(
                "output-directory".to_string(),
                toml::Value::String(output_directory.clone()),
            );
        }
        let mut plugins = Vec::new();
        for plugin in &reporting.plugins {
            let mut entry = toml::Table::new();
            let mut put = |key: &str, value: &Option<String>| {
                if let Some(value) = value {
                    entry.insert(key.to_string(), toml::Value::String(value.clone()));
                }
            };
            put("group-id", &plugin.group_id);
            put("artifact-id", &plugin.artifact_id);
            put("version", &plugin.version);
            plugins.push(toml::Value::Table(entry));
        }
        if !plugins.is_empty() {
            configuration.insert("report-plugins".to_string(), toml::Value::Array(plugins));
        }

        let build = model.build.get_or_insert_with(Default::default);
        match build.plugins.iter_mut().find(|p| p.key() == site_key) {
            Some(site) => {
                if site.configuration.is_none() {
                    site.configuration = Some(configuration);
                }
            }
            None => build.plugins.push(Plugin {
                group_id: Some(DEFAULT_PLUGIN_GROUP_ID.to_string()),
                artifact_id: Some(SITE_PLUGIN_ARTIFACT_ID.to_string()),
                configuration: Some(configuration),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::request::ValidationLevel;
    use crate::core::descriptor::{BuildSection, Execution, ReportPlugin, Reporting};

    fn problems() -> ProblemCollector {
        ProblemCollector::new(ValidationLevel::Strict)
    }

    #[test]
    fn test_plugin_config_pushed_into_executions() {
        let mut plugin_config = toml::Table::new();
        plugin_config.insert("shared".to_string(), toml::Value::Integer(1));
        let mut execution_config = toml::Table::new();
        execution_config.insert("shared".to_string(), toml::Value::Integer(2));

        let mut model = Descriptor {
            build: Some(BuildSection {
                plugins: vec![Plugin {
                    artifact_id: Some("p".to_string()),
                    configuration: Some(plugin_config),
                    executions: vec![
                        Execution {
                            id: Some("with-config".to_string()),
                            configuration: Some(execution_config),
                            ..Default::default()
                        },
                        Execution {
                            id: Some("bare".to_string()),
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        DefaultPluginConfigurationExpander.expand(&mut model, &mut problems());

        let executions = &model.build.as_ref().unwrap().plugins[0].executions;
        // execution-level value wins over plugin-level
        assert_eq!(
            executions[0].configuration.as_ref().unwrap()["shared"].as_integer(),
            Some(2)
        );
        // bare execution inherits the plugin configuration
        assert_eq!(
            executions[1].configuration.as_ref().unwrap()["shared"].as_integer(),
            Some(1)
        );
    }

    #[test]
    fn test_report_plugin_version_from_build() {
        let mut model = Descriptor {
            build: Some(BuildSection {
                plugins: vec![Plugin {
                    group_id: Some("g".to_string()),
                    artifact_id: Some("report".to_string()),
                    version: Some("4".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            reporting: Some(Reporting {
                plugins: vec![ReportPlugin {
                    group_id: Some("g".to_string()),
                    artifact_id: Some("report".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        DefaultReportConfigurationExpander.expand(&mut model, &mut problems());
        assert_eq!(
            model.reporting.as_ref().unwrap().plugins[0].version.as_deref(),
            Some("4")
        );
    }

    #[test]
    fn test_reporting_converted_to_site_plugin() {
        let mut model = Descriptor {
            reporting: Some(Reporting {
                output_directory: Some("target/site".to_string()),
                plugins: vec![ReportPlugin {
                    group_id: Some("g".to_string()),
                    artifact_id: Some("report".to_string()),
                    version: Some("4".to_string()),
                    ..Default::default()
                }],
            }),
            ..Default::default()
        };

        DefaultReportingConverter.convert(&mut model, &mut problems());

        let build = model.build.as_ref().unwrap();
        let site = build
            .plugins
            .iter()
            .find(|p| p.artifact_id.as_deref() == Some(SITE_PLUGIN_ARTIFACT_ID))
            .unwrap();
        let config = site.configuration.as_ref().unwrap();
        assert_eq!(config["output-directory"].as_str(), Some("target/site"));
        assert_eq!(config["report-plugins"].as_array().unwrap().len(), 1);
    }
}
