//! Default descriptor parser over TOML documents.
//!
//! Parses `project.toml` text into a [`Descriptor`] tree. Strict mode
//! rejects unknown keys; lenient mode ignores them (and is what the
//! reader falls back to when a strict parse fails). Type mismatches and
//! TOML syntax errors are rejected in both modes.
//!
//! When an input source is supplied, element positions are recorded as
//! [`InputLocation`]s computed from the document spans.

use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use toml_edit::{ImDocument, Item, TableLike};

use crate::core::descriptor::{
    BuildSection, Dependency, DependencyManagement, Descriptor, Exclusion, Execution, Extension,
    Parent, Plugin, PluginManagement, ReportPlugin, ReportSet, Reporting, Repository,
};
use crate::core::location::{InputLocation, InputSource};
use crate::core::profile::{
    Activation, FileActivation, OsActivation, Profile, PropertyActivation,
};
use crate::steps::{DescriptorParser, ParseError, ParseOptions};

/// Span-aware TOML descriptor parser.
#[derive(Debug, Default)]
pub struct TomlParser;

impl DescriptorParser for TomlParser {
    fn read(&self, text: &str, options: &ParseOptions<'_>) -> Result<Descriptor, ParseError> {
        let doc = ImDocument::parse(text).map_err(|e| syntax_error(text, &e))?;

        let walker = Walker {
            strict: options.strict,
            source: options.input_source.clone(),
            lines: LineIndex::new(text),
        };

        let mut model = walker.descriptor(doc.as_table())?;

        if let Some(transformer) = options.transformer {
            transformer
                .transform(&mut model)
                .map_err(|e| ParseError::new(format!("transformer failed: {e:#}")))?;
        }

        Ok(model)
    }
}

fn syntax_error(text: &str, error: &toml_edit::TomlError) -> ParseError {
    let message: String = error
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with('|') && !line.starts_with('^')
        })
        .collect::<Vec<_>>()
        .join("; ");

    match error.span() {
        Some(span) => {
            let (line, column) = LineIndex::new(text).locate(span.start);
            ParseError::at(message, line, column)
        }
        None => ParseError::new(message),
    }
}

/// Offsets of line starts, for span-to-position conversion.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                starts.push(offset + 1);
            }
        }
        LineIndex { starts }
    }

    /// 1-based (line, column) of a byte offset.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        (line + 1, offset - self.starts[line] + 1)
    }
}

fn item_span(item: &Item) -> Option<Range<usize>> {
    match item {
        Item::Value(value) => value.span(),
        Item::Table(table) => table.span(),
        Item::ArrayOfTables(tables) => tables.span(),
        Item::None => None,
    }
}

struct Walker {
    strict: bool,
    source: Option<Arc<InputSource>>,
    lines: LineIndex,
}

impl Walker {
    fn location(&self, span: Option<Range<usize>>) -> Option<InputLocation> {
        let source = self.source.as_ref()?;
        let span = span?;
        let (line, column) = self.lines.locate(span.start);
        Some(InputLocation::new(line, column, Some(Arc::clone(source))))
    }

    fn error(&self, span: Option<Range<usize>>, message: impl Into<String>) -> ParseError {
        match span {
            Some(span) => {
                let (line, column) = self.lines.locate(span.start);
                ParseError::at(message, line, column)
            }
            None => ParseError::new(message),
        }
    }

    fn check_keys(
        &self,
        table: &dyn TableLike,
        known: &[&str],
        context: &str,
    ) -> Result<(), ParseError> {
        for (key, item) in table.iter() {
            if !known.contains(&key) {
                if self.strict {
                    return Err(self.error(
                        item_span(item),
                        format!("unexpected key `{key}` in {context}"),
                    ));
                }
                tracing::debug!("ignoring unknown key `{}` in {}", key, context);
            }
        }
        Ok(())
    }

    fn opt_string(
        &self,
        table: &dyn TableLike,
        key: &str,
        context: &str,
    ) -> Result<Option<String>, ParseError> {
        match table.get(key) {
            None => Ok(None),
            Some(item) => match item.as_str() {
                Some(value) => Ok(Some(value.to_string())),
                None => Err(self.error(
                    item_span(item),
                    format!("expected a string for `{context}.{key}`"),
                )),
            },
        }
    }

    fn opt_bool(
        &self,
        table: &dyn TableLike,
        key: &str,
        context: &str,
    ) -> Result<Option<bool>, ParseError> {
        match table.get(key) {
            None => Ok(None),
            Some(item) => match item.as_bool() {
                Some(value) => Ok(Some(value)),
                None => Err(self.error(
                    item_span(item),
                    format!("expected a boolean for `{context}.{key}`"),
                )),
            },
        }
    }

    fn string_array(
        &self,
        table: &dyn TableLike,
        key: &str,
        context: &str,
    ) -> Result<Vec<String>, ParseError> {
        let Some(item) = table.get(key) else {
            return Ok(Vec::new());
        };
        let Some(array) = item.as_array() else {
            return Err(self.error(
                item_span(item),
                format!("expected an array of strings for `{context}.{key}`"),
            ));
        };
        let mut out = Vec::new();
        for value in array.iter() {
            match value.as_str() {
                Some(s) => out.push(s.to_string()),
                None => {
                    return Err(self.error(
                        value.span(),
                        format!("expected a string element in `{context}.{key}`"),
                    ))
                }
            }
        }
        Ok(out)
    }

    fn opt_table<'i>(
        &self,
        table: &'i dyn TableLike,
        key: &str,
        context: &str,
    ) -> Result<Option<(&'i dyn TableLike, Option<Range<usize>>)>, ParseError> {
        match table.get(key) {
            None => Ok(None),
            Some(item) => match item.as_table_like() {
                Some(inner) => Ok(Some((inner, item_span(item)))),
                None => Err(self.error(
                    item_span(item),
                    format!("expected a table for `{context}.{key}`"),
                )),
            },
        }
    }

    /// Entries of an `[[x]]` array, accepting both array-of-tables and
    /// arrays of inline tables.
    fn table_entries<'i>(
        &self,
        table: &'i dyn TableLike,
        key: &str,
        context: &str,
    ) -> Result<Vec<(&'i dyn TableLike, Option<Range<usize>>)>, ParseError> {
        let Some(item) = table.get(key) else {
            return Ok(Vec::new());
        };
        match item {
            Item::ArrayOfTables(tables) => Ok(tables
                .iter()
                .map(|t| (t as &dyn TableLike, t.span()))
                .collect()),
            Item::Value(value) => {
                let Some(array) = value.as_array() else {
                    return Err(self.error(
                        value.span(),
                        format!("expected an array of tables for `{context}.{key}`"),
                    ));
                };
                let mut out = Vec::new();
                for element in array.iter() {
                    match element.as_inline_table() {
                        Some(t) => out.push((t as &dyn TableLike, element.span())),
                        None => {
                            return Err(self.error(
                                element.span(),
                                format!("expected a table element in `{context}.{key}`"),
                            ))
                        }
                    }
                }
                Ok(out)
            }
            _ => Err(self.error(
                item_span(item),
                format!("expected an array of tables for `{context}.{key}`"),
            )),
        }
    }

    fn properties(
        &self,
        table: &dyn TableLike,
        context: &str,
    ) -> Result<BTreeMap<String, String>, ParseError> {
        let mut out = BTreeMap::new();
        for (key, item) in table.iter() {
            let value = match item {
                Item::Value(v) => match v {
                    toml_edit::Value::String(s) => s.value().clone(),
                    toml_edit::Value::Integer(i) => i.value().to_string(),
                    toml_edit::Value::Float(f) => f.value().to_string(),
                    toml_edit::Value::Boolean(b) => b.value().to_string(),
                    _ => {
                        return Err(self.error(
                            v.span(),
                            format!("expected a scalar value for `{context}.{key}`"),
                        ))
                    }
                },
                _ => {
                    return Err(self.error(
                        item_span(item),
                        format!("expected a scalar value for `{context}.{key}`"),
                    ))
                }
            };
            out.insert(key.to_string(), value);
        }
        Ok(out)
    }

    fn configuration(
        &self,
        table: &dyn TableLike,
        key: &str,
        context: &str,
    ) -> Result<Option<toml::Table>, ParseError> {
        Ok(self
            .opt_table(table, key, context)?
            .map(|(t, _)| convert_table(t)))
    }

    fn descriptor(&self, root: &dyn TableLike) -> Result<Descriptor, ParseError> {
        const KNOWN: &[&str] = &[
            "model-version",
            "group-id",
            "artifact-id",
            "version",
            "packaging",
            "url",
            "parent",
            "properties",
            "dependencies",
            "dependency-management",
            "build",
            "reporting",
            "repositories",
            "plugin-repositories",
            "profiles",
        ];
        self.check_keys(root, KNOWN, "descriptor")?;

        let mut model = Descriptor {
            model_version: self.opt_string(root, "model-version", "descriptor")?,
            group_id: self.opt_string(root, "group-id", "descriptor")?,
            artifact_id: self.opt_string(root, "artifact-id", "descriptor")?,
            version: self.opt_string(root, "version", "descriptor")?,
            packaging: self.opt_string(root, "packaging", "descriptor")?,
            url: self.opt_string(root, "url", "descriptor")?,
            ..Default::default()
        };

        if self.source.is_some() {
            for field in [
                "model-version",
                "group-id",
                "artifact-id",
                "version",
                "packaging",
                "url",
            ] {
                if let Some(item) = root.get(field) {
                    if let Some(location) = self.location(item_span(item)) {
                        model.set_location(field, location);
                    }
                }
            }
            model.set_location("", InputLocation::new(1, 1, self.source.clone()));
        }

        if let Some((table, span)) = self.opt_table(root, "parent", "descriptor")? {
            model.parent = Some(self.parent(table, span)?);
        }
        if let Some((table, _)) = self.opt_table(root, "properties", "descriptor")? {
            model.properties = self.properties(table, "properties")?;
        }
        for (table, span) in self.table_entries(root, "dependencies", "descriptor")? {
            model
                .dependencies
                .push(self.dependency(table, span, "dependencies")?);
        }
        if let Some((table, _)) = self.opt_table(root, "dependency-management", "descriptor")? {
            model.dependency_management =
                Some(self.dependency_management(table, "dependency-management")?);
        }
        if let Some((table, _)) = self.opt_table(root, "build", "descriptor")? {
            model.build = Some(self.build_section(table, "build")?);
        }
        if let Some((table, _)) = self.opt_table(root, "reporting", "descriptor")? {
            model.reporting = Some(self.reporting(table, "reporting")?);
        }
        for (table, span) in self.table_entries(root, "repositories", "descriptor")? {
            model
                .repositories
                .push(self.repository(table, span, "repositories")?);
        }
        for (table, span) in self.table_entries(root, "plugin-repositories", "descriptor")? {
            model
                .plugin_repositories
                .push(self.repository(table, span, "plugin-repositories")?);
        }
        for (table, _) in self.table_entries(root, "profiles", "descriptor")? {
            model.profiles.push(self.profile(table)?);
        }

        Ok(model)
    }

    fn parent(
        &self,
        table: &dyn TableLike,
        span: Option<Range<usize>>,
    ) -> Result<Parent, ParseError> {
        const KNOWN: &[&str] = &["group-id", "artifact-id", "version", "relative-path"];
        self.check_keys(table, KNOWN, "parent")?;

        Ok(Parent {
            group_id: self.opt_string(table, "group-id", "parent")?,
            artifact_id: self.opt_string(table, "artifact-id", "parent")?,
            version: self.opt_string(table, "version", "parent")?,
            relative_path: self.opt_string(table, "relative-path", "parent")?,
            location: self.location(span),
        })
    }

    fn dependency(
        &self,
        table: &dyn TableLike,
        span: Option<Range<usize>>,
        context: &str,
    ) -> Result<Dependency, ParseError> {
        const KNOWN: &[&str] = &[
            "group-id",
            "artifact-id",
            "version",
            "type",
            "classifier",
            "scope",
            "optional",
            "exclusions",
        ];
        self.check_keys(table, KNOWN, context)?;

        let mut dependency = Dependency {
            group_id: self.opt_string(table, "group-id", context)?,
            artifact_id: self.opt_string(table, "artifact-id", context)?,
            version: self.opt_string(table, "version", context)?,
            dep_type: self.opt_string(table, "type", context)?,
            classifier: self.opt_string(table, "classifier", context)?,
            scope: self.opt_string(table, "scope", context)?,
            optional: self.opt_bool(table, "optional", context)?,
            location: self.location(span),
            ..Default::default()
        };
        for (exclusion, _) in self.table_entries(table, "exclusions", context)? {
            self.check_keys(exclusion, &["group-id", "artifact-id"], "exclusions")?;
            dependency.exclusions.push(Exclusion {
                group_id: self.opt_string(exclusion, "group-id", "exclusions")?,
                artifact_id: self.opt_string(exclusion, "artifact-id", "exclusions")?,
            });
        }
        Ok(dependency)
    }

    fn dependency_management(
        &self,
        table: &dyn TableLike,
        context: &str,
    ) -> Result<DependencyManagement, ParseError> {
        self.check_keys(table, &["dependencies"], context)?;
        let mut management = DependencyManagement::default();
        for (entry, span) in self.table_entries(table, "dependencies", context)? {
            management
                .dependencies
                .push(self.dependency(entry, span, context)?);
        }
        Ok(management)
    }

    fn build_section(
        &self,
        table: &dyn TableLike,
        context: &str,
    ) -> Result<BuildSection, ParseError> {
        const KNOWN: &[&str] = &[
            "directory",
            "source-directory",
            "test-source-directory",
            "output-directory",
            "final-name",
            "extensions",
            "plugins",
            "plugin-management",
        ];
        self.check_keys(table, KNOWN, context)?;

        let mut build = BuildSection {
            directory: self.opt_string(table, "directory", context)?,
            source_directory: self.opt_string(table, "source-directory", context)?,
            test_source_directory: self.opt_string(table, "test-source-directory", context)?,
            output_directory: self.opt_string(table, "output-directory", context)?,
            final_name: self.opt_string(table, "final-name", context)?,
            ..Default::default()
        };
        for (entry, _) in self.table_entries(table, "extensions", context)? {
            self.check_keys(entry, &["group-id", "artifact-id", "version"], "extensions")?;
            build.extensions.push(Extension {
                group_id: self.opt_string(entry, "group-id", "extensions")?,
                artifact_id: self.opt_string(entry, "artifact-id", "extensions")?,
                version: self.opt_string(entry, "version", "extensions")?,
            });
        }
        for (entry, span) in self.table_entries(table, "plugins", context)? {
            build.plugins.push(self.plugin(entry, span, "plugins")?);
        }
        if let Some((entry, _)) = self.opt_table(table, "plugin-management", context)? {
            self.check_keys(entry, &["plugins"], "plugin-management")?;
            let mut management = PluginManagement::default();
            for (plugin, span) in self.table_entries(entry, "plugins", "plugin-management")? {
                management
                    .plugins
                    .push(self.plugin(plugin, span, "plugin-management.plugins")?);
            }
            build.plugin_management = Some(management);
        }
        Ok(build)
    }

    fn plugin(
        &self,
        table: &dyn TableLike,
        span: Option<Range<usize>>,
        context: &str,
    ) -> Result<Plugin, ParseError> {
        const KNOWN: &[&str] = &[
            "group-id",
            "artifact-id",
            "version",
            "extensions",
            "configuration",
            "dependencies",
            "executions",
        ];
        self.check_keys(table, KNOWN, context)?;

        let mut plugin = Plugin {
            group_id: self.opt_string(table, "group-id", context)?,
            artifact_id: self.opt_string(table, "artifact-id", context)?,
            version: self.opt_string(table, "version", context)?,
            extensions: self.opt_bool(table, "extensions", context)?,
            configuration: self.configuration(table, "configuration", context)?,
            location: self.location(span),
            ..Default::default()
        };
        for (entry, dep_span) in self.table_entries(table, "dependencies", context)? {
            plugin
                .dependencies
                .push(self.dependency(entry, dep_span, "plugin dependencies")?);
        }
        for (entry, _) in self.table_entries(table, "executions", context)? {
            self.check_keys(entry, &["id", "phase", "goals", "configuration"], "executions")?;
            plugin.executions.push(Execution {
                id: self.opt_string(entry, "id", "executions")?,
                phase: self.opt_string(entry, "phase", "executions")?,
                goals: self.string_array(entry, "goals", "executions")?,
                configuration: self.configuration(entry, "configuration", "executions")?,
            });
        }
        Ok(plugin)
    }

    fn repository(
        &self,
        table: &dyn TableLike,
        span: Option<Range<usize>>,
        context: &str,
    ) -> Result<Repository, ParseError> {
        self.check_keys(table, &["id", "name", "url"], context)?;
        Ok(Repository {
            id: self.opt_string(table, "id", context)?,
            name: self.opt_string(table, "name", context)?,
            url: self.opt_string(table, "url", context)?,
            location: self.location(span),
        })
    }

    fn reporting(&self, table: &dyn TableLike, context: &str) -> Result<Reporting, ParseError> {
        self.check_keys(table, &["output-directory", "plugins"], context)?;
        let mut reporting = Reporting {
            output_directory: self.opt_string(table, "output-directory", context)?,
            ..Default::default()
        };
        for (entry, _) in self.table_entries(table, "plugins", context)? {
            const KNOWN: &[&str] = &[
                "group-id",
                "artifact-id",
                "version",
                "configuration",
                "report-sets",
            ];
            self.check_keys(entry, KNOWN, "reporting.plugins")?;
            let mut plugin = ReportPlugin {
                group_id: self.opt_string(entry, "group-id", "reporting.plugins")?,
                artifact_id: self.opt_string(entry, "artifact-id", "reporting.plugins")?,
                version: self.opt_string(entry, "version", "reporting.plugins")?,
                configuration: self.configuration(entry, "configuration", "reporting.plugins")?,
                ..Default::default()
            };
            for (set, _) in self.table_entries(entry, "report-sets", "reporting.plugins")? {
                self.check_keys(set, &["id", "reports", "configuration"], "report-sets")?;
                plugin.report_sets.push(ReportSet {
                    id: self.opt_string(set, "id", "report-sets")?,
                    reports: self.string_array(set, "reports", "report-sets")?,
                    configuration: self.configuration(set, "configuration", "report-sets")?,
                });
            }
            reporting.plugins.push(plugin);
        }
        Ok(reporting)
    }

    fn profile(&self, table: &dyn TableLike) -> Result<Profile, ParseError> {
        const KNOWN: &[&str] = &[
            "id",
            "activation",
            "properties",
            "dependencies",
            "dependency-management",
            "build",
            "reporting",
            "repositories",
            "plugin-repositories",
        ];
        self.check_keys(table, KNOWN, "profiles")?;

        let mut profile = Profile {
            id: self
                .opt_string(table, "id", "profiles")?
                .unwrap_or_default(),
            ..Default::default()
        };
        if let Some((activation, _)) = self.opt_table(table, "activation", "profiles")? {
            profile.activation = Some(self.activation(activation)?);
        }
        if let Some((properties, _)) = self.opt_table(table, "properties", "profiles")? {
            profile.properties = self.properties(properties, "profile properties")?;
        }
        for (entry, span) in self.table_entries(table, "dependencies", "profiles")? {
            profile
                .dependencies
                .push(self.dependency(entry, span, "profile dependencies")?);
        }
        if let Some((entry, _)) = self.opt_table(table, "dependency-management", "profiles")? {
            profile.dependency_management =
                Some(self.dependency_management(entry, "profile dependency-management")?);
        }
        if let Some((entry, _)) = self.opt_table(table, "build", "profiles")? {
            profile.build = Some(self.build_section(entry, "profile build")?);
        }
        if let Some((entry, _)) = self.opt_table(table, "reporting", "profiles")? {
            profile.reporting = Some(self.reporting(entry, "profile reporting")?);
        }
        for (entry, span) in self.table_entries(table, "repositories", "profiles")? {
            profile
                .repositories
                .push(self.repository(entry, span, "profile repositories")?);
        }
        for (entry, span) in self.table_entries(table, "plugin-repositories", "profiles")? {
            profile
                .plugin_repositories
                .push(self.repository(entry, span, "profile plugin-repositories")?);
        }
        Ok(profile)
    }

    fn activation(&self, table: &dyn TableLike) -> Result<Activation, ParseError> {
        const KNOWN: &[&str] = &["active-by-default", "toolchain", "os", "property", "file"];
        self.check_keys(table, KNOWN, "activation")?;

        let mut activation = Activation {
            active_by_default: self
                .opt_bool(table, "active-by-default", "activation")?
                .unwrap_or(false),
            toolchain: self.opt_string(table, "toolchain", "activation")?,
            ..Default::default()
        };
        if let Some((os, _)) = self.opt_table(table, "os", "activation")? {
            self.check_keys(os, &["name", "family", "arch", "version"], "activation.os")?;
            activation.os = Some(OsActivation {
                name: self.opt_string(os, "name", "activation.os")?,
                family: self.opt_string(os, "family", "activation.os")?,
                arch: self.opt_string(os, "arch", "activation.os")?,
                version: self.opt_string(os, "version", "activation.os")?,
            });
        }
        if let Some((property, span)) = self.opt_table(table, "property", "activation")? {
            self.check_keys(property, &["name", "value"], "activation.property")?;
            let name = self
                .opt_string(property, "name", "activation.property")?
                .ok_or_else(|| {
                    self.error(span, "activation property requires a `name`")
                })?;
            activation.property = Some(PropertyActivation {
                name,
                value: self.opt_string(property, "value", "activation.property")?,
            });
        }
        if let Some((file, _)) = self.opt_table(table, "file", "activation")? {
            self.check_keys(file, &["exists", "missing"], "activation.file")?;
            activation.file = Some(FileActivation {
                exists: self.opt_string(file, "exists", "activation.file")?,
                missing: self.opt_string(file, "missing", "activation.file")?,
            });
        }
        Ok(activation)
    }
}

fn convert_table(table: &dyn TableLike) -> toml::Table {
    let mut out = toml::Table::new();
    for (key, item) in table.iter() {
        if let Some(value) = convert_item(item) {
            out.insert(key.to_string(), value);
        }
    }
    out
}

fn convert_item(item: &Item) -> Option<toml::Value> {
    match item {
        Item::Value(value) => Some(convert_value(value)),
        Item::Table(table) => Some(toml::Value::Table(convert_table(table))),
        Item::ArrayOfTables(tables) => Some(toml::Value::Array(
            tables
                .iter()
                .map(|t| toml::Value::Table(convert_table(t)))
                .collect(),
        )),
        Item::None => None,
    }
}

fn convert_value(value: &toml_edit::Value) -> toml::Value {
    use toml_edit::Value;

    match value {
        Value::String(s) => toml::Value::String(s.value().clone()),
        Value::Integer(i) => toml::Value::Integer(*i.value()),
        Value::Float(f) => toml::Value::Float(*f.value()),
        Value::Boolean(b) => toml::Value::Boolean(*b.value()),
        Value::Datetime(d) => toml::Value::String(d.value().to_string()),
        Value::Array(array) => toml::Value::Array(array.iter().map(convert_value).collect()),
        Value::InlineTable(table) => toml::Value::Table(convert_table(table)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str, strict: bool) -> Result<Descriptor, ParseError> {
        let options = if strict {
            ParseOptions::strict()
        } else {
            ParseOptions::lenient()
        };
        TomlParser.read(text, &options)
    }

    #[test]
    fn test_parse_minimal() {
        let model = parse(
            r#"
group-id = "g"
artifact-id = "a"
version = "1"
"#,
            true,
        )
        .unwrap();
        assert_eq!(model.group_id.as_deref(), Some("g"));
        assert_eq!(model.artifact_id.as_deref(), Some("a"));
        assert_eq!(model.version.as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_parent_and_dependencies() {
        let model = parse(
            r#"
artifact-id = "child"

[parent]
group-id = "pg"
artifact-id = "parent"
version = "1"
relative-path = "../project.toml"

[[dependencies]]
group-id = "dg"
artifact-id = "da"
version = "2"
scope = "compile"

[[dependencies.exclusions]]
group-id = "xg"
artifact-id = "xa"
"#,
            true,
        )
        .unwrap();

        let parent = model.parent.as_ref().unwrap();
        assert_eq!(parent.group_id.as_deref(), Some("pg"));
        assert_eq!(parent.relative_path.as_deref(), Some("../project.toml"));

        assert_eq!(model.dependencies.len(), 1);
        assert_eq!(model.dependencies[0].exclusions.len(), 1);
    }

    #[test]
    fn test_unknown_key_strict_vs_lenient() {
        let text = r#"
artifact-id = "a"
unexpected = "value"
"#;
        let err = parse(text, true).unwrap_err();
        assert!(err.to_string().contains("unexpected key `unexpected`"));
        assert!(err.position.is_some());

        let model = parse(text, false).unwrap();
        assert_eq!(model.artifact_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_type_mismatch_fails_even_lenient() {
        let text = r#"
artifact-id = 42
"#;
        assert!(parse(text, false).is_err());
    }

    #[test]
    fn test_syntax_error_has_position() {
        let err = parse("artifact-id = ", true).unwrap_err();
        assert!(err.position.is_some());
    }

    #[test]
    fn test_parse_plugins_and_configuration() {
        let model = parse(
            r#"
artifact-id = "a"

[[build.plugins]]
group-id = "pg"
artifact-id = "plug"
version = "1"

[build.plugins.configuration]
threads = 4
flags = ["-x", "-y"]

[[build.plugins.executions]]
id = "run"
phase = "compile"
goals = ["run"]
"#,
            true,
        )
        .unwrap();

        let build = model.build.as_ref().unwrap();
        let plugin = &build.plugins[0];
        assert_eq!(plugin.key(), "pg:plug");
        let config = plugin.configuration.as_ref().unwrap();
        assert_eq!(config["threads"].as_integer(), Some(4));
        assert_eq!(plugin.executions[0].goals, vec!["run".to_string()]);
    }

    #[test]
    fn test_parse_profiles() {
        let model = parse(
            r#"
artifact-id = "a"

[[profiles]]
id = "ci"

[profiles.activation]
active-by-default = false

[profiles.activation.property]
name = "env.CI"
value = "true"

[profiles.properties]
mode = "ci"
"#,
            true,
        )
        .unwrap();

        let profile = &model.profiles[0];
        assert_eq!(profile.id, "ci");
        let activation = profile.activation.as_ref().unwrap();
        assert_eq!(activation.property.as_ref().unwrap().name, "env.CI");
        assert_eq!(profile.properties["mode"], "ci");
    }

    #[test]
    fn test_location_tracking() {
        let source = Arc::new(InputSource::new("mem:test"));
        let options = ParseOptions {
            strict: true,
            input_source: Some(Arc::clone(&source)),
            transformer: None,
        };
        let model = TomlParser
            .read(
                "artifact-id = \"a\"\nversion = \"1\"\n",
                &options,
            )
            .unwrap();

        let location = model.location("version").unwrap();
        assert_eq!(location.line, 2);
        assert!(model.location("artifact-id").is_some());
    }

    #[test]
    fn test_properties_coerce_scalars() {
        let model = parse(
            r#"
artifact-id = "a"

[properties]
text = "v"
number = 7
flag = true
"#,
            true,
        )
        .unwrap();
        assert_eq!(model.properties["text"], "v");
        assert_eq!(model.properties["number"], "7");
        assert_eq!(model.properties["flag"], "true");
    }
}
