//! Raw model construction and the restricted file-to-raw merge.

use crate::build::problems::{ProblemCollector, Severity, VersionGate};
use crate::build::reader::ReadConfig;
use crate::build::result::{BuildError, ModelData};
use crate::build::DescriptorBuilder;
use crate::core::descriptor::{Dependency, Descriptor};
use crate::core::profile::Profile;
use crate::sources::SourceRef;
use crate::steps::ParseOptions;

impl DescriptorBuilder {
    /// Clone the file model into the raw model, optionally merging the
    /// transformer-enriched re-parse, then validate and cache it.
    pub(crate) fn build_raw_model(
        &self,
        source: &SourceRef,
        config: &ReadConfig<'_>,
        problems: &mut ProblemCollector,
        file_model: &Descriptor,
    ) -> Result<Descriptor, BuildError> {
        let mut raw = file_model.clone();

        // the transform merge only matters when location trackers exist to
        // preserve, so it is gated on tracking as well as the feature flag
        if config.build_consumer
            && config.location_tracking
            && raw.descriptor_file.is_some()
            && config.transformer.is_some()
        {
            match self.read_transformed(source, config) {
                Ok(transformed) => merge_file_to_raw(&mut raw, &transformed),
                Err(message) => {
                    problems.add(Severity::Fatal, VersionGate::V37, message, None);
                }
            }
        }

        self.validator
            .validate_raw_model(&raw, config.level, problems);
        if problems.has_fatal_errors() {
            return Err(BuildError::new(problems.take()));
        }

        let data = ModelData::new(Some(source.clone()), raw.clone());
        if let (Some(cache), Some(g), Some(a), Some(v)) = (
            config.cache,
            data.group_id.as_deref(),
            data.artifact_id.as_deref(),
            data.version.as_deref(),
        ) {
            cache.put_raw_by_coordinates(g, a, v, &data);
        }

        Ok(raw)
    }

    fn read_transformed(
        &self,
        source: &SourceRef,
        config: &ReadConfig<'_>,
    ) -> Result<Descriptor, String> {
        let bytes = source
            .open()
            .map_err(|e| format!("could not re-read {} for transformation: {e:#}", source.location()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| format!("could not re-read {}: invalid encoding", source.location()))?;

        let options = ParseOptions {
            strict: false,
            input_source: None,
            transformer: config.transformer,
        };
        self.parser
            .read(&text, &options)
            .map_err(|e| format!("could not transform {}: {e}", source.location()))
    }
}

/// Merge the transformer-enriched model into the raw clone of the file
/// model, target-dominant so location trackers survive.
///
/// Per-field policy:
///
///   dependencies                        pairwise by index
///   dependency-management dependencies  pairwise by index
///   profiles                            pairwise by index (recursing)
///   plugin dependencies                 pairwise by index
///   plugin-repositories                 replace wholesale
///   repositories, extensions, plugins,
///   executions, exclusions, reporting   skip
///
/// Pairwise merging relies on the raw model being a clone of the file
/// model, so the element counts on both sides always match.
pub(crate) fn merge_file_to_raw(target: &mut Descriptor, source: &Descriptor) {
    fill(&mut target.model_version, &source.model_version);
    fill(&mut target.group_id, &source.group_id);
    fill(&mut target.artifact_id, &source.artifact_id);
    fill(&mut target.version, &source.version);
    fill(&mut target.packaging, &source.packaging);
    fill(&mut target.url, &source.url);

    if let (Some(target_parent), Some(source_parent)) = (&mut target.parent, &source.parent) {
        fill(&mut target_parent.group_id, &source_parent.group_id);
        fill(&mut target_parent.artifact_id, &source_parent.artifact_id);
        fill(&mut target_parent.version, &source_parent.version);
        fill(&mut target_parent.relative_path, &source_parent.relative_path);
    }

    for (key, value) in &source.properties {
        target
            .properties
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }

    merge_dependencies_pairwise(&mut target.dependencies, &source.dependencies);

    if let (Some(target_mgmt), Some(source_mgmt)) = (
        &mut target.dependency_management,
        &source.dependency_management,
    ) {
        merge_dependencies_pairwise(&mut target_mgmt.dependencies, &source_mgmt.dependencies);
    }

    if let (Some(target_build), Some(source_build)) = (&mut target.build, &source.build) {
        for (target_plugin, source_plugin) in target_build
            .plugins
            .iter_mut()
            .zip(&source_build.plugins)
        {
            merge_dependencies_pairwise(&mut target_plugin.dependencies, &source_plugin.dependencies);
        }
    }

    target.plugin_repositories = source.plugin_repositories.clone();

    merge_profiles_pairwise(&mut target.profiles, &source.profiles);
}

fn merge_profiles_pairwise(target: &mut [Profile], source: &[Profile]) {
    for (target_profile, source_profile) in target.iter_mut().zip(source) {
        for (key, value) in &source_profile.properties {
            target_profile
                .properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        merge_dependencies_pairwise(&mut target_profile.dependencies, &source_profile.dependencies);
        if let (Some(target_mgmt), Some(source_mgmt)) = (
            &mut target_profile.dependency_management,
            &source_profile.dependency_management,
        ) {
            merge_dependencies_pairwise(&mut target_mgmt.dependencies, &source_mgmt.dependencies);
        }
        target_profile.plugin_repositories = source_profile.plugin_repositories.clone();
    }
}

fn merge_dependencies_pairwise(target: &mut [Dependency], source: &[Dependency]) {
    for (target_dep, source_dep) in target.iter_mut().zip(source) {
        fill(&mut target_dep.group_id, &source_dep.group_id);
        fill(&mut target_dep.artifact_id, &source_dep.artifact_id);
        fill(&mut target_dep.version, &source_dep.version);
        fill(&mut target_dep.dep_type, &source_dep.dep_type);
        fill(&mut target_dep.classifier, &source_dep.classifier);
        fill(&mut target_dep.scope, &source_dep.scope);
        if target_dep.optional.is_none() {
            target_dep.optional = source_dep.optional;
        }
        // exclusions are skipped: the raw side keeps its own
    }
}

fn fill(target: &mut Option<String>, source: &Option<String>) {
    if target.is_none() {
        target.clone_from(source);
    }
}
