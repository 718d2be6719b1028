//! The descriptor build pipeline.
//!
//! [`DescriptorBuilder`] turns a raw descriptor document into a fully
//! resolved effective descriptor: it reads and normalizes the document,
//! activates profiles, walks the parent chain (locally or through the
//! resolver), assembles inheritance, interpolates expressions, imports
//! dependency management, and validates the result.
//!
//! Phase 1 ends with the effective model assembled; phase 2 applies path
//! translation, management injection, imports, plugin processing, and
//! effective validation. With `two_phase` requests the caller may mutate
//! the effective model between the phases.

pub mod cache;
pub mod problems;
pub mod request;
pub mod result;

mod import;
mod profiles;
mod raw;
mod reader;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::core::coordinates;
use crate::core::descriptor::{Descriptor, Parent, Plugin, AGGREGATOR_PACKAGING};
use crate::core::profile::Profile;
use crate::core::version::VersionSpec;
use crate::resolver::ModelResolver;
use crate::sources::{FileSource, SourceRef};
use crate::steps::interpolate::resolve_expressions;
use crate::steps::{
    DependencyManagementImporter, DependencyManagementInjector, DescriptorParser,
    InheritanceAssembler, InterpolationConfig, Interpolator, LifecycleBindingsInjector,
    Normalizer, PathTranslator, PluginConfigurationExpander, PluginManagementInjector,
    ProfileInjector, ProfileSelector, ReportConfigurationExpander, ReportingConverter,
    SuperDescriptorProvider, UrlNormalizer, Validator,
};

pub use cache::ModelCache;
pub use problems::{Problem, ProblemCollector, Severity, VersionGate};
pub use request::{BuildEvent, BuildListener, BuildRequest, ValidationLevel};
pub use result::{BuildError, BuildResult, ModelData};

use crate::core::profile::ActivationContext;
use reader::ReadConfig;

/// Schema version requested from the super-descriptor provider.
const SUPER_MODEL_VERSION: &str = "4.0.0";

/// The multi-phase descriptor builder.
///
/// Wired from narrow collaborators; every one can be swapped through the
/// `with_*` setters. The builder itself is stateless across requests and
/// may be shared.
pub struct DescriptorBuilder {
    parser: Box<dyn DescriptorParser>,
    validator: Box<dyn Validator>,
    normalizer: Box<dyn Normalizer>,
    interpolator: Box<dyn Interpolator>,
    path_translator: Box<dyn PathTranslator>,
    url_normalizer: Box<dyn UrlNormalizer>,
    super_provider: Box<dyn SuperDescriptorProvider>,
    inheritance_assembler: Box<dyn InheritanceAssembler>,
    profile_selector: Box<dyn ProfileSelector>,
    profile_injector: Box<dyn ProfileInjector>,
    plugin_management_injector: Box<dyn PluginManagementInjector>,
    dependency_management_injector: Box<dyn DependencyManagementInjector>,
    dependency_management_importer: Box<dyn DependencyManagementImporter>,
    lifecycle_bindings_injector: Option<Box<dyn LifecycleBindingsInjector>>,
    plugin_configuration_expander: Box<dyn PluginConfigurationExpander>,
    report_configuration_expander: Box<dyn ReportConfigurationExpander>,
    reporting_converter: Box<dyn ReportingConverter>,
}

impl Default for DescriptorBuilder {
    fn default() -> Self {
        use crate::steps::inherit::DefaultInheritanceAssembler;
        use crate::steps::interpolate::DefaultInterpolator;
        use crate::steps::management::{
            DefaultDependencyManagementImporter, DefaultDependencyManagementInjector,
            DefaultPluginManagementInjector,
        };
        use crate::steps::normalize::DefaultNormalizer;
        use crate::steps::parser::TomlParser;
        use crate::steps::paths::{DefaultPathTranslator, DefaultUrlNormalizer};
        use crate::steps::plugins::{
            DefaultPluginConfigurationExpander, DefaultReportConfigurationExpander,
            DefaultReportingConverter,
        };
        use crate::steps::selector::{DefaultProfileInjector, DefaultProfileSelector};
        use crate::steps::superdescriptor::DefaultSuperDescriptorProvider;
        use crate::steps::validate::DefaultValidator;

        DescriptorBuilder {
            parser: Box::new(TomlParser),
            validator: Box::new(DefaultValidator),
            normalizer: Box::new(DefaultNormalizer),
            interpolator: Box::new(DefaultInterpolator),
            path_translator: Box::new(DefaultPathTranslator),
            url_normalizer: Box::new(DefaultUrlNormalizer),
            super_provider: Box::new(DefaultSuperDescriptorProvider::default()),
            inheritance_assembler: Box::new(DefaultInheritanceAssembler),
            profile_selector: Box::new(DefaultProfileSelector),
            profile_injector: Box::new(DefaultProfileInjector),
            plugin_management_injector: Box::new(DefaultPluginManagementInjector),
            dependency_management_injector: Box::new(DefaultDependencyManagementInjector),
            dependency_management_importer: Box::new(DefaultDependencyManagementImporter),
            lifecycle_bindings_injector: None,
            plugin_configuration_expander: Box::new(DefaultPluginConfigurationExpander),
            report_configuration_expander: Box::new(DefaultReportConfigurationExpander),
            reporting_converter: Box::new(DefaultReportingConverter),
        }
    }
}

impl DescriptorBuilder {
    /// A builder wired with the default collaborators.
    pub fn new() -> Self {
        DescriptorBuilder::default()
    }

    /// Replace the descriptor parser.
    pub fn with_parser(mut self, parser: Box<dyn DescriptorParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the validator.
    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the interpolator.
    pub fn with_interpolator(mut self, interpolator: Box<dyn Interpolator>) -> Self {
        self.interpolator = interpolator;
        self
    }

    /// Replace the profile selector.
    pub fn with_profile_selector(mut self, selector: Box<dyn ProfileSelector>) -> Self {
        self.profile_selector = selector;
        self
    }

    /// Replace the super-descriptor provider.
    pub fn with_super_provider(mut self, provider: Box<dyn SuperDescriptorProvider>) -> Self {
        self.super_provider = provider;
        self
    }

    /// Wire the lifecycle bindings injector used during plugin processing.
    pub fn with_lifecycle_bindings_injector(
        mut self,
        injector: Box<dyn LifecycleBindingsInjector>,
    ) -> Self {
        self.lifecycle_bindings_injector = Some(injector);
        self
    }

    /// Build the effective descriptor for `request`.
    ///
    /// With `two_phase` set on the request, stops after phase 1; resume
    /// with [`build_with_result`](Self::build_with_result).
    pub fn build(&self, request: &mut BuildRequest) -> Result<BuildResult, BuildError> {
        let mut import_ids = Vec::new();
        self.build_internal(request, &mut import_ids)
    }

    /// Complete phase 2 on a phase-1 result.
    pub fn build_with_result(
        &self,
        request: &mut BuildRequest,
        result: BuildResult,
    ) -> Result<BuildResult, BuildError> {
        let mut import_ids = Vec::new();
        self.build_phase_two(request, result, &mut import_ids)
    }

    /// Read and validate just the raw descriptor of a file, without
    /// running the pipeline. Returns the model and all collected problems.
    pub fn read_raw_descriptor(
        &self,
        path: &Path,
        level: ValidationLevel,
        location_tracking: bool,
    ) -> Result<(Descriptor, Vec<Problem>), BuildError> {
        let source: SourceRef = Arc::new(FileSource::new(path));
        let mut problems = ProblemCollector::new(level);
        let config = ReadConfig {
            level,
            location_tracking,
            build_consumer: false,
            cache: None,
            transformer: None,
        };
        let model = self.read_model(&source, &config, &mut problems)?;
        Ok((model, problems.take()))
    }

    pub(crate) fn build_internal(
        &self,
        request: &mut BuildRequest,
        import_ids: &mut Vec<String>,
    ) -> Result<BuildResult, BuildError> {
        let result = self.build_phase_one(request)?;
        if request.two_phase {
            if has_error_problems(&result.problems) {
                return Err(BuildError::new(result.problems));
            }
            return Ok(result);
        }
        self.build_phase_two(request, result, import_ids)
    }

    fn build_phase_one(&self, request: &mut BuildRequest) -> Result<BuildResult, BuildError> {
        let mut result = BuildResult::new();
        let mut problems = ProblemCollector::new(request.validation_level);

        let source = request.source.clone();

        let file_model = {
            let config = ReadConfig::from_request(request);
            self.read_model(&source, &config, &mut problems)?
        };
        problems.set_root_model(&file_model);
        result.file_model = Some(file_model.clone());

        let mut context = self.profile_activation_context(request);
        let external_profiles =
            self.activate_external_profiles(request, &mut context, &mut problems);
        result.active_external_profiles = external_profiles.clone();

        let raw = {
            let config = ReadConfig::from_request(request);
            self.build_raw_model(&source, &config, &mut problems, &file_model)?
        };

        let leaf = ModelData::new(Some(source.clone()), raw);
        let mut lineage = self.walk_lineage(
            leaf,
            request,
            &mut result,
            &mut context,
            &external_profiles,
            &mut problems,
        )?;

        problems.set_source_model(result.raw_model());
        check_plugin_versions(&lineage, request.validation_level, &mut problems);

        // ancestor-to-descendant assembly: super into its child first,
        // ending with a fully inherited leaf
        for i in (0..lineage.len().saturating_sub(1)).rev() {
            let (head, tail) = lineage.split_at_mut(i + 1);
            self.inheritance_assembler
                .assemble(&mut head[i], &tail[0], &mut problems);
        }
        let effective = lineage.remove(0);

        problems.set_source_model(&effective);
        problems.set_root_model(&effective);

        let mut effective = self.interpolate_model(effective, request, &mut problems);
        self.url_normalizer.normalize(&mut effective);

        // the fully interpolated repositories now override earlier ones
        self.configure_resolver(
            request.resolver.as_deref_mut(),
            &effective,
            &mut problems,
            true,
        );

        if let Some(cache) = &request.cache {
            let data = ModelData::new(Some(source.clone()), effective.clone());
            cache.put_raw_by_source(source.as_ref(), &data);
        }
        result.effective = Some(effective);

        if problems.has_fatal_errors() {
            return Err(BuildError::new(problems.take()));
        }
        result.problems = problems.take();
        Ok(result)
    }

    fn build_phase_two(
        &self,
        request: &mut BuildRequest,
        mut result: BuildResult,
        import_ids: &mut Vec<String>,
    ) -> Result<BuildResult, BuildError> {
        let mut problems = ProblemCollector::new(request.validation_level);
        problems.extend(std::mem::take(&mut result.problems));

        let mut model = result
            .effective
            .take()
            .expect("phase 2 requires a phase-1 result with an effective model");
        problems.set_source_model(&model);
        problems.set_root_model(&model);

        let base = model.project_directory().map(Path::to_path_buf);
        self.path_translator.align_to_base(&mut model, base.as_deref());

        self.plugin_management_injector
            .inject_management(&mut model, &mut problems);

        if let Some(listener) = request.listener.as_deref_mut() {
            listener.build_extensions_assembled(BuildEvent {
                model: &mut model,
                problems: &mut problems,
            });
        }

        if request.process_plugins {
            match &self.lifecycle_bindings_injector {
                Some(injector) => injector.inject_lifecycle_bindings(&mut model, &mut problems),
                None => {
                    problems.add(
                        Severity::Fatal,
                        VersionGate::Base,
                        "lifecycle bindings injector is missing",
                        None,
                    );
                    return Err(BuildError::new(problems.take()));
                }
            }
        }

        self.import_dependency_management(&mut model, request, &mut problems, import_ids);

        self.dependency_management_injector
            .inject_management(&mut model, &mut problems);
        self.normalizer.inject_defaults(&mut model, &mut problems);

        if request.process_plugins {
            self.report_configuration_expander
                .expand(&mut model, &mut problems);
            self.reporting_converter.convert(&mut model, &mut problems);
            self.plugin_configuration_expander
                .expand(&mut model, &mut problems);
        }

        self.validator
            .validate_effective_model(&model, request.validation_level, &mut problems);

        result.effective = Some(model);
        let failed = problems.has_errors();
        result.problems = problems.take();
        if failed {
            return Err(BuildError::new(result.problems));
        }
        Ok(result)
    }

    /// Walk the parent chain from the leaf, producing the activated
    /// lineage (leaf first, super-descriptor last).
    fn walk_lineage(
        &self,
        leaf: ModelData,
        request: &mut BuildRequest,
        result: &mut BuildResult,
        context: &mut ActivationContext,
        external_profiles: &[Profile],
        problems: &mut ProblemCollector,
    ) -> Result<Vec<Descriptor>, BuildError> {
        let mut lineage = Vec::new();
        let mut visited: Vec<String> = Vec::new();
        let mut current = leaf;
        let mut is_leaf = true;
        let mut is_super = false;

        loop {
            let model_id = current.id();
            tracing::debug!("lineage node {}", model_id);
            result.model_ids.push(model_id.clone());
            result
                .raw_models
                .insert(model_id.clone(), current.model.clone());
            visited.push(model_id.clone());

            context.project_properties = current.model.properties.clone();
            problems.set_source_model(&current.model);
            let active_profiles = self.profile_selector.active_profiles(
                &current.model.profiles,
                context,
                problems,
            );

            let mut activated = current.model.clone();
            self.normalizer.merge_duplicates(&mut activated, problems);
            for profile in &active_profiles {
                self.profile_injector.inject(&mut activated, profile, problems);
            }
            if is_leaf {
                for profile in external_profiles {
                    self.profile_injector.inject(&mut activated, profile, problems);
                }
            }
            result.active_pom_profiles.insert(model_id, active_profiles);

            if !is_super {
                self.configure_resolver(
                    request.resolver.as_deref_mut(),
                    &activated,
                    problems,
                    false,
                );
            }
            lineage.push(activated);
            if is_super {
                break;
            }

            match self.read_parent(&current, request, problems)? {
                Some(parent_data) => {
                    let parent_id = parent_data.id();
                    if visited.iter().any(|id| *id == parent_id) {
                        let mut message = String::from("The parents form a cycle: ");
                        for id in &visited {
                            message.push_str(id);
                            message.push_str(" -> ");
                        }
                        message.push_str(&parent_id);
                        problems.add(Severity::Fatal, VersionGate::Base, message, None);
                        return Err(BuildError::new(problems.take()));
                    }
                    current = parent_data;
                }
                None => {
                    current = ModelData::new(None, self.super_model());
                    is_super = true;
                }
            }
            if problems.has_fatal_errors() {
                return Err(BuildError::new(problems.take()));
            }
            is_leaf = false;
        }

        Ok(lineage)
    }

    /// Resolve the parent of a lineage node, locally first, then through
    /// the cache and the external resolver.
    fn read_parent(
        &self,
        current: &ModelData,
        request: &mut BuildRequest,
        problems: &mut ProblemCollector,
    ) -> Result<Option<ModelData>, BuildError> {
        let Some(parent) = current.model.parent.clone() else {
            return Ok(None);
        };

        let mut parent_data = self.read_parent_locally(current, &parent, request, problems)?;

        if parent_data.is_none() {
            // raw models that came out of a repository are reusable per
            // coordinates; anything else must be resolved again
            if let (Some(cache), Some(g), Some(a), Some(v)) = (
                request.cache.as_ref(),
                parent.group_id.as_deref(),
                parent.artifact_id.as_deref(),
                parent.version.as_deref(),
            ) {
                if let Some(candidate) = cache.raw_by_coordinates(g, a, v) {
                    let from_repository = candidate
                        .source
                        .as_ref()
                        .is_some_and(|s| s.repository_coordinates().is_some());
                    if from_repository {
                        tracing::debug!("reusing cached raw model for parent {}", candidate.id());
                        parent_data = Some(candidate);
                    }
                }
            }
        }

        let parent_data = match parent_data {
            Some(data) => data,
            None => {
                let data =
                    self.read_parent_externally(&current.model, &parent, request, problems)?;
                if let (Some(cache), Some(g), Some(a), Some(v)) = (
                    request.cache.as_ref(),
                    data.group_id.as_deref(),
                    data.artifact_id.as_deref(),
                    data.version.as_deref(),
                ) {
                    cache.put_raw_by_coordinates(g, a, v, &data);
                }
                data
            }
        };

        let packaging = parent_data.model.packaging_or_default();
        if packaging != AGGREGATOR_PACKAGING {
            problems.add(
                Severity::Error,
                VersionGate::Base,
                format!(
                    "Invalid packaging for parent descriptor {}, must be \"{}\" but is \"{}\"",
                    coordinates::source_hint(&parent_data.model),
                    AGGREGATOR_PACKAGING,
                    packaging
                ),
                parent_data.model.location("packaging").cloned(),
            );
        }

        Ok(Some(parent_data))
    }

    fn read_parent_locally(
        &self,
        current: &ModelData,
        parent: &Parent,
        request: &mut BuildRequest,
        problems: &mut ProblemCollector,
    ) -> Result<Option<ModelData>, BuildError> {
        let candidate_source: Option<SourceRef>;
        let candidate_model: Descriptor;

        if let Some(workspace) = &request.workspace_resolver {
            let (Some(g), Some(a), Some(v)) = (
                parent.group_id.as_deref(),
                parent.artifact_id.as_deref(),
                parent.version.as_deref(),
            ) else {
                return Ok(None);
            };
            match workspace.resolve_raw(g, a, v) {
                Ok(Some(model)) => {
                    candidate_source = model
                        .descriptor_file
                        .as_ref()
                        .map(|path| Arc::new(FileSource::new(path.clone())) as SourceRef);
                    candidate_model = model;
                }
                Ok(None) => return Ok(None),
                Err(e) => {
                    problems.add(
                        Severity::Fatal,
                        VersionGate::Base,
                        e.to_string(),
                        parent.location.clone(),
                    );
                    return Err(BuildError::new(problems.take()));
                }
            }
        } else {
            let relative_path = parent.relative_path_or_default();
            if relative_path.is_empty() {
                return Ok(None);
            }
            let Some(source) = current
                .source
                .as_ref()
                .and_then(|s| s.related(relative_path))
            else {
                return Ok(None);
            };
            let config = ReadConfig::from_request(request);
            let file_model = self.read_model(&source, &config, problems)?;
            candidate_model = self.build_raw_model(&source, &config, problems, &file_model)?;
            candidate_source = Some(source);
        }

        let group_id = candidate_model.effective_group_id().map(str::to_string);
        let artifact_id = candidate_model.artifact_id.clone();
        let version = candidate_model.effective_version().map(str::to_string);

        if group_id.as_deref() != parent.group_id.as_deref()
            || artifact_id.as_deref() != parent.artifact_id.as_deref()
        {
            let mut buffer = String::from("'parent.relative-path'");
            if !problems.is_root(&current.model) {
                buffer.push_str(&format!(
                    " of descriptor {}",
                    coordinates::source_hint(&current.model)
                ));
            }
            buffer.push_str(&format!(
                " points at {}:{} instead of {}:{}, please verify your project structure",
                group_id.as_deref().unwrap_or(coordinates::UNKNOWN_GROUP_ID),
                artifact_id
                    .as_deref()
                    .unwrap_or(coordinates::UNKNOWN_ARTIFACT_ID),
                parent
                    .group_id
                    .as_deref()
                    .unwrap_or(coordinates::UNKNOWN_GROUP_ID),
                parent
                    .artifact_id
                    .as_deref()
                    .unwrap_or(coordinates::UNKNOWN_ARTIFACT_ID),
            ));
            problems.set_source_model(&current.model);
            problems.add(
                Severity::Warning,
                VersionGate::Base,
                buffer,
                parent.location.clone(),
            );
            return Ok(None);
        }

        if let (Some(version), Some(declared)) = (version.as_deref(), parent.version.as_deref()) {
            if version != declared {
                let Ok(spec) = VersionSpec::parse(declared) else {
                    // invalid range: fall back to repository resolution
                    return Ok(None);
                };
                if !spec.has_restrictions() {
                    // literal version skew: fall back to repository resolution
                    tracing::debug!(
                        "local parent version {} does not match declared {}, resolving externally",
                        version,
                        declared
                    );
                    return Ok(None);
                }
                if !spec.contains_str(version) {
                    return Ok(None);
                }
                // a range matched: the child must pin its own version
                self.check_version_constant(&current.model, problems);
            }
        }

        Ok(Some(ModelData::with_identity(
            candidate_source,
            candidate_model,
            group_id,
            artifact_id,
            version,
        )))
    }

    fn read_parent_externally(
        &self,
        child: &Descriptor,
        parent: &Parent,
        request: &mut BuildRequest,
        problems: &mut ProblemCollector,
    ) -> Result<ModelData, BuildError> {
        problems.set_source_model(child);

        let mut parent = parent.clone();
        let declared_version = parent.version.clone();
        let parent_id = coordinates::model_id(
            parent.group_id.as_deref(),
            parent.artifact_id.as_deref(),
            parent.version.as_deref(),
        );

        let Some(resolver) = request.resolver.as_deref_mut() else {
            problems.add(
                Severity::Fatal,
                VersionGate::Base,
                format!(
                    "no model resolver available to resolve parent descriptor {} of descriptor {}",
                    parent_id,
                    coordinates::source_hint(child)
                ),
                parent.location.clone(),
            );
            return Err(BuildError::new(problems.take()));
        };

        let source = match resolver.resolve_parent(&mut parent) {
            Ok(source) => source,
            Err(e) => {
                let mut buffer = String::from("Non-resolvable parent descriptor");
                if !contains_coordinates(
                    &e.message,
                    parent.group_id.as_deref(),
                    parent.artifact_id.as_deref(),
                    parent.version.as_deref(),
                ) {
                    buffer.push(' ');
                    buffer.push_str(&parent_id);
                }
                if !problems.is_root(child) {
                    buffer.push_str(&format!(" for {}", coordinates::descriptor_id(child)));
                }
                buffer.push_str(&format!(": {e}"));
                if child.project_directory().is_some() {
                    if parent.relative_path.as_deref() == Some("") {
                        buffer.push_str(" and 'parent.relative-path' points at no local descriptor");
                    } else {
                        buffer
                            .push_str(" and 'parent.relative-path' points at wrong local descriptor");
                    }
                }
                problems.add(
                    Severity::Fatal,
                    VersionGate::Base,
                    buffer,
                    parent.location.clone(),
                );
                return Err(BuildError::new(problems.take()));
            }
        };

        // ancestors resolved from repositories are read leniently
        let config = ReadConfig::from_request(request).lenient();
        let file_model = self.read_model(&source, &config, problems)?;
        let parent_model = self.build_raw_model(&source, &config, problems, &file_model)?;

        if parent.version != declared_version {
            // the resolver matched a range to a concrete version
            self.check_version_constant(child, problems);
        }

        Ok(ModelData::with_identity(
            Some(source),
            parent_model,
            parent.group_id.clone(),
            parent.artifact_id.clone(),
            parent.version.clone(),
        ))
    }

    // Ranged parent references require the child to declare a literal
    // version of its own.
    fn check_version_constant(&self, child: &Descriptor, problems: &mut ProblemCollector) {
        match &child.version {
            None => problems.add(
                Severity::Fatal,
                VersionGate::V31,
                "Version must be a constant",
                child.location("").cloned(),
            ),
            Some(version) if version.contains("${") => problems.add(
                Severity::Fatal,
                VersionGate::V31,
                "Version must be a constant",
                child.location("version").cloned(),
            ),
            _ => {}
        }
    }

    fn interpolate_model(
        &self,
        model: Descriptor,
        request: &BuildRequest,
        problems: &mut ProblemCollector,
    ) -> Descriptor {
        // activation predicates must survive interpolation unchanged, so
        // they stay evaluable against the original expressions
        let saved_activations = profiles::profile_activations(&model);
        let descriptor_file = model.descriptor_file.clone();
        let model_properties = model.properties.clone();
        let project_directory = model.project_directory().map(Path::to_path_buf);

        let config = InterpolationConfig {
            user_properties: &request.user_properties,
            system_properties: &request.system_properties,
        };
        let mut interpolated =
            self.interpolator
                .interpolate(model, project_directory.as_deref(), &config, problems);

        // the parent version may reference a property defined in the child
        if let Some(parent) = &mut interpolated.parent {
            if let Some(version) = parent.version.clone() {
                if version.contains("${") {
                    let lookup = |name: &str| -> Option<String> {
                        request
                            .user_properties
                            .get(name)
                            .or_else(|| model_properties.get(name))
                            .or_else(|| request.system_properties.get(name))
                            .cloned()
                    };
                    match resolve_expressions(&version, &lookup) {
                        Ok(resolved) => parent.version = Some(resolved),
                        Err(expression) => problems.add(
                            Severity::Error,
                            VersionGate::Base,
                            format!("Failed to interpolate parent version: {expression}"),
                            parent.location.clone(),
                        ),
                    }
                }
            }
        }

        interpolated.descriptor_file = descriptor_file;
        profiles::restore_profile_activations(&mut interpolated, &saved_activations);
        interpolated
    }

    fn configure_resolver(
        &self,
        resolver: Option<&mut (dyn ModelResolver + 'static)>,
        model: &Descriptor,
        problems: &mut ProblemCollector,
        replace: bool,
    ) {
        let Some(resolver) = resolver else { return };
        problems.set_source_model(model);

        for repository in &model.repositories {
            if let Err(e) = resolver.add_repository(repository, replace) {
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    format!(
                        "Invalid repository {}: {}",
                        repository.id.as_deref().unwrap_or("(unnamed)"),
                        e
                    ),
                    repository.location.clone(),
                );
            }
        }
    }

    fn super_model(&self) -> Descriptor {
        self.super_provider.super_descriptor(SUPER_MODEL_VERSION)
    }
}

/// Audit the lineage for plugins that end up with no version anywhere:
/// neither a direct declaration nor a managed default, walking from the
/// super-descriptor down so the first-seen declaration wins.
fn check_plugin_versions(
    lineage: &[Descriptor],
    level: ValidationLevel,
    problems: &mut ProblemCollector,
) {
    if level < ValidationLevel::V20 {
        return;
    }

    let mut plugins: BTreeMap<String, Plugin> = BTreeMap::new();
    let mut versions: BTreeMap<String, Option<String>> = BTreeMap::new();
    let mut managed_versions: BTreeMap<String, String> = BTreeMap::new();

    for model in lineage.iter().rev() {
        let Some(build) = &model.build else { continue };
        for plugin in &build.plugins {
            let key = plugin.key();
            if !versions.contains_key(&key) {
                versions.insert(key.clone(), plugin.version.clone());
                plugins.insert(key, plugin.clone());
            }
        }
        if let Some(management) = &build.plugin_management {
            for plugin in &management.plugins {
                if let Some(version) = &plugin.version {
                    managed_versions
                        .entry(plugin.key())
                        .or_insert_with(|| version.clone());
                }
            }
        }
    }

    for (key, version) in &versions {
        if version.is_none() && !managed_versions.contains_key(key) {
            let location = plugins.get(key).and_then(|p| p.location.clone());
            problems.add(
                Severity::Warning,
                VersionGate::V20,
                format!("'build.plugins.plugin.version' for {key} is missing."),
                location,
            );
        }
    }
}

fn contains_coordinates(
    message: &str,
    group_id: Option<&str>,
    artifact_id: Option<&str>,
    version: Option<&str>,
) -> bool {
    group_id.is_none_or(|g| message.contains(g))
        && artifact_id.is_none_or(|a| message.contains(a))
        && version.is_none_or(|v| message.contains(v))
}

fn has_error_problems(problems: &[Problem]) -> bool {
    problems.iter().any(|p| p.severity >= Severity::Error)
}
