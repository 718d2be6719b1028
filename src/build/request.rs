//! Build request - everything one descriptor build needs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::build::cache::ModelCache;
use crate::build::problems::ProblemCollector;
use crate::core::descriptor::Descriptor;
use crate::core::profile::Profile;
use crate::resolver::{ModelResolver, WorkspaceResolver};
use crate::sources::{FileSource, SourceRef};
use crate::steps::transform::DescriptorTransformer;

/// How thoroughly the pipeline validates, and which gated checks block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ValidationLevel {
    /// Structural sanity only; used for sub-builds of imported descriptors.
    Minimal,
    /// Checks introduced by engine generation 2.0.
    V20,
    /// Checks introduced by engine generation 3.0.
    V30,
    /// Checks introduced by engine generation 3.1.
    V31,
    /// Everything, including checks newer than any released generation.
    #[default]
    Strict,
}

/// Listener for pipeline events.
pub trait BuildListener: Send {
    /// Fired once the effective model has its build extensions assembled,
    /// before plugin processing. The model may be mutated in place. The
    /// problem collector must not be retained beyond the call.
    fn build_extensions_assembled(&mut self, event: BuildEvent<'_>);
}

/// Payload handed to a [`BuildListener`].
pub struct BuildEvent<'a> {
    pub model: &'a mut Descriptor,
    pub problems: &'a mut ProblemCollector,
}

/// A request to build one descriptor.
///
/// Constructed once per build and handed to
/// [`DescriptorBuilder::build`](crate::build::DescriptorBuilder::build) by
/// mutable reference; the resolver inside is reconfigured as the pipeline
/// learns about repositories.
pub struct BuildRequest {
    /// Where the descriptor bytes come from.
    pub source: SourceRef,

    /// Backing file when building from disk. Enables local parent
    /// resolution relative to this path.
    pub descriptor_file: Option<PathBuf>,

    pub validation_level: ValidationLevel,

    /// Stop after phase 1 and let the caller resume with
    /// [`DescriptorBuilder::build_with_result`](crate::build::DescriptorBuilder::build_with_result).
    pub two_phase: bool,

    /// Run plugin processing (lifecycle bindings, configuration expansion,
    /// reporting conversion) during phase 2.
    pub process_plugins: bool,

    /// Track source positions through parsing and merging.
    pub location_tracking: bool,

    /// Merge transformer-enriched document data into the raw model.
    pub build_consumer: bool,

    pub system_properties: BTreeMap<String, String>,
    pub user_properties: BTreeMap<String, String>,

    pub active_profile_ids: Vec<String>,
    pub inactive_profile_ids: Vec<String>,

    /// External profiles supplied with the request.
    pub profiles: Vec<Profile>,

    pub cache: Option<Arc<ModelCache>>,
    pub resolver: Option<Box<dyn ModelResolver>>,
    pub workspace_resolver: Option<Box<dyn WorkspaceResolver>>,
    pub listener: Option<Box<dyn BuildListener>>,
    pub transformer: Option<Box<dyn DescriptorTransformer>>,
}

impl BuildRequest {
    /// Build from a descriptor file on disk.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let source: SourceRef = Arc::new(FileSource::new(path.clone()));
        let mut request = Self::from_source(source);
        request.descriptor_file = Some(path);
        request
    }

    /// Build from an arbitrary source.
    pub fn from_source(source: SourceRef) -> Self {
        BuildRequest {
            source,
            descriptor_file: None,
            validation_level: ValidationLevel::default(),
            two_phase: false,
            process_plugins: false,
            location_tracking: false,
            build_consumer: false,
            system_properties: BTreeMap::new(),
            user_properties: BTreeMap::new(),
            active_profile_ids: Vec::new(),
            inactive_profile_ids: Vec::new(),
            profiles: Vec::new(),
            cache: None,
            resolver: None,
            workspace_resolver: None,
            listener: None,
            transformer: None,
        }
    }

    /// Set the validation level.
    pub fn with_validation_level(mut self, level: ValidationLevel) -> Self {
        self.validation_level = level;
        self
    }

    /// Enable or disable two-phase building.
    pub fn with_two_phase(mut self, two_phase: bool) -> Self {
        self.two_phase = two_phase;
        self
    }

    /// Enable or disable plugin processing.
    pub fn with_process_plugins(mut self, process: bool) -> Self {
        self.process_plugins = process;
        self
    }

    /// Enable or disable location tracking.
    pub fn with_location_tracking(mut self, tracking: bool) -> Self {
        self.location_tracking = tracking;
        self
    }

    /// Attach a model cache shared across builds.
    pub fn with_cache(mut self, cache: Arc<ModelCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach the repository resolver.
    pub fn with_resolver(mut self, resolver: Box<dyn ModelResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Attach the workspace resolver.
    pub fn with_workspace_resolver(mut self, resolver: Box<dyn WorkspaceResolver>) -> Self {
        self.workspace_resolver = Some(resolver);
        self
    }

    /// Attach a build listener.
    pub fn with_listener(mut self, listener: Box<dyn BuildListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// The source's location string.
    pub fn source_location(&self) -> &str {
        self.source.location()
    }
}

impl std::fmt::Debug for BuildRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildRequest")
            .field("source", &self.source.location())
            .field("descriptor_file", &self.descriptor_file)
            .field("validation_level", &self.validation_level)
            .field("two_phase", &self.two_phase)
            .field("process_plugins", &self.process_plugins)
            .field("location_tracking", &self.location_tracking)
            .field("build_consumer", &self.build_consumer)
            .finish_non_exhaustive()
    }
}
