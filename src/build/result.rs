//! Build results and the failure surface.

use std::collections::BTreeMap;
use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::build::problems::Problem;
use crate::core::coordinates;
use crate::core::descriptor::Descriptor;
use crate::core::profile::Profile;
use crate::sources::SourceRef;

/// A descriptor paired with its source and derived identity; the node type
/// of the ancestor lineage and the raw-model cache.
#[derive(Debug, Clone)]
pub struct ModelData {
    /// Where the descriptor came from. `None` for the super-descriptor.
    pub source: Option<SourceRef>,

    pub model: Descriptor,

    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
}

impl ModelData {
    /// Create a node, deriving identity from the descriptor (group and
    /// version fall back to the declared parent).
    pub fn new(source: Option<SourceRef>, model: Descriptor) -> Self {
        let group_id = model.effective_group_id().map(str::to_string);
        let artifact_id = model.artifact_id.clone();
        let version = model.effective_version().map(str::to_string);
        ModelData {
            source,
            model,
            group_id,
            artifact_id,
            version,
        }
    }

    /// Create a node with explicit identity.
    pub fn with_identity(
        source: Option<SourceRef>,
        model: Descriptor,
        group_id: Option<String>,
        artifact_id: Option<String>,
        version: Option<String>,
    ) -> Self {
        ModelData {
            source,
            model,
            group_id,
            artifact_id,
            version,
        }
    }

    /// The printable model id of this node.
    pub fn id(&self) -> String {
        coordinates::model_id(
            self.group_id.as_deref(),
            self.artifact_id.as_deref(),
            self.version.as_deref(),
        )
    }
}

/// The outcome of a successful build (or of phase 1, in two-phase mode).
#[derive(Debug, Default)]
pub struct BuildResult {
    pub(crate) file_model: Option<Descriptor>,
    pub(crate) effective: Option<Descriptor>,

    /// Lineage ids, leaf first, super-descriptor last.
    pub(crate) model_ids: Vec<String>,

    pub(crate) raw_models: BTreeMap<String, Descriptor>,
    pub(crate) active_pom_profiles: BTreeMap<String, Vec<Profile>>,
    pub(crate) active_external_profiles: Vec<Profile>,

    /// Everything collected so far, in collection order.
    pub problems: Vec<Problem>,
}

impl BuildResult {
    pub(crate) fn new() -> Self {
        BuildResult::default()
    }

    /// The descriptor as parsed from the request source.
    pub fn file_model(&self) -> &Descriptor {
        self.file_model
            .as_ref()
            .expect("build result carries a file model")
    }

    /// The raw model of the leaf descriptor.
    pub fn raw_model(&self) -> &Descriptor {
        let id = self.model_ids.first().expect("lineage is never empty");
        &self.raw_models[id]
    }

    /// The raw model recorded for a lineage id.
    pub fn raw_model_by_id(&self, model_id: &str) -> Option<&Descriptor> {
        self.raw_models.get(model_id)
    }

    /// The fully built effective descriptor.
    pub fn effective_model(&self) -> &Descriptor {
        self.effective
            .as_ref()
            .expect("build result carries an effective model")
    }

    /// Lineage ids, leaf first, super-descriptor last.
    pub fn model_ids(&self) -> &[String] {
        &self.model_ids
    }

    /// Profiles from the descriptor itself that were active for a lineage
    /// id.
    pub fn active_pom_profiles(&self, model_id: &str) -> &[Profile] {
        self.active_pom_profiles
            .get(model_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// External profiles that were active for this build.
    pub fn active_external_profiles(&self) -> &[Profile] {
        &self.active_external_profiles
    }
}

/// The build collected blocking problems.
#[derive(Debug, Error, Diagnostic)]
#[error("descriptor build failed: {}", summary(&self.problems))]
#[diagnostic(
    code(capstan::build::failed),
    help("inspect the collected problems for details")
)]
pub struct BuildError {
    pub problems: Vec<Problem>,
}

impl BuildError {
    /// Wrap the accumulated problems of a failed build.
    pub fn new(problems: Vec<Problem>) -> Self {
        BuildError { problems }
    }

    /// The problems collected up to the failure.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Render every problem on its own line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for problem in &self.problems {
            out.push_str(&problem.to_string());
            out.push('\n');
        }
        out
    }
}

fn summary(problems: &[Problem]) -> String {
    use crate::build::problems::Severity;

    let fatals = problems
        .iter()
        .filter(|p| p.severity == Severity::Fatal)
        .count();
    let errors = problems
        .iter()
        .filter(|p| p.severity == Severity::Error)
        .count();
    let first = problems
        .iter()
        .find(|p| p.severity >= Severity::Error)
        .or_else(|| problems.first());

    match first {
        Some(problem) => format!(
            "{} fatal, {} error problem(s); first: {}",
            fatals, errors, problem.message
        ),
        None => "no problems recorded".to_string(),
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BuildResult({}, {} ancestor(s), {} problem(s))",
            self.model_ids.first().map(String::as_str).unwrap_or("?"),
            self.model_ids.len().saturating_sub(1),
            self.problems.len(),
        )
    }
}
