//! Problem collection for the build pipeline.
//!
//! Problems are only ever appended. FATAL problems abort the running phase
//! immediately; ERROR problems abort at the next phase boundary; WARNING is
//! informational. Each problem carries the version gate at which its check
//! became part of the engine - checks newer than the request's validation
//! level are demoted to warnings instead of blocking old projects.

use std::fmt;

use crate::build::request::ValidationLevel;
use crate::core::coordinates;
use crate::core::descriptor::Descriptor;
use crate::core::location::InputLocation;

/// How bad a problem is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

/// Engine version at which a check became blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VersionGate {
    /// Always blocking.
    Base,
    V20,
    V30,
    V31,
    V37,
}

impl VersionGate {
    fn rank(self) -> u32 {
        match self {
            VersionGate::Base => 0,
            VersionGate::V20 => 20,
            VersionGate::V30 => 30,
            VersionGate::V31 => 31,
            VersionGate::V37 => 37,
        }
    }
}

impl ValidationLevel {
    pub(crate) fn rank(self) -> u32 {
        match self {
            ValidationLevel::Minimal => 0,
            ValidationLevel::V20 => 20,
            ValidationLevel::V30 => 30,
            ValidationLevel::V31 => 31,
            ValidationLevel::Strict => 40,
        }
    }

    /// Whether problems gated at `gate` are blocking at this level.
    pub fn admits(self, gate: VersionGate) -> bool {
        gate.rank() <= self.rank()
    }
}

/// One collected diagnostic.
#[derive(Debug, Clone)]
pub struct Problem {
    pub severity: Severity,
    pub gate: VersionGate,

    /// Hint naming the descriptor or source the problem belongs to.
    pub source: Option<String>,

    pub location: Option<InputLocation>,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " @ {}", source)?;
        }
        if let Some(location) = &self.location {
            write!(f, " ({})", location)?;
        }
        Ok(())
    }
}

/// Accumulates problems for one build, tracking the current source context.
#[derive(Debug)]
pub struct ProblemCollector {
    level: ValidationLevel,
    problems: Vec<Problem>,
    source_hint: Option<String>,
    root_id: Option<String>,
    error_count: usize,
    fatal_count: usize,
}

impl ProblemCollector {
    /// Create a collector demoting problems gated above `level`.
    pub fn new(level: ValidationLevel) -> Self {
        ProblemCollector {
            level,
            problems: Vec::new(),
            source_hint: None,
            root_id: None,
            error_count: 0,
            fatal_count: 0,
        }
    }

    /// Set the source context for subsequently added problems.
    pub fn set_source(&mut self, hint: impl Into<String>) {
        self.source_hint = Some(hint.into());
    }

    /// Set the source context from a descriptor.
    pub fn set_source_model(&mut self, model: &Descriptor) {
        self.source_hint = Some(coordinates::source_hint(model));
    }

    /// Remember the root descriptor of the build, for "of descriptor X"
    /// phrasing on problems in ancestors.
    pub fn set_root_model(&mut self, model: &Descriptor) {
        self.root_id = Some(coordinates::descriptor_id(model));
    }

    /// Whether the given descriptor is the root of this build.
    pub fn is_root(&self, model: &Descriptor) -> bool {
        self.root_id.as_deref() == Some(coordinates::descriptor_id(model).as_str())
    }

    /// Record a problem. The severity is demoted to a warning when the
    /// problem's gate is newer than the request's validation level.
    pub fn add(
        &mut self,
        severity: Severity,
        gate: VersionGate,
        message: impl Into<String>,
        location: Option<InputLocation>,
    ) {
        let severity = if self.level.admits(gate) {
            severity
        } else {
            Severity::Warning
        };
        self.push(Problem {
            severity,
            gate,
            source: self.source_hint.clone(),
            location,
            message: message.into(),
        });
    }

    /// Append already-collected problems (e.g. from a sub-build), without
    /// re-applying demotion.
    pub fn extend(&mut self, problems: impl IntoIterator<Item = Problem>) {
        for problem in problems {
            self.push(problem);
        }
    }

    fn push(&mut self, problem: Problem) {
        match problem.severity {
            Severity::Fatal => self.fatal_count += 1,
            Severity::Error => self.error_count += 1,
            Severity::Warning => {}
        }
        self.problems.push(problem);
    }

    /// Whether any ERROR or FATAL problem has been collected.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || self.fatal_count > 0
    }

    /// Whether any FATAL problem has been collected.
    pub fn has_fatal_errors(&self) -> bool {
        self.fatal_count > 0
    }

    /// The problems collected so far.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Move the collected problems out, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Problem> {
        self.error_count = 0;
        self.fatal_count = 0;
        std::mem::take(&mut self.problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_counting() {
        let mut collector = ProblemCollector::new(ValidationLevel::Strict);
        assert!(!collector.has_errors());

        collector.add(Severity::Warning, VersionGate::Base, "w", None);
        assert!(!collector.has_errors());

        collector.add(Severity::Error, VersionGate::Base, "e", None);
        assert!(collector.has_errors());
        assert!(!collector.has_fatal_errors());

        collector.add(Severity::Fatal, VersionGate::Base, "f", None);
        assert!(collector.has_fatal_errors());
    }

    #[test]
    fn test_gate_demotion() {
        let mut collector = ProblemCollector::new(ValidationLevel::V20);
        collector.add(Severity::Fatal, VersionGate::V31, "too new", None);

        assert!(!collector.has_errors());
        assert_eq!(collector.problems()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_gate_admitted_at_level() {
        let mut collector = ProblemCollector::new(ValidationLevel::Strict);
        collector.add(Severity::Fatal, VersionGate::V31, "admitted", None);

        assert!(collector.has_fatal_errors());
    }

    #[test]
    fn test_source_hint_attached() {
        let mut collector = ProblemCollector::new(ValidationLevel::Strict);
        collector.set_source("(external profiles)");
        collector.add(Severity::Warning, VersionGate::Base, "w", None);

        assert_eq!(
            collector.problems()[0].source.as_deref(),
            Some("(external profiles)")
        );
    }

    #[test]
    fn test_take_resets_counts() {
        let mut collector = ProblemCollector::new(ValidationLevel::Strict);
        collector.add(Severity::Error, VersionGate::Base, "e", None);
        let taken = collector.take();

        assert_eq!(taken.len(), 1);
        assert!(!collector.has_errors());
        assert!(collector.problems().is_empty());
    }
}
