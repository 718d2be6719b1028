//! Dependency-management import resolution.

use crate::build::problems::{ProblemCollector, Severity, VersionGate};
use crate::build::request::{BuildRequest, ValidationLevel};
use crate::build::DescriptorBuilder;
use crate::core::coordinates;
use crate::core::descriptor::{DependencyManagement, Descriptor};

impl DescriptorBuilder {
    /// Resolve `type = "pom"`, `scope = "import"` entries of the model's
    /// dependency management: each one is removed from the list, its
    /// descriptor's management section is obtained (workspace first, then
    /// a recursive sub-build through the resolver) and finally everything
    /// is composed into the model, first-declared-wins.
    ///
    /// `import_ids` carries the chain of importing model ids through the
    /// recursion; revisiting one is a cycle.
    pub(crate) fn import_dependency_management(
        &self,
        model: &mut Descriptor,
        request: &mut BuildRequest,
        problems: &mut ProblemCollector,
        import_ids: &mut Vec<String>,
    ) {
        if model.dependency_management.is_none() {
            return;
        }

        let importing = coordinates::model_id(
            model.group_id.as_deref(),
            model.artifact_id.as_deref(),
            model.version.as_deref(),
        );
        import_ids.push(importing);

        let entries = {
            let management = model
                .dependency_management
                .as_mut()
                .expect("checked above");
            std::mem::take(&mut management.dependencies)
        };

        let mut kept = Vec::with_capacity(entries.len());
        let mut imports: Vec<DependencyManagement> = Vec::new();

        for dependency in entries {
            if !dependency.is_import() {
                kept.push(dependency);
                continue;
            }

            let key = dependency.management_key();
            let mut missing_field = false;
            for (field, value) in [
                ("group-id", &dependency.group_id),
                ("artifact-id", &dependency.artifact_id),
                ("version", &dependency.version),
            ] {
                if value.as_deref().unwrap_or("").is_empty() {
                    problems.add(
                        Severity::Error,
                        VersionGate::Base,
                        format!(
                            "'dependency-management.dependencies.dependency.{field}' for {key} \
                             is missing."
                        ),
                        dependency.location.clone(),
                    );
                    missing_field = true;
                }
            }
            if missing_field {
                continue;
            }

            let group_id = dependency.group_id.clone().expect("validated above");
            let artifact_id = dependency.artifact_id.clone().expect("validated above");
            let version = dependency.version.clone().expect("validated above");
            let imported = format!("{group_id}:{artifact_id}:{version}");

            if import_ids.iter().any(|id| *id == imported) {
                let mut message =
                    String::from("The dependencies of type=pom and with scope=import form a cycle: ");
                for id in import_ids.iter() {
                    message.push_str(id);
                    message.push_str(" -> ");
                }
                message.push_str(&imported);
                problems.add(Severity::Error, VersionGate::Base, message, None);
                continue;
            }

            let cached = request
                .cache
                .as_ref()
                .and_then(|cache| cache.import(&group_id, &artifact_id, &version));

            let management = match cached {
                Some(management) => {
                    tracing::debug!("import cache hit for {imported}");
                    management
                }
                None => {
                    let Some(management) = self.resolve_import(
                        &dependency,
                        (&group_id, &artifact_id, &version),
                        model,
                        request,
                        problems,
                        import_ids,
                    ) else {
                        continue;
                    };
                    if let Some(cache) = &request.cache {
                        cache.put_import(&group_id, &artifact_id, &version, &management);
                    }
                    management
                }
            };

            imports.push(management);
        }

        {
            let management = model
                .dependency_management
                .as_mut()
                .expect("checked above");
            management.dependencies = kept;
        }

        import_ids.pop();

        self.dependency_management_importer
            .import_management(model, imports, problems);
    }

    fn resolve_import(
        &self,
        dependency: &crate::core::descriptor::Dependency,
        (group_id, artifact_id, version): (&str, &str, &str),
        model: &Descriptor,
        request: &mut BuildRequest,
        problems: &mut ProblemCollector,
        import_ids: &mut Vec<String>,
    ) -> Option<DependencyManagement> {
        // workspace resolution precedes repository resolution
        if let Some(workspace) = &request.workspace_resolver {
            match workspace.resolve_effective(group_id, artifact_id, version) {
                Ok(Some(effective)) => {
                    return Some(effective.dependency_management.unwrap_or_default());
                }
                Ok(None) => {}
                Err(e) => {
                    problems.add(
                        Severity::Fatal,
                        VersionGate::Base,
                        e.to_string(),
                        dependency.location.clone(),
                    );
                    return None;
                }
            }
        }

        let Some(resolver) = request.resolver.as_deref_mut() else {
            problems.add(
                Severity::Fatal,
                VersionGate::Base,
                format!(
                    "no model resolver available to resolve import descriptor {} of descriptor {}",
                    coordinates::model_id(Some(group_id), Some(artifact_id), Some(version)),
                    coordinates::source_hint(model)
                ),
                dependency.location.clone(),
            );
            return None;
        };

        let source = match resolver.resolve_dependency(dependency) {
            Ok(source) => source,
            Err(e) => {
                let id = coordinates::model_id(Some(group_id), Some(artifact_id), Some(version));
                let mut buffer = String::from("Non-resolvable import descriptor");
                if !e.message.contains(group_id)
                    || !e.message.contains(artifact_id)
                    || !e.message.contains(version)
                {
                    buffer.push(' ');
                    buffer.push_str(&id);
                }
                buffer.push_str(&format!(": {e}"));
                problems.add(
                    Severity::Error,
                    VersionGate::Base,
                    buffer,
                    dependency.location.clone(),
                );
                return None;
            }
        };

        // imported descriptors run through the whole pipeline under a
        // minimal-validation sub-request sharing cache and properties
        let mut sub_request = BuildRequest::from_source(source);
        sub_request.validation_level = ValidationLevel::Minimal;
        sub_request.location_tracking = request.location_tracking;
        sub_request.system_properties = request.system_properties.clone();
        sub_request.user_properties = request.user_properties.clone();
        sub_request.cache = request.cache.clone();
        sub_request.resolver = request.resolver.as_ref().map(|r| r.new_copy());

        match self.build_internal(&mut sub_request, import_ids) {
            Ok(result) => {
                problems.extend(result.problems.clone());
                let management = result
                    .effective_model()
                    .dependency_management
                    .clone()
                    .unwrap_or_default();
                Some(management)
            }
            Err(e) => {
                problems.extend(e.problems);
                None
            }
        }
    }
}
