//! Profile engine: activation context assembly and external property bleed.

use std::collections::BTreeMap;
use std::path::Path;

use crate::build::problems::ProblemCollector;
use crate::build::request::BuildRequest;
use crate::build::DescriptorBuilder;
use crate::core::descriptor::Descriptor;
use crate::core::profile::{Activation, ActivationContext, Profile, ProfileSource};

impl DescriptorBuilder {
    /// Assemble the activation context for one request. Project properties
    /// are filled in per lineage node during the walk.
    pub(crate) fn profile_activation_context(&self, request: &BuildRequest) -> ActivationContext {
        ActivationContext {
            active_ids: request.active_profile_ids.clone(),
            inactive_ids: request.inactive_profile_ids.clone(),
            system_properties: request.system_properties.clone(),
            user_properties: request.user_properties.clone(),
            project_properties: BTreeMap::new(),
            project_directory: request
                .descriptor_file
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf),
        }
    }

    /// Select the active external profiles and bleed their properties into
    /// the context's user properties, so they are visible to subsequent
    /// activation decisions. The request's own user properties keep
    /// priority. External profile properties never become project
    /// properties.
    pub(crate) fn activate_external_profiles(
        &self,
        request: &BuildRequest,
        context: &mut ActivationContext,
        problems: &mut ProblemCollector,
    ) -> Vec<Profile> {
        problems.set_source("(external profiles)");
        let mut active = self
            .profile_selector
            .active_profiles(&request.profiles, context, problems);
        for profile in &mut active {
            profile.source = ProfileSource::External;
        }

        if !active.is_empty() {
            let mut merged = BTreeMap::new();
            for profile in &active {
                merged.extend(profile.properties.clone());
            }
            merged.extend(context.user_properties.clone());
            context.user_properties = merged;
        }

        active
    }
}

/// Snapshot each profile's activation, keyed by profile id.
pub(crate) fn profile_activations(model: &Descriptor) -> BTreeMap<String, Activation> {
    model
        .profiles
        .iter()
        .filter_map(|profile| {
            profile
                .activation
                .clone()
                .map(|activation| (profile.id.clone(), activation))
        })
        .collect()
}

/// Reinstall saved activations onto the model's profiles.
pub(crate) fn restore_profile_activations(
    model: &mut Descriptor,
    saved: &BTreeMap<String, Activation>,
) {
    for profile in &mut model.profiles {
        if profile.activation.is_none() {
            continue;
        }
        if let Some(original) = saved.get(&profile.id) {
            profile.activation = Some(original.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::request::ValidationLevel;
    use crate::core::profile::FileActivation;

    #[test]
    fn test_external_properties_bleed_user_wins() {
        let builder = DescriptorBuilder::new();

        let mut external = Profile {
            id: "ext".to_string(),
            ..Default::default()
        };
        external
            .properties
            .insert("from.profile".to_string(), "profile".to_string());
        external
            .properties
            .insert("shared".to_string(), "profile".to_string());

        let mut request =
            BuildRequest::from_source(std::sync::Arc::new(crate::sources::StringSource::new(
                "",
                "mem:test",
            )));
        request.profiles = vec![external];
        request.active_profile_ids = vec!["ext".to_string()];
        request
            .user_properties
            .insert("shared".to_string(), "user".to_string());

        let mut context = builder.profile_activation_context(&request);
        let mut problems = ProblemCollector::new(ValidationLevel::Strict);
        let active = builder.activate_external_profiles(&request, &mut context, &mut problems);

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].source, ProfileSource::External);
        assert_eq!(context.user_properties["from.profile"], "profile");
        // original user properties override profile contributions
        assert_eq!(context.user_properties["shared"], "user");
    }

    #[test]
    fn test_activation_save_restore_round_trip() {
        let activation = Activation {
            file: Some(FileActivation {
                exists: Some("${basedir}/flag".to_string()),
                missing: None,
            }),
            ..Default::default()
        };
        let mut model = Descriptor {
            profiles: vec![Profile {
                id: "p".to_string(),
                activation: Some(activation.clone()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let saved = profile_activations(&model);

        // simulate interpolation mangling the predicate
        model.profiles[0].activation = Some(Activation {
            file: Some(FileActivation {
                exists: Some("/resolved/flag".to_string()),
                missing: None,
            }),
            ..Default::default()
        });

        restore_profile_activations(&mut model, &saved);
        assert_eq!(model.profiles[0].activation, Some(activation));
    }
}
