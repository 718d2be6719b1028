//! The super-descriptor - implicit root of every lineage.

use std::sync::OnceLock;

use crate::core::descriptor::{Descriptor, Repository};
use crate::steps::SuperDescriptorProvider;

/// Id of the default repository the super-descriptor contributes.
pub const CENTRAL_REPOSITORY_ID: &str = "central";

/// URL of the default repository the super-descriptor contributes.
pub const CENTRAL_REPOSITORY_URL: &str = "https://repo.capstan.dev/releases";

/// Builds the super-descriptor once and clones it per request, so callers
/// may mutate their copy freely.
#[derive(Debug, Default)]
pub struct DefaultSuperDescriptorProvider {
    cached: OnceLock<Descriptor>,
}

impl SuperDescriptorProvider for DefaultSuperDescriptorProvider {
    fn super_descriptor(&self, model_version: &str) -> Descriptor {
        let mut model = self
            .cached
            .get_or_init(build_super_descriptor)
            .clone();
        model.model_version = Some(model_version.to_string());
        model
    }
}

fn build_super_descriptor() -> Descriptor {
    let central = Repository {
        id: Some(CENTRAL_REPOSITORY_ID.to_string()),
        name: Some("Central Repository".to_string()),
        url: Some(CENTRAL_REPOSITORY_URL.to_string()),
        location: None,
    };

    Descriptor {
        model_version: Some("4.0.0".to_string()),
        repositories: vec![central.clone()],
        plugin_repositories: vec![central],
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_descriptor_defaults() {
        let provider = DefaultSuperDescriptorProvider::default();
        let model = provider.super_descriptor("4.0.0");

        assert_eq!(model.model_version.as_deref(), Some("4.0.0"));
        assert_eq!(model.repositories.len(), 1);
        assert_eq!(
            model.repositories[0].id.as_deref(),
            Some(CENTRAL_REPOSITORY_ID)
        );
        assert!(model.parent.is_none());
    }

    #[test]
    fn test_clones_are_independent() {
        let provider = DefaultSuperDescriptorProvider::default();
        let mut first = provider.super_descriptor("4.0.0");
        first.repositories.clear();

        let second = provider.super_descriptor("4.0.0");
        assert_eq!(second.repositories.len(), 1);
    }
}
