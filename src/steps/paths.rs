//! Default path translation and URL normalization.

use std::path::Path;

use crate::core::descriptor::Descriptor;
use crate::steps::{PathTranslator, UrlNormalizer};

/// Aligns relative path fields to the project base directory.
#[derive(Debug, Default)]
pub struct DefaultPathTranslator;

impl PathTranslator for DefaultPathTranslator {
    fn align_to_base(&self, model: &mut Descriptor, base: Option<&Path>) {
        let Some(base) = base else { return };

        if let Some(build) = &mut model.build {
            for field in [
                &mut build.directory,
                &mut build.source_directory,
                &mut build.test_source_directory,
                &mut build.output_directory,
            ] {
                align(field, base);
            }
        }
        if let Some(reporting) = &mut model.reporting {
            align(&mut reporting.output_directory, base);
        }
    }
}

fn align(field: &mut Option<String>, base: &Path) {
    let Some(value) = field else { return };
    let path = Path::new(value.as_str());
    if path.is_absolute() {
        return;
    }
    *value = base.join(path).display().to_string();
}

/// Collapses `.` and `..` segments in URL fields.
#[derive(Debug, Default)]
pub struct DefaultUrlNormalizer;

impl UrlNormalizer for DefaultUrlNormalizer {
    fn normalize(&self, model: &mut Descriptor) {
        normalize_field(&mut model.url);
        for repository in model
            .repositories
            .iter_mut()
            .chain(&mut model.plugin_repositories)
        {
            normalize_field(&mut repository.url);
        }
    }
}

fn normalize_field(field: &mut Option<String>) {
    if let Some(url) = field {
        *url = collapse_parent_segments(url);
    }
}

fn collapse_parent_segments(url: &str) -> String {
    let mut current = url.replace("/./", "/");
    loop {
        let Some(index) = current.find("/../") else {
            return current;
        };
        let head = &current[..index];
        match head.rfind('/') {
            // don't collapse past the scheme's double slash
            Some(slash) if !head.ends_with("//") && slash > 0 => {
                current = format!("{}{}", &current[..slash], &current[index + 3..]);
            }
            _ => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::BuildSection;

    #[test]
    fn test_align_relative_paths() {
        let mut model = Descriptor {
            build: Some(BuildSection {
                directory: Some("target".to_string()),
                source_directory: Some("/absolute/src".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        DefaultPathTranslator.align_to_base(&mut model, Some(Path::new("/project")));

        let build = model.build.as_ref().unwrap();
        assert_eq!(
            build.directory.as_deref(),
            Some(Path::new("/project/target").to_str().unwrap())
        );
        assert_eq!(build.source_directory.as_deref(), Some("/absolute/src"));
    }

    #[test]
    fn test_no_base_is_a_no_op() {
        let mut model = Descriptor {
            build: Some(BuildSection {
                directory: Some("target".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        DefaultPathTranslator.align_to_base(&mut model, None);
        assert_eq!(
            model.build.as_ref().unwrap().directory.as_deref(),
            Some("target")
        );
    }

    #[test]
    fn test_url_parent_collapse() {
        let mut model = Descriptor {
            url: Some("https://example.com/group/parent/../child".to_string()),
            ..Default::default()
        };
        DefaultUrlNormalizer.normalize(&mut model);
        assert_eq!(
            model.url.as_deref(),
            Some("https://example.com/group/child")
        );
    }
}
