//! Build-consumer transform hook.

use anyhow::Result;

use crate::core::descriptor::Descriptor;

/// Enriches a freshly parsed descriptor with data only the surrounding
/// build session knows (e.g. resolved sibling versions). Applied by the
/// parser when a transformer is passed with the parse options; the raw
/// builder then merges the enriched model back into the raw model with the
/// restricted merger so location trackers survive.
pub trait DescriptorTransformer: Send + Sync {
    fn transform(&self, model: &mut Descriptor) -> Result<()>;
}
