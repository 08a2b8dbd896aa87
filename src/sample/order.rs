//! Lifecycle ordering of samples
//!
//! Parents are created before their children and deleted after them. Each
//! language gets its own tree; languages are emitted in [`Language::ALL`]
//! order.

use super::{Language, Sample};
use crate::tree::ResourceNode;

/// Order samples so that, per language, every resource's POST/GET/PUT run
/// before any child resource and its DELETE runs after all descendants
pub fn order_samples(samples: Vec<Sample>) -> Vec<Sample> {
    let mut ordered = Vec::with_capacity(samples.len());

    for language in Language::ALL {
        let mut tree = ResourceNode::new();
        for sample in samples.iter().filter(|s| s.language == language) {
            tree.insert(sample.segments(), sample.method, sample);
        }
        tree.walk_lifecycle(&mut |sample: &&Sample| ordered.push((*sample).clone()));
    }

    ordered
}
