//! Layer compositor: builds the merged volume of an image's visible layers.
//!
//! The merge is cached on the (layer id, volume key) list of the visible
//! layers, so repeated requests without edits reuse the previous result.

use std::rc::Rc;

use super::{Layer, LayerId};
use crate::voxel::volume::Volume;

/// Composites layer volumes bottom-to-top with alpha-over blending.
#[derive(Default)]
pub struct LayerCompositor {
    cached: Option<(Vec<(LayerId, u64)>, Rc<Volume>)>,
}

impl LayerCompositor {
    /// Create a compositor with an empty cache.
    pub fn new() -> Self {
        Self { cached: None }
    }

    /// Merged volume of the visible `layers`, first layer at the bottom.
    pub fn merge<'a>(&mut self, layers: impl IntoIterator<Item = &'a Layer>) -> Rc<Volume> {
        let visible: Vec<&Layer> = layers.into_iter().filter(|l| l.visible).collect();
        let signature: Vec<(LayerId, u64)> =
            visible.iter().map(|l| (l.id(), l.volume().key())).collect();

        if let Some((cached_signature, merged)) = &self.cached {
            if *cached_signature == signature {
                log::trace!("Reusing merged volume for {} layers", signature.len());
                return Rc::clone(merged);
            }
        }

        let mut merged = Volume::new();
        for layer in &visible {
            merged.merge_over(layer.volume());
        }
        log::debug!(
            "Merged {} visible layers into {} voxels",
            visible.len(),
            merged.len()
        );

        let merged = Rc::new(merged);
        self.cached = Some((signature, Rc::clone(&merged)));
        merged
    }

    /// Drop the cached merge.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
