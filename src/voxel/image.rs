//! Image: an ordered stack of layers, the active layer and the selection.

use std::cell::RefCell;
use std::rc::Rc;

use super::layer::{Layer, LayerCompositor, LayerId};
use super::selection::SelectionBox;
use super::volume::Volume;

/// Name given to layers created without one.
pub const DEFAULT_LAYER_NAME: &str = "unnamed";

/// Layers in compositing order (index 0 at the bottom).
pub struct Image {
    layers: Vec<Layer>,
    active: Option<LayerId>,
    next_id: u32,
    selection: Option<SelectionBox>,
    compositor: RefCell<LayerCompositor>,
}

impl Image {
    /// Image with a single empty layer, which is active.
    pub fn new() -> Self {
        let mut image = Self::empty();
        image.add_layer();
        image
    }

    /// Image without any layer. Scripts expect at least one layer, so the
    /// host has to add one before running them.
    pub fn empty() -> Self {
        Self {
            layers: Vec::new(),
            active: None,
            next_id: 1,
            selection: None,
            compositor: RefCell::new(LayerCompositor::new()),
        }
    }

    /// Append a new empty layer on top and make it active.
    pub fn add_layer(&mut self) -> LayerId {
        self.add_named_layer(DEFAULT_LAYER_NAME)
    }

    /// Append a new empty named layer on top and make it active.
    pub fn add_named_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(Layer::new(id, name));
        self.active = Some(id);
        log::debug!("Added layer {:?} ({} layers)", id, self.layers.len());
        id
    }

    /// Remove a layer. Removing the last layer leaves a fresh empty one in
    /// its place; removing the active layer activates the top layer.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.layers.iter().position(|l| l.id() == id)?;
        let layer = self.layers.remove(index);
        if self.layers.is_empty() {
            self.add_layer();
        } else if self.active == Some(id) {
            self.active = self.layers.last().map(Layer::id);
        }
        Some(layer)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.active
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active.and_then(|id| self.layer(id))
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        let id = self.active?;
        self.layer_mut(id)
    }

    /// Select the active layer. Returns false if no layer has this id.
    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        if self.layer(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Current selection, if any.
    pub fn selection(&self) -> Option<&SelectionBox> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<SelectionBox>) {
        self.selection = selection;
    }

    /// Read-only merge of all visible layers. Recomputed when any visible
    /// layer changed since the previous call.
    pub fn layers_volume(&self) -> Rc<Volume> {
        self.compositor.borrow_mut().merge(&self.layers)
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("layers", &self.layers)
            .field("active", &self.active)
            .field("selection", &self.selection)
            .finish()
    }
}
