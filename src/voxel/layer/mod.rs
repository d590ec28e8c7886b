//! Image layers. Each layer exclusively owns one voxel volume.

pub mod compositor;

pub use compositor::LayerCompositor;

use crate::voxel::volume::Volume;

/// Unique identifier for a layer within an image. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u32);

/// A named, optionally hidden voxel volume.
#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerId,
    /// Human-readable name
    pub name: String,
    /// Hidden layers are left out of the merged volume
    pub visible: bool,
    volume: Volume,
}

impl Layer {
    /// Create a visible layer with an empty volume.
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            volume: Volume::new(),
        }
    }

    /// Set the initial content.
    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volume = volume;
        self
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn volume_mut(&mut self) -> &mut Volume {
        &mut self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;
    use crate::voxel::color::Color;

    #[test]
    fn test_new_layer() {
        let layer = Layer::new(LayerId(4), "Terrain");
        assert_eq!(layer.id(), LayerId(4));
        assert!(layer.visible);
        assert!(layer.volume().is_empty());
    }

    #[test]
    fn test_layer_owns_volume() {
        let mut layer = Layer::new(LayerId(0), "unnamed");
        layer.volume_mut().set_at(IVec3::ZERO, Color::rgb(1, 2, 3));
        let copy = layer.clone();
        layer.volume_mut().clear();
        assert_eq!(copy.volume().len(), 1);
    }
}
