//! Voxel data structures: colors, sparse volumes, selection boxes, layers and images

pub mod color;
pub mod tile;
pub mod volume;
pub mod selection;
pub mod layer;
pub mod image;

pub use color::Color;
pub use tile::{TileCoord, TILE_SIZE};
pub use volume::Volume;
pub use selection::SelectionBox;
pub use layer::{Layer, LayerId, LayerCompositor};
pub use image::Image;
