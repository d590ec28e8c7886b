//! 16x16x16 tile of voxels, the unit of copy-on-write sharing between volumes

use super::color::Color;
use crate::core::types::IVec3;

/// Voxels per tile side
pub const TILE_SIZE: i32 = 16;

/// Voxels per tile
pub const TILE_VOLUME: usize = (TILE_SIZE * TILE_SIZE * TILE_SIZE) as usize;

/// Tile position in the tile grid. Field order gives the (z, y, x) iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub z: i32,
    pub y: i32,
    pub x: i32,
}

impl TileCoord {
    /// Split a voxel position into its tile and the index inside that tile
    pub fn split(pos: IVec3) -> (TileCoord, usize) {
        let coord = TileCoord {
            x: pos.x.div_euclid(TILE_SIZE),
            y: pos.y.div_euclid(TILE_SIZE),
            z: pos.z.div_euclid(TILE_SIZE),
        };
        let local = IVec3::new(
            pos.x.rem_euclid(TILE_SIZE),
            pos.y.rem_euclid(TILE_SIZE),
            pos.z.rem_euclid(TILE_SIZE),
        );
        (coord, tile_index(local))
    }

    /// World position of the tile's minimum corner
    pub fn origin(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z) * TILE_SIZE
    }
}

/// Linear index, x fastest
fn tile_index(local: IVec3) -> usize {
    debug_assert!(local.cmpge(IVec3::ZERO).all() && local.cmplt(IVec3::splat(TILE_SIZE)).all());
    (local.x + local.y * TILE_SIZE + local.z * TILE_SIZE * TILE_SIZE) as usize
}

fn local_pos(index: usize) -> IVec3 {
    let i = index as i32;
    IVec3::new(i % TILE_SIZE, (i / TILE_SIZE) % TILE_SIZE, i / (TILE_SIZE * TILE_SIZE))
}

/// Dense block of voxel colors plus a count of non-empty entries
#[derive(Clone)]
pub struct Tile {
    voxels: Box<[Color; TILE_VOLUME]>,
    filled: u32,
}

impl Tile {
    /// Empty tile
    pub fn new() -> Self {
        Self {
            voxels: Box::new([Color::EMPTY; TILE_VOLUME]),
            filled: 0,
        }
    }

    pub fn get(&self, index: usize) -> Color {
        self.voxels[index]
    }

    /// Set a voxel, keeping the filled count in sync
    pub fn set(&mut self, index: usize, color: Color) {
        let color = color.normalized();
        let old = std::mem::replace(&mut self.voxels[index], color);
        match (old.is_empty(), color.is_empty()) {
            (true, false) => self.filled += 1,
            (false, true) => self.filled -= 1,
            _ => {}
        }
    }

    /// Number of non-empty voxels
    pub fn filled(&self) -> u32 {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Non-empty voxels as (local position, color), z-outer / x-inner
    pub fn iter_filled(&self) -> impl Iterator<Item = (IVec3, Color)> + '_ {
        self.voxels
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, c)| (local_pos(i), *c))
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::new()
    }
}
