//! Sparse voxel volume over an unbounded integer coordinate space.
//!
//! Voxels are stored in 16³ tiles keyed by tile coordinate. Tiles are shared
//! between copies through `Arc` and cloned on first write, so `copy()` is
//! cheap while still giving fully independent snapshots.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::color::Color;
use super::tile::{Tile, TileCoord};
use crate::core::types::IVec3;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

fn next_key() -> u64 {
    NEXT_KEY.fetch_add(1, Ordering::Relaxed)
}

/// Sparse mapping from voxel coordinate to color.
///
/// Empty voxels (alpha 0) are never stored; tiles that become empty are
/// dropped.
#[derive(Clone)]
pub struct Volume {
    tiles: BTreeMap<TileCoord, Arc<Tile>>,
    /// Content stamp: changes on every effective write, kept by `copy()`.
    key: u64,
}

impl Volume {
    /// Create an empty volume
    pub fn new() -> Self {
        Self {
            tiles: BTreeMap::new(),
            key: next_key(),
        }
    }

    /// Color at `pos`, `Color::EMPTY` when unset
    pub fn get(&self, pos: IVec3) -> Color {
        let (coord, index) = TileCoord::split(pos);
        self.tiles
            .get(&coord)
            .map(|tile| tile.get(index))
            .unwrap_or(Color::EMPTY)
    }

    /// Set the voxel at `pos`. A color with alpha 0 removes the voxel.
    pub fn set_at(&mut self, pos: IVec3, color: Color) {
        let color = color.normalized();
        let (coord, index) = TileCoord::split(pos);

        let changed = match self.tiles.entry(coord) {
            Entry::Occupied(mut entry) => {
                if entry.get().get(index) == color {
                    false
                } else {
                    let tile = Arc::make_mut(entry.get_mut());
                    tile.set(index, color);
                    if tile.is_empty() {
                        entry.remove();
                    }
                    true
                }
            }
            Entry::Vacant(entry) => {
                if color.is_empty() {
                    false
                } else {
                    let mut tile = Tile::new();
                    tile.set(index, color);
                    entry.insert(Arc::new(tile));
                    true
                }
            }
        };

        if changed {
            self.key = next_key();
        }
    }

    /// Iterate all non-empty voxels in a fixed order: tiles by (z, y, x),
    /// then z-outer / x-inner within each tile.
    pub fn iter(&self) -> impl Iterator<Item = (IVec3, Color)> + '_ {
        self.tiles.iter().flat_map(|(coord, tile)| {
            let origin = coord.origin();
            tile.iter_filled().map(move |(local, color)| (origin + local, color))
        })
    }

    /// Visit every voxel while allowing the visitor to write to this volume.
    ///
    /// The pass walks a snapshot taken before the first call, so every voxel
    /// present at the start is visited exactly once and voxels written during
    /// the pass are not visited.
    pub fn visit_mut<F>(&mut self, mut visitor: F)
    where
        F: FnMut(&mut Volume, IVec3, Color),
    {
        let snapshot = self.copy();
        for (pos, color) in snapshot.iter() {
            visitor(self, pos, color);
        }
    }

    /// Independent snapshot of this volume
    pub fn copy(&self) -> Volume {
        self.clone()
    }

    /// Remove all voxels
    pub fn clear(&mut self) {
        if !self.tiles.is_empty() {
            self.tiles.clear();
            self.key = next_key();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of non-empty voxels
    pub fn len(&self) -> usize {
        self.tiles.values().map(|t| t.filled() as usize).sum()
    }

    /// Number of allocated tiles
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Content key. Equal keys imply equal content.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Inclusive `(min, max)` corners of the non-empty voxels.
    ///
    /// Inclusive so a voxel at `i32::MAX` still has representable bounds.
    pub fn bbox(&self) -> Option<(IVec3, IVec3)> {
        let mut voxels = self.iter();
        let (first, _) = voxels.next()?;
        Some(voxels.fold((first, first), |(min, max), (pos, _)| (min.min(pos), max.max(pos))))
    }

    /// Composite `top` over this volume with alpha-over blending.
    pub fn merge_over(&mut self, top: &Volume) {
        for (coord, tile) in &top.tiles {
            if !self.tiles.contains_key(coord) {
                // Nothing below: share the tile as is.
                self.tiles.insert(*coord, Arc::clone(tile));
                self.key = next_key();
                continue;
            }
            let origin = coord.origin();
            for (local, color) in tile.iter_filled() {
                let pos = origin + local;
                let below = self.get(pos);
                self.set_at(pos, color.over(below));
            }
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Volume {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key || self.iter().eq(other.iter())
    }
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("voxels", &self.len())
            .field("tiles", &self.tiles.len())
            .field("key", &self.key)
            .finish()
    }
}

impl Extend<(IVec3, Color)> for Volume {
    fn extend<T: IntoIterator<Item = (IVec3, Color)>>(&mut self, iter: T) {
        for (pos, color) in iter {
            self.set_at(pos, color);
        }
    }
}

impl FromIterator<(IVec3, Color)> for Volume {
    fn from_iter<T: IntoIterator<Item = (IVec3, Color)>>(iter: T) -> Self {
        let mut volume = Volume::new();
        volume.extend(iter);
        volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    #[test]
    fn test_unset_is_empty() {
        let volume = Volume::new();
        for pos in [IVec3::ZERO, IVec3::new(-100, 7, 1 << 20), IVec3::splat(i32::MIN)] {
            assert_eq!(volume.get(pos), Color::EMPTY);
        }
        assert!(volume.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let mut volume = Volume::new();
        let positions = [IVec3::ZERO, IVec3::new(-1, -1, -1), IVec3::new(15, 16, -17), IVec3::splat(i32::MAX)];
        for (i, pos) in positions.iter().enumerate() {
            volume.set_at(*pos, Color::new(i as u8, 1, 2, 200));
        }
        for (i, pos) in positions.iter().enumerate() {
            assert_eq!(volume.get(*pos), Color::new(i as u8, 1, 2, 200));
        }
        assert_eq!(volume.len(), positions.len());
    }

    #[test]
    fn test_zero_alpha_deletes() {
        let mut volume = Volume::new();
        volume.set_at(IVec3::new(3, 4, 5), RED);
        volume.set_at(IVec3::new(3, 4, 5), Color::new(255, 255, 255, 0));
        assert_eq!(volume.get(IVec3::new(3, 4, 5)), Color::EMPTY);
        assert_eq!(volume.iter().count(), 0);
        assert_eq!(volume.tile_count(), 0);
    }

    #[test]
    fn test_zero_alpha_on_unset_is_noop() {
        let mut volume = Volume::new();
        let key = volume.key();
        volume.set_at(IVec3::ZERO, Color::EMPTY);
        assert_eq!(volume.key(), key);
        assert_eq!(volume.tile_count(), 0);
    }

    #[test]
    fn test_single_voxel_iter() {
        let mut volume = Volume::new();
        volume.set_at(IVec3::ZERO, RED);
        let voxels: Vec<_> = volume.iter().collect();
        assert_eq!(voxels, vec![(IVec3::ZERO, RED)]);
    }

    #[test]
    fn test_iter_order_is_stable() {
        let volume: Volume = [
            (IVec3::new(40, 0, 0), RED),
            (IVec3::new(0, 0, 40), BLUE),
            (IVec3::new(-3, 2, 1), RED),
            (IVec3::new(1, 0, 0), BLUE),
        ]
        .into_iter()
        .collect();

        let first: Vec<_> = volume.iter().collect();
        let second: Vec<_> = volume.iter().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        // Highest z tile comes last.
        assert_eq!(first.last().unwrap().0, IVec3::new(0, 0, 40));
    }

    #[test]
    fn test_copy_is_independent() {
        let mut volume = Volume::new();
        volume.set_at(IVec3::ZERO, RED);
        let snapshot = volume.copy();

        volume.set_at(IVec3::ZERO, BLUE);
        volume.set_at(IVec3::ONE, BLUE);
        assert_eq!(snapshot.get(IVec3::ZERO), RED);
        assert_eq!(snapshot.get(IVec3::ONE), Color::EMPTY);

        let mut snapshot = snapshot;
        snapshot.set_at(IVec3::new(2, 2, 2), RED);
        assert_eq!(volume.get(IVec3::new(2, 2, 2)), Color::EMPTY);
    }

    #[test]
    fn test_dilate_with_copy() {
        let mut volume = Volume::new();
        volume.set_at(IVec3::ZERO, RED);
        let source = volume.copy();

        for (pos, color) in source.iter() {
            for z in -1..=1 {
                for y in -1..=1 {
                    for x in -1..=1 {
                        volume.set_at(pos + IVec3::new(x, y, z), color);
                    }
                }
            }
        }

        assert_eq!(volume.len(), 27);
        assert!(volume.iter().all(|(_, c)| c == RED));
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_visit_mut_writes_same_volume() {
        let mut volume: Volume = (0..20).map(|x| (IVec3::new(x, 0, 0), RED)).collect();
        let mut visited = 0;
        volume.visit_mut(|v, pos, _| {
            visited += 1;
            // Push new voxels ahead of the cursor and recolor the current one.
            v.set_at(pos + IVec3::new(1, 0, 0), BLUE);
            v.set_at(pos + IVec3::new(0, 1, 0), BLUE);
        });
        assert_eq!(visited, 20);
        assert_eq!(volume.get(IVec3::new(20, 0, 0)), BLUE);
        assert_eq!(volume.get(IVec3::new(0, 0, 0)), RED);
    }

    #[test]
    fn test_visit_mut_delete_during_pass() {
        let mut volume: Volume = (0..5).map(|x| (IVec3::new(x, 0, 0), RED)).collect();
        let mut visited = Vec::new();
        volume.visit_mut(|v, pos, _| {
            visited.push(pos.x);
            v.set_at(pos + IVec3::X, Color::EMPTY);
        });
        assert_eq!(visited, vec![0, 1, 2, 3, 4]);
        assert_eq!(volume.len(), 1);
    }

    #[test]
    fn test_key_changes_on_write() {
        let mut volume = Volume::new();
        let k0 = volume.key();
        volume.set_at(IVec3::ZERO, RED);
        let k1 = volume.key();
        assert_ne!(k0, k1);
        // Writing the same value is not a change.
        volume.set_at(IVec3::ZERO, RED);
        assert_eq!(volume.key(), k1);
        assert_eq!(volume.copy().key(), k1);
    }

    #[test]
    fn test_bbox() {
        let mut volume = Volume::new();
        assert!(volume.bbox().is_none());
        volume.set_at(IVec3::new(-2, 0, 5), RED);
        volume.set_at(IVec3::new(3, 1, 5), RED);
        let (min, max) = volume.bbox().unwrap();
        assert_eq!(min, IVec3::new(-2, 0, 5));
        assert_eq!(max, IVec3::new(3, 1, 5));
    }

    #[test]
    fn test_bbox_at_coordinate_limits() {
        let mut volume = Volume::new();
        volume.set_at(IVec3::splat(i32::MAX), RED);
        assert_eq!(volume.bbox(), Some((IVec3::splat(i32::MAX), IVec3::splat(i32::MAX))));
        volume.set_at(IVec3::splat(i32::MIN), RED);
        assert_eq!(volume.bbox(), Some((IVec3::splat(i32::MIN), IVec3::splat(i32::MAX))));
    }

    #[test]
    fn test_merge_over() {
        let mut bottom = Volume::new();
        bottom.set_at(IVec3::ZERO, BLUE);
        bottom.set_at(IVec3::ONE, BLUE);

        let mut top = Volume::new();
        top.set_at(IVec3::ZERO, RED);
        top.set_at(IVec3::new(100, 0, 0), RED);

        bottom.merge_over(&top);
        assert_eq!(bottom.get(IVec3::ZERO), RED);
        assert_eq!(bottom.get(IVec3::ONE), BLUE);
        assert_eq!(bottom.get(IVec3::new(100, 0, 0)), RED);
        assert_eq!(bottom.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut volume: Volume = [(IVec3::ZERO, RED)].into_iter().collect();
        volume.clear();
        assert!(volume.is_empty());
        assert_eq!(volume.len(), 0);
    }
}
