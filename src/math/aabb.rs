//! Integer axis-aligned bounding box over voxel coordinates

use crate::core::types::IVec3;

/// Axis-aligned box of voxel coordinates, `min` inclusive and `max` exclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IAabb {
    pub min: IVec3,
    pub max: IVec3,
}

impl IAabb {
    /// Create AABB from min (inclusive) and max (exclusive) corners
    pub fn new(min: IVec3, max: IVec3) -> Self {
        Self { min, max }
    }

    /// Get size (max - min), clamped at zero and saturating at `i32::MAX`
    pub fn size(&self) -> IVec3 {
        self.max.saturating_sub(self.min).max(IVec3::ZERO)
    }

    /// Size, or `None` when an extent does not fit in an `i32`
    pub fn checked_size(&self) -> Option<IVec3> {
        let x = self.max.x.checked_sub(self.min.x)?;
        let y = self.max.y.checked_sub(self.min.y)?;
        let z = self.max.z.checked_sub(self.min.z)?;
        Some(IVec3::new(x, y, z).max(IVec3::ZERO))
    }

    /// True when the box covers no voxel
    pub fn is_empty(&self) -> bool {
        self.max.cmple(self.min).any()
    }

    /// Check if a voxel coordinate is inside
    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(self.min).all() && p.cmplt(self.max).all()
    }
}
