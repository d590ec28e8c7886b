//! Oriented selection box over voxel coordinates

use crate::core::types::{IVec3, Mat3, Vec3};
use crate::math::IAabb;

/// Axis lengths below this are treated as zero.
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Tolerance on box faces so voxel centers lying exactly on a face are kept.
const FACE_EPSILON: f32 = 1e-4;

/// Oriented box: `origin + s*axes[0] + t*axes[1] + u*axes[2]` for s, t, u in [0, 1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionBox {
    origin: Vec3,
    axes: [Vec3; 3],
}

impl SelectionBox {
    /// Create a box from its origin corner and three edge vectors
    pub fn new(origin: Vec3, x_axis: Vec3, y_axis: Vec3, z_axis: Vec3) -> Self {
        Self {
            origin,
            axes: [x_axis, y_axis, z_axis],
        }
    }

    /// Axis-aligned box covering exactly the voxels of `aabb`
    pub fn from_aabb(aabb: IAabb) -> Self {
        let size = aabb.size().as_vec3();
        Self::new(
            aabb.min.as_vec3(),
            Vec3::X * size.x,
            Vec3::Y * size.y,
            Vec3::Z * size.z,
        )
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn axes(&self) -> [Vec3; 3] {
        self.axes
    }

    /// Edge lengths
    pub fn size(&self) -> Vec3 {
        Vec3::new(self.axes[0].length(), self.axes[1].length(), self.axes[2].length())
    }

    /// True when the box encloses no volume (zero-length or coplanar axes)
    pub fn is_degenerate(&self) -> bool {
        self.size().min_element() < DEGENERATE_EPSILON
            || self.edge_matrix().determinant().abs() < DEGENERATE_EPSILON
    }

    fn edge_matrix(&self) -> Mat3 {
        Mat3::from_cols(self.axes[0], self.axes[1], self.axes[2])
    }

    /// Box frame with unit axes; falls back to the world axes for a degenerate box.
    fn unit_frame(&self) -> Mat3 {
        if self.is_degenerate() {
            return Mat3::IDENTITY;
        }
        Mat3::from_cols(
            self.axes[0].normalize(),
            self.axes[1].normalize(),
            self.axes[2].normalize(),
        )
    }

    /// Check whether the center of voxel `pos` lies inside the box
    pub fn contains(&self, pos: IVec3) -> bool {
        if self.is_degenerate() {
            return false;
        }
        self.contains_center(&self.edge_matrix().inverse(), pos)
    }

    fn contains_center(&self, inverse_edges: &Mat3, pos: IVec3) -> bool {
        let center = pos.as_vec3() + Vec3::splat(0.5);
        let param = *inverse_edges * (center - self.origin);
        param.cmpge(Vec3::splat(-FACE_EPSILON)).all()
            && param.cmple(Vec3::splat(1.0 + FACE_EPSILON)).all()
    }

    /// Integer box enclosing all eight corners
    pub fn bbox(&self) -> IAabb {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8u32 {
            let mut corner = self.origin;
            for (axis_index, axis) in self.axes.iter().enumerate() {
                if i & (1 << axis_index) != 0 {
                    corner += *axis;
                }
            }
            min = min.min(corner);
            max = max.max(corner);
        }
        IAabb::new(min.floor().as_ivec3(), max.ceil().as_ivec3())
    }

    /// Call `visitor` once for every voxel whose center is inside the box,
    /// z-outer / x-inner. A degenerate box yields no visits.
    pub fn iter_voxels<F: FnMut(IVec3)>(&self, mut visitor: F) {
        let _ = self.try_iter_voxels::<std::convert::Infallible, _>(|pos| {
            visitor(pos);
            Ok(())
        });
    }

    /// Like `iter_voxels`, stopping at the first error returned by `visitor`.
    pub fn try_iter_voxels<E, F>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(IVec3) -> Result<(), E>,
    {
        if self.is_degenerate() {
            return Ok(());
        }
        let inverse_edges = self.edge_matrix().inverse();
        let bbox = self.bbox();
        for z in bbox.min.z..bbox.max.z {
            for y in bbox.min.y..bbox.max.y {
                for x in bbox.min.x..bbox.max.x {
                    let pos = IVec3::new(x, y, z);
                    if self.contains_center(&inverse_edges, pos) {
                        visitor(pos)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Collected `iter_voxels` output
    pub fn voxels(&self) -> Vec<IVec3> {
        let mut out = Vec::new();
        self.iter_voxels(|pos| out.push(pos));
        out
    }

    /// World voxel coordinate to box-local coordinate (origin at the box
    /// corner, unit axes along the box edges), rounded half away from zero.
    pub fn world_to_local(&self, pos: IVec3) -> IVec3 {
        let local = self.unit_frame().inverse() * (pos.as_vec3() - self.origin);
        local.round().as_ivec3()
    }
}
