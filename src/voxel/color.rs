//! RGBA voxel color

use bytemuck::{Pod, Zeroable};

/// Voxel color, 4 bytes. Alpha 0 means "no voxel".
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Empty (fully transparent) voxel
    pub const EMPTY: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Check if the color represents an empty voxel
    pub fn is_empty(&self) -> bool {
        self.a == 0
    }

    /// Empty colors collapse to `EMPTY` so stored data never keeps stray RGB.
    pub fn normalized(self) -> Self {
        if self.is_empty() { Color::EMPTY } else { self }
    }

    pub fn to_array(self) -> [u8; 4] {
        bytemuck::cast(self)
    }

    pub fn from_array(rgba: [u8; 4]) -> Self {
        bytemuck::cast(rgba)
    }

    /// Alpha-over compositing of `self` on top of `below`.
    pub fn over(self, below: Color) -> Color {
        let top = self.to_array().map(u32::from);
        let bottom = below.to_array().map(u32::from);
        let (ta, ba) = (top[3], bottom[3]);

        let weight = 255 * ta + ba * (255 - ta);
        let mut out = [0u8; 4];
        if weight != 0 {
            for i in 0..3 {
                out[i] = ((255 * top[i] * ta + bottom[i] * ba * (255 - ta)) / weight) as u8;
            }
        }
        out[3] = (ta + ba * (255 - ta) / 255) as u8;
        Color::from_array(out).normalized()
    }
}

impl From<[u8; 4]> for Color {
    fn from(rgba: [u8; 4]) -> Self {
        Color::from_array(rgba)
    }
}

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        assert_eq!(std::mem::size_of::<Color>(), 4);
    }

    #[test]
    fn test_array_roundtrip() {
        let c = Color::new(1, 2, 3, 4);
        assert_eq!(c.to_array(), [1, 2, 3, 4]);
        assert_eq!(Color::from([1, 2, 3, 4]), c);
    }

    #[test]
    fn test_empty() {
        assert!(Color::EMPTY.is_empty());
        assert!(Color::new(10, 20, 30, 0).is_empty());
        assert_eq!(Color::new(10, 20, 30, 0).normalized(), Color::EMPTY);
        assert!(!Color::rgb(255, 0, 0).is_empty());
    }

    #[test]
    fn test_over_opaque_occludes() {
        let top = Color::rgb(255, 0, 0);
        let below = Color::rgb(0, 0, 255);
        assert_eq!(top.over(below), top);
    }

    #[test]
    fn test_over_transparent_top() {
        let below = Color::rgb(0, 0, 255);
        assert_eq!(Color::EMPTY.over(below), below);
        assert_eq!(below.over(Color::EMPTY), below);
    }

    #[test]
    fn test_over_half_alpha_blends() {
        let top = Color::new(255, 0, 0, 128);
        let below = Color::rgb(0, 0, 255);
        let out = top.over(below);
        assert_eq!(out.a, 255);
        assert!(out.r > 100 && out.r < 156);
        assert!(out.b > 100 && out.b < 156);
    }
}
