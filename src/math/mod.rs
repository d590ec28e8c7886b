//! Mathematical utilities and data structures

pub mod aabb;

pub use aabb::IAabb;
