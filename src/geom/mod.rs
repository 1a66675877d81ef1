//! Geometry primitives: transforms and the octree spatial index.

mod octree;
mod transform;

pub use octree::{Octree, OctreeNode, OctreeParams};
pub use transform::{transformation_is_eq, Transformation};
