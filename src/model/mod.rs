//! The normalized scene/geometry data model and its derived views.
//!
//! Decoders write into [`Model`]; encoders and the render conversion read
//! from it. [`Topology`] and the quantity functions are derived on demand
//! and never persisted.

mod color;
mod finalize;
pub mod generator;
mod material;
mod mesh;
mod model;
mod property;
pub mod quantities;
pub mod topology;

pub use color::{component_from_float, Color};
pub use finalize::{check_model, finalize_model, FinalizeParams, IntegrityIssue};
pub use material::{Material, MaterialBase, TextureMap};
pub use mesh::{Mesh, Triangle};
pub use model::{MeshId, MeshInstance, MeshInstanceId, Model, Node, NodeId};
pub use property::{Property, PropertyGroup, PropertyValue};
pub use quantities::{
    calculate_surface_area, calculate_volume, mesh_bounding_box, model_bounding_box,
    signed_tetrahedron_volume, triangle_area,
};
pub use topology::{is_solid, Topology, TopologyEdge, TopologyTriangle, TopologyTriangleEdge, TopologyVertex};
