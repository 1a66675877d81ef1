//! Derived quantities: area, volume, bounding boxes.

use glam::DVec3;

use super::mesh::Mesh;
use super::model::Model;
use crate::util::BBox3;

/// Unsigned area of one triangle.
pub fn triangle_area(v0: DVec3, v1: DVec3, v2: DVec3) -> f64 {
    (v1 - v0).cross(v2 - v0).length() * 0.5
}

/// Signed volume of the tetrahedron spanned by a triangle and the origin.
///
/// Positive when the triangle is counter-clockwise seen from outside
/// (the crate's outward convention).
pub fn signed_tetrahedron_volume(v0: DVec3, v1: DVec3, v2: DVec3) -> f64 {
    v0.dot(v1.cross(v2)) / 6.0
}

/// Sum of unsigned triangle areas. Well-defined for any mesh.
pub fn calculate_surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|t| {
            triangle_area(
                mesh.positions[t.vertices[0] as usize],
                mesh.positions[t.vertices[1] as usize],
                mesh.positions[t.vertices[2] as usize],
            )
        })
        .sum()
}

/// Enclosed volume as the sum of signed tetrahedron volumes from the origin.
///
/// Meaningful only when the mesh is solid and consistently outward-wound;
/// callers must check [`super::topology::is_solid`] first.
pub fn calculate_volume(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|t| {
            signed_tetrahedron_volume(
                mesh.positions[t.vertices[0] as usize],
                mesh.positions[t.vertices[1] as usize],
                mesh.positions[t.vertices[2] as usize],
            )
        })
        .sum()
}

/// Componentwise min/max over the mesh's vertex positions.
pub fn mesh_bounding_box(mesh: &Mesh) -> BBox3 {
    let mut bounds = BBox3::EMPTY;
    for &p in &mesh.positions {
        bounds.expand_by_point(p);
    }
    bounds
}

/// Model bounding box merged over all instances.
///
/// Each instance contributes its mesh box passed through the instance's
/// world transform (via the 8 transformed corners); requires finalize to
/// have computed world transforms, falling back to untransformed boxes
/// otherwise.
pub fn model_bounding_box(model: &Model) -> BBox3 {
    let mut bounds = BBox3::EMPTY;
    for instance in model.instances() {
        let mesh_box = mesh_bounding_box(model.mesh(instance.mesh));
        if mesh_box.is_empty() {
            continue;
        }
        match instance.world_transform {
            Some(world) => {
                for corner in mesh_box.corners() {
                    bounds.expand_by_point(world.transform_point3(corner));
                }
            }
            None => bounds.expand_by_box(&mesh_box),
        }
    }
    bounds
}
