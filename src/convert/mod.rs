//! Render boundary: flattens a finalized model into GPU-shaped buffers.
//!
//! The conversion is side-effect free. Each mesh becomes one
//! [`MeshBuffer`] of primitives grouped by material, with f32 attribute
//! arrays and u32 indices; the node hierarchy collapses to instances
//! carrying world transforms. Buffer building is data-parallel per mesh.

use glam::Mat4;
use rayon::prelude::*;
use tracing::debug;

use crate::model::{Material, Mesh, MeshId, Model};

/// Conversion options.
#[derive(Clone, Debug, Default)]
pub struct ConversionParams {
    /// Emit flat per-corner attributes instead of indexed vertices.
    /// Costs memory, needed for hard-edged shading without normals.
    pub unindexed: bool,
}

/// One material group inside a mesh buffer. Positions, normals and uvs
/// are flat f32 triples/pairs indexed by `indices`.
#[derive(Clone, Debug, Default)]
pub struct RenderPrimitive {
    pub material: Option<u32>,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
}

impl RenderPrimitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// GPU-shaped buffers for one mesh, shared by all of its instances.
#[derive(Clone, Debug)]
pub struct MeshBuffer {
    pub name: String,
    pub primitives: Vec<RenderPrimitive>,
}

/// One drawable occurrence of a mesh buffer.
#[derive(Clone, Debug)]
pub struct RenderInstance {
    pub mesh: MeshId,
    pub transform: Mat4,
}

/// Flattened drawable scene.
#[derive(Clone, Debug)]
pub struct RenderTree {
    pub buffers: Vec<MeshBuffer>,
    pub instances: Vec<RenderInstance>,
    pub materials: Vec<Material>,
}

/// Convert a finalized model into render buffers.
pub fn convert_model_to_render_tree(model: &Model, params: &ConversionParams) -> RenderTree {
    let buffers: Vec<MeshBuffer> = model
        .meshes()
        .par_iter()
        .map(|mesh| build_mesh_buffer(mesh, params))
        .collect();

    let instances = model
        .instances()
        .iter()
        .map(|instance| RenderInstance {
            mesh: instance.mesh,
            transform: instance
                .world_transform
                .map(|m| m.as_mat4())
                .unwrap_or(Mat4::IDENTITY),
        })
        .collect();

    debug!(
        meshes = buffers.len(),
        instances = model.instances().len(),
        "render tree built"
    );
    RenderTree {
        buffers,
        instances,
        materials: model.materials().to_vec(),
    }
}

fn build_mesh_buffer(mesh: &Mesh, params: &ConversionParams) -> MeshBuffer {
    // Stable group order: first appearance of each material
    let mut group_order: Vec<Option<u32>> = Vec::new();
    for triangle in &mesh.triangles {
        if !group_order.contains(&triangle.material) {
            group_order.push(triangle.material);
        }
    }

    let primitives = group_order
        .into_iter()
        .map(|material| {
            if params.unindexed {
                build_unindexed(mesh, material)
            } else {
                build_indexed(mesh, material)
            }
        })
        .collect();

    MeshBuffer { name: mesh.name.clone(), primitives }
}

/// Indexed primitive: one render vertex per distinct
/// (position, normal, uv) triple used by this material group.
fn build_indexed(mesh: &Mesh, material: Option<u32>) -> RenderPrimitive {
    use std::collections::HashMap;

    let mut primitive = RenderPrimitive { material, ..Default::default() };
    let mut remap: HashMap<(u32, Option<u32>, Option<u32>), u32> = HashMap::new();

    for triangle in mesh.triangles.iter().filter(|t| t.material == material) {
        for i in 0..3 {
            let key = (
                triangle.vertices[i],
                triangle.normals.map(|n| n[i]),
                triangle.uvs.map(|t| t[i]),
            );
            let index = *remap.entry(key).or_insert_with(|| {
                let index = primitive.positions.len() as u32 / 3;
                push_corner(&mut primitive, mesh, key);
                index
            });
            primitive.indices.push(index);
        }
    }
    primitive
}

/// Unindexed primitive: three fresh render vertices per triangle.
fn build_unindexed(mesh: &Mesh, material: Option<u32>) -> RenderPrimitive {
    let mut primitive = RenderPrimitive { material, ..Default::default() };
    for triangle in mesh.triangles.iter().filter(|t| t.material == material) {
        for i in 0..3 {
            let key = (
                triangle.vertices[i],
                triangle.normals.map(|n| n[i]),
                triangle.uvs.map(|t| t[i]),
            );
            primitive.indices.push(primitive.positions.len() as u32 / 3);
            push_corner(&mut primitive, mesh, key);
        }
    }
    primitive
}

fn push_corner(
    primitive: &mut RenderPrimitive,
    mesh: &Mesh,
    (vertex, normal, uv): (u32, Option<u32>, Option<u32>),
) {
    let p = mesh.positions[vertex as usize];
    primitive.positions.extend([p.x as f32, p.y as f32, p.z as f32]);
    if let Some(normal) = normal {
        let n = mesh.normals[normal as usize];
        primitive.normals.extend([n.x as f32, n.y as f32, n.z as f32]);
    }
    if let Some(uv) = uv {
        let t = mesh.uvs[uv as usize];
        primitive.uvs.extend([t.x as f32, t.y as f32]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generator::{generate_cuboid, GeneratorParams};
    use crate::model::{finalize_model, Color, FinalizeParams, Material, Mesh, Triangle};
    use glam::DVec3;

    fn finalized_cuboid() -> Model {
        let mut model = generate_cuboid(&GeneratorParams::named("box"), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());
        model
    }

    #[test]
    fn test_indexed_cuboid_buffers() {
        let model = finalized_cuboid();
        let tree = convert_model_to_render_tree(&model, &ConversionParams::default());

        assert_eq!(tree.buffers.len(), 1);
        assert_eq!(tree.instances.len(), 1);
        let primitive = &tree.buffers[0].primitives[0];
        assert_eq!(primitive.triangle_count(), 12);
        // Finalize gave each of the 8 vertices a normal, so corners dedup
        assert_eq!(primitive.vertex_count(), 8);
        assert_eq!(primitive.normals.len(), primitive.positions.len());
    }

    #[test]
    fn test_unindexed_explodes_corners() {
        let model = finalized_cuboid();
        let params = ConversionParams { unindexed: true };
        let tree = convert_model_to_render_tree(&model, &params);
        let primitive = &tree.buffers[0].primitives[0];
        assert_eq!(primitive.vertex_count(), 36);
        assert_eq!(primitive.triangle_count(), 12);
    }

    #[test]
    fn test_materials_split_primitives() {
        let mut model = Model::new();
        let red = model.add_material(Material::phong("red", Color::rgb(255, 0, 0)));
        let blue = model.add_material(Material::phong("blue", Color::rgb(0, 0, 255)));

        let mut mesh = Mesh::new("two");
        for p in [
            DVec3::ZERO,
            DVec3::X,
            DVec3::Y,
            DVec3::new(2.0, 0.0, 0.0),
            DVec3::new(3.0, 0.0, 0.0),
            DVec3::new(2.0, 1.0, 0.0),
        ] {
            mesh.add_vertex(p);
        }
        mesh.add_triangle(Triangle::new([0, 1, 2]).with_material(red));
        mesh.add_triangle(Triangle::new([3, 4, 5]).with_material(blue));
        model.add_mesh_to_root(mesh);
        finalize_model(&mut model, &FinalizeParams::default());

        let tree = convert_model_to_render_tree(&model, &ConversionParams::default());
        let primitives = &tree.buffers[0].primitives;
        assert_eq!(primitives.len(), 2);
        assert_eq!(primitives[0].material, Some(red));
        assert_eq!(primitives[1].material, Some(blue));
        assert_eq!(tree.materials.len(), 2);
    }

    #[test]
    fn test_instance_transforms_carried() {
        let model = finalized_cuboid();
        let tree = convert_model_to_render_tree(&model, &ConversionParams::default());
        assert_eq!(tree.instances[0].transform, Mat4::IDENTITY);
    }

    #[test]
    fn test_conversion_leaves_model_untouched() {
        let model = finalized_cuboid();
        let before = model.meshes()[0].triangles.clone();
        let _ = convert_model_to_render_tree(&model, &ConversionParams::default());
        assert_eq!(model.meshes()[0].triangles.len(), before.len());
    }
}
