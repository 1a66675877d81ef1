//! Finalize and validate: repair missing derived data, check referential
//! integrity, cache derived quantities.

use glam::DVec3;
use tracing::debug;

use super::color::Color;
use super::material::Material;
use super::mesh::Mesh;
use super::model::Model;
use super::quantities::model_bounding_box;

/// One referential-integrity violation. All violations found are reported;
/// none are silently dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntegrityIssue {
    VertexIndexOutOfRange { mesh: usize, triangle: usize, index: u32 },
    NormalIndexOutOfRange { mesh: usize, triangle: usize, index: u32 },
    UvIndexOutOfRange { mesh: usize, triangle: usize, index: u32 },
    MaterialIndexOutOfRange { mesh: usize, triangle: usize, index: u32 },
    InstancedMeshEmpty { mesh: usize },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VertexIndexOutOfRange { mesh, triangle, index } => {
                write!(f, "mesh {mesh} triangle {triangle}: vertex index {index} out of range")
            }
            Self::NormalIndexOutOfRange { mesh, triangle, index } => {
                write!(f, "mesh {mesh} triangle {triangle}: normal index {index} out of range")
            }
            Self::UvIndexOutOfRange { mesh, triangle, index } => {
                write!(f, "mesh {mesh} triangle {triangle}: uv index {index} out of range")
            }
            Self::MaterialIndexOutOfRange { mesh, triangle, index } => {
                write!(f, "mesh {mesh} triangle {triangle}: material index {index} out of range")
            }
            Self::InstancedMeshEmpty { mesh } => {
                write!(f, "mesh {mesh} is instanced but empty")
            }
        }
    }
}

/// Options for the repair pass, carried over from import settings.
#[derive(Clone, Debug)]
pub struct FinalizeParams {
    /// Color of the shared default material.
    pub default_color: Color,
    /// Whether the default material is created transparent.
    pub default_material_transparent: bool,
}

impl Default for FinalizeParams {
    fn default() -> Self {
        Self {
            default_color: Color::rgb(200, 200, 200),
            default_material_transparent: false,
        }
    }
}

/// Verify every index reference in the model is in range and every
/// instanced mesh is non-empty. Zero tolerance.
pub fn check_model(model: &Model) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    let material_count = model.materials().len() as u32;

    for (m, mesh) in model.meshes().iter().enumerate() {
        let vertex_count = mesh.positions.len() as u32;
        let normal_count = mesh.normals.len() as u32;
        let uv_count = mesh.uvs.len() as u32;

        for (t, tri) in mesh.triangles.iter().enumerate() {
            for &v in &tri.vertices {
                if v >= vertex_count {
                    issues.push(IntegrityIssue::VertexIndexOutOfRange { mesh: m, triangle: t, index: v });
                }
            }
            if let Some(normals) = tri.normals {
                for &n in &normals {
                    if n >= normal_count {
                        issues.push(IntegrityIssue::NormalIndexOutOfRange { mesh: m, triangle: t, index: n });
                    }
                }
            }
            if let Some(uvs) = tri.uvs {
                for &uv in &uvs {
                    if uv >= uv_count {
                        issues.push(IntegrityIssue::UvIndexOutOfRange { mesh: m, triangle: t, index: uv });
                    }
                }
            }
            if let Some(mat) = tri.material {
                if mat >= material_count {
                    issues.push(IntegrityIssue::MaterialIndexOutOfRange { mesh: m, triangle: t, index: mat });
                }
            }
        }
    }

    for instance in model.instances() {
        if model.mesh(instance.mesh).is_empty() {
            let issue = IntegrityIssue::InstancedMeshEmpty { mesh: instance.mesh.0 };
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
    }

    issues
}

/// Repair missing derived data and cache derived quantities.
///
/// - Meshes without vertex normals get them as the unweighted average of
///   adjacent triangle unit normals, normalized to unit length.
/// - Triangles without a material get a single shared default material,
///   created on demand and deduplicated by structural equality.
/// - Instance world transforms and the model bounding box are recomputed.
///
/// Idempotent: a second invocation on an already-finalized model leaves
/// all derived data byte-for-byte identical.
pub fn finalize_model(model: &mut Model, params: &FinalizeParams) {
    let mesh_count = model.meshes().len();
    for m in 0..mesh_count {
        let mesh = model.mesh_mut(super::model::MeshId(m));
        if mesh.normals.is_empty() && !mesh.is_empty() {
            calculate_vertex_normals(mesh);
        }
    }

    assign_default_material(model, params);

    model.compute_world_transforms();
    model.cached_bounds = Some(model_bounding_box(model));
    debug!(meshes = mesh_count, "model finalized");
}

/// Fill per-vertex normals as the unweighted average of adjacent triangle
/// unit normals, and point every triangle's normal indices at its vertices.
fn calculate_vertex_normals(mesh: &mut Mesh) {
    let mut sums = vec![DVec3::ZERO; mesh.positions.len()];
    for t in 0..mesh.triangles.len() {
        let normal = mesh.triangle_normal(t);
        for &v in &mesh.triangles[t].vertices {
            sums[v as usize] += normal;
        }
    }
    mesh.normals = sums
        .into_iter()
        .map(|n| {
            let unit = n.normalize_or_zero();
            // Isolated vertices keep a deterministic placeholder
            if unit == DVec3::ZERO {
                DVec3::Z
            } else {
                unit
            }
        })
        .collect();
    for tri in &mut mesh.triangles {
        if tri.normals.is_none() {
            tri.normals = Some(tri.vertices);
        }
    }
}

fn assign_default_material(model: &mut Model, params: &FinalizeParams) {
    let needs_default = model
        .meshes()
        .iter()
        .any(|mesh| mesh.triangles.iter().any(|t| t.material.is_none()));
    if !needs_default {
        return;
    }

    let mut default = Material::phong("Default", params.default_color);
    if params.default_material_transparent {
        default.base_mut().transparent = true;
    }
    let index = match model.find_material(&default) {
        Some(index) => index,
        None => model.add_material(default),
    };

    let mesh_count = model.meshes().len();
    for m in 0..mesh_count {
        let mesh = model.mesh_mut(super::model::MeshId(m));
        for tri in &mut mesh.triangles {
            if tri.material.is_none() {
                tri.material = Some(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generator::{generate_cuboid, GeneratorParams};
    use crate::model::Triangle;
    use crate::util::{is_eq_eps, EPS};

    #[test]
    fn test_finalize_fills_unit_normals() {
        let mut model = generate_cuboid(&GeneratorParams::default(), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());

        let mesh = &model.meshes()[0];
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        for n in &mesh.normals {
            assert!(is_eq_eps(n.length(), 1.0, 1.0e-6));
        }
        for t in &mesh.triangles {
            assert!(t.normals.is_some());
        }
    }

    #[test]
    fn test_finalize_assigns_shared_default_material() {
        let mut model = generate_cuboid(&GeneratorParams::default(), 1.0, 1.0, 1.0);
        assert!(model.materials().is_empty());
        finalize_model(&mut model, &FinalizeParams::default());

        assert_eq!(model.materials().len(), 1);
        let mesh = &model.meshes()[0];
        assert!(mesh.triangles.iter().all(|t| t.material == Some(0)));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut model = generate_cuboid(&GeneratorParams::default(), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());
        let normals = model.meshes()[0].normals.clone();
        let materials = model.materials().to_vec();
        let bounds = *model.bounding_box().unwrap();

        finalize_model(&mut model, &FinalizeParams::default());
        assert_eq!(model.meshes()[0].normals, normals);
        assert_eq!(model.materials().to_vec(), materials);
        assert_eq!(*model.bounding_box().unwrap(), bounds);
    }

    #[test]
    fn test_check_model_clean() {
        let mut model = generate_cuboid(&GeneratorParams::default(), 1.0, 1.0, 1.0);
        finalize_model(&mut model, &FinalizeParams::default());
        assert!(check_model(&model).is_empty());
    }

    #[test]
    fn test_check_model_reports_corrupted_index() {
        let mut model = generate_cuboid(&GeneratorParams::default(), 1.0, 1.0, 1.0);
        let mesh_id = crate::model::MeshId(0);
        model.mesh_mut(mesh_id).triangles[0].vertices[1] = 999;
        model.mesh_mut(mesh_id).triangles[3].material = Some(42);

        let issues = check_model(&model);
        assert!(issues.contains(&IntegrityIssue::VertexIndexOutOfRange {
            mesh: 0,
            triangle: 0,
            index: 999
        }));
        assert!(issues.contains(&IntegrityIssue::MaterialIndexOutOfRange {
            mesh: 0,
            triangle: 3,
            index: 42
        }));
    }

    #[test]
    fn test_check_model_reports_empty_instanced_mesh() {
        let mut model = crate::model::Model::new();
        model.add_mesh_to_root(crate::model::Mesh::new("empty"));
        let issues = check_model(&model);
        assert_eq!(issues, vec![IntegrityIssue::InstancedMeshEmpty { mesh: 0 }]);
    }

    #[test]
    fn test_existing_normals_untouched() {
        let mut model = crate::model::Model::new();
        let mut mesh = crate::model::Mesh::new("tri");
        mesh.add_vertex(glam::DVec3::ZERO);
        mesh.add_vertex(glam::DVec3::X);
        mesh.add_vertex(glam::DVec3::Y);
        let n = mesh.add_normal(glam::DVec3::Z);
        mesh.add_triangle(Triangle::new([0, 1, 2]).with_normals([n, n, n]));
        model.add_mesh_to_root(mesh);

        finalize_model(&mut model, &FinalizeParams::default());
        let mesh = &model.meshes()[0];
        assert_eq!(mesh.normals.len(), 1);
        assert!(is_eq_eps((mesh.normals[0] - glam::DVec3::Z).length(), 0.0, EPS));
    }
}
