//! Triangle mesh storage.

use glam::{DVec2, DVec3};

use super::color::Color;
use super::property::PropertyGroup;

/// One triangle record: indices into the owning mesh's attribute arrays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    /// Vertex position indices, counter-clockwise = outward.
    pub vertices: [u32; 3],
    /// Per-corner normal indices, filled in by finalize when absent.
    pub normals: Option<[u32; 3]>,
    /// Per-corner UV indices.
    pub uvs: Option<[u32; 3]>,
    /// Index into the model's material table; finalize assigns the shared
    /// default material when absent.
    pub material: Option<u32>,
    /// Per-triangle override color (some mesh formats carry face colors).
    pub color: Option<Color>,
}

impl Triangle {
    /// Triangle from position indices only.
    pub fn new(vertices: [u32; 3]) -> Self {
        Self { vertices, normals: None, uvs: None, material: None, color: None }
    }

    /// Builder-style normal indices.
    pub fn with_normals(mut self, normals: [u32; 3]) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Builder-style UV indices.
    pub fn with_uvs(mut self, uvs: [u32; 3]) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Builder-style material index.
    pub fn with_material(mut self, material: u32) -> Self {
        self.material = Some(material);
        self
    }
}

/// A mesh: attribute arrays plus an ordered triangle list.
///
/// Mutated only during decode and finalize; treated as immutable for the
/// rest of a pipeline run so concurrent readers need no locking.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<DVec3>,
    pub normals: Vec<DVec3>,
    pub uvs: Vec<DVec2>,
    /// Optional per-vertex colors, parallel to `positions` when present.
    pub colors: Vec<Color>,
    pub triangles: Vec<Triangle>,
    pub property_groups: Vec<PropertyGroup>,
}

impl Mesh {
    /// Create an empty named mesh.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Append a vertex position, returning its index.
    pub fn add_vertex(&mut self, position: DVec3) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    /// Append a normal, returning its index.
    pub fn add_normal(&mut self, normal: DVec3) -> u32 {
        self.normals.push(normal);
        (self.normals.len() - 1) as u32
    }

    /// Append a UV coordinate, returning its index.
    pub fn add_uv(&mut self, uv: DVec2) -> u32 {
        self.uvs.push(uv);
        (self.uvs.len() - 1) as u32
    }

    /// Append a triangle, returning its index.
    pub fn add_triangle(&mut self, triangle: Triangle) -> u32 {
        self.triangles.push(triangle);
        (self.triangles.len() - 1) as u32
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True when the mesh has no renderable geometry.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.triangles.is_empty()
    }

    /// Unit normal of one triangle; zero for degenerate triangles.
    pub fn triangle_normal(&self, index: usize) -> DVec3 {
        let t = &self.triangles[index];
        let v0 = self.positions[t.vertices[0] as usize];
        let v1 = self.positions[t.vertices[1] as usize];
        let v2 = self.positions[t.vertices[2] as usize];
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }

    /// Flip the winding of every triangle in place.
    pub fn flip_triangle_orientation(&mut self) {
        for t in &mut self.triangles {
            t.vertices.swap(1, 2);
            if let Some(n) = &mut t.normals {
                n.swap(1, 2);
            }
            if let Some(uv) = &mut t.uvs {
                uv.swap(1, 2);
            }
        }
    }
}
