//! Procedural primitive producers.
//!
//! Convenience constructors of valid single-mesh models for demos and
//! tests; not part of the core decode/encode logic. All primitives are
//! wound counter-clockwise outward.

use std::f64::consts::{PI, TAU};

use glam::DVec3;

use super::color::Color;
use super::material::Material;
use super::mesh::{Mesh, Triangle};
use super::model::Model;

/// Shared generator options.
#[derive(Clone, Debug)]
pub struct GeneratorParams {
    pub name: String,
    /// Material assigned to every generated triangle; finalize supplies the
    /// default when absent.
    pub material: Option<Material>,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self { name: "generated".to_string(), material: None }
    }
}

impl GeneratorParams {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), material: None }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.material = Some(Material::phong(self.name.clone(), color));
        self
    }
}

fn into_model(params: &GeneratorParams, mut mesh: Mesh) -> Model {
    let mut model = Model::new();
    if let Some(material) = &params.material {
        let index = model.add_material(material.clone());
        for t in &mut mesh.triangles {
            t.material = Some(index);
        }
    }
    model.add_mesh_to_root(mesh);
    model
}

/// Axis-aligned cuboid centered at the origin.
pub fn generate_cuboid(params: &GeneratorParams, sx: f64, sy: f64, sz: f64) -> Model {
    let (hx, hy, hz) = (sx * 0.5, sy * 0.5, sz * 0.5);
    let mut mesh = Mesh::new(params.name.clone());

    let corners = [
        DVec3::new(-hx, -hy, -hz),
        DVec3::new(hx, -hy, -hz),
        DVec3::new(hx, hy, -hz),
        DVec3::new(-hx, hy, -hz),
        DVec3::new(-hx, -hy, hz),
        DVec3::new(hx, -hy, hz),
        DVec3::new(hx, hy, hz),
        DVec3::new(-hx, hy, hz),
    ];
    for c in corners {
        mesh.add_vertex(c);
    }

    // Two CCW-outward triangles per face
    const FACES: [[u32; 3]; 12] = [
        [4, 5, 6], [4, 6, 7], // +z
        [0, 3, 2], [0, 2, 1], // -z
        [1, 2, 6], [1, 6, 5], // +x
        [0, 4, 7], [0, 7, 3], // -x
        [3, 7, 6], [3, 6, 2], // +y
        [0, 1, 5], [0, 5, 4], // -y
    ];
    for face in FACES {
        mesh.add_triangle(Triangle::new(face));
    }

    into_model(params, mesh)
}

/// UV sphere centered at the origin.
pub fn generate_sphere(params: &GeneratorParams, radius: f64, segments: usize) -> Model {
    let segments = segments.max(3);
    let rings = segments.max(2);
    let mut mesh = Mesh::new(params.name.clone());

    // Poles are single vertices; rings in between
    let top = mesh.add_vertex(DVec3::new(0.0, 0.0, radius));
    for ring in 1..rings {
        let phi = PI * ring as f64 / rings as f64;
        let (sin_phi, cos_phi) = phi.sin_cos();
        for seg in 0..segments {
            let theta = TAU * seg as f64 / segments as f64;
            mesh.add_vertex(DVec3::new(
                radius * sin_phi * theta.cos(),
                radius * sin_phi * theta.sin(),
                radius * cos_phi,
            ));
        }
    }
    let bottom = mesh.add_vertex(DVec3::new(0.0, 0.0, -radius));

    let ring_start = |ring: usize| 1 + (ring - 1) * segments;

    // Top cap
    for seg in 0..segments {
        let a = (ring_start(1) + seg) as u32;
        let b = (ring_start(1) + (seg + 1) % segments) as u32;
        mesh.add_triangle(Triangle::new([top, a, b]));
    }
    // Body quads
    for ring in 1..rings - 1 {
        for seg in 0..segments {
            let a = (ring_start(ring) + seg) as u32;
            let b = (ring_start(ring) + (seg + 1) % segments) as u32;
            let c = (ring_start(ring + 1) + seg) as u32;
            let d = (ring_start(ring + 1) + (seg + 1) % segments) as u32;
            mesh.add_triangle(Triangle::new([a, c, d]));
            mesh.add_triangle(Triangle::new([a, d, b]));
        }
    }
    // Bottom cap
    for seg in 0..segments {
        let a = (ring_start(rings - 1) + seg) as u32;
        let b = (ring_start(rings - 1) + (seg + 1) % segments) as u32;
        mesh.add_triangle(Triangle::new([bottom, b, a]));
    }

    into_model(params, mesh)
}

/// Cylinder along the Z axis, centered at the origin, closed with caps.
pub fn generate_cylinder(params: &GeneratorParams, radius: f64, height: f64, segments: usize) -> Model {
    let segments = segments.max(3);
    let h = height * 0.5;
    let mut mesh = Mesh::new(params.name.clone());

    for &z in &[-h, h] {
        for seg in 0..segments {
            let theta = TAU * seg as f64 / segments as f64;
            mesh.add_vertex(DVec3::new(radius * theta.cos(), radius * theta.sin(), z));
        }
    }
    let bottom_center = mesh.add_vertex(DVec3::new(0.0, 0.0, -h));
    let top_center = mesh.add_vertex(DVec3::new(0.0, 0.0, h));

    for seg in 0..segments {
        let next = (seg + 1) % segments;
        let (b0, b1) = (seg as u32, next as u32);
        let (t0, t1) = ((segments + seg) as u32, (segments + next) as u32);
        // Side
        mesh.add_triangle(Triangle::new([b0, b1, t1]));
        mesh.add_triangle(Triangle::new([b0, t1, t0]));
        // Caps
        mesh.add_triangle(Triangle::new([bottom_center, b1, b0]));
        mesh.add_triangle(Triangle::new([top_center, t0, t1]));
    }

    into_model(params, mesh)
}

/// Cone along the Z axis with its base at -height/2.
pub fn generate_cone(params: &GeneratorParams, radius: f64, height: f64, segments: usize) -> Model {
    let segments = segments.max(3);
    let h = height * 0.5;
    let mut mesh = Mesh::new(params.name.clone());

    for seg in 0..segments {
        let theta = TAU * seg as f64 / segments as f64;
        mesh.add_vertex(DVec3::new(radius * theta.cos(), radius * theta.sin(), -h));
    }
    let apex = mesh.add_vertex(DVec3::new(0.0, 0.0, h));
    let base_center = mesh.add_vertex(DVec3::new(0.0, 0.0, -h));

    for seg in 0..segments {
        let next = (seg + 1) % segments;
        mesh.add_triangle(Triangle::new([seg as u32, next as u32, apex]));
        mesh.add_triangle(Triangle::new([base_center, next as u32, seg as u32]));
    }

    into_model(params, mesh)
}

/// The five regular polyhedra.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatonicSolid {
    Tetrahedron,
    Hexahedron,
    Octahedron,
    Dodecahedron,
    Icosahedron,
}

/// Platonic solid centered at the origin with the given circumradius.
pub fn generate_platonic_solid(params: &GeneratorParams, solid: PlatonicSolid, radius: f64) -> Model {
    let (vertices, faces) = match solid {
        PlatonicSolid::Tetrahedron => tetrahedron(),
        PlatonicSolid::Hexahedron => hexahedron(),
        PlatonicSolid::Octahedron => octahedron(),
        PlatonicSolid::Dodecahedron => dodecahedron(),
        PlatonicSolid::Icosahedron => icosahedron(),
    };

    let mut mesh = Mesh::new(params.name.clone());
    for v in vertices {
        mesh.add_vertex(v.normalize() * radius);
    }
    // Faces are convex polygons wound counter-clockwise outward
    for face in faces {
        for i in 1..face.len() - 1 {
            mesh.add_triangle(Triangle::new([face[0], face[i], face[i + 1]]));
        }
    }
    into_model(params, mesh)
}

fn tetrahedron() -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let vertices = vec![
        DVec3::new(1.0, 1.0, 1.0),
        DVec3::new(1.0, -1.0, -1.0),
        DVec3::new(-1.0, 1.0, -1.0),
        DVec3::new(-1.0, -1.0, 1.0),
    ];
    let faces = vec![vec![0, 1, 2], vec![0, 3, 1], vec![0, 2, 3], vec![1, 3, 2]];
    (vertices, faces)
}

fn hexahedron() -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let vertices = vec![
        DVec3::new(-1.0, -1.0, -1.0),
        DVec3::new(1.0, -1.0, -1.0),
        DVec3::new(1.0, 1.0, -1.0),
        DVec3::new(-1.0, 1.0, -1.0),
        DVec3::new(-1.0, -1.0, 1.0),
        DVec3::new(1.0, -1.0, 1.0),
        DVec3::new(1.0, 1.0, 1.0),
        DVec3::new(-1.0, 1.0, 1.0),
    ];
    let faces = vec![
        vec![4, 5, 6, 7],
        vec![0, 3, 2, 1],
        vec![1, 2, 6, 5],
        vec![0, 4, 7, 3],
        vec![3, 7, 6, 2],
        vec![0, 1, 5, 4],
    ];
    (vertices, faces)
}

fn octahedron() -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let vertices = vec![
        DVec3::X,
        DVec3::NEG_X,
        DVec3::Y,
        DVec3::NEG_Y,
        DVec3::Z,
        DVec3::NEG_Z,
    ];
    let faces = vec![
        vec![0, 2, 4],
        vec![2, 1, 4],
        vec![1, 3, 4],
        vec![3, 0, 4],
        vec![2, 0, 5],
        vec![1, 2, 5],
        vec![3, 1, 5],
        vec![0, 3, 5],
    ];
    (vertices, faces)
}

fn icosahedron() -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let t = (1.0 + 5.0f64.sqrt()) / 2.0;
    let vertices = vec![
        DVec3::new(-1.0, t, 0.0),
        DVec3::new(1.0, t, 0.0),
        DVec3::new(-1.0, -t, 0.0),
        DVec3::new(1.0, -t, 0.0),
        DVec3::new(0.0, -1.0, t),
        DVec3::new(0.0, 1.0, t),
        DVec3::new(0.0, -1.0, -t),
        DVec3::new(0.0, 1.0, -t),
        DVec3::new(t, 0.0, -1.0),
        DVec3::new(t, 0.0, 1.0),
        DVec3::new(-t, 0.0, -1.0),
        DVec3::new(-t, 0.0, 1.0),
    ];
    let faces = vec![
        vec![0, 11, 5],
        vec![0, 5, 1],
        vec![0, 1, 7],
        vec![0, 7, 10],
        vec![0, 10, 11],
        vec![1, 5, 9],
        vec![5, 11, 4],
        vec![11, 10, 2],
        vec![10, 7, 6],
        vec![7, 1, 8],
        vec![3, 9, 4],
        vec![3, 4, 2],
        vec![3, 2, 6],
        vec![3, 6, 8],
        vec![3, 8, 9],
        vec![4, 9, 5],
        vec![2, 4, 11],
        vec![6, 2, 10],
        vec![8, 6, 7],
        vec![9, 8, 1],
    ];
    (vertices, faces)
}

/// Dual of the icosahedron: face centroids become vertices, one pentagon
/// per icosahedron vertex, ordered by angle around the outward axis.
fn dodecahedron() -> (Vec<DVec3>, Vec<Vec<u32>>) {
    let (ico_vertices, ico_faces) = icosahedron();
    let vertices: Vec<DVec3> = ico_faces
        .iter()
        .map(|f| {
            (ico_vertices[f[0] as usize]
                + ico_vertices[f[1] as usize]
                + ico_vertices[f[2] as usize])
                / 3.0
        })
        .collect();

    let mut faces = Vec::with_capacity(ico_vertices.len());
    for (v, vertex) in ico_vertices.iter().enumerate() {
        let mut ring: Vec<u32> = ico_faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.contains(&(v as u32)))
            .map(|(i, _)| i as u32)
            .collect();

        let axis = vertex.normalize();
        let first = vertices[ring[0] as usize];
        let reference = (first - axis * first.dot(axis)).normalize();
        let bitangent = axis.cross(reference);
        let angle = |i: u32| {
            let p = vertices[i as usize];
            p.dot(bitangent).atan2(p.dot(reference))
        };
        ring.sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));
        faces.push(ring);
    }
    (vertices, faces)
}
