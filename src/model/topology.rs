//! Derived adjacency structure computed from a mesh's raw triangle list.
//!
//! The topology is a read-only view: it is rebuilt on demand and never
//! persisted with the model. Winding convention throughout the crate:
//! counter-clockwise vertex order is outward-facing.

use std::collections::HashMap;

use smallvec::SmallVec;

use super::mesh::Mesh;

/// Per-vertex adjacency.
#[derive(Clone, Debug, Default)]
pub struct TopologyVertex {
    /// Incident triangle ids.
    pub triangles: SmallVec<[u32; 8]>,
    /// Incident undirected edge ids.
    pub edges: SmallVec<[u32; 8]>,
}

/// Undirected edge keyed by its sorted vertex pair.
#[derive(Clone, Debug)]
pub struct TopologyEdge {
    /// Smaller vertex index.
    pub v1: u32,
    /// Larger vertex index.
    pub v2: u32,
    /// Directed triangle-edges lying on this edge.
    pub triangle_edges: SmallVec<[u32; 2]>,
}

impl TopologyEdge {
    /// An edge is manifold-consistent when exactly two triangle-edges share
    /// it with opposite orientation.
    pub fn is_manifold(&self, triangle_edges: &[TopologyTriangleEdge]) -> bool {
        if self.triangle_edges.len() != 2 {
            return false;
        }
        let a = &triangle_edges[self.triangle_edges[0] as usize];
        let b = &triangle_edges[self.triangle_edges[1] as usize];
        a.from == b.to && a.to == b.from
    }
}

/// One directed edge of one triangle.
#[derive(Clone, Copy, Debug)]
pub struct TopologyTriangleEdge {
    pub from: u32,
    pub to: u32,
    /// Owning triangle id.
    pub triangle: u32,
    /// Undirected edge this lies on.
    pub edge: u32,
}

/// Per-triangle view of its three directed edges.
#[derive(Clone, Copy, Debug)]
pub struct TopologyTriangle {
    pub triangle_edges: [u32; 3],
}

/// Adjacency derived from a mesh.
pub struct Topology {
    pub vertices: Vec<TopologyVertex>,
    pub edges: Vec<TopologyEdge>,
    pub triangle_edges: Vec<TopologyTriangleEdge>,
    pub triangles: Vec<TopologyTriangle>,
}

impl Topology {
    /// Build adjacency for the given mesh.
    pub fn build(mesh: &Mesh) -> Self {
        let mut vertices = vec![TopologyVertex::default(); mesh.vertex_count()];
        let mut edges: Vec<TopologyEdge> = Vec::new();
        let mut triangle_edges: Vec<TopologyTriangleEdge> = Vec::new();
        let mut triangles: Vec<TopologyTriangle> = Vec::with_capacity(mesh.triangle_count());
        let mut edge_map: HashMap<(u32, u32), u32> = HashMap::new();

        for (t, tri) in mesh.triangles.iter().enumerate() {
            let t = t as u32;
            let mut tri_edge_ids = [0u32; 3];
            for corner in 0..3 {
                let from = tri.vertices[corner];
                let to = tri.vertices[(corner + 1) % 3];
                let key = (from.min(to), from.max(to));

                let edge_id = *edge_map.entry(key).or_insert_with(|| {
                    let id = edges.len() as u32;
                    edges.push(TopologyEdge {
                        v1: key.0,
                        v2: key.1,
                        triangle_edges: SmallVec::new(),
                    });
                    vertices[key.0 as usize].edges.push(id);
                    vertices[key.1 as usize].edges.push(id);
                    id
                });

                let te_id = triangle_edges.len() as u32;
                triangle_edges.push(TopologyTriangleEdge { from, to, triangle: t, edge: edge_id });
                edges[edge_id as usize].triangle_edges.push(te_id);
                tri_edge_ids[corner] = te_id;
            }
            for &v in &tri.vertices {
                vertices[v as usize].triangles.push(t);
            }
            triangles.push(TopologyTriangle { triangle_edges: tri_edge_ids });
        }

        Self { vertices, edges, triangle_edges, triangles }
    }

    /// True when every edge is manifold-consistent.
    pub fn is_manifold(&self) -> bool {
        self.edges.iter().all(|e| e.is_manifold(&self.triangle_edges))
    }

    /// Ids of edges that break manifold consistency.
    pub fn non_manifold_edges(&self) -> Vec<u32> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_manifold(&self.triangle_edges))
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// True when the triangles form a single edge-connected component.
    pub fn is_connected(&self) -> bool {
        if self.triangles.is_empty() {
            return false;
        }
        let mut visited = vec![false; self.triangles.len()];
        let mut stack = vec![0u32];
        visited[0] = true;
        let mut seen = 1usize;
        while let Some(t) = stack.pop() {
            for &te in &self.triangles[t as usize].triangle_edges {
                let edge = &self.edges[self.triangle_edges[te as usize].edge as usize];
                for &other_te in &edge.triangle_edges {
                    let other = self.triangle_edges[other_te as usize].triangle;
                    if !visited[other as usize] {
                        visited[other as usize] = true;
                        seen += 1;
                        stack.push(other);
                    }
                }
            }
        }
        seen == self.triangles.len()
    }
}

/// True when the mesh is a single closed, consistently wound 2-manifold.
///
/// Only then is [`crate::model::calculate_volume`] meaningful.
pub fn is_solid(mesh: &Mesh) -> bool {
    if mesh.is_empty() {
        return false;
    }
    let topology = Topology::build(mesh);
    topology.is_manifold() && topology.is_connected()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::generator::{generate_cuboid, GeneratorParams};
    use crate::model::Triangle;
    use glam::DVec3;

    fn cuboid_mesh() -> Mesh {
        let model = generate_cuboid(&GeneratorParams::default(), 1.0, 1.0, 1.0);
        model.meshes()[0].clone()
    }

    #[test]
    fn test_cuboid_topology_counts() {
        let mesh = cuboid_mesh();
        let topo = Topology::build(&mesh);
        assert_eq!(topo.vertices.len(), 8);
        assert_eq!(topo.triangles.len(), 12);
        // Closed cuboid: E = 3 * F / 2
        assert_eq!(topo.edges.len(), 18);
        assert_eq!(topo.triangle_edges.len(), 36);
    }

    #[test]
    fn test_cuboid_is_solid() {
        let mesh = cuboid_mesh();
        assert!(Topology::build(&mesh).is_manifold());
        assert!(is_solid(&mesh));
    }

    #[test]
    fn test_open_mesh_not_solid() {
        let mut mesh = cuboid_mesh();
        // Remove one face (two triangles)
        mesh.triangles.truncate(mesh.triangles.len() - 2);
        let topo = Topology::build(&mesh);
        assert!(!topo.is_manifold());
        assert!(!topo.non_manifold_edges().is_empty());
        assert!(!is_solid(&mesh));
    }

    #[test]
    fn test_inconsistent_winding_not_manifold() {
        let mut mesh = Mesh::new("two");
        mesh.add_vertex(DVec3::ZERO);
        mesh.add_vertex(DVec3::X);
        mesh.add_vertex(DVec3::Y);
        mesh.add_vertex(DVec3::new(1.0, 1.0, 0.0));
        // Both triangles traverse the shared edge 1->2 in the same direction
        mesh.add_triangle(Triangle::new([0, 1, 2]));
        mesh.add_triangle(Triangle::new([3, 1, 2]));

        let topo = Topology::build(&mesh);
        assert!(!topo.is_manifold());
    }

    #[test]
    fn test_disconnected_not_solid() {
        let mut mesh = cuboid_mesh();
        let other = cuboid_mesh();
        let offset = mesh.vertex_count() as u32;
        for p in &other.positions {
            mesh.add_vertex(*p + DVec3::splat(10.0));
        }
        for t in &other.triangles {
            let v = t.vertices;
            mesh.add_triangle(Triangle::new([v[0] + offset, v[1] + offset, v[2] + offset]));
        }
        let topo = Topology::build(&mesh);
        assert!(topo.is_manifold());
        assert!(!topo.is_connected());
        assert!(!is_solid(&mesh));
    }
}
