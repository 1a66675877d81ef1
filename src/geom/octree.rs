//! Octree spatial index over one mesh's triangles.
//!
//! The index stores triangle ids only, never geometry. Queries are
//! conservative: the result is a superset of the triangles truly
//! intersecting the probe region, and the caller prunes with an exact test.

use crate::model::Mesh;
use crate::util::BBox3;

/// Subdivision parameters.
///
/// The defaults are conservative; callers with unusual meshes (very deep
/// instancing, degenerate distributions) can tune them.
#[derive(Clone, Copy, Debug)]
pub struct OctreeParams {
    /// Maximum tree depth; a node at this depth never splits.
    pub max_depth: u32,
    /// A node splits into 8 children when it holds more triangles than this.
    pub max_triangles_per_node: usize,
}

impl Default for OctreeParams {
    fn default() -> Self {
        Self { max_depth: 8, max_triangles_per_node: 64 }
    }
}

/// One cell of the octree.
pub struct OctreeNode {
    bounds: BBox3,
    /// Triangle ids stored at this node; non-empty only for leaves.
    triangles: Vec<u32>,
    children: Option<Box<[OctreeNode; 8]>>,
}

impl OctreeNode {
    fn leaf(bounds: BBox3, triangles: Vec<u32>) -> Self {
        Self { bounds, triangles, children: None }
    }

    /// Bounds of this cell.
    pub fn bounds(&self) -> &BBox3 {
        &self.bounds
    }

    /// True when this cell has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn subdivide(&mut self, tri_bounds: &[BBox3], depth: u32, params: &OctreeParams) {
        if depth >= params.max_depth || self.triangles.len() <= params.max_triangles_per_node {
            return;
        }

        let center = self.bounds.center();
        let mut children = Vec::with_capacity(8);
        for octant in 0..8u32 {
            let min = self.bounds.min;
            let max = self.bounds.max;
            let child_min = glam::DVec3::new(
                if octant & 1 != 0 { center.x } else { min.x },
                if octant & 2 != 0 { center.y } else { min.y },
                if octant & 4 != 0 { center.z } else { min.z },
            );
            let child_max = glam::DVec3::new(
                if octant & 1 != 0 { max.x } else { center.x },
                if octant & 2 != 0 { max.y } else { center.y },
                if octant & 4 != 0 { max.z } else { center.z },
            );
            let child_bounds = BBox3::new(child_min, child_max);

            // A triangle lands in every child its bounding volume overlaps;
            // duplication keeps queries conservative.
            let child_tris: Vec<u32> = self
                .triangles
                .iter()
                .copied()
                .filter(|&t| child_bounds.intersects(&tri_bounds[t as usize]))
                .collect();
            children.push(OctreeNode::leaf(child_bounds, child_tris));
        }

        // A split that puts everything into one child makes no progress.
        let largest = children.iter().map(|c| c.triangles.len()).max().unwrap_or(0);
        if largest == self.triangles.len() {
            return;
        }

        let mut children: Box<[OctreeNode; 8]> = match children.try_into() {
            Ok(c) => c,
            Err(_) => unreachable!(),
        };
        for child in children.iter_mut() {
            child.subdivide(tri_bounds, depth + 1, params);
        }
        self.triangles.clear();
        self.triangles.shrink_to_fit();
        self.children = Some(children);
    }

    fn query_into(&self, region: &BBox3, out: &mut Vec<u32>) {
        if !self.bounds.intersects(region) {
            return;
        }
        match &self.children {
            Some(children) => {
                for child in children.iter() {
                    child.query_into(region, out);
                }
            }
            None => out.extend_from_slice(&self.triangles),
        }
    }
}

/// Spatial partition over a mesh's triangles.
///
/// Rebuilt from scratch whenever the source mesh changes; never serialized.
pub struct Octree {
    root: OctreeNode,
    triangle_count: usize,
}

impl Octree {
    /// Build an octree over the given mesh with default parameters.
    pub fn build(mesh: &Mesh) -> Self {
        Self::build_with_params(mesh, &OctreeParams::default())
    }

    /// Build an octree over the given mesh.
    pub fn build_with_params(mesh: &Mesh, params: &OctreeParams) -> Self {
        let tri_bounds: Vec<BBox3> = (0..mesh.triangle_count())
            .map(|t| {
                let tri = &mesh.triangles[t];
                let mut b = BBox3::EMPTY;
                for &v in &tri.vertices {
                    b.expand_by_point(mesh.positions[v as usize]);
                }
                b
            })
            .collect();

        let mut bounds = BBox3::EMPTY;
        for b in &tri_bounds {
            bounds.expand_by_box(b);
        }

        let all: Vec<u32> = (0..tri_bounds.len() as u32).collect();
        let mut root = OctreeNode::leaf(bounds, all);
        root.subdivide(&tri_bounds, 0, params);

        Self { root, triangle_count: tri_bounds.len() }
    }

    /// Number of triangles indexed.
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Root cell, for diagnostics.
    pub fn root(&self) -> &OctreeNode {
        &self.root
    }

    /// Collect the ids of all triangles whose cells overlap `region`.
    ///
    /// Returns a sorted, deduplicated superset of the truly intersecting
    /// triangles. No false negatives; false positives are expected.
    pub fn query(&self, region: &BBox3) -> Vec<u32> {
        let mut out = Vec::new();
        self.root.query_into(region, &mut out);
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mesh, Triangle};
    use glam::DVec3;

    fn grid_mesh(n: usize) -> Mesh {
        // n*n unit quads in the XY plane, two triangles each
        let mut mesh = Mesh::new("grid");
        for y in 0..=n {
            for x in 0..=n {
                mesh.positions.push(DVec3::new(x as f64, y as f64, 0.0));
            }
        }
        let stride = (n + 1) as u32;
        for y in 0..n as u32 {
            for x in 0..n as u32 {
                let a = y * stride + x;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                mesh.triangles.push(Triangle::new([a, b, d]));
                mesh.triangles.push(Triangle::new([a, d, c]));
            }
        }
        mesh
    }

    #[test]
    fn test_build_and_full_query() {
        let mesh = grid_mesh(8);
        let octree = Octree::build(&mesh);
        assert_eq!(octree.triangle_count(), 128);

        let all = octree.query(&BBox3::new(DVec3::splat(-1.0), DVec3::splat(10.0)));
        assert_eq!(all.len(), 128);
    }

    #[test]
    fn test_query_is_superset_of_brute_force() {
        let mesh = grid_mesh(8);
        let octree =
            Octree::build_with_params(&mesh, &OctreeParams { max_depth: 5, max_triangles_per_node: 4 });

        let region = BBox3::new(DVec3::new(2.2, 2.2, -0.5), DVec3::new(4.8, 3.6, 0.5));
        let hits = octree.query(&region);

        // Brute force over triangle bounding boxes
        for (t, tri) in mesh.triangles.iter().enumerate() {
            let mut b = BBox3::EMPTY;
            for &v in &tri.vertices {
                b.expand_by_point(mesh.positions[v as usize]);
            }
            if b.intersects(&region) {
                assert!(hits.contains(&(t as u32)), "missing triangle {}", t);
            }
        }
    }

    #[test]
    fn test_query_outside_is_empty() {
        let mesh = grid_mesh(4);
        let octree = Octree::build(&mesh);
        let hits = octree.query(&BBox3::new(DVec3::splat(100.0), DVec3::splat(101.0)));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_no_duplicates_in_result() {
        let mesh = grid_mesh(6);
        let octree =
            Octree::build_with_params(&mesh, &OctreeParams { max_depth: 6, max_triangles_per_node: 2 });
        let hits = octree.query(&BBox3::new(DVec3::splat(-1.0), DVec3::splat(10.0)));
        let mut unique = hits.clone();
        unique.dedup();
        assert_eq!(hits, unique);
    }
}
