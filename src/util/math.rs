//! Math type re-exports and epsilon-tolerant comparison helpers.
//!
//! All tolerance choices in the crate live here: topology, octree and
//! bounding-box code go through [`is_zero`] / [`is_eq`] / [`is_eq_eps`]
//! rather than comparing floats directly.

// Re-export glam types used across the crate
pub use glam::{DMat4, DQuat, DVec2, DVec3, Mat4, Quat, Vec2, Vec3};

/// Tight tolerance, used for geometric identity checks.
pub const EPS: f64 = 1.0e-8;

/// Loose tolerance, used where accumulated floating error is expected
/// (volume/area sums, merged bounding boxes).
pub const BIG_EPS: f64 = 1.0e-4;

/// Check a value against zero with the tight tolerance.
#[inline]
pub fn is_zero(a: f64) -> bool {
    a.abs() < EPS
}

/// Compare two values with the tight tolerance.
#[inline]
pub fn is_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

/// Compare two values with an explicit tolerance.
#[inline]
pub fn is_eq_eps(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

/// Componentwise epsilon comparison of two points.
#[inline]
pub fn is_eq_vec3(a: DVec3, b: DVec3) -> bool {
    is_eq(a.x, b.x) && is_eq(a.y, b.y) && is_eq(a.z, b.z)
}

/// 3D axis-aligned bounding box, double precision.
///
/// Starts inverted (min = +inf, max = -inf) and becomes valid on the first
/// expansion.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox3 {
    pub min: DVec3,
    pub max: DVec3,
}

impl BBox3 {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Check if this box is empty (never expanded).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn expand_by_box(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Get the center of the box.
    #[inline]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (extents) of the box.
    #[inline]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// The 8 corner points.
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }

    /// Overlap test against another box (boundary contact counts).
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Containment test for a point (boundary counts).
    #[inline]
    pub fn contains_point(&self, p: DVec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

impl Default for BBox3 {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for BBox3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BBox3({:?} - {:?})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eps_compare() {
        assert!(is_zero(0.0));
        assert!(is_zero(1.0e-9));
        assert!(!is_zero(1.0e-7));
        assert!(is_eq(1.0, 1.0 + 1.0e-9));
        assert!(is_eq_eps(1.0, 1.00005, BIG_EPS));
        assert!(!is_eq_eps(1.0, 1.001, BIG_EPS));
    }

    #[test]
    fn test_bbox_expand() {
        let mut b = BBox3::EMPTY;
        assert!(b.is_empty());

        b.expand_by_point(DVec3::ZERO);
        assert!(!b.is_empty());

        b.expand_by_point(DVec3::ONE);
        assert_eq!(b.center(), DVec3::splat(0.5));
        assert_eq!(b.size(), DVec3::ONE);
    }

    #[test]
    fn test_bbox_intersects() {
        let a = BBox3::new(DVec3::ZERO, DVec3::ONE);
        let b = BBox3::new(DVec3::splat(0.5), DVec3::splat(2.0));
        let c = BBox3::new(DVec3::splat(1.5), DVec3::splat(2.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(b.intersects(&c)); // touching boundary counts
        assert!(!a.intersects(&BBox3::EMPTY));
    }

    #[test]
    fn test_bbox_corners() {
        let b = BBox3::new(DVec3::ZERO, DVec3::ONE);
        let corners = b.corners();
        assert_eq!(corners.len(), 8);
        for c in corners {
            assert!(b.contains_point(c));
        }
    }
}
