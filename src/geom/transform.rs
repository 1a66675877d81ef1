//! Rigid transform with scale, as stored on scene nodes.

use crate::util::{is_eq, is_eq_vec3, DMat4, DQuat, DVec3};

/// Rotation + translation + scale, composed into a matrix on demand.
///
/// Node-local transforms are kept decomposed so exporters can write TRS
/// forms directly; world transforms accumulated at finalize time are plain
/// matrices.
#[derive(Clone, Copy, Debug)]
pub struct Transformation {
    pub rotation: DQuat,
    pub translation: DVec3,
    pub scale: DVec3,
}

impl Transformation {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
        scale: DVec3::ONE,
    };

    /// Create from rotation, translation and scale.
    pub fn new(rotation: DQuat, translation: DVec3, scale: DVec3) -> Self {
        Self { rotation, translation, scale }
    }

    /// Create a pure translation.
    pub fn from_translation(translation: DVec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    /// Create from an arbitrary matrix by decomposing scale/rotation/translation.
    pub fn from_matrix(m: DMat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self { rotation, translation, scale }
    }

    /// Compose into a column-major matrix.
    #[inline]
    pub fn matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Transform a point.
    #[inline]
    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.matrix().transform_point3(p)
    }

    /// Check against identity with the tight tolerance.
    pub fn is_identity(&self) -> bool {
        is_eq_vec3(self.translation, DVec3::ZERO)
            && is_eq_vec3(self.scale, DVec3::ONE)
            && is_eq(self.rotation.x, 0.0)
            && is_eq(self.rotation.y, 0.0)
            && is_eq(self.rotation.z, 0.0)
            && is_eq(self.rotation.w.abs(), 1.0)
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Epsilon equality for transforms.
pub fn transformation_is_eq(a: &Transformation, b: &Transformation) -> bool {
    is_eq_vec3(a.translation, b.translation)
        && is_eq_vec3(a.scale, b.scale)
        && is_eq(a.rotation.x, b.rotation.x)
        && is_eq(a.rotation.y, b.rotation.y)
        && is_eq(a.rotation.z, b.rotation.z)
        && is_eq(a.rotation.w, b.rotation.w)
}
