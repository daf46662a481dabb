//! Rigid transforms (4x4 homogeneous) and dual quaternions.

use std::ops::Mul;

use nalgebra::{Rotation3, Translation3};
use thiserror::Error;

use crate::{Iso3, Mat3, Mat4, Quat, Real, UnitQuat, Vec3};

/// Default tolerance for `|R^T R - I|` and `|det R - 1|`.
pub const ORTHONORMAL_TOLERANCE: Real = 1e-6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("non-finite entries in transform")]
    NonFinite,
    #[error("bottom row must be [0, 0, 0, 1], got {0:?}")]
    BadBottomRow([Real; 4]),
    #[error("rotation block is not orthonormal (|R^T R - I| = {0:e})")]
    NotOrthonormal(Real),
    #[error("rotation block has determinant {0}, expected +1")]
    Reflection(Real),
}

/// Homogeneous rigid transform `[R t; 0 1]` with `R` in SO(3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    rotation: Mat3,
    translation: Vec3,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Mat3::identity(),
            translation: Vec3::zeros(),
        }
    }

    /// Build from a rotation block and translation, checking that the
    /// rotation is orthonormal with `det = +1` within [`ORTHONORMAL_TOLERANCE`].
    pub fn new(rotation: Mat3, translation: Vec3) -> Result<Self, TransformError> {
        Self::with_tolerance(rotation, translation, ORTHONORMAL_TOLERANCE)
    }

    pub fn with_tolerance(
        rotation: Mat3,
        translation: Vec3,
        tolerance: Real,
    ) -> Result<Self, TransformError> {
        if rotation
            .iter()
            .chain(translation.iter())
            .any(|v| !v.is_finite())
        {
            return Err(TransformError::NonFinite);
        }
        let ortho_err = (rotation.transpose() * rotation - Mat3::identity()).norm();
        if ortho_err > tolerance {
            return Err(TransformError::NotOrthonormal(ortho_err));
        }
        let det = rotation.determinant();
        if (det - 1.0).abs() > tolerance {
            return Err(TransformError::Reflection(det));
        }
        Ok(Self {
            rotation,
            translation,
        })
    }

    /// Parse a 4x4 homogeneous matrix.
    pub fn from_matrix(m: &Mat4) -> Result<Self, TransformError> {
        Self::from_matrix_with_tolerance(m, ORTHONORMAL_TOLERANCE)
    }

    pub fn from_matrix_with_tolerance(m: &Mat4, tolerance: Real) -> Result<Self, TransformError> {
        if m.iter().any(|v| !v.is_finite()) {
            return Err(TransformError::NonFinite);
        }
        let bottom = [m[(3, 0)], m[(3, 1)], m[(3, 2)], m[(3, 3)]];
        let expected = [0.0, 0.0, 0.0, 1.0];
        if bottom
            .iter()
            .zip(expected.iter())
            .any(|(a, b)| (a - b).abs() > tolerance)
        {
            return Err(TransformError::BadBottomRow(bottom));
        }
        let rotation: Mat3 = m.fixed_view::<3, 3>(0, 0).into_owned();
        let translation: Vec3 = m.fixed_view::<3, 1>(0, 3).into_owned();
        Self::with_tolerance(rotation, translation, tolerance)
    }

    pub fn from_isometry(iso: &Iso3) -> Self {
        Self {
            rotation: iso.rotation.to_rotation_matrix().into_inner(),
            translation: iso.translation.vector,
        }
    }

    pub fn rotation(&self) -> &Mat3 {
        &self.rotation
    }

    pub fn translation(&self) -> &Vec3 {
        &self.translation
    }

    pub fn to_matrix(&self) -> Mat4 {
        let mut m = Mat4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.rotation);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    pub fn to_isometry(&self) -> Iso3 {
        let rot = UnitQuat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.rotation));
        Iso3::from_parts(Translation3::from(self.translation), rot)
    }

    pub fn inverse(&self) -> Self {
        let rt = self.rotation.transpose();
        Self {
            rotation: rt,
            translation: -(rt * self.translation),
        }
    }

    pub fn transform_point(&self, p: &Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: RigidTransform) -> RigidTransform {
        &self * &rhs
    }
}

impl<'a> Mul<&'a RigidTransform> for &'a RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: &'a RigidTransform) -> RigidTransform {
        RigidTransform {
            rotation: self.rotation * rhs.rotation,
            translation: self.rotation * rhs.translation + self.translation,
        }
    }
}

/// Dual quaternion `q + eps q'` of a rigid motion.
///
/// `real` is the rotation quaternion with `w >= 0`, `dual = 0.5 * (0, t) * real`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuaternion {
    pub real: UnitQuat,
    pub dual: Quat,
}

impl DualQuaternion {
    pub fn from_transform(t: &RigidTransform) -> Self {
        let mut real =
            UnitQuat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(t.rotation));
        if real.w < 0.0 {
            real = UnitQuat::new_unchecked(-real.into_inner());
        }
        let dual = Quat::from_imag(t.translation) * real.into_inner() * 0.5;
        Self { real, dual }
    }

    /// Translation `2 * dual * conj(real)`.
    pub fn translation(&self) -> Vec3 {
        (self.dual * self.real.quaternion().conjugate()).imag() * 2.0
    }

    pub fn to_transform(&self) -> RigidTransform {
        RigidTransform {
            rotation: self.real.to_rotation_matrix().into_inner(),
            translation: self.translation(),
        }
    }

    /// `[w, x, y, z, w', x', y', z']`.
    pub fn to_array(&self) -> [Real; 8] {
        let q = self.real.quaternion();
        let d = &self.dual;
        [q.w, q.i, q.j, q.k, d.w, d.i, d.j, d.k]
    }
}
