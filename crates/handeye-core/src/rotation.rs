//! Conversions between quaternions, Euler angles and rotation matrices.
//!
//! Conventions:
//! - quaternions are scalar-first `(w, x, y, z)` and are normalized before
//!   use; a zero quaternion is rejected,
//! - [`EulerZyx`] is the canonical Euler convention, `R = Rz(z) * Ry(y) * Rx(x)`,
//!   with the angle ranges of Eigen's `eulerAngles(2, 1, 0)`:
//!   `z` in `[0, pi]`, `y` and `x` in `[-pi, pi]`,
//! - [`EulerXyz`] is the alternative `R = Rx(x) * Ry(y) * Rz(z)` extraction
//!   (Eigen's `eulerAngles(0, 1, 2)`), kept for consumers that were written
//!   against it.
//!
//! Downstream tools compare these angles numerically, so the branch choices
//! in [`rotation_to_euler_zyx`] and [`rotation_to_euler_xyz`] must not change.

use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

use crate::{Mat3, Quat, Real, UnitQuat, Vec3};

/// Norm below which a quaternion is considered zero.
pub const QUATERNION_MIN_NORM: Real = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RotationError {
    #[error("quaternion norm {0:e} is too small to normalize")]
    ZeroQuaternion(Real),
    #[error("non-finite rotation input")]
    NonFinite,
}

/// Euler angles (radians) for `R = Rz(z) * Ry(y) * Rx(x)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerZyx {
    pub z: Real,
    pub y: Real,
    pub x: Real,
}

/// Euler angles (radians) for `R = Rx(x) * Ry(y) * Rz(z)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerXyz {
    pub x: Real,
    pub y: Real,
    pub z: Real,
}

impl EulerZyx {
    pub fn new(z: Real, y: Real, x: Real) -> Self {
        Self { z, y, x }
    }

    /// Angles in `x, y, z` order, the order used in CSV output.
    pub fn to_xyz_array(&self) -> [Real; 3] {
        [self.x, self.y, self.z]
    }
}

impl EulerXyz {
    pub fn new(x: Real, y: Real, z: Real) -> Self {
        Self { x, y, z }
    }
}

/// Rotation axis and angle extracted from a rotation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    /// `None` when the rotation is (numerically) the identity.
    pub axis: Option<Unit<Vec3>>,
    /// Rotation angle in `[0, pi]`.
    pub angle: Real,
}

impl AxisAngle {
    /// Axis-angle of a rotation matrix. `r` is assumed orthonormal; project
    /// it with [`crate::project_to_so3`] first if it comes from noisy data.
    pub fn from_rotation(r: &Mat3) -> Self {
        match Rotation3::from_matrix_unchecked(*r).axis_angle() {
            Some((axis, angle)) => Self {
                axis: Some(axis),
                angle,
            },
            None => Self {
                axis: None,
                angle: 0.0,
            },
        }
    }

    /// Rodrigues rotation vector `axis * angle` (zero for the identity).
    pub fn rotation_vector(&self) -> Vec3 {
        self.axis
            .map(|a| a.into_inner() * self.angle)
            .unwrap_or_else(Vec3::zeros)
    }

    /// Modified Rodrigues parameters `2 sin(angle / 2) * axis`.
    ///
    /// Returns `None` when the angle is at or below `min_angle`, where the
    /// axis is not well defined.
    pub fn modified_rodrigues(&self, min_angle: Real) -> Option<Vec3> {
        match self.axis {
            Some(axis) if self.angle > min_angle => {
                Some(axis.into_inner() * (2.0 * (0.5 * self.angle).sin()))
            }
            _ => None,
        }
    }
}

/// Normalize a scalar-first quaternion.
pub fn normalize_quaternion(q: &Quat) -> Result<UnitQuat, RotationError> {
    if q.coords.iter().any(|v| !v.is_finite()) {
        return Err(RotationError::NonFinite);
    }
    let norm = q.norm();
    if norm <= QUATERNION_MIN_NORM {
        return Err(RotationError::ZeroQuaternion(norm));
    }
    Ok(UnitQuat::new_unchecked(*q / norm))
}

/// Build a quaternion from scalar-first components.
pub fn quaternion_wxyz(w: Real, x: Real, y: Real, z: Real) -> Quat {
    Quat::new(w, x, y, z)
}

/// Scalar-first components `[w, x, y, z]`.
pub fn quaternion_to_wxyz(q: &Quat) -> [Real; 4] {
    [q.w, q.i, q.j, q.k]
}

/// Rotation matrix of a (not necessarily normalized) quaternion.
pub fn quaternion_to_rotation(q: &Quat) -> Result<Mat3, RotationError> {
    let unit = normalize_quaternion(q)?;
    Ok(unit.to_rotation_matrix().into_inner())
}

/// Unit quaternion of a rotation matrix, `w >= 0`.
pub fn rotation_to_quaternion(r: &Mat3) -> Result<UnitQuat, RotationError> {
    if r.iter().any(|v| !v.is_finite()) {
        return Err(RotationError::NonFinite);
    }
    let q = UnitQuat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*r));
    let q = normalize_quaternion(q.quaternion())?;
    if q.w < 0.0 {
        Ok(UnitQuat::new_unchecked(-q.into_inner()))
    } else {
        Ok(q)
    }
}

/// Quaternion of `Rz(z) * Ry(y) * Rx(x)`.
pub fn euler_to_quaternion(e: &EulerZyx) -> UnitQuat {
    UnitQuat::from_axis_angle(&Vector3::z_axis(), e.z)
        * UnitQuat::from_axis_angle(&Vector3::y_axis(), e.y)
        * UnitQuat::from_axis_angle(&Vector3::x_axis(), e.x)
}

/// Rotation matrix `Rz(z) * Ry(y) * Rx(x)`.
pub fn euler_to_rotation(e: &EulerZyx) -> Mat3 {
    euler_to_quaternion(e).to_rotation_matrix().into_inner()
}

/// Z-Y-X Euler angles of a (not necessarily normalized) quaternion.
pub fn quaternion_to_euler(q: &Quat) -> Result<EulerZyx, RotationError> {
    Ok(rotation_to_euler_zyx(&quaternion_to_rotation(q)?))
}

/// Z-Y-X Euler angles of a rotation matrix.
///
/// Follows Eigen's `eulerAngles(2, 1, 0)`: the first angle is kept in
/// `[0, pi]`, flipping the middle angle across `pi` when needed.
pub fn rotation_to_euler_zyx(m: &Mat3) -> EulerZyx {
    let mut z = m[(1, 0)].atan2(m[(0, 0)]);
    let c2 = m[(2, 2)].hypot(m[(2, 1)]);
    let y = if z < 0.0 {
        z += PI;
        (-m[(2, 0)]).atan2(-c2)
    } else {
        (-m[(2, 0)]).atan2(c2)
    };
    let (s1, c1) = z.sin_cos();
    let x = (s1 * m[(0, 2)] - c1 * m[(1, 2)]).atan2(c1 * m[(1, 1)] - s1 * m[(0, 1)]);
    EulerZyx { z, y, x }
}

/// X-Y-Z Euler angles of a rotation matrix.
///
/// Follows Eigen's `eulerAngles(0, 1, 2)`: `x` ends up in `[0, pi]`.
pub fn rotation_to_euler_xyz(m: &Mat3) -> EulerXyz {
    let mut a = m[(1, 2)].atan2(m[(2, 2)]);
    let c2 = m[(0, 0)].hypot(m[(0, 1)]);
    let b = if a > 0.0 {
        a -= PI;
        (-m[(0, 2)]).atan2(-c2)
    } else {
        (-m[(0, 2)]).atan2(c2)
    };
    let (s1, c1) = a.sin_cos();
    let c = (s1 * m[(2, 0)] - c1 * m[(1, 0)]).atan2(c1 * m[(1, 1)] - s1 * m[(2, 1)]);
    // even axis permutation: Eigen negates all three
    EulerXyz {
        x: -a,
        y: -b,
        z: -c,
    }
}

/// Rotation matrix `Rx(x) * Ry(y) * Rz(z)`.
pub fn euler_xyz_to_rotation(e: &EulerXyz) -> Mat3 {
    (UnitQuat::from_axis_angle(&Vector3::x_axis(), e.x)
        * UnitQuat::from_axis_angle(&Vector3::y_axis(), e.y)
        * UnitQuat::from_axis_angle(&Vector3::z_axis(), e.z))
    .to_rotation_matrix()
    .into_inner()
}
